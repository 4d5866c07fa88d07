//! Where batch captures come from.

use crate::domain::{Image, LoadError};

/// Supplies decoded captures, with their file metadata, to a batch.
pub trait ImageSource: Send + Sync {
    /// Iterates the captures in a stable order.
    ///
    /// Individual items are errors when an image fails to load; the
    /// iteration continues past them.
    fn images(&self) -> Box<dyn Iterator<Item = Result<Image, LoadError>> + Send + '_>;

    /// Number of captures, when known before decoding.
    fn count_hint(&self) -> Option<usize>;

    /// Estimated decoded size in bytes of the largest image, read from
    /// headers without decoding. Used to bound batch parallelism.
    fn largest_image_bytes(&self) -> Option<u64> {
        None
    }
}
