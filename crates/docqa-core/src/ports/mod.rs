//! Seams between the analysis pipeline and the outside world.
//!
//! Captures come in through [`ImageSource`], batch progress goes out through
//! [`ProgressSink`] and finished verdicts through [`ResultOutput`]. The
//! filesystem, terminal and JSON implementations live in the adapter and CLI
//! crates.

mod image_source;
mod progress;
mod result_output;

pub use image_source::ImageSource;
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
