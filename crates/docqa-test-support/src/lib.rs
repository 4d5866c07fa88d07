//! Test support utilities for docqa.
//!
//! Provides mocks, synthetic document builders, and utilities for testing
//! the docqa analysis pipeline.
//!
//! # Example
//!
//! ```
//! use docqa_test_support::{MockImageSource, SyntheticDocumentBuilder};
//!
//! // Create synthetic captures
//! let good = SyntheticDocumentBuilder::new(200, 160).build();
//! let blurry = SyntheticDocumentBuilder::new(200, 160).blur(4.0).build();
//!
//! // Create mock image source with one undecodable entry
//! let source = MockImageSource::new(vec![good, blurry]).with_corrupt("bad.jpg");
//! ```

mod builders;
mod mocks;

pub use builders::{SyntheticDocumentBuilder, BACKGROUND, INK, PAPER};
pub use mocks::{MockImageSource, MockProgressSink, MockResultOutput};
