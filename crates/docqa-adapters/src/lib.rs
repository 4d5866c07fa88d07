//! docqa adapters - filesystem, metadata and profile adapters.
//!
//! This crate provides adapters for:
//! - Filesystem image source with metadata extraction
//! - Profile store (built-ins plus TOML overrides)
//! - Bounded recent-result history

pub mod fs;
pub mod history;
pub mod metadata;
pub mod profiles;

pub use fs::FsImageSource;
pub use history::RecentHistory;
pub use profiles::ProfileSummary;
