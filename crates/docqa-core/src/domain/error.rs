//! Typed errors for the file and configuration tiers.
//!
//! Metric-level problems are never errors: they surface as a FAIL status
//! with a diagnostic on the affected category.

use thiserror::Error;

/// An image could not be turned into pixels.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Source path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The container is not one the decoder understands.
    #[error("unsupported image format: {path}")]
    UnsupportedFormat {
        /// Source path.
        path: String,
    },
    /// The file is damaged or truncated.
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// Source path.
        path: String,
        /// Decoder message.
        reason: String,
    },
}

impl LoadError {
    /// Path of the offending file.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Io { path, .. } | Self::UnsupportedFormat { path } | Self::Decode { path, .. } => {
                path
            }
        }
    }

    /// Short machine-readable error kind.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Decode { .. } => "decode",
        }
    }
}

/// A profile or SLA requirement failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("invalid configuration field `{field}`: {reason}")]
    InvalidField {
        /// Dotted path of the field, e.g. `categories.sharpness.weight`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
    /// No profile with this name exists.
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),
    /// The profile source could not be parsed.
    #[error("failed to parse profile: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidField`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
