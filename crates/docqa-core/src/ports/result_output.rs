//! Destination for per-capture verdicts.

use crate::domain::AnalysisResult;

/// Receives analysis results in source order.
///
/// [`BatchReport::write_to`](crate::pipeline::BatchReport::write_to) calls
/// [`write`](Self::write) once per analyzed capture and [`flush`](Self::flush)
/// once at the end. Captures that failed to load or analyze never reach it.
pub trait ResultOutput: Send + Sync {
    /// Records the verdict for one capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the verdict cannot be serialized or stored.
    fn write(&self, result: &AnalysisResult) -> anyhow::Result<()>;

    /// Makes every recorded verdict durable or visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer or store fails.
    fn flush(&self) -> anyhow::Result<()>;
}
