//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use docqa_core::{AnalysisResult, BatchReport, ResultOutput};
use serde::Serialize;

/// Final JSONL line with batch-level statistics.
#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: Summary<'a>,
}

#[derive(Serialize)]
struct Summary<'a> {
    processed: usize,
    failed: usize,
    success_rate: f64,
    failures: &'a [docqa_core::BatchFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    sla_summary: Option<&'a docqa_core::domain::SlaBatchSummary>,
}

/// JSON and JSON Lines output adapter.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Writes the whole batch report as one JSON object.
    pub fn write_report(&self, report: &BatchReport, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        self.write_line(&json)
    }

    /// Writes the `{"summary": ...}` line that closes a JSONL stream.
    pub fn write_summary(&self, report: &BatchReport) -> Result<()> {
        let line = SummaryLine {
            summary: Summary {
                processed: report.results.len(),
                failed: report.failures.len(),
                success_rate: report.success_rate,
                failures: &report.failures,
                sla_summary: report.sla_summary.as_ref(),
            },
        };
        self.write_line(&serde_json::to_string(&line)?)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn write_line(&self, json: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    fn write(&self, result: &AnalysisResult) -> Result<()> {
        self.write_line(&serde_json::to_string(result)?)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Writer sharing its buffer with the test.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn empty_report() -> BatchReport {
        BatchReport {
            results: vec![],
            failures: vec![],
            success_rate: 0.0,
            sla_summary: None,
            cancelled: false,
        }
    }

    #[test]
    fn test_summary_line_shape() {
        let buf = Shared::default();
        let output = JsonOutput::new(Box::new(buf.clone()));
        output.write_summary(&empty_report()).unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["summary"]["processed"], 0);
        assert_eq!(value["summary"]["success_rate"], 0.0);
        assert!(value["summary"]["failures"].as_array().unwrap().is_empty());
        assert!(value["summary"].get("sla_summary").is_none());
    }

    #[test]
    fn test_report_is_single_object() {
        let buf = Shared::default();
        let output = JsonOutput::new(Box::new(buf.clone()));
        output.write_report(&empty_report(), true).unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.is_object());
        assert!(value.get("cancelled").is_none());
    }
}
