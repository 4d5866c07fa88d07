//! Progress bar adapter using indicatif.

use docqa_core::{ProgressEvent, ProgressSink, Status};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        // Workers finish out of order, so the bar counts completions
        // instead of following the batch index.
        match event {
            ProgressEvent::Started { source_id, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(source_id);
                }
            }
            ProgressEvent::Completed { result } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                } else if result.global.status != Status::Pass {
                    eprintln!(
                        "{}: {} (score {:.2}, {} star(s))",
                        result.metadata.source_id,
                        result.global.status,
                        result.global.score,
                        result.global.stars
                    );
                }
            }
            ProgressEvent::Failed { failure } => {
                let line = format!(
                    "WARN: Skipping {}: {}",
                    failure.filename, failure.error_reason
                );
                match &self.bar {
                    Some(bar) => {
                        bar.println(line);
                        bar.inc(1);
                    }
                    None => eprintln!("{line}"),
                }
            }
            ProgressEvent::Finished { processed, failed } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!("Done: {processed} processed, {failed} failed"));
                }
            }
        }
    }
}
