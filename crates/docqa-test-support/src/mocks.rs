//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use docqa_core::domain::{AnalysisResult, Image, LoadError};
use docqa_core::pipeline::BatchFailure;
use docqa_core::ports::{ImageSource, ProgressEvent, ProgressSink, ResultOutput};

#[derive(Debug, Clone)]
enum Entry {
    Image(Image),
    Corrupt(String),
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images and decode failures in insertion order and
/// tracks iteration for assertions.
pub struct MockImageSource {
    entries: Vec<Entry>,
    largest_image_bytes: Option<u64>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<Image>) -> Self {
        Self {
            entries: images.into_iter().map(Entry::Image).collect(),
            largest_image_bytes: None,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Appends an image.
    #[must_use]
    pub fn with_image(mut self, image: Image) -> Self {
        self.entries.push(Entry::Image(image));
        self
    }

    /// Appends an entry that fails to decode.
    #[must_use]
    pub fn with_corrupt(mut self, path: impl Into<String>) -> Self {
        self.entries.push(Entry::Corrupt(path.into()));
        self
    }

    /// Reports `bytes` as the largest decoded image size.
    #[must_use]
    pub const fn with_largest_image_bytes(mut self, bytes: u64) -> Self {
        self.largest_image_bytes = Some(bytes);
        self
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<Image, LoadError>> + Send + '_> {
        let count = Arc::clone(&self.iteration_count);
        if let Ok(mut c) = count.lock() {
            *c += 1;
        }
        Box::new(self.entries.iter().map(|entry| match entry {
            Entry::Image(image) => Ok(image.clone()),
            Entry::Corrupt(path) => Err(LoadError::Decode {
                path: path.clone(),
                reason: "corrupt test entry".into(),
            }),
        }))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }

    fn largest_image_bytes(&self) -> Option<u64> {
        self.largest_image_bytes
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures results for later assertions.
pub struct MockResultOutput {
    results: Arc<Mutex<Vec<AnalysisResult>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured results.
    #[must_use]
    pub fn results(&self) -> Vec<AnalysisResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the failures reported through `Failed` events.
    #[must_use]
    pub fn failures(&self) -> Vec<BatchFailure> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Failed { failure } => Some(failure),
                _ => None,
            })
            .collect()
    }

    /// Returns whether a `Finished` event was received.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Finished { .. }))
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, failed } => Some((*processed, *failed)),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
