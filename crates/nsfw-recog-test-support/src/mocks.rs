//! Mock implementations of core port traits.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use image::DynamicImage;
use nsfw_recog_core::domain::{DetectionReport, ImageInfo};
use nsfw_recog_core::ports::{
    ImageSource, Images, InferenceEngine, ProgressCallback, ProgressEvent, ProgressSink, RawBatch,
    RemoteFetch, ResultOutput, UnreadableImage,
};
use nsfw_recog_core::{Error, Result};

/// Scripted `InferenceEngine`.
///
/// Clones share state, so a test can hand one clone to the adapter and keep
/// the other for assertions.
#[derive(Clone)]
pub struct MockEngine {
    batches: Arc<Vec<RawBatch>>,
    failure: Option<Arc<str>>,
    calls: Arc<Mutex<Vec<f32>>>,
}

impl MockEngine {
    /// Engine that always returns `batches`.
    #[must_use]
    pub fn returning(batches: Vec<RawBatch>) -> Self {
        Self {
            batches: Arc::new(batches),
            failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Engine that finds nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Engine whose every call fails with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(Arc::from(message)),
            ..Self::empty()
        }
    }

    /// Number of `predict` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Confidence thresholds passed to each call, in order.
    #[must_use]
    pub fn confidences(&self) -> Vec<f32> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl InferenceEngine for MockEngine {
    fn predict(&self, _image: &DynamicImage, confidence: f32) -> anyhow::Result<Vec<RawBatch>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(confidence);

        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(self.batches.as_ref().clone()),
        }
    }
}

#[derive(Clone)]
enum Route {
    Body { status: u16, body: Vec<u8> },
    Broken(String),
}

/// In-memory `RemoteFetch` keyed by URL.
///
/// Unknown URLs answer 404. Clones share the call log.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with status 200 at `url`.
    #[must_use]
    pub fn with_body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.with_status(url, 200, body)
    }

    /// Serves `body` with `status` at `url`.
    #[must_use]
    pub fn with_status(self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                url.to_owned(),
                Route::Body {
                    status,
                    body: body.into(),
                },
            );
        self
    }

    /// Fails requests to `url` as if the connection dropped.
    #[must_use]
    pub fn with_transport_error(self, url: &str, message: &str) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_owned(), Route::Broken(message.to_owned()));
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl RemoteFetch for MockFetcher {
    fn fetch(
        &self,
        url: &str,
        writer: &mut dyn Write,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());

        let route = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();

        match route {
            None => Err(Error::Download {
                url: url.to_owned(),
                status: 404,
            }),
            Some(Route::Broken(message)) => Err(Error::Transport {
                url: url.to_owned(),
                source: message.into(),
            }),
            Some(Route::Body { status, .. }) if !(200..300).contains(&status) => {
                Err(Error::Download {
                    url: url.to_owned(),
                    status,
                })
            }
            Some(Route::Body { body, .. }) => {
                let total = body.len() as u64;
                writer.write_all(&body).map_err(|e| Error::Transport {
                    url: url.to_owned(),
                    source: e.into(),
                })?;
                if let Some(cb) = progress {
                    cb(url, total, Some(total));
                }
                Ok(total)
            }
        }
    }
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images, optionally interleaved with undecodable entries,
/// and counts how often it is iterated.
pub struct MockImageSource {
    items: Vec<std::result::Result<ImageInfo, UnreadableImage>>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<ImageInfo>) -> Self {
        Self {
            items: images.into_iter().map(Ok).collect(),
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Appends an entry that fails to decode.
    #[must_use]
    pub fn with_unreadable(mut self, path: &str, reason: &str) -> Self {
        self.items.push(Err(UnreadableImage {
            path: path.to_owned(),
            reason: reason.to_owned(),
        }));
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
    fn images(&self) -> Images<'_> {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        Box::new(self.items.iter().cloned())
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Mock implementation of `ResultOutput` that captures reports.
pub struct MockResultOutput {
    reports: Arc<Mutex<Vec<DetectionReport>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<DetectionReport> {
        self.reports
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
    fn write(&self, report: &DetectionReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` that captures events.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
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

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, skipped } => Some((*processed, *skipped)),
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
