//! Stderr progress for batch detection and model downloads.
//!
//! Both reporters draw an indicatif bar on a terminal. Elsewhere they fall
//! back to plain lines so logs and captured stderr still show what happened.

use std::io::IsTerminal;
use std::sync::{Arc, Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use nsfw_recog_core::{DetectionReport, ProgressCallback, ProgressEvent, ProgressSink};

const BATCH_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
const DOWNLOAD_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}";

fn styled(bar: ProgressBar, template: &str) -> ProgressBar {
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

/// Prints a line without tearing an active bar.
fn note(bar: Option<&ProgressBar>, line: &str) {
    match bar {
        Some(bar) => bar.suspend(|| eprintln!("{line}")),
        None => eprintln!("{line}"),
    }
}

enum BatchDisplay {
    Hidden,
    Bar(ProgressBar),
    Lines,
}

/// Reports a detection batch on stderr.
pub struct BatchProgress {
    display: BatchDisplay,
}

impl BatchProgress {
    /// `quiet` silences everything, otherwise `bar` picks the bar over
    /// one line per flagged image.
    #[must_use]
    pub fn new(total: Option<usize>, quiet: bool, bar: bool) -> Self {
        let display = if quiet {
            BatchDisplay::Hidden
        } else if bar {
            let bar = total.map_or_else(ProgressBar::new_spinner, |t| ProgressBar::new(t as u64));
            BatchDisplay::Bar(styled(bar, BATCH_TEMPLATE))
        } else {
            BatchDisplay::Lines
        };
        Self { display }
    }

    fn bar(&self) -> Option<&ProgressBar> {
        match &self.display {
            BatchDisplay::Bar(bar) => Some(bar),
            _ => None,
        }
    }

    fn completed(&self, report: &DetectionReport) {
        match &self.display {
            BatchDisplay::Bar(bar) => bar.inc(1),
            BatchDisplay::Lines if report.is_flagged() => {
                eprintln!("{}: {} region(s)", report.path, report.detections.len());
            }
            _ => {}
        }
    }
}

impl ProgressSink for BatchProgress {
    fn on_event(&self, event: ProgressEvent) {
        if matches!(self.display, BatchDisplay::Hidden) {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = self.bar() {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Completed { report } => self.completed(&report),
            ProgressEvent::Skipped { path, reason } => {
                note(self.bar(), &format!("WARN: Skipping {path}: {reason}"));
                if let Some(bar) = self.bar() {
                    bar.inc(1);
                }
            }
            ProgressEvent::Finished { processed, skipped } => {
                if let Some(bar) = self.bar() {
                    bar.finish_with_message(format!(
                        "Done: {processed} processed, {skipped} skipped"
                    ));
                }
            }
        }
    }
}

/// Byte counter for model downloads, shared by every command that may fetch.
///
/// Announces each artifact once by the last segment of its URL.
#[derive(Clone)]
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
    current: Arc<Mutex<String>>,
}

impl DownloadProgress {
    /// A bar on a terminal stderr, plain lines otherwise.
    #[must_use]
    pub fn new() -> Self {
        let bar = std::io::stderr()
            .is_terminal()
            .then(|| styled(ProgressBar::new(0), DOWNLOAD_TEMPLATE));
        Self {
            bar,
            current: Arc::default(),
        }
    }

    /// Callback for `ModelCache::with_progress`.
    #[must_use]
    pub fn callback(&self) -> ProgressCallback {
        let this = self.clone();
        Box::new(move |url: &str, downloaded: u64, total: Option<u64>| {
            this.update(url, downloaded, total);
        })
    }

    fn update(&self, url: &str, downloaded: u64, total: Option<u64>) {
        let started = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == url {
                false
            } else {
                *current = url.to_string();
                true
            }
        };

        let name = url.rsplit('/').next().unwrap_or(url);
        match &self.bar {
            Some(bar) => {
                if started {
                    bar.set_length(total.unwrap_or(0));
                    bar.set_message(name.to_string());
                }
                bar.set_position(downloaded);
            }
            None if started => eprintln!("Downloading {name}"),
            None => {}
        }
    }

    /// Whether any artifact was downloaded.
    fn used(&self) -> bool {
        !self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Leaves `message` in place of the bar if anything was downloaded.
    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            if self.used() {
                bar.finish_with_message(message.to_string());
            } else {
                bar.finish_and_clear();
            }
        }
    }

    /// Removes the bar.
    pub fn clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Default for DownloadProgress {
    fn default() -> Self {
        Self::new()
    }
}
