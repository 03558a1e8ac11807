//! Remote fetch port used to populate the model cache.

use std::io::Write;

use crate::error::Result;

/// Download progress callback: `(url, bytes_downloaded, content_length)`.
pub type ProgressCallback = Box<dyn Fn(&str, u64, Option<u64>) + Send + Sync>;

/// Port for streaming a remote artifact.
pub trait RemoteFetch: Send + Sync {
    /// Streams the body at `url` into `writer` and returns the byte count.
    ///
    /// # Errors
    ///
    /// - [`Error::Download`](crate::Error::Download) for a non-2xx status
    /// - [`Error::Transport`](crate::Error::Transport) if the request or body read fails
    fn fetch(
        &self,
        url: &str,
        writer: &mut dyn Write,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64>;
}
