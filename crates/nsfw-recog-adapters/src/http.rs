//! Blocking HTTP fetcher for model artifacts.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::Context;
use nsfw_recog_core::error::BoxError;
use nsfw_recog_core::ports::{ProgressCallback, RemoteFetch};
use nsfw_recog_core::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use tracing::debug;

/// Bytes read from the response per progress tick.
const CHUNK_SIZE: usize = 64 * 1024;

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed for the whole request including the body.
    pub timeout: Duration,
    /// Bearer token sent with every request.
    pub token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(600),
            token: None,
        }
    }
}

/// `RemoteFetch` over a blocking `reqwest` client.
pub struct HttpFetcher {
    client: Client,
    token: Option<String>,
}

impl HttpFetcher {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: HttpConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(concat!("nsfw-recog/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            token: config.token,
        })
    }
}

impl RemoteFetch for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        writer: &mut dyn Write,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64> {
        let transport = |source: BoxError| Error::Transport {
            url: url.to_owned(),
            source,
        };

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let mut response = request.send().map_err(|e| transport(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        debug!("GET {url}: {status}, content-length {total:?}");

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut downloaded = 0u64;
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(transport(e.into())),
            };

            writer
                .write_all(&buf[..n])
                .map_err(|e| Error::io(url, e))?;
            downloaded += n as u64;

            if let Some(cb) = progress {
                cb(url, downloaded, total);
            }
        }
        writer.flush().map_err(|e| Error::io(url, e))?;

        Ok(downloaded)
    }
}
