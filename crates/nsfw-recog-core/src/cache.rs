//! Lazy-fetch model cache.
//!
//! Resolves the model checkpoint and its class file to local paths,
//! downloading whatever is missing, then validates both files before
//! handing them to the caller.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::LabelSet;
use crate::error::{Error, Result};
use crate::ports::{ProgressCallback, RemoteFetch};

/// Body a broken release link serves instead of the payload.
pub const NOT_FOUND_SENTINEL: &str = "Not Found";

/// Fixed name of the class file, both in the cache and next to an override model.
pub const CLASSES_FILENAME: &str = "classes.txt";

/// Files longer than this cannot hold the sentinel and are not read.
const SENTINEL_PROBE_LIMIT: u64 = 64;

/// A remote artifact the cache knows how to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Download URL.
    pub url: String,
    /// File name inside the cache directory.
    pub filename: String,
    /// Expected SHA-256 (lowercase hex). `None` skips verification.
    pub sha256: Option<String>,
}

impl Artifact {
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            sha256: None,
        }
    }

    /// Sets the checksum the downloaded bytes must match.
    #[must_use]
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

/// Where a cached artifact lives and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub remote_url: String,
    pub local_path: PathBuf,
    pub sha256: Option<String>,
}

impl CacheEntry {
    /// True if the file exists and is non-empty.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        fs::metadata(&self.local_path).is_ok_and(|m| m.len() > 0)
    }
}

/// Validated local paths for the model and its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub model_path: PathBuf,
    pub classes_path: PathBuf,
}

impl ResolvedModel {
    /// Loads the class file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the class file cannot be read.
    pub fn load_labels(&self) -> Result<LabelSet> {
        LabelSet::load(&self.classes_path)
    }
}

/// Download-if-missing cache for the checkpoint and class list.
pub struct ModelCache {
    dir: PathBuf,
    model: Artifact,
    classes: Artifact,
    fetcher: Box<dyn RemoteFetch>,
    progress: Option<ProgressCallback>,
}

impl ModelCache {
    /// Creates a cache rooted at `dir`. Nothing touches the disk until [`resolve`](Self::resolve).
    #[must_use]
    pub fn new(
        dir: impl Into<PathBuf>,
        model: Artifact,
        classes: Artifact,
        fetcher: Box<dyn RemoteFetch>,
    ) -> Self {
        Self {
            dir: dir.into(),
            model,
            classes,
            fetcher,
            progress: None,
        }
    }

    /// Reports download progress through `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    /// Cache entries in resolution order (model first, then classes).
    #[must_use]
    pub fn entries(&self) -> [CacheEntry; 2] {
        [self.entry(&self.model), self.entry(&self.classes)]
    }

    /// Lists entries with whether each is present and non-empty.
    #[must_use]
    pub fn status(&self) -> Vec<(CacheEntry, bool)> {
        self.entries()
            .into_iter()
            .map(|e| {
                let installed = e.is_populated();
                (e, installed)
            })
            .collect()
    }

    /// Resolves and validates the model and class file paths.
    ///
    /// With `model_override`, both the model and a sibling `classes.txt` must
    /// already exist and no download happens. Otherwise missing or
    /// zero-length files in the cache directory are downloaded first.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingFile`] if an override path does not exist
    /// - [`Error::Download`] / [`Error::Transport`] if a fetch fails
    /// - [`Error::ChecksumMismatch`] if a download does not match its checksum
    /// - [`Error::EmptyFile`] / [`Error::CorruptDownload`] if validation fails
    pub fn resolve(&self, model_override: Option<&Path>) -> Result<ResolvedModel> {
        let resolved = match model_override {
            Some(model_path) => Self::resolve_override(model_path)?,
            None => self.resolve_cached()?,
        };

        validate(&[&resolved.model_path, &resolved.classes_path])?;
        Ok(resolved)
    }

    fn resolve_override(model_path: &Path) -> Result<ResolvedModel> {
        let classes_path = model_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(CLASSES_FILENAME);

        if !model_path.exists() {
            return Err(Error::MissingFile {
                path: model_path.to_path_buf(),
            });
        }
        if !classes_path.exists() {
            return Err(Error::MissingFile { path: classes_path });
        }

        debug!("Using model override {}", model_path.display());
        Ok(ResolvedModel {
            model_path: model_path.to_path_buf(),
            classes_path,
        })
    }

    fn resolve_cached(&self) -> Result<ResolvedModel> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        debug!("Model cache directory: {}", self.dir.display());

        let [model, classes] = self.entries();

        if model.is_populated() {
            debug!("Checkpoint already cached at {}", model.local_path.display());
        } else {
            info!("Downloading the checkpoint to {}", model.local_path.display());
            self.download(&model)?;
        }

        if classes.is_populated() {
            debug!("Class list already cached at {}", classes.local_path.display());
        } else {
            info!("Downloading the classes list to {}", classes.local_path.display());
            self.download(&classes)?;
        }

        Ok(ResolvedModel {
            model_path: model.local_path,
            classes_path: classes.local_path,
        })
    }

    /// Streams `entry` into a uniquely named sibling temp file and renames it
    /// into place.
    ///
    /// Every download gets its own temp file, so concurrent resolvers never
    /// write into each other's payload. The temp file is deleted on any
    /// failure and `local_path` is only ever replaced by a complete file.
    fn download(&self, entry: &CacheEntry) -> Result<()> {
        let partial = partial_file(&entry.local_path)?;
        let bytes = self.download_to(entry, &partial)?;

        partial
            .persist(&entry.local_path)
            .map_err(|e| Error::io(&entry.local_path, e.error))?;
        info!("Downloaded {} ({bytes} bytes)", entry.local_path.display());
        Ok(())
    }

    fn download_to(&self, entry: &CacheEntry, partial: &NamedTempFile) -> Result<u64> {
        let mut writer = HashingWriter::new(BufWriter::new(partial.as_file()));

        // The fetcher only knows the URL; name the file the bytes were bound for.
        let bytes = self
            .fetcher
            .fetch(&entry.remote_url, &mut writer, self.progress.as_ref())
            .map_err(|e| match e {
                Error::Io { source, .. } => Error::io(&entry.local_path, source),
                other => other,
            })?;

        let (buffered, actual) = writer.finish();
        let file = buffered
            .into_inner()
            .map_err(|e| Error::io(partial.path(), e.into_error()))?;
        file.sync_all().map_err(|e| Error::io(partial.path(), e))?;

        if let Some(expected) = &entry.sha256 {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(Error::ChecksumMismatch {
                    path: entry.local_path.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        } else {
            debug!("No checksum configured for {}", entry.remote_url);
        }

        Ok(bytes)
    }

    fn entry(&self, artifact: &Artifact) -> CacheEntry {
        CacheEntry {
            remote_url: artifact.url.clone(),
            local_path: self.dir.join(&artifact.filename),
            sha256: artifact.sha256.clone(),
        }
    }
}

/// Checks that every path is non-empty, then that none holds the sentinel.
///
/// # Errors
///
/// - [`Error::MissingFile`] if a path cannot be stat'ed
/// - [`Error::EmptyFile`] for a zero-length file
/// - [`Error::CorruptDownload`] for a file holding the sentinel body
pub fn validate(paths: &[&Path]) -> Result<()> {
    for path in paths {
        let len = fs::metadata(path)
            .map_err(|_| Error::MissingFile {
                path: path.to_path_buf(),
            })?
            .len();
        if len == 0 {
            return Err(Error::EmptyFile {
                path: path.to_path_buf(),
            });
        }
    }

    for path in paths {
        if holds_sentinel(path)? {
            return Err(Error::CorruptDownload {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(())
}

/// True if the whole file is the single line `Not Found`.
///
/// Content that is not UTF-8 can never be the sentinel.
fn holds_sentinel(path: &Path) -> Result<bool> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut bytes = Vec::new();
    file.take(SENTINEL_PROBE_LIMIT + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(path, e))?;

    if bytes.len() as u64 > SENTINEL_PROBE_LIMIT {
        return Ok(false);
    }

    let Ok(text) = std::str::from_utf8(&bytes) else {
        return Ok(false);
    };

    let line = text
        .strip_suffix('\n')
        .map_or(text, |l| l.strip_suffix('\r').unwrap_or(l));
    Ok(line == NOT_FOUND_SENTINEL)
}

/// Creates a hidden `.{name}.XXXXXX.part` file next to `path`.
fn partial_file(path: &Path) -> Result<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map_or_else(|| "download".into(), |n| n.to_string_lossy());

    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))
}

/// Writer that hashes everything passing through it.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Returns the inner writer and the lowercase hex digest.
    fn finish(self) -> (W, String) {
        (self.inner, format!("{:x}", self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
