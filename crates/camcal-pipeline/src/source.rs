//! Frame sources and the bounded retry policy used for captures.

use crate::error::FetchError;
use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Snapshot endpoint of the on-board camera web server.
pub const DEFAULT_SNAPSHOT_URL: &str =
    "http://192.168.11.1:8080/snapshot?topic=/main_camera/image_raw";

/// Something that can produce one decoded frame on demand.
pub trait ImageSource {
    fn fetch_frame(&mut self) -> Result<DynamicImage, FetchError>;
}

impl<S: ImageSource + ?Sized> ImageSource for Box<S> {
    fn fetch_frame(&mut self) -> Result<DynamicImage, FetchError> {
        (**self).fetch_frame()
    }
}

/// Fetches JPEG/PNG snapshots over HTTP.
pub struct HttpSnapshotSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            url: url.into(),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw (still encoded) snapshot bytes.
    pub fn fetch_bytes(&self) -> Result<Vec<u8>, FetchError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        Ok(body)
    }
}

impl ImageSource for HttpSnapshotSource {
    fn fetch_frame(&mut self) -> Result<DynamicImage, FetchError> {
        let body = self.fetch_bytes()?;
        debug!("fetched {} bytes from {}", body.len(), self.url);
        Ok(image::load_from_memory(&body)?)
    }
}

/// Iterates the images of a directory in file-name order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, FetchError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image_path(p))
            .collect();
        paths.sort();
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path of the frame returned by the last successful fetch.
    pub fn current_path(&self) -> Option<&Path> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.paths.get(i))
            .map(PathBuf::as_path)
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false)
}

impl ImageSource for DirectorySource {
    fn fetch_frame(&mut self) -> Result<DynamicImage, FetchError> {
        let path = self.paths.get(self.next).ok_or(FetchError::Exhausted)?;
        self.next += 1;
        let img = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            // A corrupt file on disk will not get better on retry.
            .map_err(|e| {
                FetchError::Io(std::io::Error::other(format!("{}: {e}", path.display())))
            })?;
        Ok(img)
    }
}

/// Retry policy for transient capture failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 500,
        }
    }
}

/// Fetch a frame, retrying transient failures after a fixed delay.
///
/// Permanent failures are returned immediately. When every attempt fails
/// transiently the result is [`FetchError::CaptureUnavailable`].
pub fn fetch_with_retry<S: ImageSource + ?Sized>(
    source: &mut S,
    policy: &RetryPolicy,
) -> Result<DynamicImage, FetchError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match source.fetch_frame() {
            Ok(img) => return Ok(img),
            Err(e) if e.is_transient() => {
                warn!("capture attempt {attempt}/{attempts} failed: {e}");
                last_error = e.to_string();
                if attempt < attempts {
                    std::thread::sleep(Duration::from_millis(policy.delay_ms));
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(FetchError::CaptureUnavailable {
        attempts,
        last_error,
    })
}
