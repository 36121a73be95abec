//! Image access for diagnosis: existence probe and byte loading.
//!
//! An image ref is either an `http(s)://` URL or a filesystem path. Relative
//! paths resolve against the photos directory.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::AnalysisError;
use super::traits::ImageProbe;
use crate::models::ImageRef;

/// Largest image sent to the analysis service.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

const PROBE_TIMEOUT_SECS: u64 = 10;

pub struct ImageAccess {
    http: reqwest::blocking::Client,
    photos_root: Option<PathBuf>,
}

impl ImageAccess {
    pub fn new(photos_root: Option<PathBuf>) -> Result<Self, AnalysisError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;
        Ok(Self { http, photos_root })
    }

    fn local_path(&self, image_ref: &ImageRef) -> PathBuf {
        let path = Path::new(image_ref.as_str());
        match &self.photos_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Read the image bytes, enforcing [`MAX_IMAGE_BYTES`].
    pub fn load(&self, image_ref: &ImageRef) -> Result<Vec<u8>, AnalysisError> {
        let read_err = |reason: String| AnalysisError::ImageRead {
            image_ref: image_ref.to_string(),
            reason,
        };

        let bytes = if image_ref.is_remote() {
            let response = self
                .http
                .get(image_ref.as_str())
                .send()
                .map_err(|e| read_err(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(read_err(format!("HTTP {}", status.as_u16())));
            }
            if let Some(len) = response.content_length() {
                if len > MAX_IMAGE_BYTES as u64 {
                    return Err(AnalysisError::ImageTooLarge(len as usize));
                }
            }
            // Bodies without a length (or lying about it) stop one byte past the limit.
            let mut buf = Vec::new();
            response
                .take(MAX_IMAGE_BYTES as u64 + 1)
                .read_to_end(&mut buf)
                .map_err(|e| read_err(e.to_string()))?;
            buf
        } else {
            let path = self.local_path(image_ref);
            let len = std::fs::metadata(&path)
                .map_err(|e| read_err(e.to_string()))?
                .len() as usize;
            if len > MAX_IMAGE_BYTES {
                return Err(AnalysisError::ImageTooLarge(len));
            }
            std::fs::read(&path).map_err(|e| read_err(e.to_string()))?
        };

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AnalysisError::ImageTooLarge(bytes.len()));
        }
        if bytes.is_empty() {
            return Err(read_err("empty image".into()));
        }
        Ok(bytes)
    }
}

impl ImageProbe for ImageAccess {
    fn exists(&self, image_ref: &ImageRef) -> bool {
        if image_ref.as_str().trim().is_empty() {
            return false;
        }
        if image_ref.is_remote() {
            return match self.http.head(image_ref.as_str()).send() {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    tracing::debug!(image_ref = %image_ref, error = %e, "Image probe failed");
                    false
                }
            };
        }
        self.local_path(image_ref).is_file()
    }
}
