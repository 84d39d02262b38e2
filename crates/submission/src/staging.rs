//! Image staging: turns user-selected files into inline data URIs that serve
//! both as previews and as the stored image urls.

use std::path::Path;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use shared::{
    protocol::Notice,
    rules::{is_image_type, MAX_FILE_SIZE_BYTES, MAX_IMAGES},
};
use thiserror::Error;
use tracing::{debug, warn};

/// A file offered for inclusion, as a browser or file picker would hand it
/// over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Reads a local file, declaring its type from the extension.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let declared_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();
        Ok(Self {
            name,
            declared_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The declared type, or a guess from the file name when none was
    /// declared.
    pub fn effective_type(&self) -> String {
        let declared = self.declared_type.trim();
        if !declared.is_empty() {
            return declared.to_ascii_lowercase();
        }
        mime_guess::from_path(&self.name)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingRejection {
    #[error("Maximum {max} images allowed.")]
    LimitReached { name: String, max: usize },
    #[error("Image \"{name}\" exceeds {max_mb}MB.")]
    TooLarge {
        name: String,
        size_bytes: usize,
        max_mb: usize,
    },
    #[error("\"{name}\" is not a valid image type.")]
    NotAnImage { name: String, declared_type: String },
    #[error("\"{name}\" could not be read: {reason}")]
    EncodeFailed { name: String, reason: String },
}

impl StagingRejection {
    pub fn file_name(&self) -> &str {
        match self {
            StagingRejection::LimitReached { name, .. }
            | StagingRejection::TooLarge { name, .. }
            | StagingRejection::NotAnImage { name, .. }
            | StagingRejection::EncodeFailed { name, .. } => name,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            StagingRejection::LimitReached { .. } => "Image Limit Reached",
            StagingRejection::TooLarge { .. } => "File Too Large",
            StagingRejection::NotAnImage { .. } => "Invalid File Type",
            StagingRejection::EncodeFailed { .. } => "Could Not Read Image",
        }
    }

    pub fn notice(&self) -> Notice {
        Notice::destructive(self.title(), self.to_string())
    }
}

/// Outcome of one selection batch. Rejections never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    pub accepted: Vec<String>,
    pub rejections: Vec<StagingRejection>,
    pub notices: Vec<Notice>,
}

impl StagingReport {
    fn reject(&mut self, rejection: StagingRejection) {
        let repeated_limit = matches!(rejection, StagingRejection::LimitReached { .. })
            && self
                .rejections
                .iter()
                .any(|r| matches!(r, StagingRejection::LimitReached { .. }));
        if !repeated_limit {
            self.notices.push(rejection.notice());
        }
        warn!(file = rejection.file_name(), reason = %rejection, "image rejected");
        self.rejections.push(rejection);
    }
}

/// Ordered list of staged images. The image count cap applies across
/// batches.
#[derive(Debug, Clone)]
pub struct ImageStager {
    staged: Vec<StagedImage>,
    max_images: usize,
    max_file_size: usize,
}

impl Default for ImageStager {
    fn default() -> Self {
        Self::with_limits(MAX_IMAGES, MAX_FILE_SIZE_BYTES)
    }
}

impl ImageStager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_images: usize, max_file_size: usize) -> Self {
        Self {
            staged: Vec::new(),
            max_images,
            max_file_size,
        }
    }

    pub fn staged(&self) -> &[StagedImage] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.staged.len() >= self.max_images
    }

    pub fn remaining(&self) -> usize {
        self.max_images.saturating_sub(self.staged.len())
    }

    pub fn image_urls(&self) -> Vec<String> {
        self.staged.iter().map(|s| s.data_uri.clone()).collect()
    }

    /// Removes the image at `index`; out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<StagedImage> {
        if index < self.staged.len() {
            Some(self.staged.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Screens a batch, encodes the accepted files concurrently and appends
    /// them in selection order.
    pub async fn stage(&mut self, files: Vec<ImageFile>) -> StagingReport {
        let mut report = StagingReport::default();
        let mut pending = Vec::new();

        for file in files {
            if self.staged.len() + pending.len() >= self.max_images {
                report.reject(StagingRejection::LimitReached {
                    name: file.name,
                    max: self.max_images,
                });
                continue;
            }
            if file.size() > self.max_file_size {
                report.reject(StagingRejection::TooLarge {
                    size_bytes: file.size(),
                    name: file.name,
                    max_mb: self.max_file_size / (1024 * 1024),
                });
                continue;
            }
            let mime_type = file.effective_type();
            if !is_image_type(&mime_type) {
                report.reject(StagingRejection::NotAnImage {
                    name: file.name,
                    declared_type: file.declared_type,
                });
                continue;
            }
            pending.push((file, mime_type));
        }

        let encoded = join_all(
            pending
                .into_iter()
                .map(|(file, mime_type)| encode(file, mime_type)),
        )
        .await;

        for result in encoded {
            match result {
                Ok(image) => {
                    debug!(file = %image.name, size_bytes = image.size_bytes, "image staged");
                    report.accepted.push(image.name.clone());
                    self.staged.push(image);
                }
                Err(rejection) => report.reject(rejection),
            }
        }

        report
    }
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

async fn encode(file: ImageFile, mime_type: String) -> Result<StagedImage, StagingRejection> {
    let name = file.name.clone();
    tokio::task::spawn_blocking(move || StagedImage {
        size_bytes: file.bytes.len(),
        data_uri: data_uri(&mime_type, &file.bytes),
        name: file.name,
        mime_type,
    })
    .await
    .map_err(|err| StagingRejection::EncodeFailed {
        name,
        reason: err.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/staging_tests.rs"]
mod tests;
