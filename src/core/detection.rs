//! Plant disease detection
//!
//! This module contains:
//! - `parser`: turns the service's free-text diagnosis into a structured record
//! - `preview`: scoped preview resources for the selected image
//! - `client`: multipart upload to the detection backend
//! - `pipeline`: the select -> upload -> result state machine

pub mod parser;
pub mod preview;
pub mod client;
pub mod pipeline;

pub use client::HttpDiseaseDetector;
pub use parser::{parse_diagnosis, ParsedDiagnosis, TranslatedDiagnosis};
pub use pipeline::{DetectionPipeline, DetectionStage, PipelineView};
pub use preview::{PreviewHandle, PreviewStore};

use std::path::Path;

use async_trait::async_trait;

use crate::shared::error::{AppError, AppResult};

const ACCEPTED_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// An image picked by the user, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedImage {
    /// Only JPEG and PNG are accepted.
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> AppResult<Self> {
        let file_name = file_name.into();
        let content_type = content_type.into().to_ascii_lowercase();
        if !ACCEPTED_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::Validation(format!(
                "Unsupported image type '{}' for {}",
                content_type, file_name
            )));
        }
        if bytes.is_empty() {
            return Err(AppError::Validation(format!("Image {} is empty", file_name)));
        }
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Read an image from disk, typing it by extension.
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let content_type = content_type_for(path).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image file: {}", path.display()))
        })?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::new(file_name, content_type, bytes)
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// The remote image-classification service.
#[async_trait]
pub trait DiseaseDetector: Send + Sync {
    /// Upload `image` and return the raw diagnosis text.
    async fn detect(&self, image: &SelectedImage) -> AppResult<String>;
}
