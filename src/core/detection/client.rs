use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

use crate::shared::error::{AppError, AppResult};
use crate::shared::settings::AppSettings;

use super::{DiseaseDetector, SelectedImage};

/// Multipart upload to the detection backend (`POST {base}{path}`, field `file`).
pub struct HttpDiseaseDetector {
    http: Client,
    url: String,
}

impl HttpDiseaseDetector {
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("plantcare-client/detection")
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;
        Ok(Self { http, url: url.into() })
    }

    pub fn from_settings(settings: &AppSettings) -> AppResult<Self> {
        let endpoints = &settings.endpoints;
        Self::new(format!(
            "{}/{}",
            endpoints.api_base_url.trim_end_matches('/'),
            endpoints.detection_path.trim_start_matches('/')
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DiseaseDetector for HttpDiseaseDetector {
    async fn detect(&self, image: &SelectedImage) -> AppResult<String> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let form = Form::new().part("file", part);

        tracing::info!(file = %image.file_name, url = %self.url, "[Detection] uploading image");
        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Detection request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read detection response: {}", e)))?;
        interpret_detection_response(status, &body)
    }
}

/// `{ "result": "..." }` on success, `{ "error": "..." }` otherwise.
pub(crate) fn interpret_detection_response(status: u16, body: &str) -> AppResult<String> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    if !(200..300).contains(&status) {
        let detail = field("error").unwrap_or_else(|| format!("status {}", status));
        return Err(AppError::Network(format!("Detection service error: {}", detail)));
    }

    if let Some(result) = field("result") {
        return Ok(result);
    }
    if let Some(error) = field("error") {
        return Err(AppError::Network(format!("Detection service error: {}", error)));
    }
    Err(AppError::Validation("Malformed detection response".to_string()))
}
