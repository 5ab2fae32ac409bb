use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::shared::error::{AppError, AppResult};
use crate::shared::settings::AppSettings;
use crate::shared::types::Language;

use super::Translator;

const USER_AGENT: &str = "plantcare-client/translator";
const GOOGLE_FREE_URL: &str = "https://translate.googleapis.com/translate_a/single";

fn http_client() -> AppResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Network(e.to_string()))
}

/// Pick the backend named in settings.
pub fn build_translator(settings: &AppSettings) -> AppResult<Arc<dyn Translator>> {
    let endpoints = &settings.endpoints;
    match endpoints.translator_provider.trim().to_ascii_lowercase().as_str() {
        "azure" => Ok(Arc::new(AzureTranslator::new(
            &endpoints.translator_url,
            &settings.api_keys.translator_key,
            &endpoints.translator_region,
        )?)),
        "google" => Ok(Arc::new(GoogleFreeTranslator::new()?)),
        other => Err(AppError::Config(format!("Unknown translator provider: {}", other))),
    }
}

/// Microsoft Translator v3.
pub struct AzureTranslator {
    http: Client,
    endpoint: String,
    key: String,
    region: String,
}

impl AzureTranslator {
    pub fn new(endpoint: &str, key: &str, region: &str) -> AppResult<Self> {
        Ok(Self {
            http: http_client()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            region: region.to_string(),
        })
    }

    fn url(&self, target: Language) -> String {
        format!("{}/translate?api-version=3.0&to={}", self.endpoint, target.code())
    }
}

#[async_trait]
impl Translator for AzureTranslator {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn translate(&self, text: &str, target: Language) -> AppResult<String> {
        if self.key.trim().is_empty() {
            return Err(AppError::Config("Missing translator API key".to_string()));
        }

        let res = self
            .http
            .post(self.url(target))
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&json!([{ "Text": text }]))
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !res.status().is_success() {
            return Err(AppError::Network(format!("Azure Translator error: {}", res.status())));
        }

        let body: Value = res
            .json()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to parse JSON: {}", e)))?;
        parse_azure_response(&body)
    }
}

/// `[{"translations":[{"text": "...", "to": "hi"}]}]`
pub(crate) fn parse_azure_response(body: &Value) -> AppResult<String> {
    body.get(0)
        .and_then(|v| v.get("translations"))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("missing translation text".to_string()))
}

/// Unofficial Google Translate endpoint, no key required.
pub struct GoogleFreeTranslator {
    http: Client,
}

impl GoogleFreeTranslator {
    pub fn new() -> AppResult<Self> {
        Ok(Self { http: http_client()? })
    }
}

#[async_trait]
impl Translator for GoogleFreeTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate(&self, text: &str, target: Language) -> AppResult<String> {
        let url = format!(
            "{}?client=gtx&sl=en&tl={}&dt=t&q={}",
            GOOGLE_FREE_URL,
            target.code(),
            urlencoding::encode(text)
        );
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        if !res.status().is_success() {
            return Err(AppError::Network(format!("Google API Error: {}", res.status())));
        }
        let raw_json: Value = res
            .json()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to parse JSON: {}", e)))?;
        parse_google_response(&raw_json)
    }
}

/// Nested arrays: `[[["Translated", "Source", ...], ...], ...]`
pub(crate) fn parse_google_response(raw_json: &Value) -> AppResult<String> {
    let sentences = raw_json
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Validation("Invalid response format from Google".to_string()))?;

    let mut result = String::new();
    for sentence in sentences {
        if let Some(segment) = sentence.get(0).and_then(|v| v.as_str()) {
            result.push_str(segment);
        }
    }
    if result.is_empty() {
        return Err(AppError::Validation("Empty translation from Google".to_string()));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_azure_response() {
        let body = json!([{ "translations": [{ "text": "रोग", "to": "hi" }] }]);
        assert_eq!(parse_azure_response(&body).unwrap(), "रोग");
    }

    #[test]
    fn test_parse_azure_malformed() {
        let body = json!({ "error": { "code": 401000, "message": "invalid key" } });
        assert!(matches!(parse_azure_response(&body), Err(AppError::Validation(_))));
        assert!(parse_azure_response(&json!([{ "translations": [] }])).is_err());
    }

    #[test]
    fn test_parse_google_concatenates_segments() {
        let body = json!([[["पहला। ", "First. ", null], ["दूसरा", "Second", null]], null, "en"]);
        assert_eq!(parse_google_response(&body).unwrap(), "पहला। दूसरा");
    }

    #[test]
    fn test_parse_google_malformed() {
        assert!(parse_google_response(&json!({})).is_err());
        assert!(parse_google_response(&json!([[]])).is_err());
    }

    #[test]
    fn test_azure_url() {
        let t = AzureTranslator::new("https://api.example.com/", "k", "centralindia").unwrap();
        assert_eq!(t.url(Language::Mr), "https://api.example.com/translate?api-version=3.0&to=mr");
    }

    #[tokio::test]
    async fn test_azure_without_key_fails_fast() {
        let t = AzureTranslator::new("https://api.example.com", "", "centralindia").unwrap();
        let err = t.translate("Error", Language::Hi).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_build_translator_by_provider() {
        let mut settings = AppSettings::default();
        assert_eq!(build_translator(&settings).unwrap().name(), "azure");

        settings.endpoints.translator_provider = "Google".to_string();
        assert_eq!(build_translator(&settings).unwrap().name(), "google");

        settings.endpoints.translator_provider = "babelfish".to_string();
        assert!(matches!(build_translator(&settings), Err(AppError::Config(_))));
    }
}
