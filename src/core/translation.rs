//! On-demand UI translation
//!
//! This module contains:
//! - `cache`: session-lifetime memo of translated strings, keyed by source text
//! - `service`: HTTP translation backends (Azure Translator, Google free endpoint)
//! - `language`: the active-language holder that consumers subscribe to
//! - `text_set`: per-screen label sets re-translated on language change

pub mod cache;
pub mod service;
pub mod language;
pub mod text_set;

pub use cache::{TranslationCache, TranslationEntry};
pub use language::LanguageSelector;
pub use service::{build_translator, AzureTranslator, GoogleFreeTranslator};
pub use text_set::{TextSnapshot, TranslatedTextSet};

use async_trait::async_trait;

use crate::shared::error::AppResult;
use crate::shared::types::Language;

/// A remote translation backend.
///
/// Source text is always English. Implementations perform exactly one
/// request per call and never retry.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    async fn translate(&self, text: &str, target: Language) -> AppResult<String>;
}
