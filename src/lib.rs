//! PlantCare client core.
//!
//! `AppContext` is the application root: it owns the translation cache,
//! the active language and the auth session, and hands them to the screens
//! that need them.

pub mod shared;
pub mod core;

use std::sync::Arc;

use crate::core::auth::{AuthClient, Session};
use crate::core::detection::{DetectionPipeline, DiseaseDetector, HttpDiseaseDetector, PreviewStore};
use crate::core::translation::{build_translator, LanguageSelector, TranslatedTextSet, TranslationCache, Translator};
use crate::shared::error::AppResult;
use crate::shared::settings::AppSettings;
use crate::shared::types::{Language, UserIdentity};

pub use crate::shared::error::AppError;

pub struct AppContext {
    settings: AppSettings,
    cache: TranslationCache,
    language: LanguageSelector,
    session: Session,
    previews: PreviewStore,
    auth: AuthClient,
    detector: Arc<dyn DiseaseDetector>,
}

impl AppContext {
    /// Wire the HTTP-backed services described by `settings`.
    pub fn from_settings(settings: AppSettings) -> AppResult<Self> {
        let translator = build_translator(&settings)?;
        let detector: Arc<dyn DiseaseDetector> = Arc::new(HttpDiseaseDetector::from_settings(&settings)?);
        let auth = AuthClient::new(&settings.endpoints.api_base_url)?;
        Ok(Self::with_services(settings, translator, detector, auth))
    }

    /// Load settings from disk (defaults if absent) and wire services.
    pub async fn load() -> AppResult<Self> {
        let settings = AppSettings::load().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            AppSettings::default()
        });
        Self::from_settings(settings)
    }

    pub fn with_services(
        settings: AppSettings,
        translator: Arc<dyn Translator>,
        detector: Arc<dyn DiseaseDetector>,
        auth: AuthClient,
    ) -> Self {
        let language = LanguageSelector::new(settings.preferences.language);
        Self {
            cache: TranslationCache::with_glossary(translator),
            language,
            session: Session::new(),
            previews: PreviewStore::new(),
            auth,
            detector,
            settings,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn language(&self) -> &LanguageSelector {
        &self.language
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    /// Switch the UI language and remember it as the preference.
    pub fn set_language(&mut self, language: Language) -> bool {
        self.settings.preferences.language = language;
        self.language.set(language)
    }

    /// Persist the current settings (language preference included).
    pub async fn save_settings(&self) -> AppResult<()> {
        self.settings.save().await
    }

    /// Translate a one-off string in the active language.
    pub async fn translate(&self, text: &str) -> String {
        self.cache.resolve(text, self.language.current()).await
    }

    /// Label set for a screen, bound to the shared cache and language.
    pub fn text_set<I, K, V>(&self, labels: I) -> TranslatedTextSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        TranslatedTextSet::new(labels, self.cache.clone(), self.language.clone())
    }

    /// Detection pipeline for the signed-in user.
    pub fn detection_pipeline(&self) -> AppResult<DetectionPipeline> {
        DetectionPipeline::new(&self.session, self.detector.clone(), self.cache.clone(), self.previews.clone())
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserIdentity> {
        let user = self.auth.login(email, password).await?;
        self.session.sign_in(user.clone());
        Ok(user)
    }

    pub async fn signup(&self, email: &str, password: &str) -> AppResult<UserIdentity> {
        let user = self.auth.signup(email, password).await?;
        self.session.sign_in(user.clone());
        Ok(user)
    }

    pub async fn google_login(&self, credential: &str) -> AppResult<UserIdentity> {
        let user = self.auth.google_login(credential).await?;
        self.session.sign_in(user.clone());
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.logout();
    }
}

/// Install the global tracing subscriber.
pub fn init_logging() -> AppResult<()> {
    shared::logging::init()
}
