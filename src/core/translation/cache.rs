use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::shared::types::Language;

use super::Translator;

/// Built-in phrases shipped with the client, so common labels render
/// translated without a round-trip.
const GLOSSARY: &[(&str, &str, &str)] = &[
    ("Login", "लॉग इन", "लॉगिन"),
    ("Signup", "साइन अप", "नोंदणी करा"),
    ("Email", "ईमेल", "ईमेल"),
    ("Password", "पासवर्ड", "पासवर्ड"),
    ("Upload Image", "छवि अपलोड करें", "प्रतिमा अपलोड करा"),
    ("Detect Disease", "रोग का पता लगाएं", "रोग शोधा"),
    ("Home", "होम", "मुख्यपृष्ठ"),
    ("Logout", "लॉग आउट", "बाहेर पडा"),
    ("Welcome", "स्वागत है", "स्वागत आहे"),
];

/// Translations of one source phrase.
///
/// `values[En]` is always the key itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEntry {
    pub key: String,
    pub values: HashMap<Language, String>,
}

impl TranslationEntry {
    fn new(key: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(Language::En, key.to_string());
        Self {
            key: key.to_string(),
            values,
        }
    }

    pub fn get(&self, language: Language) -> Option<&str> {
        self.values.get(&language).map(String::as_str)
    }
}

/// Session-lifetime translation memo.
///
/// Cloning is cheap and every clone shares the same entries, so one cache
/// created at the application root can be handed to every screen. Entries
/// are created lazily and never evicted.
#[derive(Clone)]
pub struct TranslationCache {
    entries: Arc<RwLock<HashMap<String, TranslationEntry>>>,
    translator: Arc<dyn Translator>,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter on every exit path of a remote call.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TranslationCache {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            translator,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Cache pre-populated with the built-in glossary.
    pub fn with_glossary(translator: Arc<dyn Translator>) -> Self {
        let cache = Self::new(translator);
        for (source, hi, mr) in GLOSSARY {
            cache.insert(source, Language::Hi, hi);
            cache.insert(source, Language::Mr, mr);
        }
        cache
    }

    /// Translate `text` into `language`.
    ///
    /// English and cache hits return without I/O. A miss issues one remote
    /// call and stores the result. Failures degrade to `text` and leave the
    /// cache untouched, so a later call retries.
    pub async fn resolve(&self, text: &str, language: Language) -> String {
        if language.is_source() {
            return text.to_string();
        }

        if let Some(hit) = self.lookup(text, language) {
            tracing::debug!(lang = %language, "[TranslationCache] hit: {:?}", text);
            return hit;
        }

        tracing::debug!(lang = %language, provider = self.translator.name(), "[TranslationCache] miss: {:?}", text);
        let _guard = InFlight::start(&self.in_flight);
        match self.translator.translate(text, language).await {
            Ok(translated) => {
                self.insert(text, language, &translated);
                translated
            }
            Err(e) => {
                tracing::warn!(lang = %language, "[TranslationCache] translation degraded for {:?}: {}", text, e);
                text.to_string()
            }
        }
    }

    /// Stored translation without touching the network.
    pub fn lookup(&self, text: &str, language: Language) -> Option<String> {
        if language.is_source() {
            return Some(text.to_string());
        }
        self.read()
            .get(text)
            .and_then(|entry| entry.get(language))
            .map(str::to_string)
    }

    pub fn contains(&self, text: &str, language: Language) -> bool {
        self.read()
            .get(text)
            .map(|entry| entry.values.contains_key(&language))
            .unwrap_or(false)
    }

    /// Store a translation, creating the entry if needed.
    ///
    /// Writes for `En` are ignored: the identity value is fixed at creation.
    pub fn insert(&self, text: &str, language: Language, translated: &str) {
        let mut entries = self.write();
        let entry = entries
            .entry(text.to_string())
            .or_insert_with(|| TranslationEntry::new(text));
        if !language.is_source() {
            entry.values.insert(language, translated.to_string());
        }
    }

    pub fn entry(&self, text: &str) -> Option<TranslationEntry> {
        self.read().get(text).cloned()
    }

    /// Number of source phrases with an entry
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry (session reset).
    pub fn clear(&self) {
        self.write().clear();
    }

    /// True while at least one remote call is outstanding.
    pub fn is_translating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, TranslationEntry>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("[TranslationCache] lock poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, TranslationEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("[TranslationCache] lock poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }
}
