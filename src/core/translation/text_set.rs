use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::task::{JoinHandle, JoinSet};

use crate::shared::types::Language;

use super::{LanguageSelector, TranslationCache};

/// A complete, consistently translated set of labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSnapshot {
    pub language: Language,
    pub texts: HashMap<String, String>,
}

/// Per-screen label set, re-translated whenever the active language changes.
///
/// Readers only ever see a complete batch for one language: a recomputation
/// resolves every label, then swaps the visible snapshot in one write. A
/// batch finishing after the language moved on is dropped.
#[derive(Clone)]
pub struct TranslatedTextSet {
    labels: Arc<Vec<(String, String)>>,
    cache: TranslationCache,
    selector: LanguageSelector,
    visible: Arc<RwLock<TextSnapshot>>,
}

impl TranslatedTextSet {
    /// `labels` maps logical label to English source text.
    pub fn new<I, K, V>(labels: I, cache: TranslationCache, selector: LanguageSelector) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let labels: Vec<(String, String)> = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let defaults = TextSnapshot {
            language: Language::En,
            texts: labels.iter().cloned().collect(),
        };
        Self {
            labels: Arc::new(labels),
            cache,
            selector,
            visible: Arc::new(RwLock::new(defaults)),
        }
    }

    /// Current text for `label`; unknown labels render as themselves.
    pub fn get(&self, label: &str) -> String {
        self.snapshot()
            .texts
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    pub fn snapshot(&self) -> TextSnapshot {
        match self.visible.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Translate for whatever language is active now.
    pub async fn refresh(&self) -> bool {
        self.recompute(self.selector.current()).await
    }

    /// Translate every label into `language` concurrently and publish the
    /// batch if `language` is still active when it completes.
    ///
    /// Returns whether the batch was published.
    pub async fn recompute(&self, language: Language) -> bool {
        let texts = self.translate_all(language).await;
        self.publish(language, texts)
    }

    /// Swap in a finished batch unless `language` is no longer active.
    ///
    /// The check runs under the write lock so a stale batch can never land
    /// after a newer one.
    fn publish(&self, language: Language, texts: HashMap<String, String>) -> bool {
        let mut visible = match self.visible.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.selector.current() != language {
            tracing::debug!(lang = %language, "[TranslatedTextSet] discarding stale batch");
            return false;
        }
        *visible = TextSnapshot { language, texts };
        true
    }

    /// Recompute on first mount and on every subsequent language change.
    ///
    /// Each change gets its own task so a slow batch never delays a newer
    /// one. The returned handle ends when the selector is dropped.
    pub fn follow(&self) -> JoinHandle<()> {
        let this = self.clone();
        let mut rx = self.selector.subscribe();
        tokio::spawn(async move {
            let initial = *rx.borrow_and_update();
            let first = this.clone();
            tokio::spawn(async move {
                first.recompute(initial).await;
            });

            while rx.changed().await.is_ok() {
                let language = *rx.borrow_and_update();
                let set = this.clone();
                tokio::spawn(async move {
                    set.recompute(language).await;
                });
            }
        })
    }

    async fn translate_all(&self, language: Language) -> HashMap<String, String> {
        if language.is_source() {
            return self.defaults();
        }

        let mut tasks = JoinSet::new();
        for (label, source) in self.labels.iter().cloned() {
            let cache = self.cache.clone();
            tasks.spawn(async move {
                let text = cache.resolve(&source, language).await;
                (label, text)
            });
        }

        let mut texts = HashMap::with_capacity(self.labels.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((label, text)) => {
                    texts.insert(label, text);
                }
                Err(e) => {
                    tracing::warn!(lang = %language, "[TranslatedTextSet] label task failed, using defaults: {}", e);
                    tasks.abort_all();
                    return self.defaults();
                }
            }
        }
        texts
    }

    fn defaults(&self) -> HashMap<String, String> {
        self.labels.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::FakeTranslator;

    fn page_labels() -> Vec<(&'static str, &'static str)> {
        vec![
            ("title", "Plant Disease Detection"),
            ("upload_button", "Analyze Image"),
            ("try_again", "Try Again"),
        ]
    }

    #[tokio::test]
    async fn test_starts_with_english_defaults() {
        let cache = TranslationCache::new(FakeTranslator::new());
        let set = TranslatedTextSet::new(page_labels(), cache, LanguageSelector::default());

        assert_eq!(set.get("title"), "Plant Disease Detection");
        assert_eq!(set.get("missing"), "missing");
        assert_eq!(set.snapshot().language, Language::En);
    }

    #[tokio::test]
    async fn test_refresh_translates_whole_set() {
        let translator = FakeTranslator::new();
        let selector = LanguageSelector::default();
        let set = TranslatedTextSet::new(page_labels(), TranslationCache::new(translator.clone()), selector.clone());

        selector.set(Language::Hi);
        assert!(set.refresh().await);

        let snapshot = set.snapshot();
        assert_eq!(snapshot.language, Language::Hi);
        assert_eq!(snapshot.texts["upload_button"], "[hi] Analyze Image");
        assert_eq!(snapshot.texts.len(), 3);
        assert_eq!(translator.calls(), 3);

        // Back to English needs no calls
        selector.set(Language::En);
        assert!(set.refresh().await);
        assert_eq!(set.get("try_again"), "Try Again");
        assert_eq!(translator.calls(), 3);
    }

    #[tokio::test]
    async fn test_stale_batch_is_discarded() {
        let translator = FakeTranslator::new();
        let hi_gate = translator.gate(Language::Hi);
        let selector = LanguageSelector::default();
        let set = TranslatedTextSet::new(page_labels(), TranslationCache::new(translator.clone()), selector.clone());

        selector.set(Language::Hi);
        let slow = {
            let set = set.clone();
            tokio::spawn(async move { set.recompute(Language::Hi).await })
        };
        while translator.calls() < 3 {
            tokio::task::yield_now().await;
        }

        selector.set(Language::Mr);
        assert!(set.recompute(Language::Mr).await);

        hi_gate.add_permits(3);
        assert!(!slow.await.unwrap());

        let snapshot = set.snapshot();
        assert_eq!(snapshot.language, Language::Mr);
        assert!(snapshot.texts.values().all(|t| t.starts_with("[mr] ")));
    }

    #[test]
    fn test_publish_rejects_inactive_language() {
        let selector = LanguageSelector::default();
        let set = TranslatedTextSet::new(page_labels(), TranslationCache::new(FakeTranslator::new()), selector.clone());

        selector.set(Language::Mr);
        let marathi: HashMap<String, String> = [("title".to_string(), "[mr] Plant Disease Detection".to_string())].into();
        assert!(set.publish(Language::Mr, marathi));

        let hindi: HashMap<String, String> = [("title".to_string(), "[hi] Plant Disease Detection".to_string())].into();
        assert!(!set.publish(Language::Hi, hindi));
        assert_eq!(set.snapshot().language, Language::Mr);
        assert_eq!(set.get("title"), "[mr] Plant Disease Detection");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_batches_settle_on_latest_language() {
        let selector = LanguageSelector::default();
        let set = TranslatedTextSet::new(page_labels(), TranslationCache::new(FakeTranslator::new()), selector.clone());

        for _ in 0..200 {
            selector.set(Language::Hi);
            let older = {
                let set = set.clone();
                tokio::spawn(async move { set.recompute(Language::Hi).await })
            };
            selector.set(Language::Mr);
            let newer = {
                let set = set.clone();
                tokio::spawn(async move { set.recompute(Language::Mr).await })
            };
            older.await.unwrap();
            assert!(newer.await.unwrap());

            let snapshot = set.snapshot();
            assert_eq!(snapshot.language, Language::Mr);
            assert!(snapshot.texts.values().all(|t| t.starts_with("[mr] ")));
        }
    }

    #[tokio::test]
    async fn test_follow_tracks_rapid_switches() {
        let translator = FakeTranslator::new();
        let hi_gate = translator.gate(Language::Hi);
        let selector = LanguageSelector::default();
        let set = TranslatedTextSet::new(page_labels(), TranslationCache::new(translator.clone()), selector.clone());
        let follower = set.follow();

        selector.set(Language::Hi);
        while translator.calls() < 3 {
            tokio::task::yield_now().await;
        }
        selector.set(Language::Mr);
        while set.snapshot().language != Language::Mr {
            tokio::task::yield_now().await;
        }

        hi_gate.add_permits(3);
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        let snapshot = set.snapshot();
        assert_eq!(snapshot.language, Language::Mr);
        assert!(snapshot.texts.values().all(|t| t.starts_with("[mr] ")));
        follower.abort();
    }
}
