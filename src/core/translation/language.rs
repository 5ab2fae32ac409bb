use std::sync::Arc;

use tokio::sync::watch;

use crate::shared::types::Language;

/// Holds the active UI language and notifies subscribers when it changes.
#[derive(Clone)]
pub struct LanguageSelector {
    tx: Arc<watch::Sender<Language>>,
}

impl LanguageSelector {
    pub fn new(initial: Language) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Language {
        *self.tx.borrow()
    }

    /// Switch language. Returns false (and notifies nobody) if unchanged.
    pub fn set(&self, language: Language) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == language {
                false
            } else {
                *current = language;
                true
            }
        });
        if changed {
            tracing::info!(lang = %language, "[LanguageSelector] active language changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.tx.subscribe()
    }
}

impl Default for LanguageSelector {
    fn default() -> Self {
        Self::new(Language::En)
    }
}
