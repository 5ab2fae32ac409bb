//! In-process fakes for the remote services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::core::detection::{DiseaseDetector, SelectedImage};
use crate::core::translation::Translator;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::Language;

/// Translates to `"[code] text"` and counts calls.
///
/// A language can be gated: calls for it block until permits are added.
pub struct FakeTranslator {
    calls: AtomicUsize,
    fail: bool,
    gates: Mutex<HashMap<Language, Arc<Semaphore>>>,
}

impl FakeTranslator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Block calls for `language` until permits are added to the returned semaphore.
    pub fn gate(&self, language: Language) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(language, gate.clone());
        gate
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn translate(&self, text: &str, target: Language) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(&target).cloned();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.map_err(|e| AppError::Unknown(e.to_string()))?;
            permit.forget();
        } else {
            tokio::task::yield_now().await;
        }
        if self.fail {
            return Err(AppError::Network("translator unreachable".to_string()));
        }
        Ok(format!("[{}] {}", target.code(), text))
    }
}

/// Returns a fixed outcome for every upload.
pub struct FakeDetector {
    calls: AtomicUsize,
    outcome: AppResult<String>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeDetector {
    pub fn succeeding(raw: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Ok(raw.to_string()),
            gate: None,
        })
    }

    pub fn failing(err: AppError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Err(err),
            gate: None,
        })
    }

    /// Like `succeeding`, but each upload waits for a permit on the returned semaphore.
    pub fn gated(raw: &str) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let detector = Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Ok(raw.to_string()),
            gate: Some(gate.clone()),
        });
        (detector, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiseaseDetector for FakeDetector {
    async fn detect(&self, _image: &SelectedImage) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|e| AppError::Unknown(e.to_string()))?;
            permit.forget();
        }
        self.outcome.clone()
    }
}

pub fn png(name: &str) -> SelectedImage {
    SelectedImage::new(name, "image/png", vec![0x89, b'P', b'N', b'G']).unwrap()
}
