use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::core::auth::Session;
use crate::core::translation::TranslationCache;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::Language;

use super::parser::{parse_diagnosis, ParsedDiagnosis, TranslatedDiagnosis};
use super::preview::{PreviewHandle, PreviewStore};
use super::{DiseaseDetector, SelectedImage};

/// Shown for every upload failure; the technical cause is only logged.
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to analyze the image. Please try again.";

/// Where the current detection request stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum DetectionStage {
    Idle,
    ImageSelected { file_name: String, preview_id: Uuid },
    Uploading,
    Succeeded { raw: String, diagnosis: ParsedDiagnosis },
    Failed { message: String },
}

/// Display-ready snapshot of the pipeline for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineView {
    pub language: Language,
    pub generation: u64,
    pub stage: DetectionStage,
    pub preview_url: Option<String>,
    /// Translated, set when `Failed`
    pub error_message: Option<String>,
    /// Translated, set when `Succeeded`
    pub diagnosis: Option<TranslatedDiagnosis>,
}

struct PipelineState {
    stage: DetectionStage,
    image: Option<SelectedImage>,
    preview: Option<PreviewHandle>,
    /// Bumped on every selection and reset; results of older uploads are dropped.
    generation: u64,
    upload_in_flight: bool,
}

/// Held for the duration of one upload. Clears the in-flight flag however
/// the upload ends; if it ends without a recorded outcome (the `analyze`
/// future was dropped) and nothing was selected since, the stage goes back
/// to `ImageSelected` so the image can be analyzed again.
struct UploadGuard {
    state: Arc<Mutex<PipelineState>>,
    generation: u64,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.upload_in_flight = false;
        if state.generation != self.generation || state.stage != DetectionStage::Uploading {
            return;
        }
        tracing::info!(generation = self.generation, "[DetectionPipeline] upload abandoned");
        state.stage = match (&state.image, &state.preview) {
            (Some(image), Some(preview)) => DetectionStage::ImageSelected {
                file_name: image.file_name.clone(),
                preview_id: preview.id(),
            },
            _ => DetectionStage::Idle,
        };
    }
}

/// Lifecycle of one image analysis: select, upload, parse, translate.
///
/// Clones share state. The preview resource is released on a new
/// selection, on reset, and when the last clone is dropped.
#[derive(Clone)]
pub struct DetectionPipeline {
    state: Arc<Mutex<PipelineState>>,
    detector: Arc<dyn DiseaseDetector>,
    cache: TranslationCache,
    previews: PreviewStore,
}

impl DetectionPipeline {
    /// Only available to a signed-in session.
    pub fn new(
        session: &Session,
        detector: Arc<dyn DiseaseDetector>,
        cache: TranslationCache,
        previews: PreviewStore,
    ) -> AppResult<Self> {
        if !session.is_authenticated() {
            return Err(AppError::Auth("Sign in to analyze plant images".to_string()));
        }
        Ok(Self {
            state: Arc::new(Mutex::new(PipelineState {
                stage: DetectionStage::Idle,
                image: None,
                preview: None,
                generation: 0,
                upload_in_flight: false,
            })),
            detector,
            cache,
            previews,
        })
    }

    pub fn stage(&self) -> DetectionStage {
        self.lock().stage.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn selected_image(&self) -> Option<SelectedImage> {
        self.lock().image.clone()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.lock().preview.as_ref().map(PreviewHandle::url)
    }

    /// Whether the "analyze" action is enabled.
    pub fn can_analyze(&self) -> bool {
        let state = self.lock();
        matches!(state.stage, DetectionStage::ImageSelected { .. }) && !state.upload_in_flight
    }

    /// Select a new image from any stage, discarding prior result, error and preview.
    pub fn select_image(&self, image: SelectedImage) {
        let preview = self.previews.allocate(&image.file_name);
        let mut state = self.lock();
        state.generation += 1;
        state.stage = DetectionStage::ImageSelected {
            file_name: image.file_name.clone(),
            preview_id: preview.id(),
        };
        state.image = Some(image);
        // Replacing the handle revokes the previous preview
        state.preview = Some(preview);
        tracing::info!(generation = state.generation, "[DetectionPipeline] image selected");
    }

    /// Upload the selected image and record the outcome.
    ///
    /// Returns the stage after the upload settles. Upload failures land in
    /// `Failed` and are not returned as errors; `Err` only means there was
    /// nothing to analyze or an upload is already running.
    pub async fn analyze(&self) -> AppResult<DetectionStage> {
        let (image, generation) = {
            let mut state = self.lock();
            if state.upload_in_flight {
                return Err(AppError::Validation("An upload is already in progress".to_string()));
            }
            let image = match (&state.stage, &state.image) {
                (DetectionStage::ImageSelected { .. }, Some(image)) => image.clone(),
                _ => return Err(AppError::Validation("Please select an image first".to_string())),
            };
            state.stage = DetectionStage::Uploading;
            state.upload_in_flight = true;
            (image, state.generation)
        };
        let _upload = UploadGuard {
            state: self.state.clone(),
            generation,
        };
        tracing::info!(generation, file = %image.file_name, "[DetectionPipeline] uploading");

        let outcome = self.detector.detect(&image).await;

        // Declared after `_upload`, so released before the guard runs
        let mut state = self.lock();
        if state.generation != generation {
            tracing::info!(generation, "[DetectionPipeline] discarding result of superseded upload");
            return Ok(state.stage.clone());
        }

        state.stage = match outcome {
            Ok(raw) => {
                let diagnosis = parse_diagnosis(&raw);
                tracing::info!(disease = %diagnosis.disease_name, "[DetectionPipeline] analysis succeeded");
                DetectionStage::Succeeded { raw, diagnosis }
            }
            Err(e) => {
                tracing::warn!("[DetectionPipeline] analysis failed: {}", e);
                DetectionStage::Failed {
                    message: UPLOAD_FAILED_MESSAGE.to_string(),
                }
            }
        };
        Ok(state.stage.clone())
    }

    /// Back to `Idle`, releasing the preview.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.stage = DetectionStage::Idle;
        state.image = None;
        state.preview = None;
        tracing::info!(generation = state.generation, "[DetectionPipeline] reset");
    }

    /// Snapshot with error message and diagnosis translated into `language`.
    pub async fn view(&self, language: Language) -> PipelineView {
        let (stage, generation, preview_url) = {
            let state = self.lock();
            (
                state.stage.clone(),
                state.generation,
                state.preview.as_ref().map(PreviewHandle::url),
            )
        };

        let error_message = match &stage {
            DetectionStage::Failed { message } => Some(self.cache.resolve(message, language).await),
            _ => None,
        };
        let diagnosis = match &stage {
            DetectionStage::Succeeded { diagnosis, .. } => {
                Some(translate_diagnosis(&self.cache, diagnosis, language).await)
            }
            _ => None,
        };

        PipelineView {
            language,
            generation,
            stage,
            preview_url,
            error_message,
            diagnosis,
        }
    }

    /// A view is current if nothing was selected or reset since it was
    /// taken and it is in the active language.
    pub fn is_current(&self, view: &PipelineView, active: Language) -> bool {
        let state = self.lock();
        view.generation == state.generation && view.language == active && view.stage == state.stage
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("[DetectionPipeline] state mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }
}

/// Translate the disease name and every treatment step concurrently.
/// Confidence is numeric and passes through.
pub async fn translate_diagnosis(
    cache: &TranslationCache,
    diagnosis: &ParsedDiagnosis,
    language: Language,
) -> TranslatedDiagnosis {
    if language.is_source() {
        return TranslatedDiagnosis {
            disease_name: diagnosis.disease_name.clone(),
            confidence: diagnosis.confidence,
            treatment_steps: diagnosis.treatment_steps.clone(),
        };
    }

    // Slot 0 is the disease name, the rest are steps in order
    let sources: Vec<String> = std::iter::once(diagnosis.disease_name.clone())
        .chain(diagnosis.treatment_steps.iter().cloned())
        .collect();
    let mut translated = sources.clone();

    let mut tasks = JoinSet::new();
    for (index, source) in sources.into_iter().enumerate() {
        let cache = cache.clone();
        tasks.spawn(async move { (index, cache.resolve(&source, language).await) });
    }
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, text)) => translated[index] = text,
            Err(e) => tracing::warn!(lang = %language, "[DetectionPipeline] diagnosis translation task failed: {}", e),
        }
    }

    let mut parts = translated.into_iter();
    TranslatedDiagnosis {
        disease_name: parts.next().unwrap_or_default(),
        confidence: diagnosis.confidence,
        treatment_steps: parts.collect(),
    }
}
