use std::sync::Arc;

use crate::artifact::ImageArtifact;
use crate::catalog::{Feature, FeatureCatalog, FeatureKind};
use crate::generation::{
    build_edit_request, build_text_to_image_prompt, GenerationBackend, GenerationRequest,
    GenerationResult,
};
use crate::geometry::{
    map_to_native, DisplayPoint, DisplayRect, DisplaySize, Hotspot, ImageBounds, ScaleFactors,
};
use crate::history::History;
use crate::state::{SessionEvent, SessionPhase, StateMachine};

use super::crop::{crop_artifact, CropPreset, CropTool};
use super::error::{SelectionIssue, SessionError, SessionResult};
use super::retention::{PromptRetention, PromptRetentionPolicy};

#[derive(Debug, Clone)]
enum GenerationJob {
    Edit {
        source: ImageArtifact,
        request: GenerationRequest,
    },
    TextToImage {
        prompt: String,
    },
}

/// A generation that has left `Idle` and owns everything the backend call needs.
///
/// Awaiting [`PendingGeneration::execute`] does not borrow the session, so the
/// caller can keep handling navigation while the call is outstanding.
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    epoch: u64,
    prompt_kind: Option<FeatureKind>,
    label: String,
    job: GenerationJob,
}

impl PendingGeneration {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_text_to_image(&self) -> bool {
        matches!(self.job, GenerationJob::TextToImage { .. })
    }

    pub fn request(&self) -> Option<&GenerationRequest> {
        match &self.job {
            GenerationJob::Edit { request, .. } => Some(request),
            GenerationJob::TextToImage { .. } => None,
        }
    }

    pub fn text_prompt(&self) -> Option<&str> {
        match &self.job {
            GenerationJob::Edit { .. } => None,
            GenerationJob::TextToImage { prompt } => Some(prompt),
        }
    }

    pub async fn execute<B>(self, backend: &B) -> CompletedGeneration
    where
        B: GenerationBackend + ?Sized,
    {
        let text_to_image = self.is_text_to_image();
        let result = match &self.job {
            GenerationJob::Edit { source, request } => backend.edit_image(source, request).await,
            GenerationJob::TextToImage { prompt } => backend.generate_from_text(prompt).await,
        };
        CompletedGeneration {
            epoch: self.epoch,
            prompt_kind: self.prompt_kind,
            label: self.label,
            text_to_image,
            result,
        }
    }
}

#[derive(Debug)]
pub struct CompletedGeneration {
    epoch: u64,
    prompt_kind: Option<FeatureKind>,
    label: String,
    text_to_image: bool,
    result: GenerationResult<ImageArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Committed(ImageArtifact),
    /// The displayed image changed while the call was in flight; the result was dropped.
    Discarded,
}

/// Owns the edit history and every piece of UI-facing state around it.
#[derive(Debug)]
pub struct EditSession {
    catalog: Arc<FeatureCatalog>,
    retention: PromptRetentionPolicy,
    history: History,
    machine: StateMachine,
    selected_feature: Feature,
    prompt: String,
    references: Vec<ImageArtifact>,
    map_style: Option<String>,
    hotspot: Option<Hotspot>,
    display_hotspot: Option<DisplayPoint>,
    error: Option<String>,
    crop: CropTool,
    gallery: Vec<ImageArtifact>,
    epoch: u64,
}

impl EditSession {
    pub fn new(catalog: Arc<FeatureCatalog>, retention: PromptRetentionPolicy) -> Self {
        let selected_feature = catalog.default_feature().clone();
        Self {
            catalog,
            retention,
            history: History::new(),
            machine: StateMachine::new(),
            selected_feature,
            prompt: String::new(),
            references: Vec::new(),
            map_style: None,
            hotspot: None,
            display_hotspot: None,
            error: None,
            crop: CropTool::default(),
            gallery: Vec::new(),
            epoch: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.state()
    }

    pub fn is_loading(&self) -> bool {
        self.phase().is_generating()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn current(&self) -> Option<&ImageArtifact> {
        self.history.current()
    }

    pub fn original(&self) -> Option<&ImageArtifact> {
        self.history.original()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn hotspot(&self) -> Option<Hotspot> {
        self.hotspot
    }

    pub fn display_hotspot(&self) -> Option<DisplayPoint> {
        self.display_hotspot
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn selected_feature(&self) -> &Feature {
        &self.selected_feature
    }

    pub fn reference_images(&self) -> &[ImageArtifact] {
        &self.references
    }

    pub fn map_style(&self) -> Option<&str> {
        self.map_style.as_deref()
    }

    pub fn crop_tool(&self) -> &CropTool {
        &self.crop
    }

    pub fn gallery(&self) -> &[ImageArtifact] {
        &self.gallery
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn download_name(&self) -> Option<String> {
        self.current().map(ImageArtifact::download_name)
    }

    pub fn is_ready_to_generate(&self) -> bool {
        if self.is_loading() {
            return false;
        }
        let feature = &self.selected_feature;
        if feature.runs_immediately() {
            return self.current().is_some();
        }
        let has_prompt = !self.prompt.trim().is_empty();
        match feature.kind {
            FeatureKind::Map => has_prompt,
            FeatureKind::Localized => has_prompt && self.hotspot.is_some() && self.current().is_some(),
            FeatureKind::Global | FeatureKind::Instant => has_prompt && self.current().is_some(),
        }
    }

    pub fn select_feature(&mut self, name: &str) -> SessionResult<&Feature> {
        let feature = self.catalog.feature(name)?.clone();
        tracing::debug!(feature = %feature.name, kind = feature.kind.label(), "feature selected");
        self.select(feature);
        Ok(&self.selected_feature)
    }

    /// Selects the freeform whole-image feature offered outside the categories.
    pub fn select_generative_layer(&mut self) -> &Feature {
        let feature = self.catalog.generative_layer().clone();
        self.select(feature);
        &self.selected_feature
    }

    fn select(&mut self, feature: Feature) {
        let keeps_style = self
            .map_style
            .as_deref()
            .is_some_and(|style| feature.offers_style(style));
        if !keeps_style {
            self.map_style = feature.default_style().map(str::to_string);
        }
        self.selected_feature = feature;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_map_style(&mut self, style: &str) -> SessionResult<()> {
        if !self.selected_feature.offers_style(style) {
            return Err(SessionError::InvalidSelection(SelectionIssue::UnknownStyle {
                feature: self.selected_feature.name.clone(),
                style: style.to_string(),
            }));
        }
        self.map_style = Some(style.to_string());
        Ok(())
    }

    pub fn set_reference_images(&mut self, references: Vec<ImageArtifact>) {
        self.references = references;
    }

    pub fn add_reference_image(&mut self, reference: ImageArtifact) {
        self.references.push(reference);
    }

    pub fn clear_reference_images(&mut self) {
        self.references.clear();
    }

    /// Records a click on the displayed image as the edit hotspot.
    ///
    /// Ignored (returns `None`) when the selected feature does not take a hotspot.
    pub fn select_hotspot(
        &mut self,
        click: DisplayPoint,
        displayed: DisplaySize,
        natural: ImageBounds,
    ) -> Option<Hotspot> {
        if !self.selected_feature.kind.requires_hotspot() {
            return None;
        }
        let hotspot = map_to_native(click, displayed, natural);
        tracing::debug!(?click, ?hotspot, "edit hotspot selected");
        self.display_hotspot = Some(click);
        self.hotspot = Some(hotspot);
        Some(hotspot)
    }

    pub fn dismiss_error(&mut self) {
        if self.phase() == SessionPhase::Error {
            self.error = None;
            self.apply(SessionEvent::Dismiss);
        }
    }

    /// Starts a new session from `artifact` (a freshly picked file).
    pub fn load_image(&mut self, artifact: ImageArtifact) {
        tracing::info!(name = %artifact.name(), mime = %artifact.mime(), "image loaded");
        self.history.replace_all(artifact);
        self.crop.reset();
        self.navigated();
    }

    /// Drops the whole session so a new image can be picked.
    pub fn upload_new(&mut self) {
        self.history.clear();
        self.prompt.clear();
        self.references.clear();
        self.crop.reset();
        self.navigated();
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.navigated();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.navigated();
        }
        moved
    }

    pub fn reset(&mut self) -> bool {
        let moved = self.history.reset_to_original();
        if moved {
            self.navigated();
        }
        moved
    }

    pub fn save_to_gallery(&mut self) -> bool {
        let Some(current) = self.current().cloned() else {
            return false;
        };
        tracing::info!(name = %current.name(), "saved to gallery");
        self.gallery.insert(0, current);
        true
    }

    /// Every change of the displayed image supersedes an in-flight generation.
    fn navigated(&mut self) {
        self.epoch += 1;
        self.hotspot = None;
        self.display_hotspot = None;
        self.error = None;
        self.apply(SessionEvent::Navigate);
    }

    pub fn set_crop_selection(&mut self, selection: Option<DisplayRect>) {
        self.crop.set_selection(selection);
    }

    pub fn set_crop_preset(&mut self, preset: CropPreset, displayed: DisplaySize) {
        self.crop.set_preset(preset, displayed);
    }

    /// Crops the current image to the pending selection and commits the result.
    pub fn apply_crop(&mut self, scale: ScaleFactors) -> SessionResult<&ImageArtifact> {
        if self.is_loading() {
            return Err(SessionError::GenerationInFlight);
        }
        let Some(selection) = self.crop.selection() else {
            return Err(self.reject(SessionError::NoCropSelected));
        };
        let Some(current) = self.current() else {
            return Err(self.reject(SessionError::NoImageLoaded));
        };

        let cropped = match crop_artifact(current, selection, scale) {
            Ok(cropped) => cropped,
            Err(err) => return Err(self.reject(SessionError::Crop(err))),
        };
        tracing::info!(name = %cropped.name(), "crop committed");
        self.history.commit(cropped);
        self.crop.set_selection(None);
        self.navigated();
        self.current().ok_or(SessionError::NoImageLoaded)
    }

    /// Checks readiness for the selected feature and leaves `Idle`.
    pub fn prepare_generate(&mut self) -> SessionResult<PendingGeneration> {
        self.ensure_not_generating()?;
        let feature = self.selected_feature.clone();

        if feature.runs_immediately() {
            return self.prepare_instant_feature(&feature);
        }

        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(self.reject(SessionError::InvalidSelection(SelectionIssue::MissingPrompt)));
        }

        if feature.kind == FeatureKind::Map {
            let style = self
                .map_style
                .as_deref()
                .filter(|style| feature.offers_style(style))
                .or_else(|| feature.default_style());
            let text = build_text_to_image_prompt(&feature.system_instruction, &self.prompt, style);
            return self.start(PendingGeneration {
                epoch: self.epoch,
                prompt_kind: Some(FeatureKind::Map),
                label: feature.name.clone(),
                job: GenerationJob::TextToImage { prompt: text },
            });
        }

        let Some(source) = self.current().cloned() else {
            return Err(self.reject(SessionError::NoImageLoaded));
        };
        let hotspot = match feature.kind {
            FeatureKind::Localized => match self.hotspot {
                Some(hotspot) => Some(hotspot),
                None => {
                    return Err(self.reject(SessionError::InvalidSelection(
                        SelectionIssue::MissingHotspot,
                    )))
                }
            },
            _ => None,
        };

        let request = build_edit_request(
            &source,
            &feature.system_instruction,
            &self.prompt,
            hotspot,
            &self.references,
        );
        self.start(PendingGeneration {
            epoch: self.epoch,
            prompt_kind: Some(feature.kind),
            label: feature.name.clone(),
            job: GenerationJob::Edit { source, request },
        })
    }

    pub fn prepare_instant(&mut self, feature_name: &str) -> SessionResult<PendingGeneration> {
        self.ensure_not_generating()?;
        let feature = match self.catalog.feature(feature_name) {
            Ok(feature) => feature.clone(),
            Err(err) => return Err(self.reject(SessionError::Catalog(err))),
        };
        if !feature.runs_immediately() {
            return Err(self.reject(SessionError::InvalidSelection(
                SelectionIssue::NotInstant(feature.name),
            )));
        }
        self.prepare_instant_feature(&feature)
    }

    fn prepare_instant_feature(&mut self, feature: &Feature) -> SessionResult<PendingGeneration> {
        let Some(source) = self.current().cloned() else {
            return Err(self.reject(SessionError::NoImageLoaded));
        };
        let instant_prompt = feature.instant_prompt.as_deref().unwrap_or_default();
        let request = build_edit_request(
            &source,
            &feature.system_instruction,
            instant_prompt,
            None,
            &self.references,
        );
        self.start(PendingGeneration {
            epoch: self.epoch,
            prompt_kind: None,
            label: feature.name.clone(),
            job: GenerationJob::Edit { source, request },
        })
    }

    pub fn prepare_filter(&mut self, filter_name: &str) -> SessionResult<PendingGeneration> {
        self.ensure_not_generating()?;
        let filter = match self.catalog.filter(filter_name) {
            Ok(filter) => filter.clone(),
            Err(err) => return Err(self.reject(SessionError::Catalog(err))),
        };
        let Some(source) = self.current().cloned() else {
            return Err(self.reject(SessionError::NoImageLoaded));
        };
        let request = build_edit_request(
            &source,
            self.catalog.filter_instruction(),
            &filter.prompt,
            None,
            &self.references,
        );
        self.start(PendingGeneration {
            epoch: self.epoch,
            prompt_kind: None,
            label: format!("{} filter", filter.name),
            job: GenerationJob::Edit { source, request },
        })
    }

    fn ensure_not_generating(&self) -> SessionResult<()> {
        if self.is_loading() {
            tracing::warn!("generation requested while another is in flight");
            return Err(SessionError::GenerationInFlight);
        }
        Ok(())
    }

    fn start(&mut self, pending: PendingGeneration) -> SessionResult<PendingGeneration> {
        self.machine.transition(SessionEvent::Generate)?;
        self.error = None;
        tracing::info!(label = %pending.label, epoch = pending.epoch, "generation started");
        Ok(pending)
    }

    /// Records a failed precondition as the visible error and returns it.
    fn reject(&mut self, err: SessionError) -> SessionError {
        tracing::warn!(%err, "action rejected");
        self.error = Some(err.to_string());
        self.apply(SessionEvent::Reject);
        err
    }

    fn apply(&mut self, event: SessionEvent) {
        debug_assert!(
            self.machine.can_transition(event),
            "{event:?} refused in {:?}",
            self.machine.state()
        );
        if let Err(err) = self.machine.transition(event) {
            tracing::warn!(%err, "session event ignored");
        }
    }

    /// Settles a finished generation: commit on success, surface the error otherwise.
    pub fn complete(&mut self, completed: CompletedGeneration) -> SessionResult<GenerationOutcome> {
        let CompletedGeneration {
            epoch,
            prompt_kind,
            label,
            text_to_image,
            result,
        } = completed;

        if epoch != self.epoch || !self.is_loading() {
            tracing::warn!(
                label = %label,
                epoch,
                current_epoch = self.epoch,
                "discarding generation result for a superseded image"
            );
            if self.is_loading() {
                self.machine.transition(SessionEvent::Discard)?;
            }
            return Ok(GenerationOutcome::Discarded);
        }

        self.hotspot = None;
        self.display_hotspot = None;
        let succeeded = result.is_ok();
        if let Some(kind) = prompt_kind {
            if self.retention.rule(kind).for_outcome(succeeded) == PromptRetention::Clear {
                self.prompt.clear();
            }
        }

        match result {
            Ok(artifact) => {
                if text_to_image {
                    self.history.replace_all(artifact.clone());
                    self.epoch += 1;
                } else {
                    self.history.commit(artifact.clone());
                }
                self.machine.transition(SessionEvent::Succeed)?;
                tracing::info!(label = %label, name = %artifact.name(), "generation committed");
                Ok(GenerationOutcome::Committed(artifact))
            }
            Err(err) => {
                let err = SessionError::Generation(err);
                tracing::error!(label = %label, %err, "generation failed");
                self.error = Some(err.to_string());
                self.machine.transition(SessionEvent::Fail)?;
                Err(err)
            }
        }
    }

    /// Generates with the selected feature, prompt, hotspot and references.
    pub async fn generate<B>(&mut self, backend: &B) -> SessionResult<GenerationOutcome>
    where
        B: GenerationBackend + ?Sized,
    {
        let pending = self.prepare_generate()?;
        let completed = pending.execute(backend).await;
        self.complete(completed)
    }

    pub async fn apply_instant<B>(
        &mut self,
        backend: &B,
        feature_name: &str,
    ) -> SessionResult<GenerationOutcome>
    where
        B: GenerationBackend + ?Sized,
    {
        let pending = self.prepare_instant(feature_name)?;
        let completed = pending.execute(backend).await;
        self.complete(completed)
    }

    pub async fn apply_filter<B>(
        &mut self,
        backend: &B,
        filter_name: &str,
    ) -> SessionResult<GenerationOutcome>
    where
        B: GenerationBackend + ?Sized,
    {
        let pending = self.prepare_filter(filter_name)?;
        let completed = pending.execute(backend).await;
        self.complete(completed)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;
    use crate::catalog::CatalogError;
    use crate::generation::GenerationError;

    #[derive(Default)]
    struct FakeBackend {
        calls: AtomicUsize,
        edit_requests: Mutex<Vec<GenerationRequest>>,
        text_prompts: Mutex<Vec<String>>,
        block_reason: Option<String>,
    }

    impl FakeBackend {
        fn blocking(reason: &str) -> Self {
            Self {
                block_reason: Some(reason.to_string()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_edit(&self) -> GenerationRequest {
            self.edit_requests
                .lock()
                .expect("lock")
                .last()
                .cloned()
                .expect("an edit request was sent")
        }

        fn outcome(&self, prefix: &str) -> GenerationResult<ImageArtifact> {
            match &self.block_reason {
                Some(reason) => Err(GenerationError::RequestBlocked {
                    reason: reason.clone(),
                    detail: None,
                }),
                None => Ok(ImageArtifact::generated(prefix, "image/png", vec![7u8; 4])),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn edit_image(
            &self,
            _source: &ImageArtifact,
            request: &GenerationRequest,
        ) -> GenerationResult<ImageArtifact> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.edit_requests.lock().expect("lock").push(request.clone());
            self.outcome("edited")
        }

        async fn generate_from_text(&self, prompt: &str) -> GenerationResult<ImageArtifact> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text_prompts.lock().expect("lock").push(prompt.to_string());
            self.outcome("generated")
        }
    }

    fn session() -> EditSession {
        let catalog = FeatureCatalog::builtin().expect("builtin catalog should load");
        EditSession::new(Arc::new(catalog), PromptRetentionPolicy::default())
    }

    fn artifact(name: &str) -> ImageArtifact {
        ImageArtifact::new(name, "image/png", name.as_bytes().to_vec())
    }

    fn png_artifact(width: u32, height: u32) -> ImageArtifact {
        let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("png should encode");
        ImageArtifact::new("photo.png", "image/png", bytes.into_inner())
    }

    #[tokio::test]
    async fn instant_feature_commits_a_new_history_entry() {
        let backend = FakeBackend::default();
        let mut session = session();
        let original = artifact("a.png");
        session.load_image(original.clone());

        let outcome = session
            .apply_instant(&backend, "Color Restore & Enhancement")
            .await
            .expect("instant edit should succeed");

        let GenerationOutcome::Committed(edited) = outcome else {
            panic!("expected a committed result");
        };
        assert_eq!(backend.calls(), 1);
        assert_eq!(session.history().entries(), &[original.clone(), edited.clone()]);
        assert_eq!(session.current(), Some(&edited));
        assert_eq!(session.original(), Some(&original));
        assert!(session.can_undo());
        assert!(!session.can_redo());
        assert_eq!(session.phase(), SessionPhase::Idle);

        let request = backend.last_edit();
        assert_eq!(request.image_count(), 1);
        assert!(request
            .text()
            .is_some_and(|text| text.contains("Automatically restore")));
    }

    #[tokio::test]
    async fn selecting_an_instant_feature_runs_it_on_generate_without_a_prompt() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("a.png"));
        session
            .select_feature("One-Tap Product Background Remover")
            .expect("feature exists");
        assert!(session.is_ready_to_generate());

        session.generate(&backend).await.expect("instant edit should succeed");
        assert_eq!(backend.calls(), 1);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn localized_feature_needs_a_hotspot_before_anything_is_sent() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("a.png"));
        session.select_feature("Generative Retouch").expect("feature exists");
        session.set_prompt("remove the scratch");
        assert!(!session.is_ready_to_generate());

        let err = session.generate(&backend).await.expect_err("hotspot is missing");
        assert!(matches!(
            err,
            SessionError::InvalidSelection(SelectionIssue::MissingHotspot)
        ));
        assert_eq!(backend.calls(), 0);
        assert_eq!(session.phase(), SessionPhase::Error);
        assert_eq!(
            session.error_message(),
            Some("Please click on the image to select an area to edit for this feature.")
        );
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_for_prompted_features() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("a.png"));
        session.select_feature("Backdrop Creator").expect("feature exists");
        session.set_prompt("   ");

        let err = session.generate(&backend).await.expect_err("prompt is blank");
        assert!(matches!(
            err,
            SessionError::InvalidSelection(SelectionIssue::MissingPrompt)
        ));
        assert_eq!(session.error_message(), Some("Please enter a description or location."));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn editing_without_an_image_is_rejected() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.select_feature("Backdrop Creator").expect("feature exists");
        session.set_prompt("a beach at dusk");

        let err = session.generate(&backend).await.expect_err("no image loaded");
        assert!(matches!(err, SessionError::NoImageLoaded));
        assert_eq!(session.error_message(), Some("No image loaded to edit."));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn localized_edit_sends_the_native_hotspot() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("a.png"));
        session.select_feature("Generative Retouch").expect("feature exists");
        session.set_prompt("remove the scratch");
        let hotspot = session.select_hotspot(
            DisplayPoint::new(100.0, 50.0),
            DisplaySize::new(400.0, 300.0),
            ImageBounds::new(1600, 900),
        );
        assert_eq!(hotspot, Some(Hotspot::new(400, 150)));
        assert!(session.is_ready_to_generate());

        session.generate(&backend).await.expect("edit should succeed");

        let text = backend.last_edit().text().map(str::to_string).unwrap_or_default();
        assert!(text.contains("User Request: \"remove the scratch\""));
        assert!(text.contains("(x: 400, y: 150)"));
        assert_eq!(session.hotspot(), None);
        assert_eq!(session.display_hotspot(), None);
        assert_eq!(session.prompt(), "remove the scratch");
    }

    #[test]
    fn global_features_ignore_clicks() {
        let mut session = session();
        session.load_image(artifact("a.png"));
        session.select_feature("Sky & Weather Generator").expect("feature exists");

        let hotspot = session.select_hotspot(
            DisplayPoint::new(10.0, 10.0),
            DisplaySize::new(100.0, 100.0),
            ImageBounds::new(100, 100),
        );
        assert_eq!(hotspot, None);
        assert_eq!(session.hotspot(), None);
    }

    #[tokio::test]
    async fn reference_images_follow_the_current_image() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("room.png"));
        session.select_feature("Ikea Furniture AR").expect("feature exists");
        session.add_reference_image(artifact("chair.png"));
        session.add_reference_image(artifact("lamp.png"));
        session.set_prompt("place the chair by the window");
        session.select_hotspot(
            DisplayPoint::new(5.0, 5.0),
            DisplaySize::new(10.0, 10.0),
            ImageBounds::new(10, 10),
        );

        session.generate(&backend).await.expect("edit should succeed");

        let request = backend.last_edit();
        assert_eq!(request.image_count(), 3);
        assert!(request
            .text()
            .is_some_and(|text| text.contains("2 additional reference images")));
    }

    #[tokio::test]
    async fn second_generation_is_refused_while_one_is_in_flight() {
        let mut session = session();
        session.load_image(artifact("a.png"));
        session.select_feature("Backdrop Creator").expect("feature exists");
        session.set_prompt("a beach at dusk");

        let pending = session.prepare_generate().expect("first generation starts");
        assert!(session.is_loading());
        assert!(!session.is_ready_to_generate());

        let err = session.prepare_generate().expect_err("second is refused");
        assert!(matches!(err, SessionError::GenerationInFlight));
        assert!(matches!(
            session.prepare_filter("Anime"),
            Err(SessionError::GenerationInFlight)
        ));
        assert!(matches!(
            session.apply_crop(ScaleFactors::identity()),
            Err(SessionError::GenerationInFlight)
        ));
        assert_eq!(session.phase(), SessionPhase::Generating);
        assert_eq!(session.error_message(), None);

        let backend = FakeBackend::default();
        let outcome = session
            .complete(pending.execute(&backend).await)
            .expect("first generation settles");
        assert!(matches!(outcome, GenerationOutcome::Committed(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn result_for_a_superseded_image_is_discarded() {
        let backend = FakeBackend::default();
        let mut session = session();
        let original = artifact("a.png");
        session.load_image(original.clone());
        session
            .apply_instant(&backend, "Color Restore & Enhancement")
            .await
            .expect("instant edit should succeed");
        let entries_before: Vec<_> = session.history().entries().to_vec();

        session.select_feature("Backdrop Creator").expect("feature exists");
        session.set_prompt("a beach at dusk");
        let pending = session.prepare_generate().expect("generation starts");
        assert!(session.undo());
        assert_eq!(session.current(), Some(&original));

        let outcome = session
            .complete(pending.execute(&backend).await)
            .expect("stale result is not an error");

        assert_eq!(outcome, GenerationOutcome::Discarded);
        assert_eq!(session.history().entries(), entries_before.as_slice());
        assert_eq!(session.current(), Some(&original));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.can_redo());
    }

    #[tokio::test]
    async fn map_generation_replaces_history_and_clears_the_prompt() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("old.png"));
        session.select_feature("Map Painter").expect("feature exists");
        assert_eq!(session.map_style(), Some("Watercolor"));
        session.set_map_style("Charcoal Sketch").expect("style is offered");
        session.set_prompt("Eiffel Tower, Paris");

        let outcome = session.generate(&backend).await.expect("map should generate");
        let GenerationOutcome::Committed(generated) = outcome else {
            panic!("expected a committed result");
        };

        assert_eq!(session.history().entries(), &[generated.clone()]);
        assert_eq!(session.original(), Some(&generated));
        assert!(!session.can_undo());
        assert_eq!(session.prompt(), "");
        assert!(backend.edit_requests.lock().expect("lock").is_empty());

        let prompts = backend.text_prompts.lock().expect("lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Location: \"Eiffel Tower, Paris\""));
        assert!(prompts[0].contains("Style: \"Charcoal Sketch\""));
    }

    #[test]
    fn map_style_must_be_offered_by_the_feature() {
        let mut session = session();
        session.select_feature("Map Painter").expect("feature exists");
        let err = session.set_map_style("Claymation").expect_err("unknown style");
        assert!(matches!(
            err,
            SessionError::InvalidSelection(SelectionIssue::UnknownStyle { .. })
        ));
        assert_eq!(session.map_style(), Some("Watercolor"));
    }

    #[tokio::test]
    async fn failed_generation_surfaces_the_service_message() {
        let backend = FakeBackend::blocking("SAFETY");
        let mut session = session();
        session.load_image(artifact("a.png"));
        session.select_feature("Generative Retouch").expect("feature exists");
        session.set_prompt("remove the sign");
        session.select_hotspot(
            DisplayPoint::new(1.0, 1.0),
            DisplaySize::new(10.0, 10.0),
            ImageBounds::new(10, 10),
        );

        let err = session.generate(&backend).await.expect_err("request is blocked");
        assert!(matches!(
            err,
            SessionError::Generation(GenerationError::RequestBlocked { .. })
        ));
        assert_eq!(session.phase(), SessionPhase::Error);
        assert!(session
            .error_message()
            .is_some_and(|message| message.starts_with(
                "Failed to generate the image. Request was blocked. Reason: SAFETY."
            )));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.hotspot(), None);
        assert_eq!(session.prompt(), "remove the sign");

        session.dismiss_error();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.error_message(), None);
    }

    #[tokio::test]
    async fn filter_uses_the_shared_filter_instruction() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("a.png"));

        session
            .apply_filter(&backend, "Anime")
            .await
            .expect("filter should apply");

        let instruction = session.catalog().filter_instruction().to_string();
        let anime = session.catalog().filter("Anime").expect("filter exists").prompt.clone();
        let text = backend.last_edit().text().map(str::to_string).unwrap_or_default();
        assert!(text.starts_with(&instruction));
        assert!(text.contains(&anime));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn navigation_moves_through_history_and_clears_the_hotspot() {
        let backend = FakeBackend::default();
        let mut session = session();
        let original = artifact("a.png");
        session.load_image(original.clone());
        session
            .apply_instant(&backend, "Color Restore & Enhancement")
            .await
            .expect("first edit");
        session
            .apply_instant(&backend, "Color Restore & Enhancement")
            .await
            .expect("second edit");
        let latest = session.current().cloned();

        session.select_hotspot(
            DisplayPoint::new(1.0, 1.0),
            DisplaySize::new(10.0, 10.0),
            ImageBounds::new(10, 10),
        );
        assert!(session.hotspot().is_some());
        assert!(session.reset());
        assert_eq!(session.current(), Some(&original));
        assert_eq!(session.hotspot(), None);
        assert!(!session.undo());
        assert!(session.redo());
        assert!(session.redo());
        assert_eq!(session.current(), latest.as_ref());
        assert!(!session.redo());

        assert!(session.save_to_gallery());
        assert_eq!(session.gallery().len(), 1);
        assert_eq!(
            session.download_name(),
            latest.map(|artifact| artifact.download_name())
        );

        session.upload_new();
        assert!(session.current().is_none());
        assert!(!session.save_to_gallery());
    }

    fn reject_for_missing_hotspot_then_click(session: &mut EditSession) {
        session.set_prompt("fix the corner");
        let err = session.prepare_generate().expect_err("hotspot is missing");
        assert!(matches!(
            err,
            SessionError::InvalidSelection(SelectionIssue::MissingHotspot)
        ));
        assert_eq!(session.phase(), SessionPhase::Error);
        assert!(session
            .select_hotspot(
                DisplayPoint::new(2.0, 2.0),
                DisplaySize::new(10.0, 10.0),
                ImageBounds::new(10, 10),
            )
            .is_some());
    }

    fn assert_back_to_idle(session: &EditSession, after: &str) {
        assert_eq!(session.phase(), SessionPhase::Idle, "phase after {after}");
        assert_eq!(session.error_message(), None, "error after {after}");
        assert_eq!(session.hotspot(), None, "hotspot after {after}");
        assert_eq!(session.display_hotspot(), None, "marker after {after}");
    }

    #[tokio::test]
    async fn every_navigation_leaves_the_error_phase() {
        let backend = FakeBackend::default();
        let mut session = session();
        session.load_image(artifact("a.png"));
        for _ in 0..2 {
            session
                .apply_instant(&backend, "Color Restore & Enhancement")
                .await
                .expect("instant edit should succeed");
        }
        session.select_feature("Generative Retouch").expect("feature exists");

        reject_for_missing_hotspot_then_click(&mut session);
        assert!(session.undo());
        assert_back_to_idle(&session, "undo");

        reject_for_missing_hotspot_then_click(&mut session);
        assert!(session.redo());
        assert_back_to_idle(&session, "redo");

        reject_for_missing_hotspot_then_click(&mut session);
        assert!(session.reset());
        assert_back_to_idle(&session, "reset");

        reject_for_missing_hotspot_then_click(&mut session);
        session.upload_new();
        assert_back_to_idle(&session, "upload_new");
        assert!(session.current().is_none());
    }

    #[test]
    fn unusable_instant_or_filter_names_surface_an_error() {
        let mut session = session();
        session.load_image(artifact("a.png"));

        let err = session
            .prepare_instant("Backdrop Creator")
            .expect_err("a prompted feature is not instant");
        assert!(matches!(
            err,
            SessionError::InvalidSelection(SelectionIssue::NotInstant(_))
        ));
        assert_eq!(session.phase(), SessionPhase::Error);
        assert_eq!(
            session.error_message(),
            Some("Backdrop Creator cannot be applied instantly.")
        );

        session.dismiss_error();
        let err = session
            .prepare_instant("Teleporter")
            .expect_err("unknown feature");
        assert!(matches!(
            err,
            SessionError::Catalog(CatalogError::FeatureNotFound(_))
        ));
        assert_eq!(session.phase(), SessionPhase::Error);
        assert_eq!(session.error_message(), Some("unknown feature: Teleporter"));

        session.dismiss_error();
        assert!(matches!(
            session.prepare_filter("Sepia Dreams"),
            Err(SessionError::Catalog(CatalogError::FilterNotFound(_)))
        ));
        assert_eq!(session.error_message(), Some("unknown filter: Sepia Dreams"));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn crop_commits_the_cropped_image() {
        let mut session = session();
        session.load_image(png_artifact(40, 30));

        let err = session
            .apply_crop(ScaleFactors::identity())
            .expect_err("no selection yet");
        assert!(matches!(err, SessionError::NoCropSelected));
        assert_eq!(session.phase(), SessionPhase::Error);

        session.set_crop_selection(Some(DisplayRect::new(5.0, 5.0, 10.0, 8.0)));
        let scale = ScaleFactors::between(DisplaySize::new(20.0, 15.0), ImageBounds::new(40, 30));
        let cropped = session.apply_crop(scale).expect("crop should succeed").clone();

        let decoded = image::load_from_memory(cropped.bytes()).expect("cropped png decodes");
        assert_eq!((decoded.width(), decoded.height()), (20, 16));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.crop_tool().selection(), None);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.undo());
    }
}
