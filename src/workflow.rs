//! Workflow orchestrator: the linear photo pipeline.
//!
//! ```text
//! capture ──▶ crop ──▶ enhance ──▶ template ──▶ final
//!    ◀──────── ◀──────── ◀──────────
//!               previous
//! ```
//!
//! The orchestrator owns exactly one artifact per stage (`captured`,
//! `cropped`, `enhanced`, `templated`). Installing a new artifact into a
//! slot drops the old handle at that moment, which releases its buffer
//! unless something else still holds it.
//!
//! ## Transitions
//!
//! [`Workflow::go_next`] advances only when the current stage has produced
//! its artifact; otherwise it is a no-op that reports
//! [`WorkflowEvent::TransitionBlocked`]. Entering `enhance` applies the
//! auto-enhance preset when configured. Entering `final` exports the
//! templated photo as JPEG and hands it to the completion callback; `final`
//! is terminal until [`Workflow::reset_workflow`].
//!
//! [`Workflow::go_previous`] moves back one stage and keeps every artifact,
//! so re-entering `crop` shows the last region. Re-applying a stage
//! (`apply_crop`, `apply_filters`, `apply_template`) invalidates the
//! artifacts of every later stage, so a stale input can never flow forward.
//!
//! ## Failures
//!
//! A failed operation leaves the stage and all artifacts as they were and
//! reports [`WorkflowEvent::StageFailed`]. Nothing here is fatal.

use crate::artifact::{ArtifactId, ArtifactPool, ImageArtifact};
use crate::capture::{self, CaptureError, IngestError, StreamHandle};
use crate::config::{ConfigError, PipelineConfig};
use crate::crop::CropController;
use crate::enhance::{EnhanceError, FilterSettings};
use crate::imaging::geometry::display_size;
use crate::imaging::{self, BackendError, ExportedPhoto, ImageBackend};
use crate::template::Catalog;
use chrono::Local;
use std::fmt;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Enhance(#[from] EnhanceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),
    #[error("{stage} has no input: {reason}")]
    MissingInput {
        stage: PipelineStage,
        reason: &'static str,
    },
    #[error("{operation} is only available in the {expected} stage (currently {actual})")]
    WrongStage {
        operation: &'static str,
        expected: PipelineStage,
        actual: PipelineStage,
    },
}

/// Pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineStage {
    Capture,
    Crop,
    Enhance,
    Template,
    Final,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::Capture,
        PipelineStage::Crop,
        PipelineStage::Enhance,
        PipelineStage::Template,
        PipelineStage::Final,
    ];

    pub fn next(self) -> Option<Self> {
        match self {
            PipelineStage::Capture => Some(PipelineStage::Crop),
            PipelineStage::Crop => Some(PipelineStage::Enhance),
            PipelineStage::Enhance => Some(PipelineStage::Template),
            PipelineStage::Template => Some(PipelineStage::Final),
            PipelineStage::Final => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            PipelineStage::Capture => None,
            PipelineStage::Crop => Some(PipelineStage::Capture),
            PipelineStage::Enhance => Some(PipelineStage::Crop),
            PipelineStage::Template => Some(PipelineStage::Enhance),
            PipelineStage::Final => Some(PipelineStage::Template),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::Capture => "capture",
            PipelineStage::Crop => "crop",
            PipelineStage::Enhance => "enhance",
            PipelineStage::Template => "template",
            PipelineStage::Final => "final",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress reported by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    StageEntered {
        stage: PipelineStage,
    },
    ArtifactInstalled {
        stage: PipelineStage,
        id: ArtifactId,
        width: u32,
        height: u32,
    },
    /// Later-stage artifacts dropped because an earlier stage was re-applied.
    Invalidated {
        stages: Vec<PipelineStage>,
    },
    TransitionBlocked {
        stage: PipelineStage,
        reason: &'static str,
    },
    StageFailed {
        stage: PipelineStage,
        message: String,
    },
    Exported {
        filename: String,
        bytes: usize,
    },
    Reset,
}

type CompletionCallback = Box<dyn FnMut(&ExportedPhoto) + Send>;

/// The pipeline state machine and its per-stage artifacts.
pub struct Workflow<B: ImageBackend> {
    backend: B,
    pool: ArtifactPool,
    config: PipelineConfig,
    catalog: Catalog,
    stage: PipelineStage,
    captured: Option<ImageArtifact>,
    cropped: Option<ImageArtifact>,
    enhanced: Option<ImageArtifact>,
    templated: Option<ImageArtifact>,
    crop: Option<CropController>,
    settings: FilterSettings,
    template_id: String,
    exported: Option<ExportedPhoto>,
    events: Option<Sender<WorkflowEvent>>,
    on_complete: Option<CompletionCallback>,
}

impl<B: ImageBackend> Workflow<B> {
    pub fn new(backend: B, config: PipelineConfig) -> Result<Self, WorkflowError> {
        Self::with_pool(backend, config, ArtifactPool::new())
    }

    /// Like [`new`](Self::new), allocating artifacts from `pool`.
    pub fn with_pool(
        backend: B,
        config: PipelineConfig,
        pool: ArtifactPool,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        let catalog = config.catalog()?;
        let template_id = config.template.id.clone();
        Ok(Self {
            backend,
            pool,
            config,
            catalog,
            stage: PipelineStage::Capture,
            captured: None,
            cropped: None,
            enhanced: None,
            templated: None,
            crop: None,
            settings: FilterSettings::default(),
            template_id,
            exported: None,
            events: None,
            on_complete: None,
        })
    }

    /// Stream [`WorkflowEvent`]s to `sender`.
    pub fn with_events(mut self, sender: Sender<WorkflowEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Called with the exported photo when the workflow reaches `final`.
    pub fn on_complete(mut self, callback: impl FnMut(&ExportedPhoto) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn pool(&self) -> &ArtifactPool {
        &self.pool
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The artifact a stage has produced, if any. `final` has none of its own.
    pub fn artifact(&self, stage: PipelineStage) -> Option<&ImageArtifact> {
        match stage {
            PipelineStage::Capture => self.captured.as_ref(),
            PipelineStage::Crop => self.cropped.as_ref(),
            PipelineStage::Enhance => self.enhanced.as_ref(),
            PipelineStage::Template => self.templated.as_ref(),
            PipelineStage::Final => None,
        }
    }

    pub fn crop_controller(&self) -> Option<&CropController> {
        self.crop.as_ref()
    }

    /// Interactive crop state. Available once a photo is captured.
    pub fn crop_controller_mut(&mut self) -> Option<&mut CropController> {
        self.crop.as_mut()
    }

    pub fn filter_settings(&self) -> FilterSettings {
        self.settings
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn exported(&self) -> Option<&ExportedPhoto> {
        self.exported.as_ref()
    }

    // =========================================================================
    // Capture
    // =========================================================================

    /// Snapshot the camera into the capture slot.
    pub fn capture_from(&mut self, handle: &StreamHandle) -> Result<&ImageArtifact, WorkflowError> {
        self.require(PipelineStage::Capture, "capture")?;
        let result = capture::capture_frame(handle, &self.pool);
        let artifact = self.report(PipelineStage::Capture, result)?;
        Ok(self.install_captured(artifact))
    }

    /// Decode an upload into the capture slot.
    pub fn ingest(&mut self, bytes: &[u8], declared_mime: &str) -> Result<&ImageArtifact, WorkflowError> {
        self.require(PipelineStage::Capture, "upload")?;
        let limits = self.config.ingest.limits();
        let result = capture::ingest_file(&self.pool, &self.backend, bytes, declared_mime, &limits);
        let artifact = self.report(PipelineStage::Capture, result)?;
        Ok(self.install_captured(artifact))
    }

    fn install_captured(&mut self, artifact: ImageArtifact) -> &ImageArtifact {
        let display = display_size(artifact.dimensions(), self.config.crop.viewport_long_edge);
        self.crop = Some(CropController::new(
            display,
            self.config.crop.aspect_ratio,
            &self.config.crop,
        ));
        self.invalidate_after(PipelineStage::Capture);
        self.install(PipelineStage::Capture, artifact)
    }

    // =========================================================================
    // Stage operations
    // =========================================================================

    /// Render the current crop region.
    pub fn apply_crop(&mut self) -> Result<&ImageArtifact, WorkflowError> {
        self.require(PipelineStage::Crop, "apply_crop")?;
        let (Some(source), Some(crop)) = (&self.captured, &self.crop) else {
            return Err(self.missing(PipelineStage::Crop, "nothing captured"));
        };
        let result = imaging::apply_crop(
            &self.backend,
            &self.pool,
            source,
            &crop.region(),
            crop.container(),
            self.config.crop.output_long_edge,
        );
        let artifact = self.report(PipelineStage::Crop, result)?;
        self.invalidate_after(PipelineStage::Crop);
        Ok(self.install(PipelineStage::Crop, artifact))
    }

    /// Re-render the cropped photo through `settings`.
    pub fn apply_filters(&mut self, settings: FilterSettings) -> Result<&ImageArtifact, WorkflowError> {
        self.require(PipelineStage::Enhance, "apply_filters")?;
        self.report(PipelineStage::Enhance, settings.validate())?;
        let Some(source) = &self.cropped else {
            return Err(self.missing(PipelineStage::Enhance, "nothing cropped"));
        };
        let result = imaging::apply_filters(&self.backend, &self.pool, source, &settings);
        let artifact = self.report(PipelineStage::Enhance, result)?;
        self.settings = settings.clamped();
        self.invalidate_after(PipelineStage::Enhance);
        Ok(self.install(PipelineStage::Enhance, artifact))
    }

    /// Composite the enhanced photo onto the template `id`.
    pub fn apply_template(&mut self, id: &str) -> Result<&ImageArtifact, WorkflowError> {
        self.require(PipelineStage::Template, "apply_template")?;
        let Some(template) = self.catalog.get(id) else {
            let err = WorkflowError::UnknownTemplate(id.to_string());
            self.emit(WorkflowEvent::StageFailed {
                stage: PipelineStage::Template,
                message: err.to_string(),
            });
            return Err(err);
        };
        let Some(source) = &self.enhanced else {
            return Err(self.missing(PipelineStage::Template, "nothing enhanced"));
        };
        let result = imaging::apply_template(
            &self.backend,
            &self.pool,
            source,
            template,
            &self.config.template,
        );
        let artifact = self.report(PipelineStage::Template, result)?;
        self.template_id = id.to_string();
        Ok(self.install(PipelineStage::Template, artifact))
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Advance one stage if the current stage has produced its artifact.
    ///
    /// A blocked transition is a no-op and returns the unchanged stage.
    /// Errors come only from the work done on entry (auto-enhance, export);
    /// the stage does not change when they occur.
    pub fn go_next(&mut self) -> Result<PipelineStage, WorkflowError> {
        let Some(next) = self.stage.next() else {
            return Ok(self.block("final is terminal; reset to start over"));
        };
        if self.artifact(self.stage).is_none() {
            return Ok(self.block(match self.stage {
                PipelineStage::Capture => "no photo captured",
                PipelineStage::Crop => "crop not applied",
                PipelineStage::Enhance => "no enhanced photo",
                _ => "no templated photo",
            }));
        }

        match next {
            PipelineStage::Enhance if self.enhanced.is_none() && self.config.enhance.auto => {
                self.auto_enhance()?;
            }
            PipelineStage::Final => self.finalize()?,
            _ => {}
        }

        self.stage = next;
        info!(stage = %next, "entered stage");
        self.emit(WorkflowEvent::StageEntered { stage: next });
        Ok(next)
    }

    /// Move back one stage, keeping every artifact. No-op at `capture` and
    /// once `final` has been reached.
    pub fn go_previous(&mut self) -> PipelineStage {
        match (self.stage, self.stage.previous()) {
            (PipelineStage::Final, _) | (_, None) => {
                debug!(stage = %self.stage, "previous ignored");
            }
            (_, Some(previous)) => {
                self.stage = previous;
                info!(stage = %previous, "returned to stage");
                self.emit(WorkflowEvent::StageEntered { stage: previous });
            }
        }
        self.stage
    }

    /// Drop every artifact and return to `capture`.
    pub fn reset_workflow(&mut self) {
        self.captured = None;
        self.cropped = None;
        self.enhanced = None;
        self.templated = None;
        self.crop = None;
        self.exported = None;
        self.settings = FilterSettings::default();
        self.template_id = self.config.template.id.clone();
        self.stage = PipelineStage::Capture;
        info!(live = self.pool.live(), "workflow reset");
        self.emit(WorkflowEvent::Reset);
    }

    fn auto_enhance(&mut self) -> Result<(), WorkflowError> {
        let Some(source) = &self.cropped else {
            return Ok(());
        };
        let settings = FilterSettings::AUTO_ENHANCE;
        let result = imaging::apply_filters(&self.backend, &self.pool, source, &settings);
        let artifact = self.report(PipelineStage::Enhance, result)?;
        debug!(%settings, "auto-enhance applied");
        self.settings = settings;
        self.install(PipelineStage::Enhance, artifact);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), WorkflowError> {
        let Some(source) = &self.templated else {
            return Ok(());
        };
        let result = imaging::export_jpeg(
            &self.backend,
            source,
            &self.config.export,
            Local::now().naive_local(),
        );
        let photo = self.report(PipelineStage::Final, result)?;
        info!(filename = %photo.filename, bytes = photo.bytes.len(), "photo exported");
        self.emit(WorkflowEvent::Exported {
            filename: photo.filename.clone(),
            bytes: photo.bytes.len(),
        });
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&photo);
        }
        self.exported = Some(photo);
        Ok(())
    }

    // =========================================================================
    // Slots and reporting
    // =========================================================================

    fn slot(&mut self, stage: PipelineStage) -> Option<&mut Option<ImageArtifact>> {
        match stage {
            PipelineStage::Capture => Some(&mut self.captured),
            PipelineStage::Crop => Some(&mut self.cropped),
            PipelineStage::Enhance => Some(&mut self.enhanced),
            PipelineStage::Template => Some(&mut self.templated),
            PipelineStage::Final => None,
        }
    }

    /// Replace the stage's artifact; the previous handle drops here.
    fn install(&mut self, stage: PipelineStage, artifact: ImageArtifact) -> &ImageArtifact {
        let (id, width, height) = (artifact.id(), artifact.width(), artifact.height());
        debug!(%stage, %id, width, height, "artifact installed");
        self.emit(WorkflowEvent::ArtifactInstalled {
            stage,
            id,
            width,
            height,
        });
        match stage {
            PipelineStage::Capture => self.captured.insert(artifact),
            PipelineStage::Crop => self.cropped.insert(artifact),
            PipelineStage::Enhance => self.enhanced.insert(artifact),
            PipelineStage::Template | PipelineStage::Final => self.templated.insert(artifact),
        }
    }

    /// Clear the artifacts of every stage after `stage`.
    fn invalidate_after(&mut self, stage: PipelineStage) {
        let mut cleared = Vec::new();
        let mut next = stage.next();
        while let Some(later) = next {
            if let Some(slot) = self.slot(later) {
                if slot.take().is_some() {
                    cleared.push(later);
                }
            }
            next = later.next();
        }
        self.exported = None;
        if !cleared.is_empty() {
            debug!(?cleared, "downstream artifacts invalidated");
            self.emit(WorkflowEvent::Invalidated { stages: cleared });
        }
    }

    fn require(&self, expected: PipelineStage, operation: &'static str) -> Result<(), WorkflowError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(WorkflowError::WrongStage {
                operation,
                expected,
                actual: self.stage,
            })
        }
    }

    fn missing(&self, stage: PipelineStage, reason: &'static str) -> WorkflowError {
        self.emit(WorkflowEvent::StageFailed {
            stage,
            message: reason.to_string(),
        });
        WorkflowError::MissingInput { stage, reason }
    }

    /// Log and report a failed operation; successes pass through.
    fn report<T>(
        &self,
        stage: PipelineStage,
        result: Result<T, impl Into<WorkflowError>>,
    ) -> Result<T, WorkflowError> {
        result.map_err(|e| {
            let err = e.into();
            warn!(%stage, error = %err, "stage operation failed");
            self.emit(WorkflowEvent::StageFailed {
                stage,
                message: err.to_string(),
            });
            err
        })
    }

    fn block(&self, reason: &'static str) -> PipelineStage {
        debug!(stage = %self.stage, reason, "transition blocked");
        self.emit(WorkflowEvent::TransitionBlocked {
            stage: self.stage,
            reason,
        });
        self.stage
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(event);
        }
    }
}
