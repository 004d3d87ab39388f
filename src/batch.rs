//! Headless pipeline runs over files on disk.
//!
//! [`process_file`] drives one image through every stage the way an
//! interactive session would (upload, crop, enhance, template, final) and
//! writes the exported JPEG. [`process_dir`] does the same for every
//! supported image under a directory, in parallel.
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! ├── portrait.jpg              # from in/portrait.png
//! └── team-alice.jpg            # from in/team/alice.jpeg
//! ```
//!
//! ## Parallel Processing
//!
//! Files are processed with rayon. Each task owns its own workflow and
//! artifact pool; progress is reported as [`BatchEvent`]s in completion
//! order, not file order.

use crate::capture::{self, IngestError};
use crate::config::PipelineConfig;
use crate::enhance::FilterSettings;
use crate::imaging::{ImageBackend, RustBackend};
use crate::types::AspectRatio;
use crate::workflow::{PipelineStage, Workflow, WorkflowError, WorkflowEvent};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Could not advance past {stage}")]
    Blocked { stage: PipelineStage },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Per-file overrides for a headless run. Unset fields use the config.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub aspect_ratio: Option<AspectRatio>,
    /// Crop rectangle `[x, y, width, height]` in viewport coordinates.
    pub region: Option<[f64; 4]>,
    /// Absolute zoom factor.
    pub zoom: Option<f64>,
    /// Clockwise quarter turns.
    pub quarter_turns: u8,
    pub template: Option<String>,
    /// Filter settings; `None` keeps auto-enhance (or neutral when disabled).
    pub filters: Option<FilterSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPhoto {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Processed {
        index: usize,
        source: String,
        output: String,
        width: u32,
        height: u32,
    },
    Failed {
        index: usize,
        source: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} processed, {} failed", self.processed, self.failed)
    }
}

/// Run one image file through the pipeline with the pure-Rust backend.
///
/// The output is written to `out_dir/<file_name>`, or to the timestamped
/// export name when `file_name` is `None`.
pub fn process_file(
    config: &PipelineConfig,
    path: &Path,
    options: &ProcessOptions,
    out_dir: &Path,
    file_name: Option<&str>,
    events: Option<Sender<WorkflowEvent>>,
) -> Result<ProcessedPhoto, BatchError> {
    process_file_with_backend(
        RustBackend::new(),
        config,
        path,
        options,
        out_dir,
        file_name,
        events,
    )
}

/// Like [`process_file`] with a specific backend (allows testing with mock).
pub fn process_file_with_backend<B: ImageBackend>(
    backend: B,
    config: &PipelineConfig,
    path: &Path,
    options: &ProcessOptions,
    out_dir: &Path,
    file_name: Option<&str>,
    events: Option<Sender<WorkflowEvent>>,
) -> Result<ProcessedPhoto, BatchError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mime = capture::mime_for_extension(ext).ok_or_else(|| {
        WorkflowError::from(IngestError::UnsupportedFormat(format!(".{ext}")))
    })?;
    let size = fs::metadata(path)?.len();
    let limit = config.ingest.max_file_bytes;
    if size > limit {
        return Err(WorkflowError::from(IngestError::FileTooLarge { size, limit }).into());
    }
    let bytes = fs::read(path)?;

    let mut config = config.clone();
    if let Some(ratio) = options.aspect_ratio {
        config.crop.aspect_ratio = ratio;
    }
    let template = options
        .template
        .clone()
        .unwrap_or_else(|| config.template.id.clone());

    let mut workflow = Workflow::new(backend, config)?;
    if let Some(tx) = events {
        workflow = workflow.with_events(tx);
    }

    workflow.ingest(&bytes, mime)?;
    advance(&mut workflow, PipelineStage::Crop)?;

    if let Some(crop) = workflow.crop_controller_mut() {
        if let Some([x, y, w, h]) = options.region {
            crop.set_rect(x, y, w, h);
        }
        if let Some(zoom) = options.zoom {
            crop.set_zoom(zoom - crop.region().zoom);
        }
        for _ in 0..options.quarter_turns % 4 {
            crop.rotate();
        }
    }
    workflow.apply_crop()?;
    advance(&mut workflow, PipelineStage::Enhance)?;

    match options.filters {
        Some(settings) => {
            workflow.apply_filters(settings)?;
        }
        None if workflow.artifact(PipelineStage::Enhance).is_none() => {
            workflow.apply_filters(FilterSettings::NEUTRAL)?;
        }
        None => {}
    }
    advance(&mut workflow, PipelineStage::Template)?;

    workflow.apply_template(&template)?;
    advance(&mut workflow, PipelineStage::Final)?;

    let Some(photo) = workflow.exported() else {
        return Err(BatchError::Blocked {
            stage: PipelineStage::Template,
        });
    };
    fs::create_dir_all(out_dir)?;
    let output = out_dir.join(file_name.unwrap_or(&photo.filename));
    fs::write(&output, &photo.bytes)?;
    info!(source = %path.display(), output = %output.display(), "photo written");

    Ok(ProcessedPhoto {
        source: path.to_path_buf(),
        output,
        width: photo.artifact.width(),
        height: photo.artifact.height(),
        bytes: photo.bytes.len(),
    })
}

fn advance<B: ImageBackend>(
    workflow: &mut Workflow<B>,
    expected: PipelineStage,
) -> Result<(), BatchError> {
    let stage = workflow.go_next()?;
    if stage == expected {
        Ok(())
    } else {
        Err(BatchError::Blocked { stage })
    }
}

/// Supported image files under `dir`, sorted by path.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(capture::mime_for_extension)
            .is_some_and(|mime| capture::format_for_mime(mime).is_ok());
        if supported {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Output file name for a source: its path relative to the batch root, with
/// separators flattened to `-` and the extension replaced by `.jpg`.
pub fn output_name(root: &Path, source: &Path) -> String {
    let relative = source.strip_prefix(root).unwrap_or(source).with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("{}.jpg", parts.join("-"))
}

/// Process every supported image under `dir` with default crop settings.
pub fn process_dir(
    config: &PipelineConfig,
    dir: &Path,
    out_dir: &Path,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let files = collect_images(dir)?;
    if let Some(tx) = &events {
        let _ = tx.send(BatchEvent::Started { total: files.len() });
    }

    let processed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let options = ProcessOptions::default();

    files
        .par_iter()
        .enumerate()
        .for_each_with(events, |events, (i, source)| {
            let name = output_name(dir, source);
            let event =
                match process_file(config, source, &options, out_dir, Some(&name), None) {
                    Ok(photo) => {
                        processed.fetch_add(1, Ordering::Relaxed);
                        BatchEvent::Processed {
                            index: i + 1,
                            source: source.display().to_string(),
                            output: photo.output.display().to_string(),
                            width: photo.width,
                            height: photo.height,
                        }
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        warn!(source = %source.display(), error = %e, "batch item failed");
                        BatchEvent::Failed {
                            index: i + 1,
                            source: source.display().to_string(),
                            message: e.to_string(),
                        }
                    }
                };
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        });

    Ok(BatchSummary {
        processed: processed.into_inner(),
        failed: failed.into_inner(),
    })
}
