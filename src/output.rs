//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//!     capture: artifact-1 320x240
//! ==> crop
//!     crop: artifact-2 267x400
//! ==> enhance
//!     enhance: artifact-3 267x400
//! ==> template
//!     template: artifact-4 533x800
//!     Exported: cv-photo-20240501-093000.jpg (41.2 KiB)
//! ==> final
//! Wrote out/cv-photo-20240501-093000.jpg (533x800, 41.2 KiB)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Processing 2 photos
//! 001 portrait.png
//!     Source: in/portrait.png
//!     Output: out/portrait.jpg (533x800)
//! 002 broken.png
//!     Source: in/broken.png
//!     Error: failed to decode image
//!
//! 1 processed, 1 failed
//! ```
//!
//! ## Templates
//!
//! ```text
//! Professional
//!     professional-white  Professional White  headshot (3:4)
//!     corporate-blue      Corporate Blue      linkedin (4:5)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, ProcessedPhoto};
use crate::template::{Catalog, Category};
use crate::workflow::WorkflowEvent;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count: `812 B`, `41.2 KiB`, `1.5 MiB`.
fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Workflow events
// ============================================================================

pub fn format_workflow_event(event: &WorkflowEvent) -> Vec<String> {
    match event {
        WorkflowEvent::StageEntered { stage } => vec![format!("==> {}", stage)],
        WorkflowEvent::ArtifactInstalled {
            stage,
            id,
            width,
            height,
        } => vec![format!("{}{}: {} {}x{}", indent(1), stage, id, width, height)],
        WorkflowEvent::Invalidated { stages } => {
            let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
            vec![format!("{}Invalidated: {}", indent(1), names.join(", "))]
        }
        WorkflowEvent::TransitionBlocked { stage, reason } => {
            vec![format!("{}Blocked at {}: {}", indent(1), stage, reason)]
        }
        WorkflowEvent::StageFailed { stage, message } => {
            vec![format!("{}{} failed: {}", indent(1), stage, message)]
        }
        WorkflowEvent::Exported { filename, bytes } => vec![format!(
            "{}Exported: {} ({})",
            indent(1),
            filename,
            format_bytes(*bytes)
        )],
        WorkflowEvent::Reset => vec!["==> reset".to_string()],
    }
}

pub fn format_processed(photo: &ProcessedPhoto) -> Vec<String> {
    vec![format!(
        "Wrote {} ({}x{}, {})",
        photo.output.display(),
        photo.width,
        photo.height,
        format_bytes(photo.bytes)
    )]
}

pub fn print_processed(photo: &ProcessedPhoto) {
    for line in format_processed(photo) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!(
            "Processing {} photo{}",
            total,
            if *total == 1 { "" } else { "s" }
        )],
        BatchEvent::Processed {
            index,
            source,
            output,
            width,
            height,
        } => vec![
            format!("{} {}", format_index(*index), file_name(source)),
            format!("{}Source: {}", indent(1), source),
            format!("{}Output: {} ({}x{})", indent(1), output, width, height),
        ],
        BatchEvent::Failed {
            index,
            source,
            message,
        } => vec![
            format!("{} {}", format_index(*index), file_name(source)),
            format!("{}Source: {}", indent(1), source),
            format!("{}Error: {}", indent(1), message),
        ],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    vec![String::new(), summary.to_string()]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Catalog grouped by category, ids and names column-aligned.
pub fn format_template_list(catalog: &Catalog) -> Vec<String> {
    let id_width = catalog.all().iter().map(|t| t.id.len()).max().unwrap_or(0);
    let name_width = catalog.all().iter().map(|t| t.name.len()).max().unwrap_or(0);

    let mut lines = Vec::new();
    for category in Category::ALL {
        let templates: Vec<_> = catalog.by_category(category).collect();
        if templates.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(capitalize(&category.to_string()));
        for t in templates {
            lines.push(format!(
                "{}{:<id_width$}  {:<name_width$}  {}",
                indent(1),
                t.id,
                t.name,
                t.aspect_ratio,
            ));
        }
    }
    lines
}

pub fn print_template_list(catalog: &Catalog) {
    for line in format_template_list(catalog) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
