//! # CV Photo
//!
//! The profile-photo pipeline of a CV builder: take a photo from a camera
//! or an upload, crop it to a document aspect ratio, enhance it, composite
//! it onto a background template and export a JPEG for the résumé.
//!
//! # Architecture: Five-Stage Pipeline
//!
//! ```text
//! 1. Capture   camera frame / upload  →  captured artifact
//! 2. Crop      region + zoom + turns  →  cropped artifact (fixed long edge)
//! 3. Enhance   filter settings        →  enhanced artifact
//! 4. Template  background + effects   →  templated artifact
//! 5. Final     JPEG export            →  file + completion callback
//! ```
//!
//! The [`workflow::Workflow`] orchestrator owns one artifact per stage and
//! releases each one as soon as it is replaced or invalidated. Every image
//! operation produces a new artifact; inputs are never mutated.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`workflow`] | Stage state machine, per-stage artifact slots, events |
//! | [`capture`] | Camera stream lifecycle and upload validation/decoding |
//! | [`crop`] | Interactive crop: drag, pinch, zoom, rotation, clamping |
//! | [`enhance`] | Filter settings, presets and auto-enhance |
//! | [`template`] | Background template catalog |
//! | [`imaging`] | Pure-Rust image operations behind the [`imaging::ImageBackend`] seam |
//! | [`artifact`] | Reference-counted image buffers with release accounting |
//! | [`batch`] | Headless single-file and parallel directory runs |
//! | [`config`] | `cv-photo.toml` loading, merging with stock defaults, validation |
//! | [`session`] | Current user provider |
//! | [`store`] | Résumé record persistence (local JSON, stubbed remote) |
//! | [`extract`] | Résumé field extraction from conversation text |
//! | [`types`] | Shared geometry and color types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Artifacts Are Owned, Not Revoked
//!
//! Intermediate images are [`artifact::ImageArtifact`] handles over a
//! shared buffer. Dropping the last handle releases the buffer and is
//! counted by its [`artifact::ArtifactPool`], so tests can assert that
//! reset and re-crop leave nothing behind.
//!
//! ## Forward Only Through Valid Input
//!
//! `next` moves forward only once the current stage has produced its
//! artifact. Re-applying an earlier stage clears every later artifact, so
//! a stale crop can never reach the template or the export.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, warping, filtering, compositing and JPEG encoding all run on
//! the `image` crate with rayon for row-parallel kernels. No system
//! libraries are needed.

pub mod artifact;
pub mod batch;
pub mod capture;
pub mod config;
pub mod crop;
pub mod enhance;
pub mod extract;
pub mod imaging;
pub mod output;
pub mod session;
pub mod store;
pub mod template;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;
