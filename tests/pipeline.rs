//! End-to-end runs of the photo pipeline through the public API.

use cv_photo::capture::{self, DeviceConstraints, TestPatternCamera};
use cv_photo::config::PipelineConfig;
use cv_photo::enhance::FilterSettings;
use cv_photo::extract::extract_fields;
use cv_photo::imaging::RustBackend;
use cv_photo::store::{LocalStore, RecordStore, ResumeRecord};
use cv_photo::types::AspectRatio;
use cv_photo::workflow::{PipelineStage, Workflow, WorkflowError};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

fn png(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn workflow() -> Workflow<RustBackend> {
    Workflow::new(RustBackend::new(), PipelineConfig::default()).unwrap()
}

/// Ingest, crop with the default region, auto-enhance, template.
fn run_to_template(bytes: &[u8], template: &str) -> Workflow<RustBackend> {
    let mut wf = workflow();
    wf.ingest(bytes, "image/png").unwrap();
    wf.go_next().unwrap();
    wf.apply_crop().unwrap();
    wf.go_next().unwrap();
    wf.go_next().unwrap();
    wf.apply_template(template).unwrap();
    wf
}

// =============================================================================
// Crop
// =============================================================================

#[test]
fn landscape_upload_crops_to_passport_ratio() {
    // Show the photo at its natural size so viewport and source pixels agree
    let mut config = PipelineConfig::default();
    config.crop.viewport_long_edge = 1280;
    let mut wf = Workflow::new(RustBackend::new(), config).unwrap();
    wf.ingest(&png(&gradient(1280, 720)), "image/png").unwrap();
    assert_eq!(wf.go_next().unwrap(), PipelineStage::Crop);

    let crop = wf.crop_controller_mut().unwrap();
    crop.set_aspect_ratio(AspectRatio::Passport);
    crop.set_rect(100.0, 50.0, 300.0, 450.0);
    let region = crop.region();
    assert_eq!((region.x, region.y, region.width), (100.0, 50.0, 300.0));
    assert!((region.height - 450.0).abs() < 1e-9);
    assert!((region.width / region.height - 4.0 / 6.0).abs() < 1e-9);

    let cropped = wf.apply_crop().unwrap();
    assert_eq!(cropped.dimensions(), (267, 400));
}

#[test]
fn oversized_rect_shrinks_into_scaled_display() {
    // The default 600px viewport shows 1280x720 at 600x337.5
    let mut wf = workflow();
    wf.ingest(&png(&gradient(1280, 720)), "image/png").unwrap();
    wf.go_next().unwrap();

    let crop = wf.crop_controller_mut().unwrap();
    crop.set_aspect_ratio(AspectRatio::Passport);
    crop.set_rect(100.0, 50.0, 300.0, 450.0);
    let region = crop.region();
    assert!((region.height - 337.5).abs() < 1e-9);
    assert!((region.width - 225.0).abs() < 1e-9);
    assert!(region.y.abs() < 1e-9);
    assert!(region.x + region.width <= 600.0);
}

#[test]
fn camera_frame_enters_capture_slot() {
    let handle = capture::start_capture(&TestPatternCamera, &DeviceConstraints::default()).unwrap();
    let mut wf = workflow();
    let captured = wf.capture_from(&handle).unwrap();
    assert_eq!(captured.dimensions(), (1280, 720));

    capture::stop_capture(&handle);
    assert!(!handle.is_active());
    assert!(matches!(
        wf.capture_from(&handle),
        Err(WorkflowError::Capture(_))
    ));
    // The earlier capture survives the failed retry
    assert!(wf.artifact(PipelineStage::Capture).is_some());
}

// =============================================================================
// Enhance
// =============================================================================

#[test]
fn brightness_scales_uniform_gray() {
    let gray = RgbaImage::from_pixel(200, 300, Rgba([128, 128, 128, 255]));
    let mut wf = workflow();
    wf.ingest(&png(&gray), "image/png").unwrap();
    wf.go_next().unwrap();
    wf.apply_crop().unwrap();
    wf.go_next().unwrap();

    let settings = FilterSettings {
        brightness: 150.0,
        ..FilterSettings::NEUTRAL
    };
    let enhanced = wf.apply_filters(settings).unwrap();
    let (w, h) = enhanced.dimensions();
    assert_eq!(
        enhanced.pixels().get_pixel(w / 2, h / 2),
        &Rgba([192, 192, 192, 255])
    );
}

#[test]
fn non_finite_filter_is_rejected_without_side_effects() {
    let mut wf = workflow();
    wf.ingest(&png(&gradient(64, 64)), "image/png").unwrap();
    wf.go_next().unwrap();
    wf.apply_crop().unwrap();
    wf.go_next().unwrap();
    let before = wf.artifact(PipelineStage::Enhance).unwrap().id();

    let settings = FilterSettings {
        contrast: f32::NAN,
        ..FilterSettings::NEUTRAL
    };
    assert!(matches!(
        wf.apply_filters(settings),
        Err(WorkflowError::Enhance(_))
    ));
    assert_eq!(wf.artifact(PipelineStage::Enhance).unwrap().id(), before);
}

// =============================================================================
// Navigation
// =============================================================================

#[test]
fn next_without_capture_is_a_no_op() {
    let mut wf = workflow();
    assert_eq!(wf.go_next().unwrap(), PipelineStage::Capture);
    assert_eq!(wf.go_previous(), PipelineStage::Capture);
}

#[test]
fn reset_from_final_releases_every_artifact() {
    let exported = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&exported);

    let mut wf = run_to_template(&png(&gradient(320, 240)), "passport-classic")
        .on_complete(move |photo| sink.lock().unwrap().push(photo.filename.clone()));
    assert_eq!(wf.go_next().unwrap(), PipelineStage::Final);
    assert_eq!(exported.lock().unwrap().len(), 1);
    assert!(exported.lock().unwrap()[0].ends_with(".jpg"));

    // Final is terminal
    assert_eq!(wf.go_next().unwrap(), PipelineStage::Final);
    assert_eq!(wf.go_previous(), PipelineStage::Final);

    wf.reset_workflow();
    assert_eq!(wf.stage(), PipelineStage::Capture);
    assert!(wf.exported().is_none());
    assert_eq!(wf.pool().live(), 0);
    for stage in PipelineStage::ALL {
        assert!(wf.artifact(stage).is_none());
    }
    // The capture guard blocks again
    assert_eq!(wf.go_next().unwrap(), PipelineStage::Capture);
}

// =============================================================================
// Template
// =============================================================================

#[test]
fn templating_is_deterministic() {
    let bytes = png(&gradient(320, 240));
    let a = run_to_template(&bytes, "corporate-blue");
    let b = run_to_template(&bytes, "corporate-blue");
    let fa = a.artifact(PipelineStage::Template).unwrap().fingerprint();
    let fb = b.artifact(PipelineStage::Template).unwrap().fingerprint();
    assert_eq!(fa, fb);
}

// =============================================================================
// Collaborators
// =============================================================================

#[test]
fn extracted_fields_and_photo_persist_locally() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());

    let mut wf = run_to_template(&png(&gradient(320, 240)), "passport-classic");
    wf.go_next().unwrap();
    let photo = wf.exported().unwrap().filename.clone();

    let mut record = ResumeRecord {
        photo: Some(photo.clone()),
        ..ResumeRecord::default()
    };
    extract_fields("My name is Grace Hopper. Email grace@navy.mil\nSkills: COBOL, compilers")
        .merge_into(&mut record);
    let saved = store.create("grace@navy.mil", record).unwrap();

    let listed = store.list("grace@navy.mil").unwrap();
    assert_eq!(listed, vec![saved]);
    assert_eq!(listed[0].name.as_deref(), Some("Grace Hopper"));
    assert_eq!(listed[0].skills, vec!["COBOL", "compilers"]);
    assert_eq!(listed[0].photo.as_deref(), Some(photo.as_str()));
}
