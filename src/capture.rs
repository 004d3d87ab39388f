//! Capture source: camera streams and file uploads.
//!
//! Both paths end in an [`ImageArtifact`] holding the raw photo.
//!
//! ## Camera
//!
//! Cameras are external hardware behind the [`CameraDevice`] trait.
//! [`start_capture`] opens a stream and wraps it in a [`StreamHandle`];
//! [`capture_frame`] snapshots the current frame at the stream's native
//! resolution; [`stop_capture`] releases the hardware. Stopping is
//! idempotent and safe while another thread is mid-capture: the in-flight
//! frame settles first, later captures see [`CaptureError::StreamStopped`],
//! and the stream is released exactly once. A handle dropped without being
//! stopped releases its stream on drop.
//!
//! A missing camera or denied permission is [`CaptureError::DeviceUnavailable`];
//! callers fall back to [`ingest_file`].
//!
//! ## Upload
//!
//! [`ingest_file`] accepts JPEG, PNG and WebP up to 10 MiB (configurable).
//! HEIC is recognised but rejected: the bundled decoders cannot read it.

use crate::artifact::{ArtifactPool, ImageArtifact};
use crate::imaging::ImageBackend;
use image::{ImageFormat, Rgba, RgbaImage};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Camera stream already stopped")]
    StreamStopped,
    #[error("Frame capture failed: {0}")]
    FrameFailed(String),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported format: {0} (expected JPEG, PNG or WebP)")]
    UnsupportedFormat(String),
    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("Could not decode image: {0}")]
    Decode(String),
}

/// Requested stream properties. Devices treat sizes as ideals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for DeviceConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// An open camera stream.
pub trait CameraStream: Send {
    /// Snapshot the current frame at native resolution.
    fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError>;

    /// Release the underlying hardware. Called at most once per stream.
    fn release(&mut self);
}

/// A camera that can be opened.
pub trait CameraDevice {
    fn open(&self, constraints: &DeviceConstraints) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// Device with no camera attached; every open fails.
pub struct NoCamera;

impl CameraDevice for NoCamera {
    fn open(&self, _constraints: &DeviceConstraints) -> Result<Box<dyn CameraStream>, CaptureError> {
        Err(CaptureError::DeviceUnavailable("no camera found".into()))
    }
}

/// Camera producing a deterministic test pattern at the ideal resolution.
///
/// Stands in for real hardware in headless runs and tests.
pub struct TestPatternCamera;

struct TestPatternStream {
    width: u32,
    height: u32,
}

impl CameraStream for TestPatternStream {
    fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        let (w, h) = (self.width, self.height);
        Ok(RgbaImage::from_fn(w, h, |x, y| {
            let r = (x * 255 / w.max(1)) as u8;
            let g = (y * 255 / h.max(1)) as u8;
            Rgba([r, g, 160, 255])
        }))
    }

    fn release(&mut self) {}
}

impl CameraDevice for TestPatternCamera {
    fn open(&self, constraints: &DeviceConstraints) -> Result<Box<dyn CameraStream>, CaptureError> {
        if constraints.ideal_width == 0 || constraints.ideal_height == 0 {
            return Err(CaptureError::DeviceUnavailable(
                "requested resolution is empty".into(),
            ));
        }
        Ok(Box::new(TestPatternStream {
            width: constraints.ideal_width,
            height: constraints.ideal_height,
        }))
    }
}

struct StreamSlot {
    stream: Option<Box<dyn CameraStream>>,
}

impl StreamSlot {
    fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.release();
                true
            }
            None => false,
        }
    }
}

impl Drop for StreamSlot {
    fn drop(&mut self) {
        if self.release() {
            debug!("camera stream released on drop");
        }
    }
}

/// Shared handle to a live camera stream.
#[derive(Clone)]
pub struct StreamHandle {
    slot: Arc<Mutex<StreamSlot>>,
}

impl StreamHandle {
    fn lock(&self) -> MutexGuard<'_, StreamSlot> {
        // A panic inside a camera driver must not make the stream unstoppable.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_active(&self) -> bool {
        self.lock().stream.is_some()
    }
}

/// Open a camera stream.
pub fn start_capture(
    device: &dyn CameraDevice,
    constraints: &DeviceConstraints,
) -> Result<StreamHandle, CaptureError> {
    match device.open(constraints) {
        Ok(stream) => {
            info!(
                width = constraints.ideal_width,
                height = constraints.ideal_height,
                "camera stream started"
            );
            Ok(StreamHandle {
                slot: Arc::new(Mutex::new(StreamSlot {
                    stream: Some(stream),
                })),
            })
        }
        Err(e) => {
            warn!(error = %e, "camera unavailable, falling back to upload");
            Err(e)
        }
    }
}

/// Release the stream behind `handle`. Safe to call any number of times.
pub fn stop_capture(handle: &StreamHandle) {
    if handle.lock().release() {
        info!("camera stream stopped");
    }
}

/// Snapshot the current frame into a new artifact.
pub fn capture_frame(
    handle: &StreamHandle,
    pool: &ArtifactPool,
) -> Result<ImageArtifact, CaptureError> {
    let frame = {
        let mut slot = handle.lock();
        let stream = slot.stream.as_mut().ok_or(CaptureError::StreamStopped)?;
        stream.grab_frame()?
    };
    if frame.width() == 0 || frame.height() == 0 {
        return Err(CaptureError::FrameFailed("camera returned an empty frame".into()));
    }
    Ok(pool.install(frame))
}

/// Upload limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestLimits {
    pub max_file_bytes: u64,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Map a declared MIME type to a decodable format.
///
/// Parameters (`; charset=…`) and case are ignored.
pub fn format_for_mime(mime: &str) -> Result<ImageFormat, IngestError> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok(ImageFormat::Jpeg),
        "image/png" => Ok(ImageFormat::Png),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/heic" | "image/heif" => Err(IngestError::UnsupportedFormat(format!(
            "{essence} (no HEIC decoder available)"
        ))),
        _ => Err(IngestError::UnsupportedFormat(essence)),
    }
}

/// Best-guess MIME type from a file extension, for callers reading from disk.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" | "heif" => Some("image/heic"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Decode an uploaded file into a new artifact.
///
/// Checks happen before any decoding: the declared MIME type first, then
/// the size limit. A rejected file produces no artifact.
pub fn ingest_file(
    pool: &ArtifactPool,
    backend: &impl ImageBackend,
    bytes: &[u8],
    declared_mime: &str,
    limits: &IngestLimits,
) -> Result<ImageArtifact, IngestError> {
    let format = format_for_mime(declared_mime)?;

    let size = bytes.len() as u64;
    if size > limits.max_file_bytes {
        return Err(IngestError::FileTooLarge {
            size,
            limit: limits.max_file_bytes,
        });
    }

    let pixels = backend
        .decode(bytes, format)
        .map_err(|e| IngestError::Decode(e.to_string()))?;
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(IngestError::Decode("image has no pixels".into()));
    }
    debug!(?format, size, "ingested upload");
    Ok(pool.install(pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::test_helpers::{FakeCamera, encode_jpeg, encode_png, gradient_image};
    use std::thread;

    // =========================================================================
    // Camera
    // =========================================================================

    #[test]
    fn capture_frame_at_native_resolution() {
        let pool = ArtifactPool::new();
        let camera = FakeCamera::new(gradient_image(1280, 720));
        let handle = start_capture(&camera, &DeviceConstraints::default()).unwrap();
        let frame = capture_frame(&handle, &pool).unwrap();
        assert_eq!(frame.dimensions(), (1280, 720));
    }

    #[test]
    fn unavailable_camera_reports_device_unavailable() {
        let result = start_capture(&FakeCamera::unavailable(), &DeviceConstraints::default());
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert!(matches!(
            start_capture(&NoCamera, &DeviceConstraints::default()),
            Err(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn stop_is_idempotent_and_releases_once() {
        let camera = FakeCamera::new(gradient_image(8, 8));
        let handle = start_capture(&camera, &DeviceConstraints::default()).unwrap();
        stop_capture(&handle);
        stop_capture(&handle);
        assert!(!handle.is_active());
        drop(handle);
        assert_eq!(camera.release_count(), 1);
    }

    #[test]
    fn capture_after_stop_is_an_error_not_a_panic() {
        let pool = ArtifactPool::new();
        let camera = FakeCamera::new(gradient_image(8, 8));
        let handle = start_capture(&camera, &DeviceConstraints::default()).unwrap();
        stop_capture(&handle);
        assert!(matches!(
            capture_frame(&handle, &pool),
            Err(CaptureError::StreamStopped)
        ));
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn dropped_handle_releases_stream() {
        let camera = FakeCamera::new(gradient_image(8, 8));
        let handle = start_capture(&camera, &DeviceConstraints::default()).unwrap();
        let clone = handle.clone();
        drop(handle);
        assert_eq!(camera.release_count(), 0, "clone still holds the stream");
        drop(clone);
        assert_eq!(camera.release_count(), 1);
    }

    #[test]
    fn concurrent_stop_and_capture_release_once() {
        let pool = ArtifactPool::new();
        let camera = FakeCamera::new(gradient_image(32, 32));
        let handle = start_capture(&camera, &DeviceConstraints::default()).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                let pool = pool.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        // Either a frame or StreamStopped; never a panic
                        let _ = capture_frame(&handle, &pool);
                    }
                })
            })
            .collect();
        stop_capture(&handle);
        stop_capture(&handle);
        for w in workers {
            w.join().unwrap();
        }
        drop(handle);
        assert_eq!(camera.release_count(), 1);
    }

    #[test]
    fn test_pattern_camera_honours_ideal_size() {
        let pool = ArtifactPool::new();
        let constraints = DeviceConstraints {
            ideal_width: 640,
            ideal_height: 480,
            ..DeviceConstraints::default()
        };
        let handle = start_capture(&TestPatternCamera, &constraints).unwrap();
        assert_eq!(capture_frame(&handle, &pool).unwrap().dimensions(), (640, 480));
    }

    // =========================================================================
    // Upload
    // =========================================================================

    #[test]
    fn ingest_png_and_jpeg() {
        let pool = ArtifactPool::new();
        let backend = RustBackend::new();
        let limits = IngestLimits::default();

        let png = ingest_file(&pool, &backend, &encode_png(&gradient_image(50, 40)), "image/png", &limits)
            .unwrap();
        assert_eq!(png.dimensions(), (50, 40));

        let jpg = ingest_file(
            &pool,
            &backend,
            &encode_jpeg(&gradient_image(64, 32)),
            "image/JPEG; charset=binary",
            &limits,
        )
        .unwrap();
        assert_eq!(jpg.dimensions(), (64, 32));
    }

    #[test]
    fn ingest_gif_is_unsupported_and_produces_nothing() {
        let pool = ArtifactPool::new();
        let result = ingest_file(
            &pool,
            &RustBackend::new(),
            b"GIF89a....",
            "image/gif",
            &IngestLimits::default(),
        );
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn ingest_heic_is_unsupported() {
        assert!(matches!(
            format_for_mime("image/heic"),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn ingest_11_mib_is_too_large() {
        let pool = ArtifactPool::new();
        let bytes = vec![0u8; 11 * 1024 * 1024];
        let result = ingest_file(
            &pool,
            &RustBackend::new(),
            &bytes,
            "image/jpeg",
            &IngestLimits::default(),
        );
        assert!(matches!(
            result,
            Err(IngestError::FileTooLarge {
                size,
                limit: DEFAULT_MAX_FILE_BYTES
            }) if size == 11 * 1024 * 1024
        ));
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn ingest_exactly_at_limit_is_allowed_to_decode() {
        let bytes = encode_png(&gradient_image(10, 10));
        let limits = IngestLimits {
            max_file_bytes: bytes.len() as u64,
        };
        let pool = ArtifactPool::new();
        assert!(ingest_file(&pool, &RustBackend::new(), &bytes, "image/png", &limits).is_ok());
    }

    #[test]
    fn ingest_corrupt_file_is_decode_error() {
        let pool = ArtifactPool::new();
        let result = ingest_file(
            &pool,
            &RustBackend::new(),
            b"\x89PNG but not really",
            "image/png",
            &IngestLimits::default(),
        );
        assert!(matches!(result, Err(IngestError::Decode(_))));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("webp"), Some("image/webp"));
        assert_eq!(mime_for_extension("txt"), None);
    }
}
