//! Image artifacts and their pool.
//!
//! An [`ImageArtifact`] is a cheap-to-clone handle to a decoded RGBA
//! buffer. Stages pass handles by value; the pixels are shared, never
//! copied. Every artifact is allocated through an [`ArtifactPool`], which
//! counts the buffers still alive: a buffer is released the moment its
//! last handle drops, and the pool's live count goes down with it.
//!
//! The workflow holds exactly one artifact per stage. Replacing a slot
//! drops the old handle, so superseded buffers are released at install
//! time rather than accumulating.

use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Pool-unique artifact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(u64);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct PoolCounters {
    next_id: AtomicU64,
    live: AtomicUsize,
    released: AtomicUsize,
}

struct Buffer {
    id: ArtifactId,
    pixels: RgbaImage,
    counters: Arc<PoolCounters>,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        debug!(id = %self.id, "released artifact");
    }
}

/// Allocator and live-buffer counter for artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPool {
    counters: Arc<PoolCounters>,
}

impl ArtifactPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `pixels` and return the first handle to them.
    pub fn install(&self, pixels: RgbaImage) -> ImageArtifact {
        let id = ArtifactId(self.counters.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        debug!(%id, width = pixels.width(), height = pixels.height(), "allocated artifact");
        ImageArtifact {
            buffer: Arc::new(Buffer {
                id,
                pixels,
                counters: Arc::clone(&self.counters),
            }),
        }
    }

    /// Buffers allocated by this pool and not yet released.
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Buffers released so far.
    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }
}

/// Handle to decoded pixel data plus its dimensions.
#[derive(Clone)]
pub struct ImageArtifact {
    buffer: Arc<Buffer>,
}

impl ImageArtifact {
    pub fn id(&self) -> ArtifactId {
        self.buffer.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.buffer.pixels
    }

    pub fn width(&self) -> u32 {
        self.buffer.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.pixels.dimensions()
    }

    /// SHA-256 over dimensions and raw pixels, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width().to_le_bytes());
        hasher.update(self.height().to_le_bytes());
        hasher.update(self.buffer.pixels.as_raw());
        format!("{:x}", hasher.finalize())
    }

    /// True when both handles point at the same buffer.
    pub fn same_buffer(&self, other: &ImageArtifact) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl fmt::Debug for ImageArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageArtifact")
            .field("id", &self.id())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_image;

    #[test]
    fn install_counts_live_buffers() {
        let pool = ArtifactPool::new();
        let a = pool.install(gradient_image(4, 4));
        let b = pool.install(gradient_image(4, 4));
        assert_eq!(pool.live(), 2);
        assert_ne!(a.id(), b.id());
        drop(a);
        assert_eq!(pool.live(), 1);
        assert_eq!(pool.released(), 1);
        drop(b);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn clones_share_the_buffer() {
        let pool = ArtifactPool::new();
        let a = pool.install(gradient_image(4, 4));
        let b = a.clone();
        assert!(a.same_buffer(&b));
        drop(a);
        assert_eq!(pool.live(), 1, "clone keeps the buffer alive");
        drop(b);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let pool = ArtifactPool::new();
        let a = pool.install(gradient_image(8, 8));
        let b = pool.install(gradient_image(8, 8));
        let c = pool.install(gradient_image(8, 9));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn debug_omits_pixels() {
        let pool = ArtifactPool::new();
        let a = pool.install(gradient_image(3, 2));
        let s = format!("{a:?}");
        assert!(s.contains("width: 3") && s.contains("height: 2"));
    }
}
