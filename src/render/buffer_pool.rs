use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};

use crate::foundation::core::Canvas;
use crate::foundation::error::StillreelResult;
use crate::render::pixel_buffer::PixelBuffer;

/// Counters describing pool usage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers allocated because the free list was empty.
    pub allocated: u64,
    /// Buffers handed out from the free list.
    pub reused: u64,
    /// Buffers dropped on release (wrong size or free list full).
    pub dropped_on_release: u64,
}

/// Recycling pool of fixed-size [`PixelBuffer`]s.
///
/// Cloning yields another handle to the same pool; the session writer thread releases buffers
/// while the sequencer acquires them.
#[derive(Clone)]
pub struct PixelBufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    size: Canvas,
    free_tx: Sender<Vec<u8>>,
    free_rx: Receiver<Vec<u8>>,
    allocated: AtomicU64,
    reused: AtomicU64,
    dropped_on_release: AtomicU64,
}

impl PixelBufferPool {
    /// Create a pool for `size` buffers retaining at most `capacity` free buffers, pre-allocating
    /// `prealloc` of them.
    pub fn new(size: Canvas, capacity: usize, prealloc: usize) -> StillreelResult<Self> {
        let capacity = capacity.max(1);
        let (free_tx, free_rx) = crossbeam_channel::bounded(capacity);
        let pool = Self {
            inner: Arc::new(PoolInner {
                size,
                free_tx,
                free_rx,
                allocated: AtomicU64::new(0),
                reused: AtomicU64::new(0),
                dropped_on_release: AtomicU64::new(0),
            }),
        };

        for _ in 0..prealloc.min(capacity) {
            let buf = PixelBuffer::allocate(size)?;
            pool.inner.allocated.fetch_add(1, Ordering::Relaxed);
            pool.release(buf);
        }
        Ok(pool)
    }

    /// Size of every buffer in the pool.
    pub fn size(&self) -> Canvas {
        self.inner.size
    }

    /// Take a buffer from the free list, allocating when it is empty.
    ///
    /// Contents of a recycled buffer are unspecified; converters clear it.
    pub fn acquire(&self) -> StillreelResult<PixelBuffer> {
        if let Ok(data) = self.inner.free_rx.try_recv() {
            self.inner.reused.fetch_add(1, Ordering::Relaxed);
            return PixelBuffer::from_raw(self.inner.size, data);
        }
        let buf = PixelBuffer::allocate(self.inner.size)?;
        self.inner.allocated.fetch_add(1, Ordering::Relaxed);
        Ok(buf)
    }

    /// Return a buffer's storage to the free list.
    pub fn release(&self, buf: PixelBuffer) {
        if buf.size() != self.inner.size
            || self.inner.free_tx.try_send(buf.into_data()).is_err()
        {
            self.inner.dropped_on_release.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of buffers currently on the free list.
    pub fn free_len(&self) -> usize {
        self.inner.free_rx.len()
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.inner.allocated.load(Ordering::Relaxed),
            reused: self.inner.reused.load(Ordering::Relaxed),
            dropped_on_release: self.inner.dropped_on_release.load(Ordering::Relaxed),
        }
    }

    /// Drop every buffer on the free list.
    pub fn drain(&self) {
        while self.inner.free_rx.try_recv().is_ok() {}
    }
}

impl std::fmt::Debug for PixelBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBufferPool")
            .field("size", &self.inner.size)
            .field("free", &self.free_len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer_pool.rs"]
mod tests;
