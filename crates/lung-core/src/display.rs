//! Seqlock channel from the render thread to observers
//!
//! The render thread publishes a [`DisplaySnapshot`] once per block; any
//! number of observer threads read it without ever making the writer wait.
//!
//! Write: bump the sequence to odd, store the fields, bump it to even.
//! Read: load the sequence, copy the fields, load the sequence again. The
//! copy is only accepted if both loads match and are even, so a reader
//! never returns a mix of two publishes.

use std::sync::atomic::{fence, AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

/// Playback state for display, published once per block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySnapshot {
    /// Loop start as a 12-bit fraction of `total`
    pub loop_start_q12: u16,
    /// Loop length as a 12-bit fraction of `total`
    pub loop_len_q12: u16,
    /// Bound sample length; never zero
    pub total: u32,
    /// Primary voice index
    pub playhead: u32,
    /// Secondary voice index, 0 unless crossfading
    pub playhead2: u32,
    pub crossfading: bool,
    /// Crossfades started since the engine was built
    pub trigger_count: u32,
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self {
            loop_start_q12: 0,
            loop_len_q12: 0,
            total: 1,
            playhead: 0,
            playhead2: 0,
            crossfading: false,
            trigger_count: 0,
        }
    }
}

struct DisplayCell {
    seq: AtomicU32,
    loop_start_q12: AtomicU16,
    loop_len_q12: AtomicU16,
    total: AtomicU32,
    playhead: AtomicU32,
    playhead2: AtomicU32,
    crossfading: AtomicBool,
    trigger_count: AtomicU32,
}

impl DisplayCell {
    fn new() -> Self {
        let init = DisplaySnapshot::default();
        Self {
            seq: AtomicU32::new(0),
            loop_start_q12: AtomicU16::new(init.loop_start_q12),
            loop_len_q12: AtomicU16::new(init.loop_len_q12),
            total: AtomicU32::new(init.total),
            playhead: AtomicU32::new(init.playhead),
            playhead2: AtomicU32::new(init.playhead2),
            crossfading: AtomicBool::new(init.crossfading),
            trigger_count: AtomicU32::new(init.trigger_count),
        }
    }

    #[inline]
    fn store_fields(&self, snap: &DisplaySnapshot) {
        self.loop_start_q12.store(snap.loop_start_q12, Ordering::Relaxed);
        self.loop_len_q12.store(snap.loop_len_q12, Ordering::Relaxed);
        self.total.store(snap.total.max(1), Ordering::Relaxed);
        self.playhead.store(snap.playhead, Ordering::Relaxed);
        self.playhead2.store(snap.playhead2, Ordering::Relaxed);
        self.crossfading.store(snap.crossfading, Ordering::Relaxed);
        self.trigger_count.store(snap.trigger_count, Ordering::Relaxed);
    }

    #[inline]
    fn load_fields(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            loop_start_q12: self.loop_start_q12.load(Ordering::Relaxed),
            loop_len_q12: self.loop_len_q12.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed).max(1),
            playhead: self.playhead.load(Ordering::Relaxed),
            playhead2: self.playhead2.load(Ordering::Relaxed),
            crossfading: self.crossfading.load(Ordering::Relaxed),
            trigger_count: self.trigger_count.load(Ordering::Relaxed),
        }
    }
}

/// Create a connected publisher/reader pair
pub fn display_channel() -> (DisplayPublisher, DisplayReader) {
    let cell = Arc::new(DisplayCell::new());
    (
        DisplayPublisher {
            cell: Arc::clone(&cell),
        },
        DisplayReader { cell },
    )
}

/// Writing end; there is exactly one, owned by the render thread
pub struct DisplayPublisher {
    cell: Arc<DisplayCell>,
}

impl DisplayPublisher {
    /// Publish a snapshot. Wait-free.
    #[inline]
    pub fn publish(&mut self, snap: &DisplaySnapshot) {
        let seq = self.begin_write();
        self.cell.store_fields(snap);
        self.end_write(seq);
    }

    /// Mark a write in progress (odd sequence); returns the pre-write sequence
    #[inline]
    fn begin_write(&mut self) -> u32 {
        let seq = self.cell.seq.load(Ordering::Relaxed);
        self.cell.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        seq
    }

    #[inline]
    fn end_write(&mut self, seq: u32) {
        self.cell.seq.store(seq.wrapping_add(2), Ordering::Release);
    }
}

/// Reading end; clone freely
#[derive(Clone)]
pub struct DisplayReader {
    cell: Arc<DisplayCell>,
}

impl DisplayReader {
    /// One read attempt; `None` if a write was in progress or raced the copy
    #[inline]
    pub fn try_read(&self) -> Option<DisplaySnapshot> {
        let before = self.cell.seq.load(Ordering::Acquire);
        if before & 1 != 0 {
            return None;
        }
        let snap = self.cell.load_fields();
        fence(Ordering::Acquire);
        let after = self.cell.seq.load(Ordering::Relaxed);
        (before == after).then_some(snap)
    }

    /// Read a consistent snapshot, retrying until one is obtained
    pub fn read(&self) -> DisplaySnapshot {
        loop {
            if let Some(snap) = self.try_read() {
                return snap;
            }
            std::hint::spin_loop();
        }
    }

    /// Number of completed publishes (wrapping)
    pub fn publish_count(&self) -> u32 {
        self.cell.seq.load(Ordering::Acquire) / 2
    }
}
