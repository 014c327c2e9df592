//! # Pending-Frame Mailbox
//!
//! A one-deep, latest-wins hand-off slot between a frame producer and
//! the render thread.
//!
//! ## Plain English
//!
//! Think of a letterbox that only fits one letter. Whoever delivers a
//! new letter simply squashes the old one; the recipient only ever
//! finds the newest. Video presentation wants exactly that: if the
//! render thread falls behind, showing the latest frame and quietly
//! dropping the ones in between beats building up a backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

// ============================================
// PENDING ENTRY
// ============================================

/// A frame waiting to be consumed, together with its mapping hint.
#[derive(Debug)]
pub struct Pending<F> {
    /// The submitted frame.
    pub frame: F,

    /// Whether the frame's backing memory may be handed to the GPU
    /// directly. A frame that went through a software filter gets
    /// `false` here and takes the copy path.
    pub mappable: bool,
}

// ============================================
// FRAME MAILBOX
// ============================================

/// Single-slot overwrite queue for frames.
///
/// `put` and `take` each hold the mutex only long enough to swap the
/// slot, so neither side can stall the other for more than a moment.
pub struct FrameMailbox<F> {
    /// The slot. At most one frame is ever pending.
    slot: Mutex<Option<Pending<F>>>,

    /// Frames submitted since creation.
    submitted: AtomicU64,

    /// Frames overwritten before anyone consumed them.
    dropped: AtomicU64,
}

impl<F> FrameMailbox<F> {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            submitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Deposits a frame, replacing any unconsumed one.
    ///
    /// Returns `true` if a previous frame was dropped to make room.
    pub fn put(&self, frame: F, mappable: bool) -> bool {
        let mut slot = self.slot.lock();
        let overwrote = slot.is_some();
        *slot = Some(Pending { frame, mappable });
        drop(slot);

        self.submitted.fetch_add(1, Ordering::Relaxed);
        if overwrote {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        overwrote
    }

    /// Removes and returns the pending frame, if any.
    pub fn take(&self) -> Option<Pending<F>> {
        self.slot.lock().take()
    }

    /// Returns true if a frame is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Total frames submitted since creation.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Total frames overwritten before consumption.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<F> Default for FrameMailbox<F> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// FRAME SINK
// ============================================

/// Clonable submission handle over a shared [`FrameMailbox`].
///
/// This is the half given to the decoder or render-loop thread; the
/// consuming half stays with the texture cache on the render thread.
pub struct FrameSink<F> {
    mailbox: Arc<FrameMailbox<F>>,
}

impl<F> FrameSink<F> {
    /// Wraps a shared mailbox.
    pub fn new(mailbox: Arc<FrameMailbox<F>>) -> Self {
        Self { mailbox }
    }

    /// Submits a frame for presentation, replacing any frame that has
    /// not been bound yet.
    ///
    /// ## Parameters
    /// - `frame`: the frame to present
    /// - `mappable`: whether its memory may be mapped by the GPU
    ///   directly (pass `false` for filtered/processed frames)
    ///
    /// Returns `true` if an older pending frame was dropped.
    pub fn submit(&self, frame: F, mappable: bool) -> bool {
        self.mailbox.put(frame, mappable)
    }

    /// Total frames submitted through the underlying mailbox.
    pub fn submitted(&self) -> u64 {
        self.mailbox.submitted()
    }

    /// Total frames dropped without being presented.
    pub fn dropped(&self) -> u64 {
        self.mailbox.dropped()
    }
}

impl<F> Clone for FrameSink<F> {
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mailbox() {
        let mailbox: FrameMailbox<u32> = FrameMailbox::new();
        assert!(!mailbox.has_pending());
        assert!(mailbox.take().is_none());
        assert_eq!(mailbox.submitted(), 0);
    }

    #[test]
    fn test_put_take() {
        let mailbox = FrameMailbox::new();
        assert!(!mailbox.put(7u32, true));

        let pending = mailbox.take().unwrap();
        assert_eq!(pending.frame, 7);
        assert!(pending.mappable);
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn test_latest_wins() {
        let mailbox = FrameMailbox::new();
        assert!(!mailbox.put(1u32, true));
        assert!(mailbox.put(2u32, false));
        assert!(mailbox.put(3u32, true));

        // Only the newest survives.
        let pending = mailbox.take().unwrap();
        assert_eq!(pending.frame, 3);
        assert_eq!(mailbox.submitted(), 3);
        assert_eq!(mailbox.dropped(), 2);
    }

    #[test]
    fn test_mappable_hint_travels_with_frame() {
        let mailbox = FrameMailbox::new();
        mailbox.put(9u32, false);
        assert!(!mailbox.take().unwrap().mappable);
    }

    #[test]
    fn test_sink_clones_share_slot() {
        let mailbox = Arc::new(FrameMailbox::new());
        let sink_a = FrameSink::new(Arc::clone(&mailbox));
        let sink_b = sink_a.clone();

        sink_a.submit(1u32, true);
        sink_b.submit(2u32, true);

        assert_eq!(mailbox.take().unwrap().frame, 2);
        assert_eq!(sink_a.submitted(), 2);
        assert_eq!(sink_b.dropped(), 1);
    }
}
