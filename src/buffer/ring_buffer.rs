//! # Lock-Free Byte Ring Buffer
//!
//! A fixed-capacity circular byte buffer shared between exactly one
//! producer thread and exactly one consumer thread, with no locks.
//!
//! ## Plain English
//!
//! Picture a circular conveyor belt between two workers. One worker
//! (the producer) loads bytes onto the belt, the other (the consumer)
//! takes them off. A single counter on the wall says how many bytes are
//! currently on the belt. Each worker only glances at the counter and
//! touches their own end of the belt, so neither ever has to stop and
//! wait for the other.
//!
//! This is the transport used to move audio samples from a producer
//! thread into a realtime callback, where taking a lock is not an
//! option.

use std::cell::UnsafeCell;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

// ============================================
// SHARED STATE
// ============================================

/// State shared between the producer and consumer handles.
///
/// `used` is the only field both sides touch. The positions are each
/// owned by exactly one side and live here only so they survive a
/// `join` / `split` cycle.
struct Shared {
    /// Bytes currently buffered. Producer increments with Release after
    /// writing payload, consumer decrements with Release after reading,
    /// both sides load with Acquire. Padded to its own cache line so
    /// the counter doesn't false-share with the payload.
    used: CachePadded<AtomicUsize>,

    /// Next write offset, wraps modulo capacity. Mutated only by the
    /// producer handle.
    write_pos: UnsafeCell<usize>,

    /// Next read offset, wraps modulo capacity. Mutated only by the
    /// consumer handle.
    read_pos: UnsafeCell<usize>,

    /// The payload storage.
    data: Box<[UnsafeCell<u8>]>,
}

// SAFETY: `write_pos` and the free region of `data` are only touched by
// the single Producer; `read_pos` and the filled region only by the
// single Consumer. The regions stay disjoint because `used` is raised
// with Release only after payload bytes are in place and observed with
// Acquire before the other side touches them.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Raw pointer into the payload at `offset`.
    fn payload_ptr(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset <= self.data.len());
        self.data.as_ptr().wrapping_add(offset) as *mut u8
    }
}

// ============================================
// RING BUFFER (unsplit)
// ============================================

/// A fixed-capacity SPSC byte ring buffer.
///
/// ## Properties
/// - Fixed capacity (doesn't grow)
/// - No locks: one atomic counter is the only shared state
/// - Never blocks: both sides do partial work when full/empty
/// - Bytes come out in the exact order they went in
///
/// The buffer itself is inert. Call [`split`](RingBuffer::split) to get
/// the [`Producer`] and [`Consumer`] handles the two threads use; the
/// handle types make "exactly one producer, exactly one consumer" a
/// compile-time guarantee instead of a comment.
pub struct RingBuffer {
    shared: Arc<Shared>,
}

impl RingBuffer {
    /// Creates a new, empty ring buffer holding `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");

        let data = (0..capacity)
            .map(|_| UnsafeCell::new(0u8))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shared: Arc::new(Shared {
                used: CachePadded::new(AtomicUsize::new(0)),
                write_pos: UnsafeCell::new(0),
                read_pos: UnsafeCell::new(0),
                data,
            }),
        }
    }

    /// Returns the fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the number of buffered bytes.
    pub fn used(&self) -> usize {
        self.shared.used()
    }

    /// Returns the number of free bytes.
    pub fn free(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Discards all buffered content and rewinds both positions.
    ///
    /// Holding `&mut self` on the unsplit buffer proves that no
    /// producer or consumer handle exists, so this is a
    /// configuration-time operation by construction. Reopen the stream
    /// by calling [`split`](RingBuffer::split) again.
    pub fn reset(&mut self) {
        // SAFETY: exclusive access; no handles are alive.
        unsafe {
            *self.shared.write_pos.get() = 0;
            *self.shared.read_pos.get() = 0;
        }
        self.shared.used.store(0, Ordering::Release);
    }

    /// Splits the buffer into its two endpoint handles.
    pub fn split(self) -> (Producer, Consumer) {
        let producer = Producer {
            shared: Arc::clone(&self.shared),
        };
        let consumer = Consumer {
            shared: self.shared,
        };
        (producer, consumer)
    }

    /// Reassembles a buffer from its two handles.
    ///
    /// This is how a stream teardown gets back to a state where
    /// [`reset`](RingBuffer::reset) is allowed: surrendering both
    /// handles proves both threads are done with the buffer.
    ///
    /// Returns the handles unchanged if they belong to different
    /// buffers.
    pub fn join(producer: Producer, consumer: Consumer) -> Result<Self, (Producer, Consumer)> {
        if !Arc::ptr_eq(&producer.shared, &consumer.shared) {
            return Err((producer, consumer));
        }
        let shared = Arc::clone(&producer.shared);
        drop(producer);
        drop(consumer);
        Ok(Self { shared })
    }
}

// ============================================
// PRODUCER
// ============================================

/// The writing end of a [`RingBuffer`]. Not clonable; exactly one
/// exists per buffer.
pub struct Producer {
    shared: Arc<Shared>,
}

// SAFETY: see `Shared`. The handle owns the producer side exclusively.
unsafe impl Send for Producer {}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.shared.capacity())
            .finish()
    }
}

impl Producer {
    /// Returns the buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the number of buffered bytes.
    pub fn used(&self) -> usize {
        self.shared.used()
    }

    /// Returns the number of free bytes.
    ///
    /// From this side the value is a safe lower bound: the consumer may
    /// concurrently drain more space, but never less, so a write of up
    /// to `free()` bytes always succeeds in full.
    pub fn free(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Copies as many bytes of `src` as currently fit, returning how
    /// many were accepted. Never blocks; returns 0 when full.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.free());
        if n == 0 {
            return 0;
        }

        let capacity = self.capacity();
        // SAFETY: producer-owned position.
        let pos = unsafe { *self.shared.write_pos.get() };

        // Wraparound means at most two contiguous copies.
        let first = n.min(capacity - pos);
        // SAFETY: [pos, pos + first) and [0, n - first) lie inside the
        // free region, which the consumer does not touch until `used`
        // is raised below.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.shared.payload_ptr(pos), first);
            if n > first {
                std::ptr::copy_nonoverlapping(
                    src.as_ptr().add(first),
                    self.shared.payload_ptr(0),
                    n - first,
                );
            }
            *self.shared.write_pos.get() = (pos + n) % capacity;
        }

        // Release: payload bytes become visible before the count does.
        self.shared.used.fetch_add(n, Ordering::Release);
        n
    }

    /// Returns the first contiguous free run as a writable slice.
    ///
    /// ## Plain English
    ///
    /// Instead of handing us bytes to copy, you can write directly into
    /// the buffer: ask for the region, fill some prefix of it, then
    /// call [`commit`](Producer::commit) with how much you filled. Near
    /// the wrap point the region is shorter than `free()`; commit and
    /// ask again to get the run at the start of the buffer.
    ///
    /// Nothing is published until `commit` runs, so an abandoned region
    /// costs nothing.
    pub fn write_region(&mut self) -> &mut [u8] {
        let capacity = self.capacity();
        // SAFETY: producer-owned position.
        let pos = unsafe { *self.shared.write_pos.get() };
        let run = self.free().min(capacity - pos);
        // SAFETY: the run lies within the free region; the returned
        // borrow pins `&mut self`, so no other producer call can alias
        // it.
        unsafe { slice::from_raw_parts_mut(self.shared.payload_ptr(pos), run) }
    }

    /// Publishes `count` bytes previously written through
    /// [`write_region`](Producer::write_region).
    ///
    /// Panics if `count` exceeds the current contiguous free run.
    pub fn commit(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let capacity = self.capacity();
        // SAFETY: producer-owned position.
        let pos = unsafe { *self.shared.write_pos.get() };
        let run = self.free().min(capacity - pos);
        assert!(
            count <= run,
            "commit of {} bytes exceeds region of {}",
            count,
            run
        );

        // SAFETY: producer-owned position.
        unsafe {
            *self.shared.write_pos.get() = (pos + count) % capacity;
        }
        self.shared.used.fetch_add(count, Ordering::Release);
    }
}

// ============================================
// CONSUMER
// ============================================

/// The reading end of a [`RingBuffer`]. Not clonable; exactly one
/// exists per buffer.
pub struct Consumer {
    shared: Arc<Shared>,
}

// SAFETY: see `Shared`. The handle owns the consumer side exclusively.
unsafe impl Send for Consumer {}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.shared.capacity())
            .finish()
    }
}

impl Consumer {
    /// Returns the buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Returns the number of buffered bytes.
    ///
    /// From this side the value is a safe lower bound: the producer may
    /// concurrently add more, but never remove, so a read of up to
    /// `used()` bytes always succeeds in full.
    pub fn used(&self) -> usize {
        self.shared.used()
    }

    /// Returns the number of free bytes.
    pub fn free(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Copies up to `dst.len()` buffered bytes into `dst`, returning
    /// how many were delivered. Never blocks; returns 0 when empty.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.used());
        if n == 0 {
            return 0;
        }

        let capacity = self.capacity();
        // SAFETY: consumer-owned position.
        let pos = unsafe { *self.shared.read_pos.get() };

        let first = n.min(capacity - pos);
        // SAFETY: the filled region was published by a Release store of
        // `used` that our Acquire load observed, and the producer will
        // not reuse it until `used` drops below.
        unsafe {
            std::ptr::copy_nonoverlapping(self.shared.payload_ptr(pos), dst.as_mut_ptr(), first);
            if n > first {
                std::ptr::copy_nonoverlapping(
                    self.shared.payload_ptr(0),
                    dst.as_mut_ptr().add(first),
                    n - first,
                );
            }
            *self.shared.read_pos.get() = (pos + n) % capacity;
        }

        // Release only after the payload has been copied out, so the
        // producer cannot overwrite bytes still being read.
        self.shared.used.fetch_sub(n, Ordering::Release);
        n
    }

    /// Returns the first contiguous filled run as a readable slice.
    ///
    /// Pair with [`release`](Consumer::release), mirroring the producer
    /// region API. Near the wrap point the run is shorter than
    /// `used()`; release and ask again for the rest.
    pub fn read_region(&mut self) -> &[u8] {
        let capacity = self.capacity();
        // SAFETY: consumer-owned position.
        let pos = unsafe { *self.shared.read_pos.get() };
        let run = self.used().min(capacity - pos);
        // SAFETY: within the filled region published by the producer.
        unsafe { slice::from_raw_parts(self.shared.payload_ptr(pos), run) }
    }

    /// Frees `count` bytes previously inspected through
    /// [`read_region`](Consumer::read_region).
    ///
    /// Panics if `count` exceeds the current contiguous filled run.
    pub fn release(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let capacity = self.capacity();
        // SAFETY: consumer-owned position.
        let pos = unsafe { *self.shared.read_pos.get() };
        let run = self.used().min(capacity - pos);
        assert!(
            count <= run,
            "release of {} bytes exceeds region of {}",
            count,
            run
        );

        // SAFETY: consumer-owned position.
        unsafe {
            *self.shared.read_pos.get() = (pos + count) % capacity;
        }
        self.shared.used.fetch_sub(count, Ordering::Release);
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::thread;

    #[test]
    fn test_new_buffer_is_empty() {
        let ring = RingBuffer::with_capacity(64);
        assert_eq!(ring.capacity(), 64);
        assert_eq!(ring.used(), 0);
        assert_eq!(ring.free(), 64);
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (mut tx, mut rx) = RingBuffer::with_capacity(16).split();

        assert_eq!(tx.write(b"hello"), 5);
        assert_eq!(tx.used(), 5);
        assert_eq!(tx.free(), 11);

        let mut out = [0u8; 16];
        let n = rx.read(&mut out);
        assert_eq!(n, 5);
        assert_eq!(&out[..5], b"hello");
        assert_eq!(rx.used(), 0);
    }

    #[test]
    fn test_write_truncates_when_full() {
        let (mut tx, mut rx) = RingBuffer::with_capacity(8).split();

        assert_eq!(tx.write(b"12345678"), 8);
        // Full: nothing more fits.
        assert_eq!(tx.write(b"overflow"), 0);

        let mut out = [0u8; 4];
        assert_eq!(rx.read(&mut out), 4);
        // Four bytes drained, four fit now.
        assert_eq!(tx.write(b"abcdef"), 4);
        assert_eq!(tx.used(), 8);
    }

    #[test]
    fn test_fifo_across_wrap_boundary() {
        let (mut tx, mut rx) = RingBuffer::with_capacity(8).split();
        let mut expected = VecDeque::new();
        let mut next: u8 = 0;

        // Push/pull uneven chunk sizes for a while so the positions
        // wrap several times.
        for round in 0..64 {
            let chunk = 1 + (round % 5);
            let src: Vec<u8> = (0..chunk)
                .map(|_| {
                    let b = next;
                    next = next.wrapping_add(1);
                    b
                })
                .collect();
            let accepted = tx.write(&src);
            expected.extend(src[..accepted].iter().copied());

            let mut dst = vec![0u8; 1 + (round % 7)];
            let delivered = rx.read(&mut dst);
            for &b in &dst[..delivered] {
                assert_eq!(Some(b), expected.pop_front(), "FIFO order broken");
            }
        }
    }

    #[test]
    fn test_used_plus_free_is_capacity() {
        let (mut tx, mut rx) = RingBuffer::with_capacity(32).split();
        let mut scratch = [0u8; 11];

        for i in 0..100 {
            tx.write(&[i as u8; 7]);
            assert_eq!(tx.used() + tx.free(), 32);
            rx.read(&mut scratch);
            assert_eq!(rx.used() + rx.free(), 32);
        }
    }

    #[test]
    fn test_region_api_matches_copy_api() {
        let (mut tx, mut rx) = RingBuffer::with_capacity(8).split();

        // Fill 6 bytes through the region API.
        let region = tx.write_region();
        assert_eq!(region.len(), 8);
        region[..6].copy_from_slice(b"abcdef");
        tx.commit(6);
        assert_eq!(tx.used(), 6);

        // Drain 4 so the next region wraps.
        let mut out = [0u8; 4];
        assert_eq!(rx.read(&mut out), 4);
        assert_eq!(&out, b"abcd");

        // Contiguous free run stops at the end of the buffer.
        let region = tx.write_region();
        assert_eq!(region.len(), 2);
        region.copy_from_slice(b"gh");
        tx.commit(2);

        // Second run starts at offset zero.
        let region = tx.write_region();
        assert_eq!(region.len(), 4);
        region[..2].copy_from_slice(b"ij");
        tx.commit(2);

        // Consumer sees everything in order through its region API.
        let mut collected = Vec::new();
        loop {
            let run = rx.read_region().to_vec();
            if run.is_empty() {
                break;
            }
            let len = run.len();
            collected.extend(run);
            rx.release(len);
        }
        assert_eq!(collected, b"efghij");
    }

    #[test]
    #[should_panic(expected = "exceeds region")]
    fn test_commit_beyond_region_panics() {
        let (mut tx, _rx) = RingBuffer::with_capacity(4).split();
        tx.commit(5);
    }

    #[test]
    fn test_join_and_reset() {
        let (mut tx, rx) = RingBuffer::with_capacity(16).split();
        tx.write(b"stale samples");

        let mut ring = RingBuffer::join(tx, rx).expect("same buffer");
        assert_eq!(ring.used(), 13);

        ring.reset();
        assert_eq!(ring.used(), 0);
        assert_eq!(ring.free(), 16);

        // A fresh split starts clean at position zero.
        let (mut tx, mut rx) = ring.split();
        assert_eq!(tx.write(b"fresh"), 5);
        let mut out = [0u8; 5];
        assert_eq!(rx.read(&mut out), 5);
        assert_eq!(&out, b"fresh");
    }

    #[test]
    fn test_join_rejects_mismatched_handles() {
        let (tx_a, _rx_a) = RingBuffer::with_capacity(8).split();
        let (_tx_b, rx_b) = RingBuffer::with_capacity(8).split();
        assert!(RingBuffer::join(tx_a, rx_b).is_err());
    }

    #[test]
    fn test_two_thread_stress_delivers_in_order() {
        const TOTAL: usize = 256 * 1024;

        let (mut tx, mut rx) = RingBuffer::with_capacity(251).split();

        // Producer pushes a deterministic byte pattern in ragged chunks.
        let producer = thread::spawn(move || {
            let mut sent = 0usize;
            let mut chunk = [0u8; 61];
            while sent < TOTAL {
                let want = chunk.len().min(TOTAL - sent);
                for (i, slot) in chunk[..want].iter_mut().enumerate() {
                    *slot = ((sent + i) % 251) as u8;
                }
                let accepted = tx.write(&chunk[..want]);
                sent += accepted;
                if accepted == 0 {
                    thread::yield_now();
                }
            }
        });

        // Consumer verifies the pattern byte by byte.
        let consumer = thread::spawn(move || {
            let mut received = 0usize;
            let mut buf = [0u8; 97];
            while received < TOTAL {
                let n = rx.read(&mut buf);
                for &b in &buf[..n] {
                    assert_eq!(b, (received % 251) as u8, "corrupt byte at {}", received);
                    received += 1;
                }
                if n == 0 {
                    thread::yield_now();
                }
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any interleaving of bounded writes and reads keeps the
            /// buffer equivalent to a plain FIFO queue.
            #[test]
            fn prop_behaves_like_fifo(
                ops in proptest::collection::vec((any::<bool>(), 0usize..24), 1..200),
            ) {
                let (mut tx, mut rx) = RingBuffer::with_capacity(17).split();
                let mut model: VecDeque<u8> = VecDeque::new();
                let mut next: u8 = 0;

                for (is_write, len) in ops {
                    if is_write {
                        let src: Vec<u8> = (0..len)
                            .map(|_| {
                                let b = next;
                                next = next.wrapping_add(1);
                                b
                            })
                            .collect();
                        let accepted = tx.write(&src);
                        prop_assert!(accepted <= src.len());
                        model.extend(src[..accepted].iter().copied());
                        // A short write only ever means the buffer hit
                        // its capacity.
                        prop_assert!(accepted == src.len() || model.len() == 17);
                    } else {
                        let mut dst = vec![0u8; len];
                        let delivered = rx.read(&mut dst);
                        for &b in &dst[..delivered] {
                            prop_assert_eq!(Some(b), model.pop_front());
                        }
                    }
                    prop_assert_eq!(tx.used(), model.len());
                    prop_assert_eq!(tx.used() + tx.free(), 17);
                }
            }
        }
    }
}
