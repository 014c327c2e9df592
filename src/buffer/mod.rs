//! # Buffering Module
//!
//! The two hand-off structures that move media data between threads.
//!
//! ## Plain English
//!
//! Audio and video want opposite things from a buffer:
//!
//! - Audio must never lose a byte and never take a lock, because the
//!   consuming side runs inside a realtime callback. That's the
//!   [`RingBuffer`]: a lock-free conveyor belt of bytes.
//! - Video only ever cares about the newest frame; an old frame is
//!   worthless the moment a newer one exists. That's the
//!   [`FrameMailbox`]: a one-slot letterbox where the latest delivery
//!   wins.

mod mailbox;
mod ring_buffer;

pub use mailbox::{FrameMailbox, FrameSink, Pending};
pub use ring_buffer::{Consumer, Producer, RingBuffer};
