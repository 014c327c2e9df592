//! # Audio Module
//!
//! Format conversion and sample transport for the audio fast path.
//!
//! ## Plain English
//!
//! Getting sound from a decoder to the speaker involves two chores
//! before any samples move: agreeing with the platform on exactly what
//! the bytes mean (format conversion), and setting up a buffer the
//! realtime callback can drain without ever blocking (the transport).
//! The actual byte-pushing happens through the ring buffer endpoints
//! the transport hands out.

mod format;
mod transport;

pub use format::{
    AudioFormat, SampleByteOrder, SampleType, StreamDescription, FLAG_BIG_ENDIAN, FLAG_FLOAT,
    FLAG_PACKED, FLAG_SIGNED_INTEGER, FORMAT_LINEAR_PCM,
};
pub use transport::AudioTransport;
