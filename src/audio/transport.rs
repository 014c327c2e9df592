//! # Audio Transport
//!
//! Sizes and opens the ring buffer that carries samples between the
//! producer thread and the realtime callback.

use crate::buffer::{Consumer, Producer, RingBuffer};
use crate::config::Config;
use crate::error::{Error, Result};

use super::format::AudioFormat;

// ============================================
// AUDIO TRANSPORT
// ============================================

/// A ring buffer sized for a stream's format and latency target.
///
/// ## Plain English
///
/// "200 ms of buffer" means a different byte count for every format:
/// mono 8 kHz telephone audio needs a few kilobytes, 96 kHz
/// six-channel needs over a hundred. This type does that arithmetic at
/// stream-open time and hands the two threads their endpoints.
pub struct AudioTransport {
    ring: RingBuffer,
    format: AudioFormat,
}

impl AudioTransport {
    /// Opens a transport for `format`, buffered per `config`.
    pub fn open(format: AudioFormat, config: &Config) -> Result<Self> {
        let errors = config.validate();
        if let Some(error) = errors.into_iter().next() {
            return Err(Error::Config(error));
        }

        let capacity = Self::buffer_bytes(&format, config.audio_buffer_ms);
        log::info!(
            "Opening audio transport: {} Hz x {} ch x {} bit, {} ms = {} byte ring",
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            config.audio_buffer_ms,
            capacity
        );

        Ok(Self {
            ring: RingBuffer::with_capacity(capacity),
            format,
        })
    }

    /// Ring capacity in bytes for `duration_ms` of `format` audio,
    /// rounded up to whole sample frames so a frame never straddles
    /// the accounting.
    pub fn buffer_bytes(format: &AudioFormat, duration_ms: u32) -> usize {
        let bytes = format.bytes_per_second() as u64 * duration_ms as u64 / 1000;
        let frame = format.bytes_per_frame().max(1) as u64;
        let frames = (bytes + frame - 1) / frame;
        (frames.max(1) * frame) as usize
    }

    /// The ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// The stream format the transport was sized for.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Starts the stream: consumes the transport and hands out the two
    /// thread endpoints.
    pub fn start(self) -> (Producer, Consumer) {
        self.ring.split()
    }
}

// ============================================
// TESTS
// ============================================
