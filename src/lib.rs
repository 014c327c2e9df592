//! # Media Fastpath
//!
//! Realtime media fast-path primitives for embedded GPUs: a lock-free
//! audio ring buffer and a zero-copy frame-to-texture cache.
//!
//! ## Architecture Overview
//!
//! The library is two independent fast paths plus their shared model
//! types:
//!
//! - `buffer`: the SPSC byte ring buffer and the one-slot frame mailbox
//! - `audio`: format conversion and ring sizing for sample transport
//! - `frame`: pixel formats, buffer identity, frame mapping
//! - `texture`: the frame-to-texture cache and its GPU backends
//! - `config`: tunable settings
//! - `error`: error types
//!
//! The audio path and the video path share no state; use either alone.
//!
//! ## Quick Tour
//!
//! Audio side, two threads and a ring between them:
//!
//! ```
//! use media_fastpath::{AudioFormat, AudioTransport, Config};
//!
//! let transport = AudioTransport::open(AudioFormat::cd_quality(), &Config::default())?;
//! let (mut producer, mut consumer) = transport.start();
//!
//! producer.write(&[0u8; 64]);           // decoder thread
//! let mut out = [0u8; 64];
//! consumer.read(&mut out);              // realtime callback
//! # Ok::<(), media_fastpath::Error>(())
//! ```
//!
//! Video side, frames in from anywhere, textures out on the render
//! thread:
//!
//! ```
//! use media_fastpath::{
//!     BufferId, FrameTextureCache, PixelFormat, SimulatedGpu, SoftwareFrame,
//! };
//!
//! let gpu = SimulatedGpu::new();
//! let (mut cache, sink) = FrameTextureCache::new(gpu);
//!
//! let frame = SoftwareFrame::new(BufferId(1), 64, 64, PixelFormat::Nv12)?;
//! sink.submit(frame, true);             // decoder thread
//! let texture = cache.bind();           // render thread
//! assert!(texture.is_some());
//! # Ok::<(), media_fastpath::Error>(())
//! ```

// ============================================
// MODULE DECLARATIONS
// ============================================

pub mod audio;
pub mod buffer;
pub mod config;
pub mod error;
pub mod frame;
pub mod texture;

// ============================================
// RE-EXPORTS
// ============================================

pub use audio::{AudioFormat, AudioTransport, SampleByteOrder, SampleType, StreamDescription};
pub use buffer::{Consumer, FrameMailbox, FrameSink, Producer, RingBuffer};
pub use config::{Config, FilterMode};
pub use error::{ConfigError, Error, FrameError, Result, TextureError};
pub use frame::{BufferId, MappedFrame, PixelFormat, Plane, SoftwareFrame, VideoFrame};
pub use texture::{CacheStats, FrameTextureCache, GpuContext, SimulatedGpu, TextureId, VivanteGl};

// ============================================
// LOGGING
// ============================================

/// Initialize logging for the host platform.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

// ============================================
// TESTS
// ============================================
