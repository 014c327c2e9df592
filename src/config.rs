//! # Configuration Module
//!
//! All configurable settings for media-fastpath.
//!
//! ## Plain English Explanation
//!
//! Just like a stereo has knobs, the fast path has a few dials worth
//! exposing:
//!
//! - How much audio to buffer between the producer and the realtime
//!   callback (more survives scheduling hiccups, less means lower
//!   latency)
//! - How textures are filtered when the video is scaled on screen
//! - Whether zero-copy texture mapping may be used at all (forcing the
//!   copy path is occasionally useful when chasing driver bugs)

use crate::error::ConfigError;

// ============================================
// TEXTURE FILTERING
// ============================================

/// How the GPU samples the video texture when scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Bilinear filtering. Smooth scaling, the right choice for video.
    Linear,

    /// Nearest-neighbour. Blocky but exact; useful when inspecting
    /// individual pixels.
    Nearest,
}

impl Default for FilterMode {
    fn default() -> Self {
        Self::Linear
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

/// All configuration options for media-fastpath.
#[derive(Clone, Debug)]
pub struct Config {
    // ----------------------------------------
    // AUDIO SETTINGS
    // "How much sound to keep in flight"
    // ----------------------------------------
    /// Audio ring buffer depth in milliseconds.
    ///
    /// ## Plain English
    /// The producer may be descheduled for a while; the realtime
    /// callback keeps draining regardless. This is how long the
    /// callback can survive on buffered samples alone.
    ///
    /// ## Limits
    /// - Minimum: 5 ms (one missed scheduler tick and you underrun)
    /// - Maximum: 2000 ms (beyond this you can hear the delay)
    /// - Default: 200 ms
    pub audio_buffer_ms: u32,

    // ----------------------------------------
    // VIDEO SETTINGS
    // "How frames reach the screen"
    // ----------------------------------------
    /// Texture filtering applied to video textures.
    pub filter_mode: FilterMode,

    /// Whether frames marked mappable may be zero-copy mapped.
    ///
    /// When `false`, every frame takes the copy path even if its
    /// memory could be handed to the GPU directly.
    pub allow_zero_copy: bool,

    /// Cached-texture count above which a warning is logged.
    ///
    /// Decoders recycle a small pool of buffers, so the identity cache
    /// normally holds a handful of entries. Growth past this threshold
    /// means the frame source is minting fresh buffer identities per
    /// frame and the cache is silently becoming a leak.
    pub max_cached_textures: usize,
}

impl Config {
    /// Creates a configuration with all default values.
    pub fn new() -> Self {
        Self {
            audio_buffer_ms: 200,
            filter_mode: FilterMode::Linear,
            allow_zero_copy: true,
            max_cached_textures: 32,
        }
    }

    /// Configuration tuned for minimum audio latency.
    ///
    /// ## When to Use
    /// Interactive audio (monitoring, instruments) where every
    /// millisecond of delay is audible and the producer thread is
    /// known to run at a high priority.
    pub fn low_latency() -> Self {
        Self {
            audio_buffer_ms: 20,
            ..Self::new()
        }
    }

    /// Configuration tuned to ride out scheduling storms.
    ///
    /// ## When to Use
    /// Playback on a loaded system where the producer thread gets
    /// descheduled for long stretches and a little extra latency is
    /// fine.
    pub fn high_throughput() -> Self {
        Self {
            audio_buffer_ms: 1000,
            ..Self::new()
        }
    }

    /// Validates the configuration.
    ///
    /// Returns a list of problems, or empty if all is well.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.audio_buffer_ms < 5 {
            errors.push(ConfigError::BufferTooShort(self.audio_buffer_ms));
        }
        if self.audio_buffer_ms > 2000 {
            errors.push(ConfigError::BufferTooLong(self.audio_buffer_ms));
        }
        if self.max_cached_textures == 0 {
            errors.push(ConfigError::ZeroTextureThreshold);
        }

        errors
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// TESTS
// ============================================
