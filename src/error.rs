//! # Error Types Module
//!
//! All error types used throughout media-fastpath.
//!
//! ## Plain English
//!
//! When things go wrong, we need labels that say exactly WHAT went
//! wrong, because the recovery differs:
//!
//! - A bad configuration value is the caller's bug: report it loudly.
//! - A frame that won't expose its memory means "skip this one frame".
//! - A missing GPU capability means "fall back to the slower path".
//!
//! Most runtime failures in this library are deliberately soft (a
//! skipped bind, a truncated write). The types here cover the hard
//! ones: fallible construction and frame mapping.

use thiserror::Error;

use crate::frame::PixelFormat;

// ============================================
// MAIN LIBRARY ERROR
// ============================================

/// The top-level error type for media-fastpath.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value was out of bounds.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A video frame misbehaved.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A GPU texture operation could not proceed.
    #[error("texture error: {0}")]
    Texture(#[from] TextureError),
}

// ============================================
// CONFIGURATION ERRORS
// ============================================

/// Errors for configuration values outside their valid range.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Audio buffer duration is too short to survive scheduling jitter.
    #[error("audio buffer of {0} ms is too short (minimum 5 ms)")]
    BufferTooShort(u32),

    /// Audio buffer duration is long enough to be audible latency.
    #[error("audio buffer of {0} ms is too long (maximum 2000 ms)")]
    BufferTooLong(u32),

    /// The cached-texture warning threshold is zero.
    #[error("cached-texture warning threshold must be at least 1")]
    ZeroTextureThreshold,
}

// ============================================
// FRAME ERRORS
// ============================================

/// Errors raised by video frame sources.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameError {
    /// The frame refused read-only access to its backing memory.
    ///
    /// The texture cache treats this as a skipped render pass, not a
    /// fatal condition.
    #[error("frame memory could not be mapped")]
    MapFailed,

    /// Frame dimensions don't satisfy the pixel format's subsampling.
    #[error("dimensions {width}x{height} invalid for {format:?} (4:2:0 needs even sizes)")]
    InvalidDimensions {
        width: u32,
        height: u32,
        format: PixelFormat,
    },
}

// ============================================
// TEXTURE ERRORS
// ============================================

/// Errors raised by the GPU texture path.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TextureError {
    /// No GPU context is current on the calling thread.
    #[error("no GPU context is current on this thread")]
    ContextNotCurrent,

    /// The vendor direct-texture entry points are unavailable.
    #[error("direct texturing is not supported by this GPU context")]
    DirectTexturingUnavailable,
}

// ============================================
// RESULT TYPE ALIAS
// ============================================

/// Shorthand for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================
// TESTS
// ============================================
