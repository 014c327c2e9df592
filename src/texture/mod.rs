//! # Frame Texture Module
//!
//! Maps decoded video frames onto GPU textures with as little copying
//! as the hardware allows.
//!
//! ## Plain English
//!
//! Uploading every video frame to the GPU is the single biggest cost
//! in software video presentation. Two observations make it avoidable:
//!
//! 1. Decoders recycle a small pool of buffers. Once the GPU has a
//!    texture pointed at a buffer's memory, seeing that buffer again
//!    only needs "re-read that memory", not a new upload.
//! 2. Some hardware can sample a texture straight out of ordinary
//!    memory (direct texturing), so even the first sighting of a
//!    buffer needs no copy at all.
//!
//! The [`FrameTextureCache`] implements both: an identity cache from
//! buffer to texture for the zero-copy path, and a single reused
//! staging texture for frames that cannot be mapped directly.
//!
//! ```text
//!   decoder thread                      render thread
//!   ──────────────                      ─────────────
//!   FrameSink::submit ──▶ mailbox ──▶ FrameTextureCache::bind
//!                      (latest wins)        │
//!                                   known buffer? ──▶ invalidate (hot)
//!                                   new buffer?   ──▶ map directly (cold)
//!                                   not mappable? ──▶ copy planes
//! ```

mod context;
mod gl;
mod simulated;

pub use context::{GpuContext, TextureId};
pub use gl::VivanteGl;
pub use simulated::{GpuCall, SimulatedGpu};

use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer::{FrameMailbox, FrameSink};
use crate::config::{Config, FilterMode};
use crate::frame::{BufferId, PixelFormat, VideoFrame};

// ============================================
// STATISTICS
// ============================================

/// Counters describing what the cache has been doing.
#[derive(Clone, Debug, Default)]
pub struct CacheStats {
    /// GPU textures created (both paths).
    pub textures_created: u64,
    /// Hot-path binds: buffer already mapped, invalidate only.
    pub hot_binds: u64,
    /// Frames that went through the plane-copy fallback.
    pub copies: u64,
    /// Binds skipped (no context, map failure, driver refusal).
    pub skipped_binds: u64,
    /// GPU textures deleted.
    pub textures_released: u64,
}

// ============================================
// FRAME TEXTURE CACHE
// ============================================

/// Resolves submitted video frames to GPU texture handles, reusing
/// textures whenever the same buffer comes around again.
///
/// ## Thread model
///
/// Two actors touch a cache:
///
/// - Any thread may [`submit`](FrameSink::submit) frames through the
///   [`FrameSink`]; the hand-off is a mutex-guarded one-slot mailbox.
/// - Exactly one thread, the one owning the GPU context, calls
///   [`bind`](FrameTextureCache::bind) and everything else.
///
/// ## Texture lifetime
///
/// Cached textures live until the frame geometry (size or pixel
/// format) changes, [`release_textures`](FrameTextureCache::release_textures)
/// is called, or the cache is dropped. A geometry change deletes every
/// cached handle before any new one is created, so stale textures for
/// the old geometry can never be sampled.
pub struct FrameTextureCache<F: VideoFrame, C: GpuContext> {
    context: C,
    mailbox: Arc<FrameMailbox<F>>,

    /// The frame currently backing the bound texture. Held so its
    /// memory stays alive and mapped while the GPU may sample it;
    /// replacing it releases the previous frame's mapping.
    current: Option<F>,
    current_texture: Option<TextureId>,

    // Geometry of the currently allocated texture set.
    width: u32,
    height: u32,
    format: Option<PixelFormat>,

    /// Identity cache: one texture per distinct source buffer.
    textures: HashMap<BufferId, TextureId>,

    /// The single staging texture for the copy fallback, allocated on
    /// first use and reused for every non-mappable frame of the same
    /// geometry.
    direct_texture: Option<TextureId>,

    filter: FilterMode,
    allow_zero_copy: bool,
    max_cached_textures: usize,

    warned_no_direct: bool,
    warned_pool_growth: bool,

    stats: CacheStats,
}

impl<F: VideoFrame, C: GpuContext> FrameTextureCache<F, C> {
    /// Creates a cache with default configuration.
    ///
    /// Returns the cache (for the render thread) and the submission
    /// sink (for everyone else).
    pub fn new(context: C) -> (Self, FrameSink<F>) {
        Self::with_config(context, &Config::default())
    }

    /// Creates a cache with the given configuration.
    pub fn with_config(context: C, config: &Config) -> (Self, FrameSink<F>) {
        let mailbox = Arc::new(FrameMailbox::new());
        let sink = FrameSink::new(Arc::clone(&mailbox));

        log::info!(
            "Creating frame texture cache (zero-copy {})",
            if config.allow_zero_copy && context.supports_direct_texturing() {
                "enabled"
            } else {
                "disabled"
            }
        );

        let cache = Self {
            context,
            mailbox,
            current: None,
            current_texture: None,
            width: 0,
            height: 0,
            format: None,
            textures: HashMap::new(),
            direct_texture: None,
            filter: config.filter_mode,
            allow_zero_copy: config.allow_zero_copy,
            max_cached_textures: config.max_cached_textures,
            warned_no_direct: false,
            warned_pool_growth: false,
            stats: CacheStats::default(),
        };
        (cache, sink)
    }

    /// Returns an additional submission handle.
    pub fn sink(&self) -> FrameSink<F> {
        FrameSink::new(Arc::clone(&self.mailbox))
    }

    /// Resolves the newest submitted frame to a texture and binds it.
    ///
    /// Must be called on the thread owning the GPU context. Returns
    /// the bound texture, or `None` when this render pass should be
    /// skipped (no context current, no frame ever submitted, or the
    /// pending frame refused to map; in the last case the previously
    /// bound frame and texture are retained untouched).
    pub fn bind(&mut self) -> Option<TextureId> {
        if !self.context.is_current() {
            log::warn!("bind skipped: no GPU context current on this thread");
            self.stats.skipped_binds += 1;
            return None;
        }

        if let Some(pending) = self.mailbox.take() {
            match self.resolve(&pending.frame, pending.mappable) {
                Some(texture) => {
                    // Promote. Dropping the previous frame releases its
                    // memory mapping now that the texture no longer
                    // samples it.
                    self.current = Some(pending.frame);
                    self.current_texture = Some(texture);
                    Some(texture)
                }
                None => {
                    self.stats.skipped_binds += 1;
                    None
                }
            }
        } else if let Some(texture) = self.current_texture {
            // Nothing new: re-bind what we already resolved.
            self.context.bind_texture(texture);
            Some(texture)
        } else {
            None
        }
    }

    /// Runs the mapping algorithm for one frame.
    fn resolve(&mut self, frame: &F, mappable: bool) -> Option<TextureId> {
        let width = frame.width();
        let height = frame.height();
        let format = frame.pixel_format();

        // A new geometry invalidates every texture we own. Release
        // them all before creating anything for the new one.
        if self.width != width || self.height != height || self.format != Some(format) {
            if self.format.is_some() {
                log::debug!(
                    "geometry change {}x{} {:?} -> {}x{} {:?}, releasing textures",
                    self.width,
                    self.height,
                    self.format,
                    width,
                    height,
                    format
                );
            }
            self.release_textures();
            self.current = None;
            self.current_texture = None;
            self.width = width;
            self.height = height;
            self.format = Some(format);
        }

        let mapped = match frame.map() {
            Ok(mapped) => mapped,
            Err(e) => {
                log::warn!("frame refused to map ({}), skipping this bind", e);
                return None;
            }
        };

        let zero_copy =
            mappable && self.allow_zero_copy && self.context.supports_direct_texturing();
        if mappable && self.allow_zero_copy && !self.context.supports_direct_texturing() {
            self.warn_no_direct_once();
        }

        if zero_copy {
            let id = frame.buffer_id();
            if let Some(&texture) = self.textures.get(&id) {
                // Hot path: the GPU already has this buffer mapped.
                // Just tell it the contents changed.
                self.context.bind_texture(texture);
                self.context.invalidate();
                self.stats.hot_binds += 1;
                Some(texture)
            } else {
                // Cold path: first sighting of this buffer.
                let texture = self.context.create_texture();
                self.context.bind_texture(texture);
                self.context.set_filtering(self.filter);

                let memory = mapped.plane(0).data.as_ptr();
                if !self.context.map_direct(width, height, format, memory) {
                    log::warn!("driver refused direct mapping, skipping this bind");
                    self.context.delete_texture(texture);
                    return None;
                }
                self.context.invalidate();

                self.textures.insert(id, texture);
                self.stats.textures_created += 1;
                if self.textures.len() > self.max_cached_textures && !self.warned_pool_growth {
                    log::warn!(
                        "{} textures cached (threshold {}); is the frame source \
                         minting a fresh buffer id per frame?",
                        self.textures.len(),
                        self.max_cached_textures
                    );
                    self.warned_pool_growth = true;
                }
                Some(texture)
            }
        } else {
            // Copy fallback: one staging texture, allocated once per
            // geometry, refilled per frame.
            match self.direct_texture {
                Some(texture) => self.context.bind_texture(texture),
                None => {
                    let texture = self.context.create_texture();
                    self.context.bind_texture(texture);
                    self.context.set_filtering(self.filter);
                    if !self.context.allocate_direct(width, height, format) {
                        log::warn!("driver refused staging allocation, skipping this bind");
                        self.context.delete_texture(texture);
                        return None;
                    }
                    self.direct_texture = Some(texture);
                    self.stats.textures_created += 1;
                }
            }

            {
                let planes = match self.context.direct_planes() {
                    Some(planes) => planes,
                    None => {
                        log::warn!("staging texture has no storage, skipping this bind");
                        return None;
                    }
                };
                for index in 0..format.plane_count() {
                    let src = mapped.plane(index);
                    let rows = format.plane_copy_rows(height, index) as usize;
                    let bytes = (rows * src.stride)
                        .min(src.data.len())
                        .min(planes[index].len());
                    planes[index][..bytes].copy_from_slice(&src.data[..bytes]);
                }
            }
            self.context.invalidate();
            self.stats.copies += 1;
            self.direct_texture
        }
    }

    /// Deletes every cached texture and the staging texture.
    pub fn release_textures(&mut self) {
        for (_, texture) in self.textures.drain() {
            self.context.delete_texture(texture);
            self.stats.textures_released += 1;
        }
        if let Some(texture) = self.direct_texture.take() {
            self.context.delete_texture(texture);
            self.stats.textures_released += 1;
        }
    }

    fn warn_no_direct_once(&mut self) {
        if !self.warned_no_direct {
            log::warn!(
                "direct texturing unavailable; mappable frames will use the copy path"
            );
            self.warned_no_direct = true;
        }
    }

    /// Number of buffers currently resolved to textures.
    pub fn cached_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// The geometry the current texture set was allocated for.
    pub fn geometry(&self) -> Option<(u32, u32, PixelFormat)> {
        self.format.map(|format| (self.width, self.height, format))
    }

    /// The texture from the most recent successful resolve.
    pub fn current_texture(&self) -> Option<TextureId> {
        self.current_texture
    }

    /// A copy of the running statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Borrow of the injected GPU backend.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable borrow of the injected GPU backend.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

impl<F: VideoFrame, C: GpuContext> Drop for FrameTextureCache<F, C> {
    fn drop(&mut self) {
        let live = self.textures.len() + usize::from(self.direct_texture.is_some());
        if live == 0 {
            return;
        }
        if self.context.is_current() {
            self.release_textures();
        } else {
            // Issuing GPU calls without a current context is worse
            // than the leak.
            log::warn!(
                "texture cache dropped without a current GPU context; {} texture(s) leaked",
                live
            );
        }
    }
}

// ============================================
// TESTS
// ============================================
