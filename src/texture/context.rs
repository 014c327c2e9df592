//! # GPU Context Capabilities
//!
//! The small set of GPU operations the texture cache needs, expressed
//! as a trait so the cache never talks to a driver directly.
//!
//! ## Plain English
//!
//! The cache doesn't need "OpenGL". It needs six things: make a
//! texture, delete a texture, bind a texture, point a texture at some
//! frame memory without copying, get at a texture's own storage for
//! copying into, and tell the GPU "that memory changed, re-read it".
//! Handing the cache exactly those six operations keeps driver
//! specifics (and driver bugs) in one replaceable place.

use crate::config::FilterMode;
use crate::frame::{PixelFormat, MAX_PLANES};

// ============================================
// TEXTURE HANDLE
// ============================================

/// Opaque GPU texture handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

// ============================================
// GPU CONTEXT TRAIT
// ============================================

/// The capabilities a GPU backend must provide to the texture cache.
///
/// All methods are called from the rendering thread only. The three
/// direct-texture operations (`map_direct`, `allocate_direct`,
/// `invalidate`) correspond to vendor extension entry points; a
/// backend that could not resolve them reports `false` from
/// [`supports_direct_texturing`](GpuContext::supports_direct_texturing)
/// for the rest of its life, and the cache routes every frame through
/// the copy path.
pub trait GpuContext {
    /// Whether a GPU context is current on the calling thread.
    ///
    /// When this returns `false` the cache skips the whole bind; no
    /// other method will be called.
    fn is_current(&self) -> bool;

    /// Whether the zero-copy mapping operations are available.
    fn supports_direct_texturing(&self) -> bool;

    /// Creates a new texture object.
    fn create_texture(&mut self) -> TextureId;

    /// Deletes a texture object.
    fn delete_texture(&mut self, texture: TextureId);

    /// Makes `texture` the active texture for subsequent operations.
    fn bind_texture(&mut self, texture: TextureId);

    /// Applies scaling filter and edge clamping to the bound texture.
    fn set_filtering(&mut self, filter: FilterMode);

    /// Points the bound texture at `memory` without copying.
    ///
    /// `memory` is the start of the frame's plane data; it must stay
    /// valid and unchanged in layout for as long as the texture may be
    /// sampled. Returns `false` if the driver refused the mapping.
    fn map_direct(&mut self, width: u32, height: u32, format: PixelFormat, memory: *const u8)
        -> bool;

    /// Allocates driver-owned storage for the bound texture, sized for
    /// the given geometry, to be filled through
    /// [`direct_planes`](GpuContext::direct_planes).
    ///
    /// Returns `false` if the driver refused the allocation.
    fn allocate_direct(&mut self, width: u32, height: u32, format: PixelFormat) -> bool;

    /// Writable views of the storage allocated by
    /// [`allocate_direct`](GpuContext::allocate_direct), one per
    /// plane; unused slots are empty. `None` if no storage exists.
    fn direct_planes(&mut self) -> Option<[&mut [u8]; MAX_PLANES]>;

    /// Tells the GPU the memory behind the bound texture changed and
    /// any texture cache of it must be refreshed.
    fn invalidate(&mut self);
}

// A mutable borrow of a backend is itself a backend, so callers can
// lend a context to a cache without giving it up.
impl<G: GpuContext + ?Sized> GpuContext for &mut G {
    fn is_current(&self) -> bool {
        (**self).is_current()
    }

    fn supports_direct_texturing(&self) -> bool {
        (**self).supports_direct_texturing()
    }

    fn create_texture(&mut self) -> TextureId {
        (**self).create_texture()
    }

    fn delete_texture(&mut self, texture: TextureId) {
        (**self).delete_texture(texture)
    }

    fn bind_texture(&mut self, texture: TextureId) {
        (**self).bind_texture(texture)
    }

    fn set_filtering(&mut self, filter: FilterMode) {
        (**self).set_filtering(filter)
    }

    fn map_direct(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        memory: *const u8,
    ) -> bool {
        (**self).map_direct(width, height, format, memory)
    }

    fn allocate_direct(&mut self, width: u32, height: u32, format: PixelFormat) -> bool {
        (**self).allocate_direct(width, height, format)
    }

    fn direct_planes(&mut self) -> Option<[&mut [u8]; MAX_PLANES]> {
        (**self).direct_planes()
    }

    fn invalidate(&mut self) {
        (**self).invalidate()
    }
}
