//! # Vivante GL Backend
//!
//! A [`GpuContext`] over an OpenGL ES context with the Vivante
//! direct-texture extension.
//!
//! ## Plain English
//!
//! Vivante GPUs (i.MX6-class hardware) expose three extra GL entry
//! points that let a texture sample straight out of ordinary memory:
//!
//! - `glTexDirectVIV`: allocate driver-owned storage for a texture and
//!   hand back pointers to its planes (our copy-path staging target)
//! - `glTexDirectVIVMap`: point a texture at caller-owned memory with
//!   no copy at all (the zero-copy path)
//! - `glTexDirectInvalidateVIV`: tell the GPU the memory behind a
//!   texture changed
//!
//! Drivers that lack any of the three simply don't export the symbol.
//! We resolve all three once at construction; if one is missing, the
//! zero-copy path stays off for the lifetime of this backend and every
//! frame goes through the ordinary copy upload.
//!
//! Standard texture calls go through glow, same as the rest of the GL
//! ecosystem. Whether a context is current on the calling thread is
//! something GL won't tell us portably, so the embedder supplies a
//! probe (EGL, surfman and friends all know the answer).

use std::ffi::c_void;
use std::num::NonZeroU32;
use std::sync::Arc;

use glow::HasContext as _;

use crate::config::FilterMode;
use crate::frame::{PixelFormat, MAX_PLANES};

use super::context::{GpuContext, TextureId};

// ============================================
// VENDOR ENTRY POINTS
// ============================================

type TexDirectVivFn =
    unsafe extern "C" fn(target: u32, width: i32, height: i32, format: u32, pixels: *mut *mut c_void);

type TexDirectVivMapFn = unsafe extern "C" fn(
    target: u32,
    width: i32,
    height: i32,
    format: u32,
    logical: *mut *mut c_void,
    physical: *mut u32,
);

type TexDirectInvalidateVivFn = unsafe extern "C" fn(target: u32);

/// Driver-owned staging storage returned by `glTexDirectVIV`.
struct DirectStorage {
    pointers: [*mut u8; MAX_PLANES],
    sizes: [usize; MAX_PLANES],
}

// ============================================
// BACKEND
// ============================================

/// GL-backed [`GpuContext`] with Vivante direct texturing.
pub struct VivanteGl {
    gl: Arc<glow::Context>,

    /// Reports whether a GL context is current on this thread.
    current_probe: Box<dyn Fn() -> bool>,

    tex_direct: Option<TexDirectVivFn>,
    tex_direct_map: Option<TexDirectVivMapFn>,
    tex_direct_invalidate: Option<TexDirectInvalidateVivFn>,

    direct: Option<DirectStorage>,
}

impl VivanteGl {
    /// Creates a backend over `gl`, resolving the vendor entry points
    /// through `loader` (the same proc-address loader the glow context
    /// was built from).
    ///
    /// ## Parameters
    /// - `gl`: the glow context for standard texture calls
    /// - `loader`: proc-address resolver for the vendor entry points
    /// - `current_probe`: returns whether a GL context is current on
    ///   the calling thread
    pub fn new(
        gl: Arc<glow::Context>,
        mut loader: impl FnMut(&str) -> *const c_void,
        current_probe: impl Fn() -> bool + 'static,
    ) -> Self {
        // SAFETY: the loader returns either null or the address of the
        // named GL entry point, whose signature is fixed by the
        // extension.
        let tex_direct = {
            let ptr = loader("glTexDirectVIV");
            (!ptr.is_null()).then(|| unsafe { std::mem::transmute::<_, TexDirectVivFn>(ptr) })
        };
        let tex_direct_map = {
            let ptr = loader("glTexDirectVIVMap");
            (!ptr.is_null()).then(|| unsafe { std::mem::transmute::<_, TexDirectVivMapFn>(ptr) })
        };
        let tex_direct_invalidate = {
            let ptr = loader("glTexDirectInvalidateVIV");
            (!ptr.is_null())
                .then(|| unsafe { std::mem::transmute::<_, TexDirectInvalidateVivFn>(ptr) })
        };

        if tex_direct.is_none() || tex_direct_map.is_none() || tex_direct_invalidate.is_none() {
            log::warn!(
                "couldn't resolve glTexDirectVIV/glTexDirectVIVMap/glTexDirectInvalidateVIV; \
                 zero-copy texturing disabled"
            );
        } else {
            log::info!("Vivante direct texturing available");
        }

        Self {
            gl,
            current_probe: Box::new(current_probe),
            tex_direct,
            tex_direct_map,
            tex_direct_invalidate,
            direct: None,
        }
    }

    fn native(texture: TextureId) -> Option<glow::NativeTexture> {
        NonZeroU32::new(texture.0).map(glow::NativeTexture)
    }
}

impl GpuContext for VivanteGl {
    fn is_current(&self) -> bool {
        (self.current_probe)()
    }

    fn supports_direct_texturing(&self) -> bool {
        self.tex_direct.is_some()
            && self.tex_direct_map.is_some()
            && self.tex_direct_invalidate.is_some()
    }

    fn create_texture(&mut self) -> TextureId {
        // SAFETY: plain GL object creation; context is current per the
        // cache's calling contract.
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => TextureId(texture.0.get()),
            Err(e) => {
                log::error!("glGenTextures failed: {}", e);
                TextureId(0)
            }
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(native) = Self::native(texture) {
            // SAFETY: deleting a texture we created.
            unsafe { self.gl.delete_texture(native) };
        }
    }

    fn bind_texture(&mut self, texture: TextureId) {
        // SAFETY: binding to the fixed 2D target.
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, Self::native(texture)) };
    }

    fn set_filtering(&mut self, filter: FilterMode) {
        let mode = match filter {
            FilterMode::Linear => glow::LINEAR,
            FilterMode::Nearest => glow::NEAREST,
        } as i32;

        // SAFETY: parameter setup on the bound texture.
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mode);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, mode);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    fn map_direct(&mut self, width: u32, height: u32, format: PixelFormat, memory: *const u8) -> bool {
        let map = match self.tex_direct_map {
            Some(f) => f,
            None => return false,
        };

        let mut logical = memory as *mut c_void;
        // The driver resolves the physical address itself when handed
        // the all-ones sentinel.
        let mut physical: u32 = !0u32;

        // SAFETY: entry point resolved from the driver; `memory` stays
        // valid for the texture's lifetime per the trait contract.
        unsafe {
            map(
                glow::TEXTURE_2D,
                width as i32,
                height as i32,
                format.gl_format(),
                &mut logical,
                &mut physical,
            );
        }
        true
    }

    fn allocate_direct(&mut self, width: u32, height: u32, format: PixelFormat) -> bool {
        let alloc = match self.tex_direct {
            Some(f) => f,
            None => return false,
        };

        let mut pointers: [*mut c_void; MAX_PLANES] = [std::ptr::null_mut(); MAX_PLANES];
        // SAFETY: entry point resolved from the driver; it fills one
        // pointer per plane of the format.
        unsafe {
            alloc(
                glow::TEXTURE_2D,
                width as i32,
                height as i32,
                format.gl_format(),
                pointers.as_mut_ptr(),
            );
        }
        if pointers[0].is_null() {
            return false;
        }

        self.direct = Some(DirectStorage {
            pointers: pointers.map(|p| p as *mut u8),
            sizes: format.plane_sizes(width, height),
        });
        true
    }

    fn direct_planes(&mut self) -> Option<[&mut [u8]; MAX_PLANES]> {
        let storage = self.direct.as_ref()?;

        let mut planes: [&mut [u8]; MAX_PLANES] = [&mut [], &mut [], &mut []];
        for (slot, (&pointer, &size)) in planes
            .iter_mut()
            .zip(storage.pointers.iter().zip(storage.sizes.iter()))
        {
            if !pointer.is_null() && size > 0 {
                // SAFETY: the driver allocated `size` bytes behind
                // `pointer` when the storage was created, and it stays
                // valid until the owning texture is deleted.
                *slot = unsafe { std::slice::from_raw_parts_mut(pointer, size) };
            }
        }
        Some(planes)
    }

    fn invalidate(&mut self) {
        if let Some(invalidate) = self.tex_direct_invalidate {
            // SAFETY: entry point resolved from the driver; acts on
            // the bound texture.
            unsafe { invalidate(glow::TEXTURE_2D) };
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    // A glow context built from a null loader makes no GL calls in
    // these tests; only the resolution logic is exercised.
    fn null_backend() -> VivanteGl {
        let gl = unsafe { glow::Context::from_loader_function(|_| std::ptr::null()) };
        VivanteGl::new(Arc::new(gl), |_| std::ptr::null(), || false)
    }

    #[test]
    fn test_missing_entry_points_disable_direct_texturing() {
        let backend = null_backend();
        assert!(!backend.supports_direct_texturing());
    }

    #[test]
    fn test_current_probe_is_consulted() {
        let backend = null_backend();
        assert!(!backend.is_current());
    }

    #[test]
    fn test_map_and_allocate_refuse_without_entry_points() {
        let mut backend = null_backend();
        assert!(!backend.map_direct(64, 64, PixelFormat::Nv12, std::ptr::null()));
        assert!(!backend.allocate_direct(64, 64, PixelFormat::Nv12));
        assert!(backend.direct_planes().is_none());
    }
}
