//! # Simulated GPU Context
//!
//! A [`GpuContext`] with no GPU behind it. Used when no real driver is
//! available and for unit tests.
//!
//! ## Plain English
//!
//! This backend plays the part of the GPU driver and writes down every
//! call it receives. Tests can then ask "how many textures exist right
//! now?", "was that texture invalidated?", or "what ended up in the
//! direct storage?" and get exact answers, which is how the cache's
//! hot/cold/copy decisions are verified without any hardware.

use std::collections::HashSet;

use crate::config::FilterMode;
use crate::frame::{PixelFormat, MAX_PLANES};

use super::context::{GpuContext, TextureId};

// ============================================
// CALL LOG
// ============================================

/// One recorded driver call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuCall {
    Create(TextureId),
    Delete(TextureId),
    Bind(TextureId),
    SetFiltering,
    /// Zero-copy mapping of frame memory (recorded by address).
    MapDirect {
        texture: TextureId,
        memory: usize,
    },
    AllocateDirect,
    /// Cache-invalidate issued against the bound texture.
    Invalidate(TextureId),
}

// ============================================
// DIRECT STORAGE
// ============================================

/// Heap stand-in for the driver-owned direct-texture storage.
struct DirectStorage {
    planes: [Vec<u8>; MAX_PLANES],
}

impl DirectStorage {
    /// Allocates tightly-strided storage for the given geometry.
    fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            planes: format.plane_sizes(width, height).map(|size| vec![0u8; size]),
        }
    }
}

// ============================================
// SIMULATED GPU
// ============================================

/// A recording, heap-backed GPU context.
pub struct SimulatedGpu {
    current: bool,
    direct_supported: bool,
    next_id: u32,
    live: HashSet<TextureId>,
    bound: Option<TextureId>,
    direct: Option<DirectStorage>,
    calls: Vec<GpuCall>,
}

impl SimulatedGpu {
    /// Creates a backend that is current and fully capable.
    pub fn new() -> Self {
        Self {
            current: true,
            direct_supported: true,
            next_id: 1,
            live: HashSet::new(),
            bound: None,
            direct: None,
            calls: Vec::new(),
        }
    }

    /// Creates a backend whose direct-texture extension is missing,
    /// like a driver without the vendor entry points.
    pub fn without_direct_texturing() -> Self {
        Self {
            direct_supported: false,
            ..Self::new()
        }
    }

    /// Pretends the context was made (non-)current on this thread.
    pub fn set_current(&mut self, current: bool) {
        self.current = current;
    }

    /// Number of texture objects alive right now.
    pub fn live_texture_count(&self) -> usize {
        self.live.len()
    }

    /// The currently bound texture, if any.
    pub fn bound_texture(&self) -> Option<TextureId> {
        self.bound
    }

    /// Read access to direct storage plane `index` (for asserting on
    /// what the copy path wrote).
    pub fn direct_plane(&self, index: usize) -> Option<&[u8]> {
        self.direct.as_ref().map(|d| d.planes[index].as_slice())
    }

    /// The full call log, oldest first.
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Number of invalidate calls recorded so far.
    pub fn invalidate_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GpuCall::Invalidate(_)))
            .count()
    }

    /// Number of delete calls recorded so far.
    pub fn delete_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GpuCall::Delete(_)))
            .count()
    }
}

impl Default for SimulatedGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuContext for SimulatedGpu {
    fn is_current(&self) -> bool {
        self.current
    }

    fn supports_direct_texturing(&self) -> bool {
        self.direct_supported
    }

    fn create_texture(&mut self) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        self.calls.push(GpuCall::Create(id));
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        debug_assert!(self.live.contains(&texture), "double delete of {:?}", texture);
        self.live.remove(&texture);
        if self.bound == Some(texture) {
            self.bound = None;
        }
        self.calls.push(GpuCall::Delete(texture));
    }

    fn bind_texture(&mut self, texture: TextureId) {
        debug_assert!(self.live.contains(&texture), "bind of dead {:?}", texture);
        self.bound = Some(texture);
        self.calls.push(GpuCall::Bind(texture));
    }

    fn set_filtering(&mut self, _filter: FilterMode) {
        self.calls.push(GpuCall::SetFiltering);
    }

    fn map_direct(
        &mut self,
        _width: u32,
        _height: u32,
        _format: PixelFormat,
        memory: *const u8,
    ) -> bool {
        if !self.direct_supported {
            return false;
        }
        let texture = match self.bound {
            Some(t) => t,
            None => return false,
        };
        self.calls.push(GpuCall::MapDirect {
            texture,
            memory: memory as usize,
        });
        true
    }

    fn allocate_direct(&mut self, width: u32, height: u32, format: PixelFormat) -> bool {
        if self.bound.is_none() {
            return false;
        }
        self.direct = Some(DirectStorage::new(width, height, format));
        self.calls.push(GpuCall::AllocateDirect);
        true
    }

    fn direct_planes(&mut self) -> Option<[&mut [u8]; MAX_PLANES]> {
        let storage = self.direct.as_mut()?;
        let [a, b, c] = &mut storage.planes;
        Some([a.as_mut_slice(), b.as_mut_slice(), c.as_mut_slice()])
    }

    fn invalidate(&mut self) {
        if let Some(texture) = self.bound {
            self.calls.push(GpuCall::Invalidate(texture));
        }
    }
}

// ============================================
// TESTS
// ============================================
