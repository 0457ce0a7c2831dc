//! Render backend collaborator.
//!
//! Finalization is the only place the streaming layer talks to the GPU side.
//! It runs on the frame thread, so implementations never see concurrent
//! uploads from the asset manager.

use crate::hash::NameHash;
use crate::manifest::ShaderStage;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque id of a GPU-resident resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuResourceId(pub u64);

/// Texture data ready for upload
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub srgb: bool,
    /// Tightly packed RGBA8 pixels of mip 0
    pub pixels: &'a [u8],
}

pub trait RenderBackend: Send + Sync {
    fn upload_mesh(&self, name_hash: NameHash, positions: &[f32], indices: &[u32])
        -> GpuResourceId;

    fn upload_texture(&self, name_hash: NameHash, upload: &TextureUpload<'_>) -> GpuResourceId;

    fn create_shader_module(
        &self,
        name_hash: NameHash,
        stage: ShaderStage,
        entry_point: &str,
        source: &str,
    ) -> GpuResourceId;

    fn release(&self, id: GpuResourceId);
}

/// Backend without a GPU; issues ids and tracks live resources
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: AtomicU64,
    live: AtomicU64,
    uploaded_bytes: AtomicU64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources created and not yet released
    pub fn live_resources(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes.load(Ordering::Relaxed)
    }

    fn issue(&self, bytes: usize) -> GpuResourceId {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.uploaded_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        GpuResourceId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload_mesh(
        &self,
        _name_hash: NameHash,
        positions: &[f32],
        indices: &[u32],
    ) -> GpuResourceId {
        self.issue(std::mem::size_of_val(positions) + std::mem::size_of_val(indices))
    }

    fn upload_texture(&self, _name_hash: NameHash, upload: &TextureUpload<'_>) -> GpuResourceId {
        self.issue(upload.pixels.len())
    }

    fn create_shader_module(
        &self,
        _name_hash: NameHash,
        _stage: ShaderStage,
        _entry_point: &str,
        source: &str,
    ) -> GpuResourceId {
        self.issue(source.len())
    }

    fn release(&self, _id: GpuResourceId) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}
