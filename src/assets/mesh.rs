use crate::decoder::{AssetDecoder, ReadRequest, StreamedAsset};
use crate::error::{Result, StreamError};
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType};
use crate::render::{GpuResourceId, RenderBackend};
use crate::storage::StorageBackend;
use glam::Vec3;
use speedy::{Endianness, Readable, Writable};
use std::time::Duration;

pub const MESH_FORMAT_VERSION: u32 = 1;

/// On-disk mesh container
#[derive(Clone, Debug, PartialEq, Readable, Writable)]
pub struct MeshData {
    pub version: u32,
    /// xyz triples
    pub positions: Vec<f32>,
    /// xyz triples, empty or one per vertex
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            version: MESH_FORMAT_VERSION,
            positions,
            normals,
            indices,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data = Self::read_from_buffer_with_ctx(Endianness::LittleEndian, bytes)
            .map_err(|e| StreamError::Decode(format!("Invalid mesh container: {e}")))?;
        data.validate()?;
        Ok(data)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.write_to_vec_with_ctx(Endianness::LittleEndian)
            .map_err(|e| StreamError::Decode(format!("Failed to encode mesh: {e}")))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != MESH_FORMAT_VERSION {
            return Err(StreamError::Decode(format!(
                "Unsupported mesh version {}",
                self.version
            )));
        }
        if self.positions.len() % 3 != 0 {
            return Err(StreamError::Decode(
                "Mesh positions are not xyz triples".to_string(),
            ));
        }
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            return Err(StreamError::Decode(
                "Mesh normal count does not match vertex count".to_string(),
            ));
        }
        let vertices = self.vertex_count();
        if let Some(index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(StreamError::Decode(format!(
                "Mesh index {index} out of range ({vertices} vertices)"
            )));
        }
        Ok(())
    }

    /// Axis-aligned bounds, zero for an empty mesh
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut points = self
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]));
        let Some(first) = points.next() else {
            return (Vec3::ZERO, Vec3::ZERO);
        };
        points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)))
    }

    fn scale(&mut self, factor: f32) {
        if factor != 1.0 {
            self.positions.iter_mut().for_each(|v| *v *= factor);
        }
    }

    /// Unit cube centred on the origin
    pub fn unit_cube() -> Self {
        #[rustfmt::skip]
        let positions = vec![
            -0.5, -0.5, -0.5,   0.5, -0.5, -0.5,   0.5, 0.5, -0.5,   -0.5, 0.5, -0.5,
            -0.5, -0.5,  0.5,   0.5, -0.5,  0.5,   0.5, 0.5,  0.5,   -0.5, 0.5,  0.5,
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 6, 2, 3, 7, 6, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self::new(positions, Vec::new(), indices)
    }
}

/// Resident mesh
#[derive(Debug)]
pub struct Mesh {
    pub data: MeshData,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub gpu_buffer: GpuResourceId,
}

impl StreamedAsset for Mesh {
    const ASSET_TYPE: AssetType = AssetType::Mesh;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MeshDecoder;

impl AssetDecoder for MeshDecoder {
    type Asset = Mesh;
    type Staged = MeshData;

    const ASSET_TYPE: AssetType = AssetType::Mesh;

    fn read_file(&self, storage: &dyn StorageBackend, request: &ReadRequest) -> Result<MeshData> {
        let AssetMetadata::Mesh(metadata) = &request.metadata else {
            return super::metadata_mismatch(&request.path, &request.metadata);
        };
        let bytes = storage.read_all(&request.path)?;
        let mut data = MeshData::from_bytes(&bytes)?;
        data.scale(metadata.scale);
        Ok(data)
    }

    fn estimate_finalize_cost(&self, _metadata: &AssetMetadata) -> Duration {
        Duration::from_micros(200)
    }

    fn finalize(&self, name_hash: NameHash, data: MeshData, backend: &dyn RenderBackend) -> Mesh {
        let (bounds_min, bounds_max) = data.bounds();
        let gpu_buffer = backend.upload_mesh(name_hash, &data.positions, &data.indices);
        Mesh {
            data,
            bounds_min,
            bounds_max,
            gpu_buffer,
        }
    }

    fn perform_free(&self, mesh: &Mesh, backend: &dyn RenderBackend) {
        backend.release(mesh.gpu_buffer);
    }

    fn missing_staged(&self, _metadata: Option<&AssetMetadata>) -> MeshData {
        MeshData::unit_cube()
    }
}
