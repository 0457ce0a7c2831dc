use crate::decoder::{AssetDecoder, ReadRequest, StreamedAsset};
use crate::error::{Result, StreamError};
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType, ShaderStage};
use crate::render::{GpuResourceId, RenderBackend};
use crate::storage::StorageBackend;
use std::time::Duration;

const MISSING_VERTEX: &str = "@vertex\nfn main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {\n    return vec4<f32>(position, 1.0);\n}\n";
const MISSING_FRAGMENT: &str =
    "@fragment\nfn main() -> @location(0) vec4<f32> {\n    return vec4<f32>(1.0, 0.0, 1.0, 1.0);\n}\n";
const MISSING_COMPUTE: &str = "@compute @workgroup_size(1)\nfn main() {}\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub source: String,
}

/// Resident shader module
#[derive(Debug)]
pub struct Shader {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub source: String,
    pub module: GpuResourceId,
}

impl StreamedAsset for Shader {
    const ASSET_TYPE: AssetType = AssetType::Shader;
}

/// Built-in magenta shader for `stage`
pub fn missing_shader_source(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => MISSING_VERTEX,
        ShaderStage::Fragment => MISSING_FRAGMENT,
        ShaderStage::Compute => MISSING_COMPUTE,
    }
}

/// Decodes shaders; the fallback stage is used for the canonical missing shader
#[derive(Debug, Clone, Copy)]
pub struct ShaderDecoder {
    pub fallback_stage: ShaderStage,
}

impl Default for ShaderDecoder {
    fn default() -> Self {
        Self {
            fallback_stage: ShaderStage::Fragment,
        }
    }
}

impl AssetDecoder for ShaderDecoder {
    type Asset = Shader;
    type Staged = ShaderSource;

    const ASSET_TYPE: AssetType = AssetType::Shader;

    fn read_file(
        &self,
        storage: &dyn StorageBackend,
        request: &ReadRequest,
    ) -> Result<ShaderSource> {
        let AssetMetadata::Shader(metadata) = &request.metadata else {
            return super::metadata_mismatch(&request.path, &request.metadata);
        };
        let bytes = storage.read_all(&request.path)?;
        let source = String::from_utf8(bytes)
            .map_err(|e| StreamError::Decode(format!("{}: {e}", request.path)))?;
        if !source.contains(metadata.entry_point.as_str()) {
            return Err(StreamError::Decode(format!(
                "{}: entry point '{}' not found",
                request.path, metadata.entry_point
            )));
        }
        Ok(ShaderSource {
            stage: metadata.stage,
            entry_point: metadata.entry_point.clone(),
            source,
        })
    }

    fn estimate_finalize_cost(&self, _metadata: &AssetMetadata) -> Duration {
        Duration::from_millis(1)
    }

    fn finalize(
        &self,
        name_hash: NameHash,
        staged: ShaderSource,
        backend: &dyn RenderBackend,
    ) -> Shader {
        let module =
            backend.create_shader_module(name_hash, staged.stage, &staged.entry_point, &staged.source);
        Shader {
            stage: staged.stage,
            entry_point: staged.entry_point,
            source: staged.source,
            module,
        }
    }

    fn perform_free(&self, shader: &Shader, backend: &dyn RenderBackend) {
        backend.release(shader.module);
    }

    fn missing_staged(&self, metadata: Option<&AssetMetadata>) -> ShaderSource {
        let stage = match metadata {
            Some(AssetMetadata::Shader(metadata)) => metadata.stage,
            _ => self.fallback_stage,
        };
        ShaderSource {
            stage,
            entry_point: "main".to_string(),
            source: missing_shader_source(stage).to_string(),
        }
    }
}
