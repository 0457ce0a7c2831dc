// Built-in asset types
//
// Minimal readers for the four streamed asset types:
// - Mesh: speedy-encoded vertex/index buffers
// - Texture: PNG/JPEG decoded to RGBA8
// - Shader: UTF-8 source
// - Font: validated face bytes

pub mod font;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use font::{Font, FontDecoder};
pub use mesh::{Mesh, MeshData, MeshDecoder, MESH_FORMAT_VERSION};
pub use shader::{Shader, ShaderDecoder};
pub use texture::{Texture, TextureDecoder};

use crate::error::{Result, StreamError};
use crate::manifest::AssetMetadata;

/// Reject metadata that belongs to another asset type
pub(crate) fn metadata_mismatch<T>(path: &str, metadata: &AssetMetadata) -> Result<T> {
    Err(StreamError::Decode(format!(
        "{path}: unexpected {} metadata",
        metadata.asset_type()
    )))
}
