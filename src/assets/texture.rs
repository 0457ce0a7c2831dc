use crate::decoder::{AssetDecoder, ReadRequest, StreamedAsset};
use crate::error::{Result, StreamError};
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType, TextureFilter};
use crate::render::{GpuResourceId, RenderBackend, TextureUpload};
use crate::storage::StorageBackend;
use std::time::Duration;

const CHECKER_SIZE: u32 = 8;
const MAGENTA: [u8; 4] = [255, 0, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// Decoded RGBA8 image waiting for upload
#[derive(Clone, Debug)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub srgb: bool,
    pub filter: TextureFilter,
    pub pixels: Vec<u8>,
}

/// Resident texture; CPU pixels are dropped after upload
#[derive(Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub srgb: bool,
    pub filter: TextureFilter,
    pub gpu_texture: GpuResourceId,
}

impl StreamedAsset for Texture {
    const ASSET_TYPE: AssetType = AssetType::Texture;
}

/// Full mip chain length for a `width` x `height` image
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextureDecoder;

impl AssetDecoder for TextureDecoder {
    type Asset = Texture;
    type Staged = TexturePixels;

    const ASSET_TYPE: AssetType = AssetType::Texture;

    fn read_file(
        &self,
        storage: &dyn StorageBackend,
        request: &ReadRequest,
    ) -> Result<TexturePixels> {
        let AssetMetadata::Texture(metadata) = &request.metadata else {
            return super::metadata_mismatch(&request.path, &request.metadata);
        };
        let bytes = storage.read_all(&request.path)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| StreamError::Decode(format!("{}: {e}", request.path)))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        Ok(TexturePixels {
            width,
            height,
            mip_levels: if metadata.generate_mipmaps {
                mip_level_count(width, height)
            } else {
                1
            },
            srgb: metadata.srgb,
            filter: metadata.filter,
            pixels: image.into_raw(),
        })
    }

    fn estimate_finalize_cost(&self, _metadata: &AssetMetadata) -> Duration {
        Duration::from_micros(500)
    }

    fn finalize(
        &self,
        name_hash: NameHash,
        staged: TexturePixels,
        backend: &dyn RenderBackend,
    ) -> Texture {
        let gpu_texture = backend.upload_texture(
            name_hash,
            &TextureUpload {
                width: staged.width,
                height: staged.height,
                mip_levels: staged.mip_levels,
                srgb: staged.srgb,
                pixels: &staged.pixels,
            },
        );
        Texture {
            width: staged.width,
            height: staged.height,
            mip_levels: staged.mip_levels,
            srgb: staged.srgb,
            filter: staged.filter,
            gpu_texture,
        }
    }

    fn perform_free(&self, texture: &Texture, backend: &dyn RenderBackend) {
        backend.release(texture.gpu_texture);
    }

    /// 8x8 magenta/black checkerboard
    fn missing_staged(&self, _metadata: Option<&AssetMetadata>) -> TexturePixels {
        let pixels = (0..CHECKER_SIZE * CHECKER_SIZE)
            .flat_map(|i| {
                let (x, y) = (i % CHECKER_SIZE, i / CHECKER_SIZE);
                if (x + y) % 2 == 0 {
                    MAGENTA
                } else {
                    BLACK
                }
            })
            .collect();
        TexturePixels {
            width: CHECKER_SIZE,
            height: CHECKER_SIZE,
            mip_levels: 1,
            srgb: true,
            filter: TextureFilter::Nearest,
            pixels,
        }
    }
}
