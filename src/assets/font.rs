use crate::decoder::{AssetDecoder, ReadRequest, StreamedAsset};
use crate::error::{Result, StreamError};
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType, FontMetadata};
use crate::render::RenderBackend;
use crate::storage::StorageBackend;
use std::time::Duration;

const SFNT_TAGS: [[u8; 4]; 4] = [[0x00, 0x01, 0x00, 0x00], *b"OTTO", *b"true", *b"ttcf"];

/// Font face bytes; no GPU work is needed until glyphs are rasterized
#[derive(Debug, Clone)]
pub struct Font {
    pub data: Vec<u8>,
    pub size_px: u32,
    /// Built-in stand-in used when the face could not be read
    pub is_placeholder: bool,
}

impl StreamedAsset for Font {
    const ASSET_TYPE: AssetType = AssetType::Font;
}

pub fn is_font_face(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && SFNT_TAGS.iter().any(|tag| bytes[..4] == *tag)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FontDecoder;

impl AssetDecoder for FontDecoder {
    type Asset = Font;
    type Staged = Font;

    const ASSET_TYPE: AssetType = AssetType::Font;

    fn read_file(&self, storage: &dyn StorageBackend, request: &ReadRequest) -> Result<Font> {
        let AssetMetadata::Font(metadata) = &request.metadata else {
            return super::metadata_mismatch(&request.path, &request.metadata);
        };
        let data = storage.read_all(&request.path)?;
        if !is_font_face(&data) {
            return Err(StreamError::Decode(format!(
                "{}: not a TrueType/OpenType face",
                request.path
            )));
        }
        Ok(Font {
            data,
            size_px: metadata.size_px,
            is_placeholder: false,
        })
    }

    fn estimate_finalize_cost(&self, _metadata: &AssetMetadata) -> Duration {
        Duration::from_micros(50)
    }

    fn finalize(&self, _name_hash: NameHash, font: Font, _backend: &dyn RenderBackend) -> Font {
        font
    }

    fn perform_free(&self, _font: &Font, _backend: &dyn RenderBackend) {}

    fn missing_staged(&self, metadata: Option<&AssetMetadata>) -> Font {
        let size_px = match metadata {
            Some(AssetMetadata::Font(metadata)) => metadata.size_px,
            _ => FontMetadata::default().size_px,
        };
        Font {
            data: Vec::new(),
            size_px,
            is_placeholder: true,
        }
    }
}
