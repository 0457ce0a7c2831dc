//! Per-type decoder contract.
//!
//! A decoder splits loading into a worker-thread half (`read_file`, which
//! does I/O and CPU decoding) and a frame-thread half (`finalize`, which
//! performs GPU work through the render backend).

use crate::error::Result;
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType};
use crate::render::RenderBackend;
use crate::storage::StorageBackend;
use std::time::Duration;

/// Asset payload type stored in an arena
pub trait StreamedAsset: Send + Sync + 'static {
    const ASSET_TYPE: AssetType;
}

/// Everything a worker needs to read one asset
#[derive(Clone, Debug)]
pub struct ReadRequest {
    pub name_hash: NameHash,
    pub path: String,
    pub metadata: AssetMetadata,
}

pub trait AssetDecoder: Send + Sync + 'static {
    type Asset: StreamedAsset;
    /// Decoded data still waiting for frame-thread finalization
    type Staged: Send + 'static;

    const ASSET_TYPE: AssetType;

    /// Read and decode; runs on a worker thread for async loads
    fn read_file(&self, storage: &dyn StorageBackend, request: &ReadRequest)
        -> Result<Self::Staged>;

    /// Expected frame-thread cost of `finalize`
    fn estimate_finalize_cost(&self, metadata: &AssetMetadata) -> Duration;

    /// Frame-thread half of a load
    fn finalize(
        &self,
        name_hash: NameHash,
        staged: Self::Staged,
        backend: &dyn RenderBackend,
    ) -> Self::Asset;

    /// Release resources owned by `asset`
    fn perform_free(&self, asset: &Self::Asset, backend: &dyn RenderBackend);

    /// Fallback content used when a read fails.
    ///
    /// `metadata` carries the settings of the failed request; it is `None`
    /// for the type's canonical missing asset.
    fn missing_staged(&self, metadata: Option<&AssetMetadata>) -> Self::Staged;
}
