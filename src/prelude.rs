//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use archetype_stream::prelude::*;
//! ```

pub use crate::assets::{Font, Mesh, MeshData, Shader, Texture};
pub use crate::config::{OperatingMode, StreamConfig, StreamContext};
pub use crate::debug::{PumpDiagnostics, StreamInspector};
pub use crate::error::{Result, StreamError};
pub use crate::handle::{AssetHandle, UntypedHandle};
pub use crate::hash::NameHash;
pub use crate::manager::AssetManager;
pub use crate::manifest::{AssetMetadata, AssetType};
pub use crate::render::{HeadlessBackend, RenderBackend};
pub use crate::storage::{FileSystemStorage, MemoryStorage, StorageBackend};
pub use crate::type_manager::LoadMode;
pub use crate::worker::{ImmediateWorkerPool, WorkerPool};
