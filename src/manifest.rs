//! Asset manifest: name hash -> (path, asset type, metadata, system flag).
//!
//! The manifest is built at startup either by scanning the import root or by
//! reading a persisted manifest file. In game mode it is frozen after
//! initialization and read without locking; in editor mode every access goes
//! through a dedicated mutex (see [`ManifestStore`]).

use crate::error::{HashCollision, Result, StreamError};
use crate::hash::NameHash;
use crate::storage::StorageBackend;
use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of streamed asset types
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Mesh,
    Texture,
    Shader,
    Font,
}

impl AssetType {
    pub const ALL: [AssetType; 4] = [
        AssetType::Mesh,
        AssetType::Texture,
        AssetType::Shader,
        AssetType::Font,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Dense index, used to address per-type managers
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetType::Mesh => "mesh",
            AssetType::Texture => "texture",
            AssetType::Shader => "shader",
            AssetType::Font => "font",
        }
    }

    /// Asset type for a file extension (case-insensitive)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "mesh" => Some(AssetType::Mesh),
            "png" | "jpg" | "jpeg" => Some(AssetType::Texture),
            "wgsl" | "glsl" | "vert" | "frag" | "comp" => Some(AssetType::Shader),
            "ttf" | "otf" => Some(AssetType::Font),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        extension_of(path).and_then(Self::from_extension)
    }

    /// Extension used for the `<prefix>missing.<ext>` system fallback
    pub fn canonical_extension(self) -> &'static str {
        match self {
            AssetType::Mesh => "mesh",
            AssetType::Texture => "png",
            AssetType::Shader => "wgsl",
            AssetType::Font => "ttf",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn extension_of(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(extension)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshMetadata {
    /// Uniform scale applied to positions on import
    pub scale: f32,
}

impl Default for MeshMetadata {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureMetadata {
    pub srgb: bool,
    pub generate_mipmaps: bool,
    pub filter: TextureFilter,
}

impl Default for TextureMetadata {
    fn default() -> Self {
        Self {
            srgb: true,
            generate_mipmaps: true,
            filter: TextureFilter::Linear,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    #[default]
    Vertex,
    Fragment,
    Compute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderMetadata {
    pub stage: ShaderStage,
    pub entry_point: String,
}

impl Default for ShaderMetadata {
    fn default() -> Self {
        Self {
            stage: ShaderStage::Vertex,
            entry_point: "main".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontMetadata {
    pub size_px: u32,
}

impl Default for FontMetadata {
    fn default() -> Self {
        Self { size_px: 16 }
    }
}

/// Type-specific import settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssetMetadata {
    Mesh(MeshMetadata),
    Texture(TextureMetadata),
    Shader(ShaderMetadata),
    Font(FontMetadata),
}

impl AssetMetadata {
    pub fn asset_type(&self) -> AssetType {
        match self {
            AssetMetadata::Mesh(_) => AssetType::Mesh,
            AssetMetadata::Texture(_) => AssetType::Texture,
            AssetMetadata::Shader(_) => AssetType::Shader,
            AssetMetadata::Font(_) => AssetType::Font,
        }
    }

    /// Default settings for an asset at `path`
    pub fn default_for(asset_type: AssetType, path: &str) -> Self {
        match asset_type {
            AssetType::Mesh => AssetMetadata::Mesh(MeshMetadata::default()),
            AssetType::Texture => AssetMetadata::Texture(TextureMetadata::default()),
            AssetType::Shader => {
                let stage = match extension_of(path).map(str::to_ascii_lowercase).as_deref() {
                    Some("frag") => ShaderStage::Fragment,
                    Some("comp") => ShaderStage::Compute,
                    _ => ShaderStage::Vertex,
                };
                AssetMetadata::Shader(ShaderMetadata {
                    stage,
                    ..ShaderMetadata::default()
                })
            }
            AssetType::Font => AssetMetadata::Font(FontMetadata::default()),
        }
    }
}

/// One manifest row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Normalized path relative to the import root
    pub path: String,
    pub asset_type: AssetType,
    /// Engine-internal asset, survives `remove_non_system_assets`
    pub is_system: bool,
    pub metadata: AssetMetadata,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, metadata: AssetMetadata, is_system: bool) -> Self {
        Self {
            path: path.into(),
            asset_type: metadata.asset_type(),
            is_system,
            metadata,
        }
    }
}

/// On-disk manifest layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub version: u32,
    pub entries: Vec<ManifestRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub name_hash: NameHash,
    #[serde(flatten)]
    pub entry: ManifestEntry,
}

pub const MANIFEST_VERSION: u32 = 1;

/// Name hash -> manifest entry table
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    entries: AHashMap<NameHash, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name_hash: NameHash) -> Option<&ManifestEntry> {
        self.entries.get(&name_hash)
    }

    pub fn contains(&self, name_hash: NameHash) -> bool {
        self.entries.contains_key(&name_hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NameHash, &ManifestEntry)> + '_ {
        self.entries.iter().map(|(hash, entry)| (*hash, entry))
    }

    /// Conflict if `name_hash` is already taken by a different path
    pub fn find_collision(&self, name_hash: NameHash, path: &str) -> Option<HashCollision> {
        self.entries
            .get(&name_hash)
            .filter(|existing| existing.path != path)
            .map(|existing| HashCollision {
                name_hash,
                existing_path: existing.path.clone(),
                incoming_path: path.to_string(),
            })
    }

    /// Insert an entry after checking for collisions.
    ///
    /// Re-registering the same path replaces the entry.
    pub fn register(&mut self, name_hash: NameHash, entry: ManifestEntry) -> Result<()> {
        if let Some(collision) = self.find_collision(name_hash, &entry.path) {
            return Err(collision.into());
        }
        self.entries.insert(name_hash, entry);
        Ok(())
    }

    pub fn remove(&mut self, name_hash: NameHash) -> Option<ManifestEntry> {
        self.entries.remove(&name_hash)
    }

    /// Drop every entry not flagged as a system asset
    pub fn retain_system(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_system);
        before - self.entries.len()
    }

    /// Hashes of entries at `path`, or below it when `is_dir`
    pub fn hashes_at(&self, path: &str, is_dir: bool) -> Vec<NameHash> {
        let directory = format!("{}/", path.trim_end_matches('/'));
        let mut hashes: Vec<NameHash> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                if is_dir {
                    path.is_empty() || entry.path.starts_with(&directory)
                } else {
                    entry.path == path
                }
            })
            .map(|(hash, _)| *hash)
            .collect();
        hashes.sort();
        hashes
    }

    /// Build a manifest by listing every file under the import root.
    ///
    /// Unknown extensions are ignored, `<file>.meta` sidecars provide
    /// metadata, and the second of two colliding paths is skipped.
    pub fn scan(storage: &dyn StorageBackend, system_prefix: &str) -> Result<Self> {
        let files = storage.list_directory("")?;
        let mut manifest = Manifest::new();

        for path in &files {
            let Some(asset_type) = AssetType::from_path(path) else {
                continue;
            };

            let sidecar = format!("{path}.meta");
            let metadata = if files.binary_search(&sidecar).is_ok() {
                read_sidecar(storage, &sidecar, asset_type)?
            } else {
                AssetMetadata::default_for(asset_type, path)
            };

            let name_hash = storage.hash(path);
            let entry = ManifestEntry::new(path.clone(), metadata, path.starts_with(system_prefix));
            if let Err(StreamError::HashCollision(collision)) = manifest.register(name_hash, entry) {
                tracing::warn!(
                    name_hash = %collision.name_hash,
                    existing = %collision.existing_path,
                    skipped = %collision.incoming_path,
                    "hash collision during manifest scan"
                );
            }
        }

        tracing::debug!(entries = manifest.len(), files = files.len(), "manifest scanned");
        Ok(manifest)
    }

    pub fn to_file(&self) -> ManifestFile {
        let mut entries: Vec<ManifestRecord> = self
            .entries
            .iter()
            .map(|(hash, entry)| ManifestRecord {
                name_hash: *hash,
                entry: entry.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.entry.path.cmp(&b.entry.path));
        ManifestFile {
            version: MANIFEST_VERSION,
            entries,
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.to_file())
            .map_err(|e| StreamError::Manifest(format!("Failed to serialize manifest: {e}")))
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let file: ManifestFile = serde_json::from_slice(bytes)
            .map_err(|e| StreamError::Manifest(format!("Failed to parse manifest: {e}")))?;
        if file.version != MANIFEST_VERSION {
            return Err(StreamError::Manifest(format!(
                "Unsupported manifest version {} (expected {MANIFEST_VERSION})",
                file.version
            )));
        }

        let mut manifest = Manifest::new();
        for record in file.entries {
            if record.entry.metadata.asset_type() != record.entry.asset_type {
                return Err(StreamError::Manifest(format!(
                    "Metadata of '{}' does not match its asset type",
                    record.entry.path
                )));
            }
            manifest.register(record.name_hash, record.entry)?;
        }
        Ok(manifest)
    }
}

fn read_sidecar(
    storage: &dyn StorageBackend,
    sidecar: &str,
    asset_type: AssetType,
) -> Result<AssetMetadata> {
    let bytes = storage.read_all(sidecar)?;
    let metadata: AssetMetadata = serde_json::from_slice(&bytes)
        .map_err(|e| StreamError::Manifest(format!("Invalid sidecar {sidecar}: {e}")))?;
    if metadata.asset_type() != asset_type {
        return Err(StreamError::Manifest(format!(
            "Sidecar {sidecar} describes a {} but the asset is a {asset_type}",
            metadata.asset_type()
        )));
    }
    Ok(metadata)
}

/// Manifest storage with mode-dependent locking.
///
/// Game mode freezes the manifest so reads are plain borrows; editor mode
/// guards every access with a mutex and allows mutation.
pub(crate) enum ManifestStore {
    Frozen(Manifest),
    Editable(Mutex<Manifest>),
}

impl ManifestStore {
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Manifest) -> R) -> R {
        match self {
            ManifestStore::Frozen(manifest) => f(manifest),
            ManifestStore::Editable(manifest) => f(&manifest.lock()),
        }
    }

    pub(crate) fn write<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Manifest) -> R,
    ) -> Result<R> {
        match self {
            ManifestStore::Frozen(_) => Err(StreamError::EditorOnly(operation)),
            ManifestStore::Editable(manifest) => Ok(f(&mut manifest.lock())),
        }
    }
}
