// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asset manager: name resolution, per-type routing, the frame pump and the
//! editor mutation surface.
//!
//! Lock order is loaded index, then manifest, then type manager. Loads hold
//! the index lock from lookup to insertion, so a name hash is never loaded
//! twice. A synchronous load reads, decodes and finalizes under that lock,
//! which stalls fetches, collection and editor operations on other threads
//! for its duration. Async loads only hold it for slot allocation and task
//! submission, so large assets should be requested with [`LoadMode::Async`]
//! outside of startup.

use crate::arena::TypedArena;
use crate::assets::{FontDecoder, MeshDecoder, ShaderDecoder, TextureDecoder};
use crate::config::{OperatingMode, StreamConfig, StreamContext};
use crate::decoder::StreamedAsset;
use crate::error::{HashCollision, Result, StreamError};
use crate::handle::{AssetHandle, RefState, SlotId, UntypedHandle};
use crate::hash::{normalize_asset_path, NameHash};
use crate::manifest::{AssetMetadata, AssetType, Manifest, ManifestEntry, ManifestStore};
use crate::render::HeadlessBackend;
use crate::stats::{StreamStats, StreamStatsSnapshot};
use crate::storage::{FileSystemStorage, StorageBackend};
use crate::type_manager::{
    CollectionPolicy, CollectionReport, EnableOutcome, FrameBudget, LoadMode, LoadRequest,
    LoadedAsset, LoadedIndex, TypeManager,
};
use crate::worker::WorkerPool;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fs;
use std::path::Path;
use std::sync::Arc;

type TypeManagerCell = Mutex<Box<dyn TypeManager>>;

/// Work done by one [`AssetManager::update`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub enabled: usize,
    pub collection: CollectionReport,
}

/// Slot counts of one type manager
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeSummary {
    pub asset_type: AssetType,
    pub slots: usize,
    pub free: usize,
    pub pending: usize,
}

/// One resident asset, for inspection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResidentAsset {
    pub name_hash: NameHash,
    pub asset_type: AssetType,
    pub slot: SlotId,
    pub path: Option<String>,
    pub ref_count: u32,
    pub loaded: bool,
    pub pending: bool,
}

/// Manifest-driven, reference-counted asset cache
pub struct AssetManager {
    config: StreamConfig,
    context: StreamContext,
    manifest: ManifestStore,
    loaded: Mutex<LoadedIndex>,
    type_managers: [TypeManagerCell; AssetType::COUNT],
    /// Preloaded system assets, held for the manager's lifetime
    system_assets: Mutex<Vec<UntypedHandle>>,
    stats: Arc<StreamStats>,
}

impl AssetManager {
    /// Create a manager with explicit collaborators.
    ///
    /// Builds the manifest (persisted file if configured, scan otherwise),
    /// installs the missing fallbacks and preloads system assets.
    pub fn new(config: StreamConfig, context: StreamContext) -> Result<Self> {
        config.validate()?;

        let manifest = Self::build_manifest(&config, context.storage.as_ref())?;
        let stats = Arc::new(StreamStats::new());
        let type_managers: [TypeManagerCell; AssetType::COUNT] = [
            Self::cell(TypedArena::new(MeshDecoder, context.clone(), Arc::clone(&stats))),
            Self::cell(TypedArena::new(TextureDecoder, context.clone(), Arc::clone(&stats))),
            Self::cell(TypedArena::new(
                ShaderDecoder::default(),
                context.clone(),
                Arc::clone(&stats),
            )),
            Self::cell(TypedArena::new(FontDecoder, context.clone(), Arc::clone(&stats))),
        ];
        debug_assert!(AssetType::ALL
            .iter()
            .all(|t| type_managers[t.index()].lock().asset_type() == *t));

        let manifest = match config.mode {
            OperatingMode::Editor => ManifestStore::Editable(Mutex::new(manifest)),
            OperatingMode::Game => ManifestStore::Frozen(manifest),
        };

        let manager = Self {
            config,
            context,
            manifest,
            loaded: Mutex::new(LoadedIndex::new()),
            type_managers,
            system_assets: Mutex::new(Vec::new()),
            stats,
        };

        manager.init_missing_assets()?;
        if manager.config.preload_system_assets {
            manager.preload_system_assets()?;
        }

        tracing::info!(
            mode = ?manager.config.mode,
            entries = manager.manifest_len(),
            system_assets = manager.system_assets.lock().len(),
            "asset manager ready"
        );
        Ok(manager)
    }

    /// Filesystem storage under the import root, the default worker pool and
    /// a headless render backend
    pub fn from_config(config: StreamConfig) -> Result<Self> {
        let storage: Arc<dyn StorageBackend> =
            Arc::new(FileSystemStorage::new(config.import_root.clone()));

        #[cfg(feature = "parallel")]
        let workers: Arc<dyn WorkerPool> =
            Arc::new(crate::worker::RayonWorkerPool::new(config.worker_threads)?);
        #[cfg(not(feature = "parallel"))]
        let workers: Arc<dyn WorkerPool> = Arc::new(crate::worker::ImmediateWorkerPool);

        let context = StreamContext::new(storage, workers, Arc::new(HeadlessBackend::new()));
        Self::new(config, context)
    }

    fn cell<M: TypeManager + 'static>(manager: M) -> TypeManagerCell {
        Mutex::new(Box::new(manager))
    }

    fn build_manifest(config: &StreamConfig, storage: &dyn StorageBackend) -> Result<Manifest> {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("build_manifest").entered();

        if let Some(file) = config.manifest_file.as_deref() {
            if storage.exists(file) {
                let manifest = Manifest::from_json_bytes(&storage.read_all(file)?)?;
                tracing::debug!(file, entries = manifest.len(), "manifest loaded from file");
                return Ok(manifest);
            }
        }
        Manifest::scan(storage, &config.system_asset_prefix)
    }

    fn init_missing_assets(&self) -> Result<()> {
        for asset_type in AssetType::ALL {
            let path = self
                .config
                .missing_asset_path(asset_type.canonical_extension());
            let name_hash = self.context.storage.hash(&path);
            let listed = self.manifest.read(|manifest| {
                manifest
                    .get(name_hash)
                    .is_some_and(|entry| entry.asset_type == asset_type && entry.path == path)
            });

            let fallback = if listed {
                Some(self.load_untyped(name_hash, Some(asset_type), LoadMode::Sync)?)
            } else {
                None
            };
            self.type_manager(asset_type)
                .lock()
                .init_missing_asset_handle(fallback);
        }
        Ok(())
    }

    fn preload_system_assets(&self) -> Result<()> {
        let mut system: Vec<(String, NameHash)> = self.manifest.read(|manifest| {
            manifest
                .iter()
                .filter(|(_, entry)| entry.is_system)
                .map(|(hash, entry)| (entry.path.clone(), hash))
                .collect()
        });
        system.sort();

        let mut held = Vec::with_capacity(system.len());
        for (_, name_hash) in system {
            held.push(self.load_untyped(name_hash, None, LoadMode::Sync)?);
        }
        *self.system_assets.lock() = held;
        Ok(())
    }

    fn type_manager(&self, asset_type: AssetType) -> &TypeManagerCell {
        &self.type_managers[asset_type.index()]
    }

    fn require_editor(&self, operation: &'static str) -> Result<()> {
        match self.config.mode {
            OperatingMode::Editor => Ok(()),
            OperatingMode::Game => Err(StreamError::EditorOnly(operation)),
        }
    }

    fn normalize(&self, path: impl AsRef<Path>) -> String {
        normalize_asset_path(&self.config.import_root, path)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.config.mode
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.context.storage
    }

    /// Identity hash of `path`, absolute or relative to the import root
    pub fn compute_name_hash(&self, path: impl AsRef<Path>) -> NameHash {
        self.context.storage.hash(&self.normalize(path))
    }

    /// Resolve `name_hash` to a handle, loading it if it is not resident
    pub fn load<T: StreamedAsset>(&self, name_hash: NameHash, mode: LoadMode) -> Result<AssetHandle<T>> {
        let handle = self.load_untyped(name_hash, Some(T::ASSET_TYPE), mode)?;
        let found = handle.asset_type();
        handle.typed::<T>().ok_or(StreamError::AssetTypeMismatch {
            name_hash,
            expected: T::ASSET_TYPE,
            found,
        })
    }

    pub fn load_path<T: StreamedAsset>(
        &self,
        path: impl AsRef<Path>,
        mode: LoadMode,
    ) -> Result<AssetHandle<T>> {
        self.load(self.compute_name_hash(path), mode)
    }

    /// Load without knowing the asset type up front
    pub fn load_any(&self, name_hash: NameHash, mode: LoadMode) -> Result<UntypedHandle> {
        self.load_untyped(name_hash, None, mode)
    }

    fn load_untyped(
        &self,
        name_hash: NameHash,
        expected: Option<AssetType>,
        mode: LoadMode,
    ) -> Result<UntypedHandle> {
        let check = |found: AssetType| match expected {
            Some(expected) if expected != found => Err(StreamError::AssetTypeMismatch {
                name_hash,
                expected,
                found,
            }),
            _ => Ok(()),
        };

        let mut index = self.loaded.lock();
        if let Some(loaded) = index.get(name_hash) {
            check(loaded.asset_type)?;
            self.stats.record_fetch_hit();
            return Ok(self.type_manager(loaded.asset_type).lock().fetch(loaded.slot));
        }

        let entry = self
            .manifest
            .read(|manifest| manifest.get(name_hash).cloned())
            .ok_or(StreamError::UnknownNameHash(name_hash))?;
        check(entry.asset_type)?;

        let request = LoadRequest {
            name_hash,
            path: &entry.path,
            metadata: &entry.metadata,
            mode,
        };
        let (slot, handle) = self.type_manager(entry.asset_type).lock().load(&request);
        index.insert(
            name_hash,
            LoadedAsset {
                asset_type: entry.asset_type,
                slot,
            },
        );
        Ok(handle)
    }

    /// Engine-internal asset by name relative to the system prefix
    pub fn get_system_asset<T: StreamedAsset>(&self, name: &str) -> Result<AssetHandle<T>> {
        let path = format!("{}{}", self.config.system_asset_prefix, name.trim_start_matches('/'));
        let name_hash = self.context.storage.hash(&path);
        let is_system = self.manifest.read(|manifest| {
            manifest
                .get(name_hash)
                .is_some_and(|entry| entry.is_system && entry.path == path)
        });
        if !is_system {
            return Err(StreamError::UnknownNameHash(name_hash));
        }
        self.load(name_hash, LoadMode::Sync)
    }

    /// Canonical fallback handle for `T`
    pub fn get_missing_asset<T: StreamedAsset>(&self) -> Result<AssetHandle<T>> {
        let handle = self
            .type_manager(T::ASSET_TYPE)
            .lock()
            .missing_asset_handle()
            .ok_or(StreamError::NoMissingAsset(T::ASSET_TYPE))?;
        let found = handle.asset_type();
        handle.typed::<T>().ok_or(StreamError::AssetTypeMismatch {
            name_hash: NameHash::MISSING,
            expected: T::ASSET_TYPE,
            found,
        })
    }

    pub fn get_missing_asset_untyped(&self, asset_type: AssetType) -> Option<UntypedHandle> {
        self.type_manager(asset_type).lock().missing_asset_handle()
    }

    /// Finalize completed async loads within the async load window.
    ///
    /// Returns the number of assets enabled this frame.
    pub fn enable_loaded_assets(&self) -> usize {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("enable_loaded_assets").entered();

        let mut budget = FrameBudget::new(self.config.async_load_window());
        for cell in &self.type_managers {
            let mut manager = cell.lock();
            while manager.enable_async_loaded_asset(&mut budget) == EnableOutcome::Enabled {}
            if budget.is_exhausted() {
                break;
            }
        }
        budget.enabled()
    }

    pub fn has_assets_to_enable(&self) -> bool {
        self.type_managers
            .iter()
            .any(|cell| cell.lock().has_assets_to_enable())
    }

    /// Full collection pass over every type
    pub fn collect_garbage(&self) -> CollectionReport {
        self.collect_with(CollectionPolicy::FullCollection)
    }

    fn collect_with(&self, policy: CollectionPolicy) -> CollectionReport {
        let mut index = self.loaded.lock();
        let mut report = CollectionReport::default();
        for cell in &self.type_managers {
            report.merge(cell.lock().collect_garbage(policy, &mut index));
        }
        if report.collected > 0 || report.leaked > 0 {
            tracing::trace!(collected = report.collected, leaked = report.leaked, "garbage collected");
        }
        report
    }

    /// Per-frame pump: enable completed loads, then collect
    pub fn update(&self) -> FrameReport {
        FrameReport {
            enabled: self.enable_loaded_assets(),
            collection: self.collect_garbage(),
        }
    }

    /// Conflict if `path` hashes to an entry registered under another path
    pub fn check_for_hash_collision(&self, path: impl AsRef<Path>) -> Option<HashCollision> {
        let path = self.normalize(path);
        let name_hash = self.context.storage.hash(&path);
        self.manifest
            .read(|manifest| manifest.find_collision(name_hash, &path))
    }

    pub fn get_metadata_copy(&self, name_hash: NameHash) -> Option<AssetMetadata> {
        self.manifest
            .read(|manifest| manifest.get(name_hash).map(|entry| entry.metadata.clone()))
    }

    pub fn get_asset_path_copy(&self, name_hash: NameHash) -> Option<String> {
        self.manifest
            .read(|manifest| manifest.get(name_hash).map(|entry| entry.path.clone()))
    }

    pub fn get_manifest_entry(&self, name_hash: NameHash) -> Option<ManifestEntry> {
        self.manifest.read(|manifest| manifest.get(name_hash).cloned())
    }

    pub fn manifest_len(&self) -> usize {
        self.manifest.read(Manifest::len)
    }

    /// Register `path` in the manifest.
    ///
    /// Uses default metadata for the extension when `metadata` is `None`.
    pub fn append_to_manifest(
        &self,
        path: impl AsRef<Path>,
        metadata: Option<AssetMetadata>,
    ) -> Result<NameHash> {
        self.require_editor("append_to_manifest")?;

        let path = self.normalize(path);
        let asset_type =
            AssetType::from_path(&path).ok_or_else(|| StreamError::UnsupportedAsset(path.clone()))?;
        let metadata = metadata.unwrap_or_else(|| AssetMetadata::default_for(asset_type, &path));
        if metadata.asset_type() != asset_type {
            return Err(StreamError::Manifest(format!(
                "{} metadata given for {path}",
                metadata.asset_type()
            )));
        }

        let name_hash = self.context.storage.hash(&path);
        let is_system = path.starts_with(&self.config.system_asset_prefix);
        let entry = ManifestEntry::new(path.clone(), metadata, is_system);

        let mut index = self.loaded.lock();
        self.manifest.write("append_to_manifest", |manifest| {
            manifest.register(name_hash, entry.clone())
        })??;
        tracing::debug!(%name_hash, path = %path, "manifest entry appended");

        // A hash can stay resident after its entry was deleted or removed
        if let Some(loaded) = index.get(name_hash) {
            if loaded.asset_type == entry.asset_type {
                self.reload_resident(loaded, name_hash, &entry);
            } else {
                index.remove(name_hash);
                tracing::debug!(%name_hash, slot = %loaded.slot, "stale resident entry retired");
            }
        }
        Ok(name_hash)
    }

    /// Synchronously re-read a resident slot from `entry`
    fn reload_resident(&self, loaded: LoadedAsset, name_hash: NameHash, entry: &ManifestEntry) {
        let request = LoadRequest {
            name_hash,
            path: &entry.path,
            metadata: &entry.metadata,
            mode: LoadMode::Sync,
        };
        self.type_manager(loaded.asset_type)
            .lock()
            .refresh(&request, loaded.slot);
    }

    /// Drop the entry for `path`; resident copies stay usable
    pub fn remove_from_manifest(&self, path: impl AsRef<Path>) -> Result<bool> {
        self.require_editor("remove_from_manifest")?;

        let path = self.normalize(path);
        let name_hash = self.context.storage.hash(&path);
        let removed = self.manifest.write("remove_from_manifest", |manifest| {
            manifest
                .get(name_hash)
                .is_some_and(|entry| entry.path == path)
                .then(|| manifest.remove(name_hash))
                .flatten()
                .is_some()
        })?;

        if removed {
            tracing::debug!(%name_hash, path = %path, "manifest entry removed");
        }
        Ok(removed)
    }

    /// Source file changed: register it if new, reload it if resident
    pub fn request_asset_refresh(&self, asset_type: AssetType, path: impl AsRef<Path>) -> Result<()> {
        self.require_editor("request_asset_refresh")?;

        let path = self.normalize(path);
        let name_hash = self.context.storage.hash(&path);
        let existing = self.get_manifest_entry(name_hash);
        match existing {
            Some(entry) if entry.asset_type != asset_type => {
                return Err(StreamError::AssetTypeMismatch {
                    name_hash,
                    expected: asset_type,
                    found: entry.asset_type,
                });
            }
            Some(_) => {}
            None => {
                if AssetType::from_path(&path) != Some(asset_type) {
                    return Err(StreamError::UnsupportedAsset(path));
                }
                // Appending reloads a still-resident slot
                self.append_to_manifest(&path, None)?;
                return Ok(());
            }
        }

        let index = self.loaded.lock();
        let Some(loaded) = index.get(name_hash) else {
            return Ok(());
        };
        let Some(entry) = self.get_manifest_entry(name_hash) else {
            return Ok(());
        };
        self.reload_resident(loaded, name_hash, &entry);
        Ok(())
    }

    /// Source file or directory deleted.
    ///
    /// Removes the manifest entries and swaps resident payloads for the
    /// missing content. Returns the number of entries removed.
    pub fn request_asset_deletion(&self, path: impl AsRef<Path>, is_dir: bool) -> Result<usize> {
        self.require_editor("request_asset_deletion")?;

        let path = self.normalize(path);
        let index = self.loaded.lock();
        let removed: SmallVec<[(NameHash, ManifestEntry); 4]> =
            self.manifest.write("request_asset_deletion", |manifest| {
                manifest
                    .hashes_at(&path, is_dir)
                    .into_iter()
                    .filter_map(|hash| manifest.remove(hash).map(|entry| (hash, entry)))
                    .collect()
            })?;

        for (name_hash, entry) in &removed {
            if let Some(loaded) = index.get(*name_hash) {
                self.type_manager(loaded.asset_type)
                    .lock()
                    .replace_with_missing(loaded.slot, Some(&entry.metadata));
            }
        }

        tracing::debug!(path = %path, is_dir, removed = removed.len(), "assets deleted");
        Ok(removed.len())
    }

    /// Source file or directory moved.
    ///
    /// Entries are re-keyed under their new path; resident slots keep their
    /// payload and handles. Moves whose destination is already taken are
    /// skipped. Returns the number of entries moved.
    pub fn request_asset_move(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        is_dir: bool,
    ) -> Result<usize> {
        self.require_editor("request_asset_move")?;

        let source = self.normalize(source);
        let destination = self.normalize(destination);
        let storage = self.context.storage.as_ref();
        let system_prefix = self.config.system_asset_prefix.as_str();

        let mut index = self.loaded.lock();
        let moved: SmallVec<[(NameHash, NameHash); 8]> =
            self.manifest.write("request_asset_move", |manifest| {
                let mut moved = SmallVec::new();
                for old_hash in manifest.hashes_at(&source, is_dir) {
                    let Some(old_path) = manifest.get(old_hash).map(|entry| entry.path.clone())
                    else {
                        continue;
                    };
                    let new_path = if is_dir {
                        let rest = old_path
                            .strip_prefix(source.as_str())
                            .unwrap_or(&old_path)
                            .trim_start_matches('/');
                        if destination.is_empty() {
                            rest.to_string()
                        } else {
                            format!("{destination}/{rest}")
                        }
                    } else {
                        destination.clone()
                    };
                    let new_hash = storage.hash(&new_path);

                    if new_hash != old_hash && manifest.contains(new_hash) {
                        match manifest.find_collision(new_hash, &new_path) {
                            Some(collision) => tracing::warn!(
                                name_hash = %new_hash,
                                existing = %collision.existing_path,
                                skipped = %old_path,
                                "move skipped, destination hash collides"
                            ),
                            None => tracing::warn!(
                                path = %new_path,
                                skipped = %old_path,
                                "move skipped, destination already registered"
                            ),
                        }
                        continue;
                    }

                    let Some(mut entry) = manifest.remove(old_hash) else {
                        continue;
                    };
                    entry.is_system = new_path.starts_with(system_prefix);
                    entry.path = new_path;
                    if let Err(err) = manifest.register(new_hash, entry) {
                        tracing::warn!(error = %err, "move failed to register destination");
                        continue;
                    }
                    moved.push((old_hash, new_hash));
                }
                moved
            })?;

        for (old_hash, new_hash) in &moved {
            let loaded = index.remove(*old_hash);
            // A deleted asset still referenced under the destination hash
            // keeps its slot but loses its index entry; it is collected once
            // its handles drop.
            if let Some(stale) = index.remove(*new_hash) {
                tracing::debug!(
                    name_hash = %new_hash,
                    slot = %stale.slot,
                    "stale resident entry retired by move"
                );
            }
            if let Some(loaded) = loaded {
                self.type_manager(loaded.asset_type)
                    .lock()
                    .notify_move(loaded.slot, *old_hash, *new_hash);
                index.insert(*new_hash, loaded);
            }
        }

        tracing::debug!(
            source = %source,
            destination = %destination,
            moved = moved.len(),
            "assets moved"
        );
        Ok(moved.len())
    }

    /// Strip every non-system entry; returns the number removed
    pub fn remove_non_system_assets_from_manifest(&self) -> Result<usize> {
        self.require_editor("remove_non_system_assets_from_manifest")?;
        let removed = self
            .manifest
            .write("remove_non_system_assets_from_manifest", Manifest::retain_system)?;
        tracing::debug!(removed, "non-system manifest entries removed");
        Ok(removed)
    }

    pub fn manifest_json(&self) -> Result<Vec<u8>> {
        self.manifest.read(Manifest::to_json_bytes)
    }

    /// Write the manifest to `manifest_file` under the import root
    pub fn save_manifest(&self) -> Result<()> {
        let file = self.config.manifest_file.as_deref().ok_or_else(|| {
            StreamError::Config("manifest_file is not configured".to_string())
        })?;
        self.save_manifest_to(self.config.import_root.join(file))
    }

    pub fn save_manifest_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.manifest_json()?;
        fs::write(path, bytes).map_err(|e| {
            StreamError::Manifest(format!("Failed to write {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "manifest saved");
        Ok(())
    }

    pub fn stats(&self) -> StreamStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of resident name hashes
    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().len()
    }

    pub fn is_resident(&self, name_hash: NameHash) -> bool {
        self.loaded.lock().get(name_hash).is_some()
    }

    pub fn type_summary(&self, asset_type: AssetType) -> TypeSummary {
        let manager = self.type_manager(asset_type).lock();
        TypeSummary {
            asset_type,
            slots: manager.slot_count(),
            free: manager.free_count(),
            pending: manager.pending_count(),
        }
    }

    /// Every resident asset, ordered by type then slot
    pub fn resident_assets(&self) -> Vec<ResidentAsset> {
        let index = self.loaded.lock();
        let mut assets: Vec<ResidentAsset> = index
            .iter()
            .filter_map(|(name_hash, loaded)| {
                let path = self.get_asset_path_copy(name_hash);
                let info = self
                    .type_manager(loaded.asset_type)
                    .lock()
                    .slot_info(loaded.slot)?;
                Some(ResidentAsset {
                    name_hash,
                    asset_type: loaded.asset_type,
                    slot: loaded.slot,
                    path,
                    ref_count: match info.state {
                        RefState::Live(n) => n,
                        RefState::Collectable | RefState::Cleared => 0,
                    },
                    loaded: info.loaded,
                    pending: info.pending,
                })
            })
            .collect();
        assets.sort_by_key(|asset| (asset.asset_type, asset.slot));
        assets
    }
}

impl AssetManager {
    /// Tear down every type manager and report what was still referenced.
    ///
    /// Dropping the manager does the same; this variant hands the report to
    /// the caller.
    pub fn shutdown(self) -> CollectionReport {
        self.destroy()
    }

    fn destroy(&self) -> CollectionReport {
        self.system_assets.lock().clear();
        let report = self.collect_with(CollectionPolicy::FullCollectionDuringDestruction);
        if report.leaked > 0 {
            tracing::warn!(leaked = report.leaked, "assets leaked at shutdown");
        }
        report
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        // No-op after shutdown: every slot is already cleared
        self.destroy();
    }
}
