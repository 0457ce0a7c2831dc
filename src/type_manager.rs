//! Contract every per-type asset manager implements.
//!
//! The asset manager only talks to type managers through [`TypeManager`];
//! the generic [`TypedArena`](crate::arena::TypedArena) implements it for
//! any decoder.

use crate::handle::{RefState, SlotId, UntypedHandle};
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType};
use ahash::AHashMap;
use std::time::{Duration, Instant};

/// Whether a load blocks until the asset is usable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Read and finalize inline
    Sync,
    /// Read on a worker, finalize in a later frame
    Async,
}

/// Inputs of a load or refresh
#[derive(Clone, Copy, Debug)]
pub struct LoadRequest<'a> {
    pub name_hash: NameHash,
    pub path: &'a str,
    pub metadata: &'a AssetMetadata,
    pub mode: LoadMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionPolicy {
    /// Regular per-frame pass
    FullCollection,
    /// Shutdown pass; assets that still have handles are logged and freed
    FullCollectionDuringDestruction,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub collected: usize,
    pub leaked: usize,
}

impl CollectionReport {
    pub fn merge(&mut self, other: CollectionReport) {
        self.collected += other.collected;
        self.leaked += other.leaked;
    }
}

/// Result of one `enable_async_loaded_asset` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnableOutcome {
    /// One asset was finalized
    Enabled,
    /// Loads are pending but none has finished reading
    NotReady,
    /// A finished load does not fit in what is left of the window
    OverBudget,
    /// Nothing pending
    Idle,
}

/// Per-frame time window for enabling async loads.
///
/// The first asset of a frame is always admitted so a tight window cannot
/// starve the queue.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    deadline: Instant,
    enabled: usize,
}

impl FrameBudget {
    pub fn new(window: Duration) -> Self {
        Self::with_deadline(Instant::now() + window)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            enabled: 0,
        }
    }

    pub fn admits(&self, estimated_cost: Duration) -> bool {
        self.enabled == 0 || Instant::now() + estimated_cost <= self.deadline
    }

    pub fn record_enabled(&mut self) {
        self.enabled += 1;
    }

    pub fn enabled(&self) -> usize {
        self.enabled
    }

    pub fn is_exhausted(&self) -> bool {
        self.enabled > 0 && Instant::now() >= self.deadline
    }
}

/// Resident asset location
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedAsset {
    pub asset_type: AssetType,
    pub slot: SlotId,
}

/// Name hash -> resident slot, at most one per hash
#[derive(Debug, Default)]
pub struct LoadedIndex {
    entries: AHashMap<NameHash, LoadedAsset>,
}

impl LoadedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name_hash: NameHash) -> Option<LoadedAsset> {
        self.entries.get(&name_hash).copied()
    }

    pub fn insert(&mut self, name_hash: NameHash, asset: LoadedAsset) {
        let previous = self.entries.insert(name_hash, asset);
        assert!(
            previous.is_none(),
            "asset {name_hash} loaded twice (previously in {previous:?})"
        );
    }

    /// Remove the entry only if it still points at `asset`
    pub fn remove_if(&mut self, name_hash: NameHash, asset: LoadedAsset) -> bool {
        if self.entries.get(&name_hash) == Some(&asset) {
            self.entries.remove(&name_hash);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, name_hash: NameHash) -> Option<LoadedAsset> {
        self.entries.remove(&name_hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NameHash, LoadedAsset)> + '_ {
        self.entries.iter().map(|(hash, asset)| (*hash, *asset))
    }
}

/// Snapshot of one slot, for inspection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: SlotId,
    pub name_hash: NameHash,
    pub state: RefState,
    pub loaded: bool,
    pub pending: bool,
}

/// Per-type asset manager
pub trait TypeManager: Send {
    fn asset_type(&self) -> AssetType;

    /// Allocate a slot and populate it, inline or on a worker
    fn load(&mut self, request: &LoadRequest<'_>) -> (SlotId, UntypedHandle);

    /// New handle to a resident slot, no I/O
    fn fetch(&self, slot: SlotId) -> UntypedHandle;

    /// Synchronously re-read a resident asset in place
    fn refresh(&mut self, request: &LoadRequest<'_>, slot: SlotId);

    fn collect_garbage(
        &mut self,
        policy: CollectionPolicy,
        index: &mut LoadedIndex,
    ) -> CollectionReport;

    /// Finalize at most one completed async load
    fn enable_async_loaded_asset(&mut self, budget: &mut FrameBudget) -> EnableOutcome;

    fn has_assets_to_enable(&self) -> bool;

    /// Install the canonical fallback; `None` builds it from the decoder
    fn init_missing_asset_handle(&mut self, fallback: Option<UntypedHandle>);

    fn missing_asset_handle(&self) -> Option<UntypedHandle>;

    /// Rename a resident slot without touching its payload
    fn notify_move(&mut self, slot: SlotId, old_hash: NameHash, new_hash: NameHash);

    /// Swap a resident payload for fallback content matching `metadata`
    fn replace_with_missing(&mut self, slot: SlotId, metadata: Option<&AssetMetadata>);

    fn slot_count(&self) -> usize;

    fn free_count(&self) -> usize;

    fn pending_count(&self) -> usize;

    fn slot_info(&self, slot: SlotId) -> Option<SlotInfo>;
}
