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

//! Slot arenas and the generic per-type manager built on them.
//!
//! [`SlotArena`] keeps two parallel arrays indexed by [`SlotId`]: shared
//! reference counters and payloads. Handles resolve their payload through
//! the arena on every access, so growing the arrays never invalidates a
//! handle.
//!
//! [`TypedArena`] adds a free list, the async completion queue and the
//! garbage collector on top, parameterized by an [`AssetDecoder`].

use crate::config::StreamContext;
use crate::decoder::{AssetDecoder, ReadRequest, StreamedAsset};
use crate::handle::{AssetHandle, RefCount, RefState, SlotId, SlotRef, UntypedHandle};
use crate::hash::NameHash;
use crate::manifest::{AssetMetadata, AssetType};
use crate::stats::StreamStats;
use crate::storage::StorageBackend;
use crate::type_manager::{
    CollectionPolicy, CollectionReport, EnableOutcome, FrameBudget, LoadMode, LoadRequest,
    LoadedAsset, LoadedIndex, SlotInfo, TypeManager,
};
use crate::worker::{self, TaskFuture};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

struct Payload<A> {
    name_hash: NameHash,
    loaded: bool,
    /// Async read in flight; never collected while set
    pending: bool,
    asset: Option<Arc<A>>,
}

impl<A> Payload<A> {
    fn empty() -> Self {
        Self {
            name_hash: NameHash::MISSING,
            loaded: false,
            pending: false,
            asset: None,
        }
    }
}

/// Slot storage for one asset type
pub struct SlotArena<A: StreamedAsset> {
    counters: RwLock<Vec<Arc<RefCount>>>,
    payloads: RwLock<Vec<Payload<A>>>,
}

impl<A: StreamedAsset> SlotArena<A> {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(Vec::new()),
            payloads: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow both arrays by one cleared slot
    pub(crate) fn push_slot(&self) -> SlotId {
        let mut counters = self.counters.write();
        let mut payloads = self.payloads.write();
        let index = u32::try_from(counters.len()).unwrap_or(u32::MAX);
        assert!(index < u32::MAX, "slot arena for {} is full", A::ASSET_TYPE);
        counters.push(Arc::new(RefCount::new()));
        payloads.push(Payload::empty());
        SlotId(index)
    }

    pub(crate) fn counter(&self, slot: SlotId) -> Arc<RefCount> {
        Arc::clone(&self.counters.read()[slot.index()])
    }

    /// New counted handle to `slot`
    pub(crate) fn acquire(self: &Arc<Self>, slot: SlotId) -> AssetHandle<A> {
        AssetHandle::new(Arc::clone(self), SlotRef::acquire(slot, self.counter(slot)))
    }

    pub fn ref_state(&self, slot: SlotId) -> Option<RefState> {
        self.counters.read().get(slot.index()).map(|count| count.state())
    }

    /// Counter states of every slot, in slot order
    pub fn states(&self) -> Vec<(SlotId, RefState)> {
        self.counters
            .read()
            .iter()
            .enumerate()
            .map(|(index, count)| (SlotId(index as u32), count.state()))
            .collect()
    }

    pub fn asset(&self, slot: SlotId) -> Option<Arc<A>> {
        self.payloads
            .read()
            .get(slot.index())
            .filter(|payload| payload.loaded)
            .and_then(|payload| payload.asset.clone())
    }

    pub fn is_loaded(&self, slot: SlotId) -> bool {
        self.payloads
            .read()
            .get(slot.index())
            .is_some_and(|payload| payload.loaded)
    }

    pub fn is_pending(&self, slot: SlotId) -> bool {
        self.payloads
            .read()
            .get(slot.index())
            .is_some_and(|payload| payload.pending)
    }

    pub fn name_hash(&self, slot: SlotId) -> NameHash {
        self.payloads
            .read()
            .get(slot.index())
            .map_or(NameHash::MISSING, |payload| payload.name_hash)
    }

    /// Tag a freshly allocated slot
    fn assign(&self, slot: SlotId, name_hash: NameHash) {
        let mut payloads = self.payloads.write();
        let payload = &mut payloads[slot.index()];
        debug_assert!(payload.asset.is_none(), "slot {slot} allocated with a payload");
        *payload = Payload::empty();
        payload.name_hash = name_hash;
    }

    fn set_pending(&self, slot: SlotId, pending: bool) {
        self.payloads.write()[slot.index()].pending = pending;
    }

    fn store(&self, slot: SlotId, asset: A) {
        let mut payloads = self.payloads.write();
        let payload = &mut payloads[slot.index()];
        payload.asset = Some(Arc::new(asset));
        payload.loaded = true;
        payload.pending = false;
    }

    /// Detach the payload, leaving the slot unloaded
    fn take(&self, slot: SlotId) -> (NameHash, Option<Arc<A>>) {
        let mut payloads = self.payloads.write();
        let payload = &mut payloads[slot.index()];
        payload.loaded = false;
        payload.pending = false;
        (payload.name_hash, payload.asset.take())
    }

    fn rename(&self, slot: SlotId, old_hash: NameHash, new_hash: NameHash) {
        let mut payloads = self.payloads.write();
        let payload = &mut payloads[slot.index()];
        assert_eq!(
            payload.name_hash, old_hash,
            "moved slot {slot} does not hold {old_hash}"
        );
        payload.name_hash = new_hash;
    }

    fn info(&self, slot: SlotId) -> Option<SlotInfo> {
        let state = self.ref_state(slot)?;
        let payloads = self.payloads.read();
        let payload = payloads.get(slot.index())?;
        Some(SlotInfo {
            slot,
            name_hash: payload.name_hash,
            state,
            loaded: payload.loaded,
            pending: payload.pending,
        })
    }
}

impl<A: StreamedAsset> Default for SlotArena<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a [`SlotArena`], used by [`UntypedHandle`]
pub trait ErasedArena: Send + Sync + 'static {
    fn asset_type(&self) -> AssetType;

    fn is_slot_loaded(&self, slot: SlotId) -> bool;

    fn slot_name_hash(&self, slot: SlotId) -> NameHash;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<A: StreamedAsset> ErasedArena for SlotArena<A> {
    fn asset_type(&self) -> AssetType {
        A::ASSET_TYPE
    }

    fn is_slot_loaded(&self, slot: SlotId) -> bool {
        self.is_loaded(slot)
    }

    fn slot_name_hash(&self, slot: SlotId) -> NameHash {
        self.name_hash(slot)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct PendingLoad<S> {
    slot: SlotId,
    path: String,
    metadata: AssetMetadata,
    future: TaskFuture<S>,
    estimated_cost: Duration,
}

fn read_or_missing<D: AssetDecoder>(
    decoder: &D,
    storage: &dyn StorageBackend,
    request: &ReadRequest,
    stats: &StreamStats,
) -> D::Staged {
    match decoder.read_file(storage, request) {
        Ok(staged) => staged,
        Err(err) => {
            tracing::warn!(
                asset_type = %D::ASSET_TYPE,
                path = %request.path,
                error = %err,
                "asset read failed, substituting missing asset"
            );
            stats.record_read_failure();
            decoder.missing_staged(Some(&request.metadata))
        }
    }
}

/// Generic type manager: slot arena + free list + completion queue + GC
pub struct TypedArena<D: AssetDecoder> {
    decoder: Arc<D>,
    slots: Arc<SlotArena<D::Asset>>,
    free_list: Vec<SlotId>,
    pending: VecDeque<PendingLoad<D::Staged>>,
    missing: Option<AssetHandle<D::Asset>>,
    context: StreamContext,
    stats: Arc<StreamStats>,
}

impl<D: AssetDecoder> TypedArena<D> {
    pub fn new(decoder: D, context: StreamContext, stats: Arc<StreamStats>) -> Self {
        debug_assert_eq!(
            D::ASSET_TYPE,
            <D::Asset as StreamedAsset>::ASSET_TYPE,
            "decoder and asset disagree on the asset type"
        );
        Self {
            decoder: Arc::new(decoder),
            slots: Arc::new(SlotArena::new()),
            free_list: Vec::new(),
            pending: VecDeque::new(),
            missing: None,
            context,
            stats,
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn slots(&self) -> &Arc<SlotArena<D::Asset>> {
        &self.slots
    }

    /// Typed fallback handle
    pub fn missing_handle(&self) -> Option<AssetHandle<D::Asset>> {
        self.missing.clone()
    }

    /// Reuse a cleared slot or grow the arena
    fn allocate(&mut self, name_hash: NameHash) -> SlotId {
        let slot = self
            .free_list
            .pop()
            .unwrap_or_else(|| self.slots.push_slot());
        self.slots.counter(slot).reset();
        self.slots.assign(slot, name_hash);
        slot
    }

    fn read_request(request: &LoadRequest<'_>) -> ReadRequest {
        ReadRequest {
            name_hash: request.name_hash,
            path: request.path.to_string(),
            metadata: request.metadata.clone(),
        }
    }

    fn load_inline(&self, slot: SlotId, read: &ReadRequest) {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("sync_load", asset_type = %D::ASSET_TYPE, path = %read.path)
            .entered();

        let staged = read_or_missing(
            self.decoder.as_ref(),
            self.context.storage.as_ref(),
            read,
            &self.stats,
        );
        let asset = self
            .decoder
            .finalize(read.name_hash, staged, self.context.render.as_ref());
        self.slots.store(slot, asset);
    }

    /// Detach and tear down the current payload of `slot`
    fn release_payload(&mut self, slot: SlotId) -> NameHash {
        self.pending.retain(|load| load.slot != slot);
        let (name_hash, asset) = self.slots.take(slot);
        if let Some(asset) = asset {
            self.decoder
                .perform_free(&asset, self.context.render.as_ref());
        }
        name_hash
    }

    fn free_slot(&mut self, slot: SlotId, index: &mut LoadedIndex) {
        let (name_hash, asset) = self.slots.take(slot);
        index.remove_if(
            name_hash,
            LoadedAsset {
                asset_type: D::ASSET_TYPE,
                slot,
            },
        );
        self.free_list.push(slot);
        if let Some(asset) = asset {
            self.decoder
                .perform_free(&asset, self.context.render.as_ref());
        }
    }
}

impl<D: AssetDecoder> TypeManager for TypedArena<D> {
    fn asset_type(&self) -> AssetType {
        D::ASSET_TYPE
    }

    fn load(&mut self, request: &LoadRequest<'_>) -> (SlotId, UntypedHandle) {
        let slot = self.allocate(request.name_hash);
        let handle = self.slots.acquire(slot);
        let read = Self::read_request(request);

        match request.mode {
            LoadMode::Sync => {
                self.load_inline(slot, &read);
                assert!(handle.is_loaded(), "sync load of {} left slot {slot} empty", read.path);
                self.stats.record_sync_load();
            }
            LoadMode::Async => {
                self.slots.set_pending(slot, true);
                let estimated_cost = self.decoder.estimate_finalize_cost(request.metadata);
                let path = read.path.clone();
                let metadata = read.metadata.clone();
                let decoder = Arc::clone(&self.decoder);
                let storage = Arc::clone(&self.context.storage);
                let stats = Arc::clone(&self.stats);
                let future = worker::submit(self.context.workers.as_ref(), move || {
                    read_or_missing(decoder.as_ref(), storage.as_ref(), &read, &stats)
                });
                self.pending.push_back(PendingLoad {
                    slot,
                    path,
                    metadata,
                    future,
                    estimated_cost,
                });
                self.stats.record_async_load();
            }
        }

        (slot, handle.into_untyped())
    }

    fn fetch(&self, slot: SlotId) -> UntypedHandle {
        self.slots.acquire(slot).into_untyped()
    }

    fn refresh(&mut self, request: &LoadRequest<'_>, slot: SlotId) {
        self.release_payload(slot);
        self.load_inline(slot, &Self::read_request(request));
        tracing::debug!(asset_type = %D::ASSET_TYPE, slot = %slot, path = %request.path, "asset refreshed");
    }

    fn collect_garbage(
        &mut self,
        policy: CollectionPolicy,
        index: &mut LoadedIndex,
    ) -> CollectionReport {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("collect_garbage", asset_type = %D::ASSET_TYPE).entered();

        let destroying = policy == CollectionPolicy::FullCollectionDuringDestruction;
        if destroying {
            self.missing = None;
            for load in self.pending.drain(..) {
                self.slots.set_pending(load.slot, false);
            }
        }

        let mut report = CollectionReport::default();
        for (slot, state) in self.slots.states() {
            match state {
                RefState::Cleared => {}
                RefState::Collectable => {
                    if self.slots.is_pending(slot) {
                        continue;
                    }
                    if self.slots.counter(slot).try_clear() {
                        self.free_slot(slot, index);
                        report.collected += 1;
                    }
                }
                RefState::Live(outstanding) if destroying => {
                    tracing::warn!(
                        asset_type = %D::ASSET_TYPE,
                        slot = %slot,
                        name_hash = %self.slots.name_hash(slot),
                        outstanding,
                        "asset still referenced at shutdown, freeing"
                    );
                    self.slots.counter(slot).force_clear();
                    self.free_slot(slot, index);
                    report.leaked += 1;
                }
                RefState::Live(_) => {}
            }
        }

        self.stats.record_collected(report.collected);
        self.stats.record_leaked(report.leaked);
        report
    }

    fn enable_async_loaded_asset(&mut self, budget: &mut FrameBudget) -> EnableOutcome {
        if self.pending.is_empty() {
            return EnableOutcome::Idle;
        }
        let Some(position) = self
            .pending
            .iter_mut()
            .position(|load| load.future.is_ready())
        else {
            return EnableOutcome::NotReady;
        };
        if !budget.admits(self.pending[position].estimated_cost) {
            return EnableOutcome::OverBudget;
        }
        let Some(load) = self.pending.remove(position) else {
            return EnableOutcome::NotReady;
        };

        let staged = match load.future.into_result() {
            Some(staged) => staged,
            None => {
                tracing::warn!(
                    asset_type = %D::ASSET_TYPE,
                    path = %load.path,
                    "async read aborted, substituting missing asset"
                );
                self.stats.record_read_failure();
                self.decoder.missing_staged(Some(&load.metadata))
            }
        };
        let name_hash = self.slots.name_hash(load.slot);
        let asset = self
            .decoder
            .finalize(name_hash, staged, self.context.render.as_ref());
        self.slots.store(load.slot, asset);

        budget.record_enabled();
        self.stats.record_enabled();
        EnableOutcome::Enabled
    }

    fn has_assets_to_enable(&self) -> bool {
        !self.pending.is_empty()
    }

    fn init_missing_asset_handle(&mut self, fallback: Option<UntypedHandle>) {
        let handle = match fallback.and_then(UntypedHandle::typed::<D::Asset>) {
            Some(handle) => {
                tracing::debug!(asset_type = %D::ASSET_TYPE, slot = %handle.slot_id(), "missing asset taken from manifest");
                handle
            }
            None => {
                let slot = self.allocate(NameHash::MISSING);
                let handle = self.slots.acquire(slot);
                let staged = self.decoder.missing_staged(None);
                let asset =
                    self.decoder
                        .finalize(NameHash::MISSING, staged, self.context.render.as_ref());
                self.slots.store(slot, asset);
                tracing::debug!(asset_type = %D::ASSET_TYPE, slot = %slot, "procedural missing asset created");
                handle
            }
        };
        self.missing = Some(handle);
    }

    fn missing_asset_handle(&self) -> Option<UntypedHandle> {
        self.missing.as_ref().map(AssetHandle::untyped)
    }

    fn notify_move(&mut self, slot: SlotId, old_hash: NameHash, new_hash: NameHash) {
        self.slots.rename(slot, old_hash, new_hash);
    }

    fn replace_with_missing(&mut self, slot: SlotId, metadata: Option<&AssetMetadata>) {
        let name_hash = self.release_payload(slot);
        let staged = self.decoder.missing_staged(metadata);
        let asset = self
            .decoder
            .finalize(name_hash, staged, self.context.render.as_ref());
        self.slots.store(slot, asset);
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn free_count(&self) -> usize {
        self.free_list.len()
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn slot_info(&self, slot: SlotId) -> Option<SlotInfo> {
        self.slots.info(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::manifest::{AssetMetadata, FontMetadata};
    use crate::render::{GpuResourceId, HeadlessBackend, RenderBackend};
    use crate::storage::MemoryStorage;
    use crate::worker::{ImmediateWorkerPool, Job, WorkerPool};
    use parking_lot::Mutex;
    use std::time::Instant;

    struct Blob {
        bytes: Vec<u8>,
        gpu: GpuResourceId,
    }

    impl StreamedAsset for Blob {
        const ASSET_TYPE: AssetType = AssetType::Font;
    }

    struct BlobDecoder;

    impl AssetDecoder for BlobDecoder {
        type Asset = Blob;
        type Staged = Vec<u8>;

        const ASSET_TYPE: AssetType = AssetType::Font;

        fn read_file(
            &self,
            storage: &dyn StorageBackend,
            request: &ReadRequest,
        ) -> Result<Vec<u8>> {
            storage.read_all(&request.path)
        }

        fn estimate_finalize_cost(&self, _metadata: &AssetMetadata) -> Duration {
            Duration::from_millis(5)
        }

        fn finalize(
            &self,
            name_hash: NameHash,
            staged: Vec<u8>,
            backend: &dyn RenderBackend,
        ) -> Blob {
            let gpu = backend.upload_mesh(name_hash, &[], &[]);
            Blob { bytes: staged, gpu }
        }

        fn perform_free(&self, asset: &Blob, backend: &dyn RenderBackend) {
            backend.release(asset.gpu);
        }

        fn missing_staged(&self, _metadata: Option<&AssetMetadata>) -> Vec<u8> {
            b"missing".to_vec()
        }
    }

    /// Queues jobs until the test runs them
    #[derive(Default)]
    struct DeferredPool {
        jobs: Mutex<Vec<Option<Job>>>,
    }

    impl DeferredPool {
        fn run(&self, index: usize) {
            let job = self.jobs.lock()[index].take();
            if let Some(job) = job {
                job();
            }
        }
    }

    impl WorkerPool for DeferredPool {
        fn execute(&self, job: Job) {
            self.jobs.lock().push(Some(job));
        }

        fn thread_count(&self) -> usize {
            0
        }
    }

    struct Fixture {
        storage: Arc<MemoryStorage>,
        backend: Arc<HeadlessBackend>,
        stats: Arc<StreamStats>,
        arena: TypedArena<BlobDecoder>,
        metadata: AssetMetadata,
    }

    fn fixture_with(workers: Arc<dyn WorkerPool>) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("a.ttf", b"alpha".to_vec());
        storage.insert("b.ttf", b"beta".to_vec());
        let backend = Arc::new(HeadlessBackend::new());
        let stats = Arc::new(StreamStats::new());
        let context = StreamContext::new(storage.clone(), workers, backend.clone());
        Fixture {
            arena: TypedArena::new(BlobDecoder, context, Arc::clone(&stats)),
            storage,
            backend,
            stats,
            metadata: AssetMetadata::Font(FontMetadata::default()),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(ImmediateWorkerPool))
    }

    fn request<'a>(path: &'a str, metadata: &'a AssetMetadata, mode: LoadMode) -> LoadRequest<'a> {
        LoadRequest {
            name_hash: crate::hash::hash_normalized(path),
            path,
            metadata,
            mode,
        }
    }

    fn register(index: &mut LoadedIndex, slot: SlotId, path: &str) {
        index.insert(
            crate::hash::hash_normalized(path),
            LoadedAsset {
                asset_type: AssetType::Font,
                slot,
            },
        );
    }

    #[test]
    fn test_sync_load_and_fetch_share_slot() {
        let mut f = fixture();
        let (slot, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Sync));
        assert!(handle.is_loaded());
        assert_eq!(handle.ref_count(), 1);

        let again = f.arena.fetch(slot);
        assert_eq!(again.slot_id(), slot);
        assert_eq!(handle.ref_count(), 2);
        assert_eq!(f.storage.read_count(), 1);

        let blob = again.typed::<Blob>().unwrap().get().unwrap();
        assert_eq!(blob.bytes, b"alpha");
    }

    #[test]
    fn test_collect_frees_unreferenced_slot() {
        let mut f = fixture();
        let mut index = LoadedIndex::new();
        let (slot, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Sync));
        register(&mut index, slot, "a.ttf");

        let copies: Vec<_> = (0..3).map(|_| handle.clone()).collect();
        drop(copies);
        assert_eq!(handle.ref_count(), 1);

        let report = f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);
        assert_eq!(report.collected, 0);

        drop(handle);
        let report = f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);
        assert_eq!(report.collected, 1);
        assert_eq!(f.arena.free_count(), 1);
        assert_eq!(f.arena.slots().ref_state(slot), Some(RefState::Cleared));
        assert!(index.is_empty());
        assert_eq!(f.backend.live_resources(), 0);

        // Nothing changed, nothing more to free
        let report = f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);
        assert_eq!(report, CollectionReport::default());
        assert_eq!(f.stats.snapshot().collected, 1);
    }

    #[test]
    fn test_freed_slot_is_recycled() {
        let mut f = fixture();
        let mut index = LoadedIndex::new();
        let (first, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Sync));
        drop(handle);
        f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);

        let (second, handle) = f.arena.load(&request("b.ttf", &f.metadata, LoadMode::Sync));
        assert_eq!(first, second);
        assert_eq!(f.arena.slot_count(), 1);
        assert_eq!(handle.ref_count(), 1);
        assert_eq!(handle.name_hash(), crate::hash::hash_normalized("b.ttf"));
        let blob = handle.typed::<Blob>().unwrap().get().unwrap();
        assert_eq!(blob.bytes, b"beta");
    }

    #[test]
    fn test_async_load_waits_for_pump() {
        let mut f = fixture();
        let (_, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Async));
        assert!(!handle.is_loaded());
        assert!(f.arena.has_assets_to_enable());

        let mut budget = FrameBudget::new(Duration::from_millis(16));
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::Enabled);
        assert!(handle.is_loaded());
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::Idle);
    }

    #[test]
    fn test_pending_slot_survives_collection() {
        let pool = Arc::new(DeferredPool::default());
        let mut f = fixture_with(pool.clone());
        let mut index = LoadedIndex::new();
        let (slot, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Async));
        register(&mut index, slot, "a.ttf");
        drop(handle);

        let report = f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);
        assert_eq!(report.collected, 0);
        assert_eq!(index.len(), 1);

        pool.run(0);
        let mut budget = FrameBudget::new(Duration::from_millis(16));
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::Enabled);

        let report = f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);
        assert_eq!(report.collected, 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_ready_load_is_not_blocked_by_slow_head() {
        let pool = Arc::new(DeferredPool::default());
        let mut f = fixture_with(pool.clone());
        let (_, slow) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Async));
        let (_, fast) = f.arena.load(&request("b.ttf", &f.metadata, LoadMode::Async));

        let mut budget = FrameBudget::new(Duration::from_millis(16));
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::NotReady);

        pool.run(1);
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::Enabled);
        assert!(fast.is_loaded());
        assert!(!slow.is_loaded());

        pool.run(0);
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::Enabled);
        assert!(slow.is_loaded());
    }

    #[test]
    fn test_budget_limits_enables_per_frame() {
        let mut f = fixture();
        let (_, first) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Async));
        let (_, second) = f.arena.load(&request("b.ttf", &f.metadata, LoadMode::Async));

        let mut budget = FrameBudget::with_deadline(Instant::now());
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::Enabled);
        assert_eq!(f.arena.enable_async_loaded_asset(&mut budget), EnableOutcome::OverBudget);
        assert!(first.is_loaded());
        assert!(!second.is_loaded());

        let mut next_frame = FrameBudget::with_deadline(Instant::now());
        assert_eq!(f.arena.enable_async_loaded_asset(&mut next_frame), EnableOutcome::Enabled);
        assert!(second.is_loaded());
    }

    #[test]
    fn test_read_failure_resolves_to_missing_content() {
        let mut f = fixture();
        let (_, handle) = f.arena.load(&request("gone.ttf", &f.metadata, LoadMode::Async));

        let mut budget = FrameBudget::new(Duration::from_millis(16));
        f.arena.enable_async_loaded_asset(&mut budget);
        let blob = handle.typed::<Blob>().unwrap().get().unwrap();
        assert_eq!(blob.bytes, b"missing");
        assert_eq!(f.stats.snapshot().read_failures, 1);
    }

    #[test]
    fn test_destruction_reports_leaks() {
        let mut f = fixture();
        let mut index = LoadedIndex::new();
        f.arena.init_missing_asset_handle(None);
        let (_, leaked) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Sync));
        let (_, released) = f.arena.load(&request("b.ttf", &f.metadata, LoadMode::Sync));
        drop(released);

        let report = f
            .arena
            .collect_garbage(CollectionPolicy::FullCollectionDuringDestruction, &mut index);
        assert_eq!(report.collected, 2);
        assert_eq!(report.leaked, 1);
        assert_eq!(f.backend.live_resources(), 0);
        assert!(!leaked.is_loaded());
    }

    #[test]
    fn test_missing_handle_is_procedural_by_default() {
        let mut f = fixture();
        f.arena.init_missing_asset_handle(None);
        let missing = f.arena.missing_handle().unwrap();
        assert_eq!(missing.name_hash(), NameHash::MISSING);
        assert_eq!(missing.get().unwrap().bytes, b"missing");

        let mut index = LoadedIndex::new();
        f.arena.collect_garbage(CollectionPolicy::FullCollection, &mut index);
        assert!(missing.is_loaded());
    }

    #[test]
    fn test_refresh_and_replace_keep_slot() {
        let mut f = fixture();
        let (slot, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Sync));
        let handle = handle.typed::<Blob>().unwrap();

        f.storage.insert("a.ttf", b"alpha v2".to_vec());
        f.arena.refresh(&request("a.ttf", &f.metadata, LoadMode::Sync), slot);
        assert_eq!(handle.get().unwrap().bytes, b"alpha v2");
        assert_eq!(f.backend.live_resources(), 1);

        f.arena.replace_with_missing(slot, None);
        assert_eq!(handle.slot_id(), slot);
        assert_eq!(handle.get().unwrap().bytes, b"missing");
        assert_eq!(f.backend.live_resources(), 1);
    }

    #[test]
    fn test_notify_move_renames_slot() {
        let mut f = fixture();
        let (slot, handle) = f.arena.load(&request("a.ttf", &f.metadata, LoadMode::Sync));
        let old = crate::hash::hash_normalized("a.ttf");
        let new = crate::hash::hash_normalized("fonts/a.ttf");
        f.arena.notify_move(slot, old, new);
        assert_eq!(handle.name_hash(), new);
    }
}
