//! Reference-counted asset handles.
//!
//! A handle is an arena reference plus a slot index and a shared atomic
//! counter. Cloning a handle increments the counter, dropping it decrements.
//! Reaching zero frees nothing by itself; the slot only becomes eligible for
//! the next garbage collection pass.

use crate::arena::{ErasedArena, SlotArena};
use crate::decoder::StreamedAsset;
use crate::hash::NameHash;
use crate::manifest::AssetType;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Index of a slot inside one type's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub u32);

impl SlotId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observable state of a slot counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefState {
    /// No handles left; reclaimed by the next collection
    Collectable,
    /// Reclaimed and waiting on the free list
    Cleared,
    /// Outstanding handles
    Live(u32),
}

/// Atomic reference counter with a `Cleared` sentinel
#[derive(Debug)]
pub struct RefCount(AtomicU32);

impl RefCount {
    const CLEARED: u32 = u32::MAX;

    /// New counters start cleared, like recycled ones
    pub(crate) fn new() -> Self {
        Self(AtomicU32::new(Self::CLEARED))
    }

    pub fn state(&self) -> RefState {
        match self.0.load(Ordering::Acquire) {
            0 => RefState::Collectable,
            Self::CLEARED => RefState::Cleared,
            n => RefState::Live(n),
        }
    }

    /// Current handle count, 0 when cleared
    pub fn get(&self) -> u32 {
        match self.state() {
            RefState::Live(n) => n,
            RefState::Collectable | RefState::Cleared => 0,
        }
    }

    /// Cleared -> 0, done when a slot is (re)allocated
    pub(crate) fn reset(&self) {
        let reset = self
            .0
            .compare_exchange(Self::CLEARED, 0, Ordering::AcqRel, Ordering::Acquire);
        assert!(
            reset.is_ok(),
            "slot reused before collection finished (counter = {:?})",
            reset.err()
        );
    }

    /// 0 -> Cleared; fails if a handle appeared in between
    pub(crate) fn try_clear(&self) -> bool {
        self.0
            .compare_exchange(0, Self::CLEARED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditionally mark cleared, returns the previous count
    pub(crate) fn force_clear(&self) -> u32 {
        self.0.swap(Self::CLEARED, Ordering::AcqRel)
    }

    // A cleared counter stays cleared: handles that outlive a shutdown
    // collection keep referring to a dead slot.
    fn increment(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match n {
                Self::CLEARED => None,
                n => Some(n + 1),
            });
    }

    fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match n {
                0 | Self::CLEARED => None,
                n => Some(n - 1),
            });
    }
}

/// One counted reference to a slot
pub(crate) struct SlotRef {
    id: SlotId,
    count: Arc<RefCount>,
}

impl SlotRef {
    pub(crate) fn acquire(id: SlotId, count: Arc<RefCount>) -> Self {
        count.increment();
        Self { id, count }
    }

    pub(crate) fn id(&self) -> SlotId {
        self.id
    }

    pub(crate) fn count(&self) -> u32 {
        self.count.get()
    }
}

impl Clone for SlotRef {
    fn clone(&self) -> Self {
        Self::acquire(self.id, Arc::clone(&self.count))
    }
}

impl Drop for SlotRef {
    fn drop(&mut self) {
        self.count.decrement();
    }
}

/// Typed handle to a streamed asset
pub struct AssetHandle<A: StreamedAsset> {
    arena: Arc<SlotArena<A>>,
    slot: SlotRef,
}

impl<A: StreamedAsset> AssetHandle<A> {
    pub(crate) fn new(arena: Arc<SlotArena<A>>, slot: SlotRef) -> Self {
        Self { arena, slot }
    }

    /// Current payload, `None` until an async load has been enabled.
    ///
    /// The returned `Arc` must not outlive the handle: once the last handle
    /// is gone the next collection releases the asset's GPU resources.
    pub fn get(&self) -> Option<Arc<A>> {
        self.arena.asset(self.slot.id())
    }

    pub fn is_loaded(&self) -> bool {
        self.arena.is_loaded(self.slot.id())
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot.id()
    }

    pub fn name_hash(&self) -> NameHash {
        self.arena.name_hash(self.slot.id())
    }

    pub fn ref_count(&self) -> u32 {
        self.slot.count()
    }

    pub fn asset_type(&self) -> AssetType {
        A::ASSET_TYPE
    }

    /// Erase the asset type
    pub fn into_untyped(self) -> UntypedHandle {
        let arena: Arc<dyn ErasedArena> = self.arena;
        UntypedHandle {
            asset_type: A::ASSET_TYPE,
            arena,
            slot: self.slot,
        }
    }

    pub fn untyped(&self) -> UntypedHandle {
        self.clone().into_untyped()
    }
}

impl<A: StreamedAsset> Clone for AssetHandle<A> {
    fn clone(&self) -> Self {
        Self {
            arena: Arc::clone(&self.arena),
            slot: self.slot.clone(),
        }
    }
}

impl<A: StreamedAsset> fmt::Debug for AssetHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("asset_type", &A::ASSET_TYPE)
            .field("slot", &self.slot.id())
            .field("name_hash", &self.name_hash())
            .field("ref_count", &self.ref_count())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Handle whose asset type is only known at runtime
pub struct UntypedHandle {
    asset_type: AssetType,
    arena: Arc<dyn ErasedArena>,
    slot: SlotRef,
}

impl UntypedHandle {
    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot.id()
    }

    pub fn ref_count(&self) -> u32 {
        self.slot.count()
    }

    pub fn is_loaded(&self) -> bool {
        self.arena.is_slot_loaded(self.slot.id())
    }

    pub fn name_hash(&self) -> NameHash {
        self.arena.slot_name_hash(self.slot.id())
    }

    /// Recover the typed handle, `None` if `A` is not the stored type
    pub fn typed<A: StreamedAsset>(self) -> Option<AssetHandle<A>> {
        if A::ASSET_TYPE != self.asset_type {
            return None;
        }
        let arena = Arc::clone(&self.arena)
            .into_any()
            .downcast::<SlotArena<A>>()
            .ok()?;
        Some(AssetHandle::new(arena, self.slot))
    }
}

impl Clone for UntypedHandle {
    fn clone(&self) -> Self {
        Self {
            asset_type: self.asset_type,
            arena: Arc::clone(&self.arena),
            slot: self.slot.clone(),
        }
    }
}

impl fmt::Debug for UntypedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UntypedHandle")
            .field("asset_type", &self.asset_type)
            .field("slot", &self.slot.id())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
