//! Per-frame, bulk-reset allocators (spec §4.C). Two flavors, chosen per
//! resource kind by how wildly its count varies per frame:
//!
//! - [`TransientChunkRegistry`] for kinds like argument buffers, whose
//!   count is unpredictable, backed by a `ChunkedArena` that grows on
//!   demand.
//! - [`TransientFixedSizeRegistry`] for kinds with a known per-frame upper
//!   bound (textures, buffers): a single pre-allocated buffer of capacity `C`.

use crate::error::RegistryError;
use crate::handle::{self, Handle, HandleFlags, ResourceKind};
use crate::property::SharedSlots;
use crate::sync::Spinlock;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

/// A resource kind whose transient registries need somewhere to put
/// lifetime-scoped scratch the shared property set doesn't cover (spec
/// §3.3 "Transient-only"): texture-view base + descriptor, an
/// argument-buffer's backing-buffer offset, and so on. Kinds with no
/// scratch use `()`.
pub trait TransientExtra: Default + Send + 'static {}
impl<T: Default + Send + 'static> TransientExtra for T {}

/// Chunk-backed transient registry: count varies wildly per frame (spec
/// §4.C, "argument buffers").
pub struct TransientChunkRegistry<D, X = ()> {
    kind: ResourceKind,
    arena_index: u8,
    /// Disambiguates this registry's handle space from a same-kind,
    /// same-arena sibling (e.g. transient texture views share `(Texture,
    /// arena_index)` with transient textures themselves); every handle
    /// this registry allocates or validates must agree with this bit.
    is_view_registry: bool,
    generation: AtomicU8,
    /// `allocate_handle` acquires its index under this spinlock (spec §4.C).
    count: Spinlock<u32>,
    shared: SharedSlots<D>,
    extra: crate::chunk::ChunkedArena<Mutex<X>>,
}

impl<D, X: TransientExtra> TransientChunkRegistry<D, X> {
    pub fn new(kind: ResourceKind, arena_index: u8, max_chunks: usize) -> Self {
        Self::new_with_view_flag(kind, arena_index, max_chunks, false)
    }

    /// Like [`Self::new`], but pins whether every handle this registry
    /// produces or accepts must carry [`HandleFlags::RESOURCE_VIEW`]. Used
    /// to keep a view registry's handle space disjoint from a plain
    /// same-kind, same-arena registry (spec §3.1 view indirection).
    pub fn new_with_view_flag(kind: ResourceKind, arena_index: u8, max_chunks: usize, is_view_registry: bool) -> Self {
        TransientChunkRegistry {
            kind,
            arena_index,
            is_view_registry,
            generation: AtomicU8::new(0),
            count: Spinlock::new(0),
            shared: SharedSlots::new(max_chunks),
            extra: crate::chunk::ChunkedArena::new(max_chunks),
        }
    }

    /// Acquires a sequential index under the registry spinlock, reserving
    /// a new chunk if this index begins one, and packs a fresh handle.
    pub fn allocate_handle(&self, flags: HandleFlags) -> (Handle, usize) {
        let index = {
            let mut count = self.count.lock();
            let index = *count;
            *count += 1;
            index
        };
        self.shared.reserve(index as usize);
        self.extra.reserve(index as usize);
        let generation = self.generation.load(Ordering::Relaxed);
        debug_assert_eq!(
            flags.contains(HandleFlags::RESOURCE_VIEW),
            self.is_view_registry,
            "handle flags disagree with this registry's view-ness"
        );
        let handle = handle::pack(self.kind, flags, generation, self.arena_index, index);
        (handle, index as usize)
    }

    pub fn initialize(&self, index: usize, label: Option<String>, descriptor: D, extra: X) {
        self.shared.initialize(index, label, descriptor);
        *self.extra.at(index).lock().unwrap() = extra;
    }

    pub fn shared(&self) -> &SharedSlots<D> {
        &self.shared
    }

    pub fn extra(&self, index: usize) -> std::sync::MutexGuard<'_, X> {
        self.extra.at(index).lock().unwrap()
    }

    pub fn is_valid(&self, h: Handle) -> bool {
        handle::kind(h) == Some(self.kind)
            && handle::arena(h) == self.arena_index
            && handle::generation(h) == self.generation.load(Ordering::Relaxed)
            && (handle::index(h) as u32) < *self.count.lock()
            && handle::flags(h).contains(HandleFlags::RESOURCE_VIEW) == self.is_view_registry
    }

    /// Deinitializes every in-use slot, resets the count to zero, and
    /// bumps the arena generation (wrapping), invalidating every handle
    /// allocated since the last `clear` (spec §8 scenario S1).
    pub fn clear(&self) {
        let mut count = self.count.lock();
        for index in 0..*count {
            self.shared.deinitialize(index as usize);
        }
        *count = 0;
        self.generation.fetch_add(1, Ordering::Relaxed);
        log::debug!("transient chunk registry for {:?}: cleared, generation bumped", self.kind);
    }
}

/// Fixed-capacity transient registry: a known per-frame upper bound (spec
/// §4.C, "textures, buffers").
pub struct TransientFixedSizeRegistry<D, X = ()> {
    kind: ResourceKind,
    arena_index: u8,
    capacity: u32,
    generation: AtomicU8,
    count: AtomicU32,
    shared: SharedSlots<D>,
    extra: crate::chunk::ChunkedArena<Mutex<X>>,
}

impl<D, X: TransientExtra> TransientFixedSizeRegistry<D, X> {
    pub fn new(kind: ResourceKind, arena_index: u8, capacity: u32) -> Self {
        let chunk_size = crate::chunk::CHUNK_SIZE as u32;
        let max_chunks = ((capacity + chunk_size - 1) / chunk_size).max(1) as usize;
        TransientFixedSizeRegistry {
            kind,
            arena_index,
            capacity,
            generation: AtomicU8::new(0),
            count: AtomicU32::new(0),
            shared: SharedSlots::new(max_chunks),
            extra: crate::chunk::ChunkedArena::new(max_chunks),
        }
    }

    /// Atomically increments the live count; fatal if it would exceed
    /// `capacity` (spec §4.C, §7 capacity exhaustion).
    pub fn allocate_handle(&self, flags: HandleFlags) -> (Handle, usize) {
        let index = self.count.fetch_add(1, Ordering::AcqRel);
        assert!(
            index < self.capacity,
            "{:?}: {}",
            self.kind,
            RegistryError::FixedSizeRegistryExhausted { capacity: self.capacity }
        );
        self.shared.reserve(index as usize);
        self.extra.reserve(index as usize);
        let generation = self.generation.load(Ordering::Relaxed);
        let handle = handle::pack(self.kind, flags, generation, self.arena_index, index);
        (handle, index as usize)
    }

    pub fn initialize(&self, index: usize, label: Option<String>, descriptor: D, extra: X) {
        self.shared.initialize(index, label, descriptor);
        *self.extra.at(index).lock().unwrap() = extra;
    }

    pub fn shared(&self) -> &SharedSlots<D> {
        &self.shared
    }

    pub fn extra(&self, index: usize) -> std::sync::MutexGuard<'_, X> {
        self.extra.at(index).lock().unwrap()
    }

    pub fn is_valid(&self, h: Handle) -> bool {
        handle::kind(h) == Some(self.kind)
            && handle::arena(h) == self.arena_index
            && handle::generation(h) == self.generation.load(Ordering::Relaxed)
            && handle::index(h) < self.count.load(Ordering::Acquire)
            && !handle::flags(h).contains(HandleFlags::RESOURCE_VIEW)
    }

    /// Atomically exchanges the count with zero, deinitializes, and bumps
    /// the generation.
    pub fn clear(&self) {
        let count = self.count.swap(0, Ordering::AcqRel);
        for index in 0..count {
            self.shared.deinitialize(index as usize);
        }
        self.generation.fetch_add(1, Ordering::Relaxed);
        log::debug!("transient fixed-size registry for {:?}: cleared, generation bumped", self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::HandleFlags;

    /// Scenario S1: transient allocate and invalidate.
    #[test]
    fn transient_allocate_and_invalidate() {
        let registry: TransientFixedSizeRegistry<u32, ()> =
            TransientFixedSizeRegistry::new(ResourceKind::Buffer, 0, 16);
        let (h1, idx1) = registry.allocate_handle(HandleFlags::empty());
        registry.initialize(idx1, None, 1024, ());
        assert!(registry.is_valid(h1));

        registry.clear();
        assert!(!registry.is_valid(h1));

        let (h2, idx2) = registry.allocate_handle(HandleFlags::empty());
        registry.initialize(idx2, None, 1024, ());
        assert_ne!(h1, h2);
        assert!(registry.is_valid(h2));
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn fixed_size_registry_is_fatal_on_overflow() {
        let registry: TransientFixedSizeRegistry<u32, ()> = TransientFixedSizeRegistry::new(ResourceKind::Buffer, 0, 1);
        registry.allocate_handle(HandleFlags::empty());
        registry.allocate_handle(HandleFlags::empty());
    }

    #[test]
    fn chunk_registry_handles_varying_counts() {
        let registry: TransientChunkRegistry<u32, ()> =
            TransientChunkRegistry::new(ResourceKind::ArgumentBuffer, 1, crate::limits::MAX_CHUNKS_ARGUMENT_BUFFERS);
        let mut handles = Vec::new();
        for i in 0..1000u32 {
            let (h, idx) = registry.allocate_handle(HandleFlags::empty());
            registry.initialize(idx, None, i, ());
            handles.push(h);
        }
        assert!(handles.iter().all(|h| registry.is_valid(*h)));
        registry.clear();
        assert!(handles.iter().all(|h| !registry.is_valid(*h)));
    }

    #[test]
    fn clear_is_idempotent() {
        let registry: TransientFixedSizeRegistry<u32, ()> = TransientFixedSizeRegistry::new(ResourceKind::Texture, 0, 4);
        registry.clear();
        registry.clear();
    }
}
