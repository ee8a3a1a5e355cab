//! Per-resource property sets (spec §3.3, §4.B "same chunk-backed pattern
//! underlies property sets"): parallel, independently-chunked arrays keyed
//! by slot index, one `ChunkedArena` per field rather than one array of
//! structs. This preserves the source's cache-friendly SoA iteration (spec
//! §9 "Parallel-array property sets"): a `clear_after_render_graph` pass
//! over `active_render_graphs` never touches `label` or `descriptor` memory.

use crate::chunk::ChunkedArena;
use crate::descriptor::PurgeableState;
use crate::handle::Handle;
use crate::wait_index::{Access, WaitIndexTracker};
use std::sync::atomic::{AtomicU64, AtomicU8};
use std::sync::Mutex;

/// One recorded usage, as forwarded through a hazard-tracking group or a
/// resource view (spec §3.3, §4.E). `render_graph` is the bit position in
/// `active_render_graphs` that produced this usage.
#[derive(Clone, Copy, Debug)]
pub struct Usage {
    pub render_graph: u8,
    pub access: Access,
}

/// Fields shared by every resource regardless of lifetime (spec §3.3
/// "Shared"). Generic over the kind's descriptor type `D`.
pub struct SharedSlots<D> {
    label: ChunkedArena<Mutex<Option<String>>>,
    descriptor: ChunkedArena<Mutex<Option<D>>>,
    /// Opaque backend-side pointer/identity; `0` means absent.
    backing_resource_ptr: ChunkedArena<AtomicU64>,
    /// Encoded `Handle` of this resource's hazard-tracking group, or
    /// `Handle::NONE` (spec §3.3, §4.E).
    hazard_tracking_group: ChunkedArena<AtomicU64>,
    /// Present only on the slot that actually owns the usage log (a
    /// resource with no group and no base resource); forwarding targets
    /// read through here via their own index once resolved (see
    /// `crate::resource`).
    usages: ChunkedArena<Mutex<Vec<Usage>>>,
    /// GPU-addressable backends only (spec §3.3); `0` if not applicable.
    gpu_address: ChunkedArena<AtomicU64>,
}

impl<D> SharedSlots<D> {
    pub fn new(max_chunks: usize) -> Self {
        SharedSlots {
            label: ChunkedArena::new(max_chunks),
            descriptor: ChunkedArena::new(max_chunks),
            backing_resource_ptr: ChunkedArena::new(max_chunks),
            hazard_tracking_group: ChunkedArena::new(max_chunks),
            usages: ChunkedArena::new(max_chunks),
            gpu_address: ChunkedArena::new(max_chunks),
        }
    }

    pub fn reserve(&self, index: usize) {
        self.label.reserve(index);
        self.descriptor.reserve(index);
        self.backing_resource_ptr.reserve(index);
        self.hazard_tracking_group.reserve(index);
        self.usages.reserve(index);
        self.gpu_address.reserve(index);
    }

    pub fn initialize(&self, index: usize, label: Option<String>, descriptor: D) {
        *self.label.at(index).lock().unwrap() = label;
        *self.descriptor.at(index).lock().unwrap() = Some(descriptor);
        self.backing_resource_ptr.at(index).store(0, std::sync::atomic::Ordering::Relaxed);
        self.hazard_tracking_group.at(index).store(Handle::NONE.as_u64(), std::sync::atomic::Ordering::Relaxed);
        self.gpu_address.at(index).store(0, std::sync::atomic::Ordering::Relaxed);
        self.usages.at(index).lock().unwrap().clear();
    }

    pub fn deinitialize(&self, index: usize) {
        self.label.at(index).lock().unwrap().take();
        self.descriptor.at(index).lock().unwrap().take();
        self.usages.at(index).lock().unwrap().clear();
    }

    pub fn label(&self, index: usize) -> Option<String> {
        self.label.at(index).lock().unwrap().clone()
    }

    pub fn set_label(&self, index: usize, label: Option<String>) {
        *self.label.at(index).lock().unwrap() = label;
    }

    pub fn with_descriptor<R>(&self, index: usize, f: impl FnOnce(&D) -> R) -> R {
        let guard = self.descriptor.at(index).lock().unwrap();
        f(guard.as_ref().expect("descriptor accessed on a slot that was never initialized"))
    }

    /// Mutates a descriptor in place. Used by texture-view creation (spec
    /// §8 scenario S5) to fold `TEXTURE_VIEW`/`PIXEL_FORMAT_VIEW` into the
    /// base resource's `usage_hint` after the fact.
    pub fn with_descriptor_mut<R>(&self, index: usize, f: impl FnOnce(&mut D) -> R) -> R {
        let mut guard = self.descriptor.at(index).lock().unwrap();
        f(guard.as_mut().expect("descriptor accessed on a slot that was never initialized"))
    }

    pub fn hazard_tracking_group(&self, index: usize) -> Handle {
        Handle::from_u64(self.hazard_tracking_group.at(index).load(std::sync::atomic::Ordering::Relaxed))
    }

    /// Assigns a hazard-tracking group. Spec §4.E: "cannot remove a
    /// resource from a hazard-tracking group after it has been added to
    /// it"; reassigning to the *same* group is a harmless no-op (spec §8
    /// idempotence list), reassigning to a *different* one is a programmer
    /// error.
    pub fn set_hazard_tracking_group(&self, index: usize, group: Handle) {
        let cell = &self.hazard_tracking_group.at(index);
        let previous = Handle::from_u64(cell.load(std::sync::atomic::Ordering::Relaxed));
        if previous == group {
            return;
        }
        assert!(previous.is_none(), "resource already belongs to a different hazard-tracking group");
        cell.store(group.as_u64(), std::sync::atomic::Ordering::Relaxed);
    }

    pub fn backing_resource_ptr(&self, index: usize) -> u64 {
        self.backing_resource_ptr.at(index).load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn set_backing_resource_ptr(&self, index: usize, ptr: u64) {
        self.backing_resource_ptr.at(index).store(ptr, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn gpu_address(&self, index: usize) -> u64 {
        self.gpu_address.at(index).load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn set_gpu_address(&self, index: usize, address: u64) {
        self.gpu_address.at(index).store(address, std::sync::atomic::Ordering::Relaxed);
    }

    /// Appends a usage record to this slot's own log. Whether this is the
    /// log that actually "counts" for a given resource depends on
    /// hazard-group/view forwarding, resolved by the caller in
    /// `crate::resource`.
    pub fn record_usage(&self, index: usize, usage: Usage) {
        self.usages.at(index).lock().unwrap().push(usage);
    }

    pub fn usages(&self, index: usize) -> Vec<Usage> {
        self.usages.at(index).lock().unwrap().clone()
    }

    pub fn clear_usages(&self, index: usize) {
        self.usages.at(index).lock().unwrap().clear();
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StateFlags {
    pub initialised: bool,
    pub purgeable_state: PurgeableState,
}

impl Default for StateFlags {
    fn default() -> Self {
        StateFlags { initialised: false, purgeable_state: PurgeableState::NonDiscardable }
    }
}

/// Fields specific to persistent resources (spec §3.3 "Persistent-only").
pub struct PersistentSlots {
    state_flags: ChunkedArena<Mutex<StateFlags>>,
    wait_index: ChunkedArena<WaitIndexTracker>,
    /// Bit `q` set iff a render graph running on queue `q` still
    /// references this resource (spec §3.3); OR/AND'd with relaxed atomics.
    active_render_graphs: ChunkedArena<AtomicU8>,
    /// Encoded `Handle` of the owning heap, or `Handle::NONE`.
    heap: ChunkedArena<AtomicU64>,
    /// The slot's current generation; bumped (wrapping) on every
    /// `dispose_immediately` (spec §4.C `PersistentRegistry`).
    generation: ChunkedArena<AtomicU8>,
}

impl PersistentSlots {
    pub fn new(max_chunks: usize) -> Self {
        PersistentSlots {
            state_flags: ChunkedArena::new(max_chunks),
            wait_index: ChunkedArena::new(max_chunks),
            active_render_graphs: ChunkedArena::new(max_chunks),
            heap: ChunkedArena::new(max_chunks),
            generation: ChunkedArena::new(max_chunks),
        }
    }

    pub fn reserve(&self, index: usize) {
        self.state_flags.reserve(index);
        self.wait_index.reserve(index);
        self.active_render_graphs.reserve(index);
        self.heap.reserve(index);
        self.generation.reserve(index);
    }

    pub fn initialize(&self, index: usize, heap: Handle) {
        *self.state_flags.at(index).lock().unwrap() = StateFlags::default();
        self.wait_index.at(index).reset();
        self.active_render_graphs.at(index).store(0, std::sync::atomic::Ordering::Relaxed);
        self.heap.at(index).store(heap.as_u64(), std::sync::atomic::Ordering::Relaxed);
    }

    pub fn deinitialize(&self, index: usize) {
        *self.state_flags.at(index).lock().unwrap() = StateFlags::default();
        self.wait_index.at(index).reset();
        self.active_render_graphs.at(index).store(0, std::sync::atomic::Ordering::Relaxed);
        self.heap.at(index).store(Handle::NONE.as_u64(), std::sync::atomic::Ordering::Relaxed);
    }

    pub fn generation(&self, index: usize) -> u8 {
        self.generation.at(index).load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Bumps the slot's generation (wrapping), invalidating any
    /// outstanding handle that named this slot.
    pub fn bump_generation(&self, index: usize) -> u8 {
        self.generation
            .at(index)
            .fetch_update(std::sync::atomic::Ordering::AcqRel, std::sync::atomic::Ordering::Acquire, |g| {
                Some(g.wrapping_add(1))
            })
            .unwrap()
            .wrapping_add(1)
    }

    pub fn state_flags(&self, index: usize) -> StateFlags {
        *self.state_flags.at(index).lock().unwrap()
    }

    pub fn set_initialised(&self, index: usize, initialised: bool) {
        self.state_flags.at(index).lock().unwrap().initialised = initialised;
    }

    /// Destructive purgeable-state transitions (to `Discarded` or away from
    /// it) also clear `initialised` (spec §4.G `update_purgeable_state`).
    pub fn set_purgeable_state(&self, index: usize, to: PurgeableState) -> PurgeableState {
        let mut guard = self.state_flags.at(index).lock().unwrap();
        let previous = guard.purgeable_state;
        let destructive = to == PurgeableState::Discarded || previous == PurgeableState::Discarded;
        guard.purgeable_state = to;
        if destructive {
            guard.initialised = false;
        }
        previous
    }

    pub fn wait_index(&self, index: usize) -> &WaitIndexTracker {
        self.wait_index.at(index)
    }

    pub fn active_render_graphs(&self, index: usize) -> u8 {
        self.active_render_graphs.at(index).load(std::sync::atomic::Ordering::Relaxed)
    }

    /// `mark_as_used`: ORs `graph_mask` into `active_render_graphs` (spec §4.D).
    pub fn mark_used(&self, index: usize, graph_mask: u8) {
        self.active_render_graphs.at(index).fetch_or(graph_mask, std::sync::atomic::Ordering::Relaxed);
    }

    /// `clear_after_render_graph`: ANDs out queue `q`'s bit.
    pub fn clear_render_graph_bit(&self, index: usize, queue: u8) {
        self.active_render_graphs
            .at(index)
            .fetch_and(!(1 << queue), std::sync::atomic::Ordering::Relaxed);
    }

    pub fn heap(&self, index: usize) -> Handle {
        Handle::from_u64(self.heap.at(index).load(std::sync::atomic::Ordering::Relaxed))
    }

    /// `has_pending_render_graph`: spec §4.D, true iff `active_render_graphs
    /// != 0`.
    pub fn has_pending_render_graph(&self, index: usize) -> bool {
        self.active_render_graphs(index) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_slots_initialize_and_read_back() {
        let slots: SharedSlots<u32> = SharedSlots::new(4);
        slots.reserve(0);
        slots.initialize(0, Some("buf".into()), 7u32);
        assert_eq!(slots.label(0).as_deref(), Some("buf"));
        assert_eq!(slots.with_descriptor(0, |d| *d), 7);
    }

    #[test]
    fn hazard_group_assignment_is_idempotent_but_exclusive() {
        let slots: SharedSlots<u32> = SharedSlots::new(4);
        slots.reserve(0);
        slots.initialize(0, None, 0);
        let g1 = crate::handle::pack(crate::handle::ResourceKind::HazardTrackingGroup, crate::handle::HandleFlags::PERSISTENT, 0, 0, 1);
        slots.set_hazard_tracking_group(0, g1);
        slots.set_hazard_tracking_group(0, g1); // no-op
        assert_eq!(slots.hazard_tracking_group(0), g1);
    }

    #[test]
    #[should_panic(expected = "different hazard-tracking group")]
    fn hazard_group_reassignment_is_forbidden() {
        let slots: SharedSlots<u32> = SharedSlots::new(4);
        slots.reserve(0);
        slots.initialize(0, None, 0);
        let g1 = crate::handle::pack(crate::handle::ResourceKind::HazardTrackingGroup, crate::handle::HandleFlags::PERSISTENT, 0, 0, 1);
        let g2 = crate::handle::pack(crate::handle::ResourceKind::HazardTrackingGroup, crate::handle::HandleFlags::PERSISTENT, 0, 0, 2);
        slots.set_hazard_tracking_group(0, g1);
        slots.set_hazard_tracking_group(0, g2);
    }

    #[test]
    fn active_render_graphs_or_and_algebra() {
        let slots = PersistentSlots::new(4);
        slots.reserve(0);
        slots.initialize(0, Handle::NONE);
        slots.mark_used(0, 0b0000_1010);
        slots.clear_render_graph_bit(0, 1);
        assert_eq!(slots.active_render_graphs(0), 0b0000_1000);
    }

    #[test]
    fn generation_wraps() {
        let slots = PersistentSlots::new(4);
        slots.reserve(0);
        slots.initialize(0, Handle::NONE);
        for _ in 0..256 {
            slots.bump_generation(0);
        }
        assert_eq!(slots.generation(0), 0);
    }
}
