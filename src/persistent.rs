//! The long-lived, explicitly-disposed allocator (spec §4.C
//! `PersistentRegistry`): a free-list-backed registry with generation bump
//! on free and deferred disposal while a render graph still owes GPU work.

use crate::handle::{self, Handle, HandleFlags, ResourceKind};
use crate::property::{PersistentSlots, SharedSlots};
use crate::sync::Spinlock;
use crate::wait_index::Access;
use std::collections::VecDeque;
use std::sync::Mutex;

struct Bookkeeping {
    free_indices: VecDeque<u32>,
    next_free_index: u32,
    enqueued_disposals: Vec<Handle>,
}

/// Kind-specific persistent scratch with no generic slot of its own (spec
/// §3.2): a heap's child-resource set, an argument-buffer-array's list of
/// bindings, and so on. Kinds with none use `()`.
pub trait PersistentExtra: Default + Send + 'static {}
impl<T: Default + Send + 'static> PersistentExtra for T {}

pub struct PersistentRegistry<D, X = ()> {
    kind: ResourceKind,
    /// Guards `free_indices`/`next_free_index`/`enqueued_disposals` plus
    /// chunk allocation (spec §5: registry spinlock).
    bookkeeping: Spinlock<Bookkeeping>,
    shared: SharedSlots<D>,
    persistent: PersistentSlots,
    extra: crate::chunk::ChunkedArena<Mutex<X>>,
}

impl<D, X: PersistentExtra> PersistentRegistry<D, X> {
    pub fn new(kind: ResourceKind, max_chunks: usize) -> Self {
        PersistentRegistry {
            kind,
            bookkeeping: Spinlock::new(Bookkeeping {
                free_indices: VecDeque::new(),
                next_free_index: 0,
                enqueued_disposals: Vec::new(),
            }),
            shared: SharedSlots::new(max_chunks),
            persistent: PersistentSlots::new(max_chunks),
            extra: crate::chunk::ChunkedArena::new(max_chunks),
        }
    }

    /// Pops a freed index or bumps the next-free pointer, reserving a new
    /// chunk if this index begins one, then packs a handle with that
    /// slot's current generation. `flags` is OR'd with `PERSISTENT`: spec
    /// §6's `historyBuffer`/`windowHandle`/`externalOwnership` bits all
    /// apply to persistent resources and are the caller's to set.
    pub fn allocate_handle(&self, flags: HandleFlags) -> (Handle, usize) {
        let index = {
            let mut state = self.bookkeeping.lock();
            match state.free_indices.pop_front() {
                Some(index) => index,
                None => {
                    let index = state.next_free_index;
                    state.next_free_index += 1;
                    index
                }
            }
        };
        self.shared.reserve(index as usize);
        self.persistent.reserve(index as usize);
        self.extra.reserve(index as usize);
        let generation = self.persistent.generation(index as usize);
        let handle = handle::pack(self.kind, flags | HandleFlags::PERSISTENT, generation, 0, index);
        (handle, index as usize)
    }

    /// Populates shared + persistent property slots. Heap membership
    /// (inserting into the heap's `child_resources`) is the caller's
    /// responsibility; it requires looking up a different registry, which
    /// this generic type has no way to name.
    pub fn initialize(&self, index: usize, label: Option<String>, descriptor: D, heap: Handle, extra: X) {
        self.shared.initialize(index, label, descriptor);
        self.persistent.initialize(index, heap);
        *self.extra.at(index).lock().unwrap() = extra;
    }

    pub fn shared(&self) -> &SharedSlots<D> {
        &self.shared
    }

    pub fn persistent(&self) -> &PersistentSlots {
        &self.persistent
    }

    pub fn extra(&self, index: usize) -> std::sync::MutexGuard<'_, X> {
        self.extra.at(index).lock().unwrap()
    }

    pub fn is_valid(&self, h: Handle) -> bool {
        handle::kind(h) == Some(self.kind) && handle::generation(h) == self.persistent.generation(handle::index(h) as usize)
    }

    /// Spec §4.C `dispose`: defers to `enqueued_disposals` if the resource
    /// has pending render-graph work, otherwise disposes immediately.
    /// `dispose_backend` is the kind-specific backend hook (spec §4.G); it
    /// runs with the registry spinlock held, the one exception spec §5
    /// allows ("must not be held across backend calls other than
    /// `dispose_backend`"). A no-op on an already-invalid handle (spec §8
    /// idempotence list).
    pub fn dispose(&self, h: Handle, dispose_backend: impl FnOnce(usize)) {
        if !self.is_valid(h) {
            return;
        }
        let index = handle::index(h) as usize;
        let mut state = self.bookkeeping.lock();
        if self.persistent.has_pending_render_graph(index) {
            state.enqueued_disposals.push(h);
            return;
        }
        self.dispose_immediately_locked(&mut state, index, dispose_backend);
    }

    fn dispose_immediately_locked(&self, state: &mut Bookkeeping, index: usize, dispose_backend: impl FnOnce(usize)) {
        dispose_backend(index);
        self.shared.deinitialize(index);
        self.persistent.deinitialize(index);
        self.persistent.bump_generation(index);
        state.free_indices.push_back(index as u32);
        log::debug!("persistent registry for {:?}: disposed slot {index}", self.kind);
    }

    /// `clear_after_render_graph(q)`: clears queue `q`'s bit out of every
    /// allocated slot's `active_render_graphs`, resets shared `usages` (a
    /// render-graph-scoped log), then drains `enqueued_disposals`.
    pub fn clear_after_render_graph(&self, queue: u8, mut dispose_backend: impl FnMut(usize)) {
        let slot_count = self.bookkeeping.lock().next_free_index;
        for index in 0..slot_count {
            self.persistent.clear_render_graph_bit(index as usize, queue);
            self.shared.clear_usages(index as usize);
        }
        self.process_enqueued_disposals(&mut dispose_backend);
    }

    /// Walks `enqueued_disposals`; any entry that no longer has a pending
    /// render graph is disposed immediately and removed. Order is not
    /// preserved (spec §4.C).
    pub fn process_enqueued_disposals(&self, dispose_backend: &mut impl FnMut(usize)) {
        let mut state = self.bookkeeping.lock();
        let pending = std::mem::take(&mut state.enqueued_disposals);
        let mut still_pending = Vec::with_capacity(pending.len());
        for h in pending {
            let index = handle::index(h) as usize;
            if self.persistent.has_pending_render_graph(index) {
                still_pending.push(h);
            } else {
                self.dispose_immediately_locked(&mut state, index, |idx| dispose_backend(idx));
            }
        }
        state.enqueued_disposals = still_pending;
    }

    pub fn enqueued_disposal_count(&self) -> usize {
        self.bookkeeping.lock().enqueued_disposals.len()
    }

    pub fn free_index_count(&self) -> usize {
        self.bookkeeping.lock().free_indices.len()
    }

    /// `is_available_for_cpu` lifted to a whole-resource check, folding in
    /// the "non-persistent resources are always available" rule at the
    /// call site (spec §4.D); persistent resources always go through this.
    pub fn is_available_for_cpu(&self, h: Handle, queues: &[&dyn crate::queue::Queue], access: Access) -> bool {
        let index = handle::index(h) as usize;
        self.persistent.wait_index(index).is_available_for_cpu(queues, access)
    }

    pub async fn wait_for_cpu_access(&self, h: Handle, queues: &[&dyn crate::queue::Queue], access: Access) {
        let index = handle::index(h) as usize;
        let initialised = self.persistent.state_flags(index).initialised;
        self.persistent.wait_index(index).wait_for_cpu_access(queues, access, initialised).await;
    }

    /// `is_known_in_use`: true if any `active_render_graphs` bit is set, or
    /// any wait index exceeds its queue's last-completed command.
    pub fn is_known_in_use(&self, h: Handle, queues: &[&dyn crate::queue::Queue]) -> bool {
        let index = handle::index(h) as usize;
        self.persistent.active_render_graphs(index) != 0 || self.persistent.wait_index(index).has_outstanding_work(queues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::test_support::TestQueue;

    fn registry() -> PersistentRegistry<u32, ()> {
        PersistentRegistry::new(ResourceKind::Texture, 4)
    }

    /// Scenario S2: persistent dispose-while-in-use deferral.
    #[test]
    fn dispose_while_in_use_is_deferred() {
        let registry = registry();
        let (h, index) = registry.allocate_handle(HandleFlags::empty());
        registry.initialize(index, None, 99, Handle::NONE, ());
        registry.persistent().mark_used(index, 1 << 3);

        registry.dispose(h, |_| {});
        assert!(registry.is_valid(h), "disposal must be deferred while queue 3 owns work");
        assert_eq!(registry.enqueued_disposal_count(), 1);

        registry.clear_after_render_graph(3, |_| {});
        assert!(!registry.is_valid(h));
        assert_eq!(registry.enqueued_disposal_count(), 0);
        assert_eq!(registry.free_index_count(), 1);

        let (h2, _) = registry.allocate_handle(HandleFlags::empty());
        assert_eq!(handle::index(h2), handle::index(h), "slot index is recycled");
        assert_ne!(h2, h);
    }

    #[test]
    fn dispose_of_invalid_handle_is_a_noop() {
        let registry = registry();
        let (h, index) = registry.allocate_handle(HandleFlags::empty());
        registry.initialize(index, None, 1, Handle::NONE, ());
        registry.dispose(h, |_| {});
        // second dispose targets an already-invalid handle.
        registry.dispose(h, |_| panic!("backend hook must not run twice"));
    }

    #[test]
    fn dispose_immediate_recycles_generation() {
        let registry = registry();
        let (h1, index1) = registry.allocate_handle(HandleFlags::empty());
        registry.initialize(index1, None, 1, Handle::NONE, ());
        registry.dispose(h1, |_| {});
        assert!(!registry.is_valid(h1));

        let (h2, index2) = registry.allocate_handle(HandleFlags::empty());
        assert_eq!(index1, index2);
        assert_ne!(handle::generation(h1), handle::generation(h2));
    }

    #[test]
    fn is_available_for_cpu_consults_wait_indices() {
        let registry = registry();
        let (h, index) = registry.allocate_handle(HandleFlags::empty());
        registry.initialize(index, None, 1, Handle::NONE, ());
        registry.persistent().set_initialised(index, true);
        registry.persistent().wait_index(index).set_wait(0, Access::Write, 5);

        let q0 = TestQueue::new(0);
        let queues: [&dyn crate::queue::Queue; 1] = [&q0];
        assert!(!registry.is_available_for_cpu(h, &queues, Access::Write));
        q0.complete(5);
        assert!(registry.is_available_for_cpu(h, &queues, Access::Write));
    }
}
