//! Wires the nine per-kind registries together (spec §4.G "External
//! Interfaces") and provides the handle-kind dispatch the [`crate::resource`]
//! facade needs for label/usage/wait-index/dispose operations.

use crate::descriptor::{
    AccelerationStructureDescriptor, ArgumentBufferArrayDescriptor, ArgumentBufferDescriptor, BufferDescriptor,
    HazardTrackingGroupDescriptor, HeapDescriptor, IntersectionFunctionTableDescriptor, PurgeableState,
    TextureDescriptor, TextureViewDescriptor, VisibleFunctionTableDescriptor,
};
use crate::handle::{self, Handle, HandleFlags, ResourceKind};
use crate::hazard::HazardTrackingGroupRegistry;
use crate::limits::{MAX_CHUNKS_ARGUMENT_BUFFERS, MAX_CHUNKS_LARGE, TRANSIENT_FIXED_CAPACITY};
use crate::persistent::PersistentRegistry;
use crate::property::Usage;
use crate::resource::{Resource, TypedResource};
use crate::transient::{TransientChunkRegistry, TransientFixedSizeRegistry};
use crate::wait_index::Access;
use std::collections::HashSet;
use std::sync::Mutex;

/// A heap's child-resource set (spec §3.2: "Owns a `Set<Resource>` of child
/// resources").
#[derive(Default)]
pub struct HeapExtra {
    child_resources: Mutex<HashSet<Handle>>,
}

/// An argument-buffer-array's ordered, individually-disposable bindings
/// (spec §3.2 `ArgumentBufferArray`).
#[derive(Default)]
pub struct ArgumentBufferArrayExtra {
    bindings: Mutex<Vec<Option<Handle>>>,
}

/// A transient texture view's base resource and view descriptor (spec §3.3
/// "Transient-only: view base-resource + view descriptor").
pub struct TextureViewExtra {
    pub base_resource: Handle,
    pub view_descriptor: Option<TextureViewDescriptor>,
}

impl Default for TextureViewExtra {
    fn default() -> Self {
        TextureViewExtra { base_resource: Handle::NONE, view_descriptor: None }
    }
}

/// Backend hooks a driver provides to the registry core (spec §4.G).
/// `dispose_backend` has no return value since the registry's own state is
/// already committed by the time it runs.
pub trait ResourceBackend {
    fn materialise_persistent(&self, resource: Resource) -> bool;
    fn dispose_backend(&self, resource: Resource);
}

/// One render-graph's worth of transient storage, bundled with the arena
/// slot index `TransientRegistryManager` handed out for it. Owned by the
/// render-graph scheduler (an external collaborator); the scheduler calls
/// [`TransientArena::clear`] then returns it to
/// [`RegistryHub::free_transient_arena`] once the graph retires.
pub struct TransientArena {
    pub index: u8,
    pub buffers: TransientFixedSizeRegistry<BufferDescriptor, ()>,
    pub textures: TransientFixedSizeRegistry<TextureDescriptor, ()>,
    pub texture_views: TransientChunkRegistry<TextureViewDescriptor, TextureViewExtra>,
    pub argument_buffers: TransientChunkRegistry<ArgumentBufferDescriptor, ()>,
}

impl TransientArena {
    fn new(index: u8) -> Self {
        TransientArena {
            index,
            buffers: TransientFixedSizeRegistry::new(ResourceKind::Buffer, index, TRANSIENT_FIXED_CAPACITY),
            textures: TransientFixedSizeRegistry::new(ResourceKind::Texture, index, TRANSIENT_FIXED_CAPACITY),
            texture_views: TransientChunkRegistry::new_with_view_flag(
                ResourceKind::Texture,
                index,
                MAX_CHUNKS_ARGUMENT_BUFFERS,
                true,
            ),
            argument_buffers: TransientChunkRegistry::new(ResourceKind::ArgumentBuffer, index, MAX_CHUNKS_ARGUMENT_BUFFERS),
        }
    }

    /// Bulk-resets every transient registry in this arena and bumps each
    /// one's generation (spec §8 scenario S1).
    pub fn clear(&self) {
        self.buffers.clear();
        self.textures.clear();
        self.texture_views.clear();
        self.argument_buffers.clear();
    }
}

/// All nine persistent registries plus the transient-arena allocator (spec
/// §2's component table, assembled).
pub struct RegistryHub {
    pub buffers: PersistentRegistry<BufferDescriptor, ()>,
    pub textures: PersistentRegistry<TextureDescriptor, ()>,
    pub heaps: PersistentRegistry<HeapDescriptor, HeapExtra>,
    pub argument_buffers: PersistentRegistry<ArgumentBufferDescriptor, ()>,
    pub argument_buffer_arrays: PersistentRegistry<ArgumentBufferArrayDescriptor, ArgumentBufferArrayExtra>,
    pub acceleration_structures: PersistentRegistry<AccelerationStructureDescriptor, ()>,
    pub visible_function_tables: PersistentRegistry<VisibleFunctionTableDescriptor, ()>,
    pub intersection_function_tables: PersistentRegistry<IntersectionFunctionTableDescriptor, ()>,
    pub hazard_groups: HazardTrackingGroupRegistry,
    transient_manager: crate::manager::TransientRegistryManager,
}

impl Default for RegistryHub {
    fn default() -> Self {
        RegistryHub {
            buffers: PersistentRegistry::new(ResourceKind::Buffer, MAX_CHUNKS_LARGE),
            textures: PersistentRegistry::new(ResourceKind::Texture, MAX_CHUNKS_LARGE),
            heaps: PersistentRegistry::new(ResourceKind::Heap, MAX_CHUNKS_LARGE),
            argument_buffers: PersistentRegistry::new(ResourceKind::ArgumentBuffer, MAX_CHUNKS_LARGE),
            argument_buffer_arrays: PersistentRegistry::new(ResourceKind::ArgumentBufferArray, MAX_CHUNKS_LARGE),
            acceleration_structures: PersistentRegistry::new(ResourceKind::AccelerationStructure, MAX_CHUNKS_LARGE),
            visible_function_tables: PersistentRegistry::new(ResourceKind::VisibleFunctionTable, MAX_CHUNKS_LARGE),
            intersection_function_tables: PersistentRegistry::new(ResourceKind::IntersectionFunctionTable, MAX_CHUNKS_LARGE),
            hazard_groups: PersistentRegistry::new(ResourceKind::HazardTrackingGroup, MAX_CHUNKS_LARGE),
            transient_manager: crate::manager::TransientRegistryManager::new(),
        }
    }
}

impl RegistryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh transient arena (spec §4.C `TransientRegistryManager`).
    pub fn new_transient_arena(&self) -> TransientArena {
        TransientArena::new(self.transient_manager.allocate())
    }

    pub fn free_transient_arena(&self, arena: TransientArena) {
        self.transient_manager.free(arena.index);
    }

    pub fn live_transient_arena_count(&self) -> u32 {
        self.transient_manager.live_count()
    }

    // -- persistent resource factories --------------------------------

    pub fn create_buffer(&self, label: Option<String>, descriptor: BufferDescriptor, heap: Handle, flags: HandleFlags) -> crate::resource::Buffer {
        let (h, idx) = self.buffers.allocate_handle(flags);
        self.buffers.initialize(idx, label, descriptor, heap, ());
        self.adopt_into_heap(heap, h);
        crate::resource::Buffer::from_handle_unchecked(h)
    }

    pub fn create_texture(&self, label: Option<String>, descriptor: TextureDescriptor, heap: Handle, flags: HandleFlags) -> crate::resource::Texture {
        descriptor.check_dimensions().expect("texture descriptor dimensions out of range");
        let (h, idx) = self.textures.allocate_handle(flags);
        self.textures.initialize(idx, label, descriptor, heap, ());
        self.adopt_into_heap(heap, h);
        crate::resource::Texture::from_handle_unchecked(h)
    }

    pub fn create_heap(&self, label: Option<String>, descriptor: HeapDescriptor) -> crate::resource::Heap {
        let (h, idx) = self.heaps.allocate_handle(HandleFlags::empty());
        self.heaps.initialize(idx, label, descriptor, Handle::NONE, HeapExtra::default());
        crate::resource::Heap::from_handle_unchecked(h)
    }

    pub fn create_argument_buffer(&self, label: Option<String>, mut descriptor: ArgumentBufferDescriptor, heap: Handle) -> crate::resource::ArgumentBuffer {
        descriptor.buffer_length = crate::argument_buffer::layout_sequential(&mut descriptor.arguments);
        assert!(
            crate::argument_buffer::validate_ascending(&descriptor.arguments),
            "argument-buffer slot indices must be strictly ascending"
        );
        let (h, idx) = self.argument_buffers.allocate_handle(HandleFlags::empty());
        self.argument_buffers.initialize(idx, label, descriptor, heap, ());
        self.adopt_into_heap(heap, h);
        crate::resource::ArgumentBuffer::from_handle_unchecked(h)
    }

    pub fn create_argument_buffer_array(&self, label: Option<String>, descriptor: ArgumentBufferArrayDescriptor) -> crate::resource::ArgumentBufferArray {
        let capacity = descriptor.capacity as usize;
        let (h, idx) = self.argument_buffer_arrays.allocate_handle(HandleFlags::empty());
        self.argument_buffer_arrays.initialize(idx, label, descriptor, Handle::NONE, ArgumentBufferArrayExtra::default());
        self.argument_buffer_arrays.extra(idx).bindings.lock().unwrap().resize(capacity, None);
        crate::resource::ArgumentBufferArray::from_handle_unchecked(h)
    }

    /// Binds `binding` at `slot` in `array`; disposing the array disposes
    /// each bound buffer individually (spec §9 open question: bindings are
    /// exclusive to the array that holds them).
    pub fn bind_argument_buffer(&self, array: crate::resource::ArgumentBufferArray, slot: usize, binding: Option<crate::resource::ArgumentBuffer>) {
        let idx = handle::index(array.handle()) as usize;
        self.argument_buffer_arrays.extra(idx).bindings.lock().unwrap()[slot] = binding.map(|b| b.handle());
    }

    pub fn dispose_argument_buffer_array(&self, array: crate::resource::ArgumentBufferArray, backend: &impl ResourceBackend) {
        let idx = handle::index(array.handle()) as usize;
        let bindings = std::mem::take(&mut *self.argument_buffer_arrays.extra(idx).bindings.lock().unwrap());
        for binding in bindings.into_iter().flatten() {
            self.dispose(Resource::from_handle(binding), backend);
        }
        let externally_owned = handle::flags(array.handle()).contains(HandleFlags::EXTERNAL_OWNERSHIP);
        self.argument_buffer_arrays.dispose(array.handle(), |_| {
            if !externally_owned {
                backend.dispose_backend(Resource::from_handle(array.handle()));
            }
        });
    }

    pub fn create_acceleration_structure(&self, label: Option<String>, descriptor: AccelerationStructureDescriptor) -> crate::resource::AccelerationStructure {
        let (h, idx) = self.acceleration_structures.allocate_handle(HandleFlags::empty());
        self.acceleration_structures.initialize(idx, label, descriptor, Handle::NONE, ());
        crate::resource::AccelerationStructure::from_handle_unchecked(h)
    }

    pub fn create_visible_function_table(&self, label: Option<String>, descriptor: VisibleFunctionTableDescriptor) -> crate::resource::VisibleFunctionTable {
        let (h, idx) = self.visible_function_tables.allocate_handle(HandleFlags::empty());
        self.visible_function_tables.initialize(idx, label, descriptor, Handle::NONE, ());
        crate::resource::VisibleFunctionTable::from_handle_unchecked(h)
    }

    pub fn create_intersection_function_table(&self, label: Option<String>, descriptor: IntersectionFunctionTableDescriptor) -> crate::resource::IntersectionFunctionTable {
        let (h, idx) = self.intersection_function_tables.allocate_handle(HandleFlags::empty());
        self.intersection_function_tables.initialize(idx, label, descriptor, Handle::NONE, ());
        crate::resource::IntersectionFunctionTable::from_handle_unchecked(h)
    }

    pub fn create_hazard_tracking_group(&self, label: Option<String>, descriptor: HazardTrackingGroupDescriptor) -> crate::resource::HazardTrackingGroup {
        let (h, idx) = self.hazard_groups.allocate_handle(HandleFlags::empty());
        self.hazard_groups.initialize(idx, label, descriptor, Handle::NONE, crate::hazard::GroupMembership::default());
        crate::resource::HazardTrackingGroup::from_handle_unchecked(h)
    }

    pub fn assign_hazard_group(&self, group: crate::resource::HazardTrackingGroup, member: Resource) {
        match member.kind() {
            Some(ResourceKind::Buffer) => crate::hazard::assign(&self.hazard_groups, group.handle(), &self.buffers, member.handle()),
            Some(ResourceKind::Texture) => crate::hazard::assign(&self.hazard_groups, group.handle(), &self.textures, member.handle()),
            other => panic!("hazard-tracking groups only support buffer/texture members, got {other:?}"),
        }
    }

    /// Registers externally-owned backing memory (spec §4.G
    /// `register_external`): the backend is never asked to free it, so
    /// `dispose_backend` is skipped for it in [`RegistryHub::dispose`].
    pub fn register_external_buffer(&self, label: Option<String>, descriptor: BufferDescriptor, backing_ptr: u64) -> crate::resource::Buffer {
        let (h, idx) = self.buffers.allocate_handle(HandleFlags::EXTERNAL_OWNERSHIP);
        self.buffers.initialize(idx, label, descriptor, Handle::NONE, ());
        self.buffers.shared().set_backing_resource_ptr(idx, backing_ptr);
        crate::resource::Buffer::from_handle_unchecked(h)
    }

    fn adopt_into_heap(&self, heap: Handle, member: Handle) {
        if heap.is_none() {
            return;
        }
        let idx = handle::index(heap) as usize;
        self.heaps.extra(idx).child_resources.lock().unwrap().insert(member);
    }

    // -- texture views (transient-only, spec §3.3) ---------------------

    /// Creates a transient texture view over a persistent buffer (spec §8
    /// scenario S5). Folds `TEXTURE_VIEW`/`PIXEL_FORMAT_VIEW` into the
    /// base buffer's `usage_hint`.
    pub fn create_texture_view_over_buffer(
        &self,
        arena: &TransientArena,
        label: Option<String>,
        base: crate::resource::Buffer,
        view_descriptor: TextureViewDescriptor,
    ) -> crate::resource::Texture {
        self.buffers.shared().with_descriptor_mut(handle::index(base.handle()) as usize, |d| {
            fold_view_usage_hint(&mut d.usage_hint, None);
        });
        self.finish_texture_view(arena, label, base.handle(), view_descriptor)
    }

    /// Creates a transient texture view over a persistent (or transient)
    /// base texture, comparing pixel formats to decide between
    /// `TEXTURE_VIEW` and the stricter `PIXEL_FORMAT_VIEW`.
    pub fn create_texture_view_over_texture(
        &self,
        arena: &TransientArena,
        label: Option<String>,
        base: crate::resource::Texture,
        view_descriptor: TextureViewDescriptor,
    ) -> crate::resource::Texture {
        self.textures.shared().with_descriptor_mut(handle::index(base.handle()) as usize, |d| {
            let differs = d.pixel_format.channel_count != view_descriptor.pixel_format.channel_count
                || d.pixel_format.bytes_per_pixel != view_descriptor.pixel_format.bytes_per_pixel;
            fold_view_usage_hint(&mut d.usage_hint, Some(differs));
        });
        self.finish_texture_view(arena, label, base.handle(), view_descriptor)
    }

    fn finish_texture_view(
        &self,
        arena: &TransientArena,
        label: Option<String>,
        base: Handle,
        view_descriptor: TextureViewDescriptor,
    ) -> crate::resource::Texture {
        let (h, idx) = arena.texture_views.allocate_handle(HandleFlags::RESOURCE_VIEW);
        arena.texture_views.initialize(
            idx,
            label,
            view_descriptor.clone(),
            TextureViewExtra { base_resource: base, view_descriptor: Some(view_descriptor) },
        );
        crate::resource::Texture::from_handle_unchecked(h)
    }

    pub fn view_base_resource(&self, arena: &TransientArena, view: crate::resource::Texture) -> Handle {
        arena.texture_views.extra(handle::index(view.handle()) as usize).base_resource
    }

    // -- usage / hazard-group forwarding (spec §3.3, §4.E) --------------

    fn hazard_tracking_group_of(&self, r: Resource) -> Handle {
        let idx = handle::index(r.handle()) as usize;
        match r.kind() {
            Some(ResourceKind::Buffer) => self.buffers.shared().hazard_tracking_group(idx),
            Some(ResourceKind::Texture) => self.textures.shared().hazard_tracking_group(idx),
            Some(ResourceKind::Heap) => self.heaps.shared().hazard_tracking_group(idx),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.shared().hazard_tracking_group(idx),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.shared().hazard_tracking_group(idx),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.shared().hazard_tracking_group(idx),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.shared().hazard_tracking_group(idx),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.shared().hazard_tracking_group(idx),
            Some(ResourceKind::HazardTrackingGroup) => Handle::NONE,
            None => Handle::NONE,
        }
    }

    /// Resolves where a persistent resource's usage log actually lives:
    /// its hazard-tracking group's slot if assigned, else its own (spec
    /// §3.3, §4.E).
    pub fn usage_target(&self, r: Resource) -> Resource {
        let group = self.hazard_tracking_group_of(r);
        if group.is_none() {
            r
        } else {
            Resource::from_handle(group)
        }
    }

    /// Same resolution for a transient texture view: forwards through its
    /// base resource first (spec §3.3), then through the base's hazard
    /// group if one is assigned.
    pub fn usage_target_for_view(&self, arena: &TransientArena, view: crate::resource::Texture) -> Resource {
        let base = arena.texture_views.extra(handle::index(view.handle()) as usize).base_resource;
        self.usage_target(Resource::from_handle(base))
    }

    pub fn record_usage(&self, r: Resource, render_graph: u8, access: Access) {
        let target = self.usage_target(r);
        let idx = handle::index(target.handle()) as usize;
        let usage = Usage { render_graph, access };
        match target.kind() {
            Some(ResourceKind::Buffer) => self.buffers.shared().record_usage(idx, usage),
            Some(ResourceKind::Texture) => self.textures.shared().record_usage(idx, usage),
            Some(ResourceKind::Heap) => self.heaps.shared().record_usage(idx, usage),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.shared().record_usage(idx, usage),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.shared().record_usage(idx, usage),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.shared().record_usage(idx, usage),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.shared().record_usage(idx, usage),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.shared().record_usage(idx, usage),
            Some(ResourceKind::HazardTrackingGroup) => self.hazard_groups.shared().record_usage(idx, usage),
            None => panic!("resource has no valid kind"),
        }
    }

    pub fn usages(&self, r: Resource) -> Vec<Usage> {
        let target = self.usage_target(r);
        let idx = handle::index(target.handle()) as usize;
        match target.kind() {
            Some(ResourceKind::Buffer) => self.buffers.shared().usages(idx),
            Some(ResourceKind::Texture) => self.textures.shared().usages(idx),
            Some(ResourceKind::Heap) => self.heaps.shared().usages(idx),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.shared().usages(idx),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.shared().usages(idx),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.shared().usages(idx),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.shared().usages(idx),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.shared().usages(idx),
            Some(ResourceKind::HazardTrackingGroup) => self.hazard_groups.shared().usages(idx),
            None => panic!("resource has no valid kind"),
        }
    }

    // -- lifecycle (spec §4.C, §4.G) ------------------------------------

    pub fn label(&self, r: Resource) -> Option<String> {
        let idx = handle::index(r.handle()) as usize;
        match r.kind() {
            Some(ResourceKind::Buffer) => self.buffers.shared().label(idx),
            Some(ResourceKind::Texture) => self.textures.shared().label(idx),
            Some(ResourceKind::Heap) => self.heaps.shared().label(idx),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.shared().label(idx),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.shared().label(idx),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.shared().label(idx),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.shared().label(idx),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.shared().label(idx),
            Some(ResourceKind::HazardTrackingGroup) => self.hazard_groups.shared().label(idx),
            None => panic!("resource has no valid kind"),
        }
    }

    /// Disposes a persistent resource, invoking the backend hook unless it
    /// was externally owned (spec §4.G `register_external`).
    pub fn dispose(&self, r: Resource, backend: &impl ResourceBackend) {
        let idx = handle::index(r.handle()) as usize;
        let externally_owned = handle::flags(r.handle()).contains(HandleFlags::EXTERNAL_OWNERSHIP);
        let dispose_backend = |_: usize| {
            if !externally_owned {
                backend.dispose_backend(r);
            }
        };
        match r.kind() {
            Some(ResourceKind::Buffer) => self.buffers.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::Texture) => self.textures.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::Heap) => self.heaps.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.dispose(r.handle(), dispose_backend),
            Some(ResourceKind::HazardTrackingGroup) => self.hazard_groups.dispose(r.handle(), dispose_backend),
            None => {
                let _ = idx;
            }
        }
    }

    /// Backend-driven materialisation (spec §4.G): disposes the
    /// just-allocated resource and returns `false` on backend failure.
    pub fn materialise_persistent(&self, r: Resource, backend: &impl ResourceBackend) -> bool {
        if backend.materialise_persistent(r) {
            true
        } else {
            log::error!("materialise_persistent failed for {r:?}, disposing");
            self.dispose(r, backend);
            false
        }
    }

    /// Delegates to the backend and updates `initialised` on destructive
    /// transitions (spec §4.G `update_purgeable_state`).
    pub fn update_purgeable_state(&self, r: Resource, to: PurgeableState) -> PurgeableState {
        let idx = handle::index(r.handle()) as usize;
        match r.kind() {
            Some(ResourceKind::Buffer) => self.buffers.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::Texture) => self.textures.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::Heap) => self.heaps.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.persistent().set_purgeable_state(idx, to),
            Some(ResourceKind::HazardTrackingGroup) => self.hazard_groups.persistent().set_purgeable_state(idx, to),
            None => panic!("resource has no valid kind"),
        }
    }

    /// ORs `graph_mask` into a persistent resource's `active_render_graphs`,
    /// recursing into its owning heap (spec §4.D `mark_as_used`).
    pub fn mark_used(&self, h: Handle, graph_mask: u8) {
        let idx = handle::index(h) as usize;
        let heap = match handle::kind(h) {
            Some(ResourceKind::Buffer) => {
                self.buffers.persistent().mark_used(idx, graph_mask);
                self.buffers.persistent().heap(idx)
            }
            Some(ResourceKind::Texture) => {
                self.textures.persistent().mark_used(idx, graph_mask);
                self.textures.persistent().heap(idx)
            }
            Some(ResourceKind::Heap) => {
                self.heaps.persistent().mark_used(idx, graph_mask);
                Handle::NONE
            }
            Some(ResourceKind::ArgumentBuffer) => {
                self.argument_buffers.persistent().mark_used(idx, graph_mask);
                self.argument_buffers.persistent().heap(idx)
            }
            Some(ResourceKind::ArgumentBufferArray) => {
                self.argument_buffer_arrays.persistent().mark_used(idx, graph_mask);
                Handle::NONE
            }
            Some(ResourceKind::AccelerationStructure) => {
                self.acceleration_structures.persistent().mark_used(idx, graph_mask);
                Handle::NONE
            }
            Some(ResourceKind::VisibleFunctionTable) => {
                self.visible_function_tables.persistent().mark_used(idx, graph_mask);
                Handle::NONE
            }
            Some(ResourceKind::IntersectionFunctionTable) => {
                self.intersection_function_tables.persistent().mark_used(idx, graph_mask);
                Handle::NONE
            }
            Some(ResourceKind::HazardTrackingGroup) => {
                self.hazard_groups.persistent().mark_used(idx, graph_mask);
                Handle::NONE
            }
            None => Handle::NONE,
        };
        if !heap.is_none() {
            self.mark_used(heap, graph_mask);
        }
    }

    /// Marking a transient view as used marks its base resource instead:
    /// views carry no `active_render_graphs` bit of their own.
    pub fn mark_view_used(&self, arena: &TransientArena, view: crate::resource::Texture, graph_mask: u8) {
        let base = arena.texture_views.extra(handle::index(view.handle()) as usize).base_resource;
        self.mark_used(base, graph_mask);
    }

    pub fn is_available_for_cpu(&self, r: Resource, queues: &[&dyn crate::queue::Queue], access: Access) -> bool {
        let idx = handle::index(r.handle()) as usize;
        match r.kind() {
            Some(ResourceKind::Buffer) => self.buffers.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::Texture) => self.textures.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::Heap) => self.heaps.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::ArgumentBuffer) => self.argument_buffers.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::ArgumentBufferArray) => self.argument_buffer_arrays.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::AccelerationStructure) => self.acceleration_structures.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::VisibleFunctionTable) => self.visible_function_tables.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::IntersectionFunctionTable) => self.intersection_function_tables.is_available_for_cpu(r.handle(), queues, access),
            Some(ResourceKind::HazardTrackingGroup) => self.hazard_groups.is_available_for_cpu(r.handle(), queues, access),
            None => {
                let _ = idx;
                true
            }
        }
    }

    /// Runs queue `q`'s render-graph retirement across every persistent
    /// registry (spec §4.C `clear_after_render_graph`).
    pub fn clear_after_render_graph(&self, queue: u8, backend: &impl ResourceBackend) {
        self.buffers.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::Buffer,
                HandleFlags::PERSISTENT,
                self.buffers.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.textures.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::Texture,
                HandleFlags::PERSISTENT,
                self.textures.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.heaps.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::Heap,
                HandleFlags::PERSISTENT,
                self.heaps.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.argument_buffers.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::ArgumentBuffer,
                HandleFlags::PERSISTENT,
                self.argument_buffers.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.argument_buffer_arrays.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::ArgumentBufferArray,
                HandleFlags::PERSISTENT,
                self.argument_buffer_arrays.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.acceleration_structures.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::AccelerationStructure,
                HandleFlags::PERSISTENT,
                self.acceleration_structures.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.visible_function_tables.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::VisibleFunctionTable,
                HandleFlags::PERSISTENT,
                self.visible_function_tables.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.intersection_function_tables.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::IntersectionFunctionTable,
                HandleFlags::PERSISTENT,
                self.intersection_function_tables.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
        self.hazard_groups.clear_after_render_graph(queue, |idx| {
            backend.dispose_backend(Resource::from_handle(handle::pack(
                ResourceKind::HazardTrackingGroup,
                HandleFlags::PERSISTENT,
                self.hazard_groups.persistent().generation(idx),
                0,
                idx as u32,
            )))
        });
    }
}

fn fold_view_usage_hint(usage_hint: &mut crate::descriptor::UsageHint, pixel_format_differs: Option<bool>) {
    use crate::descriptor::UsageHint;
    usage_hint.insert(UsageHint::TEXTURE_VIEW);
    if pixel_format_differs.unwrap_or(false) {
        usage_hint.insert(UsageHint::PIXEL_FORMAT_VIEW);
    }
}
