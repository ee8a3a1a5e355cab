//! End-to-end scenarios from spec.md §8, driven through `RegistryHub` the
//! way a real caller would rather than against individual registries.

use blade_registry::descriptor::{
    ArgumentAccess, ArgumentBufferDescriptor, ArgumentDescriptor, ArgumentKind, BufferDescriptor, CacheMode,
    HazardTrackingGroupDescriptor, HazardTrackingMemberKind, MipRange, PixelFormat, SliceRange, StorageMode,
    TextureDescriptor, TextureType, TextureViewDescriptor, TextureViewType, UsageHint,
};
use blade_registry::{Access, Handle, HandleFlags, RegistryHub, Resource, ResourceBackend, TypedResource};

struct NullBackend;

impl ResourceBackend for NullBackend {
    fn materialise_persistent(&self, _resource: Resource) -> bool {
        true
    }
    fn dispose_backend(&self, _resource: Resource) {}
}

fn buffer_descriptor(length: u64) -> BufferDescriptor {
    BufferDescriptor { length, storage_mode: StorageMode::Shared, cache_mode: CacheMode::DefaultCache, usage_hint: UsageHint::empty() }
}

fn texture_descriptor() -> TextureDescriptor {
    TextureDescriptor {
        ty: TextureType::D2,
        pixel_format: PixelFormat { id: 0, channel_count: 4, bytes_per_pixel: 4 },
        width: 256,
        height: 256,
        depth: 1,
        mip_levels: 1,
        array_length: 1,
        sample_count: 1,
        storage_mode: StorageMode::Private,
        usage_hint: UsageHint::empty(),
    }
}

/// S1: transient allocate and invalidate.
#[test]
fn transient_allocate_and_invalidate() {
    let hub = RegistryHub::new();
    let arena = hub.new_transient_arena();

    let (h1, idx1) = arena.buffers.allocate_handle(HandleFlags::empty());
    arena.buffers.initialize(idx1, None, buffer_descriptor(1024), ());
    assert!(arena.buffers.is_valid(h1));

    arena.clear();
    assert!(!arena.buffers.is_valid(h1));

    let (h2, idx2) = arena.buffers.allocate_handle(HandleFlags::empty());
    arena.buffers.initialize(idx2, None, buffer_descriptor(1024), ());
    assert_ne!(h1, h2);
    assert!(arena.buffers.is_valid(h2));

    hub.free_transient_arena(arena);
}

/// S2: persistent dispose-while-in-use deferral.
#[test]
fn persistent_dispose_while_in_use_deferral() {
    let hub = RegistryHub::new();
    let backend = NullBackend;

    let texture = hub.create_texture(None, texture_descriptor(), Handle::NONE, HandleFlags::empty());
    hub.mark_used(texture.handle(), 1 << 3);

    hub.dispose(Resource::from(texture), &backend);
    assert!(hub.textures.is_valid(texture.handle()), "dispose must be deferred while queue 3 still owns work");

    hub.clear_after_render_graph(3, &backend);
    assert!(!hub.textures.is_valid(texture.handle()));

    let next = hub.create_texture(None, texture_descriptor(), Handle::NONE, HandleFlags::empty());
    assert_eq!(
        blade_registry::handle::index(next.handle()),
        blade_registry::handle::index(texture.handle()),
        "the freed slot must be recycled"
    );
}

/// S3: wait-index ordering under concurrent writers.
#[test]
fn wait_index_ordering_under_concurrency() {
    let hub = RegistryHub::new();
    let buffer = hub.create_buffer(None, buffer_descriptor(1024), Handle::NONE, HandleFlags::empty());
    let idx = blade_registry::handle::index(buffer.handle()) as usize;

    std::thread::scope(|scope| {
        scope.spawn(|| hub.buffers.persistent().wait_index(idx).set_wait(1, Access::Write, 5));
        scope.spawn(|| hub.buffers.persistent().wait_index(idx).set_wait(1, Access::Write, 3));
    });

    assert_eq!(hub.buffers.persistent().wait_index(idx).get_wait(1, Access::Write), 5);
}

/// S4: hazard-group sharing across two persistent textures.
#[test]
fn hazard_group_sharing() {
    let hub = RegistryHub::new();
    let a = hub.create_texture(None, texture_descriptor(), Handle::NONE, HandleFlags::empty());
    let b = hub.create_texture(None, texture_descriptor(), Handle::NONE, HandleFlags::empty());
    let group = hub.create_hazard_tracking_group(None, HazardTrackingGroupDescriptor { member_kind: HazardTrackingMemberKind::Texture });

    hub.assign_hazard_group(group, Resource::from(a));
    hub.assign_hazard_group(group, Resource::from(b));

    hub.record_usage(Resource::from(a), 0, Access::Read);

    assert_eq!(hub.usages(Resource::from(a)).len(), 1, "usage must be visible through A's own forwarding");
    assert_eq!(hub.usages(Resource::from(b)).len(), 1, "usage must be visible through B's forwarding too");
    assert_eq!(
        blade_registry::hazard::members(&hub.hazard_groups, group.handle()),
        vec![a.handle(), b.handle()]
    );
}

/// S5: a transient texture view's base-resource/usage-hint indirection.
#[test]
fn view_indirection() {
    let hub = RegistryHub::new();
    let base = hub.create_buffer(None, buffer_descriptor(4096), Handle::NONE, HandleFlags::empty());
    let arena = hub.new_transient_arena();

    let view_descriptor = TextureViewDescriptor {
        pixel_format: PixelFormat { id: 1, channel_count: 4, bytes_per_pixel: 4 },
        view_type: TextureViewType::D2,
        mip_range: MipRange { base: 0, count: 1 },
        slice_range: SliceRange { base: 0, count: 1 },
    };
    let view = hub.create_texture_view_over_buffer(&arena, None, base, view_descriptor);

    assert_eq!(hub.view_base_resource(&arena, view), base.handle());
    assert_eq!(hub.usage_target_for_view(&arena, view), Resource::from(base));
    hub.buffers.shared().with_descriptor(blade_registry::handle::index(base.handle()) as usize, |d| {
        assert!(d.usage_hint.contains(UsageHint::TEXTURE_VIEW));
    });

    hub.free_transient_arena(arena);
}

/// S6: argument-buffer offset computation, the spec's worked example.
#[test]
fn argument_buffer_offset_computation() {
    let hub = RegistryHub::new();
    let descriptor = ArgumentBufferDescriptor {
        arguments: vec![
            ArgumentDescriptor {
                kind: ArgumentKind::InlineData { size: 4 },
                slot_index: 0,
                array_length: 1,
                access: ArgumentAccess::Read,
                encoded_offset: 0,
                encoded_stride: 0,
            },
            ArgumentDescriptor {
                kind: ArgumentKind::Buffer,
                slot_index: 0,
                array_length: 1,
                access: ArgumentAccess::Read,
                encoded_offset: 0,
                encoded_stride: 0,
            },
            ArgumentDescriptor {
                kind: ArgumentKind::Texture,
                slot_index: 0,
                array_length: 8,
                access: ArgumentAccess::Read,
                encoded_offset: 0,
                encoded_stride: 0,
            },
        ],
        storage_mode: StorageMode::Private,
        buffer_length: 0,
    };

    let buffer = hub.create_argument_buffer(None, descriptor, Handle::NONE);
    let idx = blade_registry::handle::index(buffer.handle()) as usize;
    hub.argument_buffers.shared().with_descriptor(idx, |d| {
        assert_eq!(d.arguments[0].slot_index, 0);
        assert_eq!(d.arguments[0].encoded_offset, 0);

        assert_eq!(d.arguments[1].slot_index, 1);
        assert_eq!(d.arguments[1].encoded_offset, 256);

        assert_eq!(d.arguments[2].slot_index, 2);
        assert_eq!(d.arguments[2].encoded_offset, 256 + 256);
        assert_eq!(d.arguments[2].encoded_stride, 8);

        assert_eq!(d.buffer_length, 256 + 256 + 8 * 8);
    });
}
