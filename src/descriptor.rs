//! Resource descriptors (spec §3.2). These are the caller-facing "what to
//! create" values; the registry core neither interprets nor validates their
//! GPU-semantic meaning beyond the structural invariants spec.md calls out
//! (texture dimensions, argument-buffer index/offset ordering); pixel
//! format tables and texture/IO conversions are an external collaborator
//! (spec §1).

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageMode {
    Shared,
    Managed,
    Private,
    Memoryless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheMode {
    DefaultCache,
    WriteCombined,
}

bitflags! {
    /// `usage_hint` bits. `TEXTURE_VIEW`/`PIXEL_FORMAT_VIEW` are set by the
    /// registry itself when a view is created over a base resource (spec §8
    /// scenario S5), not supplied by the caller.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct UsageHint: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const PIXEL_FORMAT_VIEW = 1 << 3;
        const TEXTURE_VIEW = 1 << 4;
    }
}

/// Placeholder for the external pixel-format table (spec §1: image
/// codecs/pixel-format tables are out of scope). Only identity and byte
/// layout matter to the registry core (texture-view channel-count /
/// bytes-per-pixel comparison, spec §8 S5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub id: u32,
    pub channel_count: u8,
    pub bytes_per_pixel: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub length: u64,
    pub storage_mode: StorageMode,
    pub cache_mode: CacheMode,
    pub usage_hint: UsageHint,
}

/// Implemented by every descriptor a texture view can alias (spec §8 S5:
/// creating a view folds `TEXTURE_VIEW`/`PIXEL_FORMAT_VIEW` into the base
/// resource's `usage_hint`).
pub trait HasUsageHint {
    fn usage_hint_mut(&mut self) -> &mut UsageHint;
}

impl HasUsageHint for BufferDescriptor {
    fn usage_hint_mut(&mut self) -> &mut UsageHint {
        &mut self.usage_hint
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureType {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub ty: TextureType,
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_length: u32,
    pub sample_count: u32,
    pub storage_mode: StorageMode,
    pub usage_hint: UsageHint,
}

impl HasUsageHint for TextureDescriptor {
    fn usage_hint_mut(&mut self) -> &mut UsageHint {
        &mut self.usage_hint
    }
}

/// Texture dimension bounds (spec §3.2): "Dimensions constrained to `1..=16384`".
#[derive(Debug, PartialEq, Eq)]
pub struct DimensionOutOfRange {
    pub field: &'static str,
    pub value: u32,
}

impl TextureDescriptor {
    /// Validates `width`/`height`/`depth` against spec's `1..=16384` bound.
    /// Invariant violations are programmer error (spec §7), so the registry
    /// calls this and panics; it is a plain `Result` here so callers/tests
    /// can also check it without unwinding.
    pub fn check_dimensions(&self) -> Result<(), DimensionOutOfRange> {
        for (field, value) in [("width", self.width), ("height", self.height), ("depth", self.depth)] {
            if value < 1 || value > crate::limits::MAX_TEXTURE_DIMENSION {
                return Err(DimensionOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureViewType {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MipRange {
    pub base: u32,
    pub count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SliceRange {
    pub base: u32,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureViewDescriptor {
    pub pixel_format: PixelFormat,
    pub view_type: TextureViewType,
    pub mip_range: MipRange,
    pub slice_range: SliceRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeapType {
    Automatic,
    Placement,
    Sparse,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HeapDescriptor {
    pub size: u64,
    pub ty: HeapType,
    pub storage_mode: StorageMode,
    pub cache_mode: CacheMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgumentAccess {
    Read,
    Write,
    ReadWrite,
}

/// Which member of [`crate::handle::ResourceKind`] an argument-buffer slot
/// binds; `InlineData` is not a resource reference at all, just `size`
/// inline bytes encoded directly into the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Buffer,
    Texture,
    Sampler,
    InlineData { size: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArgumentDescriptor {
    pub kind: ArgumentKind,
    pub slot_index: u32,
    pub array_length: u32,
    pub access: ArgumentAccess,
    /// Computed by [`crate::argument_buffer::layout`]; `0` until laid out.
    pub encoded_offset: u64,
    /// Per-argument stride, in bytes; computed alongside `encoded_offset`.
    pub encoded_stride: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArgumentBufferDescriptor {
    pub arguments: Vec<ArgumentDescriptor>,
    pub storage_mode: StorageMode,
    /// Computed total size; see [`crate::argument_buffer::layout`].
    pub buffer_length: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArgumentBufferArrayDescriptor {
    pub capacity: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccelerationStructureDescriptor {
    pub byte_size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionDescriptor {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VisibleFunctionTableDescriptor {
    pub function_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntersectionFunctionTableDescriptor {
    pub functions: Vec<Option<FunctionDescriptor>>,
    pub buffer_count: u32,
}

/// The member kind a hazard-tracking group was created for (spec §3.2,
/// §4.E); all members added to one group must share this kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HazardTrackingMemberKind {
    Buffer,
    Texture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HazardTrackingGroupDescriptor {
    pub member_kind: HazardTrackingMemberKind,
}

/// Purgeable-state values (spec §6): queryable/settable per resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PurgeableState {
    NonDiscardable,
    Discardable,
    Discarded,
}
