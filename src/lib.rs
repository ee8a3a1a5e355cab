//! Resource registry and lifetime-tracking core for a low-level GPU
//! rendering runtime.
//!
//! Nine resource kinds (buffers, textures, heaps, argument buffers,
//! argument-buffer arrays, visible/intersection function tables,
//! acceleration structures, hazard-tracking groups) are named by a packed
//! 64-bit [`handle::Handle`] and tracked through one of two lifetime
//! disciplines: a long-lived [`persistent::PersistentRegistry`] with
//! explicit disposal, or a per-render-graph [`transient`] allocator that's
//! bulk-reset every frame. [`registries::RegistryHub`] wires all nine
//! together and is the crate's main entry point; [`resource::Resource`] is
//! the type-erased handle callers pass around once a resource exists.
//!
//! This crate owns bookkeeping only; it has no GPU backend of its own.
//! Callers provide one by implementing [`registries::ResourceBackend`] and
//! [`queue::Queue`].

pub mod argument_buffer;
pub mod chunk;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod hazard;
pub mod limits;
pub mod manager;
pub mod persistent;
pub mod property;
pub mod queue;
pub mod registries;
pub mod resource;
pub mod sync;
pub mod transient;
pub mod wait_index;

pub use descriptor::{
    AccelerationStructureDescriptor, ArgumentAccess, ArgumentBufferArrayDescriptor, ArgumentBufferDescriptor,
    ArgumentDescriptor, ArgumentKind, BufferDescriptor, CacheMode, FunctionDescriptor, HazardTrackingGroupDescriptor,
    HazardTrackingMemberKind, HeapDescriptor, HeapType, IntersectionFunctionTableDescriptor, MipRange, PixelFormat,
    PurgeableState, SliceRange, StorageMode, TextureDescriptor, TextureType, TextureViewDescriptor, TextureViewType,
    UsageHint, VisibleFunctionTableDescriptor,
};
pub use error::RegistryError;
pub use handle::{Handle, HandleFlags, ResourceKind};
pub use queue::Queue;
pub use registries::{RegistryHub, ResourceBackend, TransientArena};
pub use resource::{
    AccelerationStructure, ArgumentBuffer, ArgumentBufferArray, Buffer, Heap, HazardTrackingGroup,
    IntersectionFunctionTable, Resource, Texture, TypedResource, VisibleFunctionTable,
};
pub use wait_index::Access;
