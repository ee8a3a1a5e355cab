//! Packed 64-bit resource handles.
//!
//! Bit layout (MSB to LSB): `type:8 | flags:16 | generation:8 | arena:4 | index:28`.
//! See spec §3.1. Packing/unpacking is branchless bitwise work; nothing here
//! is ever serialized across process runs.

use bitflags::bitflags;
use std::fmt;

/// Maximum dense slot index representable inside a handle (2^28).
pub const MAX_INDEX: u32 = 1 << 28;
/// Number of transient arena slots representable inside a handle (2^4, only 8 used).
pub const MAX_ARENA: u8 = 1 << 4;

const TYPE_SHIFT: u32 = 56;
const FLAGS_SHIFT: u32 = 40;
const GENERATION_SHIFT: u32 = 32;
const ARENA_SHIFT: u32 = 28;

const FLAGS_MASK: u64 = 0xFFFF;
const GENERATION_MASK: u64 = 0xFF;
const ARENA_MASK: u64 = 0xF;
const INDEX_MASK: u64 = (1 << 28) - 1;

/// Resource kind, stored in the top 8 bits of a [`Handle`].
///
/// The discriminant is the `type` field from spec §3.1; it uniquely
/// determines which registry a handle must be dispatched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResourceKind {
    Buffer = 0,
    Texture = 1,
    Heap = 2,
    ArgumentBuffer = 3,
    ArgumentBufferArray = 4,
    VisibleFunctionTable = 5,
    IntersectionFunctionTable = 6,
    AccelerationStructure = 7,
    HazardTrackingGroup = 8,
}

impl ResourceKind {
    const ALL: [ResourceKind; 9] = [
        ResourceKind::Buffer,
        ResourceKind::Texture,
        ResourceKind::Heap,
        ResourceKind::ArgumentBuffer,
        ResourceKind::ArgumentBufferArray,
        ResourceKind::VisibleFunctionTable,
        ResourceKind::IntersectionFunctionTable,
        ResourceKind::AccelerationStructure,
        ResourceKind::HazardTrackingGroup,
    ];
}

impl TryFrom<u8> for ResourceKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| *kind as u8 == value)
            .ok_or(value)
    }
}

bitflags! {
    /// The 16-bit `flags` field of a [`Handle`] (spec §3.1).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct HandleFlags: u16 {
        /// Routes allocation to a `PersistentRegistry` instead of a transient arena.
        const PERSISTENT = 1 << 0;
        /// Backed by the window system's swapchain.
        const WINDOW_HANDLE = 1 << 1;
        /// Lives across frames like a persistent resource despite being allocated transiently.
        const HISTORY_BUFFER = 1 << 2;
        /// Backing memory was supplied by the caller; the backend must not free it.
        const EXTERNAL_OWNERSHIP = 1 << 3;
        /// May only be written once; subsequent writes are a programmer error.
        const IMMUTABLE_ONCE_INITIALISED = 1 << 4;
        /// Aliases another resource's storage under a reinterpretation descriptor.
        const RESOURCE_VIEW = 1 << 5;
    }
}

/// A packed, forgery-resistant 64-bit resource identity.
///
/// Two handles with the same `(type, index)` but different `generation`
/// refer to different resource lifetimes; see spec §3.1 and §8 invariant 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// A handle that never decodes to a valid `(type)` and is never produced
    /// by [`pack`]; used as an "absent" sentinel in atomic optional-handle slots.
    pub const NONE: Handle = Handle(u64::MAX);

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_u64(bits: u64) -> Handle {
        Handle(bits)
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("Handle(none)");
        }
        f.debug_struct("Handle")
            .field("type", &((self.0 >> TYPE_SHIFT) as u8))
            .field("flags", &HandleFlags::from_bits_truncate(((self.0 >> FLAGS_SHIFT) & FLAGS_MASK) as u16))
            .field("generation", &((self.0 >> GENERATION_SHIFT) & GENERATION_MASK))
            .field("arena", &((self.0 >> ARENA_SHIFT) & ARENA_MASK))
            .field("index", &(self.0 & INDEX_MASK))
            .finish()
    }
}

/// Packs `(type, flags, generation, arena, index)` into a [`Handle`].
///
/// Panics (debug only) if `index >= 2^28` or `arena >= 16`; spec §4.A:
/// "Rejects (in debug) an index >= 2^28."
#[inline]
pub fn pack(kind: ResourceKind, flags: HandleFlags, generation: u8, arena: u8, index: u32) -> Handle {
    debug_assert!(index < MAX_INDEX, "handle index {index} exceeds 2^28 slots");
    debug_assert!(arena < MAX_ARENA, "handle arena {arena} exceeds 4-bit field");
    let bits = ((kind as u64) << TYPE_SHIFT)
        | (((flags.bits() as u64) & FLAGS_MASK) << FLAGS_SHIFT)
        | (((generation as u64) & GENERATION_MASK) << GENERATION_SHIFT)
        | (((arena as u64) & ARENA_MASK) << ARENA_SHIFT)
        | ((index as u64) & INDEX_MASK);
    Handle(bits)
}

#[inline]
pub fn kind(h: Handle) -> Option<ResourceKind> {
    ResourceKind::try_from((h.0 >> TYPE_SHIFT) as u8).ok()
}

#[inline]
pub fn flags(h: Handle) -> HandleFlags {
    HandleFlags::from_bits_truncate(((h.0 >> FLAGS_SHIFT) & FLAGS_MASK) as u16)
}

#[inline]
pub fn generation(h: Handle) -> u8 {
    ((h.0 >> GENERATION_SHIFT) & GENERATION_MASK) as u8
}

#[inline]
pub fn arena(h: Handle) -> u8 {
    ((h.0 >> ARENA_SHIFT) & ARENA_MASK) as u8
}

#[inline]
pub fn index(h: Handle) -> u32 {
    (h.0 & INDEX_MASK) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let h = pack(ResourceKind::Texture, HandleFlags::PERSISTENT | HandleFlags::RESOURCE_VIEW, 17, 3, 1234);
        assert_eq!(kind(h), Some(ResourceKind::Texture));
        assert_eq!(flags(h), HandleFlags::PERSISTENT | HandleFlags::RESOURCE_VIEW);
        assert_eq!(generation(h), 17);
        assert_eq!(arena(h), 3);
        assert_eq!(index(h), 1234);
    }

    #[test]
    fn pack_is_total_roundtrip_for_all_valid_handles() {
        for k in ResourceKind::ALL {
            let h = pack(k, HandleFlags::empty(), 255, 7, MAX_INDEX - 1);
            let h2 = pack(kind(h).unwrap(), flags(h), generation(h), arena(h), index(h));
            assert_eq!(h, h2);
        }
    }

    #[test]
    fn none_handle_has_no_valid_kind() {
        assert_eq!(kind(Handle::NONE), None);
        assert!(Handle::NONE.is_none());
    }

    #[test]
    #[should_panic(expected = "exceeds 2^28")]
    fn pack_rejects_oversized_index_in_debug() {
        pack(ResourceKind::Buffer, HandleFlags::empty(), 0, 0, MAX_INDEX);
    }
}
