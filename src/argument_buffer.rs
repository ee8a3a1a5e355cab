//! Argument-buffer offset/index layout (spec §3.2, §8 scenario S6).
//!
//! Each argument occupies one or more "slots" of a kind-specific stride,
//! aligned to that stride. Inline data occupies `size` bytes rounded up to
//! a 4-byte word; buffer references occupy one 256-byte encoded slot
//! (Metal's tier-2 argument-buffer granularity for constant-buffer
//! pointers); textures and samplers occupy one 8-byte GPU resource-ID slot.
//! An argument with `array_length > 1` consumes that many contiguous slots
//! and that many contiguous indices.

use crate::descriptor::{ArgumentDescriptor, ArgumentKind};

const INLINE_DATA_ALIGN: u64 = 4;
const BUFFER_SLOT_SIZE: u64 = 256;
const RESOURCE_ID_SLOT_SIZE: u64 = 8;

fn align_stride(kind: ArgumentKind) -> (u64, u64) {
    match kind {
        ArgumentKind::InlineData { size } => {
            let stride = align_up(size as u64, INLINE_DATA_ALIGN);
            (INLINE_DATA_ALIGN, stride)
        }
        ArgumentKind::Buffer => (BUFFER_SLOT_SIZE, BUFFER_SLOT_SIZE),
        ArgumentKind::Texture | ArgumentKind::Sampler => (RESOURCE_ID_SLOT_SIZE, RESOURCE_ID_SLOT_SIZE),
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) / align * align
}

/// Lays out `arguments` in order, assigning ascending `slot_index` values
/// and computing each `encoded_offset`/`encoded_stride`. Returns the total
/// `buffer_length` (spec §3.2: "computed buffer_length").
pub fn layout_sequential(arguments: &mut [ArgumentDescriptor]) -> u64 {
    let mut offset = 0u64;
    let mut next_index = 0u32;
    for arg in arguments.iter_mut() {
        let (align, stride) = align_stride(arg.kind);
        offset = align_up(offset, align);
        let count = arg.array_length.max(1);
        arg.slot_index = next_index;
        arg.encoded_offset = offset;
        arg.encoded_stride = stride;
        next_index += count;
        offset += stride * count as u64;
    }
    offset
}

/// Checks the "indices must be strictly ascending" invariant (spec §3.2)
/// for a descriptor whose `slot_index` values were assigned by the caller
/// rather than by [`layout_sequential`].
pub fn validate_ascending(arguments: &[ArgumentDescriptor]) -> bool {
    arguments.windows(2).all(|pair| pair[0].slot_index < pair[1].slot_index)
}
