//! Tuning constants (spec §4.C "Registry tuning" and §5 "Transient arena
//! count fixed at 8"). There is no on-disk configuration for this subsystem
//! (spec §6): these are compile-time limits mirrored as `pub const`s the
//! way `blade-graphics/src/webgpu/mod.rs` declares `BIND_GROUP_CACHE_SIZE`
//! and `BYTES_PER_ROW_ALIGNMENT` rather than through a runtime config struct.

/// Items per chunk in a [`crate::chunk::ChunkedArena`]; spec §4.B "typically 256 items".
pub const CHUNK_SIZE: usize = 256;

/// Default max chunks for large persistent registries (buffers, textures, heaps):
/// `2048 * 256 = 512k` slots, matching spec §4.B's worked example.
pub const MAX_CHUNKS_LARGE: usize = 2048;

/// Max chunks for the argument-buffer transient registry (spec §4.C tuning table).
pub const MAX_CHUNKS_ARGUMENT_BUFFERS: usize = 256;

/// Up to 8 concurrently live transient render-graph arenas (spec §4.C, §5:
/// "comes from packing an `active_render_graphs` mask into a `u8`").
pub const MAX_TRANSIENT_ARENAS: usize = 8;

/// Each queue has a `0..7` index (spec §4.D); wait-index arrays are sized to match.
pub const MAX_QUEUES: usize = 8;

/// Texture dimensions are constrained to `1..=16384` (spec §3.2).
pub const MAX_TEXTURE_DIMENSION: u32 = 16384;

/// Per-arena capacity for `TransientFixedSizeRegistry` kinds (buffers,
/// textures): spec §4.C's "known frame upper bound C".
pub const TRANSIENT_FIXED_CAPACITY: u32 = 4096;
