//! A growable container of fixed-size chunks where allocated slots never
//! move (spec §4.B). Chunk memory is immortal: once allocated, a chunk is
//! never resized, moved, or individually freed, so a reference returned by
//! [`ChunkedArena::at`] stays valid for the whole life of the arena. This
//! is what lets property-set reads (§4.C) skip locking entirely.
//!
//! The same pattern backs every per-field property array, not just whole
//! resources (spec §4.B, last paragraph): one `ChunkedArena` per field, all
//! sharing the same index space.
//!
//! Elements carry their own interior mutability (atomics, or a small lock
//! for fields like `label`/`descriptor` that are set once then read many
//! times); `at` hands out a shared reference rather than spec's literal
//! `&mut T`, since Rust's aliasing rules require that translation the
//! moment more than one thread can reach the same slot; see DESIGN.md.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicPtr, Ordering};

type Chunk<T, const N: usize> = [UnsafeCell<T>; N];

/// Items per chunk. Fixed at the spec's default of 256 (§4.B: "typically
/// 256 items"); every registry in this crate shares one chunk size.
pub const CHUNK_SIZE: usize = crate::limits::CHUNK_SIZE;

pub struct ChunkedArena<T> {
    chunks: Box<[AtomicPtr<Chunk<T, CHUNK_SIZE>>]>,
}

unsafe impl<T: Send> Send for ChunkedArena<T> {}
unsafe impl<T: Send + Sync> Sync for ChunkedArena<T> {}

impl<T: Default> ChunkedArena<T> {
    /// Creates an arena capped at `max_chunks` chunks (`max_chunks * 256` slots).
    pub fn new(max_chunks: usize) -> Self {
        let chunks = (0..max_chunks)
            .map(|_| AtomicPtr::new(std::ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        ChunkedArena { chunks }
    }

    pub fn max_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn max_slots(&self) -> usize {
        self.chunks.len() * CHUNK_SIZE
    }

    #[inline]
    fn split(index: usize) -> (usize, usize) {
        (index / CHUNK_SIZE, index % CHUNK_SIZE)
    }

    /// Reserves the chunk covering `index`, allocating and default-filling
    /// it if this is the first access in that chunk. Safe to race: only one
    /// of several concurrent callers' allocation is installed, the rest are
    /// dropped.
    ///
    /// Fatal (panics) if `index`'s chunk is beyond `max_chunks`: spec §7,
    /// "Capacity exhaustion ... Fatal".
    pub fn reserve(&self, index: usize) {
        let (chunk_index, _) = Self::split(index);
        assert!(
            chunk_index < self.chunks.len(),
            "chunked arena exhausted: index {index} needs chunk {chunk_index}, max is {}",
            self.chunks.len()
        );
        let slot = &self.chunks[chunk_index];
        if !slot.load(Ordering::Acquire).is_null() {
            return;
        }
        let boxed: Box<Chunk<T, CHUNK_SIZE>> = Box::new(std::array::from_fn(|_| UnsafeCell::new(T::default())));
        let raw = Box::into_raw(boxed);
        if slot
            .compare_exchange(std::ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("chunked arena: lost race allocating chunk {chunk_index}, discarding");
            unsafe { drop(Box::from_raw(raw)) };
        } else {
            log::debug!("chunked arena: allocated chunk {chunk_index} ({CHUNK_SIZE} slots)");
        }
    }

    /// Returns the slot at `index`. Panics if its chunk hasn't been
    /// [`reserve`](Self::reserve)d yet. Callers reach this only through a
    /// registry, which reserves chunks on the index boundary before a
    /// handle referencing that index can escape (spec §5 ordering
    /// guarantees).
    pub fn at(&self, index: usize) -> &T {
        let (chunk_index, slot) = Self::split(index);
        let ptr = self
            .chunks
            .get(chunk_index)
            .unwrap_or_else(|| panic!("chunked arena: index {index} out of bounds"))
            .load(Ordering::Acquire);
        assert!(!ptr.is_null(), "chunked arena: chunk {chunk_index} not reserved for index {index}");
        unsafe { &*(*ptr)[slot].get() }
    }
}

impl<T> Drop for ChunkedArena<T> {
    fn drop(&mut self) {
        for slot in self.chunks.iter() {
            let ptr = slot.load(Ordering::Acquire);
            if !ptr.is_null() {
                unsafe { drop(Box::from_raw(ptr)) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn address_is_stable_across_growth() {
        let arena: ChunkedArena<AtomicU64> = ChunkedArena::new(8);
        arena.reserve(0);
        arena.at(0).store(42, Ordering::Relaxed);
        let addr_before = arena.at(0) as *const _;

        // Reserve many more chunks; the first chunk's address must not move.
        for i in 1..8 {
            arena.reserve(i * CHUNK_SIZE);
        }
        let addr_after = arena.at(0) as *const _;
        assert_eq!(addr_before, addr_after);
        assert_eq!(arena.at(0).load(Ordering::Relaxed), 42);
    }

    #[test]
    fn concurrent_reserve_of_same_chunk_is_safe() {
        let arena: ChunkedArena<AtomicU64> = ChunkedArena::new(4);
        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| arena.reserve(10));
            }
        });
        arena.at(10).store(7, Ordering::Relaxed);
        assert_eq!(arena.at(10).load(Ordering::Relaxed), 7);
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn reserve_beyond_max_chunks_is_fatal() {
        let arena: ChunkedArena<AtomicU64> = ChunkedArena::new(1);
        arena.reserve(CHUNK_SIZE); // needs chunk 1, only chunk 0 exists
    }

    #[test]
    #[should_panic(expected = "not reserved")]
    fn at_without_reserve_is_fatal() {
        let arena: ChunkedArena<AtomicU64> = ChunkedArena::new(4);
        arena.at(0);
    }
}
