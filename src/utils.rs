//! Sizing helpers, raw word access into arena memory, and heap checking.
//!
//! Nothing in here but [`align`] should be exported.

use crate::*;

use crate::block::Block;
use crate::tag::{self, State};

/// Rounds `size` up to the next multiple of [`ALIGNMENT`].
///
/// ```
/// assert_eq!(fitalloc::align(0), 0);
/// assert_eq!(fitalloc::align(1), 16);
/// assert_eq!(fitalloc::align(16), 16);
/// assert_eq!(fitalloc::align(17), 32);
/// ```
#[inline]
pub const fn align(size: usize) -> usize {
    (size + (ALIGNMENT - 1)) & !(ALIGNMENT - 1)
}

/// Like [`align`], but returns `None` instead of overflowing.
#[inline]
pub(crate) const fn checked_align(size: usize) -> Option<usize> {
    match size.checked_add(ALIGNMENT - 1) {
        Some(padded) => Some(padded & !(ALIGNMENT - 1)),
        None => None,
    }
}

/// Reads a native-endian word at `offset`.
///
/// Panics if the word isn't entirely within `mem`.
#[inline]
pub(crate) fn read_word(mem: &[u8], offset: usize) -> usize {
    let mut bytes = [0u8; WORD_SIZE];
    bytes.copy_from_slice(&mem[offset..offset + WORD_SIZE]);
    usize::from_ne_bytes(bytes)
}

/// Writes a native-endian word at `offset`.
///
/// Panics if the word isn't entirely within `mem`.
#[inline]
pub(crate) fn write_word(mem: &mut [u8], offset: usize, word: usize) {
    mem[offset..offset + WORD_SIZE].copy_from_slice(&word.to_ne_bytes());
}

#[cfg(not(debug_assertions))]
pub(crate) fn scan_for_errors<A: Arena>(_: &Heap<A>) {}

#[cfg(debug_assertions)]
/// Debugging function for checking the heap's invariants.
pub(crate) fn scan_for_errors<A: Arena>(heap: &Heap<A>) {
    let span = heap.heap_span();
    let mem = heap.arena.memory();

    // walk the tiling from the lower boundary
    let mut free_count = 0;
    let mut free_bytes = 0;
    let mut is_prev_free = false;
    let mut cursor = span.base;

    while cursor < span.acme {
        let block = Block(cursor);
        let state = block.state(mem);
        assert!(state.is_some(), "block at {:#x} has a corrupt flag", cursor);

        let size = block.size(mem);
        assert!(size % ALIGNMENT == 0, "block at {:#x} has unaligned size {}", cursor, size);
        assert!(block.end(mem) <= span.acme, "block at {:#x} overruns the heap {}", cursor, span);
        assert!(
            tag::read_tag(mem, block.tag_offset(mem)) == block,
            "block at {:#x} has a mismatched boundary tag",
            cursor
        );

        let is_free = state == Some(State::Free);
        if is_free {
            assert!(!is_prev_free, "block at {:#x} is free and follows a free block", cursor);
            free_count += 1;
            free_bytes += size;
        }

        is_prev_free = is_free;
        cursor = block.end(mem);
    }

    assert!(cursor == span.acme, "blocks don't tile the heap {}", span);

    // the free list must hold exactly the free blocks, in address order
    let mut listed = 0;
    let mut prev: Option<Block> = None;

    for block in heap.free_list.iter(mem) {
        listed += 1;
        assert!(listed <= free_count, "free list holds more than the {} free blocks", free_count);
        assert!(span.contains(block.0), "free list holds {:#x}, outside of {}", block.0, span);
        assert!(block.is_free(mem), "free list holds allocated block {:#x}", block.0);

        if let Some(prev) = prev {
            assert!(prev < block, "free list is out of order at {:#x}", block.0);
        }
        prev = Some(block);
    }

    assert!(listed == free_count, "free list misses {} free blocks", free_count - listed);

    #[cfg(feature = "counters")]
    {
        assert!(heap.counters.available_bytes == free_bytes);
        assert!(heap.counters.fragment_count == free_count);
        assert!(heap.counters.claimed_bytes == span.size());
    }
    #[cfg(not(feature = "counters"))]
    let _ = free_bytes;
}
