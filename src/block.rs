//! Views over blocks laid out in arena memory.
//!
//! Every block is `[header][payload][tag]`:
//! ```not_rust
//!   header (HEADER_SIZE)                       payload (size)   tag (TAG_SIZE)
//! | size: usize | flag: usize | next: usize |..| ?????????????? | header: usize |..|
//! ```
//! `next` only means something while the block is free; `usize::MAX` marks the
//! end of the free list.

use core::num::NonZeroUsize;

use crate::tag::{self, State};
use crate::utils::{read_word, write_word};
use crate::{BLOCK_OVERHEAD, HEADER_SIZE, TAG_SIZE, WORD_SIZE};

/// Encodes "no successor" in a free block's link word.
const NIL: usize = usize::MAX;

/// Offset of a block's header within the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub(crate) struct Block(pub(crate) usize);

impl Block {
    const SIZE_OFFSET: usize = 0;
    const FLAG_OFFSET: usize = WORD_SIZE;
    const NEXT_OFFSET: usize = 2 * WORD_SIZE;

    /// The block whose payload starts at `payload`, if there is room for a header below it.
    #[inline]
    pub(crate) fn from_payload(payload: usize) -> Option<Self> {
        payload.checked_sub(HEADER_SIZE).map(Self)
    }

    /// Offset of the first payload byte.
    #[inline]
    pub(crate) fn payload(self) -> NonZeroUsize {
        debug_assert!(self.0 <= usize::MAX - HEADER_SIZE);
        // SAFETY: HEADER_SIZE is nonzero and the sum can't wrap for arena offsets
        unsafe { NonZeroUsize::new_unchecked(self.0 + HEADER_SIZE) }
    }

    #[inline]
    pub(crate) fn size(self, mem: &[u8]) -> usize {
        read_word(mem, self.0 + Self::SIZE_OFFSET)
    }

    #[inline]
    pub(crate) fn set_size(self, mem: &mut [u8], size: usize) {
        write_word(mem, self.0 + Self::SIZE_OFFSET, size);
    }

    /// The decoded flag, `None` if the flag word isn't a sentinel.
    #[inline]
    pub(crate) fn state(self, mem: &[u8]) -> Option<State> {
        State::from_word(read_word(mem, self.0 + Self::FLAG_OFFSET))
    }

    #[inline]
    pub(crate) fn is_free(self, mem: &[u8]) -> bool {
        self.state(mem) == Some(State::Free)
    }

    #[inline]
    pub(crate) fn set_state(self, mem: &mut [u8], state: State) {
        write_word(mem, self.0 + Self::FLAG_OFFSET, state.to_word());
    }

    #[inline]
    pub(crate) fn next_free(self, mem: &[u8]) -> Option<Block> {
        match read_word(mem, self.0 + Self::NEXT_OFFSET) {
            NIL => None,
            next => Some(Block(next)),
        }
    }

    #[inline]
    pub(crate) fn set_next_free(self, mem: &mut [u8], next: Option<Block>) {
        write_word(mem, self.0 + Self::NEXT_OFFSET, next.map_or(NIL, |block| block.0));
    }

    /// Offset of the boundary tag, right after the payload.
    #[inline]
    pub(crate) fn tag_offset(self, mem: &[u8]) -> usize {
        self.0 + HEADER_SIZE + self.size(mem)
    }

    /// Offset just past the boundary tag: the header of the physically following block.
    #[inline]
    pub(crate) fn end(self, mem: &[u8]) -> usize {
        self.tag_offset(mem) + TAG_SIZE
    }

    /// Points the boundary tag at the current end of the block back to `self`.
    #[inline]
    pub(crate) fn write_tag(self, mem: &mut [u8]) {
        let tag_offset = self.tag_offset(mem);
        tag::write_tag(mem, tag_offset, self);
    }

    /// Clears the free flag and the free-list link.
    #[inline]
    pub(crate) fn mark_allocated(self, mem: &mut [u8]) {
        self.set_state(mem, State::Allocated);
        self.set_next_free(mem, None);
    }

    /// Carves a block of `size` off the top of `self`.
    ///
    /// `self` keeps its offset (and thus its place in the free list) but shrinks
    /// by `size + BLOCK_OVERHEAD`. The carved block sits right above it, allocated.
    ///
    /// The remainder must stay positive: `self.size(mem) > size + BLOCK_OVERHEAD`.
    pub(crate) fn split_off(self, mem: &mut [u8], size: usize) -> Block {
        let old_size = self.size(mem);
        debug_assert!(old_size > size + BLOCK_OVERHEAD);

        self.set_size(mem, old_size - size - BLOCK_OVERHEAD);
        self.write_tag(mem);

        let carved = Block(self.end(mem));
        carved.set_size(mem, size);
        carved.write_tag(mem);
        carved.mark_allocated(mem);
        carved
    }
}

/// A snapshot of one block, as yielded by [`Heap::blocks`](crate::Heap::blocks)
/// and [`Heap::free_blocks`](crate::Heap::free_blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    /// Offset of the block's header.
    pub header: usize,
    /// Payload size in bytes, always a multiple of [`ALIGNMENT`](crate::ALIGNMENT).
    pub size: usize,
    pub is_free: bool,
}

impl BlockInfo {
    pub(crate) fn read(mem: &[u8], block: Block) -> Self {
        Self { header: block.0, size: block.size(mem), is_free: block.is_free(mem) }
    }

    /// Offset of the payload, as handed out by allocation.
    pub fn payload(&self) -> NonZeroUsize {
        Block(self.header).payload()
    }

    /// Offset just past the block's boundary tag.
    pub fn end(&self) -> usize {
        self.header + self.size + BLOCK_OVERHEAD
    }
}

/// Iterator over every block of a heap in address order.
#[derive(Debug, Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Blocks<'a> {
    mem: &'a [u8],
    cursor: usize,
    acme: usize,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(mem: &'a [u8], base: usize, acme: usize) -> Self {
        Self { mem, cursor: base, acme }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor < self.acme {
            let info = BlockInfo::read(self.mem, Block(self.cursor));
            self.cursor = info.end();
            Some(info)
        } else {
            None
        }
    }
}
