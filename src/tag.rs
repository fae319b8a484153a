//! The in-band free flag and the boundary tag.
//!
//! A block's flag word must hold one of two sentinels. Anything else at a
//! header position means the offset doesn't belong to the allocator.
//!
//! The boundary tag is a single word after a block's payload holding the
//! offset of that block's header, so the block below any header can be found
//! by reading the word just beneath it.

use crate::block::Block;
use crate::utils::{read_word, write_word};

/// Allocation state of a block, as stored in its header's flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub(crate) enum State {
    Allocated = 0,
    Free = 1,
}

impl State {
    #[inline]
    pub(crate) const fn to_word(self) -> usize {
        self as usize
    }

    /// Decodes a flag word, rejecting anything but the two sentinels.
    #[inline]
    pub(crate) const fn from_word(word: usize) -> Option<Self> {
        match word {
            0 => Some(Self::Allocated),
            1 => Some(Self::Free),
            _ => None,
        }
    }
}

/// Reads the boundary tag at `tag_offset`, yielding the block it belongs to.
#[inline]
pub(crate) fn read_tag(mem: &[u8], tag_offset: usize) -> Block {
    Block(read_word(mem, tag_offset))
}

/// Writes a boundary tag at `tag_offset` referring back to `owner`.
#[inline]
pub(crate) fn write_tag(mem: &mut [u8], tag_offset: usize, owner: Block) {
    write_word(mem, tag_offset, owner.0);
}
