use crate::block::Block;
use crate::llist::FreeList;

/// Block-selection policy used when allocating.
///
/// Both policies scan the free list from its lowest address and only look at
/// free blocks. Neither mutates anything: splitting and unlinking the chosen
/// block is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Fit {
    /// Take the first block that's large enough.
    #[default]
    First,
    /// Take the block that leaves the least slack, preferring the lowest address on ties.
    Best,
}

impl Fit {
    /// Finds a free block with at least `size` payload bytes.
    ///
    /// `size` must already be aligned.
    pub(crate) fn find_fit(self, list: &FreeList, mem: &[u8], size: usize) -> Option<Block> {
        match self {
            Fit::First => first_fit(list, mem, size),
            Fit::Best => best_fit(list, mem, size),
        }
    }
}

fn first_fit(list: &FreeList, mem: &[u8], size: usize) -> Option<Block> {
    list.iter(mem).find(|block| block.is_free(mem) && block.size(mem) >= size)
}

fn best_fit(list: &FreeList, mem: &[u8], size: usize) -> Option<Block> {
    let mut best: Option<(Block, usize)> = None;

    for block in list.iter(mem) {
        if !block.is_free(mem) {
            continue;
        }

        let block_size = block.size(mem);
        if block_size < size {
            continue;
        }

        let slack = block_size - size;
        if slack == 0 {
            return Some(block);
        }

        // strictly less, so that ties keep the lower address
        match best {
            Some((_, best_slack)) if best_slack <= slack => {}
            _ => best = Some((block, slack)),
        }
    }

    best.map(|(block, _)| block)
}
