#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "lock_api")]
mod heapck;
#[cfg(feature = "counters")]
mod counters;

mod arena;
mod block;
mod error;
mod fit;
mod llist;
mod span;
mod tag;
mod utils;

pub use arena::{Arena, SliceArena, VecArena};
pub use block::{BlockInfo, Blocks};
#[cfg(feature = "counters")]
pub use counters::Counters;
pub use error::{handle_alloc_failure, AllocError, ReleaseError};
pub use fit::Fit;
#[cfg(feature = "lock_api")]
pub use heapck::HeapLock;
pub use span::Span;
pub use utils::align;

use block::Block;
use llist::FreeList;
use tag::State;
use utils::*;

use core::num::NonZeroUsize;

// Heap layout, from the lower boundary up to the arena's break:
//   | HEADER | payload ... | TAG | HEADER | payload ... | TAG | ...
// Blocks tile the heap with no gaps. A free block's header also links it
// into the address-ordered free list; no two free blocks are ever adjacent.

const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Every stored size, and so every block boundary, is a multiple of this.
pub const ALIGNMENT: usize = 16;

/// Bytes reserved ahead of each payload: size, flag, and free-list link.
pub const HEADER_SIZE: usize = align(3 * WORD_SIZE);
/// Bytes reserved after each payload: a back-reference to the header.
pub const TAG_SIZE: usize = align(WORD_SIZE);
/// Bookkeeping bytes per block.
pub const BLOCK_OVERHEAD: usize = HEADER_SIZE + TAG_SIZE;

/// A first-fit/best-fit heap over an [`Arena`].
///
/// The heap owns its arena. Addresses handed out are payload offsets into it;
/// use [`payload`](Heap::payload) and [`payload_mut`](Heap::payload_mut) to get
/// at the bytes.
///
/// There's no internal synchronization: mutating operations take `&mut self`.
/// Call [`lock`](Heap::lock) to get a [`HeapLock`] if the heap must be shared.
pub struct Heap<A: Arena> {
    arena: A,

    /// The arena's break at the first allocation, captured lazily.
    lower: Option<usize>,

    free_list: FreeList,

    #[cfg(feature = "counters")]
    counters: counters::Counters,
}

impl<A: Arena> core::fmt::Debug for Heap<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Heap")
            .field("heap", &format_args!("{}", self.heap_span()))
            .field("free_list_head", &self.free_list.head().map(|block| block.0))
            .finish()
    }
}

impl<A: Arena> Heap<A> {
    pub const fn new(arena: A) -> Self {
        Self {
            arena,
            lower: None,
            free_list: FreeList::new(),

            #[cfg(feature = "counters")]
            counters: counters::Counters::new(),
        }
    }

    /// Allocate at least `size` bytes, choosing among free blocks by `fit`.
    ///
    /// Grows the arena if no free block is large enough. If the arena can't
    /// grow, [`AllocError`] is returned and the heap is left as it was.
    pub fn allocate(&mut self, size: usize, fit: Fit) -> Result<NonZeroUsize, AllocError> {
        if self.lower.is_none() {
            self.lower = Some(self.arena.brk());
        }

        let size = checked_align(size).ok_or(AllocError)?;

        let block = match fit.find_fit(&self.free_list, self.arena.memory(), size) {
            Some(block) => self.take_fit(block, size),
            None => self.extend_heap(size)?,
        };

        block.mark_allocated(self.arena.memory_mut());

        #[cfg(feature = "counters")]
        self.counters.account_alloc(block.size(self.arena.memory()));

        scan_for_errors(self);

        Ok(block.payload())
    }

    pub fn first_fit_allocate(&mut self, size: usize) -> Result<NonZeroUsize, AllocError> {
        self.allocate(size, Fit::First)
    }

    pub fn best_fit_allocate(&mut self, size: usize) -> Result<NonZeroUsize, AllocError> {
        self.allocate(size, Fit::Best)
    }

    /// Hands out `size` bytes of the free `block`, splitting it if the
    /// remainder can hold a block of its own.
    fn take_fit(&mut self, block: Block, size: usize) -> Block {
        let mem = self.arena.memory_mut();
        let block_size = block.size(mem);

        if block_size > size + BLOCK_OVERHEAD {
            #[cfg(feature = "counters")]
            self.counters.account_take(size + BLOCK_OVERHEAD, false);

            block.split_off(mem, size)
        } else {
            let listed = self.free_list.remove(mem, block);
            debug_assert!(listed, "fitting block {:#x} is missing from the free list", block.0);

            #[cfg(feature = "counters")]
            self.counters.account_take(block_size, true);

            block
        }
    }

    /// Grows the arena by just enough for a `size` block and formats it there.
    fn extend_heap(&mut self, size: usize) -> Result<Block, AllocError> {
        let bytes = size.checked_add(BLOCK_OVERHEAD).ok_or(AllocError)?;

        let prev = match self.arena.grow(bytes) {
            Ok(prev) => prev,
            Err(err) => {
                log::debug!("arena refused to grow by {} bytes at {:#x}", bytes, self.arena.brk());
                return Err(err);
            }
        };

        log::trace!("arena grown by {} bytes at {:#x}", bytes, prev);
        debug_assert!(self.lower.map_or(false, |lower| lower <= prev));

        let block = Block(prev);
        let mem = self.arena.memory_mut();
        block.set_size(mem, size);
        block.write_tag(mem);

        #[cfg(feature = "counters")]
        self.counters.account_growth(bytes);

        Ok(block)
    }

    /// Release a previously allocated address. `None` is ignored.
    ///
    /// # Panics
    /// Panics if `ptr` is outside of the heap, or doesn't look like an
    /// allocation. See [`try_release`](Heap::try_release).
    pub fn release(&mut self, ptr: Option<NonZeroUsize>) {
        if let Err(err) = self.try_release(ptr) {
            log::error!("{}", err);
            panic!("{}", err);
        }
    }

    pub fn first_fit_release(&mut self, ptr: Option<NonZeroUsize>) {
        self.release(ptr)
    }

    pub fn best_fit_release(&mut self, ptr: Option<NonZeroUsize>) {
        self.release(ptr)
    }

    /// Release a previously allocated address, or report why it can't be.
    ///
    /// The address is checked to be within the heap and to have a valid flag
    /// where its header should be. Nothing is modified if either check fails.
    ///
    /// These checks are weak: an address into the middle of a block whose
    /// header position happens to hold a valid flag passes them, and releasing
    /// it corrupts the heap. So does releasing the same address twice.
    pub fn try_release(&mut self, ptr: Option<NonZeroUsize>) -> Result<(), ReleaseError> {
        let Some(ptr) = ptr else { return Ok(()) };

        let block = self.validate(ptr.get())?;
        let lower = self.heap_span().base;

        let mem = self.arena.memory_mut();
        #[cfg(feature = "counters")]
        let size = block.size(mem);
        block.set_state(mem, State::Free);

        let merged_following = self.merge_following(block);
        let merged_preceding = self.merge_preceding(block, lower);

        log::trace!(
            "released {:#x}, merged following: {}, merged preceding: {}",
            block.0,
            merged_following,
            merged_preceding
        );

        #[cfg(feature = "counters")]
        self.counters.account_release(size, merged_following as usize + merged_preceding as usize);

        scan_for_errors(self);

        Ok(())
    }

    /// Checks `ptr` against the heap bounds and its header's flag.
    fn validate(&self, ptr: usize) -> Result<Block, ReleaseError> {
        let heap = self.heap_span();

        if self.lower.is_none() || ptr < heap.base || ptr > heap.acme {
            return Err(ReleaseError::RangeViolation { addr: ptr, heap });
        }

        // ptr <= acme, so the whole header is readable if it starts within the heap
        let block = Block::from_payload(ptr)
            .filter(|block| block.0 >= heap.base)
            .ok_or(ReleaseError::InvalidBlock { addr: ptr })?;

        match block.state(self.arena.memory()) {
            Some(_) => Ok(block),
            None => Err(ReleaseError::InvalidBlock { addr: ptr }),
        }
    }

    /// Absorbs the physically following block into `block` if it's free.
    ///
    /// Returns whether a merge happened.
    fn merge_following(&mut self, block: Block) -> bool {
        let acme = self.arena.brk();
        let mem = self.arena.memory_mut();

        let following = Block(block.end(mem));
        if following.0 >= acme || !following.is_free(mem) {
            return false;
        }

        let following_size = following.size(mem);
        let listed = self.free_list.remove(mem, following);
        debug_assert!(listed, "free block {:#x} is missing from the free list", following.0);

        block.set_size(mem, block.size(mem) + BLOCK_OVERHEAD + following_size);
        block.write_tag(mem);

        true
    }

    /// Absorbs `block` into the physically preceding block if that's free,
    /// otherwise links `block` into the free list.
    ///
    /// Returns whether a merge happened.
    fn merge_preceding(&mut self, block: Block, lower: usize) -> bool {
        let mem = self.arena.memory_mut();

        let preceding = if block.0 > lower {
            Some(tag::read_tag(mem, block.0 - TAG_SIZE))
        } else {
            None
        };

        match preceding {
            Some(preceding) if preceding.is_free(mem) => {
                preceding.set_size(mem, preceding.size(mem) + BLOCK_OVERHEAD + block.size(mem));
                preceding.write_tag(mem);
                true
            }
            _ => {
                self.free_list.insert(mem, block);
                false
            }
        }
    }

    /// The usable bytes of the allocation at `ptr`.
    ///
    /// Returns `None` if `ptr` doesn't validate as an allocated block.
    pub fn payload(&self, ptr: NonZeroUsize) -> Option<&[u8]> {
        let block = self.validate(ptr.get()).ok()?;
        let mem = self.arena.memory();

        if block.is_free(mem) {
            return None;
        }

        let size = block.size(mem);
        mem.get(ptr.get()..ptr.get().checked_add(size)?)
    }

    /// The usable bytes of the allocation at `ptr`.
    ///
    /// Returns `None` if `ptr` doesn't validate as an allocated block.
    pub fn payload_mut(&mut self, ptr: NonZeroUsize) -> Option<&mut [u8]> {
        let block = self.validate(ptr.get()).ok()?;
        let mem = self.arena.memory_mut();

        if block.is_free(mem) {
            return None;
        }

        let size = block.size(mem);
        mem.get_mut(ptr.get()..ptr.get().checked_add(size)?)
    }

    /// The largest payload among free blocks, or zero if there are none.
    pub fn largest_free_block_size(&self) -> usize {
        let mem = self.arena.memory();
        self.free_list.iter(mem).map(|block| block.size(mem)).max().unwrap_or(0)
    }

    /// The sum of the payloads of all free blocks.
    pub fn total_free_bytes(&self) -> usize {
        let mem = self.arena.memory();
        self.free_list.iter(mem).map(|block| block.size(mem)).sum()
    }

    /// Returns the [`Span`] from the lower boundary to the arena's break.
    ///
    /// Empty until the first allocation.
    pub fn heap_span(&self) -> Span {
        match self.lower {
            Some(lower) => Span::new(lower, self.arena.brk()),
            None => Span::empty(),
        }
    }

    /// Iterates over every block in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        let span = self.heap_span();
        Blocks::new(self.arena.memory(), span.base, span.acme)
    }

    /// Iterates over the free list, which is in address order.
    pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        let mem = self.arena.memory();
        self.free_list.iter(mem).map(move |block| BlockInfo::read(mem, block))
    }

    pub fn arena(&self) -> &A {
        &self.arena
    }

    pub fn into_arena(self) -> A {
        self.arena
    }

    /// Wrap in [`HeapLock`], a mutex-locked wrapper struct using [`lock_api`].
    ///
    /// # Examples
    /// ```
    /// # use fitalloc::*;
    /// use spin::Mutex;
    /// let heap = Heap::new(VecArena::new()).lock::<Mutex<()>>();
    ///
    /// let ptr = heap.best_fit_allocate(32).unwrap();
    /// heap.release(Some(ptr));
    /// ```
    #[cfg(feature = "lock_api")]
    pub const fn lock<R: lock_api::RawMutex>(self) -> HeapLock<R, A> {
        HeapLock::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(offset: usize) -> Option<NonZeroUsize> {
        NonZeroUsize::new(offset)
    }

    fn block_sizes<A: Arena>(heap: &Heap<A>) -> Vec<(usize, bool)> {
        heap.blocks().map(|info| (info.size, info.is_free)).collect()
    }

    #[test]
    fn first_allocation_grows_heap() {
        let mut heap = Heap::new(VecArena::new());
        assert!(heap.heap_span().is_empty());
        assert_eq!(heap.blocks().count(), 0);

        let ptr = heap.first_fit_allocate(10).unwrap();

        assert_eq!(ptr.get(), HEADER_SIZE);
        assert_eq!(heap.heap_span(), Span::new(0, 16 + BLOCK_OVERHEAD));
        assert_eq!(heap.arena().brk(), 16 + BLOCK_OVERHEAD);
        assert_eq!(block_sizes(&heap), [(16, false)]);
        assert_eq!(heap.payload(ptr).map(<[u8]>::len), Some(16));
        assert_eq!(heap.largest_free_block_size(), 0);
        assert_eq!(heap.total_free_bytes(), 0);
    }

    #[test]
    fn release_none_is_noop() {
        let mut heap = Heap::new(VecArena::new());
        heap.release(None);
        assert_eq!(heap.try_release(None), Ok(()));

        let ptr = heap.best_fit_allocate(64).unwrap();
        heap.best_fit_release(None);
        assert_eq!(block_sizes(&heap), [(64, false)]);

        heap.best_fit_release(Some(ptr));
        assert_eq!(block_sizes(&heap), [(64, true)]);
    }

    #[test]
    fn freed_block_is_reused() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(64).unwrap();
        let _b = heap.first_fit_allocate(64).unwrap();
        heap.first_fit_release(Some(a));

        let brk = heap.arena().brk();
        let c = heap.first_fit_allocate(50).unwrap();

        assert_eq!(a, c);
        assert_eq!(heap.arena().brk(), brk);
        assert_eq!(heap.total_free_bytes(), 0);
    }

    #[test]
    fn round_trip_restores_free_bytes() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(256).unwrap();
        let _sep = heap.first_fit_allocate(16).unwrap();
        heap.first_fit_release(Some(a));

        let free = heap.total_free_bytes();
        let largest = heap.largest_free_block_size();

        for size in [1, 16, 100, 208, 209, 256, 300] {
            for fit in [Fit::First, Fit::Best] {
                let ptr = heap.allocate(size, fit).unwrap();
                heap.release(Some(ptr));

                assert_eq!(heap.largest_free_block_size(), largest.max(align(size)));
                if align(size) <= largest {
                    assert_eq!(heap.total_free_bytes(), free);
                } else {
                    // grew the arena by a block that's now free too
                    assert!(heap.total_free_bytes() > free);
                }
            }
        }
    }

    #[test]
    fn first_fit_and_best_fit_diverge() {
        for (fit, expected) in [(Fit::First, 0), (Fit::Best, 1)] {
            let mut heap = Heap::new(VecArena::new());

            let mut freed = Vec::new();
            for size in [48, 32, 64] {
                freed.push(heap.allocate(size, fit).unwrap());
                // keeps the freed blocks from coalescing
                heap.allocate(16, fit).unwrap();
            }
            for &ptr in &freed {
                heap.release(Some(ptr));
            }

            assert_eq!(heap.free_blocks().map(|info| info.size).collect::<Vec<_>>(), [48, 32, 64]);

            let ptr = heap.allocate(16, fit).unwrap();
            assert_eq!(ptr, freed[expected]);
        }
    }

    #[test]
    fn best_fit_tie_keeps_lowest() {
        let mut heap = Heap::new(VecArena::new());

        let mut freed = Vec::new();
        for size in [64, 80, 64] {
            freed.push(heap.best_fit_allocate(size).unwrap());
            heap.best_fit_allocate(16).unwrap();
        }
        for &ptr in freed.iter().rev() {
            heap.best_fit_release(Some(ptr));
        }

        let ptr = heap.best_fit_allocate(48).unwrap();
        assert_eq!(ptr, freed[0]);

        let ptr = heap.best_fit_allocate(64).unwrap();
        assert_eq!(ptr, freed[2]);
    }

    #[test]
    fn split_threshold() {
        let mut heap = Heap::new(VecArena::new());

        // exactly R + overhead: handed out whole
        let a = heap.first_fit_allocate(16 + BLOCK_OVERHEAD).unwrap();
        let _sep = heap.first_fit_allocate(16).unwrap();
        heap.first_fit_release(Some(a));

        let b = heap.first_fit_allocate(16).unwrap();
        assert_eq!(a, b);
        assert_eq!(heap.payload(b).map(<[u8]>::len), Some(16 + BLOCK_OVERHEAD));
        assert_eq!(heap.total_free_bytes(), 0);

        // one alignment unit more: split, the free remainder keeps the low address
        let c = heap.first_fit_allocate(16 + BLOCK_OVERHEAD + ALIGNMENT).unwrap();
        let _sep = heap.first_fit_allocate(16).unwrap();
        heap.first_fit_release(Some(c));

        let d = heap.first_fit_allocate(16).unwrap();
        assert_eq!(d.get(), c.get() + ALIGNMENT + BLOCK_OVERHEAD);
        assert_eq!(heap.payload(d).map(<[u8]>::len), Some(16));
        assert_eq!(heap.total_free_bytes(), ALIGNMENT);

        let free = heap.free_blocks().collect::<Vec<_>>();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].payload(), c);
        assert_eq!(free[0].size, ALIGNMENT);
    }

    #[test]
    fn split_128() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.best_fit_allocate(128).unwrap();
        let _sep = heap.best_fit_allocate(16).unwrap();
        heap.best_fit_release(Some(a));

        let b = heap.best_fit_allocate(10).unwrap();

        assert_eq!(
            block_sizes(&heap),
            [(128 - 16 - BLOCK_OVERHEAD, true), (16, false), (16, false)]
        );
        assert_eq!(heap.total_free_bytes(), 128 - 16 - BLOCK_OVERHEAD);
        assert_eq!(b.get(), a.get() + 128 - 16);
    }

    #[test]
    fn coalesce_between_free_neighbours() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(32).unwrap();
        let b = heap.first_fit_allocate(64).unwrap();
        let c = heap.first_fit_allocate(96).unwrap();
        let _d = heap.first_fit_allocate(16).unwrap();

        heap.first_fit_release(Some(a));
        heap.first_fit_release(Some(c));
        assert_eq!(heap.free_blocks().count(), 2);

        heap.first_fit_release(Some(b));

        let free = heap.free_blocks().collect::<Vec<_>>();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].payload(), a);
        assert_eq!(free[0].size, 32 + 64 + 96 + 2 * BLOCK_OVERHEAD);
        assert_eq!(block_sizes(&heap), [(32 + 64 + 96 + 2 * BLOCK_OVERHEAD, true), (16, false)]);
    }

    #[test]
    fn coalesce_one_side() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(32).unwrap();
        let b = heap.first_fit_allocate(32).unwrap();
        let c = heap.first_fit_allocate(32).unwrap();

        // with the following block
        heap.first_fit_release(Some(c));
        heap.first_fit_release(Some(b));
        assert_eq!(block_sizes(&heap), [(32, false), (64 + BLOCK_OVERHEAD, true)]);

        let b = heap.first_fit_allocate(64 + BLOCK_OVERHEAD).unwrap();
        assert_eq!(block_sizes(&heap), [(32, false), (64 + BLOCK_OVERHEAD, false)]);

        // into the preceding block
        heap.first_fit_release(Some(a));
        heap.first_fit_release(Some(b));
        assert_eq!(block_sizes(&heap), [(96 + 2 * BLOCK_OVERHEAD, true)]);
        assert_eq!(heap.largest_free_block_size(), 96 + 2 * BLOCK_OVERHEAD);
    }

    #[test]
    fn out_of_range_release() {
        let mut backing = vec![0u8; 1024];
        let mut heap = Heap::new(SliceArena::with_break(&mut backing, 64));

        // no heap yet
        assert!(matches!(heap.try_release(nz(64)), Err(ReleaseError::RangeViolation { .. })));

        let ptr = heap.first_fit_allocate(32).unwrap();
        assert_eq!(ptr.get(), 64 + HEADER_SIZE);
        let heap_span = Span::new(64, 64 + 32 + BLOCK_OVERHEAD);
        assert_eq!(heap.heap_span(), heap_span);

        assert_eq!(
            heap.try_release(nz(48)),
            Err(ReleaseError::RangeViolation { addr: 48, heap: heap_span })
        );
        assert_eq!(
            heap.try_release(nz(heap_span.acme + 1)),
            Err(ReleaseError::RangeViolation { addr: heap_span.acme + 1, heap: heap_span })
        );

        // the upper boundary itself is in range, so only the flag check rejects it
        heap.payload_mut(ptr).unwrap().fill(0xab);
        assert_eq!(
            heap.try_release(nz(heap_span.acme)),
            Err(ReleaseError::InvalidBlock { addr: heap_span.acme })
        );

        // nothing changed
        assert_eq!(block_sizes(&heap), [(32, false)]);
        heap.release(Some(ptr));
        assert_eq!(block_sizes(&heap), [(32, true)]);
    }

    #[test]
    #[should_panic(expected = "out of heap")]
    fn out_of_range_release_is_fatal() {
        let mut heap = Heap::new(VecArena::new());
        let ptr = heap.first_fit_allocate(32).unwrap();
        heap.release(nz(ptr.get() + 4096));
    }

    #[test]
    fn invalid_block_release() {
        let mut heap = Heap::new(VecArena::new());
        let ptr = heap.first_fit_allocate(128).unwrap();
        heap.payload_mut(ptr).unwrap().fill(0xab);

        let interior = ptr.get() + 64;
        assert_eq!(heap.try_release(nz(interior)), Err(ReleaseError::InvalidBlock { addr: interior }));

        // the header would sit below the lower boundary
        assert_eq!(heap.try_release(nz(16)), Err(ReleaseError::InvalidBlock { addr: 16 }));

        assert_eq!(block_sizes(&heap), [(128, false)]);
        assert!(heap.payload(ptr).unwrap().iter().all(|&b| b == 0xab));
    }

    #[test]
    #[should_panic(expected = "not the start of a block")]
    fn invalid_block_release_is_fatal() {
        let mut heap = Heap::new(VecArena::new());
        let ptr = heap.best_fit_allocate(128).unwrap();
        heap.payload_mut(ptr).unwrap().fill(0xff);
        heap.best_fit_release(nz(ptr.get() + 48));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "missing from the free list")]
    fn unlisted_free_neighbour_is_reported() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(32).unwrap();
        let b = heap.first_fit_allocate(32).unwrap();
        let _c = heap.first_fit_allocate(32).unwrap();
        heap.release(Some(b));

        // b stays flagged free but drops out of the list
        heap.free_list = FreeList::new();
        heap.release(Some(a));
    }

    #[test]
    fn exhaustion_leaves_heap_untouched() {
        let mut heap = Heap::new(VecArena::with_limit(1024));

        let mut ptrs = Vec::new();
        while let Ok(ptr) = heap.first_fit_allocate(64) {
            ptrs.push(ptr);
        }
        assert_eq!(ptrs.len(), 1024 / (64 + BLOCK_OVERHEAD));

        for ptr in ptrs.iter().step_by(2) {
            heap.release(Some(*ptr));
        }

        let free = heap.free_blocks().collect::<Vec<_>>();
        let blocks = heap.blocks().collect::<Vec<_>>();
        let total = heap.total_free_bytes();
        let brk = heap.arena().brk();

        assert_eq!(heap.best_fit_allocate(65), Err(AllocError));
        assert_eq!(heap.first_fit_allocate(usize::MAX), Err(AllocError));
        assert_eq!(heap.first_fit_allocate(usize::MAX - BLOCK_OVERHEAD), Err(AllocError));

        assert_eq!(heap.free_blocks().collect::<Vec<_>>(), free);
        assert_eq!(heap.blocks().collect::<Vec<_>>(), blocks);
        assert_eq!(heap.total_free_bytes(), total);
        assert_eq!(heap.arena().brk(), brk);

        // the free blocks still serve what fits
        assert_eq!(heap.best_fit_allocate(64), Ok(ptrs[0]));
    }

    #[test]
    fn zero_sized_allocations() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(0).unwrap();
        let b = heap.first_fit_allocate(0).unwrap();

        assert_eq!(b.get(), a.get() + BLOCK_OVERHEAD);
        assert_eq!(heap.payload(a).map(<[u8]>::len), Some(0));

        heap.release(Some(a));
        heap.release(Some(b));
        assert_eq!(block_sizes(&heap), [(BLOCK_OVERHEAD, true)]);
    }

    #[test]
    fn payload_access() {
        let mut heap = Heap::new(VecArena::new());

        let a = heap.first_fit_allocate(20).unwrap();
        let b = heap.first_fit_allocate(20).unwrap();

        heap.payload_mut(a).unwrap().copy_from_slice(&[1; 32]);
        heap.payload_mut(b).unwrap().copy_from_slice(&[2; 32]);

        // growth moves the vector, offsets stay valid
        let _c = heap.first_fit_allocate(10000).unwrap();

        assert_eq!(heap.payload(a), Some(&[1; 32][..]));
        assert_eq!(heap.payload(b), Some(&[2; 32][..]));

        heap.release(Some(a));
        assert_eq!(heap.payload(a), None);
        assert!(heap.payload_mut(a).is_none());
        assert_eq!(heap.payload(NonZeroUsize::MIN), None);
    }

    #[test]
    fn random_actions() {
        let mut heap = Heap::new(VecArena::with_limit(1 << 16));
        let mut allocations: Vec<(NonZeroUsize, u8)> = Vec::new();
        let rng = fastrand::Rng::with_seed(0x5eed);

        for step in 0..4000 {
            if allocations.is_empty() || rng.u8(..) < 150 {
                let size = rng.usize(0..600);
                let fit = if rng.bool() { Fit::First } else { Fit::Best };

                match heap.allocate(size, fit) {
                    Ok(ptr) => {
                        let fill = step as u8;
                        let payload = heap.payload_mut(ptr).unwrap();
                        assert!(payload.len() >= size);
                        payload.fill(fill);
                        allocations.push((ptr, fill));
                    }
                    Err(AllocError) => {
                        assert!(heap.largest_free_block_size() < align(size));
                    }
                }
            } else {
                let (ptr, fill) = allocations.swap_remove(rng.usize(..allocations.len()));
                assert!(heap.payload(ptr).unwrap().iter().all(|&b| b == fill));
                heap.release(Some(ptr));
            }

            let blocks = heap.blocks().collect::<Vec<_>>();
            let free = blocks.iter().filter(|info| info.is_free).copied().collect::<Vec<_>>();
            assert_eq!(heap.free_blocks().collect::<Vec<_>>(), free);
            assert_eq!(heap.total_free_bytes(), free.iter().map(|info| info.size).sum::<usize>());
            assert_eq!(blocks.last().map_or(heap.heap_span().base, BlockInfo::end), heap.heap_span().acme);
            assert!(blocks.windows(2).all(|w| w[0].end() == w[1].header && !(w[0].is_free && w[1].is_free)));
            assert_eq!(blocks.iter().filter(|info| !info.is_free).count(), allocations.len());
        }

        for (ptr, _) in allocations.drain(..) {
            heap.release(Some(ptr));
        }

        assert_eq!(heap.blocks().count(), 1);
        assert_eq!(heap.total_free_bytes() + BLOCK_OVERHEAD, heap.heap_span().size());
    }
}
