use crate::block::Block;

/// The free list: an intrusive singly linked list of free blocks,
/// threaded through their headers' link words.
///
/// The list is:
///  * **Intrusive**, the links live in the arena next to each block's size and flag
///  * **Address-ordered**, blocks appear in ascending header offset
///  * **Offset-based**, holding arena offsets rather than pointers
///
/// Only the head is stored here. All other state is in arena memory,
/// which is passed in by the caller on each operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FreeList {
    head: Option<Block>,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None }
    }

    pub(crate) fn head(&self) -> Option<Block> {
        self.head
    }

    /// Links `block` in after the last block below it.
    ///
    /// `block` must not be in the list already.
    pub(crate) fn insert(&mut self, mem: &mut [u8], block: Block) {
        let head = match self.head {
            Some(head) if head < block => head,
            head => {
                block.set_next_free(mem, head);
                self.head = Some(block);
                return;
            }
        };

        let mut curr = head;
        while let Some(next) = curr.next_free(mem) {
            if block <= next {
                break;
            }
            curr = next;
        }

        block.set_next_free(mem, curr.next_free(mem));
        curr.set_next_free(mem, Some(block));
    }

    /// Unlinks `block`, returning whether it was found.
    pub(crate) fn remove(&mut self, mem: &mut [u8], block: Block) -> bool {
        let Some(head) = self.head else { return false };

        if head == block {
            self.head = block.next_free(mem);
            return true;
        }

        let mut curr = head;
        while let Some(next) = curr.next_free(mem) {
            if next == block {
                curr.set_next_free(mem, block.next_free(mem));
                return true;
            }
            if next > block {
                // ordered, it isn't further along
                return false;
            }
            curr = next;
        }

        false
    }

    /// Creates an iterator over the free blocks in list order.
    pub(crate) fn iter<'m>(&self, mem: &'m [u8]) -> Iter<'m> {
        Iter { mem, next: self.head }
    }
}

/// An iterator over the free list.
///
/// This `struct` is created by `FreeList::iter`. See its documentation for more.
#[derive(Debug, Clone, Copy)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub(crate) struct Iter<'m> {
    mem: &'m [u8],
    next: Option<Block>,
}

impl Iterator for Iter<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.next?;
        self.next = block.next_free(self.mem);
        Some(block)
    }
}
