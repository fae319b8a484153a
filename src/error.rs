pub use allocator_api2::alloc::AllocError;

use crate::Span;

/// Why an address was refused by [`Heap::try_release`](crate::Heap::try_release).
///
/// [`Heap::release`](crate::Heap::release) treats both as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseError {
    /// The address lies outside `heap`, inclusive of its upper boundary.
    /// Before the first allocation, every address is out of range.
    RangeViolation { addr: usize, heap: Span },
    /// The flag word where the address's header would be isn't a valid sentinel.
    InvalidBlock { addr: usize },
}

impl core::fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReleaseError::RangeViolation { addr, heap } => {
                write!(f, "pointer {:#x} out of heap {}", addr, heap)
            }
            ReleaseError::InvalidBlock { addr } => {
                write!(f, "pointer {:#x} is not the start of a block", addr)
            }
        }
    }
}

/// Aborts the current thread of execution on allocation failure.
///
/// [`Heap::allocate`](crate::Heap::allocate) returns [`AllocError`] instead of
/// calling this; it's here for embedders that want exhaustion to be fatal:
/// ```should_panic
/// # use fitalloc::*;
/// let mut heap = Heap::new(VecArena::with_limit(64));
/// let ptr = heap.first_fit_allocate(1000).unwrap_or_else(|_| handle_alloc_failure(1000));
/// ```
#[cold]
pub fn handle_alloc_failure(size: usize) -> ! {
    log::error!("allocation of {} bytes failed", size);
    panic!("allocation of {} bytes failed", size)
}
