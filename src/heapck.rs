use crate::{AllocError, Arena, Fit, Heap, ReleaseError, Span};

use core::num::NonZeroUsize;

/// Heap lock: wrapper struct containing a mutex-locked [`Heap`].
///
/// Every operation locks for its duration. To do several in one critical
/// section, or to read payloads, call [`heap`](HeapLock::heap).
#[derive(Debug)]
pub struct HeapLock<R: lock_api::RawMutex, A: Arena>(pub lock_api::Mutex<R, Heap<A>>);

impl<R: lock_api::RawMutex, A: Arena> HeapLock<R, A> {
    pub const fn new(heap: Heap<A>) -> Self {
        Self(lock_api::Mutex::new(heap))
    }

    /// Lock the mutex and access the inner [`Heap`].
    pub fn heap(&self) -> lock_api::MutexGuard<'_, R, Heap<A>> {
        self.0.lock()
    }

    pub fn allocate(&self, size: usize, fit: Fit) -> Result<NonZeroUsize, AllocError> {
        self.0.lock().allocate(size, fit)
    }

    pub fn first_fit_allocate(&self, size: usize) -> Result<NonZeroUsize, AllocError> {
        self.0.lock().first_fit_allocate(size)
    }

    pub fn best_fit_allocate(&self, size: usize) -> Result<NonZeroUsize, AllocError> {
        self.0.lock().best_fit_allocate(size)
    }

    /// See [`Heap::release`]. The lock is released before panicking.
    pub fn release(&self, ptr: Option<NonZeroUsize>) {
        let result = self.0.lock().try_release(ptr);

        if let Err(err) = result {
            log::error!("{}", err);
            panic!("{}", err);
        }
    }

    pub fn try_release(&self, ptr: Option<NonZeroUsize>) -> Result<(), ReleaseError> {
        self.0.lock().try_release(ptr)
    }

    pub fn first_fit_release(&self, ptr: Option<NonZeroUsize>) {
        self.release(ptr)
    }

    pub fn best_fit_release(&self, ptr: Option<NonZeroUsize>) {
        self.release(ptr)
    }

    pub fn largest_free_block_size(&self) -> usize {
        self.0.lock().largest_free_block_size()
    }

    pub fn total_free_bytes(&self) -> usize {
        self.0.lock().total_free_bytes()
    }

    pub fn heap_span(&self) -> Span {
        self.0.lock().heap_span()
    }

    pub fn into_inner(self) -> Heap<A> {
        self.0.into_inner()
    }
}
