use std::{
    alloc::{self, Layout},
    fmt,
    ptr::NonNull,
};

use crate::error::AllocError;

#[cfg(feature = "global")]
use crate::global_ledger;

/// Source of the storage behind boxes.
///
/// A heap reports out-of-memory as a recoverable `AllocError` rather than
/// aborting. Cloning a heap handle must never allocate from that heap, since
/// copying a box clones its heap and copying is infallible.
pub trait Heap: Clone
{
    /// Allocate storage for `layout`. Zero-sized layouts still count as an
    /// allocation attempt and yield a dangling, well-aligned pointer.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Return storage obtained from `allocate` with the same `layout`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this heap (or a clone of it) with
    /// an identical `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process allocator.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct System;

impl Heap for System
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>
    {
        let res = if layout.size() == 0 {
            Some(dangling(layout))
        } else {
            NonNull::new(unsafe { alloc::alloc(layout) })
        };

        #[cfg(feature = "global")]
        global_ledger::record_allocation(layout, res.is_some());

        res.ok_or_else(|| {
            log::debug!("system heap refused {} bytes", layout.size());
            AllocError::new(layout)
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout)
    {
        #[cfg(feature = "global")]
        global_ledger::record_deallocation(layout);

        if layout.size() != 0 {
            alloc::dealloc(ptr.as_ptr(), layout)
        }
    }
}

impl fmt::Debug for System
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("System") }
}

/// Stand-in address for zero-sized allocations.
pub(crate) fn dangling(layout: Layout) -> NonNull<u8>
{
    // alignment is a nonzero power of two
    unsafe { NonNull::new_unchecked(layout.align() as *mut u8) }
}
