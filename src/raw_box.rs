use std::{
    alloc::Layout,
    fmt,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

use crate::{
    allocator::{Heap, System},
    error::AllocError,
};

/// Uniquely owned value on a `Heap`.
///
/// This is the "raw" form a value takes before a `RefCountedBox` adopts it.
/// Like `Box`, dropping it drops the value and returns the storage, but the
/// storage comes from an explicit heap and allocation failure is reported
/// instead of aborting.
pub struct RawBox<T: 'static, H: Heap = System>
{
    ptr: NonNull<T>,
    heap: H,
}

impl<T: 'static> RawBox<T, System>
{
    pub fn try_new(it: T) -> Result<Self, AllocError> { Self::try_new_in(it, System) }
}

impl<T: 'static, H: Heap> RawBox<T, H>
{
    /// Move `it` onto `heap`. If the heap refuses, `it` is dropped.
    pub fn try_new_in(it: T, heap: H) -> Result<Self, AllocError>
    {
        let ptr = heap.allocate(Layout::new::<T>())?.cast::<T>();
        unsafe { ptr.as_ptr().write(it) };
        Ok(Self { ptr, heap })
    }

    pub fn heap(&self) -> &H { &self.heap }

    /// Free the storage and return the value.
    pub fn into_inner(self) -> T
    {
        let (ptr, heap) = self.into_raw();
        unsafe {
            let it = ptr.as_ptr().read();
            heap.deallocate(ptr.cast(), Layout::new::<T>());
            it
        }
    }

    pub(crate) fn into_raw(self) -> (NonNull<T>, H)
    {
        let this = ManuallyDrop::new(self);
        (this.ptr, unsafe { ptr::read(&this.heap) })
    }

    /// # Safety
    ///
    /// `ptr` must hold an initialised `T` allocated from `heap` with
    /// `Layout::new::<T>()` and owned by nobody else.
    pub(crate) unsafe fn from_raw(ptr: NonNull<T>, heap: H) -> Self { Self { ptr, heap } }
}

impl<T: 'static, H: Heap> Deref for RawBox<T, H>
{
    type Target = T;

    fn deref(&self) -> &Self::Target { unsafe { self.ptr.as_ref() } }
}

impl<T: 'static, H: Heap> DerefMut for RawBox<T, H>
{
    fn deref_mut(&mut self) -> &mut Self::Target { unsafe { self.ptr.as_mut() } }
}

impl<T: 'static, H: Heap> Drop for RawBox<T, H>
{
    fn drop(&mut self)
    {
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.heap.deallocate(self.ptr.cast(), Layout::new::<T>());
        }
    }
}

impl<T: 'static + fmt::Debug, H: Heap> fmt::Debug for RawBox<T, H>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_tuple("RawBox").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::faults::FaultyHeap;

    #[test]
    fn owns_and_frees()
    {
        let heap = FaultyHeap::new();
        let mut b = RawBox::try_new_in(String::from("raw"), heap.clone()).unwrap();
        b.push('!');
        assert_eq!(&*b, "raw!");
        assert_eq!(heap.live(), 1);
        drop(b);
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn into_inner_frees_storage()
    {
        let heap = FaultyHeap::new();
        let b = RawBox::try_new_in(vec![1, 2, 3], heap.clone()).unwrap();
        assert_eq!(b.into_inner(), vec![1, 2, 3]);
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn refused_value_is_dropped()
    {
        use std::{cell::Cell, rc::Rc};

        struct Flag(Rc<Cell<bool>>);
        impl Drop for Flag
        {
            fn drop(&mut self) { self.0.set(true) }
        }

        let dropped = Rc::new(Cell::new(false));
        let heap = FaultyHeap::new();
        heap.fail_nth(1);
        assert!(RawBox::try_new_in(Flag(dropped.clone()), heap.clone()).is_err());
        assert!(dropped.get());
        assert_eq!(heap.live(), 0);
    }

    #[test]
    fn zero_sized()
    {
        let heap = FaultyHeap::new();
        let b = RawBox::try_new_in((), heap.clone()).unwrap();
        assert_eq!(heap.stats().allocations, 1);
        drop(b);
        assert_eq!(heap.live(), 0);
    }
}
