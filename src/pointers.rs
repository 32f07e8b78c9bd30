use std::{cell::Cell, fmt, marker::PhantomData, ptr::NonNull};

use crate::{
    allocator::{Heap, System},
    error::{AdoptError, AllocError, Error, InvalidAccess},
    raw_box::RawBox,
};

/// The value and count a set of aliasing boxes hold jointly.
///
/// The two allocations always travel together: they are allocated before a
/// `Shared` exists, copied as a unit and freed as a unit.
struct Shared<T: 'static, H: Heap>
{
    value: NonNull<T>,
    count: NonNull<Cell<usize>>,
    heap: H,
    _owns: PhantomData<T>,
}

impl<T: 'static, H: Heap> Shared<T, H>
{
    fn from_parts(value: RawBox<T, H>, count: RawBox<Cell<usize>, H>) -> Self
    {
        let (count, _) = count.into_raw();
        let (value, heap) = value.into_raw();
        Shared {
            value,
            count,
            heap,
            _owns: PhantomData,
        }
    }

    fn count(&self) -> usize { unsafe { self.count.as_ref() }.get() }

    fn set_count(&self, n: usize) { unsafe { self.count.as_ref() }.set(n) }

    fn value(&self) -> &T { unsafe { self.value.as_ref() } }

    /// Another handle to the same pair.
    fn alias(&self) -> Self
    {
        match self.count().checked_add(1) {
            Some(n) => self.set_count(n),
            None => std::process::abort(),
        }
        Shared {
            value: self.value,
            count: self.count,
            heap: self.heap.clone(),
            _owns: PhantomData,
        }
    }

    /// Give up this handle: the last one out frees the pair.
    fn release(self)
    {
        let n = self.count();
        if n == 1 {
            log::trace!("last owner released, freeing value and count");
            unsafe {
                drop(RawBox::from_raw(self.count, self.heap.clone()));
                drop(RawBox::from_raw(self.value, self.heap));
            }
        } else {
            self.set_count(n - 1)
        }
    }
}

/// Reference-counted box with explicit copy-on-write.
///
/// A box is either empty or shares one heap value with zero or more sibling
/// boxes. `Clone` makes another sibling and never allocates; `detach` is the
/// only way to turn a shared value into an exclusively owned copy and it
/// either fully succeeds or leaves every sibling untouched.
///
/// The count is a plain `Cell`, so boxes are neither `Send` nor `Sync`.
pub struct RefCountedBox<T: 'static, H: Heap = System>
{
    inner: Option<Shared<T, H>>,
}

impl<T: 'static, H: Heap> RefCountedBox<T, H>
{
    /// A box that owns nothing. Does not allocate.
    pub const fn empty() -> Self { Self { inner: None } }

    /// Place `it` on `heap` and own it with a count of one.
    ///
    /// Allocates the value first and the count second. If either fails, the
    /// value is dropped and any partial allocation is returned to the heap.
    pub fn try_new_in(it: T, heap: H) -> Result<Self, AllocError>
    {
        Self::from_raw_box(RawBox::try_new_in(it, heap)?)
    }

    /// Take ownership of `raw`. If the count cannot be allocated, `raw` is
    /// destroyed before the error is returned.
    pub fn from_raw_box(raw: RawBox<T, H>) -> Result<Self, AllocError>
    {
        Self::try_adopt(raw).map_err(AllocError::from)
    }

    /// Take ownership of `raw` only if the count can be allocated. On failure
    /// `raw` comes back inside the error, untouched.
    pub fn try_adopt(raw: RawBox<T, H>) -> Result<Self, AdoptError<T, H>>
    {
        match RawBox::try_new_in(Cell::new(1), raw.heap().clone()) {
            Ok(count) => Ok(Self {
                inner: Some(Shared::from_parts(raw, count)),
            }),
            Err(error) => Err(AdoptError { error, raw }),
        }
    }

    /// Number of boxes sharing the value, 0 when empty.
    pub fn ref_count(&self) -> usize { self.inner.as_ref().map_or(0, Shared::count) }

    pub fn is_empty(&self) -> bool { self.inner.is_none() }

    /// Whether both boxes share one value (or both are empty).
    pub fn ptr_eq(&self, other: &Self) -> bool
    {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a.count == b.count,
            _ => false,
        }
    }

    /// Move the contents out, leaving this box empty.
    pub fn take(&mut self) -> Self { Self { inner: self.inner.take() } }

    pub fn get(&self) -> Result<&T, InvalidAccess>
    {
        self.inner.as_ref().map(Shared::value).ok_or(InvalidAccess)
    }

    /// Borrow a part of the value, typically a field.
    pub fn project<U: ?Sized>(&self, f: impl FnOnce(&T) -> &U) -> Result<&U, InvalidAccess>
    {
        self.get().map(f)
    }

    /// Mutable access, only while no sibling shares the value.
    pub fn try_get_mut(&mut self) -> Option<&mut T>
    {
        match &mut self.inner {
            Some(shared) if shared.count() == 1 => Some(unsafe { shared.value.as_mut() }),
            _ => None,
        }
    }

    pub fn heap(&self) -> Option<&H> { self.inner.as_ref().map(|s| &s.heap) }

    fn release(&mut self)
    {
        if let Some(shared) = self.inner.take() {
            shared.release()
        }
    }
}

impl<T: 'static> RefCountedBox<T, System>
{
    pub fn try_new(it: T) -> Result<Self, AllocError> { Self::try_new_in(it, System) }
}

impl<T: Clone + 'static, H: Heap> RefCountedBox<T, H>
{
    /// Give this box its own copy of a shared value.
    ///
    /// Returns `Ok(false)` without doing anything when the box is empty or
    /// already the only owner. Otherwise copies the value into fresh storage
    /// with a fresh count of one and leaves the former siblings one owner
    /// fewer.
    ///
    /// Both allocations happen before anything shared is touched, so on
    /// `Err` the box and all its siblings are exactly as they were and no
    /// storage is leaked.
    pub fn detach(&mut self) -> Result<bool, AllocError>
    {
        let shared = match &self.inner {
            Some(shared) if shared.count() > 1 => shared,
            _ => return Ok(false),
        };

        let value = RawBox::try_new_in(shared.value().clone(), shared.heap.clone())?;
        let count = RawBox::try_new_in(Cell::new(1), shared.heap.clone())?;

        log::trace!("detaching from {} siblings", shared.count() - 1);
        shared.set_count(shared.count() - 1);
        self.inner = Some(Shared::from_parts(value, count));
        Ok(true)
    }

    /// Mutable access, detaching first if the value is shared.
    pub fn make_mut(&mut self) -> Result<&mut T, Error>
    {
        if self.is_empty() {
            return Err(InvalidAccess.into());
        }
        self.detach()?;
        self.try_get_mut().ok_or(Error::InvalidAccess(InvalidAccess))
    }
}

impl<T: 'static, H: Heap> Default for RefCountedBox<T, H>
{
    fn default() -> Self { Self::empty() }
}

impl<T: 'static, H: Heap> Clone for RefCountedBox<T, H>
{
    fn clone(&self) -> Self
    {
        Self {
            inner: self.inner.as_ref().map(Shared::alias),
        }
    }

    /// Release what this box holds, then share `source`'s value. A no-op when
    /// the two already share.
    fn clone_from(&mut self, source: &Self)
    {
        if self.ptr_eq(source) {
            return;
        }
        self.release();
        self.inner = source.inner.as_ref().map(Shared::alias);
    }
}

impl<T: 'static, H: Heap> Drop for RefCountedBox<T, H>
{
    fn drop(&mut self) { self.release() }
}

impl<T: 'static + fmt::Debug, H: Heap> fmt::Debug for RefCountedBox<T, H>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.inner {
            None => f.write_str("RefCountedBox(<empty>)"),
            Some(shared) => f
                .debug_struct("RefCountedBox")
                .field("value", shared.value())
                .field("ref_count", &shared.count())
                .finish(),
        }
    }
}
