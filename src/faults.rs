//! Allocation failure injection.
//!
//! `FaultyHeap` sits in front of the `System` heap and can be told to refuse
//! the Nth allocation it sees. It also keeps a ledger of every address it has
//! handed out, so a test can assert that an operation which failed halfway
//! left nothing behind.

use std::{
    alloc::Layout,
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    ptr::NonNull,
    rc::Rc,
};

use crate::{
    allocator::{Heap, System},
    error::AllocError,
    stats::Stats,
};

#[derive(Default)]
struct Faults
{
    /// 0 never fails; n fails the nth allocation from now on.
    countdown: Cell<usize>,
    stats: Cell<Stats>,
    /// Outstanding addresses and how many times each is handed out.
    /// Zero-sized allocations share addresses, hence the multiplicity.
    ledger: RefCell<HashMap<usize, usize>>,
    foreign_frees: Cell<usize>,
}

impl Faults
{
    fn should_fail(&self) -> bool
    {
        match self.countdown.get() {
            0 => false,
            1 => {
                self.countdown.set(0);
                true
            }
            n => {
                self.countdown.set(n - 1);
                false
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut Stats))
    {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

/// Heap handle with scripted failures. Clones share one ledger.
#[derive(Clone, Default)]
pub struct FaultyHeap(Rc<Faults>);

impl FaultyHeap
{
    pub fn new() -> Self { Self::default() }

    /// Make the nth allocation attempt from now on fail, once.
    /// `0` switches injection off.
    pub fn fail_nth(&self, n: usize) { self.0.countdown.set(n) }

    /// Whether a failure is still scheduled.
    pub fn armed(&self) -> bool { self.0.countdown.get() != 0 }

    /// Allocations handed out and not yet returned.
    pub fn live(&self) -> usize { self.0.ledger.borrow().values().sum() }

    pub fn is_live<T>(&self, ptr: NonNull<T>) -> bool
    {
        self.0
            .ledger
            .borrow()
            .contains_key(&(ptr.as_ptr() as usize))
    }

    pub fn stats(&self) -> Stats { self.0.stats.get() }

    /// Deallocations of addresses this heap never handed out (or already
    /// took back). Those are swallowed rather than passed on.
    pub fn foreign_frees(&self) -> usize { self.0.foreign_frees.get() }
}

impl Heap for FaultyHeap
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>
    {
        if self.0.should_fail() {
            log::debug!("injected failure of a {} byte allocation", layout.size());
            self.0.update(Stats::failed);
            return Err(AllocError::new(layout));
        }

        let ptr = System.allocate(layout).map_err(|e| {
            self.0.update(Stats::failed);
            e
        })?;
        *self
            .0
            .ledger
            .borrow_mut()
            .entry(ptr.as_ptr() as usize)
            .or_default() += 1;
        self.0.update(|s| s.allocated(layout));
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout)
    {
        let addr = ptr.as_ptr() as usize;
        let known = {
            let mut ledger = self.0.ledger.borrow_mut();
            match ledger.get(&addr).copied() {
                Some(1) => {
                    ledger.remove(&addr);
                    true
                }
                Some(n) => {
                    ledger.insert(addr, n - 1);
                    true
                }
                None => false,
            }
        };

        if known {
            self.0.update(|s| s.deallocated(layout));
            System.deallocate(ptr, layout)
        } else {
            log::debug!("deallocation of unknown address {:#x}", addr);
            self.0.foreign_frees.set(self.0.foreign_frees.get() + 1)
        }
    }
}

impl fmt::Debug for FaultyHeap
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("FaultyHeap")
            .field("countdown", &self.0.countdown.get())
            .field("live", &self.live())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn fails_exactly_the_nth()
    {
        let heap = FaultyHeap::new();
        let layout = Layout::new::<u32>();
        heap.fail_nth(3);

        let a = heap.allocate(layout).unwrap();
        let b = heap.allocate(layout).unwrap();
        assert!(heap.armed());
        assert_eq!(heap.allocate(layout), Err(AllocError::new(layout)));
        assert!(!heap.armed());
        let c = heap.allocate(layout).unwrap();

        assert_eq!(heap.live(), 3);
        assert_eq!(heap.stats().failures, 1);
        unsafe {
            heap.deallocate(a, layout);
            heap.deallocate(b, layout);
            heap.deallocate(c, layout);
        }
        assert_eq!(heap.live(), 0);
        assert_eq!(heap.stats().live_objects(), 0);
    }

    #[test]
    fn clones_share_the_ledger()
    {
        let heap = FaultyHeap::new();
        let other = heap.clone();
        let layout = Layout::new::<u64>();
        let p = other.allocate(layout).unwrap();
        assert!(heap.is_live(p));
        unsafe { heap.deallocate(p, layout) }
        assert!(!other.is_live(p));
    }

    #[test]
    fn double_free_is_observed()
    {
        let heap = FaultyHeap::new();
        let layout = Layout::new::<u8>();
        let p = heap.allocate(layout).unwrap();
        unsafe {
            heap.deallocate(p, layout);
            heap.deallocate(p, layout);
        }
        assert_eq!(heap.foreign_frees(), 1);
    }
}
