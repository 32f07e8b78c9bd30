use std::{alloc::Layout, ops::Sub};

/// Heap usage statistics, for diagnosing memory leaks and the like.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats
{
    /// Successful allocations.
    pub allocations: usize,

    /// Allocations returned to the heap.
    pub deallocations: usize,

    /// Allocation attempts the heap refused.
    pub failures: usize,

    /// Bytes currently handed out.
    pub live_bytes: usize,
}

impl Stats
{
    pub(crate) fn allocated(&mut self, layout: Layout)
    {
        self.allocations += 1;
        self.live_bytes += layout.size();
    }

    pub(crate) fn failed(&mut self) { self.failures += 1; }

    pub(crate) fn deallocated(&mut self, layout: Layout)
    {
        self.deallocations += 1;
        self.live_bytes = self.live_bytes.saturating_sub(layout.size());
    }

    /// Number of allocations not yet returned.
    pub fn live_objects(&self) -> usize { self.allocations.saturating_sub(self.deallocations) }

    /// Attempts of any outcome.
    pub fn attempts(&self) -> usize { self.allocations + self.failures }
}

/// Difference between two snapshots of a monotonic ledger.
impl Sub for Stats
{
    type Output = Stats;

    fn sub(self, earlier: Stats) -> Stats
    {
        Stats {
            allocations: self.allocations.saturating_sub(earlier.allocations),
            deallocations: self.deallocations.saturating_sub(earlier.deallocations),
            failures: self.failures.saturating_sub(earlier.failures),
            live_bytes: self.live_bytes.saturating_sub(earlier.live_bytes),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn bookkeeping()
    {
        let mut s = Stats::default();
        s.allocated(Layout::new::<u32>());
        s.allocated(Layout::new::<u64>());
        s.failed();
        s.deallocated(Layout::new::<u32>());

        assert_eq!(s.live_objects(), 1);
        assert_eq!(s.live_bytes, 8);
        assert_eq!(s.attempts(), 3);

        let before = s;
        s.allocated(Layout::new::<u8>());
        let diff = s - before;
        assert_eq!(diff.allocations, 1);
        assert_eq!(diff.live_bytes, 1);
        assert_eq!(diff.failures, 0);
    }
}
