//! Process-wide allocation ledger for the `System` heap.

use std::alloc::Layout;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::stats::Stats;

lazy_static! {
    static ref LEDGER: Mutex<Stats> = Mutex::new(Stats::default());
}

pub(crate) fn record_allocation(layout: Layout, succeeded: bool)
{
    let mut ledger = LEDGER.lock();
    if succeeded {
        ledger.allocated(layout)
    } else {
        ledger.failed()
    }
}

pub(crate) fn record_deallocation(layout: Layout) { LEDGER.lock().deallocated(layout) }

/// Snapshot of every allocation the `System` heap has served in this
/// process. The ledger only grows; subtract snapshots to measure a span.
pub fn global_stats() -> Stats { *LEDGER.lock() }

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn records_are_visible()
    {
        // other tests share the ledger, so only monotonic growth is checked
        let before = global_stats();
        record_allocation(Layout::new::<u16>(), true);
        record_allocation(Layout::new::<u16>(), false);
        record_deallocation(Layout::new::<u16>());
        let diff = global_stats() - before;
        assert!(diff.allocations >= 1);
        assert!(diff.failures >= 1);
        assert!(diff.deallocations >= 1);
    }
}
