//! A reference-counted box with explicit copy-on-write.
//!
//! `RefCountedBox` shares one heap value among any number of sibling handles
//! through a plain, non-atomic count. Copying a handle (`Clone`) is
//! infallible and never allocates. `detach` gives one handle its own copy of
//! the value, and either succeeds completely or leaves the handle and all its
//! siblings exactly as they were.
//!
//! All storage comes from a `Heap`, which reports exhaustion as a recoverable
//! `AllocError`. `System` is the process allocator; `FaultyHeap` fails a
//! chosen allocation on purpose and keeps a ledger of what is still live, so
//! the failure paths can be tested deterministically.
//!
//! ```
//! use rcbox::RefCountedBox;
//!
//! let mut a = RefCountedBox::try_new(3.14).unwrap();
//! let b = a.clone();
//! assert_eq!(b.ref_count(), 2);
//!
//! assert!(a.detach().unwrap());
//! assert_eq!((a.ref_count(), b.ref_count()), (1, 1));
//! assert_eq!(a.get(), b.get());
//! ```

pub mod allocator;
pub mod error;
pub mod faults;
#[cfg(feature = "global")]
pub(crate) mod global_ledger;
pub mod harness;
pub mod pointers;
pub mod raw_box;
pub mod stats;


pub use allocator::{Heap, System};
pub use error::{AdoptError, AllocError, Error, InvalidAccess};
pub use faults::FaultyHeap;
#[cfg(feature = "global")]
pub use global_ledger::global_stats;
pub use pointers::RefCountedBox;
pub use raw_box::RawBox;
pub use stats::Stats;
