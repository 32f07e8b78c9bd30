//! The numbered scenarios, one behaviour each.

use std::ptr;

use anyhow::{bail, ensure, Result};

use super::Tracked;
use crate::{
    allocator::System,
    error::{AllocError, InvalidAccess},
    faults::FaultyHeap,
    pointers::RefCountedBox,
    raw_box::RawBox,
};

pub const SCENARIO_COUNT: u32 = 27;

type Doubles = RefCountedBox<f64, FaultyHeap>;
type Items = RefCountedBox<Tracked, FaultyHeap>;
type Ints = RefCountedBox<i32, System>;

/// One empty box, one owning 3.14 and two more empty ones, all on the same
/// ledgered heap.
struct Fixture
{
    heap: FaultyHeap,
    dsp0: Doubles,
    dsp1: Doubles,
    dsp2: Doubles,
    dsp3: Doubles,
}

impl Fixture
{
    fn new() -> Result<Self>
    {
        let heap = FaultyHeap::new();
        Ok(Fixture {
            dsp0: Doubles::empty(),
            dsp1: Doubles::try_new_in(3.14, heap.clone())?,
            dsp2: Doubles::empty(),
            dsp3: Doubles::empty(),
            heap,
        })
    }

    /// `dsp3 = dsp2 = dsp1`
    fn chain(&mut self)
    {
        self.dsp2.clone_from(&self.dsp1);
        self.dsp3.clone_from(&self.dsp2);
    }
}

fn item(value: i32, heap: &FaultyHeap) -> Result<Items>
{
    Ok(Items::try_new_in(Tracked::new(value), heap.clone())?)
}

pub fn run(n: u32) -> Result<()>
{
    let mut f = Fixture::new()?;
    match n {
        1 => ensure!(f.dsp0.ref_count() == 0),
        2 => ensure!(f.dsp1.ref_count() == 1),
        3 => {
            f.dsp0.clone_from(&f.dsp1);
            ensure!(f.dsp0.ref_count() == 2);
        }
        4 => {
            f.chain();
            ensure!(f.dsp3.ref_count() == f.dsp2.ref_count());
            ensure!(f.dsp1.ref_count() == f.dsp2.ref_count());
            ensure!(f.dsp1.ref_count() == 3);
        }
        5 => {
            f.dsp1.clone_from(&f.dsp0);
            ensure!(f.dsp1.ref_count() == 0 && f.dsp2.ref_count() == 0);
            ensure!(f.heap.live() == 0, "sole owner released its value");
        }
        6 => signatures(),
        7 => {
            {
                let _osp0 = item(0, &f.heap)?;
                ensure!(Tracked::live() == 1);
            }
            ensure!(Tracked::live() == 0);
        }
        8 => {
            {
                let osp0 = item(0, &f.heap)?;
                let mut osp1 = Items::empty();
                osp1.clone_from(&osp0);
                ensure!(Tracked::live() == 1);
            }
            ensure!(Tracked::live() == 0);
        }
        9 => {
            {
                let osp0 = item(0, &f.heap)?;
                let osp1 = osp0.clone();
                ensure!(osp0.ref_count() == 2 && osp1.ref_count() == 2);
                ensure!(Tracked::live() == 1);
            }
            ensure!(Tracked::live() == 0);
        }
        10 | 12 => {
            {
                let mut osp0 = item(0, &f.heap)?;
                ensure!(osp0.ref_count() == 1);
                let osp1 = osp0.take();
                ensure!(osp1.ref_count() == 1 && osp0.ref_count() == 0);
                ensure!(Tracked::live() == 1);
            }
            ensure!(Tracked::live() == 0);
        }
        11 | 13 => {
            {
                let mut osp0 = item(0, &f.heap)?;
                let mut osp1 = Items::empty();
                ensure!(osp1.ref_count() == 0);
                osp1 = osp0.take();
                ensure!(osp1.ref_count() == 1 && osp0.ref_count() == 0);
                ensure!(Tracked::live() == 1);
            }
            ensure!(Tracked::live() == 0);
        }
        14 => {
            {
                let osp0 = Items::empty();
                let mut osp1 = Items::empty();
                osp1.clone_from(&osp0);
                ensure!(Tracked::live() == 0 && osp1.is_empty());
            }
            ensure!(Tracked::live() == 0);
        }
        15 => ensure!(f.dsp0.get() == Err(InvalidAccess)),
        16 => {
            let osp = item(42, &f.heap)?;
            let value = osp.get()?;
            ensure!(*value == 42);
        }
        17 => {
            let osp = Items::empty();
            ensure!(osp.get().map(|t| t.value) == Err(InvalidAccess));
        }
        18 => {
            let osp = item(42, &f.heap)?;
            let value = osp.project(|t| &t.value)?;
            ensure!(*value == 42);
        }
        19 => {
            let osp = Items::empty();
            ensure!(osp.project(|t| &t.value) == Err(InvalidAccess));
        }
        20 => {
            let (copied0, copied1) = (f.dsp0.detach()?, f.dsp1.detach()?);
            ensure!(!copied0 && !copied1);
            ensure!(f.dsp1.ref_count() == 1);
        }
        21 => {
            f.chain();
            let copied = f.dsp1.detach()?;
            ensure!(copied);
            ensure!(f.dsp1.ref_count() == 1);
            ensure!(f.dsp2.ref_count() == 2 && f.dsp3.ref_count() == 2);
            let (a, b, c) = (*f.dsp1.get()?, *f.dsp2.get()?, *f.dsp3.get()?);
            ensure!(a == 3.14 && b == 3.14 && c == 3.14);
        }
        22 | 23 => {
            f.chain();
            let before = f.heap.live();
            f.heap.fail_nth(if n == 22 { 1 } else { 2 });
            ensure!(f.dsp1.detach().is_err(), "detach should report the failure");
            f.heap.fail_nth(0);
            let (a, b) = (*f.dsp1.get()?, *f.dsp2.get()?);
            ensure!(a == b);
            ensure!(f.dsp1.ref_count() == f.dsp2.ref_count() && f.dsp1.ref_count() == 3);
            ensure!(f.dsp1.ptr_eq(&f.dsp2));
            ensure!(f.heap.live() == before, "failed detach leaked storage");
        }
        24 => {
            f.chain();
            let (a, b, c) = (*f.dsp1.get()?, *f.dsp2.get()?, *f.dsp3.get()?);
            ensure!(a == b && b == c && a == 3.14);
            ensure!(f.dsp1.ref_count() == f.dsp2.ref_count());
            ensure!(f.dsp2.ref_count() == f.dsp3.ref_count() && f.dsp1.ref_count() == 3);
        }
        25 => {
            f.chain();
            f.dsp3.clone_from(&f.dsp0);
            let (a, b) = (*f.dsp1.get()?, *f.dsp2.get()?);
            ensure!(a == b && a == 3.14);
            ensure!(f.dsp1.ref_count() == 2 && f.dsp2.ref_count() == 2);
            ensure!(f.dsp3.ref_count() == 0);
        }
        26 => {
            let raw = RawBox::try_new_in(Tracked::new(0), f.heap.clone())?;
            let saved: *const Tracked = &*raw;
            f.heap.fail_nth(1);
            match Items::try_adopt(raw) {
                Ok(_) => bail!("adopting should have failed"),
                Err(e) => {
                    ensure!(Tracked::live() == 1, "refused value must survive");
                    let raw = e.into_raw_box();
                    ensure!(ptr::eq(&*raw, saved));
                }
            }
            ensure!(Tracked::live() == 0);
        }
        27 => {
            let items_before = f.heap.live();
            f.heap.fail_nth(2);
            ensure!(item(0, &f.heap).is_err(), "second allocation should fail");
            ensure!(Tracked::live() == 0, "refused value must be destroyed");
            ensure!(f.heap.live() == items_before);
        }
        _ => bail!("no scenario {}", n),
    }
    Ok(())
}

/// Which operations can fail is part of the contract, so pin it down in
/// the types: copying, moving and counting have no error path.
fn signatures()
{
    let _: fn() -> Ints = Ints::empty;
    let _: fn() -> Ints = Ints::default;
    let _: fn(&Ints) -> Ints = Ints::clone;
    let _: fn(&mut Ints, &Ints) = Ints::clone_from;
    let _: fn(&mut Ints) -> Ints = Ints::take;
    let _: fn(&Ints) -> usize = Ints::ref_count;
    let _: fn(&mut Ints) -> Result<bool, AllocError> = Ints::detach;
    let _: fn(&Ints) -> Result<&i32, InvalidAccess> = Ints::get;
    let _: fn(i32) -> Result<Ints, AllocError> = Ints::try_new;
}
