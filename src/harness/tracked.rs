use std::cell::Cell;

thread_local! {
    static LIVE: Cell<usize> = const { Cell::new(0) };
    static COPIES: Cell<usize> = const { Cell::new(0) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>, up: bool)
{
    counter.with(|c| {
        c.set(if up {
            c.get() + 1
        } else {
            c.get().saturating_sub(1)
        })
    })
}

/// A value that counts its own live instances in the current thread.
///
/// Every construction and `Clone` adds one to `live()`, every drop takes one
/// away; `copies()` counts clones and `clone_from`s.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tracked
{
    pub value: i32,
}

impl Tracked
{
    pub fn new(value: i32) -> Self
    {
        bump(&LIVE, true);
        Tracked { value }
    }

    pub fn live() -> usize { LIVE.with(Cell::get) }

    pub fn copies() -> usize { COPIES.with(Cell::get) }
}

impl Default for Tracked
{
    fn default() -> Self { Self::new(0) }
}

impl Clone for Tracked
{
    fn clone(&self) -> Self
    {
        bump(&COPIES, true);
        Self::new(self.value)
    }

    fn clone_from(&mut self, source: &Self)
    {
        bump(&COPIES, true);
        self.value = source.value;
    }
}

impl Drop for Tracked
{
    fn drop(&mut self) { bump(&LIVE, false) }
}

impl PartialEq<i32> for Tracked
{
    fn eq(&self, other: &i32) -> bool { self.value == *other }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn counts_instances()
    {
        let start = Tracked::live();
        let copies = Tracked::copies();
        {
            let a = Tracked::new(7);
            let mut b = a.clone();
            assert_eq!(Tracked::live(), start + 2);
            b.clone_from(&Tracked::new(9));
            assert_eq!(b, 9);
            assert_eq!(a, 7);
        }
        assert_eq!(Tracked::live(), start);
        assert_eq!(Tracked::copies(), copies + 2);
    }
}
