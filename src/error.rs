use std::{alloc::Layout, error, fmt};

use thiserror::Error;

use crate::{allocator::Heap, raw_box::RawBox};

/// The heap could not satisfy an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory allocation of {} bytes failed", .layout.size())]
pub struct AllocError
{
    pub layout: Layout,
}

impl AllocError
{
    pub fn new(layout: Layout) -> Self { Self { layout } }
}

/// Access through a box that owns nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid access: box is empty")]
pub struct InvalidAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error
{
    #[error(transparent)]
    OutOfMemory(#[from] AllocError),

    #[error(transparent)]
    InvalidAccess(#[from] InvalidAccess),
}

/// Failure to adopt a raw box. The raw box is handed back untouched, the
/// caller still owns it.
pub struct AdoptError<T: 'static, H: Heap>
{
    pub(crate) error: AllocError,
    pub(crate) raw: RawBox<T, H>,
}

impl<T: 'static, H: Heap> AdoptError<T, H>
{
    pub fn alloc_error(&self) -> AllocError { self.error }

    pub fn raw_box(&self) -> &RawBox<T, H> { &self.raw }

    pub fn into_raw_box(self) -> RawBox<T, H> { self.raw }
}

impl<T: 'static, H: Heap> fmt::Debug for AdoptError<T, H>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("AdoptError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T: 'static, H: Heap> fmt::Display for AdoptError<T, H>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "could not adopt raw box: {}", self.error)
    }
}

impl<T: 'static, H: Heap> error::Error for AdoptError<T, H>
{
    fn source(&self) -> Option<&(dyn error::Error + 'static)> { Some(&self.error) }
}

impl<T: 'static, H: Heap> From<AdoptError<T, H>> for AllocError
{
    fn from(it: AdoptError<T, H>) -> Self { it.error }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn messages()
    {
        let e = AllocError::new(Layout::new::<u64>());
        assert_eq!(e.to_string(), "memory allocation of 8 bytes failed");
        assert_eq!(Error::from(e).to_string(), e.to_string());
        assert_eq!(
            Error::from(InvalidAccess).to_string(),
            "invalid access: box is empty"
        );
    }
}
