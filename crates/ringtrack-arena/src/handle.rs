//! Typed offset handles into an [`Arena`](crate::Arena).
//!
//! A handle is a byte offset plus the type stored there. It is only
//! meaningful for the arena that produced it, and stays valid for that
//! arena's lifetime because allocations are never moved or reused.

use std::fmt;
use std::marker::PhantomData;

/// Location of one `T` inside an arena.
#[must_use]
pub struct Handle<T> {
    pub(crate) offset: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(offset: u64) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// Byte offset of the value within the arena.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the referenced value in bytes.
    pub fn size(&self) -> usize {
        std::mem::size_of::<T>()
    }
}

// Manual impls: deriving would require `T: Clone`/`T: PartialEq`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", std::any::type_name::<T>(), self.offset)
    }
}

/// Location of a run of `f64` values inside an arena.
///
/// Element field blocks are placed as `f64` runs in layout order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct SliceHandle {
    pub(crate) offset: u64,
    pub(crate) len: usize,
}

impl SliceHandle {
    pub(crate) fn new(offset: u64, len: usize) -> Self {
        Self { offset, len }
    }

    /// Byte offset of the first value.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of `f64` values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the run is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reports_offset_and_size() {
        let h: Handle<[f64; 3]> = Handle::new(16);
        assert_eq!(h.offset(), 16);
        assert_eq!(h.size(), 24);
        let copy = h;
        assert_eq!(copy, h);
    }

    #[test]
    fn empty_slice_handle() {
        let h = SliceHandle::new(8, 0);
        assert!(h.is_empty());
        assert_eq!(h.offset(), 8);
    }
}
