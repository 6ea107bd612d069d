//! Disjoint parallel writes into one buffer.

use std::marker::PhantomData;
use std::ops::Range;

/// A mutable slice that several workers write through at once.
///
/// Soundness rests on the caller: two live sub-slices must never overlap.
/// The engine guarantees this by deriving every range from a package index
/// that the [`PackageDispatcher`](crate::partition::PackageDispatcher) handed
/// out exactly once.
pub(crate) struct SharedSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// Safety: access is only through `slice_mut`/`write`, whose callers promise
// disjoint ranges; `T: Send` is what moving writes across threads requires.
unsafe impl<T: Send> Send for SharedSlice<'_, T> {}
unsafe impl<T: Send> Sync for SharedSlice<'_, T> {}

impl<'a, T> SharedSlice<'a, T> {
    pub(crate) fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// # Safety
    ///
    /// No other reference obtained from this `SharedSlice` may overlap
    /// `range` while the returned slice is alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slice_mut(&self, range: Range<usize>) -> &'a mut [T] {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "shared slice range {:?} out of bounds (len {})",
            range,
            self.len
        );
        std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.end - range.start)
    }

    /// # Safety
    ///
    /// No other reference obtained from this `SharedSlice` may cover `index`.
    #[inline]
    pub(crate) unsafe fn write(&self, index: usize, value: T) {
        assert!(index < self.len, "shared slice index {} out of bounds", index);
        self.ptr.add(index).write(value);
    }
}
