//! An atomic, reference-counted, nullable link.
//!
//! This is the one place in the crate unsafe code lives. `AtomicLink<T>`
//! behaves like `Atomic<Option<Arc<T>>>` built directly on
//! `AtomicPtr` and `Arc`'s own strong-count bookkeeping: every raw pointer
//! that ever sits inside the atomic slot corresponds to exactly one strong
//! reference, "owned" by the slot itself until it's loaded out, swapped out,
//! or compare-exchanged away.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// An atomically-updated, nullable `Arc<T>`.
pub struct AtomicLink<T> {
    ptr: AtomicPtr<T>,
}

unsafe impl<T: Send + Sync> Send for AtomicLink<T> {}
unsafe impl<T: Send + Sync> Sync for AtomicLink<T> {}

fn into_raw<T>(val: Option<Arc<T>>) -> *mut T {
    match val {
        Some(arc) => Arc::into_raw(arc) as *mut T,
        None => ptr::null_mut(),
    }
}

unsafe fn from_raw<T>(raw: *mut T) -> Option<Arc<T>> {
    if raw.is_null() {
        None
    } else {
        Some(unsafe { Arc::from_raw(raw as *const T) })
    }
}

impl<T> AtomicLink<T> {
    /// Creates a new, null link.
    pub fn null() -> AtomicLink<T> {
        AtomicLink {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Creates a new link pointing at `value`.
    pub fn new(value: Arc<T>) -> AtomicLink<T> {
        AtomicLink {
            ptr: AtomicPtr::new(Arc::into_raw(value) as *mut T),
        }
    }

    /// Loads the current value, bumping its strong count if non-null.
    ///
    /// The returned `Arc`, if any, is an independent owning reference: the
    /// slot keeps its own.
    pub fn load(&self, order: Ordering) -> Option<Arc<T>> {
        let raw = self.ptr.load(order);
        if raw.is_null() {
            return None;
        }
        // SAFETY: `raw` came from a live `Arc::into_raw` and the slot keeps
        // that allocation reachable for at least as long as we hold a
        // reference to `self`, so bumping the count and reconstructing a
        // second owning `Arc` from the same address is sound.
        unsafe {
            Arc::increment_strong_count(raw);
            Some(Arc::from_raw(raw))
        }
    }

    /// Unconditionally stores `value`, dropping whatever reference the slot
    /// previously held.
    pub fn store(&self, value: Arc<T>, order: Ordering) {
        let new_raw = Arc::into_raw(value) as *mut T;
        let old_raw = self.ptr.swap(new_raw, order);
        // SAFETY: `old_raw` was produced by a prior `into_raw`/successful CAS
        // into this slot, so the slot held the sole "slot-owned" strong
        // reference to it; we are the ones releasing that reference now.
        drop(unsafe { from_raw(old_raw) });
    }

    /// Swaps the slot to null, returning whatever it held.
    pub fn take(&self, order: Ordering) -> Option<Arc<T>> {
        let old_raw = self.ptr.swap(ptr::null_mut(), order);
        // SAFETY: see `store`.
        unsafe { from_raw(old_raw) }
    }

    /// Compare-and-swaps the slot from `current` (compared by address) to
    /// `new`.
    ///
    /// On success, the slot's previous reference (if any) is dropped and
    /// ownership of `new` moves into the slot. On failure, `new` is handed
    /// back to the caller untouched.
    pub fn compare_exchange(
        &self,
        current: *mut T,
        new: Arc<T>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<(), Arc<T>> {
        let new_raw = Arc::into_raw(new) as *mut T;
        match self
            .ptr
            .compare_exchange(current, new_raw, success, failure)
        {
            Ok(old_raw) => {
                // SAFETY: see `store`.
                drop(unsafe { from_raw(old_raw) });
                Ok(())
            }
            Err(_) => {
                // The CAS never took effect, so nothing was moved out of
                // `new_raw` into the slot; reclaim it as an owned `Arc` again.
                let new = unsafe { Arc::from_raw(new_raw) };
                Err(new)
            }
        }
    }

    /// Returns the raw address currently in the slot, for use as the
    /// `current` argument to a later `compare_exchange`. Does not affect
    /// the strong count.
    pub fn as_raw(&self, order: Ordering) -> *mut T {
        self.ptr.load(order)
    }
}

impl<T> Drop for AtomicLink<T> {
    fn drop(&mut self) {
        let raw = self.ptr.load(Ordering::Relaxed);
        // SAFETY: see `store`; this is the slot's final release of whatever
        // reference it still owns.
        drop(unsafe { from_raw(raw) });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::Ordering::SeqCst;

    #[test]
    fn null_link_loads_none() {
        let link: AtomicLink<u32> = AtomicLink::null();
        assert!(link.load(SeqCst).is_none());
    }

    #[test]
    fn store_then_load_roundtrips() {
        let link = AtomicLink::new(Arc::new(7u32));
        let loaded = link.load(SeqCst).unwrap();
        assert_eq!(*loaded, 7);
        // the slot still holds its own reference
        assert_eq!(Arc::strong_count(&loaded), 2);
    }

    #[test]
    fn take_removes_the_slots_reference() {
        let link = AtomicLink::new(Arc::new(9u32));
        let taken = link.take(SeqCst).unwrap();
        assert_eq!(*taken, 9);
        assert_eq!(Arc::strong_count(&taken), 1);
        assert!(link.load(SeqCst).is_none());
    }

    #[test]
    fn compare_exchange_succeeds_against_null() {
        let link: AtomicLink<u32> = AtomicLink::null();
        let new = Arc::new(3u32);
        let result = link.compare_exchange(ptr::null_mut(), new, SeqCst, SeqCst);
        assert!(result.is_ok());
        assert_eq!(*link.load(SeqCst).unwrap(), 3);
    }

    #[test]
    fn compare_exchange_fails_and_returns_ownership() {
        let link = AtomicLink::new(Arc::new(1u32));
        let new = Arc::new(2u32);
        let result = link.compare_exchange(ptr::null_mut(), new, SeqCst, SeqCst);
        match result {
            Err(returned) => assert_eq!(*returned, 2),
            Ok(()) => panic!("compare_exchange should not have succeeded"),
        }
        assert_eq!(*link.load(SeqCst).unwrap(), 1);
    }
}
