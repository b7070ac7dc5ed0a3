use std::ops::{Deref, DerefMut};

/// Pads and aligns a value to the size of a cache line.
///
/// Placed around fields that different threads hammer concurrently (head,
/// tail, length) so that one thread's writes to its field don't bounce the
/// cache line another thread is reading.
#[derive(Default, Debug)]
#[repr(align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    /// Wraps `value` in cache-line padding.
    pub fn new(value: T) -> CachePadded<T> {
        CachePadded { value }
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
