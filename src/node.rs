use std::fmt;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use crate::mem::AtomicLink;

/// A hook invoked once, with the payload, when a node's last strong
/// reference is released.
pub(crate) type ReclaimHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// One link in the chain: an opaque payload plus a forward pointer that
/// transitions at most once, from null to a successor.
pub(crate) struct Node<T> {
    pub(crate) payload: T,
    pub(crate) next: AtomicLink<Node<T>>,
    pub(crate) on_reclaim: Option<ReclaimHook<T>>,
}

impl<T> Node<T> {
    pub(crate) fn new(payload: T, on_reclaim: Option<ReclaimHook<T>>) -> Node<T> {
        Node {
            payload,
            next: AtomicLink::null(),
            on_reclaim,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("payload", &self.payload).finish()
    }
}

// A chain of `Arc<Node<T>>` can be arbitrarily long, and each node's `next`
// holds a strong reference to its successor. Letting the compiler generate
// a naive recursive `Drop` would walk the whole tail of the chain on the
// call stack the moment the head's last reference is released, overflowing
// the stack for long chains (see the `dropping_a_long_chain` test). Instead
// we manually drain the tail iteratively, the same defensive-iteration
// instinct the reference implementation's SPSC queue uses in its own
// `Drop` impl to walk its cached segment list without recursing.
impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        if let Some(hook) = self.on_reclaim.take() {
            hook(&self.payload);
        }

        let mut next = self.next.take(Relaxed);
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut owned) => {
                    if let Some(hook) = owned.on_reclaim.take() {
                        hook(&owned.payload);
                    }
                    next = owned.next.take(Relaxed);
                    // `owned` drops here: its `on_reclaim` is already `None`
                    // and its `next` is already null, so the recursive call
                    // into this same `Drop` impl is a cheap no-op.
                }
                Err(_still_shared) => break,
            }
        }
    }
}
