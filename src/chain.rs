use std::fmt;
use std::ptr;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::mem::{AtomicLink, CachePadded};
use crate::node::{Node, ReclaimHook};
use crate::snapshot::Snapshot;

/// The chain's head and tail, published together as a single unit.
///
/// `append` and `clear` each replace a whole `Anchor` rather than touching
/// head and tail as two independent atomics: that's what rules out an
/// observer ever seeing a non-null tail paired with a null head (or the
/// reverse), which two separate fields cannot guarantee against a `clear`
/// racing an in-flight `append`.
struct Anchor<T> {
    head: Arc<Node<T>>,
    tail: Arc<Node<T>>,
}

/// A lock-free, append-only chain of `T` values, readable through
/// consistent [`Snapshot`]s that never block an appender and are never
/// blocked by one.
///
/// `T` is treated as an opaque, pointer-sized handle: the chain stores it
/// verbatim and never dereferences, copies, or inspects whatever it points
/// to. Use [`Chain::with_reclaim_hook`] to run cleanup code when a handle's
/// node is finally reclaimed.
///
/// Usable with any number of concurrent appenders, clearers, and snapshot
/// readers.
pub struct Chain<T> {
    anchor: CachePadded<AtomicLink<Anchor<T>>>,
    len: CachePadded<AtomicUsize>,
    on_reclaim: Option<ReclaimHook<T>>,
}

unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Send> Sync for Chain<T> {}

impl<T> Chain<T> {
    /// Creates a new, empty chain.
    pub fn new() -> Chain<T> {
        Chain {
            anchor: CachePadded::new(AtomicLink::null()),
            len: CachePadded::new(AtomicUsize::new(0)),
            on_reclaim: None,
        }
    }

    /// Creates a new, empty chain that invokes `hook` on the payload of
    /// every node this chain reclaims (via [`Chain::clear`] or drop) from
    /// now on.
    pub fn with_reclaim_hook<F>(hook: F) -> Chain<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Chain {
            anchor: CachePadded::new(AtomicLink::null()),
            len: CachePadded::new(AtomicUsize::new(0)),
            on_reclaim: Some(Arc::new(hook)),
        }
    }

    /// Returns a recent observation of the number of live elements.
    ///
    /// This is an advisory, racy read: by the time the caller uses the
    /// result, concurrent appends or a concurrent clear may have moved it.
    pub fn len(&self) -> usize {
        self.len.load(Relaxed)
    }

    /// Returns `true` if the most recently observed length was zero.
    ///
    /// Like [`Chain::len`], this is advisory under concurrent access.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `payload` as the new tail element.
    ///
    /// Thread-safe against any concurrent mix of `append`, `clear`, `iter`,
    /// and snapshot traversal. Non-blocking: an appender may retry on CAS
    /// failure, but never spins on another appender's non-trivial work.
    ///
    /// Head and tail are published together as one [`Anchor`], swapped in a
    /// single CAS, rather than as two independent atomics: a `clear` racing
    /// an in-flight append can then only ever replace the *whole* anchor out
    /// from under the appender, never leave a published tail pointing into a
    /// chain whose head has already been cleared.
    pub fn append(&self, payload: T)
    where
        T: Copy,
    {
        let mut node = Arc::new(Node::new(payload, self.on_reclaim.clone()));

        loop {
            match self.anchor.load(Acquire) {
                None => {
                    // The chain is empty: publish `node` as head and tail
                    // simultaneously, via one CAS on the anchor itself, so no
                    // observer can ever see one without the other.
                    let fresh = Arc::new(Anchor {
                        head: node.clone(),
                        tail: node.clone(),
                    });
                    match self.anchor.compare_exchange(ptr::null_mut(), fresh, Release, Relaxed) {
                        Ok(()) => break,
                        Err(_) => continue,
                    }
                }
                Some(anchor) => {
                    let anchor_raw = Arc::as_ptr(&anchor) as *mut Anchor<T>;
                    match anchor.tail.next.compare_exchange(
                        ptr::null_mut(),
                        node.clone(),
                        Release,
                        Relaxed,
                    ) {
                        Ok(()) => {
                            // Linked onto the old tail. Swinging the anchor
                            // to the same head with our node as the new tail
                            // is append's true publish point, not the link
                            // above. If it fails, a concurrent `clear`
                            // replaced the anchor out from under us: our node
                            // is already linked onto a tail no longer
                            // reachable from any live anchor, so it's inert
                            // garbage that drops with the orphaned anchor.
                            // Retry with a fresh node against whatever anchor
                            // clear left behind, rather than resurrecting a
                            // tail the chain has already moved on from.
                            let advanced = Arc::new(Anchor {
                                head: anchor.head.clone(),
                                tail: node.clone(),
                            });
                            match self.anchor.compare_exchange(anchor_raw, advanced, Release, Relaxed)
                            {
                                Ok(()) => break,
                                Err(_) => {
                                    node = Arc::new(Node::new(payload, self.on_reclaim.clone()));
                                    continue;
                                }
                            }
                        }
                        Err(returned) => {
                            node = returned;
                            // Someone else already linked past this (stale)
                            // tail. Help swing the shared anchor forward onto
                            // their successor instead of spinning purely on
                            // our own CAS.
                            if let Some(successor) = anchor.tail.next.load(Acquire) {
                                let helped = Arc::new(Anchor {
                                    head: anchor.head.clone(),
                                    tail: successor,
                                });
                                let _ = self.anchor.compare_exchange(
                                    anchor_raw,
                                    helped,
                                    Release,
                                    Relaxed,
                                );
                            }
                            continue;
                        }
                    }
                }
            }
        }

        self.len.fetch_add(1, Release);
    }

    /// Atomically resets the chain to empty.
    ///
    /// Outstanding snapshots are entirely unaffected: their frozen length,
    /// head, and cursor remain valid and drivable. Any append that
    /// linearizes before this call is visible to snapshots taken before it;
    /// any append that linearizes after starts a fresh chain. Because head
    /// and tail live inside one `Anchor`, this single `take` is the whole
    /// reset: there is no window in which a reader could observe a tail
    /// without the matching head.
    pub fn clear(&self) {
        self.anchor.take(Release);
        self.len.store(0, Release);
    }

    /// Takes a consistent snapshot of the chain, usable as a forward-only
    /// [`Iterator`] from the calling thread.
    ///
    /// The snapshot's length is frozen at the value observed at this call;
    /// elements appended afterward are never observed by it, and elements
    /// appended (and linearized) before it are always observed by it.
    pub fn iter(&self) -> Snapshot<T> {
        let head = self.anchor.load(Acquire).map(|anchor| anchor.head.clone());
        let len = self.len.load(Acquire);
        Snapshot::new(head, len)
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Chain<T> {
        Chain::new()
    }
}

impl<T: fmt::Debug + Copy> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}
