//! Memory-management primitives the core is built on.
//!
//! Everything under this module is an implementation detail of [`Chain`] and
//! [`Snapshot`][crate::Snapshot]; it's `pub` only so the doc comments render,
//! not because callers are expected to reach for it directly.
//!
//! [`Chain`]: crate::Chain

mod atomic_link;
mod cache_padded;

pub use self::atomic_link::AtomicLink;
pub use self::cache_padded::CachePadded;
