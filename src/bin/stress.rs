//! Sustained concurrent append/clear/iterate stress driver.
//!
//! Generalizes the reference implementation's `stress-msq` binary: instead
//! of hammering a single queue type, it runs producers appending, a
//! background clearer, and readers taking snapshots concurrently, in a
//! tight loop, so that a build with a memory-ordering bug or a reclamation
//! race has a good chance of tripping an assertion or crashing under a
//! sanitizer.
//!
//! The clearer runs for the whole round, not just after the producers join:
//! `clear` is specified to be safe to run concurrently with `append`, and the
//! only way to exercise that honestly is to actually race them instead of
//! serializing "append everything, then clear."

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use snapchain::Chain;

const PRODUCERS: usize = 4;
const READERS: usize = 4;
const VALUES_PER_PRODUCER: u64 = 10_000;
const ROUNDS: usize = 20;

fn one_round() {
    let chain = Arc::new(Chain::new());
    let stop = Arc::new(AtomicBool::new(false));

    thread::scope(|scope| {
        for p in 0..PRODUCERS {
            let chain = chain.clone();
            scope.spawn(move || {
                let base = (p as u64) * VALUES_PER_PRODUCER;
                for i in 0..VALUES_PER_PRODUCER {
                    chain.append(base + i);
                }
            });
        }

        {
            let chain = chain.clone();
            let stop = stop.clone();
            scope.spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    chain.clear();
                }
            });
        }

        for _ in 0..READERS {
            let chain = chain.clone();
            let stop = stop.clone();
            scope.spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    // `clear` may shrink `len` at any moment, so the only
                    // invariant a reader can check here is internal to a
                    // single snapshot: its traversal must yield exactly the
                    // length it froze at creation, never less. A `Chain` that
                    // ever published a tail whose head had already been
                    // cleared would show up here as `counted < expected`.
                    let snapshot = chain.iter();
                    let expected = snapshot.len();
                    let counted = snapshot.count();
                    assert_eq!(counted, expected);
                }
            });
        }

        // Let readers, the clearer, and the producers race for a bit, then
        // let everything wind down.
        thread::sleep(std::time::Duration::from_millis(5));
        stop.store(true, Ordering::Relaxed);
    });

    let snapshot = chain.iter();
    assert_eq!(snapshot.count(), snapshot.len());

    chain.clear();
    assert_eq!(chain.len(), 0);
}

fn main() {
    for round in 0..ROUNDS {
        one_round();
        println!("round {round} ok");
    }
}
