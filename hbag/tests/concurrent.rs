use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc, Barrier,
    },
    thread,
};

use hbag::Bag;

const THREADS: usize = 16;
const ROUNDS: u64 = 1_000;

#[test]
fn concurrent_inserts_are_not_lost() {
    let bag = Bag::new();
    let barrier = Barrier::new(THREADS);
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..ROUNDS {
                    bag.insert("x");
                }
            });
        }
    });

    let expected = THREADS as u64 * ROUNDS;
    assert_eq!(Some(expected), bag.contains("x"));
    assert_eq!(expected, bag.len());
    assert_eq!(1, bag.uniq_len());
}

#[test]
fn concurrent_insert_remove_pairs_cancel_out() {
    let bag = Bag::from([("x", 1)]);
    thread::scope(|s| {
        for i in 0..THREADS {
            let bag = &bag;
            s.spawn(move || {
                let key = if i % 2 == 0 { "x" } else { "y" };
                for _ in 0..ROUNDS {
                    bag.insert(key);
                    assert!(bag.remove(key) >= 1);
                }
            });
        }
    });

    assert_eq!(HashMap::from([("x", 1)]), bag.snapshot());
    assert_eq!(1, bag.len());
}

#[test]
fn readers_never_observe_a_zero_count() {
    let bag = Bag::new();
    let done = AtomicBool::new(false);
    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..ROUNDS {
                bag.insert_many("x", 3);
                bag.remove("x");
                bag.remove("x");
                bag.remove("x");
            }
            done.store(true, SeqCst);
        });
        for _ in 0..4 {
            s.spawn(|| {
                while !done.load(SeqCst) {
                    assert_ne!(Some(0), bag.contains("x"));
                    let snapshot = bag.snapshot();
                    assert!(snapshot.values().all(|c| *c > 0), "{snapshot:?}");
                }
            });
        }
    });

    assert!(bag.is_empty());
}

#[test]
fn crossing_merges_terminate() {
    let a = Bag::from([("apple", 1)]);
    let b = Bag::from([("banana", 1)]);
    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..20 {
                a.merge(&b);
            }
        });
        s.spawn(|| {
            for _ in 0..20 {
                b.merge(&a);
            }
        });
    });

    assert!(a.count("apple") >= 1);
    assert!(b.count("banana") >= 1);
    assert_eq!(a.len(), a.snapshot().values().sum::<u64>());
    assert_eq!(b.len(), b.snapshot().values().sum::<u64>());
}

// The writer only ever adds both keys at once, so any atomic read sees equal counts.
#[test]
fn merge_reads_a_consistent_source() {
    let source = Bag::from([("left", 1), ("right", 1)]);
    let pair = Bag::from([("left", 1), ("right", 1)]);
    let done = AtomicBool::new(false);
    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..ROUNDS {
                source.merge(&pair);
            }
            done.store(true, SeqCst);
        });
        s.spawn(|| {
            while !done.load(SeqCst) {
                let target = Bag::new();
                target.merge(&source);
                let merged = target.snapshot();
                assert_eq!(2, merged.len(), "{target:?}");
                assert_eq!(merged.get("left"), merged.get("right"), "{target:?}");
                assert_eq!(0, target.len() % 2, "{target:?}");
                assert_eq!(target.len(), merged.values().sum::<u64>());
            }
        });
    });

    assert_eq!(2 + 2 * ROUNDS, source.len());
    assert_eq!(Some(ROUNDS + 1), source.contains("left"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn inserts_from_tasks() {
    let bag = Arc::new(Bag::with_capacity(1));
    let tasks: Vec<_> = (0..THREADS)
        .map(|i| {
            let bag = bag.clone();
            tokio::spawn(async move {
                for _ in 0..ROUNDS {
                    bag.insert(i % 4);
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked");
    }

    assert_eq!(THREADS as u64 * ROUNDS, bag.len());
    assert_eq!(4, bag.uniq_len());
    assert_eq!(Some(4 * ROUNDS), bag.contains(&0));
    assert!(!bag.is_uniq());
}
