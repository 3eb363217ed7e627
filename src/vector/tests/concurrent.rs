use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rand::Rng;

use crate::vector::prelude::*;

const THREADS: usize = 4;

#[test]
fn concurrent_pushes_keep_every_value() {
    const PER_THREAD: usize = 10_000;

    let vector = Arc::new(LockFreeVector::new());

    let mut handles = Vec::new();
    for thread_id in 0..THREADS {
        let vector = Arc::clone(&vector);
        handles.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                vector.push_back((thread_id * PER_THREAD + i) as u64).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(vector.size(), THREADS * PER_THREAD);
    assert_eq!(vector.counter(), (THREADS * PER_THREAD) as u64);

    // Every pushed value must be present exactly once, at some index.
    let mut seen = HashSet::new();
    for index in 0..vector.size() {
        let value = vector.read(index);
        assert!((value as usize) < THREADS * PER_THREAD);
        assert!(seen.insert(value), "value {} appeared twice", value);
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

#[test]
fn concurrent_pops_drain_every_value_exactly_once() {
    const TOTAL: usize = 10_000;

    let vector = Arc::new(LockFreeVector::new());
    for i in 0..TOTAL {
        vector.push_back(i as u64).unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let vector = Arc::clone(&vector);
        handles.push(thread::spawn(move || {
            let mut popped = Vec::new();
            while let Ok(value) = vector.pop_back() {
                popped.push(value);
            }
            popped
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for value in handle.join().unwrap() {
            assert!(seen.insert(value), "value {} popped twice", value);
            total += 1;
        }
    }

    assert_eq!(total, TOTAL);
    assert_eq!(vector.size(), 0);
    assert_eq!(vector.pop_back(), Err(Error::Empty));
}

#[test]
fn random_mixed_workload_balances_the_books() {
    const OPS: usize = 100_000;

    let vector = Arc::new(LockFreeVector::new());
    let pushes = Arc::new(AtomicUsize::new(0));
    let pops = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for thread_id in 0..THREADS {
        let vector = Arc::clone(&vector);
        let pushes = Arc::clone(&pushes);
        let pops = Arc::clone(&pops);
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for i in 0..OPS {
                match rng.gen_range(0..4) {
                    0 | 1 => {
                        vector.push_back((thread_id * OPS + i) as u64).unwrap();
                        pushes.fetch_add(1, Ordering::Relaxed);
                    }
                    2 => {
                        if vector.pop_back().is_ok() {
                            pops.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    _ => {
                        // Slots stay allocated even when concurrent pops
                        // shrink the announced size, so a stale index is
                        // harmless here.
                        let size = vector.size();
                        if size > 0 {
                            let index = rng.gen_range(0..size);
                            if i % 2 == 0 {
                                vector.write(index, u64::MAX);
                            } else {
                                let _ = vector.read(index);
                            }
                        }
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let pushed = pushes.load(Ordering::Relaxed);
    let popped = pops.load(Ordering::Relaxed);
    assert_eq!(vector.size(), pushed - popped);
    assert_eq!(vector.counter(), (pushed + popped) as u64);
}

#[test]
fn write_read_storm_returns_only_known_values() {
    const SLOTS: usize = 1_000;
    const ITERS: usize = 100_000;
    // Written values are tagged far above any pushed value, and carry the
    // slot index so a read can pin down exactly what it saw.
    const TAG: u64 = 1 << 32;

    let vector = Arc::new(LockFreeVector::new());
    for i in 0..SLOTS {
        vector.push_back(i as u64).unwrap();
    }

    let writer = {
        let vector = Arc::clone(&vector);
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..ITERS {
                let index = rng.gen_range(0..SLOTS);
                vector.write(index, TAG + index as u64);
            }
        })
    };

    let reader = {
        let vector = Arc::clone(&vector);
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..ITERS {
                let index = rng.gen_range(0..SLOTS);
                let value = vector.read(index);
                assert!(
                    value == index as u64 || value == TAG + index as u64,
                    "index {} held {}, which was never pushed nor written",
                    index,
                    value
                );
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(vector.size(), SLOTS);
}

#[test]
fn racing_growth_installs_buckets_exactly_once() {
    const PER_THREAD: usize = 4;

    let vector = Arc::new(LockFreeVector::new());
    for i in 0..8u64 {
        vector.push_back(i).unwrap();
    }

    // Eight threads all push across the bucket 0 -> 1 -> 2 boundaries.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let vector = Arc::clone(&vector);
        handles.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                vector.push_back(i as u64).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(vector.size(), 40);
    // 40 elements need exactly buckets 0 (8), 1 (16), and 2 (32).
    assert_eq!(vector.capacity(), 56);
}
