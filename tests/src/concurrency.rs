use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tiny_table::{AllocOps, TinyTable, Variant};

const THREADS: usize = 4;
const OPS_PER_THREAD: usize = 1000;

/// Disjoint-key allocate/dereference/free cycles from several threads.
/// Aggregate live entries stay far below capacity, so every operation must
/// succeed and every dereference must observe the allocated value.
fn hammer(table: TinyTable) {
    let table = Arc::new(table);
    let failures = Arc::new(AtomicUsize::new(0));
    let mut workers = Vec::new();
    for t in 0..THREADS {
        let table = Arc::clone(&table);
        let failures = Arc::clone(&failures);
        workers.push(thread::spawn(move || {
            let start_key = (t * OPS_PER_THREAD) as i32;
            for i in 0..OPS_PER_THREAD as i32 {
                let key = start_key + i;
                let value = key * 10;
                match table.allocate(key, value) {
                    Ok(ptr) => {
                        if table.dereference(key, ptr) != Ok(value) {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                        table.free(key, ptr);
                    }
                    Err(_) => {
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(failures.load(Ordering::Relaxed), 0);
    assert!(table.is_empty());
}

#[test]
fn simple_multi_threaded() {
    let _ = env_logger::builder().is_test(true).try_init();
    hammer(TinyTable::create(10000, Variant::Simple, 0.9).unwrap());
}

#[test]
fn fixed_multi_threaded() {
    hammer(TinyTable::create(10000, Variant::Fixed, 0.9).unwrap());
}

#[test]
fn variable_multi_threaded() {
    hammer(TinyTable::create(10000, Variant::Variable, 0.9).unwrap());
}
