#![no_main]

//! Fuzz target for concurrent container operations
//!
//! Shared bindings must be constructed at most once no matter how the
//! threads interleave.

use arbitrary::Arbitrary;
use armature_kernel::Container;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    MakeShared,
    MakeTransient,
    TryMakeMissing,
    Has,
    /// Racing instance registration on a fresh key
    Instance(u8, u32),
}

#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    // clamped to 1-8
    thread_count: u8,
    ops_per_thread: Vec<ThreadOp>,
}

fuzz_target!(|scenario: ConcurrentScenario| {
    let container = Container::new();
    let built = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&built);
    container.singleton("shared", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        42u32
    });
    container.bind_with("transient", |c| c.make::<u32>("shared").map(|v| *v + 1));

    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops = scenario.ops_per_thread;

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let container = container.clone();
            let ops = ops.clone();
            thread::spawn(move || {
                for op in ops.into_iter().take(50) {
                    match op {
                        ThreadOp::MakeShared => {
                            assert_eq!(*container.make::<u32>("shared").unwrap(), 42);
                        }
                        ThreadOp::MakeTransient => {
                            assert_eq!(*container.make::<u32>("transient").unwrap(), 43);
                        }
                        ThreadOp::TryMakeMissing => {
                            assert!(container.try_make::<u32>("missing").is_none());
                        }
                        ThreadOp::Has => {
                            assert!(container.has("shared"));
                        }
                        ThreadOp::Instance(slot, value) => {
                            container.instance(format!("slot-{}", slot % 4), value);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    assert!(built.load(Ordering::SeqCst) <= 1);
    let _ = container.len();
});
