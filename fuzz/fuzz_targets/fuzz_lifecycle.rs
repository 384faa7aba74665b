#![no_main]

//! Fuzz target for provider lifecycle sequences
//!
//! Interleaves registration, boot and shutdown and checks that every
//! provider is booted exactly once and torn down in reverse order.

use arbitrary::Arbitrary;
use armature_kernel::{Application, Provider, Result, Shutdown, ShutdownContext};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Journal {
    boots: Vec<u8>,
    teardown: Vec<u8>,
}

struct Probe {
    id: u8,
    journal: Arc<Mutex<Journal>>,
}

impl Provider for Probe {
    fn register(&self, app: &Application) -> Result<()> {
        app.instance(format!("probe-{}", self.id), self.id);
        Ok(())
    }

    fn boot(&self, _app: &Application) -> Result<()> {
        if let Ok(mut journal) = self.journal.lock() {
            journal.boots.push(self.id);
        }
        Ok(())
    }

    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        Some(self)
    }
}

impl Shutdown for Probe {
    fn shutdown(&self, _app: &Application) -> Result<()> {
        if let Ok(mut journal) = self.journal.lock() {
            journal.teardown.push(self.id);
        }
        Ok(())
    }
}

#[derive(Debug, Arbitrary)]
enum LifecycleOp {
    Register,
    Boot,
    Make(u8),
    Flush,
}

fuzz_target!(|ops: Vec<LifecycleOp>| {
    let app = Application::new();
    let journal = Arc::new(Mutex::new(Journal::default()));
    let mut next_id = 0u8;

    for op in ops.into_iter().take(64) {
        match op {
            LifecycleOp::Register => {
                let probe = Probe {
                    id: next_id,
                    journal: Arc::clone(&journal),
                };
                next_id += 1;
                app.register(probe).unwrap();
            }
            LifecycleOp::Boot => {
                app.boot().unwrap();
            }
            LifecycleOp::Make(id) => {
                let _ = app.try_make::<u8>(&format!("probe-{id}"));
            }
            LifecycleOp::Flush => {
                // drops providers and their hooks along with the bindings
                app.flush();
                *journal.lock().unwrap() = Journal::default();
                next_id = 0;
            }
        }
    }

    let booted = app.is_booted();
    app.shutdown(&ShutdownContext::new()).unwrap();

    let journal = journal.lock().unwrap();
    let expected: Vec<u8> = (0..next_id).rev().collect();
    assert_eq!(journal.teardown, expected);
    if booted {
        assert_eq!(journal.boots, (0..next_id).collect::<Vec<_>>());
    }
});
