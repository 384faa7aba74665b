//! Example demonstrating the kernel's log output
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use armature_kernel::{Application, Provider, Result, ShutdownContext};

struct Greeter;

impl Provider for Greeter {
    fn register(&self, app: &Application) -> Result<()> {
        app.instance("greeting", "hello".to_string());
        app.bind("counter", || 0u64);
        Ok(())
    }

    fn boot(&self, app: &Application) -> Result<()> {
        let greeting = app.make::<String>("greeting")?;
        println!("  [greeter] {greeting}");
        Ok(())
    }
}

fn main() {
    armature_kernel::logging::builder()
        .debug()
        .kernel_only()
        .with_thread_ids()
        .init();

    println!("=== Armature Kernel Logging Demo ===\n");

    let app = Application::new();

    // Logs the provider name and each lifecycle phase
    if let Err(err) = app.register(Greeter) {
        eprintln!("register failed: {err}");
        return;
    }
    if let Err(err) = app.boot() {
        eprintln!("boot failed: {err}");
        return;
    }

    // Logs the missing key at debug level
    let missing = app.try_make::<String>("farewell");
    println!("farewell bound: {}", missing.is_some());

    // A panicking factory is logged and contained
    app.bind("fragile", || -> u32 { panic!("factory blew up") });
    if let Err(err) = app.make::<u32>("fragile") {
        println!("contained: {err}");
    }

    app.register_shutdown_hook(|| {
        println!("  [hook] closing");
        Ok(())
    });
    if let Err(err) = app.shutdown(&ShutdownContext::new()) {
        eprintln!("shutdown failed: {err}");
    }

    println!("\n=== Demo Complete ===");
}
