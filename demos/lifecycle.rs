//! Example wiring providers and plugins into an application
//!
//! ```bash
//! cargo run --example lifecycle
//! ```
//!
//! Press Ctrl+C to run the shutdown hooks.

use armature_kernel::{
    AfterBoot, Application, Environment, Plugin, Provider, Result, Shutdown,
};
use std::time::Duration;

#[allow(dead_code)]
struct Database {
    url: String,
}

struct DatabaseProvider;

impl Provider for DatabaseProvider {
    fn register(&self, app: &Application) -> Result<()> {
        let url = if app.is_production() {
            "postgres://db.internal/app"
        } else {
            "postgres://localhost/app"
        };
        app.singleton("db", move || Database { url: url.into() });
        Ok(())
    }

    fn boot(&self, app: &Application) -> Result<()> {
        let db = app.make::<Database>("db")?;
        println!("  [db] connected to {}", db.url);
        Ok(())
    }

    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        Some(self)
    }
}

impl Shutdown for DatabaseProvider {
    fn shutdown(&self, _app: &Application) -> Result<()> {
        println!("  [db] connection pool closed");
        Ok(())
    }
}

struct SessionPlugin;

impl Provider for SessionPlugin {
    fn register(&self, app: &Application) -> Result<()> {
        app.bind_with("session", |c| {
            let db = c.make::<Database>("db")?;
            Ok(format!("session backed by {}", db.url))
        });
        Ok(())
    }

    fn boot(&self, _app: &Application) -> Result<()> {
        Ok(())
    }

    fn as_after_boot(&self) -> Option<&dyn AfterBoot> {
        Some(self)
    }

    fn as_plugin(&self) -> Option<&dyn Plugin> {
        Some(self)
    }
}

impl AfterBoot for SessionPlugin {
    fn after_boot(&self, app: &Application) -> Result<()> {
        let session = app.make::<String>("session")?;
        println!("  [session] ready: {session}");
        Ok(())
    }
}

impl Plugin for SessionPlugin {
    fn name(&self) -> &str {
        "session"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }
}

fn main() -> Result<()> {
    #[cfg(feature = "logging")]
    armature_kernel::logging::init();

    let app = Application::builder()
        .environment(Environment::Development)
        .shutdown_timeout(Duration::from_secs(5))
        .build();

    app.register(DatabaseProvider)?;
    app.register_plugin(SessionPlugin)?;
    app.register_shutdown_hook(|| {
        println!("  [app] flushing metrics");
        Ok(())
    });

    app.boot()?;
    println!("Booted {} providers: {:?}", app.provider_count(), app.providers());
    for plugin in app.plugins() {
        println!("Plugin {} v{}", plugin.name, plugin.version);
    }

    println!("Waiting for Ctrl+C...");
    app.run_until_signal()
}
