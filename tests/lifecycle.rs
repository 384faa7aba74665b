//! Provider registration and boot sequencing

use armature_kernel::{
    AfterBoot, Application, BeforeRegister, DiError, Environment, Phase, Provider, Result,
};
use parking_lot::Mutex;
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<String>>>;

fn app() -> Application {
    Application::builder().environment(Environment::Testing).build()
}

struct Tracked {
    id: &'static str,
    journal: Journal,
}

impl Tracked {
    fn new(id: &'static str, journal: &Journal) -> Self {
        Self {
            id,
            journal: Arc::clone(journal),
        }
    }

    fn note(&self, phase: &str) {
        self.journal.lock().push(format!("{}:{}", self.id, phase));
    }
}

impl Provider for Tracked {
    fn register(&self, app: &Application) -> Result<()> {
        self.note("register");
        app.instance(self.id, self.id.to_string());
        Ok(())
    }

    fn boot(&self, _app: &Application) -> Result<()> {
        self.note("boot");
        Ok(())
    }

    fn as_before_register(&self) -> Option<&dyn BeforeRegister> {
        Some(self)
    }

    fn as_after_boot(&self) -> Option<&dyn AfterBoot> {
        Some(self)
    }
}

impl BeforeRegister for Tracked {
    fn before_register(&self, _app: &Application) -> Result<()> {
        self.note("before_register");
        Ok(())
    }
}

impl AfterBoot for Tracked {
    fn after_boot(&self, _app: &Application) -> Result<()> {
        self.note("after_boot");
        Ok(())
    }
}

#[test]
fn late_registration_boots_inside_register() {
    let journal: Journal = Arc::default();
    let app = app();
    app.register(Tracked::new("early", &journal)).unwrap();
    app.boot().unwrap();

    journal.lock().clear();
    app.register(Tracked::new("late", &journal)).unwrap();

    // everything already happened before register returned
    assert_eq!(
        *journal.lock(),
        vec!["late:before_register", "late:register", "late:boot", "late:after_boot"]
    );
    assert_eq!(app.providers().len(), 2);
}

#[test]
fn registration_before_boot_defers_boot() {
    let journal: Journal = Arc::default();
    let app = app();
    app.register(Tracked::new("p", &journal)).unwrap();

    assert_eq!(*journal.lock(), vec!["p:before_register", "p:register"]);
    assert!(!app.is_booted());
}

struct FailsIn(Phase);

impl Provider for FailsIn {
    fn register(&self, app: &Application) -> Result<()> {
        app.instance("partial", true);
        if self.0 == Phase::Register {
            return Err(DiError::provider("register exploded"));
        }
        Ok(())
    }

    fn boot(&self, _app: &Application) -> Result<()> {
        if self.0 == Phase::Boot {
            return Err(DiError::provider("boot exploded"));
        }
        Ok(())
    }

    fn as_after_boot(&self) -> Option<&dyn AfterBoot> {
        Some(self)
    }
}

impl AfterBoot for FailsIn {
    fn after_boot(&self, _app: &Application) -> Result<()> {
        if self.0 == Phase::AfterBoot {
            return Err(DiError::provider("after_boot exploded"));
        }
        Ok(())
    }
}

#[test]
fn register_failure_keeps_partial_bindings() {
    let app = app();
    let err = app.register(FailsIn(Phase::Register)).unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Register));
    assert!(err.to_string().contains("register exploded"));
    assert_eq!(app.provider_count(), 0);
    // not transactional
    assert!(app.has("partial"));
}

#[test]
fn boot_failure_aborts_without_rollback() {
    let journal: Journal = Arc::default();
    let app = app();
    app.register(Tracked::new("first", &journal)).unwrap();
    app.register(FailsIn(Phase::Boot)).unwrap();
    app.register(Tracked::new("third", &journal)).unwrap();

    let err = app.boot().unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Boot));
    assert!(!app.is_booted());
    let journal = journal.lock();
    assert!(journal.contains(&"first:boot".to_string()));
    assert!(!journal.contains(&"third:boot".to_string()));
    assert!(!journal.iter().any(|e| e.ends_with("after_boot")));
}

#[test]
fn after_boot_failure_is_reported_with_phase() {
    let app = app();
    app.register(FailsIn(Phase::AfterBoot)).unwrap();

    let err = app.boot().unwrap_err();
    assert_eq!(err.phase(), Some(Phase::AfterBoot));
    assert!(!app.is_booted());
}

#[test]
fn late_boot_failure_surfaces_from_register() {
    let app = app();
    app.boot().unwrap();

    let err = app.register(FailsIn(Phase::Boot)).unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Boot));
}

struct Spawner {
    journal: Journal,
}

impl Provider for Spawner {
    fn register(&self, _app: &Application) -> Result<()> {
        Ok(())
    }

    fn boot(&self, app: &Application) -> Result<()> {
        app.register(Tracked::new("spawned", &self.journal))
    }
}

#[test]
fn provider_registered_during_boot_is_booted_by_same_pass() {
    let journal: Journal = Arc::default();
    let app = app();
    app.register(Spawner {
        journal: Arc::clone(&journal),
    })
    .unwrap();

    app.boot().unwrap();

    let journal = journal.lock();
    assert_eq!(journal.iter().filter(|e| *e == "spawned:boot").count(), 1);
    assert_eq!(journal.iter().filter(|e| *e == "spawned:after_boot").count(), 1);
}

struct Consumer;

impl Provider for Consumer {
    fn register(&self, app: &Application) -> Result<()> {
        app.singleton_with("report", |c| {
            let name = c.make::<String>("name")?;
            Ok(format!("report for {name}"))
        });
        Ok(())
    }

    fn boot(&self, app: &Application) -> Result<()> {
        let report = app.make::<String>("report")?;
        assert_eq!(report.as_str(), "report for kernel");
        Ok(())
    }
}

struct Named;

impl Provider for Named {
    fn register(&self, app: &Application) -> Result<()> {
        app.instance("name", "kernel".to_string());
        Ok(())
    }

    fn boot(&self, _app: &Application) -> Result<()> {
        Ok(())
    }
}

#[test]
fn boot_can_resolve_bindings_from_other_providers() {
    let app = app();
    app.register(Consumer).unwrap();
    app.register(Named).unwrap();

    app.boot().unwrap();
    assert!(app.resolved("report"));
}

struct NestedBoot {
    seen: Arc<Mutex<Option<(bool, bool)>>>,
}

impl Provider for NestedBoot {
    fn register(&self, _app: &Application) -> Result<()> {
        Ok(())
    }

    fn boot(&self, app: &Application) -> Result<()> {
        let nested = app.boot().is_ok();
        *self.seen.lock() = Some((nested, app.is_booted()));
        Ok(())
    }
}

#[test]
fn nested_boot_is_a_no_op_until_pass_completes() {
    let seen = Arc::new(Mutex::new(None));
    let app = app();
    app.register(NestedBoot {
        seen: Arc::clone(&seen),
    })
    .unwrap();

    app.boot().unwrap();

    assert_eq!(*seen.lock(), Some((true, false)));
    assert!(app.is_booted());
}
