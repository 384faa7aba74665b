//! Benchmarks for the container and the provider lifecycle

use armature_kernel::{Application, Container, Environment, Provider, Result, ShutdownContext};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct SmallService {
    value: i32,
}

#[allow(dead_code)]
struct MediumService {
    name: String,
    values: Vec<i32>,
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("instance", |b| {
        b.iter(|| {
            let container = Container::new();
            container.instance("small", SmallService { value: 42 });
            black_box(container)
        })
    });

    group.bench_function("singleton", |b| {
        b.iter(|| {
            let container = Container::new();
            container.singleton("small", || SmallService { value: 42 });
            black_box(container)
        })
    });

    group.bench_function("bind", |b| {
        b.iter(|| {
            let container = Container::new();
            container.bind("small", || SmallService { value: 42 });
            black_box(container)
        })
    });

    group.bench_function("individual_4_keys", |b| {
        b.iter(|| {
            let container = Container::new();
            container.instance("a", 1u32);
            container.singleton("b", || "test".to_string());
            container.bind("c", || vec![1u8, 2, 3]);
            container.singleton_with("d", |c| c.make::<u32>("a").map(|v| *v + 1));
            black_box(container)
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let container = Container::new();
    container.instance("small", SmallService { value: 42 });
    container.singleton("medium", || MediumService {
        name: "test".to_string(),
        values: vec![1, 2, 3, 4, 5],
    });
    let _ = container.make::<MediumService>("medium").unwrap();

    group.bench_function("make_instance", |b| {
        b.iter(|| {
            let service = container.make::<SmallService>("small").unwrap();
            black_box(service)
        })
    });

    group.bench_function("make_cached_singleton", |b| {
        b.iter(|| {
            let service = container.make::<MediumService>("medium").unwrap();
            black_box(service)
        })
    });

    group.bench_function("has_check", |b| {
        b.iter(|| {
            let exists = container.has("small");
            black_box(exists)
        })
    });

    group.bench_function("make_not_found", |b| {
        b.iter(|| {
            let service = container.try_make::<SmallService>("missing");
            black_box(service)
        })
    });

    group.finish();
}

fn bench_transient_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient");
    group.throughput(Throughput::Elements(1));

    let container = Container::new();
    container.bind("small", || SmallService { value: 42 });
    container.instance("base", 10u64);
    container.bind_with("derived", |c| c.make::<u64>("base").map(|v| *v * 2));

    group.bench_function("make_plain", |b| {
        b.iter(|| {
            let service = container.make::<SmallService>("small").unwrap();
            black_box(service)
        })
    });

    group.bench_function("make_container_aware", |b| {
        b.iter(|| {
            let service = container.make::<u64>("derived").unwrap();
            black_box(service)
        })
    });

    group.finish();
}

struct NoopProvider;

impl Provider for NoopProvider {
    fn register(&self, app: &Application) -> Result<()> {
        app.singleton("noop", || 0u8);
        Ok(())
    }

    fn boot(&self, _app: &Application) -> Result<()> {
        Ok(())
    }
}

fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");

    group.bench_function("register_boot_shutdown_8", |b| {
        b.iter(|| {
            let app = Application::builder()
                .environment(Environment::Testing)
                .build();
            for _ in 0..8 {
                app.register(NoopProvider).unwrap();
                app.register_shutdown_hook(|| Ok(()));
            }
            app.boot().unwrap();
            app.shutdown(&ShutdownContext::new()).unwrap();
            black_box(app)
        })
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = Arc::new(Container::new());
        container.singleton("small", || SmallService { value: 42 });

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = Arc::clone(&container);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.make::<SmallService>("small").unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_transient_resolution,
    bench_lifecycle,
    bench_concurrent,
);

criterion_main!(benches);
