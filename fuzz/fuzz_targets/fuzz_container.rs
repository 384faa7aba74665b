#![no_main]

//! Fuzz target for container operation sequences
//!
//! Checks that arbitrary interleavings of registration, resolution and flush
//! never panic and that the documented precedence rules hold.

use arbitrary::Arbitrary;
use armature_kernel::Container;
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;

#[derive(Debug, Arbitrary)]
enum Key {
    A,
    B,
    C,
}

impl Key {
    fn as_str(&self) -> &'static str {
        match self {
            Key::A => "a",
            Key::B => "b",
            Key::C => "c",
        }
    }
}

#[derive(Debug, Arbitrary)]
enum ContainerOp {
    Instance(Key, u32),
    Singleton(Key, u32),
    Bind(Key, u32),
    /// Resolver that resolves another key
    SingletonWith(Key, Key),
    /// Resolver that panics
    Poisoned(Key),
    Make(Key),
    Has(Key),
    Flush,
    Len,
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();
    // first instance value per key, cleared by flush
    let mut instances: HashMap<&'static str, u32> = HashMap::new();

    for op in ops.into_iter().take(200) {
        match op {
            ContainerOp::Instance(key, value) => {
                let stored = container.instance(key.as_str(), value);
                let first = !instances.contains_key(key.as_str());
                if first && stored {
                    instances.insert(key.as_str(), value);
                }
            }
            ContainerOp::Singleton(key, value) => {
                container.singleton(key.as_str(), move || value);
            }
            ContainerOp::Bind(key, value) => {
                container.bind(key.as_str(), move || value);
            }
            ContainerOp::SingletonWith(key, dep) => {
                let dep = dep.as_str();
                container.singleton_with(key.as_str(), move |c| c.make::<u32>(dep).map(|v| *v));
            }
            ContainerOp::Poisoned(key) => {
                container.bind(key.as_str(), || -> u32 { panic!("poisoned resolver") });
            }
            ContainerOp::Make(key) => {
                let result = container.make::<u32>(key.as_str());
                if let Some(expected) = instances.get(key.as_str()) {
                    assert_eq!(*result.unwrap(), *expected);
                }
            }
            ContainerOp::Has(key) => {
                let _ = container.has(key.as_str());
            }
            ContainerOp::Flush => {
                container.flush();
                instances.clear();
                assert!(container.is_empty());
            }
            ContainerOp::Len => {
                let _ = container.len();
            }
        }
    }
});
