#![allow(clippy::unwrap_used)]
//! Benchmarks for device registry operations on large device lists

#![allow(missing_docs)]

use audioswitch::config::{AppConfig, Device, Direction, UserPreferences};
use audioswitch::registry::{DeviceRegistry, MemoryStore};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

const DEVICE_COUNT: u32 = 200;

fn create_devices() -> Vec<Device> {
    (0..DEVICE_COUNT)
        .map(|i| Device {
            id: i,
            name: format!("Device {i} - Card {}", i % 8),
            direction: if i % 2 == 0 {
                Direction::Output
            } else {
                Direction::Input
            },
            cycled: i % 3 == 0,
            active: i % 5 != 0,
        })
        .collect()
}

fn registry_with_devices() -> DeviceRegistry {
    DeviceRegistry::new(Arc::new(MemoryStore::with_devices(create_devices())))
}

fn bench_get_cycled_active(c: &mut Criterion) {
    let registry = registry_with_devices();

    c.bench_function("registry_get_cycled_active", |b| {
        b.iter(|| {
            let rotation = registry
                .get_cycled_active(black_box(Direction::Output))
                .unwrap();
            black_box(rotation);
        });
    });
}

fn bench_startup_reconciliation(c: &mut Criterion) {
    let live: Vec<(u32, String, Direction)> = create_devices()
        .into_iter()
        .filter(|d| d.id % 4 != 0)
        .map(|d| (d.id + 1000, d.name, d.direction))
        .collect();

    c.bench_function("registry_startup_reconciliation", |b| {
        b.iter(|| {
            let registry = registry_with_devices();
            registry.startup_reset().unwrap();
            for (id, name, direction) in &live {
                registry
                    .register_or_activate(black_box(name), *id, *direction)
                    .unwrap();
            }
            registry.startup_finalize().unwrap();
        });
    });
}

fn bench_reorder(c: &mut Criterion) {
    let registry = registry_with_devices();
    let outputs = registry.get_active(Direction::Output).unwrap();
    let first = outputs[0].clone();
    let last_position = outputs.len() - 1;

    c.bench_function("registry_reorder_first_to_last", |b| {
        b.iter(|| {
            registry.reorder(black_box(&first), last_position).unwrap();
            registry.reorder(black_box(&first), 0).unwrap();
        });
    });
}

fn bench_config_round_trip(c: &mut Criterion) {
    let config = AppConfig {
        audio_devices: create_devices(),
        preferences: UserPreferences::default(),
    };

    c.bench_function("config_round_trip", |b| {
        b.iter(|| {
            let json = serde_json::to_string(black_box(&config)).unwrap();
            let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
            black_box(deserialized);
        });
    });
}

criterion_group!(
    benches,
    bench_get_cycled_active,
    bench_startup_reconciliation,
    bench_reorder,
    bench_config_round_trip
);
criterion_main!(benches);
