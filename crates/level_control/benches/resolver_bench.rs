//! Criterion benchmarks for level resolution and policy persistence.
//!
//! Benchmarks:
//!   - effective range for 4096 buildings, half with overrides
//!   - LVLC encode/decode of a policy with 4096 overrides
//!
//! Run with: cargo bench -p level_control --bench resolver_bench --features bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bevy::math::Vec2;
use level_control::policy::LevelPolicy;
use level_control::resolver::LevelResolver;
use level_control::serialization::{decode_policy, encode_policy};
use level_control::test_harness::TestHost;
use level_control::types::{BuildingId, LevelCategory, Service};

const BUILDINGS: u16 = 4096;

fn populated_city() -> (TestHost, LevelPolicy) {
    let mut host = TestHost::new();
    let home = host.add_prefab(Service::Residential, 0, 2, 2);
    for d in 1..=16u8 {
        host.set_district_at(Vec2::new(d as f32 * 10.0, 0.0), d);
    }

    let mut policy = LevelPolicy::default();
    for d in 1..=16u8 {
        policy
            .districts
            .set_max_level(d, LevelCategory::Residential, 3);
    }
    for i in 0..BUILDINGS {
        let district = (i % 16 + 1) as f32;
        let id = host.spawn_building(home, 0, Vec2::new(district * 10.0, 0.0));
        if i % 2 == 0 {
            policy.buildings.set_min_level(id, 1, 4);
            policy.buildings.set_max_level(id, 2, 4);
        }
    }
    (host, policy)
}

// ---------------------------------------------------------------------------
// Benchmark: effective range resolution
// ---------------------------------------------------------------------------

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_resolve");
    let (host, policy) = populated_city();

    group.bench_function("range_for_4096", |b| {
        b.iter(|| {
            let resolver = LevelResolver::new(&policy, &host);
            for i in 0..BUILDINGS {
                black_box(resolver.range_for(BuildingId(i)));
            }
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: policy blob
// ---------------------------------------------------------------------------

fn bench_policy_blob(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_policy_blob");
    let (_, policy) = populated_city();
    let bytes = encode_policy(&policy);

    group.bench_function("encode_4096", |b| {
        b.iter(|| black_box(encode_policy(black_box(&policy))));
    });

    group.bench_function("decode_4096", |b| {
        b.iter(|| black_box(decode_policy(black_box(&bytes))));
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_policy_blob);
criterion_main!(benches);
