//! Benchmarks for the hot query paths.
//!
//! Flag parsing runs once per core at startup; the topology lookups run on
//! per-request paths in NUMA-aware allocators and schedulers, so their cost
//! matters more than the one-shot discovery itself.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hwtopo::probe::{current_core, CpuFeatures, NumaTopology};

const FLAG_LINE: &str = "fpu vme de pse tsc msr pae mce cx8 apic sse sse2 ss ht tm pbe \
                         ssse3 sse4_1 sse4_2 popcnt pclmulqdq avx avx2";

fn bench_feature_parsing(c: &mut Criterion) {
    c.bench_function("parse_flag_line", |b| {
        b.iter(|| {
            let features = CpuFeatures::parse(black_box(FLAG_LINE));
            black_box(features.bits());
        });
    });
}

fn bench_topology_lookups(c: &mut Criterion) {
    // A 64-core, 4-node machine with cores striped across nodes.
    let numa = NumaTopology::from_mapping(4, (0..64).map(|core| core % 4).collect());

    c.bench_function("node_of_core", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for core in 0..64 {
                sum += numa.node_of_core(black_box(core));
            }
            black_box(sum);
        });
    });

    c.bench_function("core_index_in_node", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for core in 0..64 {
                sum += numa.core_index_in_node(black_box(core));
            }
            black_box(sum);
        });
    });

    c.bench_function("current_core", |b| {
        b.iter(|| {
            black_box(current_core(black_box(64)));
        });
    });
}

criterion_group!(benches, bench_feature_parsing, bench_topology_lookups);
criterion_main!(benches);
