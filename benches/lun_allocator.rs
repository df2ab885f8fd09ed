//! Benchmark for LUN slot allocation over large export tables
//!
//! The allocator runs against a fresh snapshot of the daemon's full
//! export table on every provision, so its cost scales with the number
//! of exports, not volumes.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use targetd_operator::{first_available_lun, IscsiExport};

fn export(lun: u32, initiator: u32) -> IscsiExport {
    IscsiExport {
        initiator_wwn: format!("iqn.2020-01.com.example:client-{}", initiator),
        lun,
        vol_name: format!("vol-{}", lun),
        vol_size: 1 << 30,
        vol_uuid: format!("uuid-{}-{}", lun, initiator),
        pool: "vg-targetd".to_string(),
    }
}

fn bench_dense_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("lun_allocator");
    group.throughput(Throughput::Elements(1));

    // 254 volumes, 4 initiators each: the table shape just before the
    // namespace is exhausted.
    let exports: Vec<IscsiExport> = (0..254)
        .flat_map(|lun| (0..4).map(move |initiator| export(lun, initiator)))
        .collect();

    group.bench_function("dense_254_luns", |b| {
        b.iter(|| first_available_lun(black_box(&exports)).unwrap())
    });

    group.finish();
}

fn bench_sparse_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("lun_allocator");
    group.throughput(Throughput::Elements(1));

    // A low gap in an otherwise busy table.
    let exports: Vec<IscsiExport> = (0..200)
        .filter(|&lun| lun != 17)
        .flat_map(|lun| (0..4).map(move |initiator| export(lun, initiator)))
        .collect();

    group.bench_function("sparse_gap_at_17", |b| {
        b.iter(|| first_available_lun(black_box(&exports)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_dense_table, bench_sparse_table);
criterion_main!(benches);
