//! `std` I/O benchmarks for the append and read paths, using plain bytes as
//! payload (no serialization overhead beyond the built-in record codec).

use bytes::Bytes;
use commitlog::{Config, Log, Record, SegmentConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkGroup, Bencher, Criterion};
use tempfile::{tempdir_in, TempDir};

const NUM_APPENDS: usize = 5_000;

fn tempdir() -> TempDir {
    tempdir_in(env!("CARGO_TARGET_TMPDIR")).unwrap()
}

fn config() -> Config {
    Config {
        segment: SegmentConfig {
            max_store_bytes: 16 * 1024 * 1024,
            max_index_bytes: 16 * 1024 * 1024,
        },
        initial_offset: 0,
    }
}

fn bench_throughput<M: criterion::measurement::Measurement>(group: &mut BenchmarkGroup<M>, n: usize, f: impl FnMut(&mut Bencher<M>)) {
    group
        .sample_size(10)
        .throughput(criterion::Throughput::Elements(n as u64))
        .bench_function(n.to_string(), f);
}

fn append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    let payload = Bytes::from_static(&[0u8; 128]);

    bench_throughput(&mut group, NUM_APPENDS, |b| {
        b.iter(|| {
            let dir = tempdir();
            let log = Log::open(dir.path(), config()).unwrap();
            for _ in 0..NUM_APPENDS {
                let mut record = Record::new(payload.clone());
                black_box(log.append(&mut record).unwrap());
            }
        })
    });
}

fn read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let payload = Bytes::from_static(&[0u8; 128]);

    let dir = tempdir();
    let log = Log::open(dir.path(), config()).unwrap();
    for _ in 0..NUM_APPENDS {
        let mut record = Record::new(payload.clone());
        log.append(&mut record).unwrap();
    }

    bench_throughput(&mut group, NUM_APPENDS, |b| {
        b.iter(|| {
            for offset in 0..NUM_APPENDS as u64 {
                let record: Record = log.read(black_box(offset)).unwrap();
                black_box(record);
            }
        })
    });
}

criterion_group!(benches, append, read);
criterion_main!(benches);
