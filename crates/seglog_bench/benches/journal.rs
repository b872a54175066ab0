//! Journal benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use seglog_bench::utils::{filled_journal, open_journal, random_data};
use seglog_journal::{ReaderMode, StorageLevel};

/// Benchmark appends into memory segments.
fn bench_memory_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_append");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (journal, _dir) = open_journal(StorageLevel::Memory, 8 * 1024 * 1024);
            let data = random_data(size);

            b.iter(|| {
                let indexed = journal.writer().unwrap().append(black_box(data.clone())).unwrap();
                black_box(indexed.index());
            });
        });
    }

    group.finish();
}

/// Benchmark appends into segment files, including rollover.
fn bench_disk_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_append");
    group.sample_size(50);

    for size in [256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (journal, _dir) = open_journal(StorageLevel::Disk, 1024 * 1024);
            let data = random_data(size);

            b.iter(|| {
                let indexed = journal.writer().unwrap().append(black_box(data.clone())).unwrap();
                black_box(indexed.index());
            });
        });
    }

    group.finish();
}

/// Benchmark append followed by a synced commit.
fn bench_commit_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_flush");
    group.sample_size(20);

    group.bench_function("append_commit_1k", |b| {
        let (journal, _dir) = open_journal(StorageLevel::Disk, 32 * 1024 * 1024);
        let data = random_data(1024);

        b.iter(|| {
            let mut writer = journal.writer().unwrap();
            let index = writer.append(data.clone()).unwrap().index();
            writer.commit(index).unwrap();
            writer.flush().unwrap();
        });
    });

    group.finish();
}

/// Benchmark reading the whole journal front to back.
fn bench_sequential_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_read");

    for level in [StorageLevel::Memory, StorageLevel::Disk] {
        let (journal, _dir) = filled_journal(level, 10_000, 256);
        group.throughput(Throughput::Elements(10_000));
        group.bench_function(format!("{level:?}"), |b| {
            b.iter(|| {
                let reader = journal.open_reader(1, ReaderMode::All).unwrap();
                let count = reader.map(|entry| entry.unwrap()).count();
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Benchmark opening a reader in the middle of the journal.
fn bench_reader_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader_seek");
    let (journal, _dir) = filled_journal(StorageLevel::Memory, 10_000, 128);

    for index in [1u64, 5_000, 9_999].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(index), index, |b, &index| {
            b.iter(|| {
                let mut reader = journal.open_reader(black_box(index), ReaderMode::All).unwrap();
                black_box(reader.next());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_append,
    bench_disk_append,
    bench_commit_flush,
    bench_sequential_read,
    bench_reader_seek,
);
criterion_main!(benches);
