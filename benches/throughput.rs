//! Throughput Benchmark for prefcli
//!
//! This benchmark measures the storage engine, the command line parser and
//! full command dispatch under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use prefcli::cli::CommandRegistry;
use prefcli::commands::{hex, PreferencesCli};
use prefcli::connection::Shell;
use prefcli::storage::{PreferenceStore, StorageEngine, StoredValue, Unsupported};
use std::sync::Arc;
use std::time::Duration;

fn shell(storage: Arc<StorageEngine>) -> Shell {
    Shell::new(PreferencesCli::new(storage, Arc::new(Unsupported)))
}

/// Benchmark engine writes
fn bench_put(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_int32", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 10_000);
            engine.put("bench", &key, StoredValue::I32(i as i32));
            i += 1;
        });
    });

    group.bench_function("put_string", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 10_000);
            engine.put("bench", &key, StoredValue::Str("small_value".to_string()));
            i += 1;
        });
    });

    group.bench_function("put_blob_1k", |b| {
        let mut i = 0u64;
        let value = Bytes::from(vec![0xa5; 1024]);
        b.iter(|| {
            let key = format!("key:{}", i % 10_000);
            engine.put("bench", &key, StoredValue::Blob(value.clone()));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark engine reads
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    // Pre-populate with data
    for i in 0..10_000 {
        engine.put("bench", &format!("key:{}", i), StoredValue::I32(i));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 10_000);
            black_box(engine.get("bench", &key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i % 10_000);
            black_box(engine.get("bench", &key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark command line parsing
fn bench_parse(c: &mut Criterion) {
    let storage = Arc::new(StorageEngine::new());
    let cli = PreferencesCli::new(storage, Arc::new(Unsupported));
    let mut registry = CommandRegistry::new();
    cli.register_commands(&mut registry);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("positional", |b| {
        b.iter(|| black_box(registry.parse("setp wifi ssid String home").unwrap()));
    });

    group.bench_function("named_and_quoted", |b| {
        b.iter(|| {
            black_box(
                registry
                    .parse(r#"setPreference -t String -ns wifi -k ssid "home network""#)
                    .unwrap(),
            )
        });
    });

    group.finish();
}

/// Benchmark full line execution (80% reads, 20% writes)
fn bench_dispatch(c: &mut Criterion) {
    let storage = Arc::new(StorageEngine::new());
    let shell = shell(Arc::clone(&storage));

    // Pre-populate
    let mut out = Vec::new();
    for i in 0..1_000 {
        shell
            .execute_line(&format!("setp bench key:{} Int32 {}", i, i), &mut out)
            .unwrap();
    }

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        let mut out = Vec::with_capacity(256);
        b.iter(|| {
            out.clear();
            let line = if i % 5 == 0 {
                format!("setp bench new:{} Int32 {}", i % 1_000, i)
            } else {
                format!("getp bench key:{} Int32", i % 1_000)
            };
            shell.execute_line(&line, &mut out).unwrap();
            black_box(&out);
            i += 1;
        });
    });

    group.bench_function("get_bytes_hex", |b| {
        let mut out = Vec::with_capacity(256);
        shell
            .execute_line(&format!("setp bench blob Bytes {}", "A5".repeat(127)), &mut out)
            .unwrap();
        b.iter(|| {
            out.clear();
            shell.execute_line("getp bench blob Bytes", &mut out).unwrap();
            black_box(&out);
        });
    });

    group.finish();
}

/// Benchmark the hex codec
fn bench_hex(c: &mut Criterion) {
    let data: Vec<u8> = (0..=255).collect();
    let text = hex::encode(&data, data.len());

    let mut group = c.benchmark_group("hex");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("encode_256", |b| {
        b.iter(|| black_box(hex::encode(&data, data.len())));
    });

    group.bench_function("decode_256", |b| {
        b.iter(|| black_box(hex::decode(&text)));
    });

    group.finish();
}

/// Benchmark concurrent sessions sharing one engine
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let storage = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let shell = shell(Arc::clone(&storage));
                    thread::spawn(move || {
                        let mut out = Vec::new();
                        for i in 0..1_000 {
                            out.clear();
                            shell
                                .execute_line(&format!("setp ns{} k{} Int32 {}", t, i, i), &mut out)
                                .unwrap();
                            shell
                                .execute_line(&format!("getp ns{} k{} Int32", t, i), &mut out)
                                .unwrap();
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(storage.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_parse,
    bench_dispatch,
    bench_hex,
    bench_concurrent,
);

criterion_main!(benches);
