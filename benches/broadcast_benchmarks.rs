//! Criterion benchmarks for logfan

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logfan::core::render_args;
use logfan::prelude::*;
use std::io;
use std::sync::Arc;

struct Discard;

impl Sink for Discard {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}

// ============================================================================
// Registry Benchmarks
// ============================================================================

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    let payload = b"12:00:00 server.rs:42 request served in 3ms\n";
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for sinks in [1usize, 4, 16] {
        let registry = MultiSink::new((0..sinks).map(|_| Arc::new(Discard) as Arc<dyn Sink>));
        group.bench_with_input(BenchmarkId::from_parameter(sinks), &registry, |b, registry| {
            b.iter(|| black_box(registry.write(black_box(payload))))
        });
    }

    group.finish();
}

fn bench_append_remove(c: &mut Criterion) {
    let registry = MultiSink::new((0..8).map(|_| Arc::new(Discard) as Arc<dyn Sink>));
    let extra: Arc<dyn Sink> = Arc::new(Discard);

    c.bench_function("append_remove", |b| {
        b.iter(|| {
            registry.append([extra.clone()]);
            registry.remove(std::slice::from_ref(&extra));
        })
    });
}

// ============================================================================
// Formatter Benchmarks
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_args");

    let joined = logfan::args!["user", 42, true, 3.5];
    group.bench_function("join", |b| b.iter(|| black_box(render_args(black_box(&joined)))));

    let formatted = logfan::args!["user %s id %d took %.2f ms", "ann", 42, 2.5];
    group.bench_function("format", |b| b.iter(|| black_box(render_args(black_box(&formatted)))));

    group.finish();
}

// ============================================================================
// Channel Benchmarks
// ============================================================================

fn bench_status_log(c: &mut Criterion) {
    let loggers = Loggers::builder()
        .primary(Arc::new(Discard))
        .build()
        .expect("Failed to build loggers");
    loggers.set_writers(&[Arc::new(Discard) as Arc<dyn Sink>], &[ChannelSelector::StatusOnly]);

    c.bench_function("status_log_with_fanout", |b| {
        b.iter(|| loggers.status_log(&logfan::args!["request %d served", black_box(7)]))
    });
}

criterion_group!(
    benches,
    bench_broadcast,
    bench_append_remove,
    bench_render,
    bench_status_log
);
criterion_main!(benches);
