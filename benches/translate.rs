//! Argument Translation Benchmarks
//!
//! Run with: cargo bench --bench translate

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::collections::BTreeMap;
use std::path::Path;

use chatops_dispatch::dispatch::{build, plugin_path, translate, DispatchRequest};
use chatops_dispatch::loaders::{ArgumentStyle, LoaderRegistry};

fn parameters(n: usize) -> BTreeMap<String, String> {
    (0..n)
        .map(|i| (format!("key{}", i), format!("value number {}", i)))
        .collect()
}

fn benchmark_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");

    for n in [1usize, 10, 100].iter() {
        let params = parameters(*n);
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(format!("python_{}_params", n), &params, |b, p| {
            b.iter(|| translate(ArgumentStyle::Python, black_box(p)));
        });
        group.bench_with_input(format!("go_{}_params", n), &params, |b, p| {
            b.iter(|| translate(ArgumentStyle::Go, black_box(p)));
        });
    }

    group.finish();
}

fn benchmark_full_command(c: &mut Criterion) {
    let registry = LoaderRegistry::builtin();
    let root = Path::new("/opt/slack-plugins");

    c.bench_function("parse_and_build", |b| {
        b.iter(|| {
            let request = DispatchRequest::from_pairs([
                ("plugin", "deploy.py"),
                ("loader", "python"),
                ("env", "prod"),
                ("text", "deploy prod now"),
                ("user_name", "alice"),
            ]);
            let descriptor = registry.resolve(request.loader()).unwrap();
            let args = translate(descriptor.argument_style(), request.parameters());
            let path = plugin_path(root, descriptor.id(), request.plugin());
            black_box(build(descriptor, &path, args))
        });
    });
}

criterion_group!(benches, benchmark_translate, benchmark_full_command);
criterion_main!(benches);
