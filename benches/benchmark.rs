use std::fs;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use trajcat::Catalog;

fn sample() -> String {
    fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample.cat")).unwrap()
}

fn load(c: &mut Criterion) {
    let text = sample();
    c.bench_function("load sample catalog", |b| {
        b.iter(|| {
            let mut catalog = Catalog::new();
            catalog.load_str(black_box(&text)).unwrap();
            catalog
        })
    });
}

fn query(c: &mut Criterion) {
    let mut catalog = Catalog::new();
    catalog.load_str(&sample()).unwrap();
    catalog.desire("attr2", "at2valt04", 0);
    c.bench_function("query hourly targets", |b| {
        b.iter(|| catalog.query(black_box("stuff3"), black_box("2021-07-15T10:34"), "20210714_00").unwrap())
    });
    c.bench_function("query daily and monthly targets", |b| {
        b.iter(|| catalog.query(black_box("stuff2"), black_box("2021-07-15T10:34"), "").unwrap())
    });
}

fn variables(c: &mut Criterion) {
    let mut catalog = Catalog::new();
    catalog.load_str(&sample()).unwrap();
    c.bench_function("evaluate expression variable", |b| {
        b.iter(|| catalog.variable_value(black_box("expI03")).unwrap())
    });
}

criterion_group!(benches, load, query, variables);
criterion_main!(benches);
