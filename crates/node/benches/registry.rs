//! Benchmark: wrapper lookup through the identity registry

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dom::Document;
use node::Context;

fn page(items: usize) -> Context {
    let html: String = (0..items).map(|i| format!(r#"<li id="i{}" class="x">{}</li>"#, i, i)).collect();
    Context::new(Document::from_html(&format!("<ul>{}</ul>", html)).unwrap())
}

fn benchmark_rewrap(c: &mut Criterion) {
    let ctx = page(200);
    let raw = ctx.one("#i100").unwrap().raw().unwrap();

    c.bench_function("rewrap_registered", |b| {
        b.iter(|| black_box(ctx.one(black_box(raw))))
    });
}

fn benchmark_wrap_list(c: &mut Criterion) {
    let ctx = page(200);
    let list = ctx.all(".x");

    c.bench_function("wrap_200_items", |b| {
        b.iter(|| list.iter().count())
    });
}

fn benchmark_batch(c: &mut Criterion) {
    let ctx = page(200);
    let list = ctx.all(".x");

    c.bench_function("batch_get_200_items", |b| {
        b.iter(|| black_box(list.get("id").unwrap()))
    });
}

criterion_group!(benches, benchmark_rewrap, benchmark_wrap_list, benchmark_batch);
criterion_main!(benches);
