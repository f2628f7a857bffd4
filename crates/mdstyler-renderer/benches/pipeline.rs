//! Benchmarks for the markdown transform pipeline.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mdstyler_renderer::{Pipeline, RenderOptions};

/// Generate markdown exercising every pass.
fn generate_markdown(sections: usize) -> String {
    let mut md = String::from("# Document Title\n\n");
    for i in 0..sections {
        md.push_str(&format!("## Section {i}\n\n"));
        md.push_str("Paragraph with **bold**, *italic*, `code` and $x^2 + y^2$.\n\n");
        md.push_str("> [!NOTE]\n> A callout with <kbd>raw</kbd> markup.\n\n");
        md.push_str("| a | b |\n|---|---|\n| 1 | 2 |\n\n");
        md.push_str("```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n\n");
        md.push_str("- [x] done\n- [ ] todo\n\n");
    }
    md
}

fn bench_render_simple(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    c.bench_function("render_simple_markdown", |b| {
        b.iter(|| pipeline.render("# Hello\n\nSimple content."));
    });
}

fn bench_render_without_highlighting(c: &mut Criterion) {
    let pipeline = Pipeline::new(RenderOptions {
        highlight: false,
        ..RenderOptions::default()
    });
    let markdown = generate_markdown(10);
    c.bench_function("render_10_sections_no_highlight", |b| {
        b.iter(|| pipeline.render(&markdown));
    });
}

fn bench_render_varying_sizes(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let mut group = c.benchmark_group("render_by_size");

    for sections in [5, 20, 50] {
        let markdown = generate_markdown(sections);
        group.throughput(Throughput::Bytes(markdown.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("markdown", format!("{sections}s")),
            &markdown,
            |b, md| b.iter(|| pipeline.render(md)),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render_simple,
    bench_render_without_highlighting,
    bench_render_varying_sizes
);
criterion_main!(benches);
