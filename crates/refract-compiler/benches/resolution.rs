//! Reference resolution benchmarks.
//!
//! Measures cold resolution (document parse plus pointer walk) against the
//! fragment cache, and a full compile with `$ref` inlining, for documents
//! with varying numbers of definitions.
//!
//! Run with: cargo bench -p refract-compiler --bench resolution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use refract_compiler::{
    CompileOptions, Compiler, ExtensionRegistry, Locator, MemorySource, ReferenceResolver,
};

/// Generate a document with N definitions, each referenced once from `paths`.
fn generate_document(definition_count: usize) -> String {
    let mut yaml = String::from("openapi: \"3.0.3\"\npaths:\n");
    for i in 0..definition_count {
        yaml.push_str(&format!(
            "  /resource{i}:\n    get:\n      responses:\n        \"200\":\n          schema:\n            $ref: \"#/definitions/Resource{i}\"\n",
            i = i
        ));
    }
    yaml.push_str("definitions:\n");
    for i in 0..definition_count {
        yaml.push_str(&format!(
            "  Resource{i}:\n    type: object\n    properties:\n      id:\n        type: string\n        format: uuid\n      name:\n        type: string\n        maxLength: 255\n",
            i = i
        ));
    }
    yaml
}

fn source_for(definition_count: usize) -> (MemorySource, Locator) {
    let mut source = MemorySource::new();
    let locator = source
        .insert("/bench/api.yaml", generate_document(definition_count))
        .unwrap();
    (source, locator)
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for count in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::new("cold", count), &count, |b, &count| {
            let (source, locator) = source_for(count);
            let reference = format!("#/definitions/Resource{}", count - 1);
            b.iter(|| {
                let resolver = ReferenceResolver::with_source(&source);
                black_box(resolver.resolve(&locator, &reference).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("cached", count), &count, |b, &count| {
            let (source, locator) = source_for(count);
            let resolver = ReferenceResolver::with_source(source);
            let reference = format!("#/definitions/Resource{}", count - 1);
            resolver.resolve(&locator, &reference).unwrap();
            b.iter(|| {
                black_box(resolver.resolve(&locator, black_box(&reference)).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_inline_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline_compile");
    let registry = ExtensionRegistry::new();
    let options = CompileOptions {
        inline_refs: true,
        ..CompileOptions::default()
    };

    for count in [10, 100] {
        group.bench_with_input(BenchmarkId::new("compile", count), &count, |b, &count| {
            let (source, locator) = source_for(count);
            b.iter(|| {
                let resolver = ReferenceResolver::with_source(&source);
                let compiler = Compiler::with_options(&resolver, &registry, options.clone());
                black_box(compiler.compile(&locator).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_inline_compile);
criterion_main!(benches);
