// Benchmarks for document encoding and brute-force vector queries
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docvec::prelude::*;
use docvec::Value;
use rand::prelude::*;
use tempfile::TempDir;

fn generate_random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect()
}

fn generate_doc(id: usize, dim: usize) -> Doc {
    let mut doc = Doc::with_pk(format!("doc-{}", id));
    doc.set_value("text", format!("document number {}", id));
    doc.set_value("rank", id as i64);
    doc.set_value("embedding", generate_random_vector(dim));
    doc
}

fn schema(dim: u32, metric: MetricType) -> CollectionSchema {
    CollectionSchema::create(
        "bench",
        vec![
            FieldSchema::new("text", DataType::String),
            FieldSchema::new("rank", DataType::Int64),
            FieldSchema::create(
                "embedding",
                DataType::VectorFp32,
                dim,
                false,
                Some(&IndexParams::hnsw(metric)),
            )
            .unwrap(),
        ],
    )
    .unwrap()
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for dim in [128usize, 768].iter() {
        let raw = generate_random_vector(*dim);
        let value = Value::from(raw.clone());
        group.bench_with_input(BenchmarkId::new("vector_fp32", dim), &value, |b, value| {
            b.iter(|| black_box(value.encode()));
        });
        let fp16 = Value::vector_fp16(&raw);
        group.bench_with_input(BenchmarkId::new("vector_fp16", dim), &fp16, |b, value| {
            b.iter(|| black_box(value.encode()));
        });
    }

    group.finish();
}

fn benchmark_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(10);

    for size in [100usize, 1000].iter() {
        let docs: Vec<Doc> = (0..*size).map(|i| generate_doc(i, 128)).collect();
        group.bench_with_input(BenchmarkId::new("upsert", size), &docs, |b, docs| {
            let dir = TempDir::new().unwrap();
            let collection =
                Collection::create_and_open(dir.path().join("c"), &schema(128, MetricType::Cosine), None)
                    .unwrap();
            b.iter(|| {
                let statuses = collection.upsert(black_box(docs)).unwrap();
                black_box(statuses);
            });
        });
    }

    group.finish();
}

fn benchmark_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let dir = TempDir::new().unwrap();
    let collection =
        Collection::create_and_open(dir.path().join("c"), &schema(128, MetricType::Cosine), None)
            .unwrap();
    let docs: Vec<Doc> = (0..10_000).map(|i| generate_doc(i, 128)).collect();
    collection.insert(&docs).unwrap();
    collection.optimize(0).unwrap();

    let mut query = VectorQuery::new("embedding").with_topk(10);
    query.set_dense(&generate_random_vector(128));

    group.bench_function("brute_force_cosine", |b| {
        b.iter(|| black_box(collection.query(black_box(&query)).unwrap()));
    });

    let filtered = query.clone().with_filter("rank < 5000");
    group.bench_function("brute_force_filtered", |b| {
        b.iter(|| black_box(collection.query(black_box(&filtered)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_insert, benchmark_query);
criterion_main!(benches);
