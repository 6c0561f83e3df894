// Integration tests for docvec
use docvec::prelude::*;
use docvec::{CollectionStats, HnswQueryParams, LocalEngine, Operator, Value};
use serde_json::json;
use tempfile::TempDir;

fn products_schema() -> CollectionSchema {
    CollectionSchema::create(
        "products",
        vec![
            FieldSchema::new("title", DataType::String),
            FieldSchema::new("brand", DataType::String).with_nullable(true),
            FieldSchema::new("price", DataType::Double).with_nullable(true),
            FieldSchema::new("tags", DataType::ArrayString).with_nullable(true),
            FieldSchema::create(
                "embedding",
                DataType::VectorFp32,
                4,
                false,
                Some(&IndexParams::hnsw(MetricType::L2)),
            )
            .unwrap(),
            FieldSchema::new("keywords", DataType::SparseVectorFp32).with_nullable(true),
        ],
    )
    .unwrap()
}

fn product(pk: &str, brand: &str, price: f64, embedding: [f32; 4]) -> Doc {
    let schema = products_schema();
    let mut doc = Doc::with_pk(pk);
    let fields = [
        ("title", json!(format!("Product {}", pk))),
        ("brand", json!(brand)),
        ("price", json!(price)),
        ("tags", json!(["new", brand])),
        ("embedding", json!(embedding)),
    ];
    for (name, value) in fields {
        let field = schema.get_field(name).unwrap();
        doc.set_field_by_schema(field, &value).unwrap();
    }
    doc
}

fn catalog() -> Vec<Doc> {
    vec![
        product("p1", "acme", 9.5, [0.0, 0.0, 0.0, 1.0]),
        product("p2", "acme", 19.0, [0.0, 0.0, 1.0, 0.0]),
        product("p3", "zen", 29.0, [0.0, 1.0, 0.0, 0.0]),
        product("p4", "zen", 39.0, [1.0, 0.0, 0.0, 0.0]),
        product("p5", "orbit", 49.0, [1.0, 1.0, 0.0, 0.0]),
    ]
}

fn create(dir: &TempDir) -> Collection {
    Collection::create_and_open(dir.path().join("products"), &products_schema(), None).unwrap()
}

#[test]
fn test_insert_then_insert_again_is_already_exists() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);

    let docs = catalog();
    let first = collection.insert(&docs).unwrap();
    assert_eq!(first.len(), docs.len());
    assert!(first.iter().all(Status::is_ok));

    let second = collection.insert(&docs).unwrap();
    assert_eq!(second.len(), docs.len());
    assert!(second
        .iter()
        .all(|s| s.code() == StatusCode::AlreadyExists));
    assert_eq!(collection.stats().unwrap().doc_count, 5);
}

#[test]
fn test_statuses_keep_input_order() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    let mut bad = product("bad", "acme", 1.0, [0.0; 4]);
    bad.set_value("embedding", vec![1.0f32]);
    let batch = vec![
        product("a", "acme", 1.0, [0.0; 4]),
        bad,
        product("b", "acme", 1.0, [0.0; 4]),
    ];
    let statuses = collection.upsert(&batch).unwrap();
    let codes: Vec<StatusCode> = statuses.iter().map(Status::code).collect();
    assert_eq!(
        codes,
        vec![StatusCode::Ok, StatusCode::InvalidArgument, StatusCode::Ok]
    );
    assert!(statuses[1].to_string().starts_with("Error("));
}

#[test]
fn test_fetch_skips_missing_keys() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();

    let found = collection.fetch(&["p1", "missing"]).unwrap();
    assert_eq!(found.len(), 1);
    let p1 = &found["p1"];
    assert_eq!(p1.pk(), "p1");
    assert_eq!(p1.operator(), Operator::Insert);
    assert_eq!(p1.get("price"), Some(&Value::Double(9.5)));
    assert_eq!(
        p1.get_field("tags", DataType::ArrayString).unwrap(),
        Some(Value::from(vec!["new", "acme"]))
    );
}

#[test]
fn test_sparse_round_trip_keeps_insertion_order() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    let schema = collection.schema().unwrap();

    let mut doc = product("s1", "acme", 1.0, [0.0; 4]);
    doc.set_field_by_schema(
        schema.get_field("keywords").unwrap(),
        &json!({"0": 0.5, "7": 1.25}),
    )
    .unwrap();
    assert!(collection.insert(&[doc]).unwrap()[0].is_ok());

    let fetched = collection.fetch(&["s1"]).unwrap();
    let (indices, values) = fetched["s1"].get("keywords").unwrap().sparse_entries().unwrap();
    assert_eq!(indices, vec![0, 7]);
    assert_eq!(values, vec![0.5, 1.25]);
}

#[test]
fn test_delete_by_filter_on_empty_collection() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.delete_by_filter("score < 0").unwrap();
    assert_eq!(collection.stats().unwrap().doc_count, 0);
}

#[test]
fn test_delete_by_filter_and_delete() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();

    collection
        .delete_by_filter("brand IN ('zen', 'orbit') AND price > 30")
        .unwrap();
    let left = collection.fetch(&["p1", "p2", "p3", "p4", "p5"]).unwrap();
    let mut pks: Vec<&String> = left.keys().collect();
    pks.sort();
    assert_eq!(pks, vec!["p1", "p2", "p3"]);

    let statuses = collection.delete(&["p1", "p4"]).unwrap();
    assert!(statuses[0].is_ok());
    assert_eq!(statuses[1].code(), StatusCode::NotFound);
}

#[test]
fn test_query_with_filter_and_params() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();

    let mut query = VectorQuery::new("embedding")
        .with_topk(2)
        .with_filter("brand = 'acme' OR brand LIKE 'or%'")
        .with_query_params(HnswQueryParams::new(64));
    query.set_dense(&[1.0, 1.0, 0.0, 0.0]);
    let hits = collection.query(&query).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].pk(), "p5");
    assert_eq!(hits[0].score(), 0.0);
    assert!(hits[0].score() <= hits[1].score());
    assert!(!hits[0].has_field("embedding"));
    assert_eq!(hits[0].get("brand"), Some(&Value::from("orbit")));
}

#[test]
fn test_query_vector_convenience() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();

    let options = QueryVectorOptions {
        include_vector: true,
        output_fields: Some(vec!["title".to_string()]),
        ..Default::default()
    };
    let hits = collection
        .query_vector("embedding", &json!([0.0, 1.0, 0.0, 0.0]), 1, options)
        .unwrap();
    assert_eq!(hits[0].pk(), "p3");
    assert!(hits[0].has_field("embedding"));
    assert!(hits[0].has_field("title"));
    assert!(!hits[0].has_field("price"));
}

#[test]
fn test_group_by_brand() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();

    let mut query = GroupByVectorQuery::new("embedding", "brand");
    query.set_dense(&[0.0, 0.0, 0.0, 1.0]);
    query.group_count = 3;
    query.group_topk = 2;
    let groups = collection.group_by_query(&query).unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].group_by_value, "acme");
    assert_eq!(groups[0].docs.len(), 2);
    assert!(groups.iter().all(|g| g.docs.len() <= 2));
    let brands: Vec<&str> = groups.iter().map(|g| g.group_by_value.as_str()).collect();
    assert!(brands.contains(&"zen"));
    assert!(brands.contains(&"orbit"));
}

#[test]
fn test_reopen_keeps_documents_and_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products");
    {
        let collection = create(&dir);
        collection.insert(&catalog()).unwrap();
        collection.flush().unwrap();
    }
    let collection = Collection::open(&path, None).unwrap();
    assert_eq!(collection.schema().unwrap(), products_schema());
    assert_eq!(collection.stats().unwrap().doc_count, 5);
    assert_eq!(collection.path().unwrap(), path.display().to_string());

    let err = Collection::create_and_open(&path, &products_schema(), None).unwrap_err();
    assert_eq!(err.code(), StatusCode::AlreadyExists);
}

#[test]
fn test_open_missing_and_invalid_schema() {
    let dir = TempDir::new().unwrap();
    let err = Collection::open(dir.path().join("none"), None).unwrap_err();
    assert_eq!(err.code(), StatusCode::NotFound);

    let empty = CollectionSchema::new("empty");
    let err = Collection::create_and_open(dir.path().join("e"), &empty, None).unwrap_err();
    assert_eq!(err.code(), StatusCode::InvalidArgument);
}

#[test]
fn test_destroy_then_everything_fails() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();
    collection.destroy().unwrap();
    assert!(!dir.path().join("products").exists());

    assert_eq!(collection.stats().unwrap_err().code(), StatusCode::FailedPrecondition);
    assert_eq!(collection.flush().unwrap_err().code(), StatusCode::FailedPrecondition);
    assert_eq!(
        collection.fetch(&["p1"]).unwrap_err().code(),
        StatusCode::FailedPrecondition
    );
}

#[test]
fn test_read_only_collection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products");
    create(&dir).insert(&catalog()).unwrap();

    let collection = Collection::open(&path, Some(CollectionOptions::read_only())).unwrap();
    assert!(collection.options().unwrap().read_only);
    assert_eq!(collection.fetch(&["p1"]).unwrap().len(), 1);
    assert_eq!(
        collection.delete(&["p1"]).unwrap_err().code(),
        StatusCode::PermissionDenied
    );
    collection.flush().unwrap();
}

#[test]
fn test_index_and_column_ddl() {
    let dir = TempDir::new().unwrap();
    let collection = create(&dir);
    collection.insert(&catalog()).unwrap();

    let stats = collection.stats().unwrap();
    assert_eq!(stats.index_completeness["embedding"], 0.0);
    collection.optimize(2).unwrap();
    assert_eq!(collection.stats().unwrap().index_completeness["embedding"], 1.0);

    collection
        .create_index("brand", &IndexParams::invert(), 0)
        .unwrap();
    let stats: CollectionStats = collection.stats().unwrap();
    assert_eq!(stats.index_completeness["brand"], 1.0);
    collection.drop_index("brand").unwrap();
    assert!(!collection.stats().unwrap().index_completeness.contains_key("brand"));

    collection
        .add_column(&FieldSchema::new("in_stock", DataType::Bool), "true", 0)
        .unwrap();
    let p2 = collection.fetch(&["p2"]).unwrap().remove("p2").unwrap();
    assert_eq!(p2.get("in_stock"), Some(&Value::Bool(true)));

    collection
        .alter_column("in_stock", "available", None, 0)
        .unwrap();
    let schema = collection.schema().unwrap();
    assert!(schema.has_field("available"));
    assert!(!schema.has_field("in_stock"));

    let err = collection.drop_column("in_stock").unwrap_err();
    assert_eq!(err.code(), StatusCode::NotFound);
    collection.drop_column("available").unwrap();

    let new_doc = product("p9", "acme", 5.0, [0.5, 0.5, 0.5, 0.5]);
    assert!(collection.insert(&[new_doc]).unwrap()[0].is_ok());
}

#[test]
fn test_open_collection_block_form() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("products");
    drop(create(&dir));

    let n = open_collection(&path, None, |c| {
        c.insert(&catalog())?;
        Ok(c.stats()?.doc_count)
    })
    .unwrap();
    assert_eq!(n, 5);

    let reopened = Collection::open(&path, None).unwrap();
    assert_eq!(reopened.stats().unwrap().doc_count, 5);
}

#[test]
fn test_custom_engine_memory_limit() {
    let dir = TempDir::new().unwrap();
    let engine = LocalEngine::new().with_memory_limit(1);
    let collection = Collection::create_and_open_with_engine(
        &engine,
        dir.path().join("tiny"),
        &products_schema(),
        None,
    )
    .unwrap();
    let statuses = collection.insert(&catalog()).unwrap();
    assert!(statuses
        .iter()
        .all(|s| s.code() == StatusCode::ResourceExhausted));
}
