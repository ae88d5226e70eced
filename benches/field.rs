use criterion::{criterion_group, criterion_main, Criterion};
use node_field::{decode::decode_document, encode::encode_document, Document, MemoryStore, NodeField, Value};
use std::hint::black_box;
use std::sync::Arc;

struct Event {
    id: u64,
}

fn event_body(frames: usize) -> Document {
    let frames: Vec<Value> = (0..frames)
        .map(|i| {
            let mut frame = Document::new();
            frame.insert("filename".into(), Value::from(format!("src/module_{}.rs", i % 17)));
            frame.insert("function".into(), Value::from(format!("handler_{}", i)));
            frame.insert("lineno".into(), Value::from(i as i64 * 3));
            frame.insert("in_app".into(), Value::from(i % 2 == 0));
            Value::Map(frame)
        })
        .collect();
    let mut body = Document::new();
    body.insert("message".into(), Value::from("connection reset by peer"));
    body.insert("level".into(), Value::from("error"));
    body.insert("frames".into(), Value::Array(frames));
    body
}

fn bench_encoding(c: &mut Criterion) {
    let body = event_body(200);
    let raw = encode_document(&body);

    c.bench_function("encoding/encode_document", |b| {
        b.iter(|| black_box(encode_document(black_box(&body))));
    });
    c.bench_function("encoding/decode_document", |b| {
        b.iter(|| black_box(decode_document(black_box(&raw)).expect("decode body")));
    });
}

fn bench_field(c: &mut Criterion) {
    let store = Arc::new(MemoryStore::new());
    let field = NodeField::builder(store)
        .reference(1, |e: &Event| Some(Value::from(e.id.to_string())))
        .build();
    let event = Event { id: 42 };
    let body = event_body(50);

    c.bench_function("field/save_new", |b| {
        b.iter(|| {
            let mut node = field.from_document(body.clone());
            black_box(field.encode(&mut node, &event).expect("save node"));
        });
    });

    let mut node = field.from_document(body.clone());
    let column = field
        .encode(&mut node, &event)
        .expect("save node")
        .expect("column value");
    c.bench_function("field/load_and_populate", |b| {
        b.iter(|| {
            let mut node = field.decode(black_box(column.as_slice()));
            field
                .populate(&mut node, Some(Value::from("42")))
                .expect("populate node");
            black_box(node.len().expect("node length"));
        });
    });
}

criterion_group!(benches, bench_encoding, bench_field);
criterion_main!(benches);
