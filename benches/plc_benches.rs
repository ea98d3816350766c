//! Benchmarks for address parsing, data-block layout and request batching.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use s7_access::batch::partition;
use s7_access::simulator::MemoryPlc;
use s7_access::{parse_address, parse_db_source, Address, Area, ReadRequest, Variable};
use tokio::runtime::Runtime;

fn db_source(fields: usize) -> String {
    let mut text = String::from("DATA_BLOCK \"DB1\"\nSTRUCT\n");
    for i in 0..fields {
        let ty = match i % 4 {
            0 => "Bool",
            1 => "Byte",
            2 => "Int",
            _ => "Real",
        };
        text.push_str(&format!("   f{} : {}; // field {}\n", i, ty, i));
    }
    text.push_str("   rows : Array[0..9] of Struct\n");
    text.push_str("      a : Int;\n      b : Bool;\n   END_STRUCT;\n");
    text.push_str("END_STRUCT;\nBEGIN\nEND_DATA_BLOCK\n");
    text
}

fn scattered_addresses(count: usize) -> Vec<Address> {
    (0..count)
        .map(|i| {
            let db = 1 + (i % 4);
            let byte = (i / 4) * 6;
            parse_address(&format!("DB{},INT{}", db, byte)).unwrap()
        })
        .collect()
}

fn benchmark_parse_address(c: &mut Criterion) {
    let inputs = ["DB1,X14.0", "DB100,REAL8.3", "MW10", "E0.1", "DB5,LREAL120"];
    c.bench_function("parse_address", |b| {
        b.iter(|| {
            for text in inputs.iter() {
                black_box(parse_address(black_box(text)).unwrap());
            }
        })
    });
}

fn benchmark_db_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("db_layout");
    for fields in [10, 100, 1000].iter() {
        let text = db_source(*fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &text, |b, text| {
            b.iter(|| black_box(parse_db_source(black_box(text)).unwrap()))
        });
    }
    group.finish();
}

fn benchmark_span_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("span_merge");
    for count in [16, 256, 4096].iter() {
        let addrs = scattered_addresses(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &addrs, |b, addrs| {
            b.iter(|| {
                let spans: usize = partition(addrs)
                    .iter()
                    .map(|g| g.spans(addrs).len())
                    .sum();
                black_box(spans)
            })
        });
    }
    group.finish();
}

fn benchmark_read_request(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut plc = MemoryPlc::new();
    for db in 1..=4 {
        plc = plc.with_area(Area::DataBlock(db), 4096);
    }
    let vars: Vec<Variable> = scattered_addresses(256).into_iter().map(Variable::new).collect();
    let request = ReadRequest::new(vars).unwrap();

    c.bench_function("read_request_256", |b| {
        b.to_async(&rt).iter(|| async {
            let vars = request.execute(&plc).await.unwrap();
            plc.clear_calls();
            black_box(vars)
        })
    });
}

criterion_group!(
    benches,
    benchmark_parse_address,
    benchmark_db_layout,
    benchmark_span_merge,
    benchmark_read_request
);
criterion_main!(benches);
