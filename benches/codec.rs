use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hyper::{StatusCode, Uri};
use vcrcache::storage::{read_cache_file, write_cache_file};
use vcrcache::{Request, Response};

fn records(count: usize, body_size: usize) -> Vec<(Request, Response)> {
    (0..count)
        .map(|i| {
            let uri: Uri = format!("https://example.com/api/items/{i}").parse().unwrap();
            let request = Request::get(uri)
                .with_header("Accept", "application/json")
                .with_header("X-Request-Id", &i.to_string());
            let response = Response::new(StatusCode::OK)
                .with_header("Content-Type", "application/json")
                .with_body(vec![b'x'; body_size]);
            (request, response)
        })
        .collect()
}

fn bench_write_cache_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_cache_file");

    for body_size in [100, 1_000, 10_000] {
        let records = records(100, body_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(body_size),
            &records,
            |b, records| {
                b.iter(|| {
                    let mut out = Vec::new();
                    write_cache_file(&mut out, records.iter().map(|(q, r)| (q, r))).unwrap();
                    black_box(out)
                });
            },
        );
    }

    group.finish();
}

fn bench_read_cache_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_cache_file");

    for body_size in [100, 1_000, 10_000] {
        let records = records(100, body_size);
        let mut bytes = Vec::new();
        write_cache_file(&mut bytes, records.iter().map(|(q, r)| (q, r))).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(body_size), &bytes, |b, bytes| {
            b.iter(|| read_cache_file(&mut black_box(bytes.as_slice())).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write_cache_file, bench_read_cache_file);
criterion_main!(benches);
