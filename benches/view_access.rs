use std::rc::Rc;

use bitview::{RawMapping, ViewType};
use criterion::{Criterion, criterion_group, criterion_main};

fn gen_type(field_count: usize) -> Rc<ViewType> {
    let mut fields = RawMapping::new();

    for i in 0..field_count {
        let start = (i * 4) as i64;
        fields = fields.range(format!("f{}", i), start, start + 4);
    }

    ViewType::builder("Bench")
        .size((field_count * 4) as u32)
        .fields(fields)
        .build()
        .unwrap()
}

fn bench_schema_build(c: &mut Criterion) {
    for &field_count in &[1usize, 8, 32] {
        c.bench_function(&format!("build_{}_fields", field_count), |b| {
            b.iter(|| gen_type(field_count))
        });
    }
}

fn bench_named_access(c: &mut Criterion) {
    for &field_count in &[1usize, 8, 32] {
        let ty = gen_type(field_count);
        // Deterministic but non-trivial pattern
        let view = ty.view(0x0123_4567_89AB_CDEF_0123_4567_89AB_CDEF);
        let last = format!("f{}", field_count - 1);

        c.bench_function(&format!("get_{}_fields", field_count), |b| {
            b.iter(|| view.get(&last).unwrap().value())
        });
    }
}

fn bench_write_through(c: &mut Criterion) {
    let ty = ViewType::builder("Nested")
        .size(32)
        .fields(RawMapping::new().nested(
            "outer",
            0,
            32,
            RawMapping::new().nested("inner", 8, 24, RawMapping::new().range("leaf", 4, 12)),
        ))
        .build()
        .unwrap();
    let view = ty.view(0);

    c.bench_function("write_through_depth_3", |b| {
        b.iter(|| {
            let mut leaf = view.get("outer").unwrap().get("inner").unwrap().get("leaf").unwrap();
            leaf.set_value(0xAB).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_schema_build,
    bench_named_access,
    bench_write_through
);
criterion_main!(benches);
