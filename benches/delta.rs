//! Throughput of the per-frame delta path: bit decisions and RLE.

use akc_video::{
    keyframe::BlockAverager,
    source::{FrameSource, MockSource},
    AccumulatorBank, DeltaEncoder, RlePacker,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn bench_delta(c: &mut Criterion) {
    let mut source = MockSource::new(WIDTH, HEIGHT, 1);
    let Ok(Some(frame)) = source.next_frame() else {
        panic!("mock source produced no frame");
    };
    let grid = BlockAverager::default().average(&frame).unwrap();
    let encoder = DeltaEncoder::new(8);

    let mut group = c.benchmark_group("delta");
    group.throughput(Throughput::Elements(frame.pixel_count() as u64));

    group.bench_function("average_640x480", |b| {
        let averager = BlockAverager::default();
        b.iter(|| averager.average(black_box(&frame)).unwrap())
    });

    group.bench_function("encode_640x480", |b| {
        let mut bank = AccumulatorBank::new(WIDTH, HEIGHT);
        b.iter(|| encoder.encode(black_box(&frame), &grid, &mut bank).unwrap())
    });

    let mut bank = AccumulatorBank::new(WIDTH, HEIGHT);
    let plane = encoder.encode(&frame, &grid, &mut bank).unwrap();
    let packed = RlePacker::pack(&plane);

    group.bench_function("rle_pack_640x480", |b| {
        b.iter(|| RlePacker::pack(black_box(&plane)))
    });

    group.bench_function("rle_unpack_640x480", |b| {
        b.iter(|| RlePacker::unpack(black_box(&packed), plane.len()).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_delta);
criterion_main!(benches);
