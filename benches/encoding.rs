//! Benchmarks for the per-row encoding path.
//!
//! Covers the individual field encoders, timestamp parsing, and the full
//! parse-and-encode of a composed sensor row.
//!
//! Run with: `cargo bench --bench encoding`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mokosh_sensor::encoders::{
    DateEncoderParams, DateParser, RdseParams, ScalarEncoderParams,
};
use mokosh_sensor::prelude::*;

const SENSOR_ENCODERS: &str = r#"{
    "fieldEncodings": {
        "consumption": {
            "n": 400, "w": 21, "resolution": 0.1,
            "encoderType": "RandomDistributedScalarEncoder"
        },
        "timestamp": {
            "dayOfWeek": [21, 1.0],
            "weekend": [21, 1.0],
            "timeOfDay": [21, 4.0],
            "formatPattern": "MM/dd/YY HH:mm"
        }
    }
}"#;

// =============================================================================
// FIELD ENCODERS
// =============================================================================

/// Scalar encoders at a few output widths.
fn bench_scalar(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar_encode");

    for size in [100u32, 400, 2048] {
        let encoder = ScalarEncoder::new(ScalarEncoderParams {
            minimum: 0.0,
            maximum: 100.0,
            size,
            active_bits: 21,
            ..Default::default()
        })
        .unwrap();
        let mut output = Sdr::new(&[size]);

        group.bench_with_input(BenchmarkId::new("size", size), &encoder, |b, enc| {
            let mut value = 0.0;
            b.iter(|| {
                value = (value + 0.37) % 100.0;
                enc.encode(black_box(value), &mut output).unwrap();
                black_box(output.get_sum())
            });
        });
    }

    group.finish();
}

/// RDSE cost is dominated by hashing, so scale by active bits.
fn bench_rdse(c: &mut Criterion) {
    let mut group = c.benchmark_group("rdse_encode");

    for active_bits in [9u32, 21, 41] {
        let encoder = RandomDistributedScalarEncoder::new(RdseParams {
            size: 1000,
            active_bits,
            resolution: 0.1,
            ..Default::default()
        })
        .unwrap();
        let mut output = Sdr::new(&[1000]);

        group.throughput(Throughput::Elements(u64::from(active_bits)));
        group.bench_with_input(
            BenchmarkId::new("active_bits", active_bits),
            &encoder,
            |b, enc| {
                let mut value = 0.0;
                b.iter(|| {
                    value += 0.1;
                    enc.encode(black_box(value), &mut output).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_date(c: &mut Criterion) {
    let encoder = DateEncoder::new(DateEncoderParams {
        season_width: 21,
        day_of_week_width: 21,
        weekend_width: 21,
        time_of_day_width: 21,
        ..Default::default()
    })
    .unwrap();
    let mut output = Sdr::new(&[encoder.width() as u32]);

    c.bench_function("date_encode", |b| {
        let mut seconds: i64 = 1_278_000_000;
        b.iter(|| {
            seconds += 3600;
            encoder.encode(black_box(seconds), &mut output).unwrap();
        });
    });
}

// =============================================================================
// PARSING
// =============================================================================

fn bench_date_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("date_parse");
    let inputs = ["7/2/10 0:00", "12/31/10 23:59", "1/1/11 13:05"];

    let locked = DateParser::builtin();
    locked.parse(inputs[0]).unwrap();
    group.bench_function("locked", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(locked.parse(black_box(input)).unwrap());
            }
        });
    });

    group.bench_function("detect", |b| {
        b.iter(|| {
            let parser = DateParser::builtin();
            black_box(parser.parse(black_box(inputs[1])).unwrap())
        });
    });

    group.finish();
}

// =============================================================================
// SENSOR ROWS
// =============================================================================

fn bench_sensor_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor_rows");

    for rows in [100usize, 1000] {
        let mut csv = String::from("timestamp,consumption\ndatetime,float\nT,\n");
        for i in 0..rows {
            csv.push_str(&format!("7/{}/10 {}:00,{}.{}\n", 1 + i / 24 % 28, i % 24, i % 50, i % 10));
        }

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &csv, |b, csv| {
            let params = EncoderParameters::from_json_str(SENSOR_ENCODERS).unwrap();
            b.iter(|| {
                let mut sensor = Sensor::builder()
                    .factory(CsvSource::create)
                    .params(SensorParams::inline(csv.as_str()))
                    .build()
                    .unwrap();
                sensor.set_local_parameters(&params).unwrap();
                let encoded = sensor
                    .output_stream()
                    .unwrap()
                    .filter(Result::is_ok)
                    .count();
                black_box(encoded)
            });
        });
    }

    group.finish();
}

criterion_group!(encoder_benches, bench_scalar, bench_rdse, bench_date);
criterion_group!(parse_benches, bench_date_parsing);
criterion_group!(sensor_benches, bench_sensor_rows);

criterion_main!(encoder_benches, parse_benches, sensor_benches);
