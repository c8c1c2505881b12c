//! Benchmark suite for the prediction pipeline
//!
//! Measures single-record latency per vertical, the validator on its own,
//! and CSV batch throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prever::{
    batch, demo,
    pipeline::Pipeline,
    schema::Vertical,
    validate::{validate, RawRecord},
};

fn pipeline(vertical: Vertical) -> Pipeline {
    demo::bundle(vertical)
        .and_then(|b| b.into_pipeline(vertical))
        .unwrap()
}

fn sample(vertical: Vertical) -> RawRecord {
    let fields: &[(&str, &str)] = match vertical {
        Vertical::Crop => &[
            ("Nitrogen", "90"),
            ("Phosporus", "42"),
            ("Potassium", "43"),
            ("Temperature", "20.8"),
            ("Humidity", "82.0"),
            ("pH", "6.5"),
            ("Rainfall", "202.9"),
        ],
        Vertical::Diabetes => &[
            ("AGE", "50"),
            ("Urea", "4.7"),
            ("Cr", "46"),
            ("HbA1c", "4.9"),
            ("Chol", "4.2"),
            ("TG", "0.9"),
            ("HDL", "2.4"),
            ("LDL", "1.4"),
            ("VLDL", "0.5"),
            ("BMI", "24"),
        ],
        Vertical::Liver => &[
            ("Age", "30"),
            ("Gender", "0"),
            ("BMI", "22"),
            ("AlcoholConsumption", "2"),
            ("Smoking", "0"),
            ("GeneticRisk", "0"),
            ("PhysicalActivity", "6"),
            ("Diabetes", "0"),
            ("Hypertension", "0"),
            ("LiverFunctionTest", "40"),
        ],
    };
    fields.iter().copied().collect()
}

fn benchmark_single_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_run");

    for vertical in Vertical::ALL {
        let pipeline = pipeline(vertical);
        let record = sample(vertical);
        group.bench_with_input(
            BenchmarkId::from_parameter(vertical),
            &record,
            |b, record| b.iter(|| black_box(pipeline.run(black_box(record)))),
        );
    }

    group.finish();
}

fn benchmark_validate(c: &mut Criterion) {
    let record = sample(Vertical::Diabetes);
    c.bench_function("validate_diabetes", |b| {
        b.iter(|| black_box(validate(Vertical::Diabetes, black_box(&record))))
    });
}

fn benchmark_csv_batch(c: &mut Criterion) {
    let pipeline = pipeline(Vertical::Diabetes);
    let mut group = c.benchmark_group("csv_batch");

    for rows in [10usize, 100, 1000] {
        let mut csv = String::from("AGE,Urea,Cr,HbA1c,Chol,TG,HDL,LDL,VLDL,BMI\n");
        for i in 0..rows {
            csv.push_str(&format!("{},4.7,46,{:.1},4.2,0.9,2.4,1.4,0.5,24\n", 30 + i % 50, 4.0 + (i % 60) as f64 / 10.0));
        }
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| black_box(batch::run_csv(&pipeline, black_box(csv.as_bytes()), rows).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_record,
    benchmark_validate,
    benchmark_csv_batch,
);
criterion_main!(benches);
