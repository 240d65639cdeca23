/// Benchmarks for the flow split, the retention matrix and full report
/// generation, over synthetic data shaped like a few years of pipeline output.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use usagestats::analysis::build_cohort_matrix;
use usagestats::data::{GeoRow, ToolVisitRow, TrafficTypeRow};
use usagestats::utils::YearMonth;
use usagestats::{build_report, split_scaled, CohortRow, Config, Dataset};

/// Build retention rows for `cohorts` monthly cohorts observed up to a common end month
fn synthetic_cohorts(rng: &mut StdRng, cohorts: u32) -> Vec<CohortRow> {
    let start = YearMonth::new(2022, 1).unwrap();
    let mut rows = Vec::new();
    for c in 0..cohorts {
        let cohort = start.add_months(c).to_string();
        let size = rng.gen_range(10..5_000u64);
        for lag in 0..(cohorts - c) {
            rows.push(CohortRow {
                cohort_key: cohort.clone(),
                lag,
                retained_count: rng.gen_range(0..=size),
                cohort_size: size,
            });
        }
    }
    rows
}

fn synthetic_dataset(rng: &mut StdRng) -> Dataset {
    Dataset {
        traffic_types: ["Likely Human", "Bot", "AI-Assistant / Bot"]
            .iter()
            .map(|t| TrafficTypeRow {
                traffic_type: t.to_string(),
                count: rng.gen_range(1_000..10_000_000),
            })
            .collect(),
        tool_visits: ["EUI", "RUI", "CDE", "FTU Explorer", "KG Explorer"]
            .iter()
            .map(|t| ToolVisitRow {
                tool: t.to_string(),
                visits: rng.gen_range(10..100_000),
            })
            .collect(),
        geo: (0..200)
            .map(|i| GeoRow {
                c_country: format!("C{i}"),
                visits: rng.gen_range(1..50_000),
            })
            .collect(),
        cohort_retention: synthetic_cohorts(rng, 36),
        ..Dataset::default()
    }
}

/// Benchmark the square-root split with increasing fan-out
///
/// # Arguments
/// * `c` - Criterion benchmark configuration
fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("flow_split");
    let mut rng = StdRng::seed_from_u64(1);

    for fan_out in [2usize, 16, 256] {
        let children: Vec<f64> = (0..fan_out).map(|_| rng.gen_range(0.0..1e7)).collect();
        group.bench_function(format!("split_scaled_{fan_out}"), |b| {
            b.iter(|| split_scaled(black_box(1_000.0), black_box(&children)))
        });
    }

    group.finish();
}

/// Benchmark retention matrix construction
///
/// # Arguments
/// * `c` - Criterion benchmark configuration
fn bench_cohorts(c: &mut Criterion) {
    let mut group = c.benchmark_group("cohort_matrix");
    let mut rng = StdRng::seed_from_u64(2);

    for cohorts in [12u32, 36, 120] {
        let rows = synthetic_cohorts(&mut rng, cohorts);
        group.bench_function(format!("build_cohort_matrix_{cohorts}"), |b| {
            b.iter(|| build_cohort_matrix(black_box(&rows), 10).unwrap())
        });
    }

    group.finish();
}

/// Benchmark deriving a whole report without memoization
///
/// # Arguments
/// * `c` - Criterion benchmark configuration
fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");
    let mut rng = StdRng::seed_from_u64(3);
    let dataset = synthetic_dataset(&mut rng);
    let config = Config::default();

    group.bench_function("build_report", |b| {
        b.iter(|| build_report(black_box(&dataset), &config).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_split, bench_cohorts, bench_report);
criterion_main!(benches);
