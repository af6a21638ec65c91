//! Benchmarks for caplet_stripping.

use std::sync::Arc;

use caplet_models::instruments::{CapFloor, IborIndex};
use caplet_models::market_data::{FlatCurve, MultiCurve};
use caplet_stripping::{
    strip_buckets, BucketJob, CapletStripper, DirectStripper, MarketDataType, MultiCapFloorPricer,
    TermStructureStripper,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Quarterly caps to 1y, 2y, ..., `years` at each strike.
fn generate_pricer(strikes: &[f64], years: usize) -> Arc<MultiCapFloorPricer> {
    let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
    let index = IborIndex::new("USD-LIBOR-3M", 0.25).unwrap();
    let caps = strikes
        .iter()
        .flat_map(|&k| (1..=years).map(move |y| (k, y as f64)))
        .map(|(k, end)| CapFloor::from_schedule(index.clone(), k, true, 0.25, end, &curves).unwrap())
        .collect();
    Arc::new(MultiCapFloorPricer::new(caps).unwrap())
}

fn market_vols(pricer: &MultiCapFloorPricer) -> Vec<f64> {
    let caplet_vols: Vec<f64> = pricer
        .expiry_strike_grid()
        .points()
        .iter()
        .map(|&(t, k)| 0.15 + 0.1 * (-0.3 * t).exp() + 2.0 * (0.03 - k).abs())
        .collect();
    pricer.cap_vols_from_caplet_vols(&caplet_vols).unwrap()
}

fn benchmark_pricing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cap_pricing");

    for years in [5, 10, 20] {
        let pricer = generate_pricer(&[0.02, 0.03, 0.04], years);
        let vols = vec![0.2; pricer.num_caplets()];

        group.bench_with_input(BenchmarkId::from_parameter(years), &vols, |b, vols| {
            b.iter(|| pricer.price(black_box(vols)))
        });
    }

    group.finish();
}

fn benchmark_cap_vol_vega(c: &mut Criterion) {
    let pricer = generate_pricer(&[0.02, 0.03, 0.04], 10);
    let vols = vec![0.2; pricer.num_caplets()];

    c.bench_function("cap_vol_vega_10y", |b| b.iter(|| pricer.cap_vol_vega(black_box(&vols))));
}

fn benchmark_direct_stripping(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_stripping");
    group.sample_size(10);

    for years in [3, 5, 10] {
        let pricer = generate_pricer(&[0.025, 0.035], years);
        let market = market_vols(&pricer);
        let stripper = DirectStripper::with_defaults(pricer).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(years), &market, |b, market| {
            b.iter(|| stripper.solve(black_box(market), MarketDataType::Vol, None, None))
        });
    }

    group.finish();
}

fn benchmark_bucket_stripping(c: &mut Criterion) {
    let strikes = [0.01, 0.015, 0.02, 0.025, 0.03, 0.035, 0.04, 0.05];
    let strippers: Vec<_> = strikes
        .iter()
        .map(|&k| TermStructureStripper::with_defaults(generate_pricer(&[k], 10)).unwrap())
        .collect();
    let markets: Vec<_> = strippers.iter().map(|s| market_vols(s.imp().pricer())).collect();
    let jobs: Vec<_> = strippers
        .iter()
        .zip(&markets)
        .map(|(s, m)| BucketJob {
            stripper: s,
            market_values: m,
            data_type: MarketDataType::Vol,
            errors: None,
            guess: None,
        })
        .collect();

    let mut group = c.benchmark_group("bucket_stripping");
    group.sample_size(10);
    group.bench_function("term_structure_8_strikes", |b| b.iter(|| strip_buckets(black_box(&jobs))));
    group.finish();
}

criterion_group!(
    benches,
    benchmark_pricing,
    benchmark_cap_vol_vega,
    benchmark_direct_stripping,
    benchmark_bucket_stripping,
);
criterion_main!(benches);
