#![allow(non_snake_case)]
use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::DVector;
use std::hint::black_box;
use RustedSDC::numerical::SDC::SDC_config::SweeperParams;
use RustedSDC::numerical::SDC::SDC_preconditioners::QDeltaType;
use RustedSDC::numerical::SDC::SDC_problems::{LorenzAttractor, TestEquation};
use RustedSDC::numerical::SDC::SDC_sweeper::Sweeper;

fn bench_lorenz_sweeps(c: &mut Criterion) {
    let mut group = c.benchmark_group("Lorenz sweeps");
    for QI in [QDeltaType::ImplicitEuler, QDeltaType::LU] {
        let params = SweeperParams {
            QI,
            ..SweeperParams::default()
        };
        let sweeper = Sweeper::new(&params).unwrap();
        let problem = LorenzAttractor::default();
        let u0 = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        group.bench_function(format!("QI = {}", QI), |b| {
            b.iter(|| {
                let mut level = sweeper.new_level(3, 0.05);
                level.init(u0.clone(), 0.0).unwrap();
                sweeper.predict(&mut level, &problem).unwrap();
                for _ in 0..5 {
                    sweeper.update_nodes(&mut level, &problem).unwrap();
                }
                black_box(sweeper.compute_residual(&mut level).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_large_linear_sweep(c: &mut Criterion) {
    let nvars = 10_000;
    let sweeper = Sweeper::new(&SweeperParams::default()).unwrap();
    let u0 = DVector::from_element(nvars, 1.0);
    let problem = TestEquation::new(-1.0, u0.clone(), 0.0);
    let mut level = sweeper.new_level(nvars, 0.1);
    level.init(u0, 0.0).unwrap();
    sweeper.predict(&mut level, &problem).unwrap();
    c.bench_function("linear sweep, 10000 unknowns", |b| {
        b.iter(|| sweeper.update_nodes(black_box(&mut level), &problem).unwrap())
    });
}

criterion_group!(benches, bench_lorenz_sweeps, bench_large_linear_sweep);
criterion_main!(benches);
