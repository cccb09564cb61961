//! Step throughput of the spin and spin-lattice integrators on periodic
//! chains of increasing size, at finite temperature so the noise path is
//! included.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use atomspin::domain::DomainPartition;
use atomspin::effective_field::SpinHamiltonian;
use atomspin::ensemble::EnsembleState;
use atomspin::halo::NoHalo;
use atomspin::heun::{step_stochastic_heun, HeunScratch};
use atomspin::neighbours::NeighbourList;
use atomspin::noise::GaussianNoise;
use atomspin::params::{IntegrationParams, LsfCoefficients, Material, MaterialTable};
use atomspin::rk4::{step_stochastic_rk4, Rk4Scratch};
use atomspin::spinlattice::{step_suzuki_trotter, PairwiseSpinLattice, SldCoupling, SuzukiTrotterScratch};

const SIZES: [usize; 3] = [64, 512, 4096];

fn materials() -> MaterialTable {
    MaterialTable::new(vec![Material {
        alpha: 0.1,
        h_th_sigma: 1.0,
        f_th_sigma: 0.01,
        mass: 5.788e-3,
        damp_lat: 0.1,
        ..Default::default()
    }])
    .unwrap()
}

fn params() -> IntegrationParams {
    IntegrationParams {
        dt: 1e-16,
        temperature: 300.0,
        equilibration_time: 0.0,
    }
}

fn chain(n: usize) -> EnsembleState {
    let mut state = EnsembleState::new(n);
    state.place_chain(2.48);
    state.set_uniform_spin([1.0, 0.0, 1.0]);
    state
}

fn bench_rk4(c: &mut Criterion) {
    let mut group = c.benchmark_group("rk4_step");
    let materials = materials();
    let params = params();
    for &n in &SIZES {
        group.throughput(Throughput::Elements(n as u64));
        let ham = SpinHamiltonian::new(NeighbourList::chain(n, 100.0, true)).with_zeeman([0.0, 0.0, 1.0]);
        let partition = DomainPartition::single(n);
        let mut state = chain(n);
        let mut halo = NoHalo::default();
        let mut noise = GaussianNoise::seeded(1);
        let mut scratch = Rk4Scratch::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                step_stochastic_rk4(
                    black_box(&mut state),
                    &partition,
                    &ham,
                    &mut halo,
                    &mut noise,
                    &materials,
                    &params,
                    &mut scratch,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_heun_lsf(c: &mut Criterion) {
    let mut group = c.benchmark_group("heun_lsf_step");
    let mut m = materials().get(0).clone();
    m.lsf = Some(LsfCoefficients {
        second: 0.5,
        fourth: -0.25,
        sixth: 0.0,
    });
    let materials = MaterialTable::new(vec![m]).unwrap();
    let params = params();
    for &n in &SIZES {
        group.throughput(Throughput::Elements(n as u64));
        let ham = SpinHamiltonian::new(NeighbourList::chain(n, 100.0, true));
        let mut state = chain(n);
        let mut noise = GaussianNoise::seeded(2);
        let mut scratch = HeunScratch::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| step_stochastic_heun(black_box(&mut state), &ham, &mut noise, &materials, &params, &mut scratch))
        });
    }
    group.finish();
}

fn bench_suzuki_trotter(c: &mut Criterion) {
    let mut group = c.benchmark_group("suzuki_trotter_step");
    let materials = materials();
    let params = params();
    for &n in &SIZES {
        group.throughput(Throughput::Elements(n as u64));
        let mut sl = PairwiseSpinLattice::new(
            NeighbourList::chain(n, 0.0, true),
            vec![SldCoupling {
                j0: 100.0,
                j0_prime: 0.05,
                spring: 1.0,
                ..Default::default()
            }],
            3.5,
        );
        let mut state = chain(n);
        sl.reference_positions = state.position.clone();
        let mut noise = GaussianNoise::seeded(3);
        let mut scratch = SuzukiTrotterScratch::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                step_suzuki_trotter(
                    black_box(&mut state),
                    &sl,
                    &mut noise,
                    &materials,
                    &params,
                    0.0,
                    &mut scratch,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rk4, bench_heun_lsf, bench_suzuki_trotter);
criterion_main!(benches);
