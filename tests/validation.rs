// tests/validation.rs
//
// Integration-style validation tests (physics sanity checks) for the spin
// integrators.
// Run with: cargo test
// Or only these tests: cargo test --test validation

use atomspin::domain::DomainPartition;
use atomspin::effective_field::{SpinHamiltonian, UniaxialAnisotropy};
use atomspin::ensemble::EnsembleState;
use atomspin::halo::NoHalo;
use atomspin::heun::{step_stochastic_heun, HeunScratch};
use atomspin::neighbours::NeighbourList;
use atomspin::noise::{GaussianNoise, NoNoise, NoiseSource};
use atomspin::params::{IntegrationParams, LsfCoefficients, Material, MaterialTable, GAMMA_E_RAD_PER_S_T};
use atomspin::rk4::{step_stochastic_rk4, Rk4Scratch};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn table(m: Material) -> MaterialTable {
    MaterialTable::new(vec![m]).unwrap()
}

fn rk4_run<N: NoiseSource>(
    state: &mut EnsembleState,
    ham: &SpinHamiltonian,
    noise: &mut N,
    materials: &MaterialTable,
    params: &IntegrationParams,
    steps: usize,
) {
    let partition = DomainPartition::single(state.num_atoms());
    let mut halo = NoHalo::default();
    let mut scratch = Rk4Scratch::new();
    for _ in 0..steps {
        step_stochastic_rk4(state, &partition, ham, &mut halo, noise, materials, params, &mut scratch).unwrap();
    }
}

#[test]
fn macrospin_precession_quarter_turn_about_bz() {
    let b0 = 0.1; // Tesla
    let gamma = GAMMA_E_RAD_PER_S_T;
    let materials = table(Material::default());
    let ham = SpinHamiltonian::new(NeighbourList::from_pairs(1, Vec::new())).with_zeeman([0.0, 0.0, b0]);
    let params = IntegrationParams {
        dt: 1e-14,
        temperature: 0.0,
        equilibration_time: 0.0,
    };

    // quarter period: t = (pi/2)/(gamma B)
    let t_target = std::f64::consts::FRAC_PI_2 / (gamma * b0);
    let n_steps = (t_target / params.dt).round() as usize;
    let t_actual = n_steps as f64 * params.dt;

    let mut state = EnsembleState::new(1);
    state.spin[0] = [1.0, 0.0, 0.0];
    rk4_run(&mut state, &ham, &mut NoNoise, &materials, &params, n_steps);

    let phi = gamma * b0 * t_actual;
    let s = state.spin[0];
    assert!(approx_eq(s[0], phi.cos(), 1e-9), "sx = {}", s[0]);
    assert!(approx_eq(s[1], phi.sin(), 1e-9), "sy = {}", s[1]);
    assert!(approx_eq(s[2], 0.0, 1e-12));
    assert!(approx_eq(state.max_norm_error(1), 0.0, 1e-9));
}

#[test]
fn rk4_global_error_is_fourth_order() {
    let run = |steps: usize| {
        let materials = table(Material {
            gamma: 1.0,
            mu_s: 1.0,
            ..Default::default()
        });
        let ham = SpinHamiltonian::new(NeighbourList::from_pairs(1, Vec::new()))
            .with_zeeman([0.0, 0.0, 2.0 * std::f64::consts::PI]);
        let params = IntegrationParams {
            dt: 1.0 / steps as f64,
            temperature: 0.0,
            equilibration_time: 0.0,
        };
        let mut state = EnsembleState::new(1);
        state.spin[0] = [1.0, 0.0, 0.0];
        rk4_run(&mut state, &ham, &mut NoNoise, &materials, &params, steps);
        let s = state.spin[0];
        ((s[0] - 1.0).powi(2) + s[1].powi(2) + s[2].powi(2)).sqrt()
    };
    let ratio = run(40) / run(80);
    assert!((12.0..20.0).contains(&ratio), "ratio = {ratio}");
}

#[test]
fn isolated_atom_without_fields_is_unchanged() {
    let materials = table(Material {
        alpha: 0.3,
        ..Default::default()
    });
    let ham = SpinHamiltonian::new(NeighbourList::from_pairs(1, Vec::new()));
    let params = IntegrationParams {
        dt: 1e-15,
        temperature: 0.0,
        equilibration_time: 0.0,
    };
    let mut state = EnsembleState::new(1);
    state.spin[0] = [1.0, 0.0, 0.0];
    rk4_run(&mut state, &ham, &mut NoNoise, &materials, &params, 1);
    assert_eq!(state.spin[0], [1.0, 0.0, 0.0]);
    rk4_run(&mut state, &ham, &mut NoNoise, &materials, &params, 100);
    assert_eq!(state.spin[0], [1.0, 0.0, 0.0]);
}

#[test]
fn zero_temperature_ignores_noise_source() {
    let materials = table(Material {
        alpha: 0.1,
        ..Default::default()
    });
    let ham = SpinHamiltonian::new(NeighbourList::chain(10, 50.0, true)).with_zeeman([0.0, 0.5, 2.0]);
    let params = IntegrationParams {
        dt: 1e-16,
        temperature: 0.0,
        equilibration_time: 0.0,
    };
    let mut a = EnsembleState::new(10);
    for (i, s) in a.spin.iter_mut().enumerate() {
        let phi = i as f64;
        *s = [phi.cos() * 0.6, phi.sin() * 0.6, 0.8];
    }
    let mut b = a.clone();
    rk4_run(&mut a, &ham, &mut NoNoise, &materials, &params, 50);
    rk4_run(&mut b, &ham, &mut GaussianNoise::seeded(11), &materials, &params, 50);
    assert_eq!(a.spin, b.spin);
}

#[test]
fn anisotropy_pulls_spin_toward_easy_axis() {
    let materials = table(Material {
        alpha: 0.5,
        ..Default::default()
    });
    let ham = SpinHamiltonian::new(NeighbourList::from_pairs(1, Vec::new()))
        .with_anisotropy(vec![Some(UniaxialAnisotropy::new(10.0, [0.0, 0.0, 1.0]))]);
    let params = IntegrationParams {
        dt: 1e-15,
        temperature: 0.0,
        equilibration_time: 0.0,
    };
    let mut state = EnsembleState::new(1);
    let theta = 30.0_f64.to_radians();
    state.spin[0] = [theta.sin(), 0.0, theta.cos()];

    let cos_angle = |s: [f64; 3]| s[2] / (s[0] * s[0] + s[1] * s[1] + s[2] * s[2]).sqrt();
    let start = cos_angle(state.spin[0]);
    rk4_run(&mut state, &ham, &mut NoNoise, &materials, &params, 1000);
    let end = cos_angle(state.spin[0]);
    assert!(end > start + 0.05, "cos angle {start} -> {end}");
}

#[test]
fn heun_and_rk4_agree_for_lsf_relaxation() {
    // Landau minimum at |S|² = -c2 / (2 c4) = 1.44
    let mut m = Material {
        gamma: 1.0,
        alpha: 0.5,
        mu_s: 1.0,
        ..Default::default()
    };
    m.lsf = Some(LsfCoefficients {
        second: -1.44,
        fourth: 0.5,
        sixth: 0.0,
    });
    let materials = table(m);
    let ham = SpinHamiltonian::new(NeighbourList::from_pairs(1, Vec::new()));
    let params = IntegrationParams {
        dt: 0.01,
        temperature: 0.0,
        equilibration_time: 0.0,
    };

    let mut a = EnsembleState::new(1);
    a.spin[0] = [0.0, 0.0, 0.5];
    let mut b = a.clone();

    rk4_run(&mut a, &ham, &mut NoNoise, &materials, &params, 3000);
    let mut scratch = HeunScratch::new();
    for _ in 0..3000 {
        step_stochastic_heun(&mut b, &ham, &mut NoNoise, &materials, &params, &mut scratch);
    }
    assert!(approx_eq(a.spin[0][2], 1.2, 1e-6), "rk4 |S| = {}", a.spin[0][2]);
    assert!(approx_eq(b.spin[0][2], 1.2, 1e-6), "heun |S| = {}", b.spin[0][2]);
    assert!(approx_eq(scratch.spin_lengths()[0], 1.2, 1e-6));
}
