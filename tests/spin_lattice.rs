// tests/spin_lattice.rs
//
// Suzuki–Trotter spin-lattice integrator: determinism, sweep order,
// equilibration switching and conservation checks.

use approx::assert_relative_eq;
use proptest::prelude::*;

use atomspin::ensemble::EnsembleState;
use atomspin::neighbours::NeighbourList;
use atomspin::noise::{GaussianNoise, NoNoise};
use atomspin::params::{IntegrationParams, Material, MaterialTable, Phase};
use atomspin::spinlattice::suzuki_trotter::spin_sweep;
use atomspin::spinlattice::{
    step_suzuki_trotter, PairwiseSpinLattice, SimulationBox, SldCoupling, SuzukiTrotterScratch,
    SweepDirection,
};
use atomspin::vec3::normalize;

fn iron() -> Material {
    Material {
        alpha: 0.05,
        mass: 5.788e-3,
        h_th_sigma: 2.0,
        f_th_sigma: 0.02,
        damp_lat: 0.2,
        ..Default::default()
    }
}

fn ring(n: usize, spacing: f64) -> (EnsembleState, PairwiseSpinLattice) {
    let mut state = EnsembleState::new(n);
    state.place_chain(spacing);
    for (i, s) in state.spin.iter_mut().enumerate() {
        let t = i as f64 * 0.9;
        *s = normalize([t.cos(), t.sin(), 0.5]);
    }
    let mut sl = PairwiseSpinLattice::new(
        NeighbourList::chain(n, 0.0, true),
        vec![SldCoupling {
            j0: 80.0,
            j0_prime: 0.05,
            spring: 2.0,
            ..Default::default()
        }],
        1.6 * spacing,
    );
    sl.simulation_box = SimulationBox {
        size: [n as f64 * spacing, 0.0, 0.0],
        periodic: [true, false, false],
    };
    sl.reference_positions = state.position.clone();
    (state, sl)
}

fn params(temperature: f64) -> IntegrationParams {
    IntegrationParams {
        dt: 1e-16,
        temperature,
        equilibration_time: 0.0,
    }
}

fn run(state: &mut EnsembleState, sl: &PairwiseSpinLattice, materials: &MaterialTable, p: &IntegrationParams, seed: u64, steps: usize) {
    let mut noise = GaussianNoise::seeded(seed);
    let mut scratch = SuzukiTrotterScratch::new();
    for step in 0..steps {
        step_suzuki_trotter(state, sl, &mut noise, materials, p, step as f64 * p.dt, &mut scratch);
    }
}

#[test]
fn same_seed_same_trajectory() {
    let materials = MaterialTable::new(vec![iron()]).unwrap();
    let (initial, sl) = ring(10, 2.48);
    let p = params(500.0);

    let mut a = initial.clone();
    let mut b = initial.clone();
    run(&mut a, &sl, &materials, &p, 9, 40);
    run(&mut b, &sl, &materials, &p, 9, 40);
    assert_eq!(a, b);

    let mut c = initial.clone();
    run(&mut c, &sl, &materials, &p, 10, 40);
    assert_ne!(a.spin, c.spin);
}

#[test]
fn sweep_direction_matters_for_coupled_spins() {
    let materials = MaterialTable::new(vec![iron()]).unwrap();
    let (initial, sl) = ring(6, 2.48);
    let p = IntegrationParams {
        dt: 1e-14,
        ..params(0.0)
    };

    let mut fwd = initial.clone();
    let mut bwd = initial.clone();
    let mut scratch = SuzukiTrotterScratch::new();
    spin_sweep(SweepDirection::Forward, &mut fwd, &sl, &materials, &p, Phase::Production, 0.0, &mut scratch);
    spin_sweep(SweepDirection::Backward, &mut bwd, &sl, &materials, &p, Phase::Production, 0.0, &mut scratch);

    assert_ne!(fwd.spin, bwd.spin);
    assert_ne!(fwd.spin[0], initial.spin[0]);
    assert_ne!(bwd.spin[5], initial.spin[5]);
    assert!(fwd.max_norm_error(6) < 1e-12);
    assert!(bwd.max_norm_error(6) < 1e-12);
}

/// Precession about a field along z keeps s_z; damping raises it.
#[test]
fn equilibration_damping_switches_off_at_threshold() {
    let materials = MaterialTable::new(vec![Material {
        alpha: 0.0,
        alpha_eq: 0.5,
        ..Default::default()
    }])
    .unwrap();
    let mut sl = PairwiseSpinLattice::new(NeighbourList::from_pairs(1, Vec::new()), vec![SldCoupling::default()], 1.0);
    sl.b_ext = [0.0, 0.0, 100.0];
    sl.zeeman_after = -1.0;

    let p = IntegrationParams {
        dt: 1e-15,
        temperature: 0.0,
        equilibration_time: 1e-12,
    };
    let start = normalize([1.0, 0.0, 0.3]);
    let one_step = |time: f64| {
        let mut state = EnsembleState::new(1);
        state.spin[0] = start;
        step_suzuki_trotter(&mut state, &sl, &mut NoNoise, &materials, &p, time, &mut SuzukiTrotterScratch::new());
        state.spin[0][2]
    };

    let below = one_step(p.equilibration_time - 0.5 * p.dt);
    let at = one_step(p.equilibration_time);
    assert!(below - start[2] > 1e-4, "s_z {} -> {}", start[2], below);
    assert_relative_eq!(at, start[2], epsilon = 1e-12);
}

/// One step of a lone atom (no neighbours, no applied field) at `time`,
/// with the equilibration window ending at 1 ps.
fn lone_atom_step(material: Material, temperature: f64, seed: u64, time: f64) -> EnsembleState {
    let materials = MaterialTable::new(vec![material]).unwrap();
    let sl = PairwiseSpinLattice::new(NeighbourList::from_pairs(1, Vec::new()), vec![SldCoupling::default()], 1.0);
    let p = IntegrationParams {
        dt: 1e-15,
        temperature,
        equilibration_time: 1e-12,
    };
    let mut state = EnsembleState::new(1);
    state.spin[0] = normalize([1.0, 0.0, 1.0]);
    state.velocity[0] = [1.0, -0.5, 0.0];
    step_suzuki_trotter(
        &mut state,
        &sl,
        &mut GaussianNoise::seeded(seed),
        &materials,
        &p,
        time,
        &mut SuzukiTrotterScratch::new(),
    );
    state
}

const BELOW_THRESHOLD: f64 = 1e-12 - 0.5e-15;
const AT_THRESHOLD: f64 = 1e-12;

#[test]
fn lattice_damping_follows_the_phase() {
    let m = Material {
        damp_lat: 0.0,
        damp_lat_eq: 5.0,
        ..Default::default()
    };
    // two half kicks of (1 - damp dt / 2) with dt = 1e-3 ps
    let factor = (1.0 - 0.5 * 5.0 * 1e-3_f64).powi(2);

    let below = lone_atom_step(m.clone(), 0.0, 1, BELOW_THRESHOLD);
    assert_relative_eq!(below.velocity[0][0], factor, epsilon = 1e-14);
    assert_relative_eq!(below.velocity[0][1], -0.5 * factor, epsilon = 1e-14);

    let at = lone_atom_step(m, 0.0, 1, AT_THRESHOLD);
    assert_eq!(at.velocity[0], [1.0, -0.5, 0.0]);
}

#[test]
fn lattice_noise_follows_the_phase() {
    let m = Material {
        f_th_sigma: 0.0,
        f_th_sigma_eq: 0.5,
        ..Default::default()
    };
    let below = lone_atom_step(m.clone(), 300.0, 4, BELOW_THRESHOLD);
    let again = lone_atom_step(m.clone(), 300.0, 4, BELOW_THRESHOLD);
    assert_eq!(below, again);
    assert_ne!(below.velocity[0], [1.0, -0.5, 0.0]);

    let at = lone_atom_step(m, 300.0, 4, AT_THRESHOLD);
    assert_eq!(at.velocity[0], [1.0, -0.5, 0.0]);
}

#[test]
fn spin_noise_follows_the_phase() {
    let m = Material {
        h_th_sigma: 0.0,
        h_th_sigma_eq: 1.0,
        ..Default::default()
    };
    let start = normalize([1.0, 0.0, 1.0]);
    let below = lone_atom_step(m.clone(), 300.0, 4, BELOW_THRESHOLD);
    let again = lone_atom_step(m.clone(), 300.0, 4, BELOW_THRESHOLD);
    assert_eq!(below.spin, again.spin);
    assert_ne!(below.spin[0], start);
    assert!(below.max_norm_error(1) < 1e-12);

    // no field and no noise: the rotation is the identity
    let at = lone_atom_step(m, 300.0, 4, AT_THRESHOLD);
    assert_eq!(at.spin[0], start);
}

#[test]
fn zeeman_field_waits_for_its_switch_time() {
    let materials = MaterialTable::new(vec![Material {
        alpha: 0.5,
        ..Default::default()
    }])
    .unwrap();
    let mut sl = PairwiseSpinLattice::new(NeighbourList::from_pairs(1, Vec::new()), vec![SldCoupling::default()], 1.0);
    sl.b_ext = [0.0, 0.0, 100.0];
    sl.zeeman_after = 1e-12;
    let p = IntegrationParams {
        dt: 1e-15,
        ..params(0.0)
    };
    let start = normalize([1.0, 0.0, 0.3]);
    let at_time = |time: f64| {
        let mut state = EnsembleState::new(1);
        state.spin[0] = start;
        step_suzuki_trotter(&mut state, &sl, &mut NoNoise, &materials, &p, time, &mut SuzukiTrotterScratch::new());
        state.spin[0]
    };
    // exactly at the switch time the field is still off
    assert_eq!(at_time(1e-12), start);
    assert_ne!(at_time(1.001e-12), start);
}

#[test]
fn undamped_lattice_conserves_momentum() {
    let materials = MaterialTable::new(vec![Material {
        damp_lat: 0.0,
        mass: 5.788e-3,
        ..Default::default()
    }])
    .unwrap();
    let (mut state, sl) = ring(8, 2.48);
    for (i, v) in state.velocity.iter_mut().enumerate() {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        *v = [sign * 3.0, 0.0, sign * 0.5 * i as f64 / 7.0];
    }
    let p0 = total_momentum(&state);
    let mut scratch = SuzukiTrotterScratch::new();
    let p = IntegrationParams {
        dt: 1e-15,
        ..params(0.0)
    };
    for step in 0..200 {
        step_suzuki_trotter(&mut state, &sl, &mut NoNoise, &materials, &p, step as f64 * p.dt, &mut scratch);
    }
    let p1 = total_momentum(&state);
    for k in 0..3 {
        assert!((p1[k] - p0[k]).abs() < 1e-12, "component {k}: {} -> {}", p0[k], p1[k]);
    }
    assert!(scratch.potential_energy() > 0.0);
}

fn total_momentum(state: &EnsembleState) -> [f64; 3] {
    let mut p = [0.0; 3];
    for v in &state.velocity {
        for k in 0..3 {
            p[k] += v[k];
        }
    }
    p
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn thermal_steps_keep_unit_spins(seed in 0u64..1000, temperature in 0.0f64..1500.0) {
        let materials = MaterialTable::new(vec![iron()]).unwrap();
        let (mut state, sl) = ring(6, 2.48);
        run(&mut state, &sl, &materials, &params(temperature), seed, 20);
        prop_assert!(state.max_norm_error(6) < 1e-12);
        prop_assert!(state.position.iter().flatten().all(|x| x.is_finite()));
    }
}
