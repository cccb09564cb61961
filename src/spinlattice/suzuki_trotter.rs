// src/spinlattice/suzuki_trotter.rs
//
// Symmetric Suzuki–Trotter step for coupled spin-lattice dynamics:
//
//   spins  dt/2   (forward sweep dt/4, backward sweep dt/4)
//   lattice dt    (half kick + drift, recompute forces, half kick)
//   spins  dt/2   (forward sweep dt/4, backward sweep dt/4)
//
// The sweeps update one atom at a time and each atom sees the already
// updated state of the atoms before it. The loop order is part of the
// result and must stay sequential.

use crate::ensemble::EnsembleState;
use crate::noise::NoiseSource;
use crate::params::{IntegrationParams, MaterialTable, Phase, SECONDS_TO_PS};
use crate::spin_update::{cayley_rotate, renormalize_with_noise};

use super::SpinLatticeField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    Forward,
    Backward,
}

/// Reusable buffers for [`step_suzuki_trotter`].
#[derive(Debug, Default)]
pub struct SuzukiTrotterScratch {
    fields: Vec<[f64; 3]>,
    forces: Vec<[f64; 3]>,
    potential: Vec<f64>,
    spin_noise: Vec<[f64; 3]>,
    force_noise: Vec<[f64; 3]>,
}

impl SuzukiTrotterScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn resize_if_needed(&mut self, n: usize) {
        if self.fields.len() == n {
            return;
        }
        self.fields.resize(n, [0.0; 3]);
        self.forces.resize(n, [0.0; 3]);
        self.potential.resize(n, 0.0);
        self.spin_noise.resize(n, [0.0; 3]);
        self.force_noise.resize(n, [0.0; 3]);
    }

    /// Forces from the most recent lattice update.
    pub fn forces(&self) -> &[[f64; 3]] {
        &self.forces
    }

    /// Total pair potential energy (eV) from the most recent lattice update.
    pub fn potential_energy(&self) -> f64 {
        self.potential.iter().sum()
    }
}

/// Rotate every spin once, one atom at a time, by a quarter step.
///
/// Uses the spin noise currently held in `scratch` (zero for a fresh one).
#[allow(clippy::too_many_arguments)]
pub fn spin_sweep<F: SpinLatticeField + ?Sized>(
    direction: SweepDirection,
    state: &mut EnsembleState,
    field: &F,
    materials: &MaterialTable,
    params: &IntegrationParams,
    phase: Phase,
    time: f64,
    scratch: &mut SuzukiTrotterScratch,
) {
    let n = state.num_atoms();
    scratch.resize_if_needed(n);
    let sqrt_t = params.temperature.sqrt();

    let order: Box<dyn Iterator<Item = usize>> = match direction {
        SweepDirection::Forward => Box::new(0..n),
        SweepDirection::Backward => Box::new((0..n).rev()),
    };

    for i in order {
        field.spin_fields(i..i + 1, state, time, &mut scratch.fields);

        let m = materials.get(state.material[i]);
        let (lambda, sigma) = m.spin_bath(phase);
        let s = sigma * sqrt_t;
        let eta = scratch.spin_noise[i];
        let thermal = [s * eta[0], s * eta[1], s * eta[2]];

        let f = renormalize_with_noise(scratch.fields[i], thermal, state.spin[i], lambda);
        state.spin[i] = cayley_rotate(state.spin[i], f, -0.25 * m.gamma * params.dt);
    }
}

/// Velocity half kick with Langevin damping and noise; `drift` also moves
/// the atoms by a full step with the kicked velocity.
fn lattice_kick<F: SpinLatticeField + ?Sized>(
    state: &mut EnsembleState,
    field: &F,
    materials: &MaterialTable,
    params: &IntegrationParams,
    phase: Phase,
    drift: bool,
    scratch: &mut SuzukiTrotterScratch,
) {
    let n = state.num_atoms();
    field.forces(0..n, state, &mut scratch.forces, &mut scratch.potential);

    let dt_ps = params.dt * SECONDS_TO_PS;
    let sqrt_t = params.temperature.sqrt();

    for i in 0..n {
        let m = materials.get(state.material[i]);
        let (damp, sigma) = m.lattice_bath(phase);
        let dt2_m = 0.5 * dt_ps / m.mass;
        let f_eta = 1.0 - 0.5 * damp * dt_ps;
        let velo_noise = 0.5 * dt_ps * sigma * sqrt_t;

        let f = scratch.forces[i];
        let eta = scratch.force_noise[i];
        let v = &mut state.velocity[i];
        for k in 0..3 {
            v[k] = f_eta * v[k] + dt2_m * f[k] + velo_noise * eta[k];
        }
        if drift {
            let v = state.velocity[i];
            let x = &mut state.position[i];
            for k in 0..3 {
                x[k] += dt_ps * v[k];
            }
        }
    }
}

/// Advance spins, positions and velocities by `params.dt` from time `time`.
///
/// Two Gaussian triples per atom are drawn up front (spin field first, then
/// lattice force) and held for the whole step. Equilibration coefficients
/// apply while `time < params.equilibration_time`.
pub fn step_suzuki_trotter<F, N>(
    state: &mut EnsembleState,
    field: &F,
    noise: &mut N,
    materials: &MaterialTable,
    params: &IntegrationParams,
    time: f64,
    scratch: &mut SuzukiTrotterScratch,
) where
    F: SpinLatticeField + ?Sized,
    N: NoiseSource + ?Sized,
{
    scratch.resize_if_needed(state.num_atoms());
    noise.fill_gaussian(&mut scratch.spin_noise);
    noise.fill_gaussian(&mut scratch.force_noise);

    let phase = params.phase_at(time);
    log::debug!(
        "suzuki-trotter step at t = {time:e} s ({}), {} atoms",
        phase.as_str(),
        state.num_atoms()
    );

    for direction in [SweepDirection::Forward, SweepDirection::Backward] {
        spin_sweep(direction, state, field, materials, params, phase, time, scratch);
    }

    lattice_kick(state, field, materials, params, phase, true, scratch);
    lattice_kick(state, field, materials, params, phase, false, scratch);

    for direction in [SweepDirection::Forward, SweepDirection::Backward] {
        spin_sweep(direction, state, field, materials, params, phase, time, scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbours::NeighbourList;
    use crate::noise::{GaussianNoise, NoNoise};
    use crate::params::Material;
    use crate::spinlattice::{PairwiseSpinLattice, SldCoupling};
    use approx::assert_relative_eq;

    fn params() -> IntegrationParams {
        IntegrationParams {
            dt: 1e-16,
            temperature: 0.0,
            equilibration_time: 0.0,
        }
    }

    #[test]
    fn free_particle_drifts_at_constant_velocity() {
        let materials = MaterialTable::new(vec![Material::default()]).unwrap();
        let sl = PairwiseSpinLattice::new(NeighbourList::from_pairs(1, Vec::new()), vec![SldCoupling::default()], 1.0);
        let mut state = EnsembleState::new(1);
        state.velocity[0] = [1.0, 0.0, -2.0];
        let mut scratch = SuzukiTrotterScratch::new();
        let p = IntegrationParams {
            dt: 1e-15,
            ..params()
        };
        step_suzuki_trotter(&mut state, &sl, &mut NoNoise, &materials, &p, 0.0, &mut scratch);
        // 1 fs = 1e-3 ps
        assert_relative_eq!(state.position[0][0], 1e-3, max_relative = 1e-12);
        assert_relative_eq!(state.position[0][2], -2e-3, max_relative = 1e-12);
        assert_eq!(state.velocity[0], [1.0, 0.0, -2.0]);
    }

    #[test]
    fn lattice_damping_scales_velocity() {
        let materials = MaterialTable::new(vec![Material {
            damp_lat: 0.5,
            ..Default::default()
        }])
        .unwrap();
        let sl = PairwiseSpinLattice::new(NeighbourList::from_pairs(1, Vec::new()), vec![SldCoupling::default()], 1.0);
        let mut state = EnsembleState::new(1);
        state.velocity[0] = [1.0, 0.0, 0.0];
        let p = IntegrationParams {
            dt: 1e-14,
            ..params()
        };
        step_suzuki_trotter(&mut state, &sl, &mut NoNoise, &materials, &p, 0.0, &mut SuzukiTrotterScratch::new());
        // two half kicks with f_eta = 1 - 0.5 * 0.5 * 0.01
        let f_eta: f64 = 1.0 - 0.0025;
        assert_relative_eq!(state.velocity[0][0], f_eta * f_eta, max_relative = 1e-14);
    }

    #[test]
    fn damped_spin_relaxes_towards_field() {
        let materials = MaterialTable::new(vec![Material {
            alpha: 0.5,
            ..Default::default()
        }])
        .unwrap();
        let mut sl = PairwiseSpinLattice::new(NeighbourList::from_pairs(1, Vec::new()), vec![SldCoupling::default()], 1.0);
        sl.b_ext = [0.0, 0.0, 100.0];
        sl.zeeman_after = -1.0;
        let mut state = EnsembleState::new(1);
        state.set_uniform_spin([1.0, 0.0, 0.2]);
        let start = state.spin[0][2];
        let mut scratch = SuzukiTrotterScratch::new();
        let p = IntegrationParams {
            dt: 1e-15,
            ..params()
        };
        for step in 0..500 {
            step_suzuki_trotter(&mut state, &sl, &mut NoNoise, &materials, &p, step as f64 * p.dt, &mut scratch);
        }
        assert!(state.spin[0][2] > start + 0.1, "s_z = {}", state.spin[0][2]);
        assert!(state.max_norm_error(1) < 1e-12);
    }

    #[test]
    fn thermal_noise_moves_spins_but_keeps_them_unit() {
        let materials = MaterialTable::new(vec![Material {
            alpha: 0.1,
            h_th_sigma: 5.0,
            f_th_sigma: 0.1,
            ..Default::default()
        }])
        .unwrap();
        let sl = PairwiseSpinLattice::new(
            NeighbourList::chain(8, 0.0, true),
            vec![SldCoupling {
                j0: 50.0,
                j0_prime: 0.1,
                ..Default::default()
            }],
            3.0,
        );
        let mut state = EnsembleState::new(8);
        state.place_chain(2.5);
        let before = state.clone();
        let p = IntegrationParams {
            temperature: 300.0,
            ..params()
        };
        let mut noise = GaussianNoise::seeded(3);
        let mut scratch = SuzukiTrotterScratch::new();
        for step in 0..50 {
            step_suzuki_trotter(&mut state, &sl, &mut noise, &materials, &p, step as f64 * p.dt, &mut scratch);
        }
        assert_ne!(state.spin, before.spin);
        assert_ne!(state.velocity, before.velocity);
        assert!(state.max_norm_error(8) < 1e-12);
    }
}
