// src/heun.rs

use crate::effective_field::lsf::set_lsf_fields;
use crate::effective_field::FieldAccumulator;
use crate::ensemble::EnsembleState;
use crate::noise::NoiseSource;
use crate::params::{IntegrationParams, MaterialTable};
use crate::spin_update::{lsf_llg_rate, thermal_scale};
use crate::vec3::norm;

#[derive(Debug, Default)]
pub struct HeunScratch {
    initial: Vec<[f64; 3]>,
    euler: Vec<[f64; 3]>,
    spin_field: Vec<[f64; 3]>,
    external_field: Vec<[f64; 3]>,
    lsf_field: Vec<[f64; 3]>,
    noise: Vec<[f64; 3]>,
    spin_length: Vec<f64>,
}

impl HeunScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn resize_if_needed(&mut self, n: usize) {
        if self.initial.len() == n {
            return;
        }
        self.initial.resize(n, [0.0; 3]);
        self.euler.resize(n, [0.0; 3]);
        self.spin_field.resize(n, [0.0; 3]);
        self.external_field.resize(n, [0.0; 3]);
        self.lsf_field.resize(n, [0.0; 3]);
        self.noise.resize(n, [0.0; 3]);
        self.spin_length.resize(n, 1.0);
    }

    /// |S| per atom after the last step.
    pub fn spin_lengths(&self) -> &[f64] {
        &self.spin_length
    }

    fn rate(&self, i: usize, state: &EnsembleState, materials: &MaterialTable, params: &IntegrationParams) -> [f64; 3] {
        let m = materials.get(state.material[i]);
        let scale = thermal_scale(params.temperature, m.gamma, m.alpha, m.mu_s, params.dt);
        let n = self.noise[i];
        let (a, b, c) = (self.spin_field[i], self.external_field[i], self.lsf_field[i]);
        let h = [a[0] + b[0] + c[0], a[1] + b[1] + c[1], a[2] + b[2] + c[2]];
        lsf_llg_rate(
            state.spin[i],
            h,
            [n[0] * scale, n[1] * scale, n[2] * scale],
            m.gamma,
            m.alpha,
        )
    }
}

/// One stochastic Heun (predictor–corrector) step for all atoms, single process.
///
/// Same equation of motion as the RK4 integrator. Noise is drawn once and
/// used by both the predictor and the corrector; the external field is
/// evaluated only for the predictor.
pub fn step_stochastic_heun<F, N>(
    state: &mut EnsembleState,
    fields: &F,
    noise: &mut N,
    materials: &MaterialTable,
    params: &IntegrationParams,
    scratch: &mut HeunScratch,
) where
    F: FieldAccumulator + ?Sized,
    N: NoiseSource + ?Sized,
{
    let n = state.num_atoms();
    scratch.resize_if_needed(n);
    let dt = params.dt;

    fields.spin_fields(0..n, state, &mut scratch.spin_field);
    set_lsf_fields(0..n, state, materials, &mut scratch.lsf_field);
    fields.external_fields(0..n, state, &mut scratch.external_field);

    scratch.initial.copy_from_slice(&state.spin);
    noise.fill_gaussian(&mut scratch.noise);

    // predictor
    for i in 0..n {
        scratch.euler[i] = scratch.rate(i, state, materials, params);
    }
    for i in 0..n {
        let (s, e) = (scratch.initial[i], scratch.euler[i]);
        state.spin[i] = [s[0] + e[0] * dt, s[1] + e[1] * dt, s[2] + e[2] * dt];
    }

    fields.spin_fields(0..n, state, &mut scratch.spin_field);
    set_lsf_fields(0..n, state, materials, &mut scratch.lsf_field);

    // corrector
    for i in 0..n {
        let h = scratch.rate(i, state, materials, params);
        let (s, e) = (scratch.initial[i], scratch.euler[i]);
        let new = [
            s[0] + 0.5 * dt * (e[0] + h[0]),
            s[1] + 0.5 * dt * (e[1] + h[1]),
            s[2] + 0.5 * dt * (e[2] + h[2]),
        ];
        scratch.spin_length[i] = norm(new);
        state.spin[i] = new;
    }

    log::debug!("heun step: {n} atoms, T = {} K", params.temperature);
}
