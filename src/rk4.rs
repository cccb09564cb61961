// src/rk4.rs
//
// Stochastic RK4 for unconstrained-length spins, domain decomposed.
//
// Each of the four stages follows the same pattern:
//   begin halo exchange
//   core:     fields -> k
//   end halo exchange
//   boundary: fields -> k
//   advance all local spins to the next stage point
//
// Core atoms never read halo slots, so their work overlaps the exchange.
// The stage advance waits until the boundary k is done because boundary
// fields read core spins at the same stage point.

use std::ops::Range;

use crate::domain::DomainPartition;
use crate::effective_field::lsf::set_lsf_fields;
use crate::effective_field::FieldAccumulator;
use crate::ensemble::EnsembleState;
use crate::error::SimError;
use crate::halo::HaloExchange;
use crate::noise::NoiseSource;
use crate::params::{IntegrationParams, MaterialTable};
use crate::spin_update::{lsf_llg_rate, thermal_scale};

/// Reusable buffers for [`step_stochastic_rk4`].
#[derive(Debug, Default)]
pub struct Rk4Scratch {
    initial: Vec<[f64; 3]>,
    k: [Vec<[f64; 3]>; 4],
    spin_field: Vec<[f64; 3]>,
    external_field: Vec<[f64; 3]>,
    lsf_field: Vec<[f64; 3]>,
    noise: Vec<[f64; 3]>,
}

impl Rk4Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn resize_if_needed(&mut self, n: usize) {
        if self.initial.len() == n {
            return;
        }
        self.initial.resize(n, [0.0; 3]);
        for k in &mut self.k {
            k.resize(n, [0.0; 3]);
        }
        self.spin_field.resize(n, [0.0; 3]);
        self.external_field.resize(n, [0.0; 3]);
        self.lsf_field.resize(n, [0.0; 3]);
        self.noise.resize(n, [0.0; 3]);
    }

    /// Total field (spin + external + LSF) from the last evaluation.
    pub fn total_field(&self, i: usize) -> [f64; 3] {
        let (a, b, c) = (self.spin_field[i], self.external_field[i], self.lsf_field[i]);
        [a[0] + b[0] + c[0], a[1] + b[1] + c[1], a[2] + b[2] + c[2]]
    }

    fn update_fields<F: FieldAccumulator + ?Sized>(
        &mut self,
        fields: &F,
        range: Range<usize>,
        state: &EnsembleState,
        materials: &MaterialTable,
        with_external: bool,
    ) {
        fields.spin_fields(range.clone(), state, &mut self.spin_field);
        set_lsf_fields(range.clone(), state, materials, &mut self.lsf_field);
        if with_external {
            fields.external_fields(range, state, &mut self.external_field);
        }
    }

    /// k[stage][i] = dS/dt · dt for every atom in `range`.
    fn derive(
        &mut self,
        stage: usize,
        range: Range<usize>,
        state: &EnsembleState,
        materials: &MaterialTable,
        params: &IntegrationParams,
    ) {
        let dt = params.dt;
        for i in range {
            let m = materials.get(state.material[i]);
            let scale = thermal_scale(params.temperature, m.gamma, m.alpha, m.mu_s, dt);
            let n = self.noise[i];
            let thermal = [n[0] * scale, n[1] * scale, n[2] * scale];
            let h = self.total_field(i);
            let rate = lsf_llg_rate(state.spin[i], h, thermal, m.gamma, m.alpha);
            self.k[stage][i] = [rate[0] * dt, rate[1] * dt, rate[2] * dt];
        }
    }

    /// spin = initial + c · k[stage]
    fn advance(&self, stage: usize, c: f64, range: Range<usize>, spin: &mut [[f64; 3]]) {
        for i in range {
            let (s0, k) = (self.initial[i], self.k[stage][i]);
            spin[i] = [s0[0] + c * k[0], s0[1] + c * k[1], s0[2] + c * k[2]];
        }
    }

    fn combine(&self, range: Range<usize>, spin: &mut [[f64; 3]]) {
        const SIXTH: f64 = 1.0 / 6.0;
        for i in range {
            let s0 = self.initial[i];
            let [k1, k2, k3, k4] = [self.k[0][i], self.k[1][i], self.k[2][i], self.k[3][i]];
            for d in 0..3 {
                spin[i][d] = s0[d] + SIXTH * (k1[d] + 2.0 * k2[d] + 2.0 * k3[d] + k4[d]);
            }
        }
    }
}

/// Stage points after k1, k2, k3; k4 feeds only the final combination.
const STAGE_ADVANCE: [Option<f64>; 4] = [Some(0.5), Some(0.5), Some(1.0), None];

/// Advance all local spins of one domain by `params.dt`.
///
/// `state` holds local atoms followed by halo slots as described by
/// `partition`. Every domain must call this the same number of times; the
/// step ends with a global barrier.
///
/// Thermal noise is drawn once per step (core atoms first, boundary atoms
/// after their halo data arrives) and reused by all four stages. The external
/// field is evaluated once per step; spin-dependent and LSF fields every stage.
#[allow(clippy::too_many_arguments)]
pub fn step_stochastic_rk4<F, H, N>(
    state: &mut EnsembleState,
    partition: &DomainPartition,
    fields: &F,
    halo: &mut H,
    noise: &mut N,
    materials: &MaterialTable,
    params: &IntegrationParams,
    scratch: &mut Rk4Scratch,
) -> Result<(), SimError>
where
    F: FieldAccumulator + ?Sized,
    H: HaloExchange + ?Sized,
    N: NoiseSource + ?Sized,
{
    let n_total = partition.num_total();
    if state.spin.len() != n_total {
        return Err(SimError::LengthMismatch {
            what: "spin",
            expected: n_total,
            got: state.spin.len(),
        });
    }
    scratch.resize_if_needed(n_total);

    let core = partition.core();
    let boundary = partition.boundary();
    let local = partition.local();

    log::debug!(
        "rk4 step: {} core + {} boundary atoms, {} halo slots, T = {} K",
        partition.num_core,
        partition.num_boundary,
        partition.num_halo,
        params.temperature
    );

    scratch.initial[local.clone()].copy_from_slice(&state.spin[local.clone()]);

    for (stage, advance) in STAGE_ADVANCE.iter().enumerate() {
        let first = stage == 0;

        let pending = halo.begin(&state.spin);

        // core
        scratch.update_fields(fields, core.clone(), state, materials, first);
        if first {
            noise.fill_gaussian(&mut scratch.noise[core.clone()]);
        }
        scratch.derive(stage, core.clone(), state, materials, params);

        halo.end(pending, &mut state.spin)?;

        // boundary
        scratch.update_fields(fields, boundary.clone(), state, materials, first);
        if first {
            noise.fill_gaussian(&mut scratch.noise[boundary.clone()]);
        }
        scratch.derive(stage, boundary.clone(), state, materials, params);

        if let Some(c) = advance {
            scratch.advance(stage, *c, local.clone(), &mut state.spin);
        }
    }

    scratch.combine(local, &mut state.spin);

    halo.barrier()
}
