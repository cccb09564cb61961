// src/observables.rs

use crate::ensemble::EnsembleState;
use crate::params::{MaterialTable, KB_EV_PER_K, KB_J_PER_K};
use crate::vec3::{cross, dot, norm};

/// Average spin vector <S>.
pub fn mean_magnetisation(spins: &[[f64; 3]]) -> [f64; 3] {
    if spins.is_empty() {
        return [0.0; 3];
    }
    let mut sum = [0.0; 3];
    for s in spins {
        sum[0] += s[0];
        sum[1] += s[1];
        sum[2] += s[2];
    }
    let inv = 1.0 / spins.len() as f64;
    [sum[0] * inv, sum[1] * inv, sum[2] * inv]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinLengthStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Mean / min / max of |S|. Only informative with longitudinal fluctuations.
pub fn spin_length_stats(spins: &[[f64; 3]]) -> SpinLengthStats {
    if spins.is_empty() {
        return SpinLengthStats {
            mean: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in spins {
        let l = norm(*s);
        sum += l;
        min = min.min(l);
        max = max.max(l);
    }
    SpinLengthStats {
        mean: sum / spins.len() as f64,
        min,
        max,
    }
}

/// Σ ½ m v² over the first `n` atoms (eV, with masses in eV ps²/Å²).
pub fn kinetic_energy(state: &EnsembleState, materials: &MaterialTable, n: usize) -> f64 {
    (0..n)
        .map(|i| {
            let m = materials.get(state.material[i]).mass;
            let v = state.velocity[i];
            0.5 * m * dot(v, v)
        })
        .sum()
}

/// Equipartition temperature of the lattice, 2 KE / (3 N kB).
pub fn lattice_temperature(state: &EnsembleState, materials: &MaterialTable, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    2.0 * kinetic_energy(state, materials, n) / (3.0 * n as f64 * KB_EV_PER_K)
}

/// Spin temperature from the local fields (Nurdin et al.):
///
///   T_s = Σ μ_i |S_i × H_i|² / (2 kB Σ S_i·H_i)
///
/// Returns 0 when the denominator vanishes.
pub fn spin_temperature(
    state: &EnsembleState,
    fields: &[[f64; 3]],
    materials: &MaterialTable,
    n: usize,
) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..n {
        let s = state.spin[i];
        let h = fields[i];
        let mu = materials.get(state.material[i]).mu_s;
        let sxh = cross(s, h);
        num += mu * dot(sxh, sxh);
        den += dot(s, h);
    }
    if den == 0.0 {
        return 0.0;
    }
    num / (2.0 * KB_J_PER_K * den)
}
