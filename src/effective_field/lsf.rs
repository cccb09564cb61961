// src/effective_field/lsf.rs

use std::ops::Range;

use crate::ensemble::EnsembleState;
use crate::params::{LsfCoefficients, MaterialTable};
use crate::vec3::dot;

/// Longitudinal field from the Landau expansion of the on-site energy:
///
///   H = L2 S + L4 S |S|² + L6 S |S|⁴,   Lk = -k c_k / μ_s
#[inline]
pub fn lsf_field(spin: [f64; 3], c: &LsfCoefficients, mu_s: f64) -> [f64; 3] {
    let imu = -1.0 / mu_s;
    let l2 = 2.0 * c.second * imu;
    let l4 = 4.0 * c.fourth * imu;
    let l6 = 6.0 * c.sixth * imu;
    let ss2 = dot(spin, spin);
    let f = l2 + l4 * ss2 + l6 * ss2 * ss2;
    [f * spin[0], f * spin[1], f * spin[2]]
}

/// Overwrite `out[range]`; atoms whose material has no LSF terms get zero.
pub fn set_lsf_fields(
    range: Range<usize>,
    state: &EnsembleState,
    materials: &MaterialTable,
    out: &mut [[f64; 3]],
) {
    for i in range {
        let m = materials.get(state.material[i]);
        out[i] = match &m.lsf {
            Some(c) => lsf_field(state.spin[i], c, m.mu_s),
            None => [0.0; 3],
        };
    }
}
