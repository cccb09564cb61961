// src/effective_field/anisotropy.rs

use crate::vec3::{dot, normalize};

/// Uniaxial anisotropy field B = b_k (S·u) u.
///
/// For E = -k_u (S·u)^2 per atom with moment μ_s, b_k = 2 k_u / μ_s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniaxialAnisotropy {
    /// field scale b_k (T)
    pub b_k: f64,
    /// unit easy axis
    pub axis: [f64; 3],
}

impl UniaxialAnisotropy {
    pub fn new(b_k: f64, axis: [f64; 3]) -> Self {
        Self {
            b_k,
            axis: normalize(axis),
        }
    }

    /// From an anisotropy energy per atom `k_u` (J) and moment `mu_s` (J/T).
    pub fn from_energy(k_u: f64, mu_s: f64, axis: [f64; 3]) -> Self {
        Self::new(2.0 * k_u / mu_s, axis)
    }

    #[inline]
    pub fn field(&self, spin: [f64; 3]) -> [f64; 3] {
        let c = self.b_k * dot(spin, self.axis);
        [c * self.axis[0], c * self.axis[1], c * self.axis[2]]
    }

    #[inline]
    pub fn add_field(&self, spin: [f64; 3], out: &mut [f64; 3]) {
        let h = self.field(spin);
        out[0] += h[0];
        out[1] += h[1];
        out[2] += h[2];
    }

    /// -k_u (S·u)^2 expressed with b_k: -½ μ_s b_k (S·u)^2.
    #[inline]
    pub fn energy(&self, spin: [f64; 3], mu_s: f64) -> f64 {
        let su = dot(spin, self.axis);
        -0.5 * mu_s * self.b_k * su * su
    }
}
