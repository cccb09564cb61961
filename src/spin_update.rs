// src/spin_update.rs

use crate::params::KB_J_PER_K;
use crate::vec3::{cross, dot};

/// Rotate `s` about `field` by the exact Cayley transform with `A = field * dt`.
///
///   S' = ( S (1 - |A|²/4) + A×S + (A·S) A / 2 ) / (1 + |A|²/4)
///
/// The map is orthogonal, so |S'| = |S| up to rounding for any |A|, and
/// `field = 0` returns `s` unchanged bit for bit.
#[inline]
pub fn cayley_rotate(s: [f64; 3], field: [f64; 3], dt: f64) -> [f64; 3] {
    let a = [field[0] * dt, field[1] * dt, field[2] * dt];
    let a2 = 0.25 * dot(a, a);
    let ad = 0.5 * dot(a, s);
    let axs = cross(a, s);
    let inv = 1.0 / (1.0 + a2);
    let keep = 1.0 - a2;

    [
        (s[0] * keep + axs[0] + ad * a[0]) * inv,
        (s[1] * keep + axs[1] + ad * a[1]) * inv,
        (s[2] * keep + axs[2] + ad * a[2]) * inv,
    ]
}

/// Fold the thermal field and Gilbert damping into the rotation field.
///
///   F' = ( F + H_th + λ (F + H_th) × S ) / (1 + λ²)
#[inline]
pub fn renormalize_with_noise(
    field: [f64; 3],
    thermal: [f64; 3],
    spin: [f64; 3],
    lambda: f64,
) -> [f64; 3] {
    let h = [
        field[0] + thermal[0],
        field[1] + thermal[1],
        field[2] + thermal[2],
    ];
    let hxs = cross(h, spin);
    let inv = 1.0 / (1.0 + lambda * lambda);
    [
        (h[0] + lambda * hxs[0]) * inv,
        (h[1] + lambda * hxs[1]) * inv,
        (h[2] + lambda * hxs[2]) * inv,
    ]
}

/// Rate of change of an unconstrained-length spin (LLG with longitudinal
/// damping, as used by the RK4 and Heun integrators):
///
///   dS/dt = -γ S×H + γ α H + η
///
/// `thermal` is the already-scaled noise η.
#[inline]
pub fn lsf_llg_rate(spin: [f64; 3], h: [f64; 3], thermal: [f64; 3], gamma: f64, alpha: f64) -> [f64; 3] {
    let sxh = cross(spin, h);
    let ga = gamma * alpha;
    [
        -gamma * sxh[0] + ga * h[0] + thermal[0],
        -gamma * sxh[1] + ga * h[1] + thermal[1],
        -gamma * sxh[2] + ga * h[2] + thermal[2],
    ]
}

/// Standard deviation of η per unit Gaussian: sqrt(2 kB T γ / dt) · sqrt(α / μ_s).
#[inline]
pub fn thermal_scale(temperature: f64, gamma: f64, alpha: f64, mu_s: f64, dt: f64) -> f64 {
    (2.0 * KB_J_PER_K * temperature * gamma / dt).sqrt() * (alpha / mu_s).sqrt()
}
