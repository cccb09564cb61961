// src/spinlattice/fields.rs

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::SpinLatticeField;
use crate::effective_field::UniaxialAnisotropy;
use crate::ensemble::EnsembleState;
use crate::error::SimError;
use crate::neighbours::NeighbourList;
use crate::params::MaterialTable;
use crate::vec3::{dot, sub};

/// Orthorhombic cell with optional periodic wrapping per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationBox {
    /// edge lengths (Å)
    pub size: [f64; 3],
    pub periodic: [bool; 3],
}

impl SimulationBox {
    /// No wrapping on any axis.
    pub fn open() -> Self {
        Self {
            size: [0.0; 3],
            periodic: [false; 3],
        }
    }

    /// Minimum-image convention on the periodic axes.
    #[inline]
    pub fn wrap(&self, mut d: [f64; 3]) -> [f64; 3] {
        for k in 0..3 {
            if self.periodic[k] && self.size[k] > 0.0 {
                d[k] -= self.size[k] * (d[k] / self.size[k]).round();
            }
        }
        d
    }
}

impl Default for SimulationBox {
    fn default() -> Self {
        Self::open()
    }
}

/// Per-material pair constants (indexed by the material of the central atom).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SldCoupling {
    /// exchange field scale J0 (T): J(r) = J0 (1 - r/r_c)^3
    pub j0: f64,
    /// exchange force scale J0' (eV/Å): -dJ/dr = J0' (1 - r/r_c)^2
    pub j0_prime: f64,
    /// pseudo-dipolar / Néel field scale (T Å^4)
    #[serde(default)]
    pub c0_field: f64,
    /// pseudo-dipolar / Néel force scale (eV Å^4)
    #[serde(default)]
    pub c0_force: f64,
    /// harmonic spring constant (eV/Å^2)
    #[serde(default)]
    pub spring: f64,
}

/// One neighbour pair seen from atom `i`, with `d = r_i - r_j`.
///
/// The anisotropic terms are written as a pair function `E(S_i, S_j, d)` with
/// energy `-E`: the field on `i` is `∂E/∂S_i` and the force `∂E/∂d`.
#[derive(Debug, Clone, Copy)]
struct Bond {
    d: [f64; 3],
    si: [f64; 3],
    sj: [f64; 3],
    inv_r2: f64,
    /// S_i·d
    a: f64,
    /// S_j·d
    b: f64,
    /// S_i·S_j
    ss: f64,
}

impl Bond {
    fn new(si: [f64; 3], sj: [f64; 3], d: [f64; 3]) -> Self {
        Self {
            d,
            si,
            sj,
            inv_r2: 1.0 / dot(d, d),
            a: dot(si, d),
            b: dot(sj, d),
            ss: dot(si, sj),
        }
    }

    /// E = r^-4 (r^-2 a b - S_i·S_j / 3)
    fn dipolar_energy(&self) -> f64 {
        let inv_r4 = self.inv_r2 * self.inv_r2;
        inv_r4 * (self.inv_r2 * self.a * self.b - self.ss / 3.0)
    }

    fn dipolar_field(&self) -> [f64; 3] {
        let inv_r4 = self.inv_r2 * self.inv_r2;
        let (d, sj) = (self.d, self.sj);
        std::array::from_fn(|k| inv_r4 * (self.inv_r2 * d[k] * self.b - sj[k] / 3.0))
    }

    fn dipolar_force(&self) -> [f64; 3] {
        let inv_r6 = self.inv_r2 * self.inv_r2 * self.inv_r2;
        let (d, si, sj) = (self.d, self.si, self.sj);
        let (a, b) = (self.a, self.b);
        std::array::from_fn(|k| {
            inv_r6
                * (b * si[k] + a * sj[k] - 6.0 * d[k] * a * b * self.inv_r2
                    + 4.0 / 3.0 * self.ss * d[k])
        })
    }

    /// r^-2 a² - ss/3 and r^-2 b² - ss/3
    fn quadrupolar_parts(&self) -> (f64, f64) {
        let third = self.ss / 3.0;
        (
            self.inv_r2 * self.a * self.a - third,
            self.inv_r2 * self.b * self.b - third,
        )
    }

    /// Full Néel pair function:
    /// E = 12/35 E_dip + 9/5 r^-4 p1 p2 - 2/5 r^-8 (a b³ + b a³)
    fn neel_energy(&self) -> f64 {
        let inv_r4 = self.inv_r2 * self.inv_r2;
        let (p1, p2) = self.quadrupolar_parts();
        let (a, b) = (self.a, self.b);
        12.0 / 35.0 * self.dipolar_energy() + 9.0 / 5.0 * inv_r4 * p1 * p2
            - 2.0 / 5.0 * inv_r4 * inv_r4 * (a * b * b * b + b * a * a * a)
    }

    fn neel_field(&self) -> [f64; 3] {
        let inv_r4 = self.inv_r2 * self.inv_r2;
        let inv_r8 = inv_r4 * inv_r4;
        let (p1, p2) = self.quadrupolar_parts();
        let (a, b) = (self.a, self.b);
        let (d, sj) = (self.d, self.sj);
        let dip = self.dipolar_field();
        std::array::from_fn(|k| {
            12.0 / 35.0 * dip[k]
                + 9.0 / 5.0
                    * inv_r4
                    * ((2.0 * self.inv_r2 * a * d[k] - sj[k] / 3.0) * p2 - p1 * sj[k] / 3.0)
                - 2.0 / 5.0 * inv_r8 * d[k] * (b * b * b + 3.0 * a * a * b)
        })
    }

    fn neel_force(&self) -> [f64; 3] {
        let inv_r2 = self.inv_r2;
        let inv_r4 = inv_r2 * inv_r2;
        let inv_r6 = inv_r4 * inv_r2;
        let inv_r8 = inv_r4 * inv_r4;
        let (p1, p2) = self.quadrupolar_parts();
        let (a, b) = (self.a, self.b);
        let (d, si, sj) = (self.d, self.si, self.sj);
        let cross = a * b * b * b + b * a * a * a;
        let dip = self.dipolar_force();
        std::array::from_fn(|k| {
            let dp1 = 2.0 * inv_r2 * a * si[k] - 2.0 * inv_r4 * a * a * d[k];
            let dp2 = 2.0 * inv_r2 * b * sj[k] - 2.0 * inv_r4 * b * b * d[k];
            let quad = -4.0 * inv_r6 * d[k] * p1 * p2 + inv_r4 * (p2 * dp1 + p1 * dp2);
            let dcross = si[k] * b * b * b
                + 3.0 * a * b * b * sj[k]
                + sj[k] * a * a * a
                + 3.0 * b * a * a * si[k];
            let oct = -8.0 * inv_r8 * inv_r2 * d[k] * cross + inv_r8 * dcross;
            12.0 / 35.0 * dip[k] + 9.0 / 5.0 * quad - 2.0 / 5.0 * oct
        })
    }
}

/// Reference spin-lattice Hamiltonian over a pair neighbour list.
///
/// Spin terms: distance-dependent exchange, optional pseudo-dipolar and full
/// Néel couplings, uniaxial anisotropy, and an applied field switched on after
/// `zeeman_after`. Lattice terms: the magnetic forces of the spin terms plus
/// a harmonic pair potential about `reference_positions`.
#[derive(Debug, Clone)]
pub struct PairwiseSpinLattice {
    /// pair structure only; list couplings are not used
    pub neighbours: NeighbourList,
    /// indexed by material
    pub couplings: Vec<SldCoupling>,
    /// cutoff for the magnetic pair terms (Å)
    pub r_cut: f64,
    pub pseudodipolar: bool,
    /// full Néel model: dipolar part scaled by 12/35 plus two quadrupolar terms
    pub neel: bool,
    /// indexed by material
    pub anisotropy: Vec<Option<UniaxialAnisotropy>>,
    /// applied induction (T)
    pub b_ext: [f64; 3],
    /// the applied field acts only when time > zeeman_after (s)
    pub zeeman_after: f64,
    pub simulation_box: SimulationBox,
    pub reference_positions: Vec<[f64; 3]>,
}

impl PairwiseSpinLattice {
    pub fn new(neighbours: NeighbourList, couplings: Vec<SldCoupling>, r_cut: f64) -> Self {
        Self {
            neighbours,
            couplings,
            r_cut,
            pseudodipolar: false,
            neel: false,
            anisotropy: Vec::new(),
            b_ext: [0.0; 3],
            zeeman_after: 0.0,
            simulation_box: SimulationBox::open(),
            reference_positions: Vec::new(),
        }
    }

    /// Every material and atom must have a coupling entry, and reference
    /// positions (when set) must cover every atom.
    pub fn check(&self, state: &EnsembleState, materials: &MaterialTable) -> Result<(), SimError> {
        state.validate(materials)?;
        if self.couplings.len() < materials.len() {
            return Err(SimError::LengthMismatch {
                what: "spin-lattice couplings",
                expected: materials.len(),
                got: self.couplings.len(),
            });
        }
        if !self.reference_positions.is_empty() && self.reference_positions.len() != state.num_atoms() {
            return Err(SimError::LengthMismatch {
                what: "reference positions",
                expected: state.num_atoms(),
                got: self.reference_positions.len(),
            });
        }
        if self.neighbours.num_atoms() != state.num_atoms() {
            return Err(SimError::LengthMismatch {
                what: "neighbour list",
                expected: state.num_atoms(),
                got: self.neighbours.num_atoms(),
            });
        }
        Ok(())
    }

    #[inline]
    fn separation(&self, positions: &[[f64; 3]], i: usize, j: usize) -> [f64; 3] {
        self.simulation_box.wrap(sub(positions[i], positions[j]))
    }

    /// Field of the magnetic pair terms on atom `i`.
    fn pair_field(&self, state: &EnsembleState, i: usize) -> [f64; 3] {
        let c = &self.couplings[state.material[i]];
        let r_cut2 = self.r_cut * self.r_cut;
        let inv_rc = 1.0 / self.r_cut;
        let mut h = [0.0; 3];

        for &j in self.neighbours.indices(i) {
            if j == i {
                continue;
            }
            let d = self.separation(&state.position, i, j);
            let r2 = dot(d, d);
            if r2 >= r_cut2 {
                continue;
            }
            let r = r2.sqrt();
            let sj = state.spin[j];

            let y = 1.0 - r * inv_rc;
            let jr = c.j0 * y * y * y;
            for k in 0..3 {
                h[k] += jr * sj[k];
            }

            if self.pseudodipolar || self.neel {
                let bond = Bond::new(state.spin[i], sj, d);
                if self.pseudodipolar {
                    add_scaled_in_place(&mut h, c.c0_field, bond.dipolar_field());
                }
                if self.neel {
                    add_scaled_in_place(&mut h, c.c0_field, bond.neel_field());
                }
            }
        }
        h
    }

    /// Force of the magnetic pair terms on atom `i`.
    fn pair_force(&self, state: &EnsembleState, i: usize) -> [f64; 3] {
        let c = &self.couplings[state.material[i]];
        let r_cut2 = self.r_cut * self.r_cut;
        let inv_rc = 1.0 / self.r_cut;
        let si = state.spin[i];
        let mut f = [0.0; 3];

        for &j in self.neighbours.indices(i) {
            if j == i {
                continue;
            }
            let d = self.separation(&state.position, i, j);
            let r2 = dot(d, d);
            if r2 >= r_cut2 {
                continue;
            }
            let r = r2.sqrt();
            let sj = state.spin[j];
            let si_sj = dot(si, sj);

            let y = 1.0 - r * inv_rc;
            let f_exch = -c.j0_prime * y * y * si_sj / r;
            for k in 0..3 {
                f[k] += f_exch * d[k];
            }

            if self.pseudodipolar || self.neel {
                let bond = Bond::new(si, sj, d);
                if self.pseudodipolar {
                    add_scaled_in_place(&mut f, c.c0_force, bond.dipolar_force());
                }
                if self.neel {
                    add_scaled_in_place(&mut f, c.c0_force, bond.neel_force());
                }
            }
        }
        f
    }

    /// Harmonic force and half the pair energy on atom `i`.
    fn harmonic(&self, state: &EnsembleState, i: usize) -> ([f64; 3], f64) {
        let k_spring = self.couplings[state.material[i]].spring;
        if k_spring == 0.0 || self.reference_positions.is_empty() {
            return ([0.0; 3], 0.0);
        }
        let mut f = [0.0; 3];
        let mut e = 0.0;
        for &j in self.neighbours.indices(i) {
            if j == i {
                continue;
            }
            let d = self.separation(&state.position, i, j);
            let r = dot(d, d).sqrt();
            let d0 = self.separation(&self.reference_positions, i, j);
            let r0 = dot(d0, d0).sqrt();
            let stretch = r - r0;
            let g = -k_spring * stretch / r;
            for k in 0..3 {
                f[k] += g * d[k];
            }
            e += 0.25 * k_spring * stretch * stretch;
        }
        (f, e)
    }

    /// Total exchange energy -½ Σ_ij J(r_ij) S_i·S_j, in the units of `j0`.
    pub fn exchange_energy(&self, state: &EnsembleState) -> f64 {
        let r_cut2 = self.r_cut * self.r_cut;
        let mut e = 0.0;
        for i in 0..state.num_atoms() {
            let c = &self.couplings[state.material[i]];
            for &j in self.neighbours.indices(i) {
                if j == i {
                    continue;
                }
                let d = self.separation(&state.position, i, j);
                let r2 = dot(d, d);
                if r2 >= r_cut2 {
                    continue;
                }
                let y = 1.0 - r2.sqrt() / self.r_cut;
                e += -0.5 * c.j0 * y * y * y * dot(state.spin[i], state.spin[j]);
            }
        }
        e
    }

    /// Total energy of the pseudo-dipolar and Néel terms, -½ Σ_ij E_ij (eV).
    pub fn coupling_energy(&self, state: &EnsembleState) -> f64 {
        if !(self.pseudodipolar || self.neel) {
            return 0.0;
        }
        let r_cut2 = self.r_cut * self.r_cut;
        let mut e = 0.0;
        for i in 0..state.num_atoms() {
            let c = &self.couplings[state.material[i]];
            for &j in self.neighbours.indices(i) {
                if j == i {
                    continue;
                }
                let d = self.separation(&state.position, i, j);
                if dot(d, d) >= r_cut2 {
                    continue;
                }
                let bond = Bond::new(state.spin[i], state.spin[j], d);
                if self.pseudodipolar {
                    e -= 0.5 * c.c0_force * bond.dipolar_energy();
                }
                if self.neel {
                    e -= 0.5 * c.c0_force * bond.neel_energy();
                }
            }
        }
        e
    }
}

#[inline]
fn add_scaled_in_place(acc: &mut [f64; 3], scale: f64, v: [f64; 3]) {
    for k in 0..3 {
        acc[k] += scale * v[k];
    }
}

impl SpinLatticeField for PairwiseSpinLattice {
    fn spin_fields(&self, range: Range<usize>, state: &EnsembleState, time: f64, fields: &mut [[f64; 3]]) {
        let zeeman_on = time > self.zeeman_after;
        for i in range {
            let mut h = self.pair_field(state, i);
            if zeeman_on {
                for k in 0..3 {
                    h[k] += self.b_ext[k];
                }
            }
            if let Some(Some(a)) = self.anisotropy.get(state.material[i]) {
                a.add_field(state.spin[i], &mut h);
            }
            fields[i] = h;
        }
    }

    fn forces(
        &self,
        range: Range<usize>,
        state: &EnsembleState,
        forces: &mut [[f64; 3]],
        energy: &mut [f64],
    ) {
        for i in range {
            let fm = self.pair_force(state, i);
            let (fh, e) = self.harmonic(state, i);
            forces[i] = [fm[0] + fh[0], fm[1] + fh[1], fm[2] + fh[2]];
            energy[i] = e;
        }
    }
}
