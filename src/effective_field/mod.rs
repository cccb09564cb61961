// src/effective_field/mod.rs

//! Local fields (Tesla) seen by each atom, split the way the integrators use them:
//! spin-dependent fields are rebuilt every stage, external fields once per step.

pub mod anisotropy;
pub mod exchange;
pub mod lsf;
pub mod zeeman;

use std::ops::Range;

use crate::ensemble::EnsembleState;
use crate::neighbours::NeighbourList;

pub use anisotropy::UniaxialAnisotropy;

/// Producer of per-atom fields over a contiguous index range.
///
/// Implementations read `state` and overwrite `out[range]`; nothing outside
/// the range is touched and the state is never mutated. `range` may be a
/// single atom or a whole block.
pub trait FieldAccumulator {
    /// Fields that depend on the current spin configuration.
    fn spin_fields(&self, range: Range<usize>, state: &EnsembleState, out: &mut [[f64; 3]]);

    /// Spin-independent fields (applied field, etc.). Defaults to zero.
    fn external_fields(&self, range: Range<usize>, _state: &EnsembleState, out: &mut [[f64; 3]]) {
        out[range].fill([0.0; 3]);
    }
}

/// Reference Hamiltonian: Heisenberg exchange + per-material uniaxial
/// anisotropy, with a uniform Zeeman field as the external term.
#[derive(Debug, Clone, Default)]
pub struct SpinHamiltonian {
    /// couplings in Tesla (J_ij / μ_s)
    pub neighbours: NeighbourList,
    /// indexed by material; `None` switches the term off for that material
    pub anisotropy: Vec<Option<UniaxialAnisotropy>>,
    /// applied induction (T)
    pub b_ext: [f64; 3],
}

impl SpinHamiltonian {
    pub fn new(neighbours: NeighbourList) -> Self {
        Self {
            neighbours,
            ..Default::default()
        }
    }

    pub fn with_zeeman(mut self, b_ext: [f64; 3]) -> Self {
        self.b_ext = b_ext;
        self
    }

    pub fn with_anisotropy(mut self, per_material: Vec<Option<UniaxialAnisotropy>>) -> Self {
        self.anisotropy = per_material;
        self
    }
}

impl FieldAccumulator for SpinHamiltonian {
    fn spin_fields(&self, range: Range<usize>, state: &EnsembleState, out: &mut [[f64; 3]]) {
        exchange::set_exchange_field(&self.neighbours, &state.spin, range.clone(), out);

        if self.anisotropy.iter().any(Option::is_some) {
            for i in range {
                if let Some(Some(k)) = self.anisotropy.get(state.material[i]) {
                    k.add_field(state.spin[i], &mut out[i]);
                }
            }
        }
    }

    fn external_fields(&self, range: Range<usize>, _state: &EnsembleState, out: &mut [[f64; 3]]) {
        zeeman::set_zeeman_field(range, self.b_ext, out);
    }
}
