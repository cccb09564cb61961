// src/spinlattice/mod.rs
//
// Coupled spin + lattice dynamics.
//
// Units: spins are unit vectors, fields in Tesla, positions in Å,
// velocities in Å/ps, forces in eV/Å, masses in eV ps²/Å².

pub mod fields;
pub mod suzuki_trotter;

use std::ops::Range;

use crate::ensemble::EnsembleState;

pub use fields::{PairwiseSpinLattice, SimulationBox, SldCoupling};
pub use suzuki_trotter::{step_suzuki_trotter, SuzukiTrotterScratch, SweepDirection};

/// Producer of fields and forces for spin-lattice dynamics.
///
/// Both methods read `state` and overwrite their outputs on `range` only.
/// `spin_fields` must be cheap for a single-atom range: the Suzuki–Trotter
/// sweeps call it once per atom.
pub trait SpinLatticeField {
    /// Local field on each atom in `range` at simulation time `time` (s).
    fn spin_fields(&self, range: Range<usize>, state: &EnsembleState, time: f64, fields: &mut [[f64; 3]]);

    /// Total force on each atom and its share of the pair potential energy (eV).
    fn forces(
        &self,
        range: Range<usize>,
        state: &EnsembleState,
        forces: &mut [[f64; 3]],
        energy: &mut [f64],
    );
}
