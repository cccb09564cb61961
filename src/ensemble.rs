// src/ensemble.rs

use crate::error::SimError;
use crate::params::MaterialTable;
use crate::vec3::{norm, normalize};

/// Per-atom state advanced by the integrators.
///
/// Arrays are sized once and persist for the run. In a decomposed run the
/// arrays hold the local atoms followed by the halo slots (see
/// [`crate::domain::DomainPartition`]).
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleState {
    pub spin: Vec<[f64; 3]>,
    pub position: Vec<[f64; 3]>,
    pub velocity: Vec<[f64; 3]>,
    pub material: Vec<usize>,
}

impl EnsembleState {
    /// `n` atoms of material 0, spins along +z, at rest at the origin.
    pub fn new(n: usize) -> Self {
        Self {
            spin: vec![[0.0, 0.0, 1.0]; n],
            position: vec![[0.0; 3]; n],
            velocity: vec![[0.0; 3]; n],
            material: vec![0; n],
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.spin.len()
    }

    /// Set every spin to the same (normalised) direction.
    pub fn set_uniform_spin(&mut self, dir: [f64; 3]) {
        let s = normalize(dir);
        for v in &mut self.spin {
            *v = s;
        }
    }

    /// Lay atoms out on a line along x with the given spacing.
    pub fn place_chain(&mut self, spacing: f64) {
        for (i, p) in self.position.iter_mut().enumerate() {
            *p = [i as f64 * spacing, 0.0, 0.0];
        }
    }

    /// Check array lengths and material indices against the table.
    pub fn validate(&self, materials: &MaterialTable) -> Result<(), SimError> {
        let n = self.spin.len();
        for (what, got) in [
            ("position", self.position.len()),
            ("velocity", self.velocity.len()),
            ("material", self.material.len()),
        ] {
            if got != n {
                return Err(SimError::LengthMismatch {
                    what,
                    expected: n,
                    got,
                });
            }
        }
        if let Some((atom, &material)) = self
            .material
            .iter()
            .enumerate()
            .find(|(_, &m)| m >= materials.len())
        {
            return Err(SimError::UnknownMaterial { atom, material });
        }
        Ok(())
    }

    /// Largest deviation of |spin| from one over the first `n` atoms.
    pub fn max_norm_error(&self, n: usize) -> f64 {
        self.spin[..n]
            .iter()
            .map(|s| (norm(*s) - 1.0).abs())
            .fold(0.0, f64::max)
    }
}
