// src/neighbours.rs

/// Compressed per-atom neighbour ranges with a scalar coupling per entry.
///
/// Row `i` lists the atoms whose state enters atom `i`'s field, in the
/// order the field kernels sum them. That order is part of the numerics:
/// two lists with the same entries in a different order give results that
/// agree only to summation-order tolerance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighbourList {
    start: Vec<usize>,
    index: Vec<usize>,
    coupling: Vec<f64>,
}

impl NeighbourList {
    /// Build from directed `(i, j, coupling)` entries. Entries for the same
    /// `i` keep their input order.
    pub fn from_pairs<I>(num_atoms: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let pairs: Vec<(usize, usize, f64)> = pairs.into_iter().collect();

        let mut start = vec![0usize; num_atoms + 1];
        for &(i, _, _) in &pairs {
            start[i + 1] += 1;
        }
        for i in 0..num_atoms {
            start[i + 1] += start[i];
        }

        let mut fill = start.clone();
        let mut index = vec![0usize; pairs.len()];
        let mut coupling = vec![0.0; pairs.len()];
        for (i, j, c) in pairs {
            let slot = fill[i];
            index[slot] = j;
            coupling[slot] = c;
            fill[i] += 1;
        }

        Self {
            start,
            index,
            coupling,
        }
    }

    /// Nearest-neighbour chain with uniform coupling, optionally closed into a ring.
    pub fn chain(num_atoms: usize, coupling: f64, periodic: bool) -> Self {
        let mut pairs = Vec::with_capacity(2 * num_atoms);
        for i in 0..num_atoms {
            if i > 0 {
                pairs.push((i, i - 1, coupling));
            } else if periodic && num_atoms > 2 {
                pairs.push((i, num_atoms - 1, coupling));
            }
            if i + 1 < num_atoms {
                pairs.push((i, i + 1, coupling));
            } else if periodic && num_atoms > 2 {
                pairs.push((i, 0, coupling));
            }
        }
        Self::from_pairs(num_atoms, pairs)
    }

    /// Every atom coupled to every other atom.
    pub fn fully_connected(num_atoms: usize, coupling: f64) -> Self {
        let pairs = (0..num_atoms).flat_map(|i| {
            (0..num_atoms)
                .filter(move |&j| j != i)
                .map(move |j| (i, j, coupling))
        });
        Self::from_pairs(num_atoms, pairs)
    }

    pub fn num_atoms(&self) -> usize {
        self.start.len().saturating_sub(1)
    }

    /// Total number of directed entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Neighbour indices of atom `i`.
    #[inline]
    pub fn indices(&self, i: usize) -> &[usize] {
        &self.index[self.start[i]..self.start[i + 1]]
    }

    /// Couplings of atom `i`, parallel to [`Self::indices`].
    #[inline]
    pub fn couplings(&self, i: usize) -> &[f64] {
        &self.coupling[self.start[i]..self.start[i + 1]]
    }

    /// `(j, coupling)` pairs of atom `i`.
    #[inline]
    pub fn neighbours(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices(i)
            .iter()
            .copied()
            .zip(self.couplings(i).iter().copied())
    }
}
