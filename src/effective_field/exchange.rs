// src/effective_field/exchange.rs

use std::ops::Range;

use rayon::prelude::*;

use crate::neighbours::NeighbourList;

/// Ranges shorter than this are summed on the calling thread.
const PAR_MIN_ATOMS: usize = 512;

/// Heisenberg exchange field on atom `i`: Σ_j J_ij S_j, in list order.
#[inline]
pub fn exchange_field_at(neighbours: &NeighbourList, spins: &[[f64; 3]], i: usize) -> [f64; 3] {
    let mut h = [0.0; 3];
    for (j, jij) in neighbours.neighbours(i) {
        let s = spins[j];
        h[0] += jij * s[0];
        h[1] += jij * s[1];
        h[2] += jij * s[2];
    }
    h
}

/// Overwrite `out[range]` with the exchange field.
///
/// Bulk ranges run on the rayon pool; each atom's sum is still done in list
/// order, so the result does not depend on the thread count.
pub fn set_exchange_field(
    neighbours: &NeighbourList,
    spins: &[[f64; 3]],
    range: Range<usize>,
    out: &mut [[f64; 3]],
) {
    let start = range.start;
    let block = &mut out[range];
    if block.len() < PAR_MIN_ATOMS {
        for (k, h) in block.iter_mut().enumerate() {
            *h = exchange_field_at(neighbours, spins, start + k);
        }
    } else {
        block.par_iter_mut().enumerate().for_each(|(k, h)| {
            *h = exchange_field_at(neighbours, spins, start + k);
        });
    }
}
