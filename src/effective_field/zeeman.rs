// src/effective_field/zeeman.rs

use std::ops::Range;

/// Write a uniform applied induction B_ext (Tesla) to every atom in `range`.
pub fn set_zeeman_field(range: Range<usize>, b_ext: [f64; 3], out: &mut [[f64; 3]]) {
    out[range].fill(b_ext);
}
