// src/domain.rs
//
// Domain decomposition for the distributed RK4 integrator.
//
// Local ordering inside every domain:
//   [ core atoms | boundary atoms | halo slots ]
// - core:     owned atoms whose neighbours are all owned by this domain
// - boundary: owned atoms with at least one remote neighbour
// - halo:     read-only copies of remote atoms, refreshed by the halo exchange
//
// Each block is in ascending global id. Send and receive slot lists for a
// peer are in ascending global id on both sides, so a packed message needs no
// index header.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use crate::ensemble::EnsembleState;
use crate::error::SimError;
use crate::neighbours::NeighbourList;

/// Index layout of one domain's state arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainPartition {
    pub num_core: usize,
    pub num_boundary: usize,
    pub num_halo: usize,
}

impl DomainPartition {
    /// Whole system in one domain: every atom is core.
    pub fn single(num_atoms: usize) -> Self {
        Self {
            num_core: num_atoms,
            num_boundary: 0,
            num_halo: 0,
        }
    }

    #[inline]
    pub fn core(&self) -> Range<usize> {
        0..self.num_core
    }

    #[inline]
    pub fn boundary(&self) -> Range<usize> {
        self.num_core..self.num_core + self.num_boundary
    }

    /// Atoms this domain integrates (core ∪ boundary).
    #[inline]
    pub fn local(&self) -> Range<usize> {
        0..self.num_local()
    }

    #[inline]
    pub fn halo(&self) -> Range<usize> {
        self.num_local()..self.num_total()
    }

    #[inline]
    pub fn num_local(&self) -> usize {
        self.num_core + self.num_boundary
    }

    #[inline]
    pub fn num_total(&self) -> usize {
        self.num_local() + self.num_halo
    }
}

/// Local slots exchanged with one peer domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloLink {
    pub peer: usize,
    pub slots: Vec<usize>,
}

/// Everything one domain needs to integrate its share of the system.
#[derive(Debug, Clone)]
pub struct LocalDomain {
    pub rank: usize,
    pub partition: DomainPartition,
    /// local slot -> global atom id (local atoms, then halo)
    pub global_ids: Vec<usize>,
    /// neighbour list in local indices; halo rows are empty
    pub neighbours: NeighbourList,
    /// owned slots packed for each peer
    pub sends: Vec<HaloLink>,
    /// halo slots filled from each peer
    pub recvs: Vec<HaloLink>,
}

impl LocalDomain {
    /// Copy this domain's atoms (local and halo) out of a global state.
    pub fn scatter(&self, global: &EnsembleState) -> EnsembleState {
        let pick = |src: &[[f64; 3]]| self.global_ids.iter().map(|&g| src[g]).collect();
        EnsembleState {
            spin: pick(&global.spin),
            position: pick(&global.position),
            velocity: pick(&global.velocity),
            material: self.global_ids.iter().map(|&g| global.material[g]).collect(),
        }
    }

    /// Write this domain's owned atoms back into a global state.
    pub fn gather(&self, local: &EnsembleState, global: &mut EnsembleState) {
        for (slot, &g) in self.global_ids[..self.partition.num_local()]
            .iter()
            .enumerate()
        {
            global.spin[g] = local.spin[slot];
            global.position[g] = local.position[slot];
            global.velocity[g] = local.velocity[slot];
        }
    }
}

/// Split a global neighbour list across `num_ranks` domains by owner rank.
pub fn decompose(
    owners: &[usize],
    num_ranks: usize,
    neighbours: &NeighbourList,
) -> Result<Vec<LocalDomain>, SimError> {
    let n = owners.len();
    if num_ranks == 0 {
        return Err(SimError::InvalidDecomposition(
            "need at least one rank".to_string(),
        ));
    }
    if neighbours.num_atoms() != n {
        return Err(SimError::LengthMismatch {
            what: "owners",
            expected: neighbours.num_atoms(),
            got: n,
        });
    }
    if let Some((atom, &r)) = owners.iter().enumerate().find(|(_, &r)| r >= num_ranks) {
        return Err(SimError::InvalidDecomposition(format!(
            "atom {atom} assigned to rank {r} but only {num_ranks} ranks exist"
        )));
    }
    for i in 0..n {
        if let Some(&j) = neighbours.indices(i).iter().find(|&&j| j >= n) {
            return Err(SimError::InvalidDecomposition(format!(
                "atom {i} lists neighbour {j} outside 0..{n}"
            )));
        }
    }

    // sends[r][p]: atoms owned by r read by atoms owned by p
    let mut sends: Vec<Vec<BTreeSet<usize>>> = vec![vec![BTreeSet::new(); num_ranks]; num_ranks];
    for i in 0..n {
        let p = owners[i];
        for &j in neighbours.indices(i) {
            let r = owners[j];
            if r != p {
                sends[r][p].insert(j);
            }
        }
    }

    let mut domains = Vec::with_capacity(num_ranks);
    for rank in 0..num_ranks {
        let mut core = Vec::new();
        let mut boundary = Vec::new();
        let mut halo = BTreeSet::new();

        for i in (0..n).filter(|&i| owners[i] == rank) {
            let mut remote = false;
            for &j in neighbours.indices(i) {
                if owners[j] != rank {
                    remote = true;
                    halo.insert(j);
                }
            }
            if remote {
                boundary.push(i);
            } else {
                core.push(i);
            }
        }

        let partition = DomainPartition {
            num_core: core.len(),
            num_boundary: boundary.len(),
            num_halo: halo.len(),
        };

        let global_ids: Vec<usize> = core
            .iter()
            .chain(boundary.iter())
            .chain(halo.iter())
            .copied()
            .collect();
        let local_of: HashMap<usize, usize> = global_ids
            .iter()
            .enumerate()
            .map(|(slot, &g)| (g, slot))
            .collect();

        let pairs = global_ids[..partition.num_local()]
            .iter()
            .enumerate()
            .flat_map(|(slot, &g)| {
                let local_of = &local_of;
                neighbours
                    .neighbours(g)
                    .map(move |(j, c)| (slot, local_of[&j], c))
            });
        let local_neighbours = NeighbourList::from_pairs(global_ids.len(), pairs);

        let send_links = (0..num_ranks)
            .filter(|&p| p != rank && !sends[rank][p].is_empty())
            .map(|p| HaloLink {
                peer: p,
                slots: sends[rank][p].iter().map(|g| local_of[g]).collect(),
            })
            .collect();

        let recv_links = (0..num_ranks)
            .filter(|&p| p != rank)
            .filter_map(|p| {
                let slots: Vec<usize> = halo
                    .iter()
                    .filter(|&&g| owners[g] == p)
                    .map(|g| local_of[g])
                    .collect();
                (!slots.is_empty()).then_some(HaloLink { peer: p, slots })
            })
            .collect();

        domains.push(LocalDomain {
            rank,
            partition,
            global_ids,
            neighbours: local_neighbours,
            sends: send_links,
            recvs: recv_links,
        });
    }

    Ok(domains)
}
