// src/runner.rs
//
// Runs the distributed RK4 integrator with one OS thread per domain and the
// in-process channel transport. Domain states persist between calls so a
// driver can advance in chunks and gather for output in between.
//
// A worker that fails or panics leaves the halo mesh before its thread ends,
// so its peers see `HaloDisconnected` and return instead of blocking.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crate::domain::{decompose, LocalDomain};
use crate::effective_field::FieldAccumulator;
use crate::ensemble::EnsembleState;
use crate::error::SimError;
use crate::halo::ChannelHalo;
use crate::neighbours::NeighbourList;
use crate::noise::GaussianNoise;
use crate::params::{IntegrationParams, MaterialTable};
use crate::rk4::{step_stochastic_rk4, Rk4Scratch};

struct Worker<F> {
    fields: F,
    state: EnsembleState,
    halo: ChannelHalo,
    noise: GaussianNoise,
    scratch: Rk4Scratch,
}

pub struct DomainRunner<F> {
    domains: Vec<LocalDomain>,
    workers: Vec<Worker<F>>,
}

impl<F: FieldAccumulator + Send> DomainRunner<F> {
    /// Decompose `global` by `owners` and set up one worker per rank.
    ///
    /// `make_fields` builds each domain's field accumulator from its local
    /// neighbour list. Rank `r` draws noise from stream `r` of `seed`.
    pub fn new(
        global: &EnsembleState,
        owners: &[usize],
        num_ranks: usize,
        neighbours: &NeighbourList,
        seed: u64,
        mut make_fields: impl FnMut(&LocalDomain) -> F,
    ) -> Result<Self, SimError> {
        if owners.len() != global.num_atoms() {
            return Err(SimError::LengthMismatch {
                what: "owners",
                expected: global.num_atoms(),
                got: owners.len(),
            });
        }
        let domains = decompose(owners, num_ranks, neighbours)?;
        let halos = ChannelHalo::mesh(&domains)?;

        let workers = domains
            .iter()
            .zip(halos)
            .map(|(d, halo)| Worker {
                fields: make_fields(d),
                state: d.scatter(global),
                halo,
                noise: GaussianNoise::for_domain(seed, d.rank),
                scratch: Rk4Scratch::new(),
            })
            .collect();

        for d in &domains {
            log::info!(
                "domain {}: {} core, {} boundary, {} halo, {} peers",
                d.rank,
                d.partition.num_core,
                d.partition.num_boundary,
                d.partition.num_halo,
                d.sends.len()
            );
        }

        Ok(Self { domains, workers })
    }

    pub fn num_domains(&self) -> usize {
        self.domains.len()
    }

    pub fn domains(&self) -> &[LocalDomain] {
        &self.domains
    }

    /// Advance every domain by `steps` RK4 steps, in parallel.
    ///
    /// On failure the error of the domain that failed first is returned in
    /// preference to the disconnects it caused in its peers. The runner cannot
    /// be advanced again after an error.
    pub fn advance(
        &mut self,
        steps: usize,
        materials: &MaterialTable,
        params: &IntegrationParams,
    ) -> Result<(), SimError> {
        let results: Vec<Result<(), SimError>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .workers
                .iter_mut()
                .zip(&self.domains)
                .map(|(w, d)| {
                    let rank = d.rank;
                    let handle = s.spawn(move || {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            for _ in 0..steps {
                                step_stochastic_rk4(
                                    &mut w.state,
                                    &d.partition,
                                    &w.fields,
                                    &mut w.halo,
                                    &mut w.noise,
                                    materials,
                                    params,
                                    &mut w.scratch,
                                )?;
                            }
                            Ok::<(), SimError>(())
                        }));
                        let res = outcome.unwrap_or(Err(SimError::WorkerPanicked { rank }));
                        if let Err(e) = &res {
                            log::error!("domain {rank}: {e}");
                            w.halo.disconnect();
                        }
                        res
                    });
                    (rank, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(rank, h)| h.join().unwrap_or(Err(SimError::WorkerPanicked { rank })))
                .collect()
        });

        let mut errors: Vec<SimError> = results.into_iter().filter_map(Result::err).collect();
        match errors
            .iter()
            .position(|e| !matches!(e, SimError::HaloDisconnected { .. }))
        {
            Some(i) => Err(errors.swap_remove(i)),
            None => errors.into_iter().next().map_or(Ok(()), Err),
        }
    }

    /// Copy every domain's owned atoms into `global`.
    pub fn gather(&self, global: &mut EnsembleState) {
        for (d, w) in self.domains.iter().zip(&self.workers) {
            d.gather(&w.state, global);
        }
    }

    /// Per-domain time spent blocked on halo data and barriers.
    pub fn wait_times(&self) -> Vec<Duration> {
        self.workers.iter().map(|w| w.halo.wait_time()).collect()
    }
}
