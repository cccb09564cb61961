// src/halo.rs
//
// Halo exchange for domain-decomposed runs.
//
// `begin` publishes this domain's boundary spins and returns immediately with
// a token; `end(token)` blocks until every halo slot holds the peers' state
// from the matching `begin`. Only core work may run between the two.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::{HaloLink, LocalDomain};
use crate::error::SimError;

/// Proof that an exchange was started and has not yet been completed.
#[must_use = "a started halo exchange must be completed with `end`"]
#[derive(Debug)]
pub struct PendingExchange {
    seq: u64,
}

impl PendingExchange {
    pub fn new(seq: u64) -> Self {
        Self { seq }
    }

    pub fn sequence(&self) -> u64 {
        self.seq
    }
}

pub trait HaloExchange {
    /// Publish boundary state to peers; must not block on them.
    fn begin(&mut self, spins: &[[f64; 3]]) -> PendingExchange;

    /// Wait for the exchange started by `pending` and fill the halo slots.
    fn end(&mut self, pending: PendingExchange, spins: &mut [[f64; 3]]) -> Result<(), SimError>;

    /// Block until every domain reaches the same point.
    fn barrier(&mut self) -> Result<(), SimError>;
}

/// Single-domain transport: there is nothing to exchange.
#[derive(Debug, Default)]
pub struct NoHalo {
    seq: u64,
}

impl HaloExchange for NoHalo {
    fn begin(&mut self, _spins: &[[f64; 3]]) -> PendingExchange {
        self.seq += 1;
        PendingExchange::new(self.seq)
    }

    fn end(&mut self, _pending: PendingExchange, _spins: &mut [[f64; 3]]) -> Result<(), SimError> {
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    departed: Option<usize>,
}

/// Reusable barrier that a participant can leave for good. Once one has left,
/// every pending and future `wait` fails instead of blocking.
#[derive(Debug)]
struct HaloBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl HaloBarrier {
    fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                departed: None,
            }),
            released: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<(), SimError> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(peer) = st.departed {
            return Err(SimError::HaloDisconnected { peer });
        }
        st.arrived += 1;
        if st.arrived == self.parties {
            st.arrived = 0;
            st.generation += 1;
            self.released.notify_all();
            return Ok(());
        }

        let generation = st.generation;
        while st.generation == generation && st.departed.is_none() {
            st = self
                .released
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match st.departed {
            Some(peer) if st.generation == generation => Err(SimError::HaloDisconnected { peer }),
            _ => Ok(()),
        }
    }

    fn depart(&self, rank: usize) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.departed.get_or_insert(rank);
        self.released.notify_all();
    }
}

#[derive(Debug)]
struct HaloMessage {
    seq: u64,
    spins: Vec<[f64; 3]>,
}

/// In-process transport: one thread per domain, one channel per directed link.
pub struct ChannelHalo {
    rank: usize,
    seq: u64,
    outgoing: Vec<(HaloLink, Sender<HaloMessage>)>,
    incoming: Vec<(HaloLink, Receiver<HaloMessage>)>,
    barrier: Arc<HaloBarrier>,
    broken: Option<usize>,
    wait_time: Duration,
}

impl ChannelHalo {
    /// Wire up every send/receive link of the given domains. Element `r` of
    /// the result belongs to `domains[r]`.
    pub fn mesh(domains: &[LocalDomain]) -> Result<Vec<ChannelHalo>, SimError> {
        if let Some((i, d)) = domains.iter().enumerate().find(|(i, d)| d.rank != *i) {
            return Err(SimError::InvalidDecomposition(format!(
                "domain at position {i} has rank {}",
                d.rank
            )));
        }

        let barrier = Arc::new(HaloBarrier::new(domains.len().max(1)));
        let mut halos: Vec<ChannelHalo> = domains
            .iter()
            .map(|d| ChannelHalo {
                rank: d.rank,
                seq: 0,
                outgoing: Vec::with_capacity(d.sends.len()),
                incoming: Vec::with_capacity(d.recvs.len()),
                barrier: Arc::clone(&barrier),
                broken: None,
                wait_time: Duration::ZERO,
            })
            .collect();

        for d in domains {
            for link in &d.sends {
                let peer = domains.get(link.peer).ok_or_else(|| {
                    SimError::InvalidDecomposition(format!(
                        "domain {} sends to unknown domain {}",
                        d.rank, link.peer
                    ))
                })?;
                let recv = peer
                    .recvs
                    .iter()
                    .find(|l| l.peer == d.rank)
                    .ok_or_else(|| {
                        SimError::InvalidDecomposition(format!(
                            "domain {} sends to {} but {} expects nothing",
                            d.rank, link.peer, link.peer
                        ))
                    })?;
                if recv.slots.len() != link.slots.len() {
                    return Err(SimError::LengthMismatch {
                        what: "halo link",
                        expected: link.slots.len(),
                        got: recv.slots.len(),
                    });
                }
                let (tx, rx) = channel();
                halos[d.rank].outgoing.push((link.clone(), tx));
                halos[link.peer].incoming.push((recv.clone(), rx));
            }
        }

        // receive in ascending peer order regardless of wiring order
        for h in &mut halos {
            h.incoming.sort_by_key(|(link, _)| link.peer);
        }

        Ok(halos)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Time spent blocked in `end` and `barrier` so far.
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Leave the mesh for good. Peers waiting on this domain's data or on the
    /// barrier get `HaloDisconnected` instead of blocking.
    pub fn disconnect(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        self.broken.get_or_insert(self.rank);
        self.barrier.depart(self.rank);
        log::debug!("rank {}: left the halo mesh", self.rank);
    }

    pub fn is_disconnected(&self) -> bool {
        self.broken.is_some()
    }
}

impl HaloExchange for ChannelHalo {
    fn begin(&mut self, spins: &[[f64; 3]]) -> PendingExchange {
        self.seq += 1;
        for (link, tx) in &self.outgoing {
            let msg = HaloMessage {
                seq: self.seq,
                spins: link.slots.iter().map(|&k| spins[k]).collect(),
            };
            if tx.send(msg).is_err() && self.broken.is_none() {
                self.broken = Some(link.peer);
            }
        }
        log::trace!(
            "rank {}: halo exchange {} started ({} links)",
            self.rank,
            self.seq,
            self.outgoing.len()
        );
        PendingExchange::new(self.seq)
    }

    fn end(&mut self, pending: PendingExchange, spins: &mut [[f64; 3]]) -> Result<(), SimError> {
        if let Some(peer) = self.broken {
            return Err(SimError::HaloDisconnected { peer });
        }

        let t0 = Instant::now();
        for (link, rx) in &self.incoming {
            let msg = rx
                .recv()
                .map_err(|_| SimError::HaloDisconnected { peer: link.peer })?;
            debug_assert_eq!(msg.seq, pending.seq, "halo messages out of order");
            if msg.spins.len() != link.slots.len() {
                return Err(SimError::LengthMismatch {
                    what: "halo message",
                    expected: link.slots.len(),
                    got: msg.spins.len(),
                });
            }
            for (&k, s) in link.slots.iter().zip(msg.spins) {
                spins[k] = s;
            }
        }
        self.wait_time += t0.elapsed();

        log::trace!("rank {}: halo exchange {} complete", self.rank, pending.seq);
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), SimError> {
        let t0 = Instant::now();
        let res = self.barrier.wait();
        self.wait_time += t0.elapsed();
        res
    }
}
