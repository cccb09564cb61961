// src/error.rs

//! Typed errors for setup, configuration and halo transport.
//!
//! The integrators themselves do no numerical checking; everything here is
//! raised either before a run starts or by the communication layer.

use std::fmt;

#[derive(Debug)]
pub enum SimError {
    /// Reading or writing run files failed.
    Io(std::io::Error),

    /// Run configuration could not be parsed or serialised.
    Config(serde_json::Error),

    /// A material entry has an unusable constant.
    InvalidMaterial { index: usize, reason: String },

    /// An atom refers to a material index that is not in the table.
    UnknownMaterial { atom: usize, material: usize },

    /// Two per-atom arrays that must agree in length do not.
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Owner assignment or neighbour list cannot be split into domains.
    InvalidDecomposition(String),

    /// The peer domain dropped its end of the halo channel.
    HaloDisconnected { peer: usize },

    /// Integrator name not recognised.
    UnknownIntegrator(String),

    /// A domain worker thread panicked mid-run.
    WorkerPanicked { rank: usize },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(e) => write!(f, "invalid run configuration: {e}"),
            Self::InvalidMaterial { index, reason } => {
                write!(f, "material {index} is invalid: {reason}")
            }
            Self::UnknownMaterial { atom, material } => {
                write!(f, "atom {atom} refers to unknown material {material}")
            }
            Self::LengthMismatch {
                what,
                expected,
                got,
            } => write!(f, "{what}: expected length {expected}, got {got}"),
            Self::InvalidDecomposition(msg) => write!(f, "invalid domain decomposition: {msg}"),
            Self::HaloDisconnected { peer } => {
                write!(f, "halo exchange with domain {peer} disconnected")
            }
            Self::UnknownIntegrator(name) => write!(f, "unknown integrator '{name}'"),
            Self::WorkerPanicked { rank } => write!(f, "worker for domain {rank} panicked"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}
