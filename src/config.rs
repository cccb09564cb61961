// src/config.rs
//
// JSON run configuration. The driver loads one (or builds the default chain),
// applies command-line overrides, and writes the effective version next to
// its outputs as `config.json`.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::effective_field::{SpinHamiltonian, UniaxialAnisotropy};
use crate::ensemble::EnsembleState;
use crate::error::SimError;
use crate::neighbours::NeighbourList;
use crate::params::{IntegrationParams, Material, MaterialTable};
use crate::spinlattice::{PairwiseSpinLattice, SimulationBox, SldCoupling};
use crate::vec3::dot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrator {
    /// Distributed stochastic RK4 (spins only).
    Rk4,
    /// Single-process stochastic Heun (spins only).
    Heun,
    /// Symmetric Suzuki–Trotter (spins + lattice).
    SuzukiTrotter,
}

impl Integrator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rk4 => "rk4",
            Self::Heun => "heun",
            Self::SuzukiTrotter => "suzuki-trotter",
        }
    }
}

impl FromStr for Integrator {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rk4" => Ok(Self::Rk4),
            "heun" => Ok(Self::Heun),
            "suzuki-trotter" | "st" | "sld" => Ok(Self::SuzukiTrotter),
            other => Err(SimError::UnknownIntegrator(other.to_string())),
        }
    }
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub system: SystemConfig,
    pub materials: MaterialTable,
    pub numerics: NumericsConfig,
    pub run: RunInfo,
}

/// A chain of identical atoms along x.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub atoms: usize,
    /// lattice spacing (Å)
    pub spacing: f64,
    #[serde(default = "default_true")]
    pub periodic: bool,
    /// nearest-neighbour exchange in field units (T)
    pub exchange: f64,
    #[serde(default)]
    pub anisotropy: Option<AnisotropyConfig>,
    /// applied induction (T)
    #[serde(default)]
    pub b_ext: [f64; 3],
    #[serde(default = "default_initial_spin")]
    pub initial_spin: [f64; 3],
    /// number of RK4 domains (contiguous blocks of the chain)
    #[serde(default = "default_domains")]
    pub domains: usize,
    /// only read by the spin-lattice integrator
    #[serde(default)]
    pub lattice: Option<LatticeConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnisotropyConfig {
    /// anisotropy field (T)
    pub b_k: f64,
    pub axis: [f64; 3],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub coupling: SldCoupling,
    /// cutoff for the magnetic pair terms (Å)
    pub r_cut: f64,
    #[serde(default)]
    pub pseudodipolar: bool,
    #[serde(default)]
    pub neel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericsConfig {
    pub integrator: String,
    /// time step (s)
    pub dt: f64,
    pub steps: usize,
    pub output_stride: usize,
    /// bath temperature (K)
    #[serde(default)]
    pub temperature: f64,
    /// equilibration window (s)
    #[serde(default)]
    pub equilibration_time: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,
    #[serde(default)]
    pub timestamp_utc: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_initial_spin() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn default_domains() -> usize {
    1
}

fn invalid(msg: impl fmt::Display) -> SimError {
    SimError::Config(<serde_json::Error as serde::de::Error>::custom(msg))
}

impl NumericsConfig {
    pub fn integrator(&self) -> Result<Integrator, SimError> {
        self.integrator.parse()
    }

    pub fn integration_params(&self) -> IntegrationParams {
        IntegrationParams {
            dt: self.dt,
            temperature: self.temperature,
            equilibration_time: self.equilibration_time,
        }
    }
}

impl SystemConfig {
    /// Atoms on the x axis at `spacing`, all with material 0 and `initial_spin`.
    pub fn build_state(&self) -> EnsembleState {
        let mut state = EnsembleState::new(self.atoms);
        state.place_chain(self.spacing);
        state.set_uniform_spin(self.initial_spin);
        state
    }

    pub fn neighbours(&self) -> NeighbourList {
        NeighbourList::chain(self.atoms, self.exchange, self.periodic)
    }

    pub fn hamiltonian(&self) -> SpinHamiltonian {
        self.hamiltonian_over(self.neighbours())
    }

    /// Same terms as [`Self::hamiltonian`] over another (e.g. domain-local) list.
    pub fn hamiltonian_over(&self, neighbours: NeighbourList) -> SpinHamiltonian {
        let anisotropy = self
            .anisotropy
            .map(|a| UniaxialAnisotropy::new(a.b_k, a.axis));
        SpinHamiltonian::new(neighbours)
            .with_zeeman(self.b_ext)
            .with_anisotropy(vec![anisotropy])
    }

    /// Spin-lattice Hamiltonian about the initial chain positions. The applied
    /// field switches on after `zeeman_after` (s).
    ///
    /// Without a `lattice` section the lattice is rigid and the exchange
    /// reproduces `exchange` between nearest neighbours: with r_c = 1.5 a,
    /// J(a) = J0 / 27.
    pub fn spin_lattice(
        &self,
        zeeman_after: f64,
        materials: &MaterialTable,
    ) -> Result<PairwiseSpinLattice, SimError> {
        let lattice = self.lattice.unwrap_or(LatticeConfig {
            coupling: SldCoupling {
                j0: 27.0 * self.exchange,
                ..Default::default()
            },
            r_cut: 1.5 * self.spacing,
            pseudodipolar: false,
            neel: false,
        });
        let mut sl = PairwiseSpinLattice::new(
            self.neighbours(),
            vec![lattice.coupling; materials.len()],
            lattice.r_cut,
        );
        sl.pseudodipolar = lattice.pseudodipolar;
        sl.neel = lattice.neel;
        sl.anisotropy = vec![self.anisotropy.map(|a| UniaxialAnisotropy::new(a.b_k, a.axis))];
        sl.b_ext = self.b_ext;
        sl.zeeman_after = zeeman_after;
        if self.periodic {
            sl.simulation_box = SimulationBox {
                size: [self.atoms as f64 * self.spacing, 0.0, 0.0],
                periodic: [true, false, false],
            };
        }
        let state = self.build_state();
        sl.reference_positions = state.position.clone();
        sl.check(&state, materials)?;
        Ok(sl)
    }

    /// Owner rank per atom: `domains` contiguous blocks of nearly equal size.
    pub fn owners(&self) -> Vec<usize> {
        let d = self.domains.max(1);
        (0..self.atoms).map(|i| i * d / self.atoms.max(1)).collect()
    }
}

impl RunConfig {
    /// Eight-atom ferromagnetic ring in an applied field, iron-like moment.
    pub fn default_chain() -> Self {
        let material = Material {
            name: "Fe".to_string(),
            alpha: 0.1,
            alpha_eq: 0.5,
            mu_s: 2.22 * crate::params::MU_B_J_PER_T,
            mass: 5.788e-3,
            ..Default::default()
        };
        Self {
            system: SystemConfig {
                atoms: 8,
                spacing: 2.48,
                periodic: true,
                exchange: 100.0,
                anisotropy: None,
                b_ext: [0.0, 0.0, 10.0],
                initial_spin: [1.0, 0.0, 0.2],
                domains: 1,
                lattice: None,
            },
            materials: MaterialTable::new(vec![material]).unwrap_or_default(),
            numerics: NumericsConfig {
                integrator: Integrator::Rk4.as_str().to_string(),
                dt: 1e-16,
                steps: 2000,
                output_stride: 20,
                temperature: 0.0,
                equilibration_time: 0.0,
                seed: 1,
            },
            run: RunInfo {
                binary: "atomspin".to_string(),
                run_id: "default".to_string(),
                timestamp_utc: None,
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self, SimError> {
        let file = File::open(path)?;
        let cfg: Self = serde_json::from_reader(BufReader::new(file))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that cannot be expressed in the serde schema.
    pub fn validate(&self) -> Result<(), SimError> {
        // deserialisation bypasses the table's own checks
        MaterialTable::new(self.materials.iter().cloned().collect())?;
        if self.materials.is_empty() {
            return Err(invalid("at least one material is required"));
        }
        if self.system.atoms == 0 {
            return Err(invalid("system.atoms must be positive"));
        }
        if self.system.spacing.is_nan() || self.system.spacing <= 0.0 {
            return Err(invalid("system.spacing must be positive"));
        }
        if self.system.domains == 0 || self.system.domains > self.system.atoms {
            return Err(invalid(format!(
                "system.domains must be in 1..={}, got {}",
                self.system.atoms, self.system.domains
            )));
        }
        if dot(self.system.initial_spin, self.system.initial_spin) == 0.0 {
            return Err(invalid("system.initial_spin must be non-zero"));
        }
        if self.numerics.dt.is_nan() || self.numerics.dt <= 0.0 {
            return Err(invalid("numerics.dt must be positive"));
        }
        if self.numerics.output_stride == 0 {
            return Err(invalid("numerics.output_stride must be positive"));
        }
        if self.numerics.temperature < 0.0 {
            return Err(invalid("numerics.temperature must be non-negative"));
        }
        self.numerics.integrator()?;
        Ok(())
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<(), SimError> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
