// src/params.rs

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Boltzmann constant (J/K).
pub const KB_J_PER_K: f64 = 1.380_650_3e-23;

/// Boltzmann constant (eV/K), used with lattice energies in eV.
pub const KB_EV_PER_K: f64 = 8.617_333_262e-5;

/// Electron gyromagnetic ratio (rad / (s T)).
pub const GAMMA_E_RAD_PER_S_T: f64 = 1.760_859_630_23e11;

/// Bohr magneton (J/T).
pub const MU_B_J_PER_T: f64 = 9.274_009_994e-24;

/// Lattice quantities are integrated in picoseconds.
pub const SECONDS_TO_PS: f64 = 1e12;

/// Longitudinal spin fluctuation (Landau expansion) coefficients, in J.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LsfCoefficients {
    pub second: f64,
    pub fourth: f64,
    pub sixth: f64,
}

/// Per-species constants read by the integrators.
///
/// `*_eq` variants are used while the simulation time is inside the
/// equilibration window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub name: String,
    /// gyromagnetic ratio (rad / (s T))
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Gilbert damping (production)
    pub alpha: f64,
    /// Gilbert damping during equilibration
    #[serde(default)]
    pub alpha_eq: f64,
    /// magnetic moment (J/T)
    pub mu_s: f64,
    /// atomic mass (eV ps^2 / Å^2)
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// lattice damping (1/ps)
    #[serde(default)]
    pub damp_lat: f64,
    #[serde(default)]
    pub damp_lat_eq: f64,
    /// spin thermal-field sigma per sqrt(K)
    #[serde(default)]
    pub h_th_sigma: f64,
    #[serde(default)]
    pub h_th_sigma_eq: f64,
    /// lattice thermal-force sigma per sqrt(K)
    #[serde(default)]
    pub f_th_sigma: f64,
    #[serde(default)]
    pub f_th_sigma_eq: f64,
    #[serde(default)]
    pub lsf: Option<LsfCoefficients>,
}

fn default_gamma() -> f64 {
    GAMMA_E_RAD_PER_S_T
}

fn default_mass() -> f64 {
    1.0
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            gamma: GAMMA_E_RAD_PER_S_T,
            alpha: 0.0,
            alpha_eq: 0.0,
            mu_s: MU_B_J_PER_T,
            mass: 1.0,
            damp_lat: 0.0,
            damp_lat_eq: 0.0,
            h_th_sigma: 0.0,
            h_th_sigma_eq: 0.0,
            f_th_sigma: 0.0,
            f_th_sigma_eq: 0.0,
            lsf: None,
        }
    }
}

/// Which coefficient set the stochastic terms use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Equilibration,
    Production,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equilibration => "equilibration",
            Self::Production => "production",
        }
    }
}

impl Material {
    /// (damping, spin-noise sigma per sqrt(K)) for the given phase.
    #[inline]
    pub fn spin_bath(&self, phase: Phase) -> (f64, f64) {
        match phase {
            Phase::Equilibration => (self.alpha_eq, self.h_th_sigma_eq),
            Phase::Production => (self.alpha, self.h_th_sigma),
        }
    }

    /// (lattice damping, force-noise sigma per sqrt(K)) for the given phase.
    #[inline]
    pub fn lattice_bath(&self, phase: Phase) -> (f64, f64) {
        match phase {
            Phase::Equilibration => (self.damp_lat_eq, self.f_th_sigma_eq),
            Phase::Production => (self.damp_lat, self.f_th_sigma),
        }
    }

    fn check(&self, index: usize) -> Result<(), SimError> {
        let bad = |reason: &str| SimError::InvalidMaterial {
            index,
            reason: reason.to_string(),
        };
        let all = [
            self.gamma,
            self.alpha,
            self.alpha_eq,
            self.mu_s,
            self.mass,
            self.damp_lat,
            self.damp_lat_eq,
            self.h_th_sigma,
            self.h_th_sigma_eq,
            self.f_th_sigma,
            self.f_th_sigma_eq,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(bad("non-finite constant"));
        }
        if self.mu_s <= 0.0 {
            return Err(bad("magnetic moment must be positive"));
        }
        if self.mass <= 0.0 {
            return Err(bad("mass must be positive"));
        }
        if self.alpha < 0.0 || self.alpha_eq < 0.0 {
            return Err(bad("damping must be non-negative"));
        }
        if self.h_th_sigma < 0.0
            || self.h_th_sigma_eq < 0.0
            || self.f_th_sigma < 0.0
            || self.f_th_sigma_eq < 0.0
        {
            return Err(bad("noise sigma must be non-negative"));
        }
        Ok(())
    }
}

/// Read-only table of materials, indexed by `EnsembleState::material`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new(materials: Vec<Material>) -> Result<Self, SimError> {
        for (i, m) in materials.iter().enumerate() {
            m.check(i)?;
        }
        Ok(Self { materials })
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }
}

/// Step-level numerics shared by every integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationParams {
    /// time step (s)
    pub dt: f64,
    /// bath temperature (K)
    pub temperature: f64,
    /// length of the equilibration window (s)
    #[serde(default)]
    pub equilibration_time: f64,
}

impl IntegrationParams {
    /// Equilibration coefficients apply strictly before `equilibration_time`.
    #[inline]
    pub fn phase_at(&self, time: f64) -> Phase {
        if time < self.equilibration_time {
            Phase::Equilibration
        } else {
            Phase::Production
        }
    }
}
