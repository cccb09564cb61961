// src/lib.rs

pub mod config;
pub mod domain;
pub mod effective_field;
pub mod ensemble;
pub mod error;
pub mod halo;
pub mod heun;
pub mod neighbours;
pub mod noise;
pub mod observables;
pub mod params;
pub mod rk4;
pub mod runner;
pub mod spin_update;
pub mod spinlattice;
pub mod vec3;
pub mod visualisation;
