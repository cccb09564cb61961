// src/bin/macrospin_precession.rs
//
// Single-spin precession benchmark: one atom, uniform B_ext along +z, no
// damping, small tilt. RK4 is compared against the analytic rotation
//   S(t) = (sin θ cos ωt, sin θ sin ωt, cos θ),  ω = γ B
// for a ladder of time steps; the error should fall ~16x per halving.
//
// Run:
//   cargo run --release --bin macrospin_precession
//
// Output:
//   out/macrospin_precession/
//     ├── config.json
//     ├── convergence.csv
//     └── trajectory.csv      (finest dt)

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use atomspin::config::RunConfig;
use atomspin::domain::DomainPartition;
use atomspin::error::SimError;
use atomspin::halo::NoHalo;
use atomspin::noise::NoNoise;
use atomspin::params::{IntegrationParams, Material, MaterialTable};
use atomspin::rk4::{step_stochastic_rk4, Rk4Scratch};

/// Integrate one period and return (max error, trajectory).
fn precess(cfg: &RunConfig, dt: f64, t_total: f64) -> Result<(f64, Vec<[f64; 4]>), SimError> {
    let sys = &cfg.system;
    let material = cfg.materials.get(0);
    let omega = material.gamma * sys.b_ext[2];
    let s0 = sys.build_state().spin[0];
    let sin_theta = s0[0];
    let cos_theta = s0[2];

    let mut state = sys.build_state();
    let ham = sys.hamiltonian();
    let partition = DomainPartition::single(1);
    let params = IntegrationParams {
        dt,
        temperature: 0.0,
        equilibration_time: 0.0,
    };
    let mut scratch = Rk4Scratch::new();
    let mut halo = NoHalo::default();

    let n_steps = (t_total / dt).round() as usize;
    let mut max_err: f64 = 0.0;
    let mut traj = Vec::with_capacity(n_steps + 1);
    traj.push([0.0, s0[0], s0[1], s0[2]]);

    for step in 1..=n_steps {
        step_stochastic_rk4(
            &mut state,
            &partition,
            &ham,
            &mut halo,
            &mut NoNoise,
            &cfg.materials,
            &params,
            &mut scratch,
        )?;
        let t = step as f64 * dt;
        let exact = [
            sin_theta * (omega * t).cos(),
            sin_theta * (omega * t).sin(),
            cos_theta,
        ];
        let s = state.spin[0];
        let err = ((s[0] - exact[0]).powi(2) + (s[1] - exact[1]).powi(2) + (s[2] - exact[2]).powi(2)).sqrt();
        max_err = max_err.max(err);
        traj.push([t, s[0], s[1], s[2]]);
    }
    Ok((max_err, traj))
}

fn main() -> Result<(), SimError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // --- benchmark parameters ---
    let b0 = 1.0_f64; // Tesla
    let theta_deg = 10.0_f64;
    let dts = [4e-13, 2e-13, 1e-13, 5e-14];
    // ----------------------------

    let theta = theta_deg.to_radians();
    let mut cfg = RunConfig::default_chain();
    cfg.system.atoms = 1;
    cfg.system.periodic = false;
    cfg.system.exchange = 0.0;
    cfg.system.b_ext = [0.0, 0.0, b0];
    cfg.system.initial_spin = [theta.sin(), 0.0, theta.cos()];
    cfg.materials = MaterialTable::new(vec![Material {
        name: "macrospin".to_string(),
        ..Default::default()
    }])?;
    cfg.numerics.dt = dts[dts.len() - 1];
    cfg.run.binary = "macrospin_precession".to_string();
    cfg.run.run_id = "macrospin_precession".to_string();

    let omega = cfg.materials.get(0).gamma * b0;
    let period = 2.0 * std::f64::consts::PI / omega;

    let out_dir = Path::new("out").join("macrospin_precession");
    create_dir_all(&out_dir)?;
    cfg.write_to_dir(&out_dir)?;

    let mut conv = BufWriter::new(File::create(out_dir.join("convergence.csv"))?);
    writeln!(conv, "dt_s,steps,max_err,ratio")?;

    println!("period = {period:.6e} s");
    let mut prev: Option<f64> = None;
    let mut finest = Vec::new();
    for &dt in &dts {
        let (err, traj) = precess(&cfg, dt, period)?;
        let ratio = prev.map(|p| p / err).unwrap_or(f64::NAN);
        println!("dt = {dt:.2e} s  steps = {:6}  max |S - S_exact| = {err:.3e}  ratio = {ratio:.2}", traj.len() - 1);
        writeln!(conv, "{dt:.6e},{},{err:.9e},{ratio:.6}", traj.len() - 1)?;
        prev = Some(err);
        finest = traj;
    }
    conv.flush()?;

    let mut w = BufWriter::new(File::create(out_dir.join("trajectory.csv"))?);
    writeln!(w, "t_s,sx,sy,sz")?;
    for [t, x, y, z] in finest {
        writeln!(w, "{t:.9e},{x:.12},{y:.12},{z:.12}")?;
    }
    w.flush()?;

    println!("output: {}", out_dir.display());
    Ok(())
}
