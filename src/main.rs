// src/main.rs
//
// Exploratory driver: integrates a spin chain (or a spin-lattice chain) with
// the chosen integrator and writes a small run directory.
//
// Benchmarks with a fixed setup live under `src/bin/*`.
//
// Examples:
//
//   cargo run --release -- --integrator rk4 --domains 2 --steps 5000
//       -> default 8-atom ring, two domains on two threads
//
//   cargo run --release -- --config run.json --temperature 300 --seed 4
//       -> configuration from JSON with a few overrides
//
//   RUST_LOG=debug cargo run -- --integrator suzuki-trotter --steps 10
//       -> per-step logging from the integrators
//
// Outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json          (effective configuration)
//     ├── observables.csv
//     ├── m_avg.png
//     └── temperatures.png

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;

use atomspin::config::{Integrator, RunConfig};
use atomspin::effective_field::FieldAccumulator;
use atomspin::ensemble::EnsembleState;
use atomspin::error::SimError;
use atomspin::heun::{step_stochastic_heun, HeunScratch};
use atomspin::noise::GaussianNoise;
use atomspin::observables::{
    lattice_temperature, mean_magnetisation, spin_length_stats, spin_temperature, SpinLengthStats,
};
use atomspin::params::MaterialTable;
use atomspin::runner::DomainRunner;
use atomspin::spinlattice::{step_suzuki_trotter, SpinLatticeField, SuzukiTrotterScratch};
use atomspin::visualisation::{save_m_avg_plot, save_temperature_plot};

#[derive(Parser, Debug)]
#[command(name = "atomspin", version, about = "Stochastic atomistic spin / spin-lattice dynamics")]
struct Cli {
    /// JSON run configuration (default: built-in 8-atom ring)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// rk4 | heun | suzuki-trotter
    #[arg(short, long)]
    integrator: Option<String>,

    #[arg(long)]
    steps: Option<usize>,

    /// time step (s)
    #[arg(long)]
    dt: Option<f64>,

    /// steps between samples
    #[arg(long)]
    stride: Option<usize>,

    /// bath temperature (K)
    #[arg(short = 'T', long)]
    temperature: Option<f64>,

    /// equilibration window (s)
    #[arg(long)]
    equilibration_time: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// RK4 domains, one thread each
    #[arg(long)]
    domains: Option<usize>,

    /// output root
    #[arg(long, default_value = "runs")]
    out: PathBuf,

    #[arg(long)]
    run_id: Option<String>,

    /// skip PNG output
    #[arg(long)]
    no_plots: bool,
}

impl Cli {
    fn apply(&self, cfg: &mut RunConfig) {
        if let Some(v) = &self.integrator {
            cfg.numerics.integrator = v.clone();
        }
        if let Some(v) = self.steps {
            cfg.numerics.steps = v;
        }
        if let Some(v) = self.dt {
            cfg.numerics.dt = v;
        }
        if let Some(v) = self.stride {
            cfg.numerics.output_stride = v;
        }
        if let Some(v) = self.temperature {
            cfg.numerics.temperature = v;
        }
        if let Some(v) = self.equilibration_time {
            cfg.numerics.equilibration_time = v;
        }
        if let Some(v) = self.seed {
            cfg.numerics.seed = v;
        }
        if let Some(v) = self.domains {
            cfg.system.domains = v;
        }
    }
}

/// One row of `observables.csv`.
#[derive(Debug, Clone, Copy)]
struct Sample {
    time: f64,
    m: [f64; 3],
    length: SpinLengthStats,
    t_lattice: f64,
    t_spin: f64,
}

fn sample(time: f64, state: &EnsembleState, fields: &[[f64; 3]], materials: &MaterialTable) -> Sample {
    let n = state.num_atoms();
    Sample {
        time,
        m: mean_magnetisation(&state.spin),
        length: spin_length_stats(&state.spin),
        t_lattice: lattice_temperature(state, materials, n),
        t_spin: spin_temperature(state, fields, materials, n),
    }
}

/// Total spin Hamiltonian field (spin-dependent + external) on every atom.
fn total_fields<F: FieldAccumulator + ?Sized>(fields: &F, state: &EnsembleState, out: &mut Vec<[f64; 3]>) {
    let n = state.num_atoms();
    out.resize(n, [0.0; 3]);
    let mut ext = vec![[0.0; 3]; n];
    fields.spin_fields(0..n, state, out);
    fields.external_fields(0..n, state, &mut ext);
    for (h, e) in out.iter_mut().zip(&ext) {
        for k in 0..3 {
            h[k] += e[k];
        }
    }
}

fn run_rk4(cfg: &RunConfig) -> Result<Vec<Sample>, SimError> {
    let sys = &cfg.system;
    let num = &cfg.numerics;
    let params = num.integration_params();
    let mut global = sys.build_state();
    let ham = sys.hamiltonian();

    let mut runner = DomainRunner::new(
        &global,
        &sys.owners(),
        sys.domains,
        &ham.neighbours,
        num.seed,
        |d| sys.hamiltonian_over(d.neighbours.clone()),
    )?;

    let mut h = Vec::new();
    total_fields(&ham, &global, &mut h);
    let mut samples = vec![sample(0.0, &global, &h, &cfg.materials)];

    let mut done = 0;
    while done < num.steps {
        let chunk = num.output_stride.min(num.steps - done);
        runner.advance(chunk, &cfg.materials, &params)?;
        done += chunk;

        runner.gather(&mut global);
        total_fields(&ham, &global, &mut h);
        samples.push(sample(done as f64 * params.dt, &global, &h, &cfg.materials));
    }

    for (rank, w) in runner.wait_times().iter().enumerate() {
        log::info!("domain {rank}: {:.3} ms waiting on halo data", w.as_secs_f64() * 1e3);
    }
    Ok(samples)
}

fn run_heun(cfg: &RunConfig) -> Vec<Sample> {
    let num = &cfg.numerics;
    let params = num.integration_params();
    let mut state = cfg.system.build_state();
    let ham = cfg.system.hamiltonian();
    let mut noise = GaussianNoise::seeded(num.seed);
    let mut scratch = HeunScratch::new();

    let mut h = Vec::new();
    total_fields(&ham, &state, &mut h);
    let mut samples = vec![sample(0.0, &state, &h, &cfg.materials)];

    for step in 1..=num.steps {
        step_stochastic_heun(&mut state, &ham, &mut noise, &cfg.materials, &params, &mut scratch);
        if step % num.output_stride == 0 || step == num.steps {
            total_fields(&ham, &state, &mut h);
            samples.push(sample(step as f64 * params.dt, &state, &h, &cfg.materials));
        }
    }
    samples
}

fn run_suzuki_trotter(cfg: &RunConfig) -> Result<Vec<Sample>, SimError> {
    let num = &cfg.numerics;
    let params = num.integration_params();
    let mut state = cfg.system.build_state();
    let sl = cfg.system.spin_lattice(params.equilibration_time, &cfg.materials)?;
    let mut noise = GaussianNoise::seeded(num.seed);
    let mut scratch = SuzukiTrotterScratch::new();
    let n = state.num_atoms();

    let mut h = vec![[0.0; 3]; n];
    sl.spin_fields(0..n, &state, 0.0, &mut h);
    let mut samples = vec![sample(0.0, &state, &h, &cfg.materials)];

    for step in 1..=num.steps {
        let time = (step - 1) as f64 * params.dt;
        step_suzuki_trotter(&mut state, &sl, &mut noise, &cfg.materials, &params, time, &mut scratch);
        if step % num.output_stride == 0 || step == num.steps {
            let t = step as f64 * params.dt;
            sl.spin_fields(0..n, &state, t, &mut h);
            samples.push(sample(t, &state, &h, &cfg.materials));
        }
    }
    log::info!("final pair potential energy: {:.6e} eV", scratch.potential_energy());
    Ok(samples)
}

fn write_table(path: &Path, samples: &[Sample]) -> Result<(), SimError> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "t_s,mx,my,mz,len_mean,len_min,len_max,t_lattice_k,t_spin_k")?;
    for s in samples {
        writeln!(
            w,
            "{:.9e},{:.9},{:.9},{:.9},{:.9},{:.9},{:.9},{:.6},{:.6}",
            s.time, s.m[0], s.m[1], s.m[2], s.length.mean, s.length.min, s.length.max, s.t_lattice, s.t_spin
        )?;
    }
    w.flush()?;
    Ok(())
}

fn save_plots(out_dir: &Path, samples: &[Sample], bath: f64) {
    let t: Vec<f64> = samples.iter().map(|s| s.time).collect();
    let comp = |k: usize| -> Vec<f64> { samples.iter().map(|s| s.m[k]).collect() };
    let path = out_dir.join("m_avg.png");
    if let Err(e) = save_m_avg_plot(&t, &comp(0), &comp(1), &comp(2), &path.to_string_lossy()) {
        log::warn!("could not write {}: {e}", path.display());
    }

    let t_lat: Vec<f64> = samples.iter().map(|s| s.t_lattice).collect();
    let t_spin: Vec<f64> = samples.iter().map(|s| s.t_spin).collect();
    let path = out_dir.join("temperatures.png");
    if let Err(e) = save_temperature_plot(&t, &t_lat, &t_spin, bath, &path.to_string_lossy()) {
        log::warn!("could not write {}: {e}", path.display());
    }
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id(integrator: Integrator) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}{:03}_{}", now.as_secs(), now.subsec_millis(), integrator.as_str())
}

fn unique_run_dir(out_root: &Path, run_id: &str) -> PathBuf {
    let mut dir = out_root.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = out_root.join(format!("{run_id}_{k}"));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

fn run(cli: Cli) -> Result<(), SimError> {
    let mut cfg = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default_chain(),
    };
    cli.apply(&mut cfg);
    cfg.validate()?;
    let integrator = cfg.numerics.integrator()?;

    let run_id = sanitize_run_id(&cli.run_id.clone().unwrap_or_else(|| default_run_id(integrator)));
    let out_dir = unique_run_dir(&cli.out, &run_id);
    create_dir_all(&out_dir)?;
    cfg.run.binary = "atomspin".to_string();
    cfg.run.run_id = run_id;
    cfg.write_to_dir(&out_dir)?;

    log::info!(
        "{} atoms, integrator {integrator}, {} steps of {:e} s at {} K -> {}",
        cfg.system.atoms,
        cfg.numerics.steps,
        cfg.numerics.dt,
        cfg.numerics.temperature,
        out_dir.display()
    );

    let t0 = Instant::now();
    let samples = match integrator {
        Integrator::Rk4 => run_rk4(&cfg)?,
        Integrator::Heun => {
            if cfg.system.domains > 1 {
                log::warn!("heun is single-process; ignoring domains = {}", cfg.system.domains);
            }
            run_heun(&cfg)
        }
        Integrator::SuzukiTrotter => run_suzuki_trotter(&cfg)?,
    };
    let elapsed = t0.elapsed();

    write_table(&out_dir.join("observables.csv"), &samples)?;
    if !cli.no_plots {
        save_plots(&out_dir, &samples, cfg.numerics.temperature);
    }

    if let Some(last) = samples.last() {
        println!(
            "done in {:.2} s: <S> = ({:.5}, {:.5}, {:.5}), T_spin = {:.2} K, T_lattice = {:.2} K",
            elapsed.as_secs_f64(),
            last.m[0],
            last.m[1],
            last.m[2],
            last.t_spin,
            last.t_lattice
        );
    }
    println!("output: {}", out_dir.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
