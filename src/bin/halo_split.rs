// src/bin/halo_split.rs
//
// Domain-split consistency check: a random ferromagnetic ring integrated
// with RK4 once as a single domain and once split across several domains
// (one thread each, channel halo exchange). At T = 0 both runs must agree to
// round-off.
//
// Run:
//   cargo run --release --bin halo_split -- 4
//       (argument: number of domains, default 4)
//
// Output:
//   out/halo_split/
//     ├── config.json
//     └── deviation.csv

use std::env;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use atomspin::config::RunConfig;
use atomspin::domain::DomainPartition;
use atomspin::error::SimError;
use atomspin::halo::NoHalo;
use atomspin::noise::NoNoise;
use atomspin::rk4::{step_stochastic_rk4, Rk4Scratch};
use atomspin::runner::DomainRunner;
use atomspin::vec3::{normalize, sub, norm};

fn main() -> Result<(), SimError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let domains: usize = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    // --- benchmark parameters ---
    let atoms = 256;
    let steps = 2000;
    let stride = 200;
    // ----------------------------

    let mut cfg = RunConfig::default_chain();
    cfg.system.atoms = atoms;
    cfg.system.domains = domains;
    cfg.numerics.steps = steps;
    cfg.numerics.output_stride = stride;
    cfg.numerics.temperature = 0.0;
    cfg.run.binary = "halo_split".to_string();
    cfg.run.run_id = format!("halo_split_{domains}");
    cfg.validate()?;

    let out_dir = Path::new("out").join("halo_split");
    create_dir_all(&out_dir)?;
    cfg.write_to_dir(&out_dir)?;

    let sys = &cfg.system;
    let params = cfg.numerics.integration_params();

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.numerics.seed);
    let mut reference = sys.build_state();
    for s in &mut reference.spin {
        *s = normalize([
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ]);
    }
    let mut split = reference.clone();

    let ham = sys.hamiltonian();
    let mut runner = DomainRunner::new(
        &split,
        &sys.owners(),
        domains,
        &ham.neighbours,
        cfg.numerics.seed,
        |d| sys.hamiltonian_over(d.neighbours.clone()),
    )?;

    let partition = DomainPartition::single(atoms);
    let mut scratch = Rk4Scratch::new();
    let mut halo = NoHalo::default();

    let mut w = BufWriter::new(File::create(out_dir.join("deviation.csv"))?);
    writeln!(w, "step,max_deviation")?;

    let mut t_single = 0.0;
    let mut t_split = 0.0;
    let mut done = 0;
    let mut worst: f64 = 0.0;
    while done < steps {
        let chunk = stride.min(steps - done);

        let t0 = Instant::now();
        for _ in 0..chunk {
            step_stochastic_rk4(
                &mut reference,
                &partition,
                &ham,
                &mut halo,
                &mut NoNoise,
                &cfg.materials,
                &params,
                &mut scratch,
            )?;
        }
        t_single += t0.elapsed().as_secs_f64();

        let t0 = Instant::now();
        runner.advance(chunk, &cfg.materials, &params)?;
        t_split += t0.elapsed().as_secs_f64();
        done += chunk;

        runner.gather(&mut split);
        let dev = reference
            .spin
            .iter()
            .zip(&split.spin)
            .map(|(a, b)| norm(sub(*a, *b)))
            .fold(0.0, f64::max);
        worst = worst.max(dev);
        writeln!(w, "{done},{dev:.3e}")?;
        println!("step {done:6}: max |S_single - S_split| = {dev:.3e}");
    }
    w.flush()?;

    println!("{atoms} atoms, {domains} domains, {steps} steps");
    println!("  single domain: {t_single:.3} s");
    println!("  split:         {t_split:.3} s");
    for (rank, t) in runner.wait_times().iter().enumerate() {
        println!("    domain {rank} waited {:.3} ms", t.as_secs_f64() * 1e3);
    }
    println!("worst deviation: {worst:.3e}");
    println!("output: {}", out_dir.display());
    Ok(())
}
