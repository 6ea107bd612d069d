//! Benchmark the geometry setup engine on random triangle batches.
//!
//! Run with: cargo run --release --features tools --bin bench_geom_setup
//!
//! Usage:
//!   bench_geom_setup                 Run default size (100k triangles)
//!   bench_geom_setup 10k 1m          Run multiple sizes
//!   bench_geom_setup --merge         Write accepted triangles into the dense stream
//!   bench_geom_setup -t 4 -n 20      4 workers, 20 iterations
//!
//! For per-phase timing, add `--features timing` and set `RUST_LOG=debug`
//! with a logger of your choice.

use clap::Parser;
use geom_setup::validation::validate_setup;
use geom_setup::{
    CullMode, GeomSetupConfig, GeomSetupEngine, PassThroughPolicy, SetupContext, VsOutput,
};
use glam::Vec4;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('m') {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('k') {
        (n, 1_000)
    } else {
        (s.as_str(), 1)
    };

    num_str
        .parse::<f64>()
        .map(|n| (n * multiplier as f64) as usize)
        .map_err(|e| format!("Invalid number '{}': {}", s, e))
}

fn parse_cull(s: &str) -> Result<CullMode, String> {
    match s.to_lowercase().as_str() {
        "none" => Ok(CullMode::None),
        "front" => Ok(CullMode::Front),
        "back" => Ok(CullMode::Back),
        other => Err(format!("Invalid cull mode '{}'", other)),
    }
}

/// Random triangles in a box around the view volume. `spread` > 1 pushes more
/// of them across the guard band and depth planes.
fn random_triangles<R: Rng>(count: usize, spread: f32, rng: &mut R) -> Vec<VsOutput> {
    (0..count)
        .flat_map(|_| {
            let cx: f32 = rng.gen_range(-spread..spread);
            let cy: f32 = rng.gen_range(-spread..spread);
            let cz: f32 = rng.gen_range(-0.5 * spread..0.5 + 0.5 * spread);
            let size: f32 = rng.gen_range(0.01..0.3);
            let corner = |rng: &mut R| {
                let w: f32 = rng.gen_range(0.5..2.0);
                let p = Vec4::new(
                    cx + rng.gen_range(-size..size),
                    cy + rng.gen_range(-size..size),
                    cz + rng.gen_range(-size..size),
                    1.0,
                ) * w;
                VsOutput::with_attributes(p, &[Vec4::new(cx, cy, cz, 1.0)])
            };
            [corner(&mut *rng), corner(&mut *rng), corner(&mut *rng)]
        })
        .collect()
}

#[derive(Parser, Debug)]
#[command(name = "bench_geom_setup")]
#[command(about = "Benchmark guard-band clipping and compaction")]
struct Args {
    /// Triangle counts (e.g., 100k, 1m)
    #[arg(value_parser = parse_count)]
    sizes: Vec<usize>,

    /// Iterations per size
    #[arg(short = 'n', long, default_value = "10")]
    iterations: usize,

    /// Worker threads (default: all hardware threads)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Primitives per clip package
    #[arg(long, default_value = "8")]
    clip_package: usize,

    /// Clip packages per compaction package
    #[arg(long, default_value = "8")]
    compact_package: usize,

    /// Scene extent relative to the view volume
    #[arg(long, default_value = "1.5")]
    spread: f32,

    /// Face culling: none, front or back
    #[arg(long, default_value = "none", value_parser = parse_cull)]
    cull: CullMode,

    /// Write accepted triangles into the dense stream
    #[arg(long)]
    merge: bool,

    /// Validate the output after the last iteration
    #[arg(long)]
    validate: bool,

    /// RNG seed
    #[arg(long, default_value = "12345")]
    seed: u64,
}

fn main() {
    let args = Args::parse();
    let sizes = if args.sizes.is_empty() {
        vec![100_000]
    } else {
        args.sizes.clone()
    };

    let config = GeomSetupConfig {
        clip_package_size: args.clip_package,
        compact_package_size: args.compact_package,
        pass_through: if args.merge {
            PassThroughPolicy::Merge
        } else {
            PassThroughPolicy::Separate
        },
        worker_threads: args.threads,
        ..Default::default()
    };

    let mut engine = match GeomSetupEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };
    println!("workers: {}", engine.num_workers());

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    for &count in &sizes {
        let vertices = random_triangles(count, args.spread, &mut rng);
        let ctx = SetupContext::triangles(&vertices).with_cull(args.cull);

        let mut best = f64::INFINITY;
        let mut total = 0.0;
        let mut last = None;
        for _ in 0..args.iterations.max(1) {
            let t0 = Instant::now();
            let stats = match engine.execute(&ctx) {
                Ok(stats) => stats,
                Err(e) => {
                    eprintln!("error: {}", e);
                    std::process::exit(1);
                }
            };
            let ms = t0.elapsed().as_secs_f64() * 1000.0;
            best = best.min(ms);
            total += ms;
            last = Some(stats);
        }
        let mean = total / args.iterations.max(1) as f64;

        println!(
            "{:>9} tris: best {:>8.3} ms, mean {:>8.3} ms ({:.1} Mtri/s)",
            count,
            best,
            mean,
            count as f64 / best / 1000.0
        );
        if let Some(s) = last {
            println!(
                "           rejected {} accepted {} clipped {} culled {} -> {} verts, {} pass-through",
                s.rejected,
                s.accepted,
                s.clip_invocations,
                s.culled,
                s.vertex_count,
                s.pass_through_count
            );
        }

        if args.validate {
            let report = validate_setup(&engine, &vertices);
            println!("           {}", report);
            if !report.is_valid() {
                std::process::exit(1);
            }
        }
    }
}
