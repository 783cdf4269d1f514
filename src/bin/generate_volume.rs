//! Volume generator binary: fills a grid of noise chunks and reports stats.
//!
//! Usage: cargo run --release --bin generate_volume -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>    Generation config JSON (flags below override it)
//!   --seed <SEED>      Noise seed (default: 0)
//!   --radius <N>       Chunks span -N..N per axis (default: 2)
//!   --depth <D>        Chunk root depth, extent 2^D (default: 6)
//!   --capacity <N>     Arena slots per chunk (default: 32768)
//!   --jobs <N>         Max parallel chunk builds (default: all cores)
//!   --dump <X,Y,Z>     Print the tree of one chunk
//!   --manifest <PATH>  Write per-chunk statistics as JSON

use std::path::PathBuf;
use std::time::Instant;

use glam::IVec3;
use serde_json::json;

use voct::generation::{build_chunks, GenerationConfig, NoiseOccupancy};

fn main() {
    voct::core::logging::init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => GenerationConfig::load(&PathBuf::from(path)).expect("Failed to load config"),
        None => GenerationConfig::default(),
    };
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = seed;
    }
    if let Some(radius) = parse_u32_arg(&args, "--radius") {
        config.chunk_radius = radius as i32;
    }
    if let Some(depth) = parse_u32_arg(&args, "--depth") {
        config.volume.root_depth = depth.min(u8::MAX as u32) as u8;
    }
    if let Some(capacity) = parse_usize_arg(&args, "--capacity") {
        config.volume.arena_capacity = capacity;
    }
    if let Err(err) = config.validate() {
        eprintln!("{}", err);
        std::process::exit(2);
    }

    if let Some(jobs) = parse_usize_arg(&args, "--jobs") {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .expect("Failed to configure thread pool");
    }

    let coords = config.chunk_coords();
    println!("=== Voct Volume Generator ===");
    println!("Seed:     {}", config.seed);
    println!("Chunks:   {} ({}^3 voxels each)", coords.len(), config.volume.extent());
    println!("Arena:    {} slots per chunk", config.volume.arena_capacity);
    println!();

    let source = NoiseOccupancy::from_config(&config);
    let start = Instant::now();
    let chunks = build_chunks(&coords, &source, &config.volume).expect("Chunk generation failed");
    let elapsed = start.elapsed();

    let mut leaves = 0;
    let mut hidden = 0;
    let mut evictions = 0;
    let mut merges = 0;
    for chunk in &chunks {
        let stats = chunk.volume.stats();
        leaves += chunk.volume.len();
        hidden += stats.hidden;
        evictions += stats.evictions;
        merges += stats.run_merges;
    }
    let visible: usize = chunks.iter().map(|chunk| chunk.visible_instances().len()).sum();

    println!("Built in {:.1}s", elapsed.as_secs_f64());
    println!("Leaves:    {}", leaves);
    println!("Visible:   {} ({} hidden at classification)", visible, hidden);
    println!("Merges:    {}", merges);
    println!("Evictions: {}", evictions);

    if let Some(target) = parse_coord_arg(&args, "--dump") {
        match chunks.iter().find(|chunk| chunk.coord == target) {
            Some(chunk) => print!("{}", chunk.volume.dump_tree()),
            None => eprintln!("Chunk {:?} is outside the grid", target),
        }
    }

    if let Some(path) = parse_str_arg(&args, "--manifest") {
        let manifest = json!({
            "seed": config.seed,
            "volume": config.volume,
            "chunks": chunks.iter().map(|chunk| {
                let stats = chunk.volume.stats();
                json!({
                    "coord": [chunk.coord.x, chunk.coord.y, chunk.coord.z],
                    "leaves": chunk.volume.len(),
                    "inserts": stats.inserts,
                    "evictions": stats.evictions,
                    "compactions": stats.compactions,
                    "run_merges": stats.run_merges,
                    "hidden": stats.hidden,
                })
            }).collect::<Vec<_>>(),
        });
        let json = serde_json::to_string_pretty(&manifest).expect("Failed to encode manifest");
        std::fs::write(&path, json).expect("Failed to write manifest");
        println!("Manifest: {}", path);
    }
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_coord_arg(args: &[String], flag: &str) -> Option<IVec3> {
    let value = parse_str_arg(args, flag)?;
    let parts: Vec<i32> = value.split(',').map(|s| s.trim().parse().ok()).collect::<Option<_>>()?;
    match parts[..] {
        [x, y, z] => Some(IVec3::new(x, y, z)),
        _ => None,
    }
}
