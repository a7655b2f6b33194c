use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hex_climate::config::GeneratorConfig;
use hex_climate::generator::{build_pipeline, World};
use hex_climate::island::{generate_island, IslandParams};
use hex_climate::mesh::HexMesh;
use hex_climate::Result;

#[derive(Parser, Debug)]
#[command(name = "hex_climate")]
#[command(about = "Generate wind, humidity, rivers and biomes over a hex island")]
struct Args {
    /// JSON configuration file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// World width in pixels
    #[arg(short = 'W', long)]
    width: Option<f64>,

    /// World height in pixels
    #[arg(short = 'H', long)]
    height: Option<f64>,

    /// Prevailing wind bearing in degrees (0 = east, 90 = south)
    #[arg(long)]
    wind_bearing: Option<f64>,

    /// Prevailing wind strength
    #[arg(long)]
    wind_strength: Option<f64>,

    /// Print the final summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hex_climate=info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(width) = args.width {
        config.mesh.world_width = width;
    }
    if let Some(height) = args.height {
        config.mesh.world_height = height;
    }
    if let Some(bearing) = args.wind_bearing {
        config.wind.bearing = bearing;
    }
    if let Some(strength) = args.wind_strength {
        config.wind.strength = strength;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!("Generating island with seed: {}", seed);

    let mut mesh = HexMesh::from_params(&config.mesh)?;
    let (min_h, max_h) = generate_island(&mut mesh, seed, &IslandParams::default());
    tracing::info!("Heightmap range: {:.1}m to {:.1}m over {} cells", min_h, max_h, mesh.len());

    let mut driver = build_pipeline(&config)?;
    let mut world = World::new(mesh, config);
    while driver.can_advance() {
        let event = driver.tick(&mut world)?;
        if !event.will_repeat {
            tracing::debug!("{} done after {} attempt(s): {}", event.name, event.attempt_number, event.output);
        }
    }

    let summary = world.summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Seed: {}", seed);
    println!(
        "Cells: {} ({} land, {} ocean)",
        summary.cells, summary.land, summary.ocean
    );
    println!("Mean humidity: {:.3}", summary.mean_humidity);
    println!(
        "Found {} pools, {} river cells (largest carries {:.2})",
        summary.pools, summary.rivers, summary.largest_river
    );
    println!("Biomes:");
    for (name, count) in &summary.biomes {
        println!("  {:<28} {}", name, count);
    }
    Ok(())
}
