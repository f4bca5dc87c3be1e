//! Command-line runner: load (or synthesize) a landscape, run the
//! simulation, and stream track records to a JSON-lines file.

use anyhow::{Context, Result, bail};
use clap::Parser;
use porpoise_core::{
    BehaviorMode, LandscapeGrid, Simulation, SimulationConfig, TrackRecord, TrackSink,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "porpoise-sim",
    version,
    about = "Individual-based harbor porpoise movement simulation"
)]
struct Cli {
    /// JSON run configuration; built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON landscape dump (depth and food-probability layers, row-major,
    /// null depth = land). A synthetic coastal shelf is used when omitted.
    #[arg(long)]
    landscape: Option<PathBuf>,

    /// Override the RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the tick budget.
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the number of simulated animals.
    #[arg(long)]
    animals: Option<usize>,

    /// Override the behavior mode: markov | crw | memory.
    #[arg(long)]
    mode: Option<String>,

    /// Output JSON-lines track file.
    #[arg(long, default_value = "tracks.jsonl")]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let grid = load_landscape(cli.landscape.as_deref(), config.max_food)?;
    info!(
        width = grid.width(),
        height = grid.height(),
        animals = config.animal_count,
        ticks = config.tick_budget,
        mode = ?config.behavior_mode,
        "starting run",
    );

    let sink = JsonLinesSink::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut simulation =
        Simulation::with_sink(config, grid, Box::new(sink)).context("building simulation")?;
    let summary = simulation.run().context("run aborted")?;

    info!(
        ticks = summary.ticks_completed,
        records = summary.records_emitted,
        fallback_draws = summary.fallback_draws,
        avoidance = summary.avoidance_interventions,
        rollbacks = summary.rollbacks,
        output = %cli.output.display(),
        "run finished",
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(ticks) = cli.ticks {
        config.tick_budget = ticks;
    }
    if let Some(animals) = cli.animals {
        config.animal_count = animals;
    }
    if let Some(mode) = &cli.mode {
        config.behavior_mode = parse_mode(mode)?;
    }
    Ok(config)
}

fn parse_mode(mode: &str) -> Result<BehaviorMode> {
    match mode {
        "markov" => Ok(BehaviorMode::Markov),
        "crw" => Ok(BehaviorMode::CorrelatedRandomWalk),
        "memory" => Ok(BehaviorMode::MemoryAugmented),
        other => bail!("unknown behavior mode '{other}' (markov | crw | memory)"),
    }
}

/// On-disk landscape dump, pre-rasterized by the GIS pipeline.
#[derive(Debug, Deserialize)]
struct LandscapeFile {
    width: u32,
    height: u32,
    #[serde(default)]
    wrap: bool,
    /// Depth per cell, row-major; `null` marks land or missing data.
    depth: Vec<Option<f64>>,
    food_probability: Vec<f64>,
}

fn load_landscape(path: Option<&Path>, max_food: f64) -> Result<LandscapeGrid> {
    let Some(path) = path else {
        return Ok(synthetic_shelf(max_food));
    };
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let parsed: LandscapeFile =
        serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?;
    let depth = parsed
        .depth
        .into_iter()
        .map(|cell| cell.unwrap_or(f64::NAN))
        .collect();
    LandscapeGrid::from_layers(
        parsed.width,
        parsed.height,
        parsed.wrap,
        depth,
        parsed.food_probability,
        max_food,
    )
    .with_context(|| format!("building landscape from {}", path.display()))
}

/// Synthetic bounded coastal shelf: a two-cell land rim, seabed sloping
/// toward the middle, and food patches on a coarse offshore lattice.
fn synthetic_shelf(max_food: f64) -> LandscapeGrid {
    const SIZE: usize = 100;
    let mut depth = vec![f64::NAN; SIZE * SIZE];
    let mut food = vec![0.0; SIZE * SIZE];
    for y in 2..SIZE - 2 {
        for x in 2..SIZE - 2 {
            let toward_center = (x.min(SIZE - 1 - x) + y.min(SIZE - 1 - y)) as f64;
            depth[y * SIZE + x] = 2.0 + toward_center * 0.8;
        }
    }
    for y in (10..SIZE - 10).step_by(12) {
        for x in (10..SIZE - 10).step_by(12) {
            food[y * SIZE + x] = 1.0;
        }
    }
    LandscapeGrid::from_layers(SIZE as u32, SIZE as u32, false, depth, food, max_food)
        .expect("synthetic shelf dimensions are static")
}

/// Streams each track record as one JSON line.
struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl TrackSink for JsonLinesSink {
    fn on_record(&mut self, record: &TrackRecord) {
        let result = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(error) = result {
            warn!(%error, "failed to write track record");
        }
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        if let Err(error) = self.writer.flush() {
            warn!(%error, "failed to flush track file");
        }
    }
}
