use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use serde::de::DeserializeOwned;
use snake_2048::expectimax::{ExpectimaxConfig, MoveSelector, Weights};
use snake_2048::session::{drive, SelfPlay};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Play a local game of 2048 with the expectimax selector.
#[derive(Parser)]
struct Args {
    /// Seed for tile spawns and the fallback move picker (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many moves
    #[arg(long)]
    max_moves: Option<u64>,
    /// JSON file overriding heuristic weights
    #[arg(long)]
    weights: Option<PathBuf>,
    /// JSON file overriding search configuration (budgets, cache)
    #[arg(long)]
    config: Option<PathBuf>,
    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    initialize_logging(args.log_level);

    let weights: Weights = args.weights.as_deref().map(load_json).transpose()?.unwrap_or_default();
    let cfg: ExpectimaxConfig = args.config.as_deref().map(load_json).transpose()?.unwrap_or_default();

    let (game_rng, pick_rng) = match args.seed {
        Some(seed) => (StdRng::seed_from_u64(seed), StdRng::seed_from_u64(seed.wrapping_add(1))),
        None => (StdRng::from_entropy(), StdRng::from_entropy()),
    };
    let mut selector = MoveSelector::with_rng(cfg, weights, pick_rng);
    let mut game = SelfPlay::new(game_rng);
    println!("{}", game.board());

    let summary = drive(&mut game, &mut selector, args.max_moves).context("self-play session failed")?;

    println!("{}", game.board());
    println!(
        "Moves made: {}, Score: {}, Highest tile: {}, Stopped: {:?}",
        summary.moves,
        game.score(),
        game.board().highest_tile(),
        summary.outcome
    );
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
