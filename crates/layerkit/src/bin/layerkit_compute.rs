//! layerkit-compute - evaluate a layer file and print the computed layer.

use clap::Parser;
use layerkit::logging::init_logging;
use layerkit::model::{Layer, Range};
use layerkit::{Command, Engine, EngineConfig};
use std::path::PathBuf;
use std::process;
use tracing::info;

#[derive(Parser)]
#[command(name = "layerkit-compute")]
#[command(about = "Fetch and style a layer, printing the computed layer as JSON", long_about = None)]
struct Args {
    /// Layer definition (JSON)
    layer: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Additional range to fetch, as x:y:z (repeatable)
    #[arg(long = "range")]
    ranges: Vec<Range>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => EngineConfig::default(),
    };
    if let Err(e) = init_logging(&config.log.filter) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let text = std::fs::read_to_string(&args.layer)
        .unwrap_or_else(|e| fail(format!("reading {}: {e}", args.layer.display())));
    let layer: Layer = serde_json::from_str(&text)
        .unwrap_or_else(|e| fail(format!("parsing {}: {e}", args.layer.display())));
    info!(layer = %layer.id(), "loaded layer");

    let engine = Engine::with_default_fetchers(config).unwrap_or_else(|e| fail(e));
    let handle = engine.spawn_pipeline();

    if let Err(e) = handle.apply(Command::SetLayer(Some(layer))).await {
        fail(e);
    }
    for range in args.ranges {
        if let Err(e) = handle.apply(Command::RequestFetch(range)).await {
            fail(format!("fetching range {range}: {e}"));
        }
    }

    let computed = match handle.settled().await {
        Ok(Some(computed)) => computed,
        Ok(None) => fail("no computed layer"),
        Err(e) => fail(e),
    };
    match serde_json::to_string_pretty(computed.as_ref()) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
    }
    handle.shutdown().await;
}
