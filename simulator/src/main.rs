use std::path::PathBuf;

use clap::Parser;
use simulator::config::{load_config, save_config, Overrides};
use surface::BackendKind;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// RON file holding the simulator settings
    #[arg(short, long, default_value = "simulator.ron")]
    config: PathBuf,

    /// Stop after this many ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    #[arg(short, long)]
    grid_size: Option<usize>,

    /// direct or batched
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Seed for the rain generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Snapshot restored at startup (if it exists) and written at exit
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    write_config: bool,
}

fn main() {
    let args = Args::parse();

    let mut config = match load_config(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: could not read {}: {err}", args.config.display());
            std::process::exit(1);
        }
    };

    Overrides {
        max_ticks: args.ticks,
        grid_size: args.grid_size,
        backend: args.backend,
        seed: args.seed,
        snapshot_path: args.snapshot,
    }
    .apply(&mut config);

    if let Err(err) = config.validate() {
        eprintln!("Error: invalid settings in {}: {err}", args.config.display());
        std::process::exit(1);
    }

    if args.write_config {
        if let Err(err) = save_config(&config, &args.config) {
            eprintln!("Error: could not write {}: {err}", args.config.display());
            std::process::exit(1);
        }
        return;
    }

    simulator::init::init(config);
}
