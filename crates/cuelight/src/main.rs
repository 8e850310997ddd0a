//! cuelight: per-LED lighting control for RGB peripherals behind a lighting host.

use std::path::PathBuf;

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "cuelight",
    version,
    about = "Per-LED lighting control for RGB peripherals behind a lighting host"
)]
struct Args {
    /// Output as JSON (for devices, leds, set, symbol, status, config)
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Host profile (TOML) to run against; overrides `host_profile` from the config
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let opts = cli::GlobalOpts {
        json: args.json,
        profile: args.profile,
        config: args.config,
    };

    if let Err(e) = cli::run(args.command, &opts) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
