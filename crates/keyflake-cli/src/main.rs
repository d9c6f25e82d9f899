#![doc = include_str!("../README.md")]

mod command;
mod config;
mod output;
mod telemetry;

use clap::Parser;
use config::{CliArgs, Command, GenerateConfig};

// Using mimalloc for better performance when many threads share a generator.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    telemetry::init_tracing()?;

    let mut out = command::stdout();
    match args.into_command() {
        Command::Generate(args) => {
            let config = GenerateConfig::try_from(args)?;
            if cfg!(debug_assertions) {
                tracing::debug!("Generating with full config: {:#?}", config);
            }
            command::generate(&config, &mut out)
        }
        Command::Inspect(args) => command::inspect(&args, &mut out),
    }
}
