mod aggregate;
mod animation;
mod cli;
mod config;
mod deserialise;
mod download;
mod error;
mod export;
mod reading;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use config::Settings;
use env_logger::Env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Download {} => {
            let report = command::download(&settings).await?;
            println!("{}", report);
        }
        Commands::Export { parquet } => {
            for filename in command::export(&settings, *parquet)? {
                println!("File saved to `{}`", filename.display());
            }
        }
        Commands::Animate { output } => {
            let filename = command::animate(&settings, output.as_deref())?;
            println!("File saved to `{}`", filename.display());
        }
    }

    Ok(())
}
