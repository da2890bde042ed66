use clap::Parser;

use crate::cli::{App, Commands};
use crate::config::Config;

mod cli;
mod config;
mod logging;
mod tracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = App::parse();
    logging::init(app.verbose)?;
    let config = Config::load(app.config.as_deref())?;

    match app.cmd {
        Commands::Copy(arg) => arg.run(&config).await,
        Commands::Stat(arg) => arg.run(&config).await,
    }
}
