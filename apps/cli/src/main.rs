//! ReturnScope CLI — seller-center returns reconciliation tool.
//!
//! Crawls the returns list for a time window, matches operator-supplied
//! return keys against it, and enriches every match with warehouse-classified
//! detail records.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
