//! Copydesk CLI — marketing copy for a company directory.
//!
//! Loads a directory CSV, generates HTML descriptions and SEO metadata per
//! company via a chat completion API, and checks website URLs.

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
