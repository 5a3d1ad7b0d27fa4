#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive CLI orchestrator for the smart-city toolchain.
//!
//! Lets users pick a tool (rebuild the city table, rank cities from the
//! terminal, or start the API server) and walks them through its options.
//!
//! Uses `indicatif-log-bridge` (via [`smart_city_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;
mod score;

use dialoguer::Select;

/// Top-level tool selection.
enum Tool {
    RunPipeline,
    Score,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::RunPipeline, Self::Score, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunPipeline => "Build city table",
            Self::Score => "Rank cities",
            Self::Server => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = smart_city_cli_utils::init_logger();

    println!("Smart City Finder");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::RunPipeline => pipeline::run(&multi)?,
        Tool::Score => score::run()?,
        Tool::Server => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(smart_city_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}
