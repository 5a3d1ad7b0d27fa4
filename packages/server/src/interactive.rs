//! Interactive mode for the server.
//!
//! Asks which table to serve and where to listen, starting from the
//! environment defaults.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Prompts for a [`ServerConfig`] and starts the server with it.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Smart City Scoring Server");
    println!();

    let defaults = ServerConfig::from_env();

    let table: String = Input::new()
        .with_prompt("City table")
        .default(defaults.table.display().to_string())
        .interact_text()
        .map_err(std::io::Error::other)?;

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr)
        .interact_text()
        .map_err(std::io::Error::other)?;

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .map_err(std::io::Error::other)?;

    let config = ServerConfig {
        table: PathBuf::from(table),
        bind_addr,
        port,
    };

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Serve {} on {}:{}?",
            config.table.display(),
            config.bind_addr,
            config.port
        ))
        .default(true)
        .interact()
        .map_err(std::io::Error::other)?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
