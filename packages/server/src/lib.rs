#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web scoring API for the smart-city table.
//!
//! Loads `merged_smartcity.csv` once at startup into an immutable
//! [`CityTable`] shared by every worker. Each request to `/api/score`
//! recomputes `UserScore` from its own weights; nothing is cached between
//! requests and nothing is written back.

mod handlers;
pub mod interactive;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use smart_city_city_models::CityTable;
use smart_city_table::paths;

/// Environment variable overriding the path of the city table to serve.
pub const TABLE_PATH_ENV: &str = "SMART_CITY_TABLE";

/// Shared application state.
pub struct AppState {
    /// The loaded city table. Read-only for the lifetime of the server.
    pub table: Arc<CityTable>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/profiles", web::get().to(handlers::profiles))
            .route("/cities", web::get().to(handlers::cities))
            .route("/score", web::get().to(handlers::score)),
    );
}

/// Path of the table to serve: [`TABLE_PATH_ENV`] if set, otherwise the
/// merged artifact in the data directory.
#[must_use]
pub fn table_path() -> PathBuf {
    std::env::var_os(TABLE_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| paths::merged_path(&paths::data_dir()), PathBuf::from)
}

/// Where the server reads its table from and listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// City table to serve.
    pub table: PathBuf,
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
}

impl ServerConfig {
    /// Reads [`TABLE_PATH_ENV`], `BIND_ADDR`, and `PORT`, defaulting to the
    /// merged artifact on `127.0.0.1:8080`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            table: table_path(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }
}

/// Starts the scoring API server.
///
/// Reads the city table, then binds to the configured address. The caller
/// provides the async runtime and is responsible for logger initialization.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the table cannot be loaded, the
/// server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let ServerConfig {
        table,
        bind_addr,
        port,
    } = config;

    log::info!("Loading city table from {}...", table.display());
    let table = load_table(&table)?;

    let state = web::Data::new(AppState {
        table: Arc::new(table),
    });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

fn load_table(path: &Path) -> std::io::Result<CityTable> {
    smart_city_table::read_city_table(path).map_err(|e| {
        log::error!("Failed to load city table: {e}");
        std::io::Error::other(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn missing_table_fails_before_binding() {
        let config = ServerConfig {
            table: PathBuf::from("/nonexistent/merged_smartcity.csv"),
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
        };
        assert!(run_server(config).await.is_err());
    }
}
