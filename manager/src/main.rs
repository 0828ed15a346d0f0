mod cache;
mod config;
mod controller;
mod database;
mod error;
mod handlers;
mod models;
mod routes;
mod store;
mod websocket;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{Arg, Command};
use config::AppConfig;
use database::Database;
use error::AppResult;
use handlers::AppState;
use routes::configure_routes;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use store::BoardStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[actix_web::main]
async fn main() -> AppResult<()> {
    // Parse command line arguments
    let matches = Command::new("agora-manager")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Agora manager - live discussion board daemon")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to configuration file")
                .value_name("FILE"),
        )
        .get_matches();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("agora_manager=info".parse().unwrap()))
        .init();

    tracing::info!("Starting Agora manager daemon");

    // Load configuration
    let config = if let Some(path) = matches.get_one::<String>("config") {
        AppConfig::load_from_file(Path::new(path))?
    } else {
        AppConfig::load()?
    };

    // Initialize database and store
    let database = Arc::new(Database::new(&config.database.path)?);
    tracing::info!("Database initialized at {:?}", config.database.path);

    let store = Arc::new(BoardStore::new(Arc::clone(&database)));

    let app_state = web::Data::new(AppState {
        database,
        store,
        start_time: SystemTime::now(),
    });

    // Start HTTP server
    let server_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting HTTP server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
