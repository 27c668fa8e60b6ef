//! relayprobe HTTP server
//!
//! Starts the admin API, or runs a single connectivity test from the command
//! line.

use clap::Parser;
use relayprobe::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output }) => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Configuration template written to {}", path);
                }
                None => print!("{}", template),
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Test { account_id, model }) => {
            let config = Arc::new(Config::from_file(&cli.config)?);
            telemetry::init(&config.observability.log_level);

            let state = AppState::new(config)?;
            let outcome = state.tester().test_connection(&account_id, &model).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            Ok(if outcome.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        None => {
            run_server(&cli.config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_server(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::from_file(config_path)?);

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        accounts = config.accounts.len(),
        admin_auth = config.admin.token.is_some(),
        stream_criterion = ?config.probe.stream_criterion,
        "Starting relayprobe server on {}:{}",
        config.server.host,
        config.server.port
    );
    if config.admin.token.is_none() {
        tracing::warn!("admin.token is not set; /admin routes are unauthenticated");
    }

    let host: std::net::IpAddr = config.server.host.parse().map_err(|e| {
        format!(
            "server.host '{}' is not a valid IP address: {}",
            config.server.host, e
        )
    })?;
    let addr = SocketAddr::from((host, config.server.port));

    let state = AppState::new(config)?;
    let app = handlers::router(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
