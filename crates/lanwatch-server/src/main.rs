//! CLI entry point for the lanwatch dashboard backend.

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use lanwatch_core::config::DEFAULT_FILE_PREFIX;
use lanwatch_discover::SystemProbe;
use lanwatch_server::config::Settings;
use lanwatch_server::{routes, scheduler, ScanService};
use lanwatch_sync::{ws, BroadcastHub};

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(about = "LAN discovery and live device dashboard backend")]
struct Cli {
    /// Config file prefix (default: lanwatch).
    #[arg(short, long, default_value = DEFAULT_FILE_PREFIX)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API, the WebSocket endpoint and the optional scan schedule.
    Serve,

    /// Run one scan, reconcile it into the registry and print the report as JSON.
    Scan {
        /// Range to scan (CIDR or single address). Defaults to the configured
        /// range, then the local /24.
        #[arg(short, long)]
        target: Option<String>,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    let probe = SystemProbe::new(&settings.discover);
    probe.verify_installation().await?;
    tracing::info!(platform = ?probe.platform(), "Probe tools verified");

    let registry = lanwatch_registry::connect(&settings.registry).await?;
    let hub = BroadcastHub::new(settings.hub.clone());
    let service = Arc::new(ScanService::new(
        Arc::new(probe),
        registry,
        hub.clone(),
        &settings.discover,
    ));

    match cli.command {
        Command::Scan { target } => {
            let report = service.run(target.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Serve => serve(settings, service, hub).await?,
    }

    Ok(())
}

async fn serve(settings: Settings, service: Arc<ScanService>, hub: BroadcastHub) -> anyhow::Result<()> {
    let server = settings.server;

    let listener = TcpListener::bind(server.ws_bind.as_str()).await?;
    tracing::info!(addr = %server.ws_bind, path = %server.ws_path, "WebSocket endpoint bound");
    let ws_path = server.ws_path.clone();
    tokio::spawn(async move {
        if let Err(e) = ws::serve(listener, hub, ws_path).await {
            tracing::error!(error = %e, "WebSocket listener stopped");
        }
    });

    if let Some(secs) = server.scan_interval_secs.filter(|s| *s > 0) {
        tokio::spawn(scheduler::run_scheduled_scans(
            service.clone(),
            Duration::from_secs(secs),
        ));
    }

    let data = web::Data::from(service);
    let origins = server.cors_origins.clone();
    tracing::info!(addr = %server.http_bind, "Starting HTTP server");

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(data.clone())
            .wrap(cors)
            .configure(routes::configure)
    })
    .bind(server.http_bind.as_str())?
    .run()
    .await?;

    Ok(())
}
