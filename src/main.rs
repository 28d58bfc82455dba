mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;
mod stream;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use datasources::{ControllerClient, WeatherUndergroundClient};
use db::Database;
use logic::{run_cycle, run_until, DecisionEngine, EngineConfig, WakeCycle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type Cycle = WakeCycle<WeatherUndergroundClient, ControllerClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Commands::Init = cli.command {
        Config::setup_interactive()?;
        return Ok(());
    }

    let config = match Config::load(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Run `irrigo init` or copy config/config.yaml.example to config/config.yaml");
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "Configuration loaded");

    let db_path = Config::db_path(cli.data_dir.as_ref())?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open state database at {}", db_path.display()))?;

    match cli.command {
        Commands::Run => {
            let cycle = build_cycle(&config)?;
            run_until(
                &cycle,
                &db,
                Duration::from_secs(config.schedule.wake_interval_secs),
                shutdown_signal(),
            )
            .await;
        }
        Commands::Once => {
            let cycle = build_cycle(&config)?;
            run_cycle(&cycle, &db)
                .await
                .context("Wake cycle failed")?;
        }
        Commands::Status => print_status(&config, &db)?,
        Commands::Check => check_connections(&config).await?,
        Commands::Reset => {
            db.reset_irrigation_state()?;
            println!("Irrigation state reset to first-boot defaults");
        }
        Commands::Init => unreachable!("handled before config load"),
    }

    Ok(())
}

fn build_cycle(config: &Config) -> anyhow::Result<Cycle> {
    let weather = WeatherUndergroundClient::new(config.weather.clone())?;
    let controller = ControllerClient::new(config.controller.clone())?;
    let engine = DecisionEngine::new(EngineConfig::from(config));

    Ok(WakeCycle::new(
        weather,
        controller,
        engine,
        config.controller.firmware.history_capacity,
    ))
}

/// Resolves on the first Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn print_status(config: &Config, db: &Database) -> anyhow::Result<()> {
    let state = db.load_irrigation_state()?;
    let schedule = &config.schedule;

    println!("State database:    {}", db.path().display());
    match db.state_saved_at()? {
        Some(at) => println!(
            "Last saved:        {}",
            at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("Last saved:        never (first boot)"),
    }
    println!(
        "Rain delay:        {}",
        if state.rain_delay_active { "active" } else { "inactive" }
    );
    println!(
        "Rain cycles:       {} of {}",
        state.rain_delay_cycles, schedule.max_rain_cycles
    );
    println!(
        "Wake cycle:        {} of {} (watering re-evaluated at 0)",
        state.wake_cycle_count, schedule.max_wake_cycles
    );
    println!("Wake interval:     {}s", schedule.wake_interval_secs);
    Ok(())
}

async fn check_connections(config: &Config) -> anyhow::Result<()> {
    println!("Configuration OK (station {})", config.weather.station_id);

    let weather = WeatherUndergroundClient::new(config.weather.clone())?;
    let weather_ok = weather.test_connection().await.unwrap_or_else(|e| {
        tracing::warn!("PWS API check failed: {}", e);
        false
    });
    println!("PWS API:           {}", if weather_ok { "OK" } else { "OFFLINE" });

    let controller = ControllerClient::new(config.controller.clone())?;
    let controller_ok = controller.test_connection().await.unwrap_or_else(|e| {
        tracing::warn!("Controller check failed: {}", e);
        false
    });
    println!(
        "Controller:        {}",
        if controller_ok { "OK" } else { "OFFLINE" }
    );

    if !(weather_ok && controller_ok) {
        anyhow::bail!("one or more connections failed");
    }
    Ok(())
}
