use super::cycle::{CycleReport, WakeCycle};
use crate::datasources::{IrrigationController, WeatherSource};
use crate::db::Database;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Load state, run one cycle, and flush state back before returning
pub async fn run_cycle<W, C>(cycle: &WakeCycle<W, C>, db: &Database) -> Result<CycleReport>
where
    W: WeatherSource,
    C: IrrigationController,
{
    let mut state = db.load_irrigation_state()?;
    tracing::debug!(state = %state, "Wake cycle starting");

    let report = cycle.run_once(&mut state).await;

    db.save_irrigation_state(&state)?;

    tracing::info!(
        state = %state,
        current = report.current.is_some(),
        history = ?report.history_count,
        water_level = ?report.adjustment.as_ref().map(|a| a.percent),
        sent = report.sent.len(),
        failed = report.failed.len(),
        "Wake cycle complete"
    );
    Ok(report)
}

/// Run a cycle every `wake_interval` until `shutdown` resolves.
///
/// `shutdown` is polled for the whole life of the loop, so a request that
/// lands mid-cycle stops the loop once that cycle's state is saved.
pub async fn run_until<W, C, F>(
    cycle: &WakeCycle<W, C>,
    db: &Database,
    wake_interval: Duration,
    shutdown: F,
) where
    W: WeatherSource,
    C: IrrigationController,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(wake_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(
        wake_interval_secs = wake_interval.as_secs(),
        "Irrigation scheduler started"
    );

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping scheduler");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(cycle, db).await {
                    tracing::error!("Wake cycle failed: {}", e);
                }
            }
        }
    }
}
