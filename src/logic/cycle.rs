use super::calculations::WateringAdjustment;
use super::engine::DecisionEngine;
use crate::datasources::{IrrigationController, WeatherSource};
use crate::models::{Command, EndpointKind, IrrigationState, WeatherRecord};

/// What happened during one wake cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    pub current: Option<WeatherRecord>,
    /// `None` when the watering gate was closed or skipped
    pub history_count: Option<usize>,
    pub adjustment: Option<WateringAdjustment>,
    pub sent: Vec<Command>,
    pub failed: Vec<Command>,
}

/// One fetch-decide-command pass.
///
/// At most two weather requests are made: current conditions every cycle,
/// daily history only when the watering gate is open.
pub struct WakeCycle<W, C> {
    weather: W,
    controller: C,
    engine: DecisionEngine,
    history_capacity: usize,
}

impl<W: WeatherSource, C: IrrigationController> WakeCycle<W, C> {
    pub fn new(weather: W, controller: C, engine: DecisionEngine, history_capacity: usize) -> Self {
        Self {
            weather,
            controller,
            engine,
            history_capacity,
        }
    }

    /// Run a cycle against `state`. The caller persists `state` afterwards.
    pub async fn run_once(&self, state: &mut IrrigationState) -> CycleReport {
        let mut report = CycleReport::default();

        let current = self.weather.fetch(EndpointKind::Current, 1).await.first().cloned();
        match current {
            Some(ref obs) => tracing::info!(observation = %obs, "Current conditions"),
            None => tracing::warn!("No current conditions this cycle; rain check skipped"),
        }

        if let Some(command) = self.engine.evaluate_rain(state, current.as_ref()) {
            self.dispatch(command, &mut report).await;
        }

        if self.engine.watering_due(state) {
            self.evaluate_watering(current.as_ref(), &mut report).await;
        } else {
            tracing::debug!(
                wake_cycle = state.wake_cycle_count,
                "Watering gate closed this cycle"
            );
        }

        self.engine.advance_wake_cycle(state);
        report.current = current;
        report
    }

    async fn evaluate_watering(&self, current: Option<&WeatherRecord>, report: &mut CycleReport) {
        if current.is_none() {
            // History alone cannot produce a result, so spare the API call
            tracing::warn!("Skipping watering adjustment: no current conditions");
            return;
        }

        let history = self
            .weather
            .fetch(EndpointKind::History, self.history_capacity)
            .await;
        report.history_count = Some(history.count());

        match self.engine.evaluate_watering(&history, current) {
            Ok(adjustment) => {
                tracing::info!(adjustment = %adjustment, "Watering adjustment computed");
                self.dispatch(adjustment.command(), report).await;
                report.adjustment = Some(adjustment);
            }
            Err(e) => tracing::warn!("Skipping watering adjustment: {}", e),
        }
    }

    async fn dispatch(&self, command: Command, report: &mut CycleReport) {
        match self.controller.send(&command).await {
            Ok(()) => report.sent.push(command),
            Err(e) => {
                tracing::error!(command = %command, "Controller command failed: {}", e);
                report.failed.push(command);
            }
        }
    }
}
