use super::calculations::{check_plausibility, zimmerman_adjustment, WateringAdjustment};
use crate::config::{Config, ZimmermanConfig};
use crate::error::{IrrigationError, Result};
use crate::models::{Command, FetchResult, IrrigationState, WeatherRecord};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_rain_cycles: u32,
    pub max_wake_cycles: u32,
    pub rain_delay_hours: u32,
    pub zimmerman: ZimmermanConfig,
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_rain_cycles: config.schedule.max_rain_cycles,
            max_wake_cycles: config.schedule.max_wake_cycles,
            rain_delay_hours: config.schedule.rain_delay_hours,
            zimmerman: config.zimmerman.clone(),
        }
    }
}

/// Turns observations into controller commands.
///
/// The engine owns no state of its own; the persisted counters are handed in
/// by the caller each cycle and written back afterwards.
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Rain check against current conditions.
    ///
    /// While rain keeps falling the delay is sent on the first wet cycle and
    /// then once per wrap of the rain counter. Without a current observation
    /// nothing changes.
    pub fn evaluate_rain(
        &self,
        state: &mut IrrigationState,
        current: Option<&WeatherRecord>,
    ) -> Option<Command> {
        let current = current?;

        if !current.is_raining() {
            if state.rain_delay_active {
                tracing::info!("Rain has stopped; controller delay will lapse on its own");
            }
            state.clear_rain_delay();
            return None;
        }

        state.rain_delay_active = true;
        let command = (state.rain_delay_cycles == 0).then_some(Command::SetRainDelay {
            hours: self.config.rain_delay_hours,
        });
        state.advance_rain_cycle(self.config.max_rain_cycles);

        tracing::debug!(
            precip_rate = current.precip_rate_in_hr,
            rain_delay_cycles = state.rain_delay_cycles,
            "Rain detected"
        );

        command
    }

    /// Whether this wake cycle should re-evaluate the watering percentage
    pub fn watering_due(&self, state: &IrrigationState) -> bool {
        state.wake_cycle_count == 0
    }

    /// Move the watering gate forward; runs every cycle whatever the data looked like
    pub fn advance_wake_cycle(&self, state: &mut IrrigationState) {
        state.advance_wake_cycle(self.config.max_wake_cycles);
    }

    /// Zimmerman adjustment from the daily history and current conditions
    pub fn evaluate_watering(
        &self,
        history: &FetchResult,
        current: Option<&WeatherRecord>,
    ) -> Result<WateringAdjustment> {
        let yesterday = history.yesterday().ok_or_else(|| {
            IrrigationError::DataImplausible(format!(
                "need at least 2 daily summaries, got {}",
                history.count()
            ))
        })?;
        let today = current.ok_or_else(|| {
            IrrigationError::DataImplausible("no current conditions".into())
        })?;

        check_plausibility(yesterday, today)?;

        Ok(zimmerman_adjustment(yesterday, today, &self.config.zimmerman))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_config() -> EngineConfig {
        EngineConfig {
            max_rain_cycles: 3,
            max_wake_cycles: 5,
            rain_delay_hours: 24,
            zimmerman: ZimmermanConfig::default(),
        }
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(engine_config())
    }

    fn current(rate: f64, total: f64) -> WeatherRecord {
        WeatherRecord::new(Some("2024-06-02 10:00:00"), 60, 75.0, rate, total)
    }

    fn history(days: &[(i32, f64, f64)]) -> FetchResult {
        FetchResult {
            records: days
                .iter()
                .map(|&(humidity, temp, total)| {
                    WeatherRecord::new(None, humidity, temp, 0.0, total)
                })
                .collect(),
        }
    }

    #[test]
    fn rain_sets_delay_once() {
        let engine = engine();
        let mut state = IrrigationState::default();
        let wet = current(0.3, 0.1);

        assert_eq!(
            engine.evaluate_rain(&mut state, Some(&wet)),
            Some(Command::SetRainDelay { hours: 24 })
        );
        assert!(state.rain_delay_active);
        assert_eq!(state.rain_delay_cycles, 1);

        assert_eq!(engine.evaluate_rain(&mut state, Some(&wet)), None);
        assert!(state.rain_delay_active);
    }

    #[test]
    fn persistent_rain_resends_after_wrap() {
        let engine = engine();
        let mut state = IrrigationState::default();
        let wet = current(0.3, 0.1);

        let sent: Vec<bool> = (0..9)
            .map(|_| engine.evaluate_rain(&mut state, Some(&wet)).is_some())
            .collect();
        // max_rain_cycles = 3: counter goes 1, 2, 3, 0, 1, ...
        assert_eq!(
            sent,
            vec![true, false, false, false, true, false, false, false, true]
        );
        assert!(state.rain_delay_cycles <= 3);
    }

    #[test]
    fn dry_reading_clears_delay_without_command() {
        let engine = engine();
        let mut state = IrrigationState {
            rain_delay_active: true,
            rain_delay_cycles: 2,
            wake_cycle_count: 4,
        };

        assert_eq!(engine.evaluate_rain(&mut state, Some(&current(0.0, 0.4))), None);
        assert!(!state.rain_delay_active);
        assert_eq!(state.rain_delay_cycles, 0);
        assert_eq!(state.wake_cycle_count, 4);
    }

    #[test]
    fn rain_after_dry_spell_sends_again() {
        let engine = engine();
        let mut state = IrrigationState::default();

        assert!(engine.evaluate_rain(&mut state, Some(&current(0.3, 0.0))).is_some());
        engine.evaluate_rain(&mut state, Some(&current(0.0, 0.0)));
        assert!(engine.evaluate_rain(&mut state, Some(&current(0.1, 0.0))).is_some());
    }

    #[test]
    fn missing_current_leaves_state_untouched() {
        let engine = engine();
        let mut state = IrrigationState {
            rain_delay_active: true,
            rain_delay_cycles: 2,
            wake_cycle_count: 1,
        };
        let before = state;

        assert_eq!(engine.evaluate_rain(&mut state, None), None);
        assert_eq!(state, before);
    }

    #[test]
    fn watering_uses_second_to_last_summary() {
        let engine = DecisionEngine::new(EngineConfig {
            zimmerman: ZimmermanConfig {
                humidity_base: 65,
                temp_base: 70.0,
                precip_base: 0.0,
                ..ZimmermanConfig::default()
            },
            ..engine_config()
        });
        let history = history(&[(40, 60.0, 0.0), (50, 80.0, 0.0), (99, 20.0, 2.0)]);

        let adj = engine
            .evaluate_watering(&history, Some(&current(0.0, 0.0)))
            .unwrap();
        assert_eq!(adj.percent, 155);
    }

    #[test]
    fn watering_needs_two_summaries() {
        let engine = engine();
        let err = engine
            .evaluate_watering(&history(&[(50, 80.0, 0.0)]), Some(&current(0.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, IrrigationError::DataImplausible(_)));
    }

    #[test]
    fn watering_needs_current_conditions() {
        let engine = engine();
        let history = history(&[(50, 80.0, 0.0), (50, 80.0, 0.0)]);
        assert!(engine.evaluate_watering(&history, None).is_err());
    }

    #[test]
    fn implausible_yesterday_skips_watering() {
        let engine = engine();
        let history = history(&[(50, 200.0, 0.0), (50, 80.0, 0.0)]);
        assert!(matches!(
            engine.evaluate_watering(&history, Some(&current(0.0, 0.0))),
            Err(IrrigationError::DataImplausible(_))
        ));
    }

    #[test]
    fn implausible_current_conditions_skip_watering() {
        let engine = engine();
        let history = history(&[(40, 60.0, 0.0), (50, 80.0, 0.0), (60, 75.0, 0.0)]);
        let bad_current = WeatherRecord::new(Some("2024-06-02 10:00:00"), 150, 200.0, 0.0, 0.0);

        assert!(matches!(
            engine.evaluate_watering(&history, Some(&bad_current)),
            Err(IrrigationError::DataImplausible(_))
        ));
    }

    #[test]
    fn watering_gate_opens_once_per_wrap() {
        let engine = engine();
        let mut state = IrrigationState::default();

        let due: Vec<bool> = (0..13)
            .map(|_| {
                let due = engine.watering_due(&state);
                engine.advance_wake_cycle(&mut state);
                due
            })
            .collect();
        let opened: Vec<usize> = due
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.then_some(i))
            .collect();
        assert_eq!(opened, vec![0, 6, 12]);
    }
}
