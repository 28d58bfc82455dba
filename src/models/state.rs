use serde::{Deserialize, Serialize};

/// The only values that outlive a wake cycle. Everything else is recomputed
/// from fresh observations each time the device wakes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrigationState {
    /// Rain was observed on the last cycle with current conditions
    pub rain_delay_active: bool,
    /// Cycles since the last rain delay command, in `0..=max_rain_cycles`
    pub rain_delay_cycles: u32,
    /// Position within the watering gate, in `0..=max_wake_cycles`
    pub wake_cycle_count: u32,
}

impl IrrigationState {
    pub fn advance_rain_cycle(&mut self, max_rain_cycles: u32) {
        self.rain_delay_cycles = wrapping_advance(self.rain_delay_cycles, max_rain_cycles);
    }

    pub fn advance_wake_cycle(&mut self, max_wake_cycles: u32) {
        self.wake_cycle_count = wrapping_advance(self.wake_cycle_count, max_wake_cycles);
    }

    pub fn clear_rain_delay(&mut self) {
        self.rain_delay_active = false;
        self.rain_delay_cycles = 0;
    }
}

/// Step a bounded counter; `max` is a valid value and is followed by 0.
pub fn wrapping_advance(value: u32, max: u32) -> u32 {
    if value >= max {
        0
    } else {
        value + 1
    }
}

impl std::fmt::Display for IrrigationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rain delay {} (cycle {}), wake cycle {}",
            if self.rain_delay_active { "active" } else { "inactive" },
            self.rain_delay_cycles,
            self.wake_cycle_count
        )
    }
}
