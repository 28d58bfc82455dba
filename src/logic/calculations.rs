use crate::config::ZimmermanConfig;
use crate::error::{IrrigationError, Result};
use crate::models::{Command, WeatherRecord};

/// Breakdown of one Zimmerman watering calculation
#[derive(Debug, Clone, PartialEq)]
pub struct WateringAdjustment {
    pub humidity_factor: i32,
    pub temp_factor: f64,
    pub precip_factor: f64,
    /// Sum of the factors plus 100, before limits are applied
    pub raw_percent: i32,
    /// Value sent to the controller
    pub percent: u32,
}

impl WateringAdjustment {
    pub fn command(&self) -> Command {
        Command::SetWaterLevel {
            percent: self.percent,
        }
    }
}

impl std::fmt::Display for WateringAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}% (humidity {:+}, temperature {:+.1}, precipitation {:+.1}, raw {}%)",
            self.percent, self.humidity_factor, self.temp_factor, self.precip_factor, self.raw_percent
        )
    }
}

/// Zimmerman-style watering percentage from yesterday's summary and today's
/// running precipitation total.
///
/// Each degree above the temperature baseline adds 4%, each percent of
/// humidity below the baseline adds 1%, and each hundredth of an inch of
/// rain removes 2%.
pub fn zimmerman_adjustment(
    yesterday: &WeatherRecord,
    today: &WeatherRecord,
    params: &ZimmermanConfig,
) -> WateringAdjustment {
    let humidity_factor = params.humidity_base - yesterday.humidity_avg;
    let temp_factor = (yesterday.temp_avg_f - params.temp_base) * 4.0;
    let precip_factor =
        (params.precip_base - yesterday.precip_total_in - today.precip_total_in) * 200.0;

    let raw = humidity_factor as f64 + temp_factor + precip_factor + 100.0;

    WateringAdjustment {
        humidity_factor,
        temp_factor,
        precip_factor,
        raw_percent: raw.round() as i32,
        percent: limit_percent(raw, params),
    }
}

/// Small adjustments are not worth a run; they become an explicit 0%.
///
/// The floor applies to the unrounded value so 9.6% is still dropped.
fn limit_percent(raw: f64, params: &ZimmermanConfig) -> u32 {
    if raw < params.min_percent as f64 {
        return 0;
    }
    let percent = raw.round() as u32;
    match params.max_percent {
        Some(max) => percent.min(max),
        None => percent,
    }
}

/// Reject sensor readings the formula should not be fed. Both records get
/// the full set of range checks.
pub fn check_plausibility(yesterday: &WeatherRecord, today: &WeatherRecord) -> Result<()> {
    check_record("yesterday's", yesterday)?;
    check_record("current", today)
}

fn check_record(label: &str, record: &WeatherRecord) -> Result<()> {
    if !record.temp_plausible() {
        return Err(IrrigationError::DataImplausible(format!(
            "{} average temperature {}°F",
            label, record.temp_avg_f
        )));
    }
    if !record.humidity_plausible() {
        return Err(IrrigationError::DataImplausible(format!(
            "{} average humidity {}%",
            label, record.humidity_avg
        )));
    }
    if !record.precipitation_plausible() {
        return Err(IrrigationError::DataImplausible(format!(
            "{} precipitation {} in/hr, {} in",
            label, record.precip_rate_in_hr, record.precip_total_in
        )));
    }
    Ok(())
}
