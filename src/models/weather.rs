use serde::{Deserialize, Serialize};

/// Longest observation timestamp kept on a record, in bytes.
pub const MAX_TIMESTAMP_LEN: usize = 63;

/// Placeholder used when an observation carries no local timestamp.
pub const MISSING_TIMESTAMP: &str = "N/A";

/// Plausible average temperature range in °F (roughly -10..45 °C).
pub const TEMP_RANGE_F: (f64, f64) = (14.0, 113.0);

/// Plausible relative humidity range in percent.
pub const HUMIDITY_RANGE: (i32, i32) = (0, 100);

/// One weather observation as reported by the PWS network, in imperial units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub observed_at_local: String,
    pub humidity_avg: i32,
    pub temp_avg_f: f64,
    pub precip_rate_in_hr: f64,
    pub precip_total_in: f64,
}

impl WeatherRecord {
    pub fn new(
        observed_at_local: Option<&str>,
        humidity_avg: i32,
        temp_avg_f: f64,
        precip_rate_in_hr: f64,
        precip_total_in: f64,
    ) -> Self {
        let observed_at_local = match observed_at_local {
            Some(ts) => truncate_at_char_boundary(ts, MAX_TIMESTAMP_LEN).to_string(),
            None => MISSING_TIMESTAMP.to_string(),
        };

        Self {
            observed_at_local,
            humidity_avg,
            temp_avg_f,
            precip_rate_in_hr,
            precip_total_in,
        }
    }

    /// Whether rain is falling at the time of the observation
    pub fn is_raining(&self) -> bool {
        self.precip_rate_in_hr > 0.0
    }

    pub fn temp_plausible(&self) -> bool {
        self.temp_avg_f.is_finite()
            && self.temp_avg_f >= TEMP_RANGE_F.0
            && self.temp_avg_f <= TEMP_RANGE_F.1
    }

    pub fn humidity_plausible(&self) -> bool {
        (HUMIDITY_RANGE.0..=HUMIDITY_RANGE.1).contains(&self.humidity_avg)
    }

    pub fn precipitation_plausible(&self) -> bool {
        self.precip_rate_in_hr.is_finite()
            && self.precip_total_in.is_finite()
            && self.precip_rate_in_hr >= 0.0
            && self.precip_total_in >= 0.0
    }
}

impl std::fmt::Display for WeatherRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {:.1}°F, {}% RH, {:.2} in/hr, {:.2} in",
            self.observed_at_local,
            self.temp_avg_f,
            self.humidity_avg,
            self.precip_rate_in_hr,
            self.precip_total_in
        )
    }
}

fn truncate_at_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Which upstream endpoint a fetch targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Current,
    History,
}

impl EndpointKind {
    pub fn path(&self) -> &'static str {
        match self {
            EndpointKind::Current => "v2/pws/observations/current",
            EndpointKind::History => "v2/pws/dailysummary/7day",
        }
    }

    /// Literal text that opens the array of records inside the response
    pub fn array_marker(&self) -> &'static str {
        match self {
            EndpointKind::Current => "\"observations\":[",
            EndpointKind::History => "\"summaries\":[",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Current => "current conditions",
            EndpointKind::History => "daily history",
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Records produced by a single fetch, in response order.
///
/// An empty result means the fetch failed outright.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub records: Vec<WeatherRecord>,
}

impl FetchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn first(&self) -> Option<&WeatherRecord> {
        self.records.first()
    }

    /// The second-to-last record. The last daily summary may still be
    /// accumulating for today, so the one before it is taken as yesterday.
    pub fn yesterday(&self) -> Option<&WeatherRecord> {
        let count = self.count();
        if count < 2 {
            return None;
        }
        self.records.get(count - 2)
    }
}
