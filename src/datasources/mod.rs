pub mod controller;
pub mod weather_underground;

pub use controller::ControllerClient;
pub use weather_underground::WeatherUndergroundClient;

use crate::error::{IrrigationError, Result};
use crate::models::{Command, EndpointKind, FetchResult};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a wake cycle gets its observations from
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn fetch(&self, kind: EndpointKind, capacity: usize) -> FetchResult;
}

/// Where a wake cycle sends its commands
#[allow(async_fn_in_trait)]
pub trait IrrigationController {
    async fn send(&self, command: &Command) -> Result<()>;
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| IrrigationError::Config(format!("Failed to build HTTP client: {}", e)))
}
