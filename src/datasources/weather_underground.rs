use super::{http_client, WeatherSource};
use crate::config::WeatherConfig;
use crate::error::{IrrigationError, Result};
use crate::models::{EndpointKind, FetchResult};
use crate::stream::{advance_past_element, decode_one, locate_array, ByteSource, ResponseSource};
use reqwest::header::CONNECTION;
use reqwest::StatusCode;

pub struct WeatherUndergroundClient {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherUndergroundClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
        Ok(Self::with_client(config, http_client()?))
    }

    pub fn with_client(config: WeatherConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    /// Fetch up to `capacity` records from one endpoint.
    ///
    /// Never fails: connection, status and envelope problems are logged and
    /// produce an empty result, and a bad record ends the read early while
    /// keeping everything decoded before it.
    pub async fn fetch(&self, kind: EndpointKind, capacity: usize) -> FetchResult {
        match self.try_fetch(kind, capacity).await {
            Ok(result) => {
                tracing::debug!(
                    kind = %kind,
                    count = result.count(),
                    capacity,
                    "PWS records fetched"
                );
                result
            }
            Err(e) => {
                tracing::warn!(kind = %kind, "Failed to fetch PWS data: {}", e);
                FetchResult::empty()
            }
        }
    }

    async fn try_fetch(&self, kind: EndpointKind, capacity: usize) -> Result<FetchResult> {
        let response = self.request(kind).await?;

        // The connection lives exactly as long as the source
        let mut source = ResponseSource::new(response);
        read_records(&mut source, kind.array_marker(), capacity).await
    }

    async fn request(&self, kind: EndpointKind) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(self.request_url(kind))
            .header(CONNECTION, "close")
            .send()
            .await
            .map_err(|e| IrrigationError::ConnectionFailure(format!("PWS API: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IrrigationError::AuthOrProtocolFailure(format!(
                "PWS API returned {}",
                status
            )));
        }

        Ok(response)
    }

    fn request_url(&self, kind: EndpointKind) -> String {
        format!(
            "{}/{}?stationId={}&format=json&units=e&apiKey={}",
            self.config.base_url.trim_end_matches('/'),
            kind.path(),
            self.config.station_id,
            self.config.api_key
        )
    }

    /// Test connection to the PWS API
    pub async fn test_connection(&self) -> Result<bool> {
        match self.request(EndpointKind::Current).await {
            Ok(_) => Ok(true),
            Err(IrrigationError::AuthOrProtocolFailure(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl WeatherSource for WeatherUndergroundClient {
    async fn fetch(&self, kind: EndpointKind, capacity: usize) -> FetchResult {
        WeatherUndergroundClient::fetch(self, kind, capacity).await
    }
}

/// Skip to the array opened by `marker` and decode up to `capacity` elements.
///
/// Fails only when the marker is missing. A record that cannot be decoded
/// stops the loop; records before it are returned.
pub async fn read_records<S: ByteSource>(
    source: &mut S,
    marker: &str,
    capacity: usize,
) -> Result<FetchResult> {
    if !locate_array(source, marker).await? {
        return Err(IrrigationError::EnvelopeMalformed(format!(
            "array {} not found in response",
            marker
        )));
    }

    let mut result = FetchResult::empty();

    while result.count() < capacity {
        match decode_one(source).await {
            Ok(record) => result.records.push(record),
            Err(e) => {
                tracing::warn!(index = result.count(), "Failed to parse weather record: {}", e);
                break;
            }
        }

        if !advance_past_element(source).await {
            break;
        }
    }

    Ok(result)
}
