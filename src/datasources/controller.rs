use super::{http_client, IrrigationController};
use crate::config::ControllerConfig;
use crate::error::{IrrigationError, Result};
use crate::models::Command;
use serde::Deserialize;

/// HTTP client for an OpenSprinkler-style controller.
///
/// Every command is a single GET carrying the password and one parameter.
/// Paths and parameter names come from config since they move between
/// firmware releases.
pub struct ControllerClient {
    client: reqwest::Client,
    config: ControllerConfig,
}

#[derive(Debug, Deserialize)]
struct ControllerReply {
    result: i64,
}

impl ControllerClient {
    pub fn new(config: ControllerConfig) -> Result<Self> {
        Ok(Self::with_client(config, http_client()?))
    }

    pub fn with_client(config: ControllerConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    pub async fn send(&self, command: &Command) -> Result<()> {
        let response = self
            .client
            .get(self.command_url(command))
            .send()
            .await
            .map_err(|e| IrrigationError::ConnectionFailure(format!("Controller: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IrrigationError::CommandFailure(format!(
                "{} returned {}",
                command, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            IrrigationError::CommandFailure(format!("{} reply unreadable: {}", command, e))
        })?;
        // Older firmware answers with an empty or non-JSON body on success
        if let Ok(reply) = serde_json::from_str::<ControllerReply>(&body) {
            if reply.result != 1 {
                return Err(IrrigationError::CommandFailure(format!(
                    "{} rejected: {} (result {})",
                    command,
                    describe_result(reply.result),
                    reply.result
                )));
            }
        }

        tracing::info!(command = %command, "Controller accepted command");
        Ok(())
    }

    fn command_url(&self, command: &Command) -> String {
        let (path, param, value) = match command {
            Command::SetRainDelay { hours } => (
                &self.config.rain_delay_path,
                &self.config.rain_delay_param,
                *hours,
            ),
            Command::SetWaterLevel { percent } => (
                &self.config.water_level_path,
                &self.config.firmware.water_level_param,
                *percent,
            ),
        };

        format!(
            "{}/{}?pw={}&{}={}",
            self.config.url.trim_end_matches('/'),
            path,
            self.config.password,
            param,
            value
        )
    }

    /// Test connection to the controller
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!(
            "{}/jc?pw={}",
            self.config.url.trim_end_matches('/'),
            self.config.password
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IrrigationError::ConnectionFailure(format!("Controller: {}", e)))?;

        Ok(response.status().is_success())
    }
}

impl IrrigationController for ControllerClient {
    async fn send(&self, command: &Command) -> Result<()> {
        ControllerClient::send(self, command).await
    }
}

fn describe_result(code: i64) -> &'static str {
    match code {
        1 => "success",
        2 => "unauthorized",
        3 => "mismatch",
        16 => "data missing",
        17 => "out of range",
        18 => "data format error",
        32 => "page not found",
        48 => "not permitted",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FirmwareProfile;
    use crate::datasources::test_support::{serve_once, serve_raw};

    fn sample_config(url: &str) -> ControllerConfig {
        ControllerConfig {
            url: url.to_string(),
            password: "a6d82bced638de3def1e9bbb4983225c".to_string(),
            rain_delay_path: "cv".to_string(),
            rain_delay_param: "rd".to_string(),
            water_level_path: "co".to_string(),
            firmware: FirmwareProfile::default(),
        }
    }

    fn test_client(url: &str) -> ControllerClient {
        ControllerClient::with_client(
            sample_config(url),
            reqwest::Client::builder().no_proxy().build().unwrap(),
        )
    }

    #[test]
    fn rain_delay_url() {
        let client = test_client("http://os.local/");
        assert_eq!(
            client.command_url(&Command::SetRainDelay { hours: 24 }),
            "http://os.local/cv?pw=a6d82bced638de3def1e9bbb4983225c&rd=24"
        );
    }

    #[test]
    fn water_level_url_uses_firmware_param() {
        let mut config = sample_config("http://os.local");
        config.firmware.water_level_param = "o23".to_string();
        let client = ControllerClient::with_client(config, reqwest::Client::new());
        assert_eq!(
            client.command_url(&Command::SetWaterLevel { percent: 0 }),
            "http://os.local/co?pw=a6d82bced638de3def1e9bbb4983225c&o23=0"
        );
    }

    #[tokio::test]
    async fn success_reply_is_accepted() {
        let (url, request) = serve_once("200 OK", r#"{"result":1}"#.to_string()).await;
        let client = test_client(&url);

        client
            .send(&Command::SetWaterLevel { percent: 155 })
            .await
            .unwrap();
        let line = request.await.unwrap();
        assert!(line.starts_with("GET /co?pw="));
        assert!(line.contains("&wl=155 "));
    }

    #[tokio::test]
    async fn error_result_code_is_command_failure() {
        let (url, _request) = serve_once("200 OK", r#"{"result":2}"#.to_string()).await;
        let err = test_client(&url)
            .send(&Command::SetRainDelay { hours: 24 })
            .await
            .unwrap_err();
        assert!(matches!(err, IrrigationError::CommandFailure(ref m) if m.contains("unauthorized")));
    }

    #[tokio::test]
    async fn http_error_is_command_failure() {
        let (url, _request) = serve_once("500 Internal Server Error", String::new()).await;
        assert!(matches!(
            test_client(&url)
                .send(&Command::SetRainDelay { hours: 24 })
                .await,
            Err(IrrigationError::CommandFailure(_))
        ));
    }

    #[tokio::test]
    async fn non_json_success_body_is_accepted() {
        let (url, _request) = serve_once("200 OK", "OK".to_string()).await;
        assert!(test_client(&url)
            .send(&Command::SetRainDelay { hours: 24 })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn truncated_reply_is_command_failure() {
        // Promises more body than it sends, then hangs up
        let (url, _request) = serve_raw(
            "HTTP/1.1 200 OK\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"res".to_string(),
        )
        .await;
        assert!(matches!(
            test_client(&url)
                .send(&Command::SetWaterLevel { percent: 80 })
                .await,
            Err(IrrigationError::CommandFailure(_))
        ));
    }
}
