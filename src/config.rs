use crate::error::{IrrigationError, Result};
use dialoguer::{Input, Password};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.weather.com";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub weather: WeatherConfig,
    pub controller: ControllerConfig,
    #[serde(default)]
    pub zimmerman: ZimmermanConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    pub api_key: String,
    pub station_id: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &"[REDACTED]")
            .field("station_id", &self.station_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    pub url: String,
    /// Sent verbatim as `pw`; OpenSprinkler expects the MD5 hash of the password
    pub password: String,
    #[serde(default = "default_rain_delay_path")]
    pub rain_delay_path: String,
    #[serde(default = "default_rain_delay_param")]
    pub rain_delay_param: String,
    #[serde(default = "default_water_level_path")]
    pub water_level_path: String,
    #[serde(default)]
    pub firmware: FirmwareProfile,
}

fn default_rain_delay_path() -> String {
    "cv".into()
}

fn default_rain_delay_param() -> String {
    "rd".into()
}

fn default_water_level_path() -> String {
    "co".into()
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("url", &self.url)
            .field("password", &"[REDACTED]")
            .field("rain_delay_path", &self.rain_delay_path)
            .field("rain_delay_param", &self.rain_delay_param)
            .field("water_level_path", &self.water_level_path)
            .field("firmware", &self.firmware)
            .finish()
    }
}

/// The bits that differ between controller firmware releases
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FirmwareProfile {
    /// How many daily summaries to read from the history response
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Query parameter carrying the watering percentage
    #[serde(default = "default_water_level_param")]
    pub water_level_param: String,
}

fn default_history_capacity() -> usize {
    8
}

fn default_water_level_param() -> String {
    "wl".into()
}

impl Default for FirmwareProfile {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            water_level_param: default_water_level_param(),
        }
    }
}

/// Baselines for the Zimmerman watering adjustment.
///
/// The humidity baseline defaults to a humid-climate 65% rather than the
/// textbook 30%.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZimmermanConfig {
    #[serde(default = "default_humidity_base")]
    pub humidity_base: i32,
    #[serde(default = "default_temp_base")]
    pub temp_base: f64,
    #[serde(default)]
    pub precip_base: f64,
    /// Results below this are sent as 0%
    #[serde(default = "default_min_percent")]
    pub min_percent: u32,
    /// Optional ceiling for controllers that reject large water levels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_percent: Option<u32>,
}

fn default_humidity_base() -> i32 {
    65
}

fn default_temp_base() -> f64 {
    70.0
}

fn default_min_percent() -> u32 {
    10
}

impl Default for ZimmermanConfig {
    fn default() -> Self {
        Self {
            humidity_base: default_humidity_base(),
            temp_base: default_temp_base(),
            precip_base: 0.0,
            min_percent: default_min_percent(),
            max_percent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_wake_interval_secs")]
    pub wake_interval_secs: u64,
    /// Watering is re-evaluated once every `max_wake_cycles + 1` wakes
    #[serde(default = "default_max_wake_cycles")]
    pub max_wake_cycles: u32,
    /// While rain persists the delay is re-sent once every `max_rain_cycles + 1` wakes
    #[serde(default = "default_max_rain_cycles")]
    pub max_rain_cycles: u32,
    #[serde(default = "default_rain_delay_hours")]
    pub rain_delay_hours: u32,
}

fn default_wake_interval_secs() -> u64 {
    600
}

fn default_max_wake_cycles() -> u32 {
    5
}

fn default_max_rain_cycles() -> u32 {
    11
}

fn default_rain_delay_hours() -> u32 {
    24
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            wake_interval_secs: default_wake_interval_secs(),
            max_wake_cycles: default_max_wake_cycles(),
            max_rain_cycles: default_max_rain_cycles(),
            rain_delay_hours: default_rain_delay_hours(),
        }
    }
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(IrrigationError::Config(format!(
                "Config file not found at {:?}. Run `irrigo init` to set up.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| IrrigationError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_yaml_str(&config_str)
    }

    /// Parse config text, substituting `${VAR}` placeholders first
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| IrrigationError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weather.api_key.trim().is_empty() {
            return Err(IrrigationError::Config("weather.api_key is empty".into()));
        }
        if self.weather.station_id.trim().is_empty() {
            return Err(IrrigationError::Config("weather.station_id is empty".into()));
        }
        if self.controller.url.trim().is_empty() {
            return Err(IrrigationError::Config("controller.url is empty".into()));
        }
        if self.controller.firmware.history_capacity < 2 {
            return Err(IrrigationError::Config(
                "controller.firmware.history_capacity must be at least 2".into(),
            ));
        }
        if self.schedule.wake_interval_secs == 0 {
            return Err(IrrigationError::Config(
                "schedule.wake_interval_secs must be positive".into(),
            ));
        }
        if let Some(max) = self.zimmerman.max_percent {
            if self.zimmerman.min_percent > max {
                return Err(IrrigationError::Config(format!(
                    "zimmerman.min_percent ({}) exceeds max_percent ({})",
                    self.zimmerman.min_percent, max
                )));
            }
        }
        Ok(())
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("irrigo").join("config.yaml");
            if xdg_config.exists() {
                return Ok(xdg_config);
            }
        }

        Self::default_config_path()
    }

    /// Default path for writing new config files (~/.config/irrigo/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IrrigationError::Config("Cannot determine config directory".into()))?
            .join("irrigo");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the loaded Config and the path it was written to.
    pub fn setup_interactive() -> Result<(Self, PathBuf)> {
        println!();
        println!("Let's set up irrigo!");
        println!();

        println!("Weather station");
        let station_id: String = Input::new()
            .with_prompt("  PWS station ID")
            .interact_text()
            .map_err(input_error)?;

        let api_key: String = Password::new()
            .with_prompt("  Weather API key")
            .interact()
            .map_err(input_error)?;

        println!();

        println!("Irrigation controller");
        let controller_url: String = Input::new()
            .with_prompt("  URL")
            .default("http://192.168.1.50".into())
            .interact_text()
            .map_err(input_error)?;

        let password: String = Password::new()
            .with_prompt("  Password (MD5 hash)")
            .allow_empty_password(true)
            .interact()
            .map_err(input_error)?;

        let water_level_param: String = Input::new()
            .with_prompt("  Water level parameter")
            .default(default_water_level_param())
            .interact_text()
            .map_err(input_error)?;

        println!();

        println!("Watering adjustment");
        let humidity_base: i32 = Input::new()
            .with_prompt("  Humidity baseline (%)")
            .default(default_humidity_base())
            .interact_text()
            .map_err(input_error)?;

        let wake_interval_secs: u64 = Input::new()
            .with_prompt("  Seconds between wake cycles")
            .default(default_wake_interval_secs())
            .interact_text()
            .map_err(input_error)?;

        println!();

        let config = Config {
            weather: WeatherConfig {
                api_key,
                station_id,
                base_url: default_weather_base_url(),
            },
            controller: ControllerConfig {
                url: controller_url,
                password,
                rain_delay_path: default_rain_delay_path(),
                rain_delay_param: default_rain_delay_param(),
                water_level_path: default_water_level_path(),
                firmware: FirmwareProfile {
                    water_level_param,
                    ..FirmwareProfile::default()
                },
            },
            zimmerman: ZimmermanConfig {
                humidity_base,
                ..ZimmermanConfig::default()
            },
            schedule: ScheduleConfig {
                wake_interval_secs,
                ..ScheduleConfig::default()
            },
        };
        config.validate()?;

        let config_path = Self::default_config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| IrrigationError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# irrigo configuration\n# Generated by `irrigo init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(&config_path, content)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    pub fn data_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("IRRIGO_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| IrrigationError::Config("Cannot determine data directory".into()))?
            .join("irrigo");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn db_path(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        Ok(Self::data_dir(data_dir_override)?.join("irrigo.db"))
    }
}

fn input_error(e: dialoguer::Error) -> IrrigationError {
    IrrigationError::Config(format!("Input error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
weather:
  api_key: abc123
  station_id: KNCCARY89
controller:
  url: http://192.168.1.50
  password: 5f4dcc3b5aa765d61d8327deb882cf99
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();

        assert_eq!(config.weather.base_url, DEFAULT_WEATHER_BASE_URL);
        assert_eq!(config.controller.rain_delay_path, "cv");
        assert_eq!(config.controller.rain_delay_param, "rd");
        assert_eq!(config.controller.water_level_path, "co");
        assert_eq!(config.controller.firmware.water_level_param, "wl");
        assert_eq!(config.controller.firmware.history_capacity, 8);
        assert_eq!(config.zimmerman.humidity_base, 65);
        assert_eq!(config.zimmerman.temp_base, 70.0);
        assert_eq!(config.zimmerman.precip_base, 0.0);
        assert_eq!(config.zimmerman.min_percent, 10);
        assert_eq!(config.zimmerman.max_percent, None);
        assert_eq!(config.schedule.max_wake_cycles, 5);
        assert_eq!(config.schedule.max_rain_cycles, 11);
        assert_eq!(config.schedule.rain_delay_hours, 24);
    }

    #[test]
    fn firmware_profile_overrides() {
        let yaml = format!(
            "{}  firmware:\n    history_capacity: 7\n    water_level_param: o23\n",
            MINIMAL
        );
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.controller.firmware.history_capacity, 7);
        assert_eq!(config.controller.firmware.water_level_param, "o23");
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("IRRIGO_TEST_API_KEY", "from-env");
        let yaml = MINIMAL.replace("abc123", "${IRRIGO_TEST_API_KEY}");
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.weather.api_key, "from-env");
    }

    #[test]
    fn empty_api_key_rejected() {
        let yaml = MINIMAL.replace("abc123", "\"\"");
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(IrrigationError::Config(_))
        ));
    }

    #[test]
    fn history_capacity_below_two_rejected() {
        let yaml = format!("{}  firmware:\n    history_capacity: 1\n", MINIMAL);
        assert!(Config::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn inverted_percent_limits_rejected() {
        let yaml = format!(
            "{}zimmerman:\n  min_percent: 300\n  max_percent: 250\n",
            MINIMAL
        );
        assert!(Config::from_yaml_str(&yaml).is_err());

        let uncapped = format!("{}zimmerman:\n  min_percent: 300\n", MINIMAL);
        assert!(Config::from_yaml_str(&uncapped).is_ok());
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let yaml = format!("{}  firmware: [unclosed\n", MINIMAL);
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(IrrigationError::Config(ref m)) if m.starts_with("Failed to parse config")
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("5f4dcc3b"));
        assert!(debug.contains("[REDACTED]"));
    }
}
