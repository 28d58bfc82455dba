use serde::{Deserialize, Serialize};

/// An outbound instruction for the irrigation controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Suspend all watering for the given number of hours
    SetRainDelay { hours: u32 },
    /// Scale scheduled run times to the given percentage
    SetWaterLevel { percent: u32 },
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::SetRainDelay { .. } => "set rain delay",
            Command::SetWaterLevel { .. } => "set water level",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::SetRainDelay { hours } => write!(f, "{} to {}h", self.as_str(), hours),
            Command::SetWaterLevel { percent } => write!(f, "{} to {}%", self.as_str(), percent),
        }
    }
}
