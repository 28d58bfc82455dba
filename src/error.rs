use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrrigationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Unexpected response status: {0}")]
    AuthOrProtocolFailure(String),

    #[error("Malformed response envelope: {0}")]
    EnvelopeMalformed(String),

    #[error("Malformed weather record: {0}")]
    RecordMalformed(String),

    #[error("Implausible weather data: {0}")]
    DataImplausible(String),

    #[error("Controller command failed: {0}")]
    CommandFailure(String),
}

pub type Result<T> = std::result::Result<T, IrrigationError>;
