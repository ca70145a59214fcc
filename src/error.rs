use std::time::Duration;

use thiserror::Error;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the bot shell itself, mostly bad command input.
#[derive(Debug, Error)]
pub enum FareBotError {
    #[error("Coordinate ({lat}, {lng}) is out of range.")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("Passenger count must be between 1 and 8, got {0}.")]
    InvalidPassengerCount(i64),
    #[error("Could not read pickup time {0:?}, expected YYYY-MM-DD HH:MM[:SS].")]
    InvalidDateTime(String),
    #[error("Setting {name} has invalid value {value:?}.")]
    InvalidSetting { name: &'static str, value: String },
    #[error("Setting {0} is required.")]
    MissingSetting(&'static str),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Shared bot data {0} was not initialised.")]
    MissingData(&'static str),
}

/// Soft failures from a geocoding provider. These never reach the user as
/// errors; `GeocodeClient` turns them into an absent result.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no match")]
    NoMatch,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Error)]
pub enum FareError {
    #[error("The fare service URL is not configured. Set SERVICE_URL.")]
    ConfigurationMissing,
    #[error("Fare request failed: {0}")]
    Transport(String),
    #[error("Couldn't parse prediction from fare response: {0}")]
    Parse(String),
    #[error("{}", validation_message(.pickup_missing, .dropoff_missing))]
    Validation {
        pickup_missing: bool,
        dropoff_missing: bool,
    },
}

fn validation_message(pickup_missing: &bool, dropoff_missing: &bool) -> String {
    let side = match (*pickup_missing, *dropoff_missing) {
        (true, true) => "pickup and dropoff",
        (true, false) => "pickup",
        _ => "dropoff",
    };
    format!(
        "Couldn't resolve the {} location. Provide a more specific address or click the map.",
        side
    )
}

impl From<reqwest::Error> for FareError {
    fn from(err: reqwest::Error) -> Self {
        FareError::Transport(err.to_string())
    }
}
