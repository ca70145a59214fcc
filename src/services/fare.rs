use super::Coordinate;

use crate::{
    config::{FareRequestMode, Settings},
    trip::render::shorten,
    FareError, GenericError,
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::*;
use serde::Serialize;
use serde_json::Value;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest piece of an unreadable response body kept in the error.
const BODY_EXCERPT_LIMIT: usize = 200;

/// Keys checked, in order, for a fare inside a JSON object response.
const FARE_KEYS: [&str; 3] = ["prediction", "fare", "pred"];

/// Trip parameters as the fare endpoint expects them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareRequest {
    pub pickup_datetime: String,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    pub passenger_count: u8,
}

impl FareRequest {
    pub fn new(
        pickup: Coordinate,
        dropoff: Coordinate,
        passenger_count: u8,
        pickup_datetime: NaiveDateTime,
    ) -> Self {
        FareRequest {
            pickup_datetime: pickup_datetime.format(DATETIME_FORMAT).to_string(),
            pickup_longitude: pickup.lng(),
            pickup_latitude: pickup.lat(),
            dropoff_longitude: dropoff.lng(),
            dropoff_latitude: dropoff.lat(),
            passenger_count,
        }
    }
}

#[async_trait]
pub trait FarePredictor: Send + Sync {
    async fn estimate(&self, request: &FareRequest) -> Result<f64, FareError>;
}

/// Single-attempt client for the remote fare-prediction endpoint.
pub struct HttpFareClient {
    client: reqwest::Client,
    service_url: Option<String>,
    mode: FareRequestMode,
}

impl HttpFareClient {
    pub fn new(settings: &Settings) -> Result<Self, GenericError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(HttpFareClient {
            client,
            service_url: settings.service_url.clone(),
            mode: settings.fare_request_mode,
        })
    }
}

#[async_trait]
impl FarePredictor for HttpFareClient {
    async fn estimate(&self, request: &FareRequest) -> Result<f64, FareError> {
        let service_url = self
            .service_url
            .as_deref()
            .ok_or(FareError::ConfigurationMissing)?;

        let builder = match self.mode {
            FareRequestMode::Post => self.client.post(service_url).json(request),
            FareRequestMode::Get => self
                .client
                .get(format!("{}/predict", service_url.trim_end_matches('/')))
                .query(request),
        };
        trace!("Sending fare request: {:?}", request);
        let body = builder
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        trace!("Received fare response body: {}", body);

        parse_fare(&body)
    }
}

/// Pulls a fare out of the response body. Accepted shapes are a bare number,
/// an object with a number under one of `FARE_KEYS`, or an object whose
/// `predictions` list starts with a number.
pub fn parse_fare(body: &str) -> Result<f64, FareError> {
    let fare = match serde_json::from_str::<Value>(body) {
        Ok(Value::Number(n)) => n.as_f64(),
        Ok(Value::Object(map)) => FARE_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(as_fare))
            .or_else(|| {
                map.get("predictions")
                    .and_then(Value::as_array)
                    .and_then(|list| list.first())
                    .and_then(as_fare)
            }),
        Ok(_) => None,
        Err(_) => body.trim().parse::<f64>().ok(),
    };

    match fare {
        Some(fare) if fare.is_finite() => Ok(fare),
        _ => Err(FareError::Parse(shorten(body.trim(), BODY_EXCERPT_LIMIT))),
    }
}

fn as_fare(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
