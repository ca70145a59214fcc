use super::Coordinate;

use crate::{
    config::{GeocoderKind, Settings},
    FareBotError, GenericError, GeocodeError,
};

use async_trait::async_trait;
use google_maps::{GoogleMapsClient, LatLng};
use log::*;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tokio::sync::RwLock;

#[async_trait]
pub trait GeocodingService: Send + Sync {
    fn new(settings: &Settings) -> Result<Self, GenericError>
    where
        Self: Sized;
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError>;
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeocodeError>;
}

pub struct GoogleMapsService {
    client: GoogleMapsClient,
}

#[async_trait]
impl GeocodingService for GoogleMapsService {
    fn new(settings: &Settings) -> Result<Self, GenericError> {
        let token = settings
            .google_maps_token
            .as_deref()
            .ok_or(FareBotError::MissingSetting("GOOGLE_MAPS_TOKEN"))?;
        Ok(GoogleMapsService {
            client: GoogleMapsClient::new(token),
        })
    }

    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let response = self
            .client
            .geocoding()
            .with_address(address)
            .execute()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        let location = &response
            .results
            .first()
            .ok_or(GeocodeError::NoMatch)?
            .geometry
            .location;
        trace!("Received coordinates from Google Maps geocoding API.");
        Coordinate::from_decimal(location.lat, location.lng).ok_or(GeocodeError::NoMatch)
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        let lat = Decimal::from_f64(coordinate.lat());
        let lng = Decimal::from_f64(coordinate.lng());
        let (lat, lng) = lat.zip(lng).ok_or(GeocodeError::NoMatch)?;
        let latlng =
            LatLng::try_from_dec(lat, lng).map_err(|e| GeocodeError::Provider(e.to_string()))?;
        let response = self
            .client
            .reverse_geocoding(latlng)
            .execute()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        trace!("Received address from Google Maps reverse geocoding API.");
        response
            .results
            .first()
            .map(|result| result.formatted_address.clone())
            .ok_or(GeocodeError::NoMatch)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
}

/// OpenStreetMap's Nominatim. The usage policy requires a descriptive
/// User-Agent on every request.
pub struct NominatimService {
    client: reqwest::Client,
    base_url: String,
}

#[async_trait]
impl GeocodingService for NominatimService {
    fn new(settings: &Settings) -> Result<Self, GenericError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.nominatim_user_agent.as_str())
            .timeout(settings.request_timeout)
            .build()?;
        Ok(NominatimService {
            client,
            base_url: settings.nominatim_url.trim_end_matches('/').to_string(),
        })
    }

    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| GeocodeError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        trace!("Received {} place(s) from Nominatim search.", places.len());

        let place = places.first().ok_or(GeocodeError::NoMatch)?;
        let lat = place.lat.parse::<f64>();
        let lng = place.lon.parse::<f64>();
        match (lat, lng) {
            (Ok(lat), Ok(lng)) => Coordinate::new(lat, lng).map_err(|_| GeocodeError::NoMatch),
            _ => Err(GeocodeError::Provider(format!(
                "unreadable coordinates {:?}, {:?}",
                place.lat, place.lon
            ))),
        }
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        let lat = coordinate.lat().to_string();
        let lon = coordinate.lng().to_string();
        let place: NominatimReverse = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "jsonv2")])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| GeocodeError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        trace!("Received reverse geocoding result from Nominatim.");
        place.display_name.ok_or(GeocodeError::NoMatch)
    }
}

pub fn service_from_settings(settings: &Settings) -> Result<Box<dyn GeocodingService>, GenericError> {
    Ok(match settings.geocoder {
        GeocoderKind::Google => Box::new(GoogleMapsService::new(settings)?),
        GeocoderKind::Nominatim => Box::new(NominatimService::new(settings)?),
    })
}

/// Soft-failing, memoizing front for a `GeocodingService`.
///
/// Successful lookups and definite "no match" answers are remembered for the
/// life of the process. Timeouts and provider errors are not, so the next
/// action tries the provider again.
pub struct GeocodeClient {
    service: Box<dyn GeocodingService>,
    timeout: Duration,
    forward_cache: RwLock<HashMap<String, Option<Coordinate>>>,
    reverse_cache: RwLock<HashMap<(u64, u64), Option<String>>>,
}

impl GeocodeClient {
    pub fn new(service: Box<dyn GeocodingService>, timeout: Duration) -> Self {
        GeocodeClient {
            service,
            timeout,
            forward_cache: RwLock::new(HashMap::new()),
            reverse_cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn forward(&self, address: &str) -> Option<Coordinate> {
        if address.trim().is_empty() {
            return None;
        }
        if let Some(cached) = self.forward_cache.read().await.get(address) {
            return *cached;
        }

        let result = match tokio::time::timeout(self.timeout, self.service.geocode(address)).await {
            Ok(result) => result,
            Err(_) => Err(GeocodeError::Timeout(self.timeout)),
        };
        let found = settle(result, "geocode", address)?;
        self.forward_cache
            .write()
            .await
            .insert(address.to_string(), found);
        found
    }

    pub async fn reverse(&self, coordinate: Coordinate) -> Option<String> {
        let key = coordinate.cache_key();
        if let Some(cached) = self.reverse_cache.read().await.get(&key) {
            return cached.clone();
        }

        let result =
            match tokio::time::timeout(self.timeout, self.service.reverse_geocode(coordinate)).await
            {
                Ok(result) => result,
                Err(_) => Err(GeocodeError::Timeout(self.timeout)),
            };
        let found = settle(result, "reverse geocode", &coordinate.to_string())?;
        self.reverse_cache.write().await.insert(key, found.clone());
        found
    }
}

/// Splits a provider result into what may be cached. The outer `None` means
/// "transient failure, don't cache"; `Some(None)` is a cacheable no-match.
fn settle<T>(result: Result<T, GeocodeError>, what: &str, input: &str) -> Option<Option<T>> {
    match result {
        Ok(value) => Some(Some(value)),
        Err(GeocodeError::NoMatch) => {
            debug!("No {} match for {:?}.", what, input);
            Some(None)
        }
        Err(why) => {
            warn!("Failed to {} {:?}: {}", what, input, why);
            None
        }
    }
}
