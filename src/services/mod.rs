use derive_more::Display;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Serialize;

use crate::FareBotError;

pub mod fare;
pub mod geocoding;
pub mod sessions;

/// A point on the map. Latitude and longitude are always within range.
#[derive(Debug, Display, Clone, Copy, PartialEq, Serialize)]
#[display(fmt = "{:.5}, {:.5}", lat, lng)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, FareBotError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(FareBotError::InvalidCoordinate { lat, lng });
        }
        Ok(Coordinate { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }

    /// Exact bit pattern of the pair, used as a memoization key.
    pub(crate) fn cache_key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }

    pub(crate) fn from_decimal(lat: Decimal, lng: Decimal) -> Option<Self> {
        Coordinate::new(lat.to_f64()?, lng.to_f64()?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn midpoint_and_display() {
        let a = Coordinate::new(40.0, -74.0).unwrap();
        let b = Coordinate::new(41.0, -73.0).unwrap();
        assert_eq!(a.midpoint(&b), Coordinate::new(40.5, -73.5).unwrap());
        assert_eq!(a.to_string(), "40.00000, -74.00000");
    }

    #[test]
    fn converts_from_decimal_pairs() {
        let lat = Decimal::from_f64(40.7484).unwrap();
        let lng = Decimal::from_f64(-73.9857).unwrap();
        let coord = Coordinate::from_decimal(lat, lng).unwrap();
        assert!((coord.lat() - 40.7484).abs() < 1e-9);
        assert!((coord.lng() + 73.9857).abs() < 1e-9);
    }
}
