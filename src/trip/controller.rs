use log::*;

use super::{TripEnd, TripState};
use crate::{
    services::{
        fare::{FarePredictor, FareRequest},
        geocoding::GeocodeClient,
        Coordinate,
    },
    FareError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ClickOutcome {
    pub target: TripEnd,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOutcome {
    pub pickup_found: bool,
    pub dropoff_found: bool,
}

/// Applies user actions to a `TripState`, calling out to geocoding and the
/// fare service as needed. Holds no per-user state, so one instance serves
/// every session.
pub struct TripController {
    geocoder: GeocodeClient,
    fare: Box<dyn FarePredictor>,
}

impl TripController {
    pub fn new(geocoder: GeocodeClient, fare: Box<dyn FarePredictor>) -> Self {
        TripController { geocoder, fare }
    }

    pub async fn click(&self, trip: &mut TripState, at: Coordinate) -> ClickOutcome {
        let address = self.geocoder.reverse(at).await;
        let target = trip.apply_click(at, address.clone());
        info!("Map click at {} saved to {}.", at, target);
        ClickOutcome { target, address }
    }

    pub fn clear(&self, trip: &mut TripState) {
        trip.clear_coordinates();
        info!("Trip coordinates cleared.");
    }

    /// Geocodes both address strings, keeping whichever side resolves.
    pub async fn locate(&self, trip: &mut TripState) -> LocateOutcome {
        let pickup = self.geocoder.forward(&trip.pickup_address).await;
        let dropoff = self.geocoder.forward(&trip.dropoff_address).await;

        if pickup.is_some() {
            trip.pickup_coords = pickup;
        }
        if dropoff.is_some() {
            trip.dropoff_coords = dropoff;
        }
        if pickup.is_some() || dropoff.is_some() {
            trip.last_fare = None;
        }
        LocateOutcome {
            pickup_found: pickup.is_some(),
            dropoff_found: dropoff.is_some(),
        }
    }

    /// Prices the trip, geocoding any missing endpoint from its address first.
    pub async fn estimate_fare(&self, trip: &mut TripState) -> Result<f64, FareError> {
        if trip.pickup_coords.is_none() {
            trip.pickup_coords = self.geocoder.forward(&trip.pickup_address).await;
        }
        if trip.dropoff_coords.is_none() {
            trip.dropoff_coords = self.geocoder.forward(&trip.dropoff_address).await;
        }

        let (pickup, dropoff) = match (trip.pickup_coords, trip.dropoff_coords) {
            (Some(pickup), Some(dropoff)) => (pickup, dropoff),
            (pickup, dropoff) => {
                return Err(FareError::Validation {
                    pickup_missing: pickup.is_none(),
                    dropoff_missing: dropoff.is_none(),
                })
            }
        };

        let request = FareRequest::new(
            pickup,
            dropoff,
            trip.passenger_count.get(),
            trip.pickup_datetime,
        );
        match self.fare.estimate(&request).await {
            Ok(fare) => {
                info!("Estimated fare {:.2} for {} -> {}.", fare, pickup, dropoff);
                trip.last_fare = Some(fare);
                Ok(fare)
            }
            Err(why) => {
                warn!("Fare estimation failed: {}", why);
                trip.last_fare = None;
                Err(why)
            }
        }
    }
}
