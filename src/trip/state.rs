use chrono::{Local, NaiveDateTime, Timelike};
use derive_more::Display;

use crate::{services::Coordinate, FareBotError};

/// Number of riders, always within 1..=8.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub struct PassengerCount(u8);

impl PassengerCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for PassengerCount {
    fn default() -> Self {
        PassengerCount(Self::MIN)
    }
}

impl TryFrom<i64> for PassengerCount {
    type Error = FareBotError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(PassengerCount(value as u8))
        } else {
            Err(FareBotError::InvalidPassengerCount(value))
        }
    }
}

/// Which endpoint a map click landed on.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum TripEnd {
    #[display(fmt = "Pickup")]
    Pickup,
    #[display(fmt = "Dropoff")]
    Dropoff,
}

/// Fill state of the coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripPhase {
    Empty,
    PickupSet,
    DropoffOnly,
    BothSet,
}

/// One user's trip. Addresses and coordinates are set independently and are
/// allowed to disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct TripState {
    pub pickup_address: String,
    pub pickup_coords: Option<Coordinate>,
    pub dropoff_address: String,
    pub dropoff_coords: Option<Coordinate>,
    pub passenger_count: PassengerCount,
    pub pickup_datetime: NaiveDateTime,
    pub last_fare: Option<f64>,
}

impl TripState {
    pub fn new(pickup_datetime: NaiveDateTime) -> Self {
        TripState {
            pickup_address: String::new(),
            pickup_coords: None,
            dropoff_address: String::new(),
            dropoff_coords: None,
            passenger_count: PassengerCount::default(),
            pickup_datetime,
            last_fare: None,
        }
    }

    pub fn phase(&self) -> TripPhase {
        match (self.pickup_coords, self.dropoff_coords) {
            (None, None) => TripPhase::Empty,
            (Some(_), None) => TripPhase::PickupSet,
            (None, Some(_)) => TripPhase::DropoffOnly,
            (Some(_), Some(_)) => TripPhase::BothSet,
        }
    }

    /// Where the next map click goes: pickup, then dropoff, then the cycle
    /// starts over on pickup.
    pub fn next_click_target(&self) -> TripEnd {
        match self.phase() {
            TripPhase::PickupSet => TripEnd::Dropoff,
            TripPhase::Empty | TripPhase::DropoffOnly | TripPhase::BothSet => TripEnd::Pickup,
        }
    }

    /// Commits a map click. The coordinate always lands; `address` replaces
    /// the matching address string only when reverse geocoding found one.
    pub fn apply_click(&mut self, at: Coordinate, address: Option<String>) -> TripEnd {
        let restart = self.phase() == TripPhase::BothSet;
        let target = self.next_click_target();
        match target {
            TripEnd::Pickup => {
                if restart {
                    self.dropoff_coords = None;
                    self.dropoff_address.clear();
                }
                self.pickup_coords = Some(at);
                if let Some(address) = address {
                    self.pickup_address = address;
                }
            }
            TripEnd::Dropoff => {
                self.dropoff_coords = Some(at);
                if let Some(address) = address {
                    self.dropoff_address = address;
                }
            }
        }
        self.last_fare = None;
        target
    }

    pub fn clear_coordinates(&mut self) {
        self.pickup_coords = None;
        self.dropoff_coords = None;
        self.pickup_address.clear();
        self.dropoff_address.clear();
        self.last_fare = None;
    }

    pub fn set_address(&mut self, end: TripEnd, address: &str) {
        match end {
            TripEnd::Pickup => self.pickup_address = address.to_string(),
            TripEnd::Dropoff => self.dropoff_address = address.to_string(),
        }
    }
}

impl Default for TripState {
    fn default() -> Self {
        let now = Local::now().naive_local();
        TripState::new(now.with_nanosecond(0).unwrap_or(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn trip() -> TripState {
        TripState::new(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn passenger_count_stays_in_range() {
        assert!(PassengerCount::try_from(0i64).is_err());
        assert!(PassengerCount::try_from(9i64).is_err());
        assert!(PassengerCount::try_from(-1i64).is_err());
        assert_eq!(PassengerCount::try_from(8i64).unwrap().get(), 8);
        assert_eq!(PassengerCount::default().get(), 1);
    }

    #[test]
    fn new_trip_is_empty() {
        let trip = trip();
        assert_eq!(trip.phase(), TripPhase::Empty);
        assert!(trip.pickup_address.is_empty());
        assert!(trip.dropoff_address.is_empty());
        assert_eq!(trip.last_fare, None);
    }

    #[test]
    fn clicks_fill_pickup_then_dropoff_then_restart() {
        let mut trip = trip();

        assert_eq!(trip.apply_click(at(1.0, 1.0), Some("A".into())), TripEnd::Pickup);
        assert_eq!(trip.phase(), TripPhase::PickupSet);

        assert_eq!(trip.apply_click(at(2.0, 2.0), Some("B".into())), TripEnd::Dropoff);
        assert_eq!(trip.phase(), TripPhase::BothSet);
        assert_eq!(trip.dropoff_address, "B");

        assert_eq!(trip.apply_click(at(3.0, 3.0), Some("C".into())), TripEnd::Pickup);
        assert_eq!(trip.phase(), TripPhase::PickupSet);
        assert_eq!(trip.pickup_coords, Some(at(3.0, 3.0)));
        assert_eq!(trip.pickup_address, "C");
        assert_eq!(trip.dropoff_coords, None);
        assert!(trip.dropoff_address.is_empty());
    }

    #[test]
    fn click_without_address_keeps_the_old_text() {
        let mut trip = trip();
        trip.pickup_address = "typed by hand".to_string();

        trip.apply_click(at(1.0, 1.0), None);
        assert_eq!(trip.pickup_coords, Some(at(1.0, 1.0)));
        assert_eq!(trip.pickup_address, "typed by hand");
    }

    #[test]
    fn dropoff_only_click_fills_pickup() {
        let mut trip = trip();
        trip.dropoff_coords = Some(at(2.0, 2.0));

        assert_eq!(trip.apply_click(at(1.0, 1.0), None), TripEnd::Pickup);
        assert_eq!(trip.phase(), TripPhase::BothSet);
        assert_eq!(trip.dropoff_coords, Some(at(2.0, 2.0)));
    }

    #[test]
    fn clicking_forgets_the_last_fare() {
        let mut trip = trip();
        trip.last_fare = Some(10.0);
        trip.apply_click(at(1.0, 1.0), None);
        assert_eq!(trip.last_fare, None);
    }

    fn any_coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0..=90.0f64, -180.0..=180.0f64).prop_map(|(lat, lng)| at(lat, lng))
    }

    fn any_trip() -> impl Strategy<Value = TripState> {
        (
            proptest::option::of(any_coordinate()),
            proptest::option::of(any_coordinate()),
            ".{0,12}",
            ".{0,12}",
        )
            .prop_map(|(pickup, dropoff, pickup_address, dropoff_address)| TripState {
                pickup_coords: pickup,
                dropoff_coords: dropoff,
                pickup_address,
                dropoff_address,
                ..trip()
            })
    }

    proptest! {
        #[test]
        fn nth_click_alternates_from_empty(
            clicks in proptest::collection::vec((any_coordinate(), proptest::option::of("[a-z]{1,8}")), 1..24)
        ) {
            let mut trip = trip();
            for (i, (coord, address)) in clicks.into_iter().enumerate() {
                let n = i + 1;
                let target = trip.apply_click(coord, address);
                if n % 2 == 1 {
                    prop_assert_eq!(target, TripEnd::Pickup);
                    prop_assert_eq!(trip.pickup_coords, Some(coord));
                    prop_assert_eq!(trip.dropoff_coords, None);
                    if n > 2 {
                        prop_assert!(trip.dropoff_address.is_empty());
                    }
                } else {
                    prop_assert_eq!(target, TripEnd::Dropoff);
                    prop_assert_eq!(trip.dropoff_coords, Some(coord));
                    prop_assert_eq!(trip.phase(), TripPhase::BothSet);
                }
            }
        }

        #[test]
        fn clear_always_returns_to_empty(mut trip in any_trip()) {
            trip.clear_coordinates();
            prop_assert_eq!(trip.phase(), TripPhase::Empty);
            prop_assert!(trip.pickup_address.is_empty());
            prop_assert!(trip.dropoff_address.is_empty());
        }
    }
}
