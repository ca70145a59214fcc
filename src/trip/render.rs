use super::TripState;
use crate::services::{fare::DATETIME_FORMAT, Coordinate};

/// Where the map opens when nothing has been placed yet.
pub const NYC_CENTER: (f64, f64) = (40.7128, -74.0060);
const ZOOM: u8 = 12;

/// What the map should show for a trip: up to two markers and, when both are
/// present, the line between them.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub pickup: Option<Coordinate>,
    pub dropoff: Option<Coordinate>,
}

impl MapView {
    pub fn of(trip: &TripState) -> Self {
        let center = match (trip.pickup_coords, trip.dropoff_coords) {
            (Some(p), Some(d)) => p.midpoint(&d),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => {
                return MapView {
                    center: NYC_CENTER,
                    pickup: None,
                    dropoff: None,
                }
            }
        };
        MapView {
            center: (center.lat(), center.lng()),
            pickup: trip.pickup_coords,
            dropoff: trip.dropoff_coords,
        }
    }

    pub fn link(&self) -> String {
        let (lat, lng) = self.center;
        match (self.pickup, self.dropoff) {
            (Some(p), Some(d)) => format!(
                "https://www.openstreetmap.org/directions?engine=fossgis_osrm_car&route={}%2C{}%3B{}%2C{}#map={}/{}/{}",
                p.lat(),
                p.lng(),
                d.lat(),
                d.lng(),
                ZOOM,
                lat,
                lng
            ),
            (Some(marker), None) | (None, Some(marker)) => format!(
                "https://www.openstreetmap.org/?mlat={}&mlon={}#map={}/{}/{}",
                marker.lat(),
                marker.lng(),
                ZOOM,
                lat,
                lng
            ),
            (None, None) => format!("https://www.openstreetmap.org/#map={}/{}/{}", ZOOM, lat, lng),
        }
    }
}

/// Longest address echoed back in a trip summary.
const ADDRESS_LIMIT: usize = 300;

fn marker_line(label: &str, coord: Option<Coordinate>, address: &str) -> String {
    let address = shorten(address, ADDRESS_LIMIT);
    match coord {
        Some(coord) => {
            let name = if address.is_empty() {
                "Selected on map"
            } else {
                address.as_str()
            };
            format!("{}: {} ({})", label, name, coord)
        }
        None if address.is_empty() => format!("{}: not set", label),
        None => format!("{}: {} (not located)", label, address),
    }
}

/// Plain-text rendering of the whole trip, sent after every action.
pub fn render_trip(trip: &TripState) -> String {
    let view = MapView::of(trip);
    let mut lines = vec![
        marker_line("Pickup", trip.pickup_coords, &trip.pickup_address),
        marker_line("Dropoff", trip.dropoff_coords, &trip.dropoff_address),
        format!(
            "Passengers: {} | Pickup time: {}",
            trip.passenger_count,
            trip.pickup_datetime.format(DATETIME_FORMAT)
        ),
    ];
    if let Some(fare) = trip.last_fare {
        lines.push(format_fare(fare));
    }
    lines.push(format!("Map: {}", view.link()));
    lines.join("\n")
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

pub fn format_fare(fare: f64) -> String {
    format!("Estimated fare: ${:.2}", fare)
}
