pub mod controller;
pub mod render;
pub mod state;

pub use controller::{ClickOutcome, LocateOutcome, TripController};
pub use state::{PassengerCount, TripEnd, TripPhase, TripState};
