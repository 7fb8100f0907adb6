mod handler;
mod model;

pub use handler::{create_trip, delete_trip, get_trip, list_trips, update_trip};
