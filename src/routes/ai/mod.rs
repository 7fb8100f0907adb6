mod handler;
mod model;

pub use handler::{generate, itinerary, recommendations, travel_tips};
