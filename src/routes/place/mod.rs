mod handler;

pub use handler::search_places;
