pub mod ai;
pub mod auth;
pub mod destination;
pub mod place;
pub mod trip;
