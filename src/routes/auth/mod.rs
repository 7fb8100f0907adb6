mod handler;
mod model;

pub use handler::{login, logout, me, refresh_token, register};
