mod handler;
mod model;

pub use handler::{
    create_destination, delete_destination, get_destination, list_destinations,
    update_destination,
};
