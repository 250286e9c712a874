pub mod core;
pub mod store;

pub use core::{connect, sanitize_db_url, ConnectionHandle};
pub use store::{Filter, Store};
