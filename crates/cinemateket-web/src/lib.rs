pub mod config;
pub mod routes;

pub use config::ServiceConfig;
pub use routes::{AppState, router};
