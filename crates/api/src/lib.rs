//! HTTP trigger surface for the traffic stream.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
