//! HTTP surface for the hostscope telemetry caches.

pub mod routes;
pub mod server;

pub use routes::{build_router, AppState};
pub use server::{serve, serve_on, shutdown_signal};
