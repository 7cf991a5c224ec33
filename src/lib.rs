pub mod config;
pub mod constants;
pub mod error;
pub mod geocoding;
pub mod logging;
pub mod pipeline;
pub mod types;

// Layered boundaries: use cases and ports in app, adapters in infra
pub mod app;
pub mod infra;
