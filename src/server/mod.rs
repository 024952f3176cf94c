//! HTTP server for the live view

pub mod config;
pub mod listener;
pub mod routes;

pub use config::ServerConfig;
pub use listener::LiveviewServer;
