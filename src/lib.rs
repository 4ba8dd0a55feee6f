//! Position Sync Server - authoritative real-time position synchronization
//!
//! Clients connect over WebSocket, submit directional input, and receive the
//! full player state at a fixed broadcast rate.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

pub use app::AppState;
pub use config::Config;
pub use http::build_router;
