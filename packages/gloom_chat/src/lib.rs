//! Gloom Chat: a single-room WebSocket chat relay.
//!
//! Everything lives in memory. Clients announce a nickname, receive the
//! most recent messages, and from then on every message any of them sends
//! is fanned out to every open connection.

pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod relay;
pub mod server;

pub use config::AppConfig;
pub use error::{RelayError, Result};
pub use server::{AppState, ChatServer, build_router};
