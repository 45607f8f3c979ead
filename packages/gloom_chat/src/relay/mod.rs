//! Chat Relay
//!
//! Single shared room:
//! - clients announce themselves and receive the recent history
//! - every accepted message is broadcast to every connection
//! - departures of registered users are announced with the new head count

mod handler;
pub mod hub;
pub mod protocol;
pub mod state;

pub use handler::handle_chat_ws;
pub use hub::{ChatHub, HubHandle, HubStats};
pub use protocol::{ClientMessage, ServerMessage};
pub use state::{Delivery, RelayState, Target};
