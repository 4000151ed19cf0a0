//! Taskwire client
//!
//! Keeps task, project, and dashboard views in sync with a backend that
//! pushes change notifications over a WebSocket. Each mounted view owns one
//! connection, decodes incoming events, patches what it can in place, and
//! re-fetches the rest over REST.

pub mod chat;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod notice;
pub mod paths;
pub mod rest;
pub mod subscriber;
pub mod token;
pub mod transport;
pub mod view_state;

#[cfg(test)]
mod test_support;

pub use connection::{ConnectionManager, ConnectionState};
pub use subscriber::{RunExit, ViewSubscriber};
pub use view_state::{Collection, Screen};
