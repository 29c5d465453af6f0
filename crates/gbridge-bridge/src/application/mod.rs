//! Application layer for gbridge-bridge.
//!
//! Knows *what* to do with an incoming gBridge publish, but delegates *how* the
//! resulting tristate code reaches the sink broker to a [`CommandPublisher`]
//! implementation from the infrastructure layer.
//!
//! # What does NOT belong here?
//!
//! - Broker connections, event loops or TLS (infrastructure)
//! - Task spawning and shutdown (infrastructure)
//! - Topic and tristate parsing rules (`gbridge-core`)

pub mod forward_command;

pub use forward_command::{
    CommandPublisher, ForwardCommandUseCase, ForwardError, IgnoreReason, Outcome,
};
