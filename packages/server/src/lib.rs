//! Real-time messaging relay for the tsunagi marketplace.
//!
//! This library provides the live connection and delivery subsystem: one
//! authenticated WebSocket session per user, direct and community message
//! routing on top of a durable store, presence notification, and typing
//! relay.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
