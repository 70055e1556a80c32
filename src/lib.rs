#![warn(clippy::missing_docs_in_private_items)]

//! Schedules lighting effects from game events and manual triggers onto a single addressable-led
//! fixture.

/// Runtime configuration, read from toml.
pub mod config;

/// The named effect registry.
pub mod catalog;

/// Serial-port executor and the device worker.
pub mod device;

/// Effect, color and queue policy types.
pub mod effects;

/// Game state integration payloads and the event tracker.
pub mod gsi;

/// Reactions to game events.
pub mod hooks;

/// The action scheduler and its executor contract.
pub mod scheduler;

/// This module contains all of the web/http server types and logic.
pub mod server;
