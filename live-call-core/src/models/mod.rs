pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod media;
pub mod message;
pub mod setup;
pub mod state;
