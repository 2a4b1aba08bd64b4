//! Domain models for rich presence.
//!
//! This crate contains pure data structures describing what is sent to and
//! received from the companion process. Models have no I/O - they're just
//! data that the IPC core serializes and decodes.
//!
//! ## Architecture
//!
//! - **models** (this crate): Pure data structures
//! - **presence-core**: IPC client operating on models
//! - **presence-demo**: Application wiring everything together

pub mod activity;
pub mod error;
pub mod ready;

pub use activity::builder::ActivityBuilder;
pub use activity::{Activity, ActivityType, Assets, Button, Party, Secrets, Timestamps};
pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use ready::{PremiumType, ReadyInfo, ServerConfiguration, User};

#[cfg(test)]
mod tests;
