//! Shared building blocks for the presence workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing shared by every crate
//! - **models**: Pure presence data (activities, handshake metadata)
//! - **presence-core**: IPC client operating on models
//! - **presence-demo**: Host application wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
