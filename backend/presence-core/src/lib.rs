//! Rich presence client for the locally running companion process.
//!
//! ```no_run
//! use presence_core::config::IpcSettings;
//! use presence_core::session::Session;
//! use models::{ActivityBuilder, ActivityType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(IpcSettings::default());
//!     session.login("your-client-id").await?;
//!
//!     let activity = ActivityBuilder::default()
//!         .with_kind(ActivityType::Playing)
//!         .with_details("Playing")
//!         .with_state("In Game")
//!         .build()?;
//!     session.set_activity(&activity).await?;
//!
//!     session.logout().await?;
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod response;
pub mod session;

#[cfg(test)]
mod tests;
