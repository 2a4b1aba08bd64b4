use common::ErrorLocation;

use presence_core::error::CoreError;

use models::ModelError;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the demo host.
///
/// Library errors are flattened to their message so the whole enum stays
/// serializable for structured reporting.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum AppError {
    /// Error from this App
    #[error("App Error: {message} {location}")]
    App {
        message: String,
        location: ErrorLocation,
    },

    /// Error from presence-core operations (config, login, activity updates)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// No client id in the environment or the config file
    #[error("Missing Client Id Error: {message} {location}")]
    MissingClientId {
        message: String,
        location: ErrorLocation,
    },

    /// The activity could not be built
    #[error("Activity Error: {message} {location}")]
    Activity {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for AppError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        AppError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ModelError> for AppError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        AppError::Activity {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
