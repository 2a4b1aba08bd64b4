use crate::error::endpoint::EndpointError;
use crate::error::frame::FrameError;

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The companion process declined the handshake.
    #[error("Handshake Rejected Error: {detail} {location}")]
    HandshakeRejected {
        detail: String,
        location: ErrorLocation,
    },

    /// The companion process declined an activity update. The session stays ready.
    #[error("Activity Rejected Error: {detail} {location}")]
    ActivityRejected {
        detail: String,
        location: ErrorLocation,
    },

    #[error("Response Timeout Error: no reply within {}ms {location}", .timeout.as_millis())]
    ResponseTimeout {
        timeout: Duration,
        location: ErrorLocation,
    },

    /// The connection went away while a reply was outstanding.
    #[error("Connection Lost Error: {message} {location}")]
    ConnectionLost {
        message: String,
        location: ErrorLocation,
    },

    #[error("Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },
}

impl From<serde_json::Error> for SessionError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        SessionError::Serialization {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
