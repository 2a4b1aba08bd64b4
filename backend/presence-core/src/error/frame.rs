use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FrameError {
    /// The stream ended cleanly on a frame boundary.
    #[error("Stream Closed {location}")]
    Closed { location: ErrorLocation },

    /// The stream ended partway through a header or payload.
    #[error("Truncated Frame Error: expected {expected} bytes, received {received} {location}")]
    Truncated {
        expected: usize,
        received: usize,
        location: ErrorLocation,
    },

    /// The payload is longer than the 32-bit length field can describe.
    #[error("Oversized Frame Error: {length} bytes exceeds {max} {location}", max = u32::MAX)]
    Oversized {
        length: usize,
        location: ErrorLocation,
    },

    #[error("Unknown Opcode Error: {opcode} {location}")]
    UnknownOpcode { opcode: u32, location: ErrorLocation },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for FrameError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        FrameError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
