use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum EndpointError {
    /// Every candidate for ordinals 0-9 was tried and none accepted a connection.
    #[error("Endpoint Exhausted Error: {message} ({attempts} candidates tried) {location}")]
    Exhausted {
        message: String,
        attempts: usize,
        location: ErrorLocation,
    },
}
