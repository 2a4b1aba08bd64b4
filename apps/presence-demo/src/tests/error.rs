// Unit tests for error module
// Tests error serialization and conversions from library errors

use crate::error::AppError;

use common::ErrorLocation;

use models::ActivityBuilder;

use presence_core::error::CoreError;
use presence_core::error::session::SessionError;

use std::panic::Location;

/// **VALUE**: Tests that errors can be serialized for structured reporting.
///
/// **WHY THIS MATTERS**: Hosts forward errors to crash reporters and UIs as JSON. If
/// serialization breaks, they receive opaque strings.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or adds a non-serializable field.
#[test]
fn given_app_error_when_serialized_then_contains_variant_and_message() {
    // GIVEN: An AppError
    let err = AppError::MissingClientId {
        message: String::from("Test"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_string(&err).expect("Error should be serializable");

    // THEN: Should contain the error data
    assert!(
        json.contains("MissingClientId"),
        "JSON should contain variant name"
    );
    assert!(json.contains("Test"), "JSON should contain message");
}

/// **VALUE**: Verifies that core errors keep their message when lifted into `AppError`.
///
/// **WHY THIS MATTERS**: The demo prints the final error; the companion's rejection detail
/// is the only actionable part of it.
///
/// **BUG THIS CATCHES**: Would catch a conversion that replaces the message with a generic
/// one.
#[test]
fn given_core_error_when_converted_then_message_is_preserved() {
    // GIVEN: A rejected handshake
    let core: CoreError = SessionError::HandshakeRejected {
        detail: String::from("Invalid Client ID (code 4000)"),
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    // WHEN: Converting
    let err = AppError::from(core);

    // THEN: Core variant with the detail
    assert!(matches!(err, AppError::Core { .. }));
    assert!(err.to_string().contains("Invalid Client ID"));
}

/// **VALUE**: Verifies that builder validation failures become `AppError::Activity`.
///
/// **WHY THIS MATTERS**: A bad activity is a programming error in the host, distinct from
/// the companion being unavailable.
///
/// **BUG THIS CATCHES**: Would catch model errors being folded into `Core`.
#[test]
fn given_model_error_when_converted_then_activity_variant() {
    // GIVEN: An activity with an invalid button
    let model = ActivityBuilder::default()
        .with_button("", "https://example.com")
        .build()
        .expect_err("Blank label should be rejected");

    // WHEN: Converting
    let err = AppError::from(model);

    // THEN: Activity variant
    assert!(matches!(err, AppError::Activity { .. }));
}
