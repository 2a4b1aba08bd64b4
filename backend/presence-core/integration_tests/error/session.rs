use presence_core::error::CoreError;
use presence_core::error::endpoint::EndpointError;
use presence_core::error::frame::FrameError;
use presence_core::error::session::SessionError;

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;
use std::time::Duration;

/// **VALUE**: Verifies that `SessionError::HandshakeRejected` carries the companion's
/// detail and the file location.
///
/// **WHY THIS MATTERS**: The detail is the only hint that the client id is wrong; the
/// location tells developers which step produced it.
///
/// **BUG THIS CATCHES**: Would catch a Display format that drops either field.
#[test]
#[track_caller]
fn given_handshake_rejected_when_formatted_then_includes_detail_and_location() {
    // GIVEN: A rejection with location
    let err = SessionError::HandshakeRejected {
        detail: "Invalid Client ID (code 4000)".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting the error as string
    let error_string = format!("{}", err);

    // THEN: Should include error type, detail, and file location
    assert!(error_string.contains("Handshake Rejected Error"));
    assert!(error_string.contains("Invalid Client ID"));
    assert!(error_string.contains("session.rs"));
}

/// **VALUE**: Verifies that `SessionError::ResponseTimeout` reports the timeout used.
///
/// **WHY THIS MATTERS**: Timeouts are configurable; the message should say which value
/// was in force.
///
/// **BUG THIS CATCHES**: Would catch the timeout printed in the wrong unit.
#[test]
#[track_caller]
fn given_response_timeout_when_formatted_then_includes_milliseconds() {
    // GIVEN: A timeout error
    let err = SessionError::ResponseTimeout {
        timeout: Duration::from_millis(1500),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Formatting the error as string
    let error_string = err.to_string();

    // THEN: The timeout appears in milliseconds
    assert!(error_string.contains("Response Timeout Error"));
    assert!(error_string.contains("1500ms"));
}

/// **VALUE**: Verifies that endpoint and frame errors pass through `SessionError`
/// unchanged.
///
/// **WHY THIS MATTERS**: Hosts match on `SessionError::Endpoint` to decide whether to
/// retry later; wrapping would hide the attempt count.
///
/// **BUG THIS CATCHES**: Would catch a non-transparent wrapper that prefixes or drops the
/// inner message.
#[test]
fn given_endpoint_error_when_converted_to_session_error_then_message_is_preserved() {
    // GIVEN: An exhausted endpoint error
    let inner = EndpointError::Exhausted {
        message: "No endpoint accepted a connection".to_string(),
        attempts: 30,
        location: ErrorLocation::from(Location::caller()),
    };
    let expected = inner.to_string();

    // WHEN: Converting it
    let err: SessionError = inner.into();

    // THEN: Same message, matchable variant
    assert_eq!(err.to_string(), expected);
    assert!(expected.contains("30 candidates tried"));
    assert!(matches!(
        err,
        SessionError::Endpoint(EndpointError::Exhausted { attempts: 30, .. })
    ));
}

/// **VALUE**: Verifies that IO failures become `FrameError::Io` at the conversion site.
///
/// **WHY THIS MATTERS**: `?` on socket reads is the most common error path; the location
/// must point at our code, not the standard library.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[track_caller]` on the `From` impl.
#[test]
fn given_io_error_when_converted_then_frame_error_records_this_file() {
    // GIVEN: An IO error
    let io = IoError::new(ErrorKind::BrokenPipe, "pipe closed");

    // WHEN: Converting it, then lifting it into the crate-level error
    let frame = FrameError::from(io);
    let core: CoreError = SessionError::from(frame).into();

    // THEN: The message and location survive both conversions
    let error_string = core.to_string();
    assert!(error_string.contains("IO Error"));
    assert!(error_string.contains("pipe closed"));
    assert!(error_string.contains("session.rs"));
}
