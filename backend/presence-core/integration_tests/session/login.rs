use super::helpers::{TEST_CLIENT_ID, connector, login, ready_ack, session, settings};

use presence_core::error::endpoint::EndpointError;
use presence_core::error::session::SessionError;
use presence_core::frame::{Frame, Opcode};
use presence_core::session::{Session, SessionState};

use std::time::Duration;

use serde_json::json;

// ============================================================================
// login() - handshake and readiness
// ============================================================================

/// **VALUE**: Verifies the reference login: client id "abc123", minimal acknowledgement.
///
/// **WHY THIS MATTERS**: This is the path every host takes before any presence is shown.
///
/// **BUG THIS CATCHES**: Would catch a wrong handshake payload, a strict acknowledgement
/// decode, or a state machine that never reaches Ready.
#[tokio::test]
async fn given_companion_acknowledges_when_logging_in_then_session_is_ready() {
    // GIVEN: A fresh session and a companion
    let (session, mut companion) = session(Duration::from_secs(2));
    assert_eq!(session.state().await, SessionState::Disconnected);

    // WHEN: Logging in while the companion acknowledges
    let (result, handshake) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        let handshake = companion.expect_json(Opcode::Handshake).await;
        companion.reply(ready_ack()).await;
        handshake
    });

    // THEN: Ready, with the expected handshake and metadata
    result.expect("Login should succeed");
    assert_eq!(handshake, json!({"v": "1", "client_id": "abc123"}));
    assert_eq!(session.state().await, SessionState::Ready);
    assert_eq!(session.ready_info().await.map(|ready| ready.v), Some(1));
}

/// **VALUE**: Verifies that a successful login writes exactly one handshake frame.
///
/// **WHY THIS MATTERS**: A duplicate handshake is a protocol violation the companion
/// answers by closing the connection.
///
/// **BUG THIS CATCHES**: Would catch retry loops or double sends in the handshake path.
#[tokio::test]
async fn given_successful_login_when_watching_wire_then_only_one_handshake_was_sent() {
    // GIVEN: A logged-in session
    let (session, mut companion) = session(Duration::from_secs(2));
    login(&session, &mut companion).await;

    // WHEN: Watching for further frames
    let silent = companion.is_silent().await;

    // THEN: Nothing else was written
    assert!(silent, "Only the handshake frame should have been written");
}

/// **VALUE**: Verifies that logging in again while Ready is a no-op.
///
/// **WHY THIS MATTERS**: Hosts call login on every focus change; each call must not open a
/// new channel or repeat the handshake.
///
/// **BUG THIS CATCHES**: Would catch a missing Ready short-circuit.
#[tokio::test]
async fn given_ready_session_when_logging_in_again_then_no_new_connection_or_frame() {
    // GIVEN: A logged-in session
    let (connector, mut companions) = connector(2);
    let mut spare = companions.pop().expect("spare companion");
    let mut companion = companions.pop().expect("first companion");
    let session = Session::with_connector(connector, settings(Duration::from_secs(2)));
    login(&session, &mut companion).await;

    // WHEN: Logging in again
    let result = session.login(TEST_CLIENT_ID).await;

    // THEN: Success without side effects
    assert!(result.is_ok());
    assert!(companion.is_silent().await, "No second handshake expected");
    assert!(spare.is_silent().await, "Spare pipe should stay unused");
    assert_eq!(session.state().await, SessionState::Ready);
}

/// **VALUE**: Verifies that an error event in the acknowledgement rejects the login and
/// leaves the session not Ready, so activity updates stay no-ops.
///
/// **WHY THIS MATTERS**: A wrong client id must not leave a half-open session that later
/// sends updates the companion will refuse.
///
/// **BUG THIS CATCHES**: Would catch a rejected handshake that still transitions to Ready
/// or leaks the channel.
#[tokio::test]
async fn given_error_acknowledgement_when_logging_in_then_handshake_rejected_and_not_ready() {
    // GIVEN: A companion that refuses the client id
    let (session, mut companion) = session(Duration::from_secs(2));

    // WHEN: Logging in
    let (result, _) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        companion.expect_json(Opcode::Handshake).await;
        companion
            .reply(json!({"cmd": "DISPATCH", "evt": "ERROR", "data": "invalid client id"}))
            .await;
    });

    // THEN: HandshakeRejected, Disconnected, channel closed
    match result {
        Err(SessionError::HandshakeRejected { detail, .. }) => {
            assert_eq!(detail, "invalid client id")
        }
        other => panic!("Expected HandshakeRejected, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(companion.is_closed().await, "Channel should be closed");

    // AND: A subsequent activity update is a silent no-op
    let activity = models::ActivityBuilder::default()
        .with_details("Playing")
        .build()
        .expect("valid");
    assert!(session.set_activity(&activity).await.is_ok());
}

/// **VALUE**: Verifies that a close frame in answer to the handshake is a rejection.
///
/// **WHY THIS MATTERS**: This is how the companion actually refuses an unknown client id;
/// the reason only appears in the close payload.
///
/// **BUG THIS CATCHES**: Would catch a close frame surfaced as a generic transport error.
#[tokio::test]
async fn given_close_frame_after_handshake_when_logging_in_then_handshake_rejected_with_reason() {
    // GIVEN: A companion that closes
    let (session, mut companion) = session(Duration::from_secs(2));

    // WHEN: Logging in
    let (result, _) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        companion.expect_json(Opcode::Handshake).await;
        companion
            .send(Frame::new(
                Opcode::Close,
                br#"{"code":4000,"message":"Invalid Client ID"}"#.to_vec(),
            ))
            .await;
    });

    // THEN: Rejection carrying the reason
    match result {
        Err(SessionError::HandshakeRejected { detail, .. }) => {
            assert!(detail.contains("Invalid Client ID"));
            assert!(detail.contains("4000"));
        }
        other => panic!("Expected HandshakeRejected, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Disconnected);
}

/// **VALUE**: Verifies that no reachable endpoint surfaces as EndpointExhausted.
///
/// **WHY THIS MATTERS**: "Companion not running" is the most common failure; hosts retry
/// later based on this exact error.
///
/// **BUG THIS CATCHES**: Would catch the error being wrapped in something hosts cannot
/// match on, or the state being left in Connecting.
#[tokio::test]
async fn given_no_endpoint_when_logging_in_then_returns_endpoint_exhausted() {
    // GIVEN: A connector with nothing to connect to
    let (connector, _) = connector(0);
    let session = Session::with_connector(connector, settings(Duration::from_secs(2)));

    // WHEN: Logging in
    let result = session.login(TEST_CLIENT_ID).await;

    // THEN: EndpointExhausted, Disconnected
    assert!(matches!(
        result,
        Err(SessionError::Endpoint(EndpointError::Exhausted { .. }))
    ));
    assert_eq!(session.state().await, SessionState::Disconnected);
}

/// **VALUE**: Verifies that a silent companion bounds login by the response timeout.
///
/// **WHY THIS MATTERS**: The companion is an external process that can hang; an unbounded
/// wait would freeze the host's startup.
///
/// **BUG THIS CATCHES**: Would catch a receive without timeout.
#[tokio::test]
async fn given_silent_companion_when_logging_in_then_times_out_and_disconnects() {
    // GIVEN: A companion that reads but never answers
    let (session, mut companion) = session(Duration::from_millis(100));

    // WHEN: Logging in
    let (result, _) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        companion.expect_json(Opcode::Handshake).await;
    });

    // THEN: ResponseTimeout, Disconnected
    assert!(matches!(result, Err(SessionError::ResponseTimeout { .. })));
    assert_eq!(session.state().await, SessionState::Disconnected);
}

/// **VALUE**: Verifies that an acknowledgement without `data` still logs in.
///
/// **WHY THIS MATTERS**: Some companion builds answer the handshake with a bare READY
/// event; treating that as malformed locks those users out.
///
/// **BUG THIS CATCHES**: Would catch `null` data being decoded strictly into metadata.
#[tokio::test]
async fn given_acknowledgement_without_data_when_logging_in_then_ready_with_default_metadata() {
    // GIVEN: A companion acknowledging with no data
    let (session, mut companion) = session(Duration::from_secs(2));

    // WHEN: Logging in
    let (result, _) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        companion.expect_json(Opcode::Handshake).await;
        companion
            .reply(json!({"cmd": "DISPATCH", "evt": "READY"}))
            .await;
    });

    // THEN: Ready with empty metadata
    result.expect("Login should succeed");
    assert_eq!(session.state().await, SessionState::Ready);
    assert_eq!(session.ready_info().await, Some(models::ReadyInfo::default()));
}

/// **VALUE**: Verifies that null user fields in the acknowledgement do not fail login.
///
/// **WHY THIS MATTERS**: The companion sends `null` for values it does not have; login
/// must not depend on cosmetic metadata.
///
/// **BUG THIS CATCHES**: Would catch a Decode error (and teardown) on `"bot": null`.
#[tokio::test]
async fn given_null_user_fields_when_logging_in_then_ready() {
    // GIVEN: A companion whose acknowledgement carries nulls
    let (session, mut companion) = session(Duration::from_secs(2));

    // WHEN: Logging in
    let (result, _) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        companion.expect_json(Opcode::Handshake).await;
        companion
            .reply(json!({
                "cmd": "DISPATCH",
                "evt": "READY",
                "data": {
                    "v": 1,
                    "config": {},
                    "user": {"username": "player", "flags": null, "bot": null},
                },
            }))
            .await;
    });

    // THEN: Ready, username kept
    result.expect("Login should succeed");
    assert_eq!(session.state().await, SessionState::Ready);
    assert_eq!(
        session.ready_info().await.map(|ready| ready.user.username),
        Some(String::from("player"))
    );
}
