use super::helpers::{connector, login, session, settings};

use presence_core::error::session::SessionError;
use presence_core::frame::Opcode;
use presence_core::session::{Session, SessionState};

use models::ActivityBuilder;

use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// logout()
// ============================================================================

/// **VALUE**: Verifies that logout closes the channel and is idempotent.
///
/// **WHY THIS MATTERS**: Hosts call logout from shutdown paths that may run more than once.
///
/// **BUG THIS CATCHES**: Would catch a second logout erroring on an already-closed channel.
#[tokio::test]
async fn given_ready_session_when_logging_out_twice_then_both_succeed_and_channel_closes() {
    // GIVEN: A logged-in session
    let (session, mut companion) = session(Duration::from_secs(2));
    login(&session, &mut companion).await;

    // WHEN: Logging out twice
    let first = session.logout().await;
    let second = session.logout().await;

    // THEN: Both succeed, Closed, companion sees end of stream
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(session.state().await, SessionState::Closed);
    assert!(session.ready_info().await.is_none());
    assert!(companion.is_closed().await);
}

/// **VALUE**: Verifies that logout works on a session that never connected.
///
/// **WHY THIS MATTERS**: Shutdown must not depend on whether login ever succeeded.
///
/// **BUG THIS CATCHES**: Would catch logout assuming a connection exists.
#[tokio::test]
async fn given_disconnected_session_when_logging_out_then_ok_and_closed() {
    // GIVEN: A fresh session
    let (session, _companion) = session(Duration::from_secs(2));

    // WHEN: Logging out
    let result = session.logout().await;

    // THEN: Closed
    assert!(result.is_ok());
    assert_eq!(session.state().await, SessionState::Closed);
}

/// **VALUE**: Verifies that a session can log in again after logout.
///
/// **WHY THIS MATTERS**: Hosts toggle presence on and off without recreating the session.
///
/// **BUG THIS CATCHES**: Would catch Closed being treated as terminal.
#[tokio::test]
async fn given_logged_out_session_when_logging_in_again_then_ready_on_new_channel() {
    // GIVEN: A session that logged in and out
    let (connector, mut companions) = connector(2);
    let mut second = companions.pop().expect("second companion");
    let mut first = companions.pop().expect("first companion");
    let session = Session::with_connector(connector, settings(Duration::from_secs(2)));
    login(&session, &mut first).await;
    session.logout().await.expect("Logout should succeed");

    // WHEN: Logging in again
    login(&session, &mut second).await;

    // THEN: Ready, on the second channel
    assert_eq!(session.state().await, SessionState::Ready);
    assert!(first.is_closed().await);
}

/// **VALUE**: Verifies that logout interrupts an update stuck waiting for a reply.
///
/// **WHY THIS MATTERS**: Shutdown should not wait out the full response timeout.
///
/// **BUG THIS CATCHES**: Would catch logout queuing behind the operation lock without
/// cancelling the in-flight request.
#[tokio::test]
async fn given_update_in_flight_when_logging_out_then_update_fails_with_connection_lost() {
    // GIVEN: A logged-in session with a long response timeout
    let (session, mut companion) = session(Duration::from_secs(30));
    login(&session, &mut companion).await;
    let session = Arc::new(session);

    // AND: An update the companion never answers
    let in_flight = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let activity = ActivityBuilder::default()
                .with_details("Playing")
                .build()
                .expect("valid");
            session.set_activity(&activity).await
        })
    };
    companion.expect_json(Opcode::Frame).await;

    // WHEN: Logging out
    let logout = tokio::time::timeout(Duration::from_secs(2), session.logout())
        .await
        .expect("Logout should not wait for the response timeout");

    // THEN: Logout succeeds and the update was cut short
    assert!(logout.is_ok());
    let update = in_flight.await.expect("Task should not panic");
    assert!(
        matches!(update, Err(SessionError::ConnectionLost { .. })),
        "Expected ConnectionLost, got {update:?}"
    );
    assert_eq!(session.state().await, SessionState::Closed);
}
