use super::helpers::{Companion, DuplexConnector, connector, login, session, settings};

use presence_core::error::session::SessionError;
use presence_core::frame::Opcode;
use presence_core::response::Notification;
use presence_core::session::{Session, SessionState};

use models::{Activity, ActivityBuilder, ActivityType};

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::timeout;

fn playing() -> Activity {
    ActivityBuilder::default()
        .with_kind(ActivityType::Playing)
        .with_details("Playing")
        .with_state("In Game")
        .with_start(1_700_000_000)
        .build()
        .expect("Activity should be valid")
}

async fn ready_session(response_timeout: Duration) -> (Session<DuplexConnector>, Companion) {
    let (session, mut companion) = session(response_timeout);
    login(&session, &mut companion).await;
    (session, companion)
}

/// Read one `SET_ACTIVITY` request and answer it with `reply` plus the request's nonce.
async fn answer(companion: &mut Companion, mut reply: Value) -> Value {
    let request = companion.expect_json(Opcode::Frame).await;
    reply["nonce"] = request["nonce"].clone();
    companion.reply(reply).await;
    request
}

// ============================================================================
// set_activity() - gating
// ============================================================================

/// **VALUE**: Verifies that updates before login are dropped silently.
///
/// **WHY THIS MATTERS**: Hosts publish presence whether or not the companion is running;
/// that must never surface as an error or open a connection.
///
/// **BUG THIS CATCHES**: Would catch a missing readiness gate or an implicit connect.
#[tokio::test]
async fn given_never_logged_in_when_setting_activity_then_ok_without_connecting() {
    // GIVEN: A session that never logged in
    let (connector, _companions) = connector(1);
    let session = Session::with_connector(connector, settings(Duration::from_secs(2)));

    // WHEN: Setting an activity
    let result = session.set_activity(&playing()).await;

    // THEN: Success, still Disconnected
    assert!(result.is_ok());
    assert_eq!(session.state().await, SessionState::Disconnected);
}

// ============================================================================
// set_activity() - wire behavior
// ============================================================================

/// **VALUE**: Verifies the SET_ACTIVITY request shape for a Playing activity.
///
/// **WHY THIS MATTERS**: The companion ignores requests without our pid or nonce, and
/// shows whatever we put in `activity`.
///
/// **BUG THIS CATCHES**: Would catch a missing pid, a missing nonce, or a wrongly encoded
/// activity type.
#[tokio::test]
async fn given_ready_session_when_setting_activity_then_sends_set_activity_with_pid_and_nonce() {
    // GIVEN: A logged-in session
    let (session, mut companion) = ready_session(Duration::from_secs(2)).await;

    // WHEN: Setting an activity while the companion accepts it
    let activity = playing();
    let (result, request) = tokio::join!(
        session.set_activity(&activity),
        answer(&mut companion, json!({"cmd": "SET_ACTIVITY", "data": {}}))
    );

    // THEN: Accepted, request well-formed
    result.expect("Activity should be accepted");
    assert_eq!(request["cmd"], "SET_ACTIVITY");
    assert_eq!(request["args"]["pid"], json!(std::process::id()));
    assert_eq!(request["args"]["activity"]["type"], 0);
    assert_eq!(request["args"]["activity"]["details"], "Playing");
    assert_eq!(request["args"]["activity"]["state"], "In Game");
    assert_eq!(
        request["args"]["activity"]["timestamps"]["start"],
        json!(1_700_000_000u64)
    );
    assert!(
        request["nonce"].as_str().is_some_and(|nonce| !nonce.is_empty()),
        "Request should carry a nonce"
    );
    assert_eq!(session.state().await, SessionState::Ready);
}

/// **VALUE**: Verifies that each request carries a fresh nonce.
///
/// **WHY THIS MATTERS**: Replies are matched by nonce; reuse would hand one request's
/// reply to another.
///
/// **BUG THIS CATCHES**: Would catch a nonce generated once per session.
#[tokio::test]
async fn given_two_updates_when_sent_then_nonces_differ() {
    // GIVEN: A logged-in session
    let (session, mut companion) = ready_session(Duration::from_secs(2)).await;
    let accept = json!({"cmd": "SET_ACTIVITY", "data": {}});

    // WHEN: Sending two updates
    let activity = playing();
    let (_, first) = tokio::join!(
        session.set_activity(&activity),
        answer(&mut companion, accept.clone())
    );
    let (_, second) = tokio::join!(
        session.set_activity(&activity),
        answer(&mut companion, accept)
    );

    // THEN: Different nonces
    assert_ne!(first["nonce"], second["nonce"]);
}

/// **VALUE**: Verifies that clearing presence sends an explicit null activity.
///
/// **WHY THIS MATTERS**: Omitting the field is not the same as clearing it.
///
/// **BUG THIS CATCHES**: Would catch `skip_serializing_if` applied to the activity field.
#[tokio::test]
async fn given_ready_session_when_clearing_activity_then_sends_null_activity() {
    // GIVEN: A logged-in session
    let (session, mut companion) = ready_session(Duration::from_secs(2)).await;

    // WHEN: Clearing the activity
    let (result, request) = tokio::join!(
        session.clear_activity(),
        answer(&mut companion, json!({"cmd": "SET_ACTIVITY", "data": null}))
    );

    // THEN: Explicit null
    result.expect("Clear should be accepted");
    let args = request["args"].as_object().expect("args object");
    assert_eq!(args.get("activity"), Some(&Value::Null));
}

// ============================================================================
// set_activity() - failures
// ============================================================================

/// **VALUE**: Verifies that an error reply surfaces as ActivityRejected and keeps the
/// session Ready.
///
/// **WHY THIS MATTERS**: A rejected update (bad asset key, rate limit) is not a broken
/// connection; the next update should go through without a new login.
///
/// **BUG THIS CATCHES**: Would catch rejections that tear the session down, that are
/// reported as success, or nonce-less replies that never reach the waiting request.
#[tokio::test]
async fn given_error_reply_when_setting_activity_then_activity_rejected_and_still_ready() {
    // GIVEN: A logged-in session
    let (session, mut companion) = ready_session(Duration::from_secs(2)).await;

    // WHEN: The companion rejects the update with a bare, nonce-less error
    let activity = playing();
    let (result, _) = tokio::join!(session.set_activity(&activity), async {
        companion.expect_json(Opcode::Frame).await;
        companion
            .reply(json!({"evt": "ERROR", "data": "invalid client id"}))
            .await;
    });

    // THEN: ActivityRejected with the detail, still Ready
    match result {
        Err(SessionError::ActivityRejected { detail, .. }) => {
            assert_eq!(detail, "invalid client id")
        }
        other => panic!("Expected ActivityRejected, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Ready);
}

/// **VALUE**: Verifies that an unsolicited event arriving before the reply is routed to
/// notifications and does not satisfy the request.
///
/// **WHY THIS MATTERS**: The companion pushes events at any time; reading "the next frame"
/// as the reply would misreport the outcome of the update.
///
/// **BUG THIS CATCHES**: Would catch strict request/response reading without correlation.
#[tokio::test]
async fn given_interleaved_event_when_setting_activity_then_event_goes_to_notifications() {
    // GIVEN: A logged-in session and its notification receiver
    let (session, mut companion) = ready_session(Duration::from_secs(2)).await;
    let mut notifications = session
        .take_notifications()
        .expect("Notifications should be available after login");

    // WHEN: An event arrives ahead of the nonce-matched error reply
    let activity = playing();
    let (result, _) = tokio::join!(session.set_activity(&activity), async {
        let request = companion.expect_json(Opcode::Frame).await;
        companion
            .reply(json!({"cmd": "DISPATCH", "evt": "ACTIVITY_JOIN", "data": {"secret": "s"}}))
            .await;
        companion
            .reply(json!({
                "cmd": "SET_ACTIVITY",
                "evt": "ERROR",
                "data": {"code": 4000, "message": "bad asset"},
                "nonce": request["nonce"],
            }))
            .await;
    });

    // THEN: The request got its own reply
    assert!(matches!(result, Err(SessionError::ActivityRejected { .. })));

    // AND: The event was published
    let notification = timeout(Duration::from_secs(1), notifications.recv())
        .await
        .expect("Notification should arrive")
        .expect("Channel should be open");
    match notification {
        Notification::Event(event) => {
            assert_eq!(event.event.as_deref(), Some("ACTIVITY_JOIN"));
        }
        other => panic!("Expected an event, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a silent companion times out the update but keeps the session.
///
/// **WHY THIS MATTERS**: A slow companion should not force the host to log in again.
///
/// **BUG THIS CATCHES**: Would catch an unbounded wait, or a timeout that tears down the
/// connection.
#[tokio::test]
async fn given_silent_companion_when_setting_activity_then_times_out_and_stays_ready() {
    // GIVEN: A logged-in session with a short response timeout
    let (session, mut companion) = ready_session(Duration::from_millis(100)).await;

    // WHEN: The companion reads the request but never answers
    let activity = playing();
    let (result, _) = tokio::join!(session.set_activity(&activity), async {
        companion.expect_json(Opcode::Frame).await;
    });

    // THEN: ResponseTimeout, still Ready
    assert!(matches!(result, Err(SessionError::ResponseTimeout { .. })));
    assert_eq!(session.state().await, SessionState::Ready);
}

/// **VALUE**: Verifies that a nonce-less error arriving after an update timed out does not
/// fail the next update.
///
/// **WHY THIS MATTERS**: A slow companion eventually answers the abandoned request; that
/// answer belongs to nobody still waiting.
///
/// **BUG THIS CATCHES**: Would catch a late bare error being handed to the newer request.
#[tokio::test]
async fn given_late_error_after_timeout_when_setting_activity_again_then_next_update_succeeds() {
    // GIVEN: An update that timed out
    let (session, mut companion) = ready_session(Duration::from_millis(100)).await;
    let activity = playing();
    let (result, _) = tokio::join!(session.set_activity(&activity), async {
        companion.expect_json(Opcode::Frame).await;
    });
    assert!(matches!(result, Err(SessionError::ResponseTimeout { .. })));

    // WHEN: Its nonce-less error arrives late, then a second update is answered normally
    companion
        .reply(json!({"evt": "ERROR", "data": "invalid client id"}))
        .await;
    let (result, _) = tokio::join!(session.set_activity(&activity), async {
        answer(&mut companion, json!({"cmd": "SET_ACTIVITY", "data": null})).await;
    });

    // THEN: The second update succeeds
    assert!(result.is_ok(), "Expected success, got {result:?}");
    assert_eq!(session.state().await, SessionState::Ready);
}

/// **VALUE**: Verifies that a companion exiting mid-session is detected and later updates
/// are no-ops.
///
/// **WHY THIS MATTERS**: Users quit the companion while hosts keep running; the host must
/// learn the session ended and stop erroring on every update.
///
/// **BUG THIS CATCHES**: Would catch a session stuck in Ready after EOF.
#[tokio::test]
async fn given_companion_hangs_up_when_setting_activity_then_connection_lost_and_disconnected() {
    // GIVEN: A logged-in session whose companion goes away
    let (session, companion) = ready_session(Duration::from_secs(2)).await;
    companion.hang_up();

    // WHEN: Setting an activity
    let result = session.set_activity(&playing()).await;

    // THEN: A transport failure, Disconnected
    assert!(
        matches!(
            result,
            Err(SessionError::ConnectionLost { .. }) | Err(SessionError::Frame(_))
        ),
        "Expected a transport failure, got {result:?}"
    );
    assert_eq!(session.state().await, SessionState::Disconnected);

    // AND: The next update is a silent no-op
    assert!(session.set_activity(&playing()).await.is_ok());
}
