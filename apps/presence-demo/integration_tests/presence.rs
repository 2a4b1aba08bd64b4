use presence_demo::error::AppError;
use presence_demo::presence::{DEMO_DETAILS, login_with_retry, run};

use common::ErrorLocation;

use presence_core::config::IpcSettings;
use presence_core::endpoint::Connector;
use presence_core::error::CoreError;
use presence_core::error::endpoint::EndpointError;
use presence_core::error::session::SessionError;
use presence_core::frame::{Frame, Opcode, read_frame, write_frame};
use presence_core::session::{Session, SessionState};

use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{DuplexStream, duplex};

/// Refuses the first `failures` connects, then hands out its one stream.
struct FlakyConnector {
    failures: usize,
    attempts: Arc<AtomicUsize>,
    stream: Mutex<Option<DuplexStream>>,
}

impl Connector for FlakyConnector {
    type Stream = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream, EndpointError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let stream = if attempt < self.failures {
            None
        } else {
            self.stream.lock().expect("connector lock").take()
        };

        stream.ok_or_else(|| EndpointError::Exhausted {
            message: String::from("Companion not running"),
            attempts: 30,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

fn session_with(failures: usize) -> (Session<FlakyConnector>, DuplexStream, Arc<AtomicUsize>) {
    let (session_end, companion_end) = duplex(64 * 1024);
    let attempts = Arc::new(AtomicUsize::new(0));
    let connector = FlakyConnector {
        failures,
        attempts: Arc::clone(&attempts),
        stream: Mutex::new(Some(session_end)),
    };
    let settings = IpcSettings {
        base_dir: None,
        connect_timeout: Duration::from_millis(100),
        response_timeout: Duration::from_secs(2),
    };

    (
        Session::with_connector(connector, settings),
        companion_end,
        attempts,
    )
}

async fn read_json(stream: &mut DuplexStream) -> Value {
    let frame = read_frame(stream).await.expect("frame");
    serde_json::from_slice(&frame.payload).expect("json")
}

async fn write_json(stream: &mut DuplexStream, value: Value) {
    write_frame(stream, &Frame::new(Opcode::Frame, value.to_string()))
        .await
        .expect("write");
}

async fn acknowledge_handshake(stream: &mut DuplexStream) -> Value {
    let handshake = read_json(stream).await;
    write_json(stream, json!({"cmd": "DISPATCH", "data": {"v": 1}})).await;
    handshake
}

// ============================================================================
// login_with_retry()
// ============================================================================

/// **VALUE**: Verifies that login keeps retrying while the companion is not running yet.
///
/// **WHY THIS MATTERS**: Hosts often start before the companion; giving up on the first
/// refusal means presence never appears.
///
/// **BUG THIS CATCHES**: Would catch a retry loop that does not retry endpoint errors.
#[tokio::test]
async fn given_companion_starts_late_when_logging_in_with_retry_then_eventually_ready() {
    // GIVEN: A connector that refuses once
    let (session, mut companion, attempts) = session_with(1);

    // WHEN: Logging in with retry
    let (result, _) = tokio::join!(
        login_with_retry(&session, "abc123", Duration::from_secs(10)),
        acknowledge_handshake(&mut companion)
    );

    // THEN: Ready after two attempts
    assert!(result.is_ok(), "Expected success, got {result:?}");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(session.state().await, SessionState::Ready);
}

/// **VALUE**: Verifies that a rejected handshake is not retried.
///
/// **WHY THIS MATTERS**: A wrong client id stays wrong; retrying only spams the companion.
///
/// **BUG THIS CATCHES**: Would catch a retry loop that retries every error.
#[tokio::test]
async fn given_rejected_handshake_when_logging_in_with_retry_then_fails_without_retry() {
    // GIVEN: A companion that rejects the client id
    let (session, mut companion, attempts) = session_with(0);

    // WHEN: Logging in with retry
    let (result, _) = tokio::join!(
        login_with_retry(&session, "wrong", Duration::from_secs(10)),
        async {
            read_json(&mut companion).await;
            write_json(
                &mut companion,
                json!({"cmd": "DISPATCH", "evt": "ERROR", "data": "invalid client id"}),
            )
            .await;
        }
    );

    // THEN: One attempt, HandshakeRejected
    assert!(matches!(
        result,
        Err(CoreError::Session(SessionError::HandshakeRejected { .. }))
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies that retrying stops once the configured time is used up.
///
/// **WHY THIS MATTERS**: The demo must exit with a clear error when the companion never
/// starts, not hang forever.
///
/// **BUG THIS CATCHES**: Would catch `max_elapsed_time` not being applied.
#[tokio::test]
async fn given_companion_never_starts_when_logging_in_with_retry_then_gives_up() {
    // GIVEN: A connector that always refuses
    let (session, _companion, attempts) = session_with(usize::MAX);

    // WHEN: Logging in with a short retry budget
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        login_with_retry(&session, "abc123", Duration::from_millis(200)),
    )
    .await
    .expect("Retry loop should give up on its own");

    // THEN: The endpoint error is returned
    assert!(matches!(
        result,
        Err(CoreError::Session(SessionError::Endpoint(_)))
    ));
    assert!(attempts.load(Ordering::SeqCst) >= 1);
    assert_eq!(session.state().await, SessionState::Disconnected);
}

// ============================================================================
// run()
// ============================================================================

/// **VALUE**: Verifies the whole demo flow against a companion.
///
/// **WHY THIS MATTERS**: This is the reference usage of the library; if it breaks, every
/// host copying it breaks too.
///
/// **BUG THIS CATCHES**: Would catch the flow skipping logout or sending the wrong activity.
#[tokio::test]
async fn given_companion_when_running_demo_then_publishes_activity_and_logs_out() {
    // GIVEN: A cooperative companion
    let (session, mut companion, _) = session_with(0);

    // WHEN: Running the demo with no hold
    let (result, (handshake, request, eof)) = tokio::join!(
        run(&session, "abc123", Duration::from_secs(1), Duration::ZERO),
        async {
            let handshake = acknowledge_handshake(&mut companion).await;
            let request = read_json(&mut companion).await;
            write_json(
                &mut companion,
                json!({"cmd": "SET_ACTIVITY", "data": {}, "nonce": request["nonce"]}),
            )
            .await;
            let eof = read_frame(&mut companion).await.is_err();
            (handshake, request, eof)
        }
    );

    // THEN: Success, the expected frames, and a closed channel
    assert!(result.is_ok(), "Expected success, got {result:?}");
    assert_eq!(handshake["client_id"], "abc123");
    assert_eq!(request["args"]["activity"]["details"], DEMO_DETAILS);
    assert!(request["args"]["activity"]["timestamps"]["start"].is_u64());
    assert!(eof, "Logout should close the channel");
    assert_eq!(session.state().await, SessionState::Closed);
}

/// **VALUE**: Verifies that a rejected activity still logs out and reports the rejection.
///
/// **WHY THIS MATTERS**: Leaving the channel open after a failure keeps a stale presence
/// visible until the process exits.
///
/// **BUG THIS CATCHES**: Would catch `?` on the publish step skipping logout.
#[tokio::test]
async fn given_activity_rejected_when_running_demo_then_logs_out_and_returns_core_error() {
    // GIVEN: A companion that rejects the activity
    let (session, mut companion, _) = session_with(0);

    // WHEN: Running the demo
    let (result, _) = tokio::join!(
        run(&session, "abc123", Duration::from_secs(1), Duration::ZERO),
        async {
            acknowledge_handshake(&mut companion).await;
            let request = read_json(&mut companion).await;
            write_json(
                &mut companion,
                json!({
                    "cmd": "SET_ACTIVITY",
                    "evt": "ERROR",
                    "data": "bad asset",
                    "nonce": request["nonce"],
                }),
            )
            .await;
        }
    );

    // THEN: Core error with the detail, session closed
    match result {
        Err(AppError::Core { message, .. }) => assert!(message.contains("bad asset")),
        other => panic!("Expected AppError::Core, got {other:?}"),
    }
    assert_eq!(session.state().await, SessionState::Closed);
}
