use presence_core::config::IpcSettings;
use presence_core::endpoint::{Connector, EndpointLocator, IpcConnector, MAX_ENDPOINTS};
use presence_core::error::endpoint::EndpointError;
use presence_core::frame::{Frame, Opcode, read_frame, write_frame};
use presence_core::session::{Session, SessionState};

use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::UnixListener;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

fn connector_for(dir: &Path) -> IpcConnector {
    IpcConnector::new(EndpointLocator::with_base_dir(dir), CONNECT_TIMEOUT)
}

// ============================================================================
// IpcConnector::connect()
// ============================================================================

/// **VALUE**: Verifies that an empty base directory yields EndpointExhausted after trying
/// every candidate.
///
/// **WHY THIS MATTERS**: "Companion not running" must be a distinct, matchable error so
/// hosts can retry later instead of treating it as a crash.
///
/// **BUG THIS CATCHES**: Would catch the search stopping early or panicking on a missing
/// socket file.
#[tokio::test]
async fn given_no_listener_when_connecting_then_exhausted_after_all_candidates() {
    // GIVEN: An empty base directory
    let dir = TempDir::new().expect("tempdir");
    let connector = connector_for(dir.path());

    // WHEN: Connecting
    let result = connector.connect().await;

    // THEN: Every candidate was tried
    let expected = connector.locator().all_candidates().len();
    assert_eq!(expected, usize::from(MAX_ENDPOINTS) * 3);
    match result {
        Err(EndpointError::Exhausted { attempts, .. }) => assert_eq!(attempts, expected),
        Ok(_) => panic!("Expected Exhausted, got a connection"),
    }
}

/// **VALUE**: Verifies that the first listening ordinal is found even when lower ones are
/// absent.
///
/// **WHY THIS MATTERS**: A second companion instance (e.g. a canary build) takes ordinal 1
/// or higher; we must keep scanning.
///
/// **BUG THIS CATCHES**: Would catch a scan that only tries ordinal 0.
#[tokio::test]
async fn given_listener_on_ordinal_two_when_connecting_then_connects() {
    // GIVEN: A listener on discord-ipc-2
    let dir = TempDir::new().expect("tempdir");
    let _listener = UnixListener::bind(dir.path().join("discord-ipc-2")).expect("bind");

    // WHEN: Connecting
    let result = connector_for(dir.path()).connect().await;

    // THEN: Connected
    assert!(result.is_ok(), "Expected a connection, got {:?}", result.err());
}

/// **VALUE**: Verifies that a flatpak-sandboxed companion is found.
///
/// **WHY THIS MATTERS**: Flatpak installs put the socket under `app/<app-id>/`; without
/// that candidate those users never see presence.
///
/// **BUG THIS CATCHES**: Would catch a dropped or misspelled sandbox subdirectory.
#[tokio::test]
async fn given_flatpak_socket_when_connecting_then_connects() {
    // GIVEN: A listener in the flatpak subdirectory
    let dir = TempDir::new().expect("tempdir");
    let sandbox = dir.path().join("app").join("com.discordapp.Discord");
    std::fs::create_dir_all(&sandbox).expect("mkdir");
    let _listener = UnixListener::bind(sandbox.join("discord-ipc-0")).expect("bind");

    // WHEN: Connecting
    let result = connector_for(dir.path()).connect().await;

    // THEN: Connected
    assert!(result.is_ok(), "Expected a connection, got {:?}", result.err());
}

// ============================================================================
// Session over a real socket
// ============================================================================

/// **VALUE**: Verifies login and an activity update end to end over a Unix socket.
///
/// **WHY THIS MATTERS**: In-memory pipes do not exercise the production connector, socket
/// half-splitting, or the base directory override from settings.
///
/// **BUG THIS CATCHES**: Would catch `Session::new` ignoring the configured base directory
/// or a codec that only works on in-memory streams.
#[tokio::test]
async fn given_companion_on_socket_when_session_logs_in_and_sets_activity_then_succeeds() {
    // GIVEN: A companion listening in a temp base directory
    let dir = TempDir::new().expect("tempdir");
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).expect("bind");

    let companion = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");

        let handshake = read_frame(&mut stream).await.expect("handshake");
        let handshake: Value = serde_json::from_slice(&handshake.payload).expect("json");
        let ack = json!({"cmd": "DISPATCH", "data": {"v": 1, "user": {"username": "tester"}}});
        write_frame(&mut stream, &Frame::new(Opcode::Frame, ack.to_string()))
            .await
            .expect("ack");

        let request = read_frame(&mut stream).await.expect("request");
        let request: Value = serde_json::from_slice(&request.payload).expect("json");
        let reply = json!({"cmd": "SET_ACTIVITY", "data": {}, "nonce": request["nonce"]});
        write_frame(&mut stream, &Frame::new(Opcode::Frame, reply.to_string()))
            .await
            .expect("reply");

        (handshake, request)
    });

    let session = Session::new(IpcSettings {
        base_dir: Some(dir.path().to_path_buf()),
        connect_timeout: CONNECT_TIMEOUT,
        response_timeout: Duration::from_secs(2),
    });

    // WHEN: Logging in and setting an activity
    session.login("abc123").await.expect("Login should succeed");
    let activity = models::ActivityBuilder::default()
        .with_details("Playing")
        .build()
        .expect("valid");
    session
        .set_activity(&activity)
        .await
        .expect("Activity should be accepted");

    // THEN: The companion saw both requests
    let (handshake, request) = companion.await.expect("Companion should not panic");
    assert_eq!(handshake["client_id"], "abc123");
    assert_eq!(request["cmd"], "SET_ACTIVITY");
    assert_eq!(session.state().await, SessionState::Ready);
    assert_eq!(
        session.ready_info().await.map(|ready| ready.user.username),
        Some("tester".to_string())
    );

    session.logout().await.expect("Logout should succeed");
}
