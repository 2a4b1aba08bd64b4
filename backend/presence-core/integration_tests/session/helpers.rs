//! Test helpers for session integration tests.
//!
//! A [`DuplexConnector`] hands the session one end of an in-memory pipe per
//! connect; the test drives the other end as a [`Companion`].

use presence_core::config::IpcSettings;
use presence_core::endpoint::Connector;
use presence_core::error::endpoint::EndpointError;
use presence_core::frame::{Frame, Opcode, read_frame, write_frame};
use presence_core::session::Session;

use common::ErrorLocation;

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{DuplexStream, duplex};
use tokio::time::timeout;

pub const TEST_CLIENT_ID: &str = "abc123";

/// How long the companion side waits for a frame before failing the test.
pub const FRAME_WAIT: Duration = Duration::from_secs(2);

/// How long to watch for a frame that should never arrive.
pub const SILENCE_WAIT: Duration = Duration::from_millis(150);

/// Connector backed by pre-made in-memory pipes. Refuses once they run out.
pub struct DuplexConnector {
    streams: Mutex<VecDeque<DuplexStream>>,
    attempts: AtomicUsize,
}

impl DuplexConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream, EndpointError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let next = self.streams.lock().expect("connector lock").pop_front();
        next.ok_or_else(|| EndpointError::Exhausted {
            message: String::from("No test streams left"),
            attempts: 0,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// The companion process's end of the pipe.
pub struct Companion {
    stream: DuplexStream,
}

impl Companion {
    pub async fn next_frame(&mut self) -> Frame {
        timeout(FRAME_WAIT, read_frame(&mut self.stream))
            .await
            .expect("Companion timed out waiting for a frame")
            .expect("Companion failed to read a frame")
    }

    /// Read one frame, assert its opcode, return its JSON payload.
    pub async fn expect_json(&mut self, opcode: Opcode) -> Value {
        let frame = self.next_frame().await;
        assert_eq!(frame.kind().ok(), Some(opcode), "Unexpected opcode");
        serde_json::from_slice(&frame.payload).expect("Frame payload should be JSON")
    }

    pub async fn send(&mut self, frame: Frame) {
        write_frame(&mut self.stream, &frame)
            .await
            .expect("Companion failed to write a frame");
    }

    pub async fn reply(&mut self, value: Value) {
        let payload = serde_json::to_vec(&value).expect("json");
        self.send(Frame::new(Opcode::Frame, payload)).await;
    }

    /// `true` if no frame arrives within [`SILENCE_WAIT`]. EOF also counts as silence.
    pub async fn is_silent(&mut self) -> bool {
        match timeout(SILENCE_WAIT, read_frame(&mut self.stream)).await {
            Err(_) => true,
            Ok(Err(_)) => true,
            Ok(Ok(_)) => false,
        }
    }

    /// `true` if the session side has closed the pipe.
    pub async fn is_closed(&mut self) -> bool {
        matches!(
            timeout(FRAME_WAIT, read_frame(&mut self.stream)).await,
            Ok(Err(_))
        )
    }

    pub fn hang_up(self) {
        drop(self.stream);
    }
}

pub fn ready_ack() -> Value {
    json!({"cmd": "DISPATCH", "data": {"v": 1, "config": {}, "user": {}}})
}

pub fn settings(response_timeout: Duration) -> IpcSettings {
    IpcSettings {
        base_dir: None,
        connect_timeout: Duration::from_millis(100),
        response_timeout,
    }
}

/// A connector with `count` pipes and the matching companion ends.
pub fn connector(count: usize) -> (DuplexConnector, Vec<Companion>) {
    let mut streams = VecDeque::new();
    let mut companions = Vec::new();

    for _ in 0..count {
        let (session_end, companion_end) = duplex(64 * 1024);
        streams.push_back(session_end);
        companions.push(Companion {
            stream: companion_end,
        });
    }

    (
        DuplexConnector {
            streams: Mutex::new(streams),
            attempts: AtomicUsize::new(0),
        },
        companions,
    )
}

/// A session with one available pipe and its companion.
pub fn session(response_timeout: Duration) -> (Session<DuplexConnector>, Companion) {
    let (connector, mut companions) = connector(1);
    let companion = companions.pop().expect("one companion");
    (
        Session::with_connector(connector, settings(response_timeout)),
        companion,
    )
}

/// Log in, answering the handshake with [`ready_ack`].
pub async fn login(session: &Session<DuplexConnector>, companion: &mut Companion) {
    let (result, _) = tokio::join!(session.login(TEST_CLIENT_ID), async {
        companion.expect_json(Opcode::Handshake).await;
        companion.reply(ready_ack()).await;
    });
    result.expect("Login should succeed");
}
