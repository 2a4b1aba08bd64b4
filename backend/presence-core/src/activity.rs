//! Outbound payloads: the handshake and `SET_ACTIVITY` requests.

use crate::error::session::SessionError;
use crate::frame::{Frame, Opcode};

use models::Activity;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROTOCOL_VERSION: &str = "1";
pub const SET_ACTIVITY_COMMAND: &str = "SET_ACTIVITY";

/// Nonce attached to a request so its reply can be matched back to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// A fresh random (UUID v4) identifier. Never reused.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for CorrelationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct Handshake<'a> {
    v: &'a str,
    client_id: &'a str,
}

#[derive(Serialize)]
struct Command<'a> {
    cmd: &'a str,
    args: ActivityArgs<'a>,
    nonce: &'a CorrelationId,
}

#[derive(Serialize)]
struct ActivityArgs<'a> {
    pid: u32,
    /// `null` clears the presence.
    activity: Option<&'a Activity>,
}

/// A serialized `SET_ACTIVITY` request and the nonce its reply should carry.
#[derive(Debug, Clone)]
pub struct ActivityRequest {
    pub nonce: CorrelationId,
    pub frame: Frame,
}

/// Build the opcode 0 frame that opens a session.
#[track_caller]
pub fn handshake_frame(client_id: &str) -> Result<Frame, SessionError> {
    let payload = serde_json::to_vec(&Handshake {
        v: PROTOCOL_VERSION,
        client_id,
    })?;

    Ok(Frame::new(Opcode::Handshake, payload))
}

/// Build a `SET_ACTIVITY` message frame with a fresh nonce.
///
/// Passing `None` produces an explicit `"activity": null`, which the
/// companion process treats as "clear the presence".
#[track_caller]
pub fn activity_request(
    pid: u32,
    activity: Option<&Activity>,
) -> Result<ActivityRequest, SessionError> {
    let nonce = CorrelationId::generate();

    let payload = serde_json::to_vec(&Command {
        cmd: SET_ACTIVITY_COMMAND,
        args: ActivityArgs { pid, activity },
        nonce: &nonce,
    })?;

    Ok(ActivityRequest {
        nonce,
        frame: Frame::new(Opcode::Frame, payload),
    })
}
