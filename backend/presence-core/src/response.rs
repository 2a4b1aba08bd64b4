//! Inbound replies and the registry that matches them to outstanding requests.
//!
//! Replies are routed by nonce. The companion omits the nonce on some
//! replies (the handshake acknowledgement, some errors), so nonce-less
//! replies fall back to the oldest outstanding request. Nonce-less
//! `DISPATCH` events with no handshake pending are unsolicited and go to the
//! notification path instead.

use crate::activity::CorrelationId;

use std::collections::VecDeque;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

pub const ERROR_EVENT: &str = "ERROR";
pub const DISPATCH_COMMAND: &str = "DISPATCH";

/// A decoded opcode 1 reply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolResponse {
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
    #[serde(rename = "evt", default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl ProtocolResponse {
    pub fn is_error(&self) -> bool {
        self.event.as_deref() == Some(ERROR_EVENT)
    }

    /// `data` as human-readable text: strings verbatim, anything else as compact JSON.
    pub fn detail(&self) -> String {
        match &self.data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// Success carries `data`; an error event carries its detail regardless of payload shape.
    pub fn check(self) -> Result<Value, String> {
        if self.is_error() {
            Err(self.detail())
        } else {
            Ok(self.data)
        }
    }
}

/// Payload of an opcode 2 frame sent by the companion before it hangs up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CloseNotice {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

impl CloseNotice {
    /// Decode leniently; a non-JSON payload becomes the message.
    pub fn from_payload(payload: &[u8]) -> Self {
        serde_json::from_slice(payload).unwrap_or_else(|_| CloseNotice {
            code: 0,
            message: String::from_utf8_lossy(payload).into_owned(),
        })
    }
}

/// What a waiting request receives.
#[derive(Debug)]
pub(crate) enum Reply {
    Response(ProtocolResponse),
    Closed(CloseNotice),
}

/// Frames nobody asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Event(ProtocolResponse),
    Closed(CloseNotice),
}

/// Timed-out requests remembered so their late replies are not misattributed.
pub(crate) const EXPIRED_CAPACITY: usize = 16;

/// Outstanding requests awaiting a reply.
#[derive(Debug, Default)]
pub(crate) struct PendingReplies {
    handshake: Option<oneshot::Sender<Reply>>,
    requests: VecDeque<(CorrelationId, oneshot::Sender<Reply>)>,
    /// Requests that stopped waiting and whose reply has not arrived yet, oldest first.
    expired: VecDeque<CorrelationId>,
}

impl PendingReplies {
    pub(crate) fn expect_handshake(&mut self) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.handshake = Some(tx);
        rx
    }

    pub(crate) fn expect_reply(&mut self, nonce: CorrelationId) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.requests.push_back((nonce, tx));
        rx
    }

    /// Drop a request that stopped waiting (timeout).
    ///
    /// Its reply may still arrive; until it does, a nonce-less reply is
    /// assumed to be that late reply rather than the answer to a newer request.
    pub(crate) fn forget(&mut self, nonce: &CorrelationId) {
        let before = self.requests.len();
        self.requests.retain(|(pending, _)| pending != nonce);

        if self.requests.len() < before {
            if self.expired.len() == EXPIRED_CAPACITY {
                self.expired.pop_front();
            }
            self.expired.push_back(nonce.clone());
        }
    }

    pub(crate) fn forget_handshake(&mut self) {
        self.handshake = None;
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len() + usize::from(self.handshake.is_some())
    }

    /// Deliver a reply to whoever is waiting for it.
    ///
    /// Returns the response back when nobody claims it.
    pub(crate) fn route(&mut self, response: ProtocolResponse) -> Option<ProtocolResponse> {
        if let Some(tx) = self.handshake.take() {
            return deliver(tx, Reply::Response(response));
        }

        let position = match response.nonce.as_deref() {
            Some(nonce) => {
                let position = self
                    .requests
                    .iter()
                    .position(|(pending, _)| pending.as_str() == nonce);
                if position.is_none() {
                    match self.expired.iter().position(|late| late.as_str() == nonce) {
                        Some(index) => {
                            self.expired.remove(index);
                            debug!("Late reply for timed-out request {nonce}");
                        }
                        None => warn!("Reply carries unknown nonce {nonce}"),
                    }
                }
                position
            }
            None if response.cmd == DISPATCH_COMMAND => None,
            None => match self.expired.pop_front() {
                Some(late) => {
                    debug!("Treating nonce-less reply as the late reply for {late}");
                    None
                }
                None => (!self.requests.is_empty()).then_some(0),
            },
        };

        match position.and_then(|index| self.requests.remove(index)) {
            Some((_, tx)) => deliver(tx, Reply::Response(response)),
            None => Some(response),
        }
    }

    /// Hand the close notice to every waiter.
    pub(crate) fn close(&mut self, notice: &CloseNotice) {
        if let Some(tx) = self.handshake.take() {
            let _ = tx.send(Reply::Closed(notice.clone()));
        }

        for (_, tx) in self.requests.drain(..) {
            let _ = tx.send(Reply::Closed(notice.clone()));
        }
    }

    /// Drop every waiter; their receivers observe a closed channel.
    pub(crate) fn fail_all(&mut self) {
        if self.len() > 0 {
            debug!("Failing {} pending replies", self.len());
        }

        self.handshake = None;
        self.requests.clear();
        self.expired.clear();
    }
}

fn deliver(tx: oneshot::Sender<Reply>, reply: Reply) -> Option<ProtocolResponse> {
    match tx.send(reply) {
        Ok(()) => None,
        Err(Reply::Response(response)) => {
            debug!("Reply arrived after its request stopped waiting");
            Some(response)
        }
        Err(Reply::Closed(_)) => None,
    }
}
