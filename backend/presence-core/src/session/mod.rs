//! Session lifecycle: handshake, readiness gating, activity updates, logout.
//!
//! # Concurrency
//!
//! A session is `Send + Sync` and may be shared (e.g. in an `Arc`) across
//! tasks. Operations are serialized by an internal async mutex, so at most
//! one request is on the wire at a time. [`Session::interrupt`] and
//! [`Session::logout`] are the only ways to unblock an in-flight operation
//! early; otherwise every wait is bounded by the configured response timeout.
//!
//! # Tolerated absence
//!
//! Activity updates while not [`SessionState::Ready`] are dropped and report
//! success. The companion process not running is an expected condition.

mod state;

pub use state::SessionState;

use crate::activity::{activity_request, handshake_frame};
use crate::config::IpcSettings;
use crate::connection::{Connection, Interrupter};
use crate::endpoint::{Connector, IpcConnector};
use crate::error::session::SessionError;
use crate::response::{CloseNotice, Notification, Reply};

use common::ErrorLocation;
use models::{Activity, ReadyInfo};

use std::panic::Location;
use std::sync::{Mutex as StdMutex, PoisonError};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

pub struct Session<C: Connector = IpcConnector> {
    connector: C,
    settings: IpcSettings,
    pid: u32,

    /// Single source of truth for whether requests may be sent.
    state: RwLock<SessionState>,

    /// Handshake metadata while Ready.
    ready: RwLock<Option<ReadyInfo>>,

    /// Operation lock; owns the connection.
    connection: Mutex<Option<Connection<C::Stream>>>,

    /// Reachable without the operation lock so an in-flight request can be cancelled.
    interrupter: StdMutex<Option<Interrupter>>,

    notifications: StdMutex<Option<mpsc::Receiver<Notification>>>,
}

impl Session<IpcConnector> {
    /// Session talking to the companion over its local socket / named pipe.
    pub fn new(settings: IpcSettings) -> Self {
        let connector = IpcConnector::from_settings(&settings);
        Self::with_connector(connector, settings)
    }
}

impl<C: Connector> Session<C> {
    pub fn with_connector(connector: C, settings: IpcSettings) -> Self {
        Self {
            connector,
            settings,
            pid: std::process::id(),
            state: RwLock::new(SessionState::Disconnected),
            ready: RwLock::new(None),
            connection: Mutex::new(None),
            interrupter: StdMutex::new(None),
            notifications: StdMutex::new(None),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Companion and user metadata from the handshake, while Ready.
    pub async fn ready_info(&self) -> Option<ReadyInfo> {
        self.ready.read().await.clone()
    }

    /// Receiver for frames nobody asked for (unsolicited events, close notices).
    ///
    /// A new receiver is created per login; returns `None` if already taken.
    pub fn take_notifications(&self) -> Option<mpsc::Receiver<Notification>> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Open a channel to the companion and perform the handshake.
    ///
    /// Returns immediately if already Ready.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Endpoint`] - no endpoint accepted (not retried here)
    /// - [`SessionError::HandshakeRejected`] - the companion declined the client id
    /// - [`SessionError::ResponseTimeout`] - no acknowledgement in time
    /// - [`SessionError::Frame`] / [`SessionError::ConnectionLost`] - transport failure
    /// - [`SessionError::Decode`] - acknowledgement metadata could not be decoded
    ///
    /// On every error the channel is closed and the state is `Disconnected`.
    pub async fn login(&self, client_id: &str) -> Result<(), SessionError> {
        let mut slot = self.connection.lock().await;

        if self.state().await.is_ready() {
            if slot.as_ref().is_some_and(Connection::is_alive) {
                debug!("Login requested while already ready");
                return Ok(());
            }

            warn!("Ready session lost its connection, reconnecting");
        }

        if let Some(stale) = slot.take() {
            self.teardown(stale).await;
        }

        let handshake = handshake_frame(client_id)?;

        self.set_state(SessionState::Connecting).await;

        let stream = match self.connector.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(SessionState::Disconnected).await;
                return Err(e.into());
            }
        };

        let (connection, notifications) = Connection::open(stream);
        self.install(&connection, notifications);

        let reply = connection.expect_handshake();
        self.set_state(SessionState::AwaitingHandshakeAck).await;

        let outcome = match connection.send(&handshake).await {
            Ok(()) => self.await_reply(&connection, reply).await,
            Err(e) => Err(e.into()),
        };

        let ready = match outcome {
            Ok(Reply::Response(response)) => match response.check() {
                Ok(data) => decode_ready(data),
                Err(detail) => Err(SessionError::HandshakeRejected {
                    detail,
                    location: ErrorLocation::from(Location::caller()),
                }),
            },
            Ok(Reply::Closed(notice)) => Err(SessionError::HandshakeRejected {
                detail: describe_close(&notice),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(e) => {
                connection.forget_handshake();
                Err(e)
            }
        };

        match ready {
            Ok(ready) => {
                info!(
                    "Logged in as '{}' (protocol v{}, environment '{}')",
                    ready.user.username, ready.v, ready.config.environment
                );
                *self.ready.write().await = Some(ready);
                *slot = Some(connection);
                self.set_state(SessionState::Ready).await;
                Ok(())
            }
            Err(e) => {
                warn!("Login failed: {e}");
                self.teardown(connection).await;
                Err(e)
            }
        }
    }

    /// Publish `activity` as the current presence.
    ///
    /// A no-op success when not Ready.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ActivityRejected`] - the companion declined; still Ready
    /// - [`SessionError::ResponseTimeout`] - no reply in time; still Ready
    /// - transport errors - the channel is closed and the state is `Disconnected`
    pub async fn set_activity(&self, activity: &Activity) -> Result<(), SessionError> {
        self.update_activity(Some(activity)).await
    }

    /// Clear the current presence. Same rules as [`Session::set_activity`].
    pub async fn clear_activity(&self) -> Result<(), SessionError> {
        self.update_activity(None).await
    }

    async fn update_activity(&self, activity: Option<&Activity>) -> Result<(), SessionError> {
        let mut slot = self.connection.lock().await;

        if !self.state().await.is_ready() {
            debug!("Not logged in, dropping activity update");
            return Ok(());
        }

        let Some(connection) = slot.as_ref() else {
            debug!("No connection, dropping activity update");
            return Ok(());
        };

        let request = activity_request(self.pid, activity)?;
        let reply = connection.expect_reply(request.nonce.clone());

        debug!("Sending SET_ACTIVITY (nonce {})", request.nonce);

        let outcome = match connection.send(&request.frame).await {
            Ok(()) => self.await_reply(connection, reply).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(Reply::Response(response)) => match response.check() {
                Ok(_) => {
                    debug!("Activity accepted (nonce {})", request.nonce);
                    Ok(())
                }
                Err(detail) => {
                    warn!("Activity rejected: {detail}");
                    Err(SessionError::ActivityRejected {
                        detail,
                        location: ErrorLocation::from(Location::caller()),
                    })
                }
            },
            Ok(Reply::Closed(notice)) => {
                if let Some(connection) = slot.take() {
                    self.teardown(connection).await;
                }
                Err(SessionError::ConnectionLost {
                    message: describe_close(&notice),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(e @ SessionError::ResponseTimeout { .. }) => {
                connection.forget(&request.nonce);
                warn!("Activity update timed out, session stays ready");
                Err(e)
            }
            Err(e) => {
                if let Some(connection) = slot.take() {
                    self.teardown(connection).await;
                }
                Err(e)
            }
        }
    }

    /// Close the channel unconditionally and move to `Closed`.
    ///
    /// Any in-flight operation is interrupted first. Safe to call in any
    /// state, any number of times.
    ///
    /// # Errors
    ///
    /// Returns the close failure, if any. The state is `Closed` regardless.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.interrupt();

        let mut slot = self.connection.lock().await;

        let result = match slot.take() {
            Some(connection) => connection.close().await.map_err(SessionError::from),
            None => Ok(()),
        };

        self.clear_interrupter();
        *self.ready.write().await = None;
        self.set_state(SessionState::Closed).await;

        match &result {
            Ok(()) => info!("Logged out"),
            Err(e) => warn!("Logged out, but closing the connection failed: {e}"),
        }

        result
    }

    /// Fail the in-flight request, if any, without waiting for the operation lock.
    pub fn interrupt(&self) {
        let interrupter = self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(interrupter) = interrupter {
            debug!("Interrupting connection");
            interrupter.interrupt();
        }
    }

    async fn await_reply(
        &self,
        connection: &Connection<C::Stream>,
        reply: oneshot::Receiver<Reply>,
    ) -> Result<Reply, SessionError> {
        // The waiter is registered before this check, so a reader that stops
        // afterwards still fails it.
        if !connection.is_alive() {
            return Err(connection_lost());
        }

        match tokio::time::timeout(self.settings.response_timeout, reply).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(connection_lost()),
            Err(_) => Err(SessionError::ResponseTimeout {
                timeout: self.settings.response_timeout,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    fn install(
        &self,
        connection: &Connection<C::Stream>,
        notifications: mpsc::Receiver<Notification>,
    ) {
        *self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection.interrupter());
        *self
            .notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(notifications);
    }

    fn clear_interrupter(&self) {
        *self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Release a connection after a failure. Always ends `Disconnected`.
    async fn teardown(&self, connection: Connection<C::Stream>) {
        if let Err(e) = connection.close().await {
            debug!("Ignoring close failure during teardown: {e}");
        }

        self.clear_interrupter();
        *self.ready.write().await = None;
        self.set_state(SessionState::Disconnected).await;
    }

    async fn set_state(&self, next: SessionState) {
        let mut state = self.state.write().await;
        if *state != next {
            info!("Session state: {} -> {}", *state, next);
            *state = next;
        }
    }
}

#[track_caller]
fn connection_lost() -> SessionError {
    SessionError::ConnectionLost {
        message: String::from("Connection closed while awaiting a reply"),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// An acknowledgement without `data` carries no metadata, not a malformed one.
#[track_caller]
fn decode_ready(data: Value) -> Result<ReadyInfo, SessionError> {
    if data.is_null() {
        return Ok(ReadyInfo::default());
    }

    serde_json::from_value(data).map_err(|e| SessionError::Decode {
        message: format!("Invalid handshake acknowledgement: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

fn describe_close(notice: &CloseNotice) -> String {
    format!("{} (code {})", notice.message, notice.code)
}
