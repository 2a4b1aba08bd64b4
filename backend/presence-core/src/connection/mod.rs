//! An open channel to the companion process.
//!
//! Writes go through [`Connection::send`]. Reads happen on a background task
//! that decodes every inbound frame and dispatches it:
//!
//! - message replies to the request waiting for them (see [`crate::response`])
//! - unclaimed messages and close notices to the notification channel
//! - pings straight back as pongs
//!
//! When the reader stops (EOF, I/O error, close notice, or [`Interrupter`]),
//! every outstanding request is failed so no caller waits on a dead channel.

use crate::error::frame::FrameError;
use crate::frame::{Frame, Opcode, read_frame, write_frame};
use crate::response::{CloseNotice, Notification, PendingReplies, ProtocolResponse, Reply};
use crate::activity::CorrelationId;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf, split};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};

/// Unclaimed frames buffered for the host before new ones are dropped.
pub const NOTIFICATION_CAPACITY: usize = 100;

type SharedPending = Arc<StdMutex<PendingReplies>>;
type SharedWriter<S> = Arc<Mutex<WriteHalf<S>>>;

pub struct Connection<S> {
    writer: SharedWriter<S>,
    pending: SharedPending,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

/// Stops a connection's reader from outside the operation holding it.
///
/// This is the cancellation path: any request waiting on a reply observes a
/// lost connection immediately.
#[derive(Debug, Clone)]
pub struct Interrupter {
    reader: AbortHandle,
    pending: SharedPending,
    alive: Arc<AtomicBool>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.reader.abort();
        self.alive.store(false, Ordering::SeqCst);
        lock(&self.pending).fail_all();
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Take ownership of `stream` and start the inbound reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(stream: S) -> (Self, mpsc::Receiver<Notification>) {
        let (read_half, write_half) = split(stream);
        let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_CAPACITY);

        let writer = Arc::new(Mutex::new(write_half));
        let pending: SharedPending = Arc::default();
        let alive = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&writer),
            Arc::clone(&pending),
            notification_tx,
            Arc::clone(&alive),
        ));

        debug!("Connection reader started");

        (
            Self {
                writer,
                pending,
                alive,
                reader,
            },
            notification_rx,
        )
    }

    /// Write one frame.
    pub async fn send(&self, frame: &Frame) -> Result<(), FrameError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, frame).await
    }

    /// `false` once the reader has stopped for any reason.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            reader: self.reader.abort_handle(),
            pending: Arc::clone(&self.pending),
            alive: Arc::clone(&self.alive),
        }
    }

    pub(crate) fn expect_handshake(&self) -> oneshot::Receiver<Reply> {
        lock(&self.pending).expect_handshake()
    }

    pub(crate) fn expect_reply(&self, nonce: CorrelationId) -> oneshot::Receiver<Reply> {
        lock(&self.pending).expect_reply(nonce)
    }

    pub(crate) fn forget(&self, nonce: &CorrelationId) {
        lock(&self.pending).forget(nonce);
    }

    pub(crate) fn forget_handshake(&self) {
        lock(&self.pending).forget_handshake();
    }

    /// Stop the reader, fail outstanding requests and shut the write half.
    ///
    /// Everything is released even when the shutdown itself fails; the error
    /// is returned for the caller to report.
    pub async fn close(self) -> Result<(), FrameError> {
        self.interrupter().interrupt();

        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;

        debug!("Connection closed");
        Ok(())
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop<S>(
    mut reader: ReadHalf<S>,
    writer: SharedWriter<S>,
    pending: SharedPending,
    notifications: mpsc::Sender<Notification>,
    alive: Arc<AtomicBool>,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(FrameError::Closed { .. }) => {
                info!("Companion process closed the connection");
                break;
            }
            Err(e) => {
                warn!("Connection read failed: {e}");
                break;
            }
        };

        match frame.kind() {
            Ok(Opcode::Frame) => {
                match serde_json::from_slice::<ProtocolResponse>(&frame.payload) {
                    Ok(response) => {
                        let unclaimed = lock(&pending).route(response);
                        if let Some(response) = unclaimed {
                            debug!(
                                "Unsolicited message: cmd={}, evt={:?}",
                                response.cmd, response.event
                            );
                            notify(&notifications, Notification::Event(response));
                        }
                    }
                    Err(e) => warn!("Discarding undecodable message frame: {e}"),
                }
            }
            Ok(Opcode::Close) => {
                let notice = CloseNotice::from_payload(&frame.payload);
                info!(
                    "Companion process sent close: code={}, message={}",
                    notice.code, notice.message
                );
                lock(&pending).close(&notice);
                notify(&notifications, Notification::Closed(notice));
                break;
            }
            Ok(Opcode::Ping) => {
                trace!("Ping received, answering");
                let pong = Frame::new(Opcode::Pong, frame.payload);
                let mut writer = writer.lock().await;
                if let Err(e) = write_frame(&mut *writer, &pong).await {
                    warn!("Failed to answer ping: {e}");
                    break;
                }
            }
            Ok(Opcode::Pong) => trace!("Pong received"),
            Ok(Opcode::Handshake) => warn!("Ignoring handshake frame sent by companion process"),
            Err(e) => warn!("Ignoring frame: {e}"),
        }
    }

    // Order matters: waiters registering after this point see a dead connection.
    alive.store(false, Ordering::SeqCst);
    lock(&pending).fail_all();
    debug!("Connection reader stopped");
}

fn notify(notifications: &mpsc::Sender<Notification>, notification: Notification) {
    match notifications.try_send(notification) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Notification buffer full, dropping notification")
        }
        Err(mpsc::error::TrySendError::Closed(_)) => trace!("No notification listener"),
    }
}

fn lock(pending: &SharedPending) -> MutexGuard<'_, PendingReplies> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
