//! Opening a channel to the first endpoint that accepts.

use crate::config::IpcSettings;
use crate::endpoint::{Endpoint, EndpointLocator};
use crate::error::endpoint::EndpointError;

use common::ErrorLocation;

use std::future::Future;
use std::io::Error as IoError;
use std::panic::Location;
use std::time::Duration;

use log::{debug, info, trace};
use tokio::io::{AsyncRead, AsyncWrite};

#[cfg(unix)]
pub type IpcStream = tokio::net::UnixStream;

#[cfg(windows)]
pub type IpcStream = tokio::net::windows::named_pipe::NamedPipeClient;

/// Opens the duplex byte channel a [`Session`](crate::session::Session) talks over.
///
/// [`IpcConnector`] is the production implementation. Tests substitute an
/// in-memory stream.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    fn connect(&self) -> impl Future<Output = Result<Self::Stream, EndpointError>> + Send;
}

/// Connects to the companion process over its local socket / named pipe.
#[derive(Debug, Clone)]
pub struct IpcConnector {
    locator: EndpointLocator,
    connect_timeout: Duration,
}

impl IpcConnector {
    pub fn new(locator: EndpointLocator, connect_timeout: Duration) -> Self {
        Self {
            locator,
            connect_timeout,
        }
    }

    pub fn from_settings(settings: &IpcSettings) -> Self {
        let locator = match &settings.base_dir {
            Some(base_dir) => EndpointLocator::with_base_dir(base_dir),
            None => EndpointLocator::new(),
        };

        Self::new(locator, settings.connect_timeout)
    }

    pub fn locator(&self) -> &EndpointLocator {
        &self.locator
    }

    #[cfg(unix)]
    async fn open(&self, endpoint: &Endpoint) -> Result<IpcStream, IoError> {
        match tokio::time::timeout(self.connect_timeout, IpcStream::connect(&endpoint.path)).await
        {
            Ok(result) => result,
            Err(_) => Err(IoError::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", self.connect_timeout),
            )),
        }
    }

    #[cfg(windows)]
    async fn open(&self, endpoint: &Endpoint) -> Result<IpcStream, IoError> {
        tokio::net::windows::named_pipe::ClientOptions::new().open(&endpoint.path)
    }
}

impl Connector for IpcConnector {
    type Stream = IpcStream;

    /// Try every candidate in order and return the first open channel.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Exhausted`] when no candidate accepts. Not
    /// retried here; the caller decides whether to try again later.
    async fn connect(&self) -> Result<IpcStream, EndpointError> {
        let candidates = self.locator.all_candidates();
        let mut last_error = None;

        for endpoint in &candidates {
            match self.open(endpoint).await {
                Ok(stream) => {
                    info!(
                        "Connected to endpoint {} ({})",
                        endpoint.ordinal,
                        endpoint.path.display()
                    );
                    return Ok(stream);
                }
                Err(e) => {
                    trace!("Endpoint {} refused: {e}", endpoint.path.display());
                    last_error = Some(e);
                }
            }
        }

        debug!("All {} endpoint candidates refused", candidates.len());

        Err(EndpointError::Exhausted {
            message: match last_error {
                Some(e) => format!("No companion endpoint accepted a connection: {e}"),
                None => String::from("No companion endpoint candidates"),
            },
            attempts: candidates.len(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
