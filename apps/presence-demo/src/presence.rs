//! The demo flow: log in, show one activity, log out.

use crate::error::AppError;

use common::ErrorLocation;
use models::{Activity, ActivityBuilder, ActivityType, ModelError};
use presence_core::config::PresenceConfig;
use presence_core::endpoint::Connector;
use presence_core::error::CoreError;
use presence_core::error::session::SessionError;
use presence_core::response::Notification;
use presence_core::session::Session;

use std::panic::Location;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};
use tokio::sync::mpsc;
use tokio::time::sleep as TokioSleep;

/// Environment variable that takes precedence over `presence.client_id`.
pub const CLIENT_ID_ENV_VAR: &str = "PRESENCE_CLIENT_ID";

pub const DEMO_DETAILS: &str = "Playing Minecraft";
pub const DEMO_STATE: &str = "In Game";

/// Client id from the environment, falling back to the config file.
///
/// # Errors
///
/// Returns [`AppError::MissingClientId`] when neither provides a non-blank id.
pub fn resolve_client_id(
    env_value: Option<String>,
    config: &PresenceConfig,
) -> Result<String, AppError> {
    env_value
        .filter(|id| !id.trim().is_empty())
        .or_else(|| config.presence.client_id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::MissingClientId {
            message: format!("Set {CLIENT_ID_ENV_VAR} or presence.client_id in config.json"),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// A Playing activity started at `started_at` (epoch seconds).
pub fn demo_activity(started_at: u64) -> Result<Activity, ModelError> {
    ActivityBuilder::default()
        .with_kind(ActivityType::Playing)
        .with_details(DEMO_DETAILS)
        .with_state(DEMO_STATE)
        .with_start(started_at)
        .build()
}

pub fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Log in, retrying with exponential backoff while no endpoint accepts.
///
/// Only [`SessionError::Endpoint`] is retried; a rejected handshake will not
/// change on retry.
pub async fn login_with_retry<C: Connector>(
    session: &Session<C>,
    client_id: &str,
    max_elapsed: Duration,
) -> Result<(), CoreError> {
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..Default::default()
    };

    loop {
        match session.login(client_id).await {
            Ok(()) => return Ok(()),
            Err(e @ SessionError::Endpoint(_)) => match backoff.next_backoff() {
                Some(duration) => {
                    debug!("Companion not reachable, retrying after {duration:?}");
                    TokioSleep(duration).await;
                }
                None => {
                    warn!("Companion not reachable within {max_elapsed:?}");
                    return Err(e.into());
                }
            },
            Err(e) => return Err(e.into()),
        }
    }
}

/// Log every notification until the connection that feeds `notifications` ends.
pub async fn log_notifications(mut notifications: mpsc::Receiver<Notification>) {
    while let Some(notification) = notifications.recv().await {
        trace!("Notification: {notification:?}");
        match notification {
            Notification::Event(event) => info!(
                "Companion event {}: {}",
                event.event.as_deref().unwrap_or("<none>"),
                event.detail()
            ),
            Notification::Closed(notice) => {
                warn!("Companion closed the connection: {} ({})", notice.message, notice.code)
            }
        }
    }
}

/// Log in, publish [`demo_activity`], hold it for `hold`, log out.
///
/// Logout runs even when publishing fails.
pub async fn run<C: Connector>(
    session: &Session<C>,
    client_id: &str,
    max_elapsed: Duration,
    hold: Duration,
) -> Result<(), AppError> {
    login_with_retry(session, client_id, max_elapsed).await?;

    if let Some(ready) = session.ready_info().await {
        info!("Companion ready for user '{}'", ready.user.username);
    }

    let listener = session
        .take_notifications()
        .map(|notifications| tokio::spawn(log_notifications(notifications)));

    let published = publish_and_hold(session, hold).await;

    let logged_out = session.logout().await;

    // Logout drops the sender, so this finishes once the backlog is logged.
    if let Some(listener) = listener
        && let Err(e) = listener.await
    {
        debug!("Notification listener ended abnormally: {e}");
    }

    logged_out.map_err(CoreError::from)?;

    published
}

async fn publish_and_hold<C: Connector>(
    session: &Session<C>,
    hold: Duration,
) -> Result<(), AppError> {
    let activity = demo_activity(now_epoch_seconds())?;

    session
        .set_activity(&activity)
        .await
        .map_err(CoreError::from)?;

    info!("Presence published, holding for {hold:?}");
    TokioSleep(hold).await;

    Ok(())
}
