use presence_demo::error::AppError;
use presence_demo::logger::{LOG_LEVEL_ENV_VAR, initialize as LoggerInitialize, resolve_level};
use presence_demo::presence::{self, CLIENT_ID_ENV_VAR};

use common::ErrorLocation;

use presence_core::config::PresenceConfig;
use presence_core::error::CoreError;
use presence_core::session::Session;

use std::env;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use log::{error, info};

const APP_DIR_NAME: &str = "presence-demo";

/// How long the demo keeps its activity visible.
const HOLD_DURATION: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded environment from {}", path.display());
    }

    let log_dir = app_dir(dirs::cache_dir(), "cache")?;
    LoggerInitialize(
        &log_dir,
        resolve_level(env::var(LOG_LEVEL_ENV_VAR).ok().as_deref()),
    )?;

    info!("Presence demo starting");
    info!("Log directory: {}", log_dir.display());

    let config_dir = app_dir(dirs::config_dir(), "config")?;
    let config = PresenceConfig::load(&config_dir).map_err(CoreError::from)?;
    let client_id = presence::resolve_client_id(env::var(CLIENT_ID_ENV_VAR).ok(), &config)?;

    let session = Session::new(config.ipc_settings());

    presence::run(
        &session,
        &client_id,
        config.retry_max_elapsed(),
        HOLD_DURATION,
    )
    .await
}

#[track_caller]
fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf, AppError> {
    let dir = base
        .ok_or_else(|| AppError::App {
            message: format!("No {kind} directory on this platform"),
            location: ErrorLocation::from(Location::caller()),
        })?
        .join(APP_DIR_NAME);

    create_dir_all(&dir).map_err(|e| AppError::App {
        message: format!("Failed to create {kind} directory {}: {e}", dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(dir)
}
