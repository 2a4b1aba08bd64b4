//! Discovery of the companion process's local IPC endpoint.
//!
//! The companion listens on `discord-ipc-{n}` for the first free `n` in
//! `0..=9`. On Unix the socket lives under a runtime directory taken from
//! the environment, or under a sandbox subdirectory of it when the companion
//! runs as a flatpak or snap. On Windows it is a named pipe.
//!
//! # Base Directory Override
//!
//! [`EndpointLocator::with_base_dir`] pins the base directory, bypassing the
//! environment lookup. Used for sandboxed hosts and tests.

pub mod connector;

use std::env;
use std::path::PathBuf;

#[cfg(not(windows))]
use const_format::concatcp;
use log::debug;

pub use connector::{Connector, IpcConnector, IpcStream};

/// Candidate ordinals are `0..MAX_ENDPOINTS`.
pub const MAX_ENDPOINTS: u8 = 10;

const ENDPOINT_PREFIX: &str = "discord-ipc-";

/// Environment variables consulted for the base directory, in order.
pub const BASE_DIR_ENV_VARS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];

const FALLBACK_BASE_DIR: &str = "/tmp";

/// Sandbox subdirectories, relative to the base directory, tried after the plain path.
#[cfg(not(windows))]
const SANDBOX_SUBDIRS: [&str; 2] = [concatcp!("app/", FLATPAK_APP_ID), "snap.discord"];

#[cfg(not(windows))]
const FLATPAK_APP_ID: &str = "com.discordapp.Discord";

#[cfg(windows)]
const PIPE_PREFIX: &str = r"\\.\pipe\";

/// One place the companion might be listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub ordinal: u8,
    pub path: PathBuf,
}

/// Produces endpoint candidates in connection order.
#[derive(Debug, Clone, Default)]
pub struct EndpointLocator {
    base_dir: Option<PathBuf>,
}

impl EndpointLocator {
    /// Locator that resolves the base directory from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator pinned to `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// The directory the Unix socket candidates live under.
    pub fn base_dir(&self) -> PathBuf {
        if let Some(base_dir) = &self.base_dir {
            return base_dir.clone();
        }

        BASE_DIR_ENV_VARS
            .iter()
            .find_map(|name| env::var_os(name).filter(|value| !value.is_empty()))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_BASE_DIR))
    }

    /// Candidates for a single ordinal, plain path first.
    #[cfg(not(windows))]
    pub fn candidates(&self, ordinal: u8) -> Vec<Endpoint> {
        let base_dir = self.base_dir();
        let name = format!("{ENDPOINT_PREFIX}{ordinal}");

        let mut endpoints = vec![Endpoint {
            ordinal,
            path: base_dir.join(&name),
        }];

        endpoints.extend(SANDBOX_SUBDIRS.iter().map(|subdir| Endpoint {
            ordinal,
            path: base_dir.join(subdir).join(&name),
        }));

        endpoints
    }

    #[cfg(windows)]
    pub fn candidates(&self, ordinal: u8) -> Vec<Endpoint> {
        vec![Endpoint {
            ordinal,
            path: PathBuf::from(format!("{PIPE_PREFIX}{ENDPOINT_PREFIX}{ordinal}")),
        }]
    }

    /// Every candidate for ordinals `0..MAX_ENDPOINTS`, in the order they should be tried.
    pub fn all_candidates(&self) -> Vec<Endpoint> {
        let endpoints: Vec<Endpoint> = (0..MAX_ENDPOINTS)
            .flat_map(|ordinal| self.candidates(ordinal))
            .collect();

        debug!(
            "{} endpoint candidates under {}",
            endpoints.len(),
            self.base_dir().display()
        );

        endpoints
    }
}
