// Unit tests for endpoint candidate generation.

use crate::endpoint::{BASE_DIR_ENV_VARS, EndpointLocator, MAX_ENDPOINTS};

use std::path::PathBuf;

use serial_test::serial;

/// Snapshot and clear the base directory variables, restoring them on drop.
struct EnvGuard {
    saved: Vec<(&'static str, Option<std::ffi::OsString>)>,
}

impl EnvGuard {
    fn cleared() -> Self {
        let saved = BASE_DIR_ENV_VARS
            .iter()
            .map(|name| (*name, std::env::var_os(name)))
            .collect();
        for name in BASE_DIR_ENV_VARS {
            // SAFETY: tests touching the environment are serialized with #[serial].
            unsafe { std::env::remove_var(name) };
        }
        Self { saved }
    }

    fn set(&self, name: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized with #[serial].
        unsafe { std::env::set_var(name, value) };
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            // SAFETY: tests touching the environment are serialized with #[serial].
            unsafe {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}

/// **VALUE**: Verifies that the override base directory wins and ordinals are in order.
///
/// **WHY THIS MATTERS**: Sandboxed hosts rely on the override, and the companion takes the
/// lowest free ordinal, so lower ordinals must be tried first.
///
/// **BUG THIS CATCHES**: Would catch an ignored override or shuffled candidate order.
#[cfg(unix)]
#[test]
fn given_base_dir_override_when_listing_candidates_then_plain_path_comes_first() {
    // GIVEN: A pinned base directory
    let locator = EndpointLocator::with_base_dir("/run/user/1000");

    // WHEN: Listing candidates for ordinal 3
    let candidates = locator.candidates(3);

    // THEN: Plain, flatpak, snap
    let paths: Vec<PathBuf> = candidates.iter().map(|e| e.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("/run/user/1000/discord-ipc-3"),
            PathBuf::from("/run/user/1000/app/com.discordapp.Discord/discord-ipc-3"),
            PathBuf::from("/run/user/1000/snap.discord/discord-ipc-3"),
        ]
    );
    assert!(candidates.iter().all(|e| e.ordinal == 3));
}

/// **VALUE**: Verifies that all ten ordinals are covered, ascending.
///
/// **WHY THIS MATTERS**: Missing ordinal 9 would make login fail when nine other clients
/// hold the lower sockets.
///
/// **BUG THIS CATCHES**: Would catch off-by-one ranges.
#[test]
fn given_locator_when_listing_all_candidates_then_covers_ordinals_zero_to_nine() {
    // GIVEN: Any locator
    let locator = EndpointLocator::with_base_dir("/tmp");

    // WHEN: Listing all candidates
    let candidates = locator.all_candidates();

    // THEN: First is 0, last is 9, never decreasing
    assert_eq!(candidates.first().map(|e| e.ordinal), Some(0));
    assert_eq!(candidates.last().map(|e| e.ordinal), Some(MAX_ENDPOINTS - 1));
    assert!(candidates.windows(2).all(|w| w[0].ordinal <= w[1].ordinal));
}

/// **VALUE**: Verifies the environment lookup order for the base directory.
///
/// **WHY THIS MATTERS**: On most desktops the socket is under XDG_RUNTIME_DIR; TMPDIR is the
/// macOS location. Picking the wrong variable means never finding the companion.
///
/// **BUG THIS CATCHES**: Would catch reordered or ignored variables.
#[cfg(unix)]
#[test]
#[serial]
fn given_runtime_and_tmp_dirs_when_resolving_base_then_xdg_runtime_dir_wins() {
    // GIVEN: Both XDG_RUNTIME_DIR and TMPDIR set
    let env = EnvGuard::cleared();
    env.set("TMPDIR", "/var/tmp-mac");
    env.set("XDG_RUNTIME_DIR", "/run/user/1000");

    // WHEN: Resolving
    let base = EndpointLocator::new().base_dir();

    // THEN: XDG_RUNTIME_DIR
    assert_eq!(base, PathBuf::from("/run/user/1000"));
}

/// **VALUE**: Verifies the fallback chain down to /tmp.
///
/// **WHY THIS MATTERS**: Minimal environments set none of the variables.
///
/// **BUG THIS CATCHES**: Would catch a panic or empty path when nothing is set, or an
/// empty variable being taken as a directory.
#[cfg(unix)]
#[test]
#[serial]
fn given_no_env_vars_when_resolving_base_then_falls_back_to_tmp() {
    // GIVEN: Only an empty TMP
    let env = EnvGuard::cleared();
    env.set("TMP", "");

    // WHEN: Resolving
    let base = EndpointLocator::new().base_dir();

    // THEN: /tmp
    assert_eq!(base, PathBuf::from("/tmp"));
}
