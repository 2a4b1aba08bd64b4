use crate::presence::{DEMO_DETAILS, DEMO_STATE, demo_activity, resolve_client_id};

use crate::error::AppError;

use models::ActivityType;
use presence_core::config::PresenceConfig;

fn config_with_client_id(client_id: Option<&str>) -> PresenceConfig {
    let mut config = PresenceConfig::default();
    config.presence.client_id = client_id.map(String::from);
    config
}

/// **VALUE**: Verifies that the environment overrides the configured client id.
///
/// **WHY THIS MATTERS**: Developers switch between test applications via `.env` without
/// editing the config file.
///
/// **BUG THIS CATCHES**: Would catch the precedence being reversed.
#[test]
fn given_env_and_config_when_resolving_client_id_then_env_wins() {
    // GIVEN: Both sources set
    let config = config_with_client_id(Some("from-config"));

    // WHEN: Resolving
    let client_id = resolve_client_id(Some(String::from("from-env")), &config);

    // THEN: Environment value
    assert_eq!(client_id.ok().as_deref(), Some("from-env"));
}

/// **VALUE**: Verifies that a blank environment value falls back to the config.
///
/// **WHY THIS MATTERS**: `.env` templates often ship `PRESENCE_CLIENT_ID=` with no value.
///
/// **BUG THIS CATCHES**: Would catch an empty string being sent as the client id.
#[test]
fn given_blank_env_when_resolving_client_id_then_uses_config() {
    // GIVEN: A blank environment value
    let config = config_with_client_id(Some("from-config"));

    // WHEN: Resolving
    let client_id = resolve_client_id(Some(String::from("  ")), &config);

    // THEN: Config value
    assert_eq!(client_id.ok().as_deref(), Some("from-config"));
}

/// **VALUE**: Verifies that no client id anywhere is a distinct error.
///
/// **WHY THIS MATTERS**: Without a client id the companion always rejects the handshake;
/// failing early gives a clearer message.
///
/// **BUG THIS CATCHES**: Would catch a login attempted with an empty id.
#[test]
fn given_no_client_id_when_resolving_then_missing_client_id_error() {
    // GIVEN: Nothing configured
    let config = config_with_client_id(None);

    // WHEN: Resolving
    let result = resolve_client_id(None, &config);

    // THEN: MissingClientId
    assert!(matches!(result, Err(AppError::MissingClientId { .. })));
}

/// **VALUE**: Verifies the demo activity content.
///
/// **WHY THIS MATTERS**: This is what users see in their profile while the demo runs.
///
/// **BUG THIS CATCHES**: Would catch a missing start timestamp (no elapsed timer shown).
#[test]
fn given_start_time_when_building_demo_activity_then_playing_with_timestamp() {
    // WHEN: Building the activity
    let activity = demo_activity(1_700_000_000).expect("Demo activity should be valid");

    // THEN: Playing, with details, state and start
    assert_eq!(activity.kind, ActivityType::Playing);
    assert_eq!(activity.details.as_deref(), Some(DEMO_DETAILS));
    assert_eq!(activity.state.as_deref(), Some(DEMO_STATE));
    assert_eq!(
        activity.timestamps.as_ref().and_then(|t| t.start),
        Some(1_700_000_000)
    );
}
