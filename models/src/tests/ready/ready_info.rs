use crate::{PremiumType, ReadyInfo};

/// **VALUE**: Verifies that a sparse handshake acknowledgement decodes.
///
/// **WHY THIS MATTERS**: The companion omits config and user fields it does not know. A
/// strict decode would fail an otherwise successful login.
///
/// **BUG THIS CATCHES**: Would catch if `#[serde(default)]` is removed from any struct.
#[test]
fn given_sparse_ready_payload_when_decoded_then_uses_defaults() {
    // GIVEN: The minimal acknowledgement
    let raw = r#"{"v":1,"config":{},"user":{}}"#;

    // WHEN: Decoding
    let ready: ReadyInfo = serde_json::from_str(raw).expect("decodes");

    // THEN: Version set, everything else default
    assert_eq!(ready.v, 1);
    assert_eq!(ready.user.username, "");
    assert_eq!(ready.user.premium_type, PremiumType::None);
}

/// **VALUE**: Verifies that a full acknowledgement populates user and config.
///
/// **WHY THIS MATTERS**: Hosts display the logged-in user's name from this metadata.
///
/// **BUG THIS CATCHES**: Would catch renamed fields or a broken premium type mapping.
#[test]
fn given_full_ready_payload_when_decoded_then_populates_fields() {
    // GIVEN: A complete acknowledgement with a null avatar
    let raw = r#"{
        "v": 1,
        "config": {
            "cdn_host": "cdn.example.com",
            "api_endpoint": "//example.com/api",
            "environment": "production"
        },
        "user": {
            "id": "42",
            "username": "player",
            "discriminator": "0",
            "avatar": null,
            "bot": false,
            "flags": 32,
            "premium_type": 2
        }
    }"#;

    // WHEN: Decoding
    let ready: ReadyInfo = serde_json::from_str(raw).expect("decodes");

    // THEN: Fields populated
    assert_eq!(ready.config.cdn_host, "cdn.example.com");
    assert_eq!(ready.user.id, "42");
    assert_eq!(ready.user.avatar, None);
    assert_eq!(ready.user.flags, 32);
    assert_eq!(ready.user.premium_type, PremiumType::Nitro);
}

/// **VALUE**: Verifies that unknown or null premium codes fall back to None.
///
/// **WHY THIS MATTERS**: New subscription tiers must not break login.
///
/// **BUG THIS CATCHES**: Would catch a strict enum decode of premium_type.
#[test]
fn given_unknown_premium_code_when_decoded_then_falls_back_to_none() {
    for raw in [
        r#"{"user": {"premium_type": 9}}"#,
        r#"{"user": {"premium_type": null}}"#,
    ] {
        let ready: ReadyInfo = serde_json::from_str(raw).expect("decodes");
        assert_eq!(ready.user.premium_type, PremiumType::None, "{raw}");
    }
}

/// **VALUE**: Verifies that explicit nulls read as defaults, not decode errors.
///
/// **WHY THIS MATTERS**: The companion sends `null` for fields it has no value for (bot
/// accounts, missing flags). A strict decode turns that into a failed login.
///
/// **BUG THIS CATCHES**: Would catch a non-`Option` field losing its null-tolerant
/// deserializer.
#[test]
fn given_null_fields_when_decoded_then_read_as_defaults() {
    // GIVEN: An acknowledgement with nulls at every level
    let raw = r#"{
        "v": null,
        "config": {"cdn_host": null, "api_endpoint": "//example.com/api", "environment": null},
        "user": {
            "id": null,
            "username": "player",
            "discriminator": null,
            "bot": null,
            "flags": null
        }
    }"#;

    // WHEN: Decoding
    let ready: ReadyInfo = serde_json::from_str(raw).expect("decodes");

    // THEN: Nulls become defaults, values survive
    assert_eq!(ready.v, 0);
    assert_eq!(ready.config.cdn_host, "");
    assert_eq!(ready.config.api_endpoint, "//example.com/api");
    assert_eq!(ready.user.username, "player");
    assert!(!ready.user.bot);
    assert_eq!(ready.user.flags, 0);

    // AND: Null sections do too
    let ready: ReadyInfo =
        serde_json::from_str(r#"{"v": 1, "config": null, "user": null}"#).expect("decodes");
    assert_eq!(ready.user, crate::User::default());
}
