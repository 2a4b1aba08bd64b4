use crate::{Activity, ActivityBuilder, ActivityType, ModelError, Secrets};

use serde_json::{Value, json};

/// **VALUE**: Verifies that a minimal activity serializes without any empty sections.
///
/// **WHY THIS MATTERS**: The companion process rejects explicit `null`s and empty objects in
/// optional sections. A builder-made activity always carries (possibly blank) sections.
///
/// **BUG THIS CATCHES**: Would catch if a `skip_serializing_if` is removed from any section.
#[test]
fn given_minimal_activity_when_serialized_then_omits_empty_sections() {
    // GIVEN: An activity with only details set
    let activity = ActivityBuilder::default()
        .with_details("Idle")
        .build()
        .expect("valid activity");

    // WHEN: Serializing
    let value = serde_json::to_value(&activity).expect("serializable");

    // THEN: Only type and details are present
    assert_eq!(value, json!({"type": 0, "details": "Idle"}));
}

/// **VALUE**: Verifies the serialized shape of the reference "Playing" example.
///
/// **WHY THIS MATTERS**: This is the exact payload hosts send most often.
///
/// **BUG THIS CATCHES**: Would catch renamed fields or timestamps emitted as strings.
#[test]
fn given_playing_activity_when_serialized_then_matches_wire_shape() {
    // GIVEN: The reference activity
    let activity = ActivityBuilder::default()
        .with_kind(ActivityType::Playing)
        .with_details("Playing")
        .with_state("In Game")
        .with_start(1_700_000_000)
        .build()
        .expect("valid activity");

    // WHEN: Serializing
    let value = serde_json::to_value(&activity).expect("serializable");

    // THEN: Wire shape matches
    assert_eq!(
        value,
        json!({
            "type": 0,
            "details": "Playing",
            "state": "In Game",
            "timestamps": {"start": 1_700_000_000u64}
        })
    );
}

/// **VALUE**: Verifies that activity types serialize as their protocol codes.
///
/// **WHY THIS MATTERS**: Code 1 is skipped by the protocol, so a naive ordinal encoding
/// would shift every type after Playing.
///
/// **BUG THIS CATCHES**: Would catch if the enum is serialized by ordinal or by name.
#[test]
fn given_each_activity_type_when_serialized_then_uses_protocol_code() {
    let cases = [
        (ActivityType::Playing, 0),
        (ActivityType::Listening, 2),
        (ActivityType::Watching, 3),
        (ActivityType::Custom, 4),
        (ActivityType::Competing, 5),
    ];

    for (kind, code) in cases {
        let value = serde_json::to_value(kind).expect("serializable");
        assert_eq!(value, Value::from(code), "{kind:?}");
    }
}

/// **VALUE**: Verifies that the reserved streaming code is refused on decode.
///
/// **WHY THIS MATTERS**: Hosts that persist activities must not load a type the protocol
/// does not accept over IPC.
///
/// **BUG THIS CATCHES**: Would catch if `TryFrom<u8>` accepts code 1.
#[test]
fn given_reserved_code_when_converting_then_returns_unknown_type_error() {
    // GIVEN/WHEN: Converting code 1
    let result = ActivityType::try_from(1u8);

    // THEN: Unknown type error
    assert!(matches!(
        result,
        Err(ModelError::UnknownActivityType { code: 1, .. })
    ));
}

/// **VALUE**: Verifies that the match secret is written under its protocol key.
///
/// **WHY THIS MATTERS**: `match` is a Rust keyword; the field is renamed internally and must
/// be renamed back on the wire.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(rename = "match")]`.
#[test]
fn given_match_secret_when_serialized_then_uses_match_key() {
    // GIVEN: Activity with secrets
    let activity = ActivityBuilder::default()
        .with_secrets(Secrets {
            match_secret: Some(String::from("m-1")),
            join: Some(String::new()),
            spectate: None,
        })
        .build()
        .expect("valid activity");

    // WHEN: Serializing
    let value = serde_json::to_value(&activity).expect("serializable");

    // THEN: Only the non-empty secret is present, under "match"
    assert_eq!(value["secrets"], json!({"match": "m-1"}));
}

/// **VALUE**: Verifies that a hand-written activity with an empty party is still lean.
///
/// **WHY THIS MATTERS**: Hosts may construct Activity directly instead of via the builder.
///
/// **BUG THIS CATCHES**: Would catch if blank detection only works for builder output.
#[test]
fn given_struct_literal_with_blank_party_when_serialized_then_party_is_omitted() {
    // GIVEN: A literal with an empty party and an empty details string
    let activity = Activity {
        details: Some(String::new()),
        party: Some(Default::default()),
        ..Default::default()
    };

    // WHEN: Serializing
    let value = serde_json::to_value(&activity).expect("serializable");

    // THEN: Only the type remains
    assert_eq!(value, json!({"type": 0}));
}
