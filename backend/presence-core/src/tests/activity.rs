// Unit tests for outbound payload construction.

use crate::activity::{CorrelationId, activity_request, handshake_frame};
use crate::frame::Opcode;

use models::{ActivityBuilder, ActivityType};

use serde_json::{Value, json};

/// **VALUE**: Verifies the handshake payload shape.
///
/// **WHY THIS MATTERS**: The companion refuses any handshake it cannot parse, and nothing
/// else works until the handshake succeeds.
///
/// **BUG THIS CATCHES**: Would catch a numeric version, renamed keys, or the wrong opcode.
#[test]
fn given_client_id_when_building_handshake_then_payload_has_version_and_client_id() {
    // GIVEN/WHEN: Building the handshake frame
    let frame = handshake_frame("abc123").expect("serializable");

    // THEN: Opcode 0 with {v: "1", client_id}
    assert_eq!(frame.kind().ok(), Some(Opcode::Handshake));
    let payload: Value = serde_json::from_slice(&frame.payload).expect("json");
    assert_eq!(payload, json!({"v": "1", "client_id": "abc123"}));
}

/// **VALUE**: Verifies the SET_ACTIVITY request shape, including pid and nonce.
///
/// **WHY THIS MATTERS**: The companion ties presence to the reporting process by pid and
/// echoes the nonce so replies can be matched.
///
/// **BUG THIS CATCHES**: Would catch a missing pid, a nonce that differs from the returned
/// CorrelationId, or empty sections leaking into the activity.
#[test]
fn given_activity_when_building_request_then_payload_carries_pid_activity_and_nonce() {
    // GIVEN: The reference activity
    let activity = ActivityBuilder::default()
        .with_kind(ActivityType::Playing)
        .with_details("Playing")
        .with_state("In Game")
        .with_start(1_700_000_000)
        .build()
        .expect("valid");

    // WHEN: Building the request
    let request = activity_request(4242, Some(&activity)).expect("serializable");

    // THEN: Opcode 1 with the full command document
    assert_eq!(request.frame.kind().ok(), Some(Opcode::Frame));
    let payload: Value = serde_json::from_slice(&request.frame.payload).expect("json");
    assert_eq!(
        payload,
        json!({
            "cmd": "SET_ACTIVITY",
            "args": {
                "pid": 4242,
                "activity": {
                    "type": 0,
                    "details": "Playing",
                    "state": "In Game",
                    "timestamps": {"start": 1_700_000_000u64}
                }
            },
            "nonce": request.nonce.as_str()
        })
    );
}

/// **VALUE**: Verifies that clearing sends an explicit null activity.
///
/// **WHY THIS MATTERS**: `null` is how the companion is told to remove the presence;
/// omitting the key is a malformed request.
///
/// **BUG THIS CATCHES**: Would catch a `skip_serializing_if` on the activity argument.
#[test]
fn given_no_activity_when_building_request_then_activity_is_null() {
    // GIVEN/WHEN: A clear request
    let request = activity_request(1, None).expect("serializable");

    // THEN: activity is present and null
    let payload: Value = serde_json::from_slice(&request.frame.payload).expect("json");
    assert_eq!(payload["args"]["activity"], Value::Null);
    assert!(payload["args"].as_object().expect("object").contains_key("activity"));
}

/// **VALUE**: Verifies that each request gets a fresh UUID-shaped nonce.
///
/// **WHY THIS MATTERS**: Reused nonces would let a late reply satisfy the wrong request.
///
/// **BUG THIS CATCHES**: Would catch a constant or counter-based nonce.
#[test]
fn given_two_requests_when_built_then_nonces_differ_and_look_like_uuids() {
    // GIVEN/WHEN: Two requests
    let first = activity_request(1, None).expect("serializable").nonce;
    let second = activity_request(1, None).expect("serializable").nonce;

    // THEN: Distinct, 36-char hyphenated identifiers
    assert_ne!(first, second);
    for nonce in [&first, &second] {
        assert_eq!(nonce.as_str().len(), 36);
        assert_eq!(nonce.as_str().matches('-').count(), 4);
    }
    assert_ne!(CorrelationId::generate(), first);
}
