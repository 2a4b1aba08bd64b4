use crate::activity::builder::MAX_BUTTONS;
use crate::{ActivityBuilder, ActivityType, ModelError};

/// **VALUE**: Verifies that the builder carries every setter into the built Activity.
///
/// **WHY THIS MATTERS**: The builder is how hosts assemble presence. A setter that silently
/// drops its value shows the user a presence that is missing details.
///
/// **BUG THIS CATCHES**: Would catch a setter that writes to the wrong field.
#[test]
fn given_all_fields_when_building_activity_then_fields_are_carried() {
    // GIVEN: A builder with every section populated
    let builder = ActivityBuilder::default()
        .with_kind(ActivityType::Competing)
        .with_details("Ranked")
        .with_state("Round 3")
        .with_large_image("map_dust", Some(String::from("Dust")))
        .with_small_image("rank_gold", None)
        .with_party("party-1", 2, 5)
        .with_start(1_700_000_000)
        .with_end(1_700_003_600)
        .with_button("Watch", "https://example.com/watch");

    // WHEN: Building
    let activity = builder.build().expect("valid activity");

    // THEN: Every value is present
    assert_eq!(activity.kind, ActivityType::Competing);
    assert_eq!(activity.details.as_deref(), Some("Ranked"));
    assert_eq!(activity.state.as_deref(), Some("Round 3"));
    let assets = activity.assets.expect("assets");
    assert_eq!(assets.large_image.as_deref(), Some("map_dust"));
    assert_eq!(assets.large_text.as_deref(), Some("Dust"));
    assert_eq!(assets.small_image.as_deref(), Some("rank_gold"));
    assert_eq!(assets.small_text, None);
    let party = activity.party.expect("party");
    assert_eq!(party.size, Some([2, 5]));
    let timestamps = activity.timestamps.expect("timestamps");
    assert_eq!(timestamps.start, Some(1_700_000_000));
    assert_eq!(timestamps.end, Some(1_700_003_600));
    assert_eq!(activity.buttons.len(), 1);
}

/// **VALUE**: Verifies that the builder rejects more buttons than the companion renders.
///
/// **WHY THIS MATTERS**: The companion refuses the whole update when there are too many
/// buttons. Catching it at build time gives a local, descriptive error.
///
/// **BUG THIS CATCHES**: Would catch if the button count check is removed.
#[test]
fn given_three_buttons_when_building_then_returns_validation_error() {
    // GIVEN: One button over the limit
    let builder = ActivityBuilder::default()
        .with_button("One", "https://example.com/1")
        .with_button("Two", "https://example.com/2")
        .with_button("Three", "https://example.com/3");

    // WHEN: Building
    let result = builder.build();

    // THEN: Validation error naming the limit
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert!(message.contains(&MAX_BUTTONS.to_string()));
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a button without a url is rejected.
///
/// **WHY THIS MATTERS**: A button with an empty url is not clickable and the companion
/// rejects it.
///
/// **BUG THIS CATCHES**: Would catch if per-button validation is skipped.
#[test]
fn given_button_with_empty_url_when_building_then_returns_validation_error() {
    // GIVEN: A button with an empty url
    let builder = ActivityBuilder::default().with_button("Join", "");

    // WHEN: Building
    let result = builder.build();

    // THEN: Validation error mentioning the button
    match result {
        Err(ModelError::Validation { message, .. }) => assert!(message.contains("Join")),
        other => panic!("Expected validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that end-before-start timestamps pass through untouched.
///
/// **WHY THIS MATTERS**: Timestamp ordering is the caller's responsibility; the builder must
/// not "fix" or reject values.
///
/// **BUG THIS CATCHES**: Would catch if someone adds reordering or clamping.
#[test]
fn given_end_before_start_when_building_then_values_pass_through() {
    // GIVEN: Inverted timestamps
    let builder = ActivityBuilder::default().with_start(200).with_end(100);

    // WHEN: Building
    let activity = builder.build().expect("timestamps are not validated");

    // THEN: Values are unchanged
    let timestamps = activity.timestamps.expect("timestamps");
    assert_eq!(timestamps.start, Some(200));
    assert_eq!(timestamps.end, Some(100));
}
