use crate::error::model_error::ModelError;
use crate::{Activity, ActivityType, Assets, Button, ErrorLocation, Party, Secrets, Timestamps};

use std::panic::Location;

/// The companion process renders at most this many buttons and rejects more.
pub const MAX_BUTTONS: usize = 2;

/// Builder for creating validated Activity instances.
///
/// Timestamps are passed through as given; only buttons are validated.
#[derive(Debug, Default)]
pub struct ActivityBuilder {
    kind: ActivityType,
    details: Option<String>,
    state: Option<String>,
    assets: Assets,
    party: Party,
    timestamps: Timestamps,
    secrets: Secrets,
    buttons: Vec<Button>,
}

impl ActivityBuilder {
    pub fn with_kind(mut self, kind: ActivityType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_large_image(mut self, key: impl Into<String>, text: Option<String>) -> Self {
        self.assets.large_image = Some(key.into());
        self.assets.large_text = text;
        self
    }

    pub fn with_small_image(mut self, key: impl Into<String>, text: Option<String>) -> Self {
        self.assets.small_image = Some(key.into());
        self.assets.small_text = text;
        self
    }

    pub fn with_party(mut self, id: impl Into<String>, current: u32, max: u32) -> Self {
        self.party.id = Some(id.into());
        self.party.size = Some([current, max]);
        self
    }

    pub fn with_start(mut self, epoch_seconds: u64) -> Self {
        self.timestamps.start = Some(epoch_seconds);
        self
    }

    pub fn with_end(mut self, epoch_seconds: u64) -> Self {
        self.timestamps.end = Some(epoch_seconds);
        self
    }

    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_button(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    /// Build the Activity, validating buttons.
    #[track_caller]
    pub fn build(self) -> Result<Activity, ModelError> {
        if self.buttons.len() > MAX_BUTTONS {
            return Err(ModelError::Validation {
                message: format!(
                    "At most {MAX_BUTTONS} buttons are allowed, got {}",
                    self.buttons.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        for button in &self.buttons {
            if button.label.is_empty() {
                return Err(ModelError::Validation {
                    message: String::from("Button label cannot be empty"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if button.url.is_empty() {
                return Err(ModelError::Validation {
                    message: format!("Button '{}' has an empty url", button.label),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(Activity {
            kind: self.kind,
            details: self.details,
            state: self.state,
            assets: Some(self.assets),
            party: Some(self.party),
            timestamps: Some(self.timestamps),
            secrets: Some(self.secrets),
            buttons: self.buttons,
        })
    }
}
