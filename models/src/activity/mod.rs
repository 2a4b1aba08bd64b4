//! Presence activity document.
//!
//! The companion process is strict about unexpected `null`s and empty
//! objects, so every optional part of an [`Activity`] is left out of the
//! serialized form when it is absent or carries nothing.

pub mod builder;

use crate::ErrorLocation;
use crate::ModelError;

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// What the user is doing. Serialized as its integer code.
///
/// Code 1 (streaming) is reserved by the companion process and cannot be set
/// over IPC, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ActivityType {
    #[default]
    Playing,
    Listening,
    Watching,
    Custom,
    Competing,
}

impl From<ActivityType> for u8 {
    fn from(kind: ActivityType) -> Self {
        match kind {
            ActivityType::Playing => 0,
            ActivityType::Listening => 2,
            ActivityType::Watching => 3,
            ActivityType::Custom => 4,
            ActivityType::Competing => 5,
        }
    }
}

impl TryFrom<u8> for ActivityType {
    type Error = ModelError;

    #[track_caller]
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ActivityType::Playing),
            2 => Ok(ActivityType::Listening),
            3 => Ok(ActivityType::Watching),
            4 => Ok(ActivityType::Custom),
            5 => Ok(ActivityType::Competing),
            _ => Err(ModelError::UnknownActivityType {
                code,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Image keys and hover texts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default, skip_serializing_if = "absent_text")]
    pub large_image: Option<String>,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub large_text: Option<String>,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub small_image: Option<String>,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Party {
    #[serde(default, skip_serializing_if = "absent_text")]
    pub id: Option<String>,
    /// `[current, max]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
}

/// Unix epoch seconds. `end >= start` is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Secrets {
    #[serde(rename = "match", default, skip_serializing_if = "absent_text")]
    pub match_secret: Option<String>,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub join: Option<String>,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub spectate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "absent_text")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "absent")]
    pub assets: Option<Assets>,
    #[serde(default, skip_serializing_if = "absent")]
    pub party: Option<Party>,
    #[serde(default, skip_serializing_if = "absent")]
    pub timestamps: Option<Timestamps>,
    #[serde(default, skip_serializing_if = "absent")]
    pub secrets: Option<Secrets>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

/// A section that serializes to `{}` when every field is unset.
trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for Assets {
    fn is_blank(&self) -> bool {
        absent_text(&self.large_image)
            && absent_text(&self.large_text)
            && absent_text(&self.small_image)
            && absent_text(&self.small_text)
    }
}

impl Blank for Party {
    fn is_blank(&self) -> bool {
        absent_text(&self.id) && self.size.is_none()
    }
}

impl Blank for Timestamps {
    fn is_blank(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl Blank for Secrets {
    fn is_blank(&self) -> bool {
        absent_text(&self.match_secret) && absent_text(&self.join) && absent_text(&self.spectate)
    }
}

fn absent<T: Blank>(section: &Option<T>) -> bool {
    section.as_ref().is_none_or(Blank::is_blank)
}

fn absent_text(text: &Option<String>) -> bool {
    text.as_deref().is_none_or(str::is_empty)
}
