//! Metadata carried by the companion's handshake acknowledgement.
//!
//! Every field is defaulted: the companion omits whatever it does not know,
//! and `{"v":1,"config":{},"user":{}}` is a valid acknowledgement. An explicit
//! `null` reads the same as an absent field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub v: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub config: ServerConfiguration,
    #[serde(deserialize_with = "null_as_default")]
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfiguration {
    #[serde(deserialize_with = "null_as_default")]
    pub cdn_host: String,
    #[serde(deserialize_with = "null_as_default")]
    pub api_endpoint: String,
    #[serde(deserialize_with = "null_as_default")]
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub discriminator: String,
    pub avatar: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub bot: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub flags: u64,
    pub premium_type: PremiumType,
}

/// Subscription tier of the logged-in user. Unknown or `null` codes read as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PremiumType {
    #[default]
    None,
    Classic,
    Nitro,
}

impl From<u8> for PremiumType {
    fn from(code: u8) -> Self {
        match code {
            1 => PremiumType::Classic,
            2 => PremiumType::Nitro,
            _ => PremiumType::None,
        }
    }
}

impl From<PremiumType> for u8 {
    fn from(premium: PremiumType) -> Self {
        match premium {
            PremiumType::None => 0,
            PremiumType::Classic => 1,
            PremiumType::Nitro => 2,
        }
    }
}

impl Serialize for PremiumType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*self))
    }
}

impl<'de> Deserialize<'de> for PremiumType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<u8>::deserialize(deserializer)?
            .map(PremiumType::from)
            .unwrap_or_default())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
