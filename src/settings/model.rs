use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};

/// The persisted settings payload exchanged with `/api/settings`.
///
/// Accounts and signatures are opaque records; `columns` is never edited and is sent
/// back exactly as it was loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsAggregate {
    #[serde(default)]
    pub accounts: Vec<Value>,
    #[serde(default)]
    pub signatures: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub system: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub style: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub columns: Option<Value>,
}

impl SettingsAggregate {
    pub fn section(&self, section: SettingsSection) -> &Map<String, Value> {
        match section {
            SettingsSection::System => &self.system,
            SettingsSection::Style => &self.style,
        }
    }

    pub fn section_mut(&mut self, section: SettingsSection) -> &mut Map<String, Value> {
        match section {
            SettingsSection::System => &mut self.system,
            SettingsSection::Style => &mut self.style,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Map<String, Value>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

// Keeps an explicit `null` distinct from a missing key.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Response of `GET /api/settings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadedSettings {
    pub settings: SettingsAggregate,
    #[serde(default)]
    pub account_name_to_connected: IndexMap<String, bool>,
}

/// Keyed sections edited field-by-field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSection {
    #[strum(to_string = "system", serialize = "systemSettings")]
    System,
    #[strum(to_string = "style", serialize = "styleSettings")]
    Style,
}

/// Ordered record sections edited through a [`ListEditor`](super::ListEditor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ListSection {
    Accounts,
    Signatures,
}
