//! Conversions between persisted setting values and the shapes the form widgets edit.
//!
//! Select widgets work on `{label, value}` pairs while the backend stores bare strings.
//! Labels always equal values here, so wrapping and unwrapping are exact inverses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::SettingsSection;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionPair {
    pub label: String,
    pub value: String,
}

impl OptionPair {
    pub fn new(value: impl Into<String>) -> Self {
        wrap_scalar_as_option(value)
    }
}

pub fn wrap_scalar_as_option(value: impl Into<String>) -> OptionPair {
    let value = value.into();
    OptionPair {
        label: value.clone(),
        value,
    }
}

pub fn wrap_list_as_options<I, S>(list: I) -> Vec<OptionPair>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    list.into_iter().map(wrap_scalar_as_option).collect()
}

pub fn unwrap_option(option: &OptionPair) -> String {
    option.value.clone()
}

pub fn unwrap_options_list(options: &[OptionPair]) -> Vec<String> {
    options.iter().map(unwrap_option).collect()
}

/// How a persisted field is presented to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Edited as-is (numbers, booleans, anything unknown).
    Plain,
    /// Backed by a single select.
    Scalar,
    /// Backed by a multi select.
    List,
}

impl FieldKind {
    pub fn of(section: SettingsSection, key: &str) -> Self {
        match (section, key) {
            (SettingsSection::Style, "theme_light" | "theme_dark") => FieldKind::Scalar,
            (SettingsSection::Style, "sidebar_folders") => FieldKind::List,
            _ => FieldKind::Plain,
        }
    }

    /// Values that do not have the expected shape (a non-string theme, a folder list
    /// holding numbers) are carried through untouched so they survive a save.
    pub fn wrap(self, value: Value) -> FieldValue {
        match self {
            FieldKind::Plain => FieldValue::Json(value),
            FieldKind::Scalar => match value {
                Value::String(text) => FieldValue::Choice(wrap_scalar_as_option(text)),
                other => FieldValue::Json(other),
            },
            FieldKind::List => match value {
                Value::Array(items) if items.iter().all(Value::is_string) => {
                    FieldValue::Choices(wrap_list_as_options(
                        items.into_iter().filter_map(|item| match item {
                            Value::String(text) => Some(text),
                            _ => None,
                        }),
                    ))
                }
                other => FieldValue::Json(other),
            },
        }
    }
}

/// A single entry of an edited section.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Cleared by the user; dropped from the saved payload.
    Absent,
    Json(Value),
    Choice(OptionPair),
    Choices(Vec<OptionPair>),
}

impl FieldValue {
    pub fn unwrap_value(&self) -> Option<Value> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Json(value) => Some(value.clone()),
            FieldValue::Choice(option) => Some(Value::String(unwrap_option(option))),
            FieldValue::Choices(options) => Some(Value::Array(
                unwrap_options_list(options)
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            )),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Checkbox reading: null, false, zero and empty strings are unchecked.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Json(Value::Bool(flag)) => *flag,
            FieldValue::Json(Value::Number(number)) => number.as_f64().map_or(false, |n| n != 0.0),
            FieldValue::Json(Value::String(text)) => !text.is_empty(),
            FieldValue::Json(Value::Array(_) | Value::Object(_)) => true,
            FieldValue::Choice(_) | FieldValue::Choices(_) => true,
            FieldValue::Json(Value::Null) | FieldValue::Absent => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Json(value) => value.as_i64(),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&OptionPair> {
        match self {
            FieldValue::Choice(option) => Some(option),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[OptionPair]> {
        match self {
            FieldValue::Choices(options) => Some(options),
            _ => None,
        }
    }

    /// Short text used when the value is shown in a form row.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Json(Value::String(text)) => text.clone(),
            FieldValue::Json(value) => value.to_string(),
            FieldValue::Choice(option) => option.label.clone(),
            FieldValue::Choices(options) => options
                .iter()
                .map(|option| option.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Json(Value::Bool(flag))
    }
}

impl From<i64> for FieldValue {
    fn from(number: i64) -> Self {
        FieldValue::Json(Value::from(number))
    }
}

impl From<OptionPair> for FieldValue {
    fn from(option: OptionPair) -> Self {
        FieldValue::Choice(option)
    }
}

impl From<Vec<OptionPair>> for FieldValue {
    fn from(options: Vec<OptionPair>) -> Self {
        FieldValue::Choices(options)
    }
}
