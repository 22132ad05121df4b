use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::list_editor::ListEditor;
use super::model::{ListSection, SettingsAggregate, SettingsSection};
use super::transform::{FieldKind, FieldValue, OptionPair};

pub type Section = IndexMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Number,
}

/// Raw text delivered by an input widget along with the widget's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub raw: String,
}

impl InputEvent {
    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Text,
            raw: raw.into(),
        }
    }

    pub fn number(raw: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Number,
            raw: raw.into(),
        }
    }
}

/// In-memory mirror of a [`SettingsAggregate`] shaped for the form widgets.
///
/// Mutations never validate; required fields and numeric ranges are the form's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    accounts: ListEditor<Value>,
    signatures: ListEditor<Value>,
    system: Section,
    style: Section,
    initial_sidebar_folder_options: Vec<OptionPair>,
}

impl EditState {
    pub fn from_aggregate(aggregate: &SettingsAggregate) -> Self {
        let system = wrap_section(SettingsSection::System, &aggregate.system);
        let style = wrap_section(SettingsSection::Style, &aggregate.style);
        let initial_sidebar_folder_options = style
            .get("sidebar_folders")
            .and_then(FieldValue::as_choices)
            .map(<[OptionPair]>::to_vec)
            .unwrap_or_default();
        Self {
            accounts: ListEditor::new(aggregate.accounts.clone()),
            signatures: ListEditor::new(aggregate.signatures.clone()),
            system,
            style,
            initial_sidebar_folder_options,
        }
    }

    pub fn section(&self, section: SettingsSection) -> &Section {
        match section {
            SettingsSection::System => &self.system,
            SettingsSection::Style => &self.style,
        }
    }

    fn section_mut(&mut self, section: SettingsSection) -> &mut Section {
        match section {
            SettingsSection::System => &mut self.system,
            SettingsSection::Style => &mut self.style,
        }
    }

    pub fn get(&self, section: SettingsSection, key: &str) -> Option<&FieldValue> {
        self.section(section).get(key)
    }

    pub fn list(&self, section: ListSection) -> &ListEditor<Value> {
        match section {
            ListSection::Accounts => &self.accounts,
            ListSection::Signatures => &self.signatures,
        }
    }

    pub fn list_mut(&mut self, section: ListSection) -> &mut ListEditor<Value> {
        match section {
            ListSection::Accounts => &mut self.accounts,
            ListSection::Signatures => &mut self.signatures,
        }
    }

    /// Option set the sidebar folder picker started with; never mutated after load.
    pub fn initial_sidebar_folder_options(&self) -> &[OptionPair] {
        &self.initial_sidebar_folder_options
    }

    pub fn update(&mut self, section: SettingsSection, key: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        tracing::debug!(%section, key, ?value, "settings field updated");
        let entries = self.section_mut(section);
        match entries.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                entries.insert(key.to_owned(), value);
            }
        }
    }

    /// Number inputs that do not start with an integer (including empty text) store
    /// [`FieldValue::Absent`] rather than failing.
    pub fn update_from_input(&mut self, section: SettingsSection, key: &str, event: &InputEvent) {
        let value = match event.kind {
            InputKind::Text => FieldValue::Json(Value::String(event.raw.clone())),
            InputKind::Number => parse_numeric_input(&event.raw)
                .map(FieldValue::from)
                .unwrap_or(FieldValue::Absent),
        };
        self.update(section, key, value);
    }

    /// Writes the negation of the current value, treating a missing value as unchecked.
    /// Returns the new state.
    pub fn toggle_checkbox(&mut self, section: SettingsSection, key: &str) -> bool {
        let checked = self
            .get(section, key)
            .map(FieldValue::is_truthy)
            .unwrap_or(false);
        self.update(section, key, !checked);
        !checked
    }

    /// Unwraps every edited field back into the persisted shape. `columns` is taken from
    /// the aggregate the editor was opened with and passed through untouched.
    pub fn to_aggregate(&self, columns: Option<Value>) -> SettingsAggregate {
        SettingsAggregate {
            accounts: self.accounts.items().to_vec(),
            signatures: self.signatures.items().to_vec(),
            system: unwrap_section(&self.system),
            style: unwrap_section(&self.style),
            columns,
        }
    }
}

/// Reads the leading integer of `raw`, ignoring anything after it: `"12ms"` is 12 and
/// `"1.5"` is 1. Text without leading digits is `None`.
pub fn parse_numeric_input(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let sign = usize::from(trimmed.starts_with(['+', '-']));
    let end = trimmed[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed.len(), |offset| sign + offset);
    trimmed[..end].parse().ok()
}

fn wrap_section(section: SettingsSection, values: &Map<String, Value>) -> Section {
    values
        .iter()
        .map(|(key, value)| {
            let kind = FieldKind::of(section, key);
            (key.clone(), kind.wrap(value.clone()))
        })
        .collect()
}

fn unwrap_section(entries: &Section) -> Map<String, Value> {
    entries
        .iter()
        .filter_map(|(key, value)| value.unwrap_value().map(|json| (key.clone(), json)))
        .collect()
}
