//! Declarative description of the form fields shown on the appearance and system tabs.

use super::edit_state::{EditState, InputKind};
use super::model::SettingsSection;
use super::transform::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Select,
    /// Multi select that also accepts new entries typed by the user.
    CreatableMultiSelect,
    Checkbox,
    Number { required: bool },
}

impl Widget {
    pub fn input_kind(self) -> InputKind {
        match self {
            Widget::Number { .. } => InputKind::Number,
            _ => InputKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub section: SettingsSection,
    pub label: &'static str,
    pub help: Option<&'static str>,
    pub widget: Widget,
    /// Only offered when the host reports an active license.
    pub licensed_only: bool,
    /// Rendered in the danger zone of the system tab.
    pub danger: bool,
}

impl FieldSpec {
    const fn new(
        section: SettingsSection,
        key: &'static str,
        label: &'static str,
        help: Option<&'static str>,
        widget: Widget,
    ) -> Self {
        Self {
            key,
            section,
            label,
            help,
            widget,
            licensed_only: false,
            danger: false,
        }
    }

    const fn licensed(mut self) -> Self {
        self.licensed_only = true;
        self
    }

    const fn danger(mut self) -> Self {
        self.danger = true;
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.widget, Widget::Number { required: true })
    }

    pub fn is_visible(&self, licensed: bool) -> bool {
        licensed || !self.licensed_only
    }
}

pub const APPEARANCE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        SettingsSection::Style,
        "theme_light",
        "Light theme",
        Some("Theme used when the system appearance is light"),
        Widget::Select,
    ),
    FieldSpec::new(
        SettingsSection::Style,
        "theme_dark",
        "Dark theme",
        Some("Theme used when the system appearance is dark"),
        Widget::Select,
    ),
    FieldSpec::new(
        SettingsSection::Style,
        "compact_columns",
        "Use compact column layout",
        None,
        Widget::Checkbox,
    ),
    FieldSpec::new(
        SettingsSection::Style,
        "sidebar_folders",
        "Sidebar folders",
        Some("Folders pinned to the sidebar"),
        Widget::CreatableMultiSelect,
    ),
    FieldSpec::new(
        SettingsSection::System,
        "group_single_sender_threads",
        "Group single sender threads",
        Some("Group single-message threads from the same sender"),
        Widget::Checkbox,
    ),
    FieldSpec::new(
        SettingsSection::System,
        "load_contact_icons",
        "Load contact icons",
        Some("Look up favicons and avatars for contacts"),
        Widget::Checkbox,
    ),
    FieldSpec::new(
        SettingsSection::System,
        "show_help_button",
        "Show help menu",
        None,
        Widget::Checkbox,
    ),
];

pub const SYSTEM_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        SettingsSection::System,
        "undo_ms",
        "Undo time (ms)",
        Some("How long actions can be undone for"),
        Widget::Number { required: false },
    ),
    FieldSpec::new(
        SettingsSection::System,
        "sync_interval",
        "Update interval (ms)",
        Some("How often to fetch new email"),
        Widget::Number { required: true },
    ),
    FieldSpec::new(
        SettingsSection::System,
        "sync_days",
        "Sync days",
        Some("Days of email to sync (0 = all), does not affect search"),
        Widget::Number { required: true },
    ),
    FieldSpec::new(
        SettingsSection::System,
        "disable_error_logging",
        "Disable error logging",
        Some("Stop sending anonymous error reports"),
        Widget::Checkbox,
    )
    .licensed(),
    FieldSpec::new(
        SettingsSection::System,
        "disable_analytics",
        "Disable analytics",
        Some("Stop sending anonymous usage analytics"),
        Widget::Checkbox,
    )
    .licensed(),
    FieldSpec::new(
        SettingsSection::System,
        "batch_size",
        "Batch size",
        Some("Number of emails to fetch at once"),
        Widget::Number { required: true },
    )
    .danger(),
    FieldSpec::new(
        SettingsSection::System,
        "initial_batches",
        "Initial batches",
        Some("Number of batches to fetch initially"),
        Widget::Number { required: true },
    )
    .danger(),
];

pub fn find_field(section: SettingsSection, key: &str) -> Option<&'static FieldSpec> {
    APPEARANCE_FIELDS
        .iter()
        .chain(SYSTEM_FIELDS)
        .find(|field| field.section == section && field.key == key)
}

/// Required fields of the visible form whose value was cleared by an edit. A key the
/// loaded settings never carried is left for the backend to default.
pub fn missing_required(state: &EditState, licensed: bool) -> Vec<&'static FieldSpec> {
    APPEARANCE_FIELDS
        .iter()
        .chain(SYSTEM_FIELDS)
        .filter(|field| field.is_required() && field.is_visible(licensed))
        .filter(|field| {
            state
                .get(field.section, field.key)
                .is_some_and(FieldValue::is_absent)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::edit_state::InputEvent;
    use crate::settings::model::SettingsAggregate;
    use serde_json::json;

    #[test]
    fn licensed_fields_hidden_for_unlicensed_hosts() {
        let field = find_field(SettingsSection::System, "disable_analytics").expect("field");
        assert!(!field.is_visible(false));
        assert!(field.is_visible(true));
        let undo = find_field(SettingsSection::System, "undo_ms").expect("field");
        assert!(undo.is_visible(false));
    }

    #[test]
    fn missing_required_reports_cleared_numbers() -> anyhow::Result<()> {
        let aggregate: SettingsAggregate = serde_json::from_value(json!({
            "system": { "sync_interval": 1000, "sync_days": 0, "batch_size": 50, "initial_batches": 2 }
        }))?;
        let mut state = EditState::from_aggregate(&aggregate);
        assert!(missing_required(&state, false).is_empty());

        state.update_from_input(SettingsSection::System, "batch_size", &InputEvent::number(""));
        let missing: Vec<_> = missing_required(&state, false)
            .into_iter()
            .map(|field| field.key)
            .collect();
        assert_eq!(missing, vec!["batch_size"]);

        state.update_from_input(SettingsSection::System, "undo_ms", &InputEvent::number("x"));
        assert_eq!(missing_required(&state, false).len(), 1);
        Ok(())
    }

    #[test]
    fn never_loaded_required_numbers_do_not_block() -> anyhow::Result<()> {
        let mut state = EditState::from_aggregate(&SettingsAggregate::default());
        assert!(missing_required(&state, true).is_empty());

        state.update_from_input(SettingsSection::System, "sync_days", &InputEvent::number("7"));
        assert!(missing_required(&state, true).is_empty());

        state.update_from_input(SettingsSection::System, "sync_days", &InputEvent::number(""));
        let missing: Vec<_> = missing_required(&state, true)
            .into_iter()
            .map(|field| field.key)
            .collect();
        assert_eq!(missing, vec!["sync_days"]);
        Ok(())
    }

    #[test]
    fn number_widgets_parse_as_numbers() {
        assert_eq!(
            Widget::Number { required: true }.input_kind(),
            InputKind::Number
        );
        assert_eq!(Widget::Select.input_kind(), InputKind::Text);
    }
}
