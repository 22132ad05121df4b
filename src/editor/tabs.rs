use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::settings::{FieldSpec, APPEARANCE_FIELDS, SYSTEM_FIELDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Tab {
    Accounts,
    Appearance,
    System,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Accounts => "Accounts",
            Tab::Appearance => "Appearance",
            Tab::System => "System",
        }
    }

    /// Form rows shown on this tab. The accounts tab renders its record lists instead.
    pub fn rows(self, licensed: bool) -> Vec<FormRow> {
        match self {
            Tab::Accounts => Vec::new(),
            Tab::Appearance => APPEARANCE_FIELDS
                .iter()
                .filter(|field| field.is_visible(licensed))
                .map(FormRow::Field)
                .collect(),
            Tab::System => {
                let visible = SYSTEM_FIELDS.iter().filter(|field| field.is_visible(licensed));
                let mut rows: Vec<FormRow> = visible
                    .clone()
                    .filter(|field| !field.danger)
                    .map(FormRow::Field)
                    .collect();
                rows.extend(visible.filter(|field| field.danger).map(FormRow::Field));
                rows.push(FormRow::Action(FormAction::ClearCache));
                if licensed {
                    rows.push(FormRow::Action(FormAction::OpenLicense));
                }
                rows
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormRow {
    Field(&'static FieldSpec),
    Action(FormAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    ClearCache,
    OpenLicense,
}

impl FormAction {
    pub fn label(self) -> &'static str {
        match self {
            FormAction::ClearCache => "Clear cache",
            FormAction::OpenLicense => "Update license",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            FormAction::ClearCache => {
                "Any setting changes will be lost, the app will reload immediately"
            }
            FormAction::OpenLicense => "Change or remove the license",
        }
    }
}

/// Which sub-form is visible. Any tag is accepted; unknown tags select nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSelector {
    selected: String,
}

impl Default for TabSelector {
    fn default() -> Self {
        Self {
            selected: Tab::Accounts.to_string(),
        }
    }
}

impl TabSelector {
    pub fn select(&mut self, tag: impl Into<String>) {
        self.selected = tag.into();
    }

    pub fn selected_tag(&self) -> &str {
        &self.selected
    }

    pub fn active(&self) -> Option<Tab> {
        Tab::from_str(&self.selected).ok()
    }

    pub fn is_active(&self, tab: Tab) -> bool {
        self.active() == Some(tab)
    }

    pub fn select_next(&mut self) {
        self.step(1);
    }

    pub fn select_previous(&mut self) {
        self.step(-1);
    }

    fn step(&mut self, delta: isize) {
        let tabs: Vec<Tab> = Tab::iter().collect();
        let next = match self.active() {
            Some(tab) => {
                let index = tabs.iter().position(|t| *t == tab).unwrap_or(0) as isize;
                let len = tabs.len() as isize;
                tabs[(index + delta).rem_euclid(len) as usize]
            }
            None => Tab::Accounts,
        };
        self.select(next.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_accounts() {
        let tabs = TabSelector::default();
        assert_eq!(tabs.active(), Some(Tab::Accounts));
        assert_eq!(tabs.selected_tag(), "accounts");
    }

    #[test]
    fn unknown_tag_is_accepted_and_selects_nothing() {
        let mut tabs = TabSelector::default();
        tabs.select("filters");
        assert_eq!(tabs.selected_tag(), "filters");
        assert_eq!(tabs.active(), None);
        tabs.select_next();
        assert_eq!(tabs.active(), Some(Tab::Accounts));
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let mut tabs = TabSelector::default();
        tabs.select_previous();
        assert_eq!(tabs.active(), Some(Tab::System));
        tabs.select_next();
        assert_eq!(tabs.active(), Some(Tab::Accounts));
        tabs.select_next();
        assert!(tabs.is_active(Tab::Appearance));
    }

    #[test]
    fn system_rows_hide_licensed_entries() {
        let unlicensed = Tab::System.rows(false);
        assert!(unlicensed.contains(&FormRow::Action(FormAction::ClearCache)));
        assert!(!unlicensed.contains(&FormRow::Action(FormAction::OpenLicense)));
        assert!(!unlicensed.iter().any(|row| matches!(
            row,
            FormRow::Field(field) if field.key == "disable_analytics"
        )));

        let licensed = Tab::System.rows(true);
        assert_eq!(licensed.len(), unlicensed.len() + 3);
        assert_eq!(
            licensed.last(),
            Some(&FormRow::Action(FormAction::OpenLicense))
        );
    }

    #[test]
    fn danger_fields_follow_regular_ones() {
        let rows = Tab::System.rows(false);
        let keys: Vec<_> = rows
            .iter()
            .filter_map(|row| match row {
                FormRow::Field(field) => Some(field.key),
                FormRow::Action(_) => None,
            })
            .collect();
        assert_eq!(
            keys,
            vec!["undo_ms", "sync_interval", "sync_days", "batch_size", "initial_batches"]
        );
        assert!(Tab::Accounts.rows(true).is_empty());
    }
}
