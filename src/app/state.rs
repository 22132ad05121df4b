use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::api::{ApiRequest, Completed, RequestKind};
use crate::editor::{FormAction, FormRow, LicenseEditor, SaveAttempt, SettingsEditor, Tab};
use crate::settings::{
    FieldSpec, FieldValue, InputEvent, ListSection, OptionPair, SettingsSection, Widget,
};

const MAX_INPUT_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberOverlay {
    pub section: SettingsSection,
    pub key: &'static str,
    pub label: &'static str,
    pub input: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderOverlay {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayState {
    Number(NumberOverlay),
    NewFolder(FolderOverlay),
}

impl OverlayState {
    fn input_mut(&mut self) -> &mut String {
        match self {
            OverlayState::Number(overlay) => &mut overlay.input,
            OverlayState::NewFolder(overlay) => &mut overlay.input,
        }
    }
}

/// A record shown on the accounts tab.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub section: ListSection,
    pub index: usize,
    pub name: String,
    pub connected: Option<bool>,
}

/// Which editor currently receives input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Settings,
    License,
}

/// Everything the terminal front end renders, independent of the terminal itself.
#[derive(Debug, Clone)]
pub struct AppState {
    settings: Option<SettingsEditor>,
    license: Option<LicenseEditor>,
    pub selected: usize,
    overlay: Option<OverlayState>,
    status_message: Option<String>,
    close_requested: bool,
}

impl AppState {
    pub fn for_settings(editor: SettingsEditor) -> Self {
        Self {
            settings: Some(editor),
            license: None,
            selected: 0,
            overlay: None,
            status_message: None,
            close_requested: false,
        }
    }

    pub fn for_license(editor: LicenseEditor) -> Self {
        Self {
            settings: None,
            license: Some(editor),
            selected: 0,
            overlay: None,
            status_message: None,
            close_requested: false,
        }
    }

    pub fn screen(&self) -> Screen {
        if self.license.is_some() {
            Screen::License
        } else {
            Screen::Settings
        }
    }

    pub fn settings(&self) -> Option<&SettingsEditor> {
        self.settings.as_ref()
    }

    pub fn settings_mut(&mut self) -> Option<&mut SettingsEditor> {
        self.settings.as_mut()
    }

    pub fn license(&self) -> Option<&LicenseEditor> {
        self.license.as_ref()
    }

    pub fn license_mut(&mut self) -> Option<&mut LicenseEditor> {
        self.license.as_mut()
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    /// Set once the editor that owns the window finished successfully.
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn open_license(&mut self, editor: LicenseEditor) {
        self.overlay = None;
        self.license = Some(editor);
    }

    /// Leaves the license screen; returns `false` when there is nothing underneath.
    pub fn close_license(&mut self) -> bool {
        if self.settings.is_none() {
            return false;
        }
        self.license = None;
        true
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.settings.as_ref().and_then(SettingsEditor::active_tab)
    }

    pub fn select_tab(&mut self, tag: &str) {
        if let Some(editor) = self.settings.as_mut() {
            editor.select_tab(tag);
            self.selected = 0;
        }
    }

    pub fn cycle_tab(&mut self, forward: bool) {
        if let Some(editor) = self.settings.as_mut() {
            if forward {
                editor.tabs_mut().select_next();
            } else {
                editor.tabs_mut().select_previous();
            }
            self.selected = 0;
        }
    }

    pub fn rows(&self) -> Vec<FormRow> {
        match (self.settings.as_ref(), self.active_tab()) {
            (Some(editor), Some(tab)) => tab.rows(editor.host().licensed),
            _ => Vec::new(),
        }
    }

    pub fn record_rows(&self) -> Vec<RecordRow> {
        let Some(editor) = self.settings.as_ref() else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        for section in [ListSection::Accounts, ListSection::Signatures] {
            for (index, record) in editor.state().list(section).items().iter().enumerate() {
                let name = record_name(record);
                let connected = match section {
                    ListSection::Accounts => editor.is_connected(&name),
                    ListSection::Signatures => None,
                };
                rows.push(RecordRow {
                    section,
                    index,
                    name,
                    connected,
                });
            }
        }
        rows
    }

    fn row_count(&self) -> usize {
        match self.active_tab() {
            Some(Tab::Accounts) => self.record_rows().len(),
            Some(_) => self.rows().len(),
            None => 0,
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let count = self.row_count();
        if count == 0 {
            self.selected = 0;
            return;
        }
        let current = self.selected.min(count - 1) as isize;
        self.selected = (current + delta).clamp(0, count as isize - 1) as usize;
    }

    pub fn selected_row(&self) -> Option<FormRow> {
        self.rows().get(self.selected).copied()
    }

    fn selected_field(&self) -> Option<&'static FieldSpec> {
        match self.selected_row()? {
            FormRow::Field(field) => Some(field),
            FormRow::Action(_) => None,
        }
    }

    pub fn selected_record(&self) -> Option<RecordRow> {
        if self.active_tab() != Some(Tab::Accounts) {
            return None;
        }
        self.record_rows().into_iter().nth(self.selected)
    }

    /// Space on a checkbox row.
    pub fn toggle_selected(&mut self) -> bool {
        let Some(field) = self.selected_field() else {
            return false;
        };
        if field.widget != Widget::Checkbox {
            return false;
        }
        match self.settings.as_mut() {
            Some(editor) => {
                editor.toggle_checkbox(field.section, field.key);
                true
            }
            None => false,
        }
    }

    /// Left/right on a select row steps through the theme options.
    pub fn cycle_selected_option(&mut self, delta: isize) -> bool {
        let Some(field) = self.selected_field() else {
            return false;
        };
        if field.widget != Widget::Select {
            return false;
        }
        let Some(editor) = self.settings.as_mut() else {
            return false;
        };
        let options = editor.theme_options();
        if options.is_empty() {
            return false;
        }
        let current = editor
            .state()
            .get(field.section, field.key)
            .and_then(FieldValue::as_choice)
            .and_then(|choice| options.iter().position(|option| option == choice));
        let len = options.len() as isize;
        let next = match current {
            Some(index) => (index as isize + delta).rem_euclid(len) as usize,
            None => 0,
        };
        editor.update(field.section, field.key, options[next].clone());
        true
    }

    /// Enter on a number or folder row opens an input overlay.
    pub fn begin_edit_selected(&mut self) -> bool {
        let Some(field) = self.selected_field() else {
            return false;
        };
        let Some(editor) = self.settings.as_ref() else {
            return false;
        };
        match field.widget {
            Widget::Number { .. } => {
                let input = editor
                    .state()
                    .get(field.section, field.key)
                    .map(FieldValue::display)
                    .unwrap_or_default();
                self.overlay = Some(OverlayState::Number(NumberOverlay {
                    section: field.section,
                    key: field.key,
                    label: field.label,
                    input,
                }));
                true
            }
            Widget::CreatableMultiSelect => {
                self.overlay = Some(OverlayState::NewFolder(FolderOverlay::default()));
                true
            }
            Widget::Checkbox | Widget::Select => false,
        }
    }

    pub fn overlay_push_char(&mut self, ch: char) {
        if let Some(overlay) = self.overlay.as_mut() {
            let input = overlay.input_mut();
            if input.len() < MAX_INPUT_LEN {
                input.push(ch);
            }
        }
    }

    pub fn overlay_pop_char(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            pop_grapheme(overlay.input_mut());
        }
    }

    pub fn cancel_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn commit_overlay(&mut self) {
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        let Some(editor) = self.settings.as_mut() else {
            return;
        };
        match overlay {
            OverlayState::Number(number) => {
                editor.update_from_input(number.section, number.key, &InputEvent::number(number.input));
            }
            OverlayState::NewFolder(folder) => {
                let name = folder.input.trim();
                if name.is_empty() {
                    return;
                }
                let mut folders = current_folders(editor);
                folders.push(OptionPair::new(name));
                editor.update(SettingsSection::Style, "sidebar_folders", folders);
            }
        }
    }

    /// `x` removes the selected record, or the last sidebar folder on the folder row.
    pub fn remove_selected(&mut self) -> bool {
        if let Some(record) = self.selected_record() {
            let Some(editor) = self.settings.as_mut() else {
                return false;
            };
            let list = editor.list_mut(record.section);
            let Some(item) = list.get(record.index).cloned() else {
                return false;
            };
            list.remove(&item);
            self.move_selection(0);
            return true;
        }
        let Some(field) = self.selected_field() else {
            return false;
        };
        if field.widget != Widget::CreatableMultiSelect {
            return false;
        }
        let Some(editor) = self.settings.as_mut() else {
            return false;
        };
        let mut folders = current_folders(editor);
        if folders.pop().is_none() {
            return false;
        }
        editor.update(field.section, field.key, folders);
        true
    }

    /// Shift+J/K reorders the selected record within its own list.
    pub fn move_selected_record(&mut self, delta: isize) -> bool {
        let Some(record) = self.selected_record() else {
            return false;
        };
        let Some(editor) = self.settings.as_mut() else {
            return false;
        };
        let list = editor.list_mut(record.section);
        let target = record.index as isize + delta;
        if target < 0 || target >= list.len() as isize {
            return false;
        }
        list.move_item(record.index, target as usize);
        self.move_selection(delta);
        true
    }

    pub fn selected_action(&self) -> Option<FormAction> {
        match self.selected_row()? {
            FormRow::Action(action) => Some(action),
            FormRow::Field(_) => None,
        }
    }

    pub fn submit_settings(&mut self) -> Option<ApiRequest> {
        let editor = self.settings.as_mut()?;
        match editor.submit_save() {
            SaveAttempt::Request(request) => {
                self.status_message = Some("Saving settings...".into());
                Some(request)
            }
            SaveAttempt::Acknowledged => {
                self.status_message = None;
                None
            }
            SaveAttempt::Ignored => None,
            SaveAttempt::MissingRequired(keys) => {
                self.status_message = Some(format!("Required: {}", keys.join(", ")));
                None
            }
        }
    }

    pub fn license_push_char(&mut self, ch: char) {
        if let Some(editor) = self.license.as_mut() {
            if editor.license().len() < MAX_INPUT_LEN * 8 {
                editor.license_mut().push(ch);
            }
        }
    }

    pub fn license_pop_char(&mut self) {
        if let Some(editor) = self.license.as_mut() {
            pop_grapheme(editor.license_mut());
        }
    }

    /// Routes a finished request to the editor that issued it.
    pub fn apply(&mut self, completed: Completed) {
        let Completed { kind, outcome } = completed;
        match kind {
            RequestKind::ActivateLicense | RequestKind::RemoveLicense => {
                let Some(editor) = self.license.as_mut() else {
                    tracing::warn!(%kind, "license outcome with no license editor open");
                    return;
                };
                editor.complete(kind, outcome);
                if editor.close_requested() {
                    if self.close_license() {
                        self.status_message =
                            Some("License updated, reload the main window to apply it".into());
                    } else {
                        self.close_requested = true;
                    }
                }
            }
            RequestKind::SaveSettings | RequestKind::BustCache => {
                let Some(editor) = self.settings.as_mut() else {
                    tracing::warn!(%kind, "settings outcome with no settings editor open");
                    return;
                };
                editor.complete(kind, outcome);
                if kind == RequestKind::BustCache && !editor.close_requested() {
                    self.status_message = Some("Clearing the cache failed, see the log".into());
                }
                if editor.close_requested() {
                    self.close_requested = true;
                }
            }
        }
    }

    /// Text printed once the terminal is restored.
    pub fn farewell(&self) -> Option<String> {
        if let Some(editor) = self.license.as_ref() {
            if editor.close_requested() {
                return Some(editor.submit_button().text);
            }
        }
        let editor = self.settings.as_ref()?;
        if let Some(message) = editor.message() {
            return Some(message.text);
        }
        editor
            .close_requested()
            .then(|| "Cache cleared, restart the mail client to reload".to_string())
    }
}

fn current_folders(editor: &SettingsEditor) -> Vec<OptionPair> {
    editor
        .state()
        .get(SettingsSection::Style, "sidebar_folders")
        .and_then(FieldValue::as_choices)
        .map(<[OptionPair]>::to_vec)
        .unwrap_or_default()
}

fn record_name(record: &Value) -> String {
    record
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| "(unnamed)".to_string())
}

fn pop_grapheme(text: &mut String) {
    if let Some((index, _)) = text.grapheme_indices(true).next_back() {
        text.truncate(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::config::themes::ThemeRegistry;
    use crate::config::HostCapabilities;
    use crate::settings::LoadedSettings;
    use serde_json::json;

    fn state() -> anyhow::Result<AppState> {
        let loaded: LoadedSettings = serde_json::from_value(json!({
            "settings": {
                "accounts": [{ "name": "work" }, { "name": "home" }],
                "signatures": [{ "name": "short" }],
                "system": {
                    "undo_ms": 5000,
                    "sync_interval": 60000,
                    "sync_days": 0,
                    "batch_size": 50,
                    "initial_batches": 3,
                    "load_contact_icons": true
                },
                "style": {
                    "theme_light": "light",
                    "theme_dark": "dark",
                    "sidebar_folders": ["Inbox"]
                }
            },
            "account_name_to_connected": { "work": true, "home": false }
        }))?;
        Ok(AppState::for_settings(SettingsEditor::new(
            loaded,
            HostCapabilities::default(),
            ThemeRegistry::new(["light", "dark", "dusk"]),
        )))
    }

    fn select_field(state: &mut AppState, key: &str) {
        let index = state
            .rows()
            .iter()
            .position(|row| matches!(row, FormRow::Field(field) if field.key == key))
            .expect("field on tab");
        state.selected = index;
    }

    fn payload_value(state: &AppState, section: SettingsSection, key: &str) -> Option<Value> {
        let payload = state.settings().expect("editor").payload();
        payload.section(section).get(key).cloned()
    }

    #[test]
    fn accounts_tab_lists_accounts_then_signatures() -> anyhow::Result<()> {
        let state = state()?;
        let rows = state.record_rows();
        let names: Vec<_> = rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["work", "home", "short"]);
        assert_eq!(rows[0].connected, Some(true));
        assert_eq!(rows[1].connected, Some(false));
        assert_eq!(rows[2].connected, None);
        Ok(())
    }

    #[test]
    fn reordering_records_stays_within_list() -> anyhow::Result<()> {
        let mut state = state()?;
        state.selected = 1;
        assert!(state.move_selected_record(-1));
        assert_eq!(state.selected, 0);
        let names: Vec<_> = state.record_rows().into_iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["home", "work", "short"]);

        state.selected = 2;
        assert!(!state.move_selected_record(-1));
        assert!(state.remove_selected());
        assert_eq!(state.record_rows().len(), 2);
        assert_eq!(state.selected, 1);
        Ok(())
    }

    #[test]
    fn space_toggles_checkbox_rows() -> anyhow::Result<()> {
        let mut state = state()?;
        state.select_tab("appearance");
        select_field(&mut state, "load_contact_icons");
        assert!(state.toggle_selected());
        assert_eq!(
            payload_value(&state, SettingsSection::System, "load_contact_icons"),
            Some(json!(false))
        );
        select_field(&mut state, "theme_dark");
        assert!(!state.toggle_selected());
        Ok(())
    }

    #[test]
    fn theme_select_cycles_through_registry() -> anyhow::Result<()> {
        let mut state = state()?;
        state.select_tab("appearance");
        select_field(&mut state, "theme_dark");
        assert!(state.cycle_selected_option(1));
        assert_eq!(
            payload_value(&state, SettingsSection::Style, "theme_dark"),
            Some(json!("dusk"))
        );
        assert!(state.cycle_selected_option(1));
        assert_eq!(
            payload_value(&state, SettingsSection::Style, "theme_dark"),
            Some(json!("light"))
        );
        Ok(())
    }

    #[test]
    fn number_overlay_commits_through_input_parser() -> anyhow::Result<()> {
        let mut state = state()?;
        state.select_tab("system");
        select_field(&mut state, "sync_days");
        assert!(state.begin_edit_selected());
        assert_eq!(
            state.overlay(),
            Some(&OverlayState::Number(NumberOverlay {
                section: SettingsSection::System,
                key: "sync_days",
                label: "Sync days",
                input: "0".into(),
            }))
        );
        state.overlay_pop_char();
        for ch in "30".chars() {
            state.overlay_push_char(ch);
        }
        state.commit_overlay();
        assert!(state.overlay().is_none());
        assert_eq!(
            payload_value(&state, SettingsSection::System, "sync_days"),
            Some(json!(30))
        );

        assert!(state.begin_edit_selected());
        state.overlay_pop_char();
        state.overlay_pop_char();
        state.overlay_push_char('x');
        state.commit_overlay();
        assert_eq!(payload_value(&state, SettingsSection::System, "sync_days"), None);
        assert_eq!(state.submit_settings(), None);
        assert_eq!(state.status_message(), Some("Required: sync_days"));
        Ok(())
    }

    #[test]
    fn folder_overlay_appends_and_x_removes() -> anyhow::Result<()> {
        let mut state = state()?;
        state.select_tab("appearance");
        select_field(&mut state, "sidebar_folders");
        assert!(state.begin_edit_selected());
        for ch in " Receipts ".chars() {
            state.overlay_push_char(ch);
        }
        state.commit_overlay();
        assert_eq!(
            payload_value(&state, SettingsSection::Style, "sidebar_folders"),
            Some(json!(["Inbox", "Receipts"]))
        );
        assert!(state.remove_selected());
        assert!(state.remove_selected());
        assert!(!state.remove_selected());
        assert_eq!(
            payload_value(&state, SettingsSection::Style, "sidebar_folders"),
            Some(json!([]))
        );
        Ok(())
    }

    #[test]
    fn failed_save_sets_message_then_success_requests_close() -> anyhow::Result<()> {
        let mut state = state()?;
        let request = state.submit_settings().expect("request");
        assert_eq!(request.kind(), RequestKind::SaveSettings);
        state.apply(Completed {
            kind: RequestKind::SaveSettings,
            outcome: Err(ApiError::remote(500, "disk full")),
        });
        assert!(!state.close_requested());
        assert_eq!(
            state.settings().and_then(SettingsEditor::message).map(|m| m.text),
            Some("Error saving settings: disk full".to_string())
        );

        assert!(state.submit_settings().is_some());
        state.apply(Completed {
            kind: RequestKind::SaveSettings,
            outcome: Ok(()),
        });
        assert!(state.close_requested());
        assert_eq!(
            state.farewell().as_deref(),
            Some("Settings saved, please close this window & reload the main one.")
        );
        Ok(())
    }

    #[test]
    fn license_screen_returns_to_settings_on_success() -> anyhow::Result<()> {
        let mut state = state()?;
        state.open_license(LicenseEditor::new(HostCapabilities::default()));
        assert_eq!(state.screen(), Screen::License);
        for ch in "KEY-1".chars() {
            state.license_push_char(ch);
        }
        state.license_pop_char();
        let request = state.license_mut().and_then(LicenseEditor::submit);
        assert_eq!(request, Some(ApiRequest::ActivateLicense("KEY-".into())));
        state.apply(Completed {
            kind: RequestKind::ActivateLicense,
            outcome: Ok(()),
        });
        assert_eq!(state.screen(), Screen::Settings);
        assert!(!state.close_requested());
        Ok(())
    }

    #[test]
    fn grapheme_backspace_removes_whole_cluster() {
        let mut text = String::from("ae\u{301}");
        pop_grapheme(&mut text);
        assert_eq!(text, "a");
        pop_grapheme(&mut text);
        pop_grapheme(&mut text);
        assert!(text.is_empty());
    }
}
