use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::tabs::{Tab, TabSelector};
use super::{ButtonLabel, Message};
use crate::api::{ApiError, ApiRequest, RequestKind};
use crate::config::themes::ThemeRegistry;
use crate::config::HostCapabilities;
use crate::lifecycle::{
    DestructiveLifecycle, DestructiveStatus, ErrorSurface, RetryPolicy, SaveLifecycle, SaveStatus,
    SubmitDecision,
};
use crate::settings::fields::missing_required;
use crate::settings::{
    wrap_list_as_options, EditState, FieldValue, InputEvent, ListEditor, ListSection,
    LoadedSettings, OptionPair, SettingsAggregate, SettingsSection,
};

const SAVED_TEXT: &str = "Settings saved, please close this window & reload the main one.";

/// Result of pressing the save button.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveAttempt {
    Request(ApiRequest),
    Acknowledged,
    Ignored,
    /// The form refused to submit; these required fields are empty.
    MissingRequired(Vec<&'static str>),
}

/// Form-backed editor for the full settings aggregate.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    columns: Option<Value>,
    state: EditState,
    tabs: TabSelector,
    save: SaveLifecycle,
    clear_cache: DestructiveLifecycle,
    host: HostCapabilities,
    themes: ThemeRegistry,
    account_name_to_connected: IndexMap<String, bool>,
    close_requested: bool,
}

impl SettingsEditor {
    pub fn new(loaded: LoadedSettings, host: HostCapabilities, themes: ThemeRegistry) -> Self {
        let LoadedSettings {
            settings,
            account_name_to_connected,
        } = loaded;
        Self {
            state: EditState::from_aggregate(&settings),
            columns: settings.columns,
            tabs: TabSelector::default(),
            save: SaveLifecycle::new(RetryPolicy::ResubmitOnAcknowledge),
            clear_cache: DestructiveLifecycle::new("clear_cache", ErrorSurface::LogOnly),
            host,
            themes,
            account_name_to_connected,
            close_requested: false,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn host(&self) -> &HostCapabilities {
        &self.host
    }

    pub fn tabs(&self) -> &TabSelector {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabSelector {
        &mut self.tabs
    }

    pub fn select_tab(&mut self, tag: &str) {
        self.tabs.select(tag);
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.tabs.active()
    }

    pub fn save_lifecycle(&self) -> &SaveLifecycle {
        &self.save
    }

    pub fn clear_cache_status(&self) -> DestructiveStatus {
        self.clear_cache.status()
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn is_connected(&self, account_name: &str) -> Option<bool> {
        self.account_name_to_connected.get(account_name).copied()
    }

    pub fn update(&mut self, section: SettingsSection, key: &str, value: impl Into<FieldValue>) {
        self.state.update(section, key, value);
    }

    pub fn update_from_input(&mut self, section: SettingsSection, key: &str, event: &InputEvent) {
        self.state.update_from_input(section, key, event);
    }

    pub fn toggle_checkbox(&mut self, section: SettingsSection, key: &str) -> bool {
        self.state.toggle_checkbox(section, key)
    }

    /// List editor handed to the account and signature widgets.
    pub fn list_mut(&mut self, section: ListSection) -> &mut ListEditor<Value> {
        self.state.list_mut(section)
    }

    pub fn theme_options(&self) -> Vec<OptionPair> {
        self.themes.options()
    }

    /// Base options of the sidebar folder picker plus anything the user created since.
    pub fn sidebar_folder_options(&self) -> Vec<OptionPair> {
        let mut values: IndexSet<String> = self
            .state
            .initial_sidebar_folder_options()
            .iter()
            .map(|option| option.value.clone())
            .collect();
        if let Some(current) = self
            .state
            .get(SettingsSection::Style, "sidebar_folders")
            .and_then(FieldValue::as_choices)
        {
            values.extend(current.iter().map(|option| option.value.clone()));
        }
        wrap_list_as_options(values)
    }

    /// The payload a save would send right now.
    pub fn payload(&self) -> SettingsAggregate {
        self.state.to_aggregate(self.columns.clone())
    }

    pub fn submit_save(&mut self) -> SaveAttempt {
        let accepting = matches!(self.save.status(), SaveStatus::Idle | SaveStatus::Error(_));
        if accepting {
            let missing: Vec<_> = missing_required(&self.state, self.host.licensed)
                .into_iter()
                .map(|field| field.key)
                .collect();
            if !missing.is_empty() {
                tracing::info!(?missing, "save refused, required fields empty");
                return SaveAttempt::MissingRequired(missing);
            }
        }
        match self.save.submit() {
            SubmitDecision::Submit => SaveAttempt::Request(ApiRequest::SaveSettings(self.payload())),
            SubmitDecision::Acknowledged => SaveAttempt::Acknowledged,
            SubmitDecision::Ignored => SaveAttempt::Ignored,
        }
    }

    pub fn request_clear_cache(&mut self) -> Option<ApiRequest> {
        self.clear_cache.begin().then_some(ApiRequest::BustCache)
    }

    /// Applies a finished request. Success of either action asks the host to close.
    pub fn complete(&mut self, kind: RequestKind, outcome: Result<(), ApiError>) {
        let outcome = outcome.map_err(|err| err.to_save_error());
        match kind {
            RequestKind::SaveSettings => {
                if self.save.complete(outcome) && self.save.is_saved() {
                    self.close_requested = true;
                }
            }
            RequestKind::BustCache => {
                self.clear_cache.complete(outcome);
                if self.clear_cache.status() == DestructiveStatus::Done {
                    self.close_requested = true;
                }
            }
            RequestKind::ActivateLicense | RequestKind::RemoveLicense => {
                tracing::warn!(%kind, "settings editor ignoring license outcome");
            }
        }
    }

    pub fn save_button(&self) -> ButtonLabel {
        if self.save.is_saving() {
            ButtonLabel::disabled("Saving...")
        } else {
            ButtonLabel::enabled("Save")
        }
    }

    pub fn message(&self) -> Option<Message> {
        if let Some(err) = self.save.error() {
            return Some(Message::error(format!(
                "Error saving settings: {}",
                err.display_message()
            )));
        }
        if self.save.is_saved() {
            return Some(Message::success(SAVED_TEXT));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::settings::wrap_scalar_as_option;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn loaded() -> anyhow::Result<LoadedSettings> {
        Ok(serde_json::from_value(json!({
            "settings": {
                "accounts": [{ "name": "work" }, { "name": "home" }],
                "signatures": [],
                "system": {
                    "undo_ms": 5000,
                    "sync_interval": 60000,
                    "sync_days": 0,
                    "batch_size": 50,
                    "initial_batches": 3
                },
                "style": {
                    "theme_light": "day",
                    "theme_dark": "night",
                    "sidebar_folders": ["Inbox", "Sent"]
                },
                "columns": { "opaque": [1, 2, 3] }
            },
            "account_name_to_connected": { "work": true }
        }))?)
    }

    fn editor() -> anyhow::Result<SettingsEditor> {
        Ok(SettingsEditor::new(
            loaded()?,
            HostCapabilities::default(),
            ThemeRegistry::default(),
        ))
    }

    fn send(editor: &mut SettingsEditor, api: &ScriptedApi) -> Option<ApiRequest> {
        match editor.submit_save() {
            SaveAttempt::Request(request) => {
                let outcome = request.execute(api);
                editor.complete(request.kind(), outcome);
                Some(request)
            }
            _ => None,
        }
    }

    #[test]
    fn theme_change_reaches_payload_unwrapped() -> anyhow::Result<()> {
        let mut editor = editor()?;
        assert_eq!(
            editor
                .state()
                .get(SettingsSection::Style, "theme_light")
                .and_then(FieldValue::as_choice),
            Some(&wrap_scalar_as_option("day"))
        );
        editor.update(SettingsSection::Style, "theme_dark", wrap_scalar_as_option("dusk"));

        let api = ScriptedApi::default();
        let request = send(&mut editor, &api).expect("request sent");
        let ApiRequest::SaveSettings(payload) = request else {
            panic!("expected a settings save");
        };
        assert_eq!(payload.style.get("theme_dark"), Some(&json!("dusk")));
        assert_eq!(payload.style.get("sidebar_folders"), Some(&json!(["Inbox", "Sent"])));
        assert_eq!(payload.columns, Some(json!({ "opaque": [1, 2, 3] })));
        assert!(editor.close_requested());
        assert_eq!(
            editor.message(),
            Some(Message::success(SAVED_TEXT))
        );
        Ok(())
    }

    #[test]
    fn failed_save_shows_message_and_retries_current_state() -> anyhow::Result<()> {
        let mut editor = editor()?;
        let api = ScriptedApi::default();
        api.push_outcome(Err(ApiError::remote(500, "disk full")));

        send(&mut editor, &api);
        assert_eq!(
            editor.message(),
            Some(Message::error("Error saving settings: disk full"))
        );
        assert!(!editor.close_requested());
        assert_eq!(editor.save_button(), ButtonLabel::enabled("Save"));

        let retried = send(&mut editor, &api).expect("second request");
        assert_eq!(api.request_count(), 2);
        assert_eq!(retried, ApiRequest::SaveSettings(editor.payload()));
        assert!(editor.save_lifecycle().is_saved());
        Ok(())
    }

    #[test]
    fn second_click_while_saving_sends_nothing() -> anyhow::Result<()> {
        let mut editor = editor()?;
        assert_matches!(editor.submit_save(), SaveAttempt::Request(_));
        assert_eq!(editor.save_button(), ButtonLabel::disabled("Saving..."));
        assert_eq!(editor.submit_save(), SaveAttempt::Ignored);
        assert_eq!(editor.submit_save(), SaveAttempt::Ignored);
        Ok(())
    }

    #[test]
    fn missing_required_number_blocks_submit() -> anyhow::Result<()> {
        let mut editor = editor()?;
        editor.update_from_input(
            SettingsSection::System,
            "sync_interval",
            &InputEvent::number("abc"),
        );
        assert_eq!(
            editor.submit_save(),
            SaveAttempt::MissingRequired(vec!["sync_interval"])
        );
        assert_eq!(editor.save_lifecycle().status(), &SaveStatus::Idle);
        Ok(())
    }

    #[test]
    fn error_without_message_renders_fallback() -> anyhow::Result<()> {
        let mut editor = editor()?;
        let api = ScriptedApi::default();
        api.push_outcome(Err(ApiError::Remote {
            status: 502,
            message: None,
        }));
        send(&mut editor, &api);
        assert_eq!(
            editor.message(),
            Some(Message::error("Error saving settings: unknown error"))
        );
        Ok(())
    }

    #[test]
    fn clear_cache_failure_is_logged_only() -> anyhow::Result<()> {
        let mut editor = editor()?;
        let request = editor.request_clear_cache().expect("request");
        assert_eq!(request, ApiRequest::BustCache);
        assert!(editor.request_clear_cache().is_none());
        editor.complete(RequestKind::BustCache, Err(ApiError::remote(500, "locked")));
        assert_eq!(editor.message(), None);
        assert!(!editor.close_requested());
        assert_eq!(editor.clear_cache_status(), DestructiveStatus::Idle);

        editor.request_clear_cache().expect("retry allowed");
        editor.complete(RequestKind::BustCache, Ok(()));
        assert!(editor.close_requested());
        Ok(())
    }

    #[test]
    fn sidebar_options_merge_created_folders() -> anyhow::Result<()> {
        let mut editor = editor()?;
        editor.update(
            SettingsSection::Style,
            "sidebar_folders",
            wrap_list_as_options(["Sent", "Receipts"]),
        );
        let values: Vec<_> = editor
            .sidebar_folder_options()
            .into_iter()
            .map(|option| option.value)
            .collect();
        assert_eq!(values, vec!["Inbox", "Sent", "Receipts"]);
        Ok(())
    }

    #[test]
    fn account_moves_are_saved_in_order() -> anyhow::Result<()> {
        let mut editor = editor()?;
        editor.list_mut(ListSection::Accounts).move_item(1, 0);
        let names: Vec<_> = editor
            .payload()
            .accounts
            .iter()
            .filter_map(|account| account["name"].as_str().map(str::to_owned))
            .collect();
        assert_eq!(names, vec!["home", "work"]);
        assert_eq!(editor.is_connected("work"), Some(true));
        assert_eq!(editor.is_connected("home"), None);
        Ok(())
    }

    #[test]
    fn unknown_tab_selects_nothing() -> anyhow::Result<()> {
        let mut editor = editor()?;
        editor.select_tab("appearance");
        assert_eq!(editor.active_tab(), Some(Tab::Appearance));
        editor.select_tab("nope");
        assert_eq!(editor.active_tab(), None);
        Ok(())
    }
}
