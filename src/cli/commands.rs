use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use std::str::FromStr;

use crate::api::{ApiError, ApiRequest, RequestKind, SettingsApi};
use crate::app::App;
use crate::config::AppConfig;
use crate::editor::{LicenseEditor, SaveAttempt, SettingsEditor};
use crate::settings::fields::find_field;
use crate::settings::{FieldKind, InputEvent, InputKind, SettingsSection};

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Settings section (system or style)
    #[arg(value_parser = SettingsSection::from_str)]
    pub section: SettingsSection,
    /// Key inside the section
    pub key: String,
    /// New value, parsed as JSON and falling back to a plain string
    pub value: String,
}

#[derive(Args, Debug, Clone)]
pub struct ActivateArgs {
    /// License key, sent as given
    pub license: String,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    if let Some(farewell) = app.run()? {
        println!("{farewell}");
    }
    Ok(())
}

pub fn show_settings(api: &dyn SettingsApi) -> Result<()> {
    print!("{}", render_settings(api)?);
    Ok(())
}

fn render_settings(api: &dyn SettingsApi) -> Result<String> {
    let loaded = api.load_settings().context("loading settings")?;
    let mut out = serde_json::to_string_pretty(&loaded).context("formatting settings")?;
    out.push('\n');
    Ok(out)
}

pub fn set_setting(config: &AppConfig, api: &dyn SettingsApi, args: SetArgs) -> Result<()> {
    println!("{}", apply_setting(config, api, args)?);
    Ok(())
}

fn apply_setting(config: &AppConfig, api: &dyn SettingsApi, args: SetArgs) -> Result<String> {
    let loaded = api.load_settings().context("loading settings")?;
    let mut editor = SettingsEditor::new(loaded, config.host.clone(), config.theme_registry());
    match find_field(args.section, &args.key) {
        Some(field) if field.widget.input_kind() == InputKind::Number => {
            editor.update_from_input(args.section, &args.key, &InputEvent::number(args.value));
        }
        _ => {
            let value = parse_value(&args.value);
            let field = FieldKind::of(args.section, &args.key).wrap(value);
            editor.update(args.section, &args.key, field);
        }
    }

    let request = match editor.submit_save() {
        SaveAttempt::Request(request) => request,
        SaveAttempt::MissingRequired(keys) => {
            bail!("refusing to save, required settings are empty: {}", keys.join(", "))
        }
        SaveAttempt::Acknowledged | SaveAttempt::Ignored => {
            bail!("settings editor is not accepting a save")
        }
    };
    let (kind, outcome) = execute(api, request);
    editor.complete(kind, outcome);
    let message = editor
        .message()
        .map(|message| message.text)
        .unwrap_or_default();
    if editor.save_lifecycle().error().is_some() {
        bail!(message);
    }
    Ok(message)
}

pub fn clear_cache(config: &AppConfig, api: &dyn SettingsApi) -> Result<()> {
    println!("{}", run_clear_cache(config, api)?);
    Ok(())
}

fn run_clear_cache(config: &AppConfig, api: &dyn SettingsApi) -> Result<String> {
    let loaded = api.load_settings().context("loading settings")?;
    let mut editor = SettingsEditor::new(loaded, config.host.clone(), config.theme_registry());
    let Some(request) = editor.request_clear_cache() else {
        bail!("cache clear already in progress");
    };
    let (kind, outcome) = execute(api, request);
    editor.complete(kind, outcome);
    if !editor.close_requested() {
        bail!("clearing the cache failed, see the log for details");
    }
    Ok("Cache cleared, restart the mail client to reload".to_string())
}

pub fn activate_license(config: &AppConfig, api: &dyn SettingsApi, args: ActivateArgs) -> Result<()> {
    println!("{}", run_activate(config, api, args)?);
    Ok(())
}

fn run_activate(config: &AppConfig, api: &dyn SettingsApi, args: ActivateArgs) -> Result<String> {
    let mut editor = LicenseEditor::new(config.host.clone());
    editor.update_license(args.license);
    let Some(request) = editor.submit() else {
        bail!("license editor is not accepting a submission");
    };
    let (kind, outcome) = execute(api, request);
    editor.complete(kind, outcome);
    let label = editor.submit_button().text;
    if editor.error().is_some() {
        bail!(label);
    }
    Ok(label)
}

pub fn remove_license(config: &AppConfig, api: &dyn SettingsApi) -> Result<()> {
    println!("{}", run_remove_license(config, api)?);
    Ok(())
}

fn run_remove_license(config: &AppConfig, api: &dyn SettingsApi) -> Result<String> {
    let mut editor = LicenseEditor::new(config.host.clone());
    let Some(request) = editor.request_remove() else {
        bail!("license removal already in progress");
    };
    let (kind, outcome) = execute(api, request);
    editor.complete(kind, outcome);
    if let Some(message) = editor.message() {
        bail!(message.text);
    }
    Ok("License removed, reload the main window to apply it".to_string())
}

fn execute(api: &dyn SettingsApi, request: ApiRequest) -> (RequestKind, Result<(), ApiError>) {
    let kind = request.kind();
    tracing::info!(%kind, "sending request");
    let outcome = request.execute(api);
    if let Err(err) = &outcome {
        tracing::error!(?err, %kind, "request failed");
    }
    (kind, outcome)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}
