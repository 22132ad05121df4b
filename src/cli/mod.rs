use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::api::{HttpSettingsApi, OfflineSettingsApi, SettingsApi};
use crate::app::App;
use crate::config::{AppConfig, ConfigLoader, ConfigPaths};

pub mod commands;

use self::commands::{ActivateArgs, SetArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mailprefs",
    version,
    about = "Terminal settings and license editor for the mail client backend"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over MAILPREFS_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over MAILPREFS_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Read and write settings from settings.json in the data directory instead of the backend
    #[arg(long, global = true)]
    pub offline: bool,

    /// Offline settings file to use instead of the data directory one (implies --offline)
    #[arg(long, global = true)]
    pub settings_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive settings editor (default)
    Tui,
    /// Launch the interactive license editor
    License,
    /// Print the current settings as JSON
    Show,
    /// Change a single system or style setting and save
    Set(SetArgs),
    /// Clear the backend cache; unsaved changes elsewhere are lost
    ClearCache,
    /// Activate a license key
    Activate(ActivateArgs),
    /// Remove the installed license
    RemoveLicense,
}

pub fn run() -> Result<()> {
    let mut cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("MAILPREFS_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("MAILPREFS_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let command = cli.command.take().unwrap_or(Commands::Tui);
    let interactive = matches!(command, Commands::Tui | Commands::License);
    let log_file = interactive.then(|| loader.paths().log_dir.join("mailprefs.log"));
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = Arc::new(loader.load_or_init()?);
    let offline = offline_file(&cli, loader.paths());
    let api = build_api(&config, offline.as_deref())?;

    match command {
        Commands::Tui => {
            let mut app = App::settings(config.clone(), api)?;
            commands::run_tui(&mut app)
        }
        Commands::License => {
            let mut app = App::license(config.clone(), api);
            commands::run_tui(&mut app)
        }
        Commands::Show => commands::show_settings(api.as_ref()),
        Commands::Set(args) => commands::set_setting(&config, api.as_ref(), args),
        Commands::ClearCache => commands::clear_cache(&config, api.as_ref()),
        Commands::Activate(args) => commands::activate_license(&config, api.as_ref(), args),
        Commands::RemoveLicense => commands::remove_license(&config, api.as_ref()),
    }
}

fn offline_file(cli: &Cli, paths: &ConfigPaths) -> Option<PathBuf> {
    cli.settings_file
        .clone()
        .or_else(|| cli.offline.then(|| paths.offline_settings_file()))
}

fn build_api(config: &AppConfig, offline: Option<&Path>) -> Result<Arc<dyn SettingsApi>> {
    match offline {
        Some(path) => {
            tracing::info!(path = %path.display(), "using offline settings file");
            let api = OfflineSettingsApi::open(path)
                .with_context(|| format!("opening offline settings {}", path.display()))?;
            Ok(Arc::new(api))
        }
        None => {
            tracing::info!(base_url = %config.api.base_url, "using settings backend");
            let api = HttpSettingsApi::new(&config.api).context("building http client")?;
            Ok(Arc::new(api))
        }
    }
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = fmt().with_env_filter(env_filter);
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                builder.with_ansi(false).with_writer(Mutex::new(file)).init();
            }
            None => builder.with_writer(std::io::stderr).init(),
        }
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "mailprefs",
            "set",
            "system",
            "sync_days",
            "14",
            "--settings-file",
            "settings.json",
        ])?;
        let paths = ConfigPaths::rooted_at(Path::new("/srv/mailprefs"));
        assert_eq!(offline_file(&cli, &paths), Some(PathBuf::from("settings.json")));
        assert_matches!(cli.command, Some(Commands::Set(args)) if args.key == "sync_days");
        Ok(())
    }

    #[test]
    fn offline_flag_uses_data_dir_settings_file() -> anyhow::Result<()> {
        let paths = ConfigPaths::rooted_at(Path::new("/srv/mailprefs"));
        let cli = Cli::try_parse_from(["mailprefs", "show", "--offline"])?;
        assert_eq!(
            offline_file(&cli, &paths),
            Some(PathBuf::from("/srv/mailprefs/data/settings.json"))
        );
        let cli = Cli::try_parse_from(["mailprefs", "show"])?;
        assert_eq!(offline_file(&cli, &paths), None);
        Ok(())
    }

    #[test]
    fn no_subcommand_means_tui() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["mailprefs", "--log-level", "debug"])?;
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "debug");
        Ok(())
    }
}
