use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::config::themes::ThemeRegistry;

pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Mailprefs";
const APP_NAME: &str = "mailprefs";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("MAILPREFS_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("MAILPREFS_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            log_dir,
            state_dir,
        })
    }

    /// Layout rooted at a single directory; used for tests and portable installs.
    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let state_dir = root.join("state");
        Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            data_dir: root.join("data"),
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    /// Settings file used by offline mode when no explicit file is given.
    pub fn offline_settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub themes: Vec<String>,
    pub api: ApiOptions,
    pub host: HostCapabilities,
    pub ui: UiOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            themes: ThemeRegistry::default().names().to_vec(),
            api: ApiOptions::default(),
            host: HostCapabilities::default(),
            ui: UiOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self) {
        let registry = ThemeRegistry::new(self.themes.clone());
        if registry.is_empty() {
            tracing::warn!("no themes configured, falling back to built-in theme list");
            self.themes = ThemeRegistry::default().names().to_vec();
        } else {
            self.themes = registry.names().to_vec();
        }
        if self.api.base_url.trim().is_empty() {
            tracing::warn!("empty api.base_url in config, using default");
            self.api.base_url = ApiOptions::default().base_url;
        }
    }

    pub fn theme_registry(&self) -> ThemeRegistry {
        ThemeRegistry::new(self.themes.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: String,
    /// Client-side request timeout in seconds (0 = rely on the transport).
    pub timeout_secs: u64,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4420".into(),
            timeout_secs: 30,
        }
    }
}

impl ApiOptions {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// Read-only facts about the host application handed to the editors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCapabilities {
    pub licensed: bool,
    pub licensed_email: String,
    pub website_url: String,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            licensed: false,
            licensed_email: String::new(),
            website_url: "https://kanmail.io".into(),
        }
    }
}

impl HostCapabilities {
    pub fn license_purchase_url(&self) -> String {
        format!("{}/license", self.website_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub tick_rate_ms: u64,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self { tick_rate_ms: 250 }
    }
}

impl UiOptions {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_or_init_writes_default_file() -> Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(ConfigPaths::rooted_at(temp.path()));
        let config = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(config.api.base_url, "http://127.0.0.1:4420");
        assert!(!config.host.licensed);
        assert!(!config.themes.is_empty());

        let reloaded = loader.load()?;
        assert_eq!(reloaded.themes, config.themes);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_and_dedups_themes() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            r#"
themes = ["day", "night", "day"]

[host]
licensed = true
licensed_email = "me@example.com"

[api]
base_url = ""
"#,
        )?;
        let config = ConfigLoader::with_paths(paths).load()?;
        assert!(config.host.licensed);
        assert_eq!(config.host.licensed_email, "me@example.com");
        assert_eq!(config.host.website_url, "https://kanmail.io");
        assert_eq!(config.themes, vec!["day", "night"]);
        assert_eq!(config.api.base_url, "http://127.0.0.1:4420");
        assert_eq!(config.ui.tick_rate_ms, 250);
        Ok(())
    }

    #[test]
    fn empty_theme_list_falls_back_to_builtin() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "themes = []\n")?;
        let config = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(config.themes, ThemeRegistry::default().names());
        Ok(())
    }

    #[test]
    fn zero_timeout_disables_client_bound() {
        let options = ApiOptions {
            timeout_secs: 0,
            ..ApiOptions::default()
        };
        assert_eq!(options.timeout(), None);
        assert_eq!(
            ApiOptions::default().timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn purchase_url_joins_website() {
        let host = HostCapabilities {
            website_url: "https://example.com/".into(),
            ..HostCapabilities::default()
        };
        assert_eq!(host.license_purchase_url(), "https://example.com/license");
    }
}
