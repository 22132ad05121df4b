use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{ApiError, SettingsApi};
use crate::settings::{LoadedSettings, SettingsAggregate};

const TMP_EXTENSION: &str = "json.tmp";

/// On-disk layout of an offline settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfflineDocument {
    #[serde(default)]
    pub settings: SettingsAggregate,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub account_name_to_connected: IndexMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Serves the settings API from a local JSON file instead of the backend.
#[derive(Debug)]
pub struct OfflineSettingsApi {
    path: PathBuf,
    document: Mutex<OfflineDocument>,
}

impl OfflineSettingsApi {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let document = match fs::read(&path) {
            Ok(raw) => serde_json::from_slice::<OfflineDocument>(&raw).map_err(|err| {
                ApiError::Decode(format!("parsing offline settings {}: {err}", path.display()))
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "offline settings file missing, starting empty");
                OfflineDocument::default()
            }
            Err(err) => {
                return Err(ApiError::Storage(format!(
                    "reading offline settings {}: {err}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> OfflineDocument {
        self.document.lock().clone()
    }

    fn persist(&self, document: &OfflineDocument) -> Result<(), ApiError> {
        let json = serde_json::to_vec_pretty(document)
            .map_err(|err| ApiError::Storage(format!("serialising offline settings: {err}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                ApiError::Storage(format!("creating {}: {err}", parent.display()))
            })?;
        }
        let tmp_path = self.path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, &json).map_err(|err| {
            ApiError::Storage(format!("writing {}: {err}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|err| {
            ApiError::Storage(format!("replacing {}: {err}", self.path.display()))
        })?;
        Ok(())
    }

    fn modify<F>(&self, apply: F) -> Result<(), ApiError>
    where
        F: FnOnce(&mut OfflineDocument) -> Result<(), ApiError>,
    {
        let mut document = self.document.lock();
        let mut next = document.clone();
        apply(&mut next)?;
        self.persist(&next)?;
        *document = next;
        Ok(())
    }
}

impl SettingsApi for OfflineSettingsApi {
    fn load_settings(&self) -> Result<LoadedSettings, ApiError> {
        let document = self.document.lock();
        Ok(LoadedSettings {
            settings: document.settings.clone(),
            account_name_to_connected: document.account_name_to_connected.clone(),
        })
    }

    fn save_settings(&self, settings: &SettingsAggregate) -> Result<(), ApiError> {
        self.modify(|document| {
            document.settings = settings.clone();
            Ok(())
        })
    }

    fn bust_cache(&self) -> Result<(), ApiError> {
        tracing::info!(path = %self.path.display(), "offline mode keeps no cache");
        Ok(())
    }

    fn activate_license(&self, license: &str) -> Result<(), ApiError> {
        let license = license.trim();
        if license.is_empty() {
            return Err(ApiError::remote(400, "Invalid license"));
        }
        self.modify(|document| {
            document.license = Some(license.to_owned());
            Ok(())
        })
    }

    fn remove_license(&self) -> Result<(), ApiError> {
        self.modify(|document| match document.license.take() {
            Some(_) => Ok(()),
            None => Err(ApiError::remote(404, "No license installed")),
        })
    }
}
