//! Transport seam between the editors and the mail client backend.

use serde::Deserialize;
use strum::Display;
use thiserror::Error;

use crate::lifecycle::SaveError;
use crate::settings::{LoadedSettings, SettingsAggregate};

mod dispatch;
mod http;
mod offline;

pub use dispatch::{CancellationToken, Completed, RequestWorker};
pub use http::HttpSettingsApi;
pub use offline::{OfflineDocument, OfflineSettingsApi};

pub const SETTINGS_PATH: &str = "/api/settings";
pub const SETTINGS_CACHE_PATH: &str = "/api/settings/cache";
pub const LICENSE_PATH: &str = "/api/license";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request failed with status {status}")]
    Remote {
        status: u16,
        message: Option<String>,
    },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ApiError::Remote {
            status,
            message: Some(message.into()),
        }
    }

    /// Maps a transport failure onto the typed error the editors display.
    pub fn to_save_error(&self) -> SaveError {
        match self {
            ApiError::Transport(detail) => SaveError::network(Some(detail.clone())),
            ApiError::Remote { status, message } if (400..500).contains(status) => {
                SaveError::validation(message.clone())
            }
            ApiError::Remote { message, .. } => SaveError::unknown(message.clone()),
            ApiError::Decode(detail) | ApiError::Storage(detail) => {
                SaveError::unknown(Some(detail.clone()))
            }
        }
    }
}

/// Failure body returned by the backend.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn message_from(raw: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(raw)
            .ok()
            .and_then(|body| body.error_message)
    }
}

pub trait SettingsApi: Send + Sync {
    fn load_settings(&self) -> Result<LoadedSettings, ApiError>;
    fn save_settings(&self, settings: &SettingsAggregate) -> Result<(), ApiError>;
    fn bust_cache(&self) -> Result<(), ApiError>;
    fn activate_license(&self, license: &str) -> Result<(), ApiError>;
    fn remove_license(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    SaveSettings,
    BustCache,
    ActivateLicense,
    RemoveLicense,
}

/// A write the editors ask the backend to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    SaveSettings(SettingsAggregate),
    BustCache,
    ActivateLicense(String),
    RemoveLicense,
}

impl ApiRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ApiRequest::SaveSettings(_) => RequestKind::SaveSettings,
            ApiRequest::BustCache => RequestKind::BustCache,
            ApiRequest::ActivateLicense(_) => RequestKind::ActivateLicense,
            ApiRequest::RemoveLicense => RequestKind::RemoveLicense,
        }
    }

    pub fn execute(&self, api: &dyn SettingsApi) -> Result<(), ApiError> {
        match self {
            ApiRequest::SaveSettings(settings) => api.save_settings(settings),
            ApiRequest::BustCache => api.bust_cache(),
            ApiRequest::ActivateLicense(license) => api.activate_license(license),
            ApiRequest::RemoveLicense => api.remove_license(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;

    /// Records every request and answers writes from a script (default: success).
    #[derive(Default)]
    pub struct ScriptedApi {
        pub loaded: LoadedSettings,
        pub requests: Mutex<Vec<ApiRequest>>,
        script: Mutex<VecDeque<Result<(), ApiError>>>,
    }

    impl ScriptedApi {
        pub fn new(loaded: LoadedSettings) -> Self {
            Self {
                loaded,
                ..Self::default()
            }
        }

        pub fn push_outcome(&self, outcome: Result<(), ApiError>) {
            self.script.lock().push_back(outcome);
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        pub fn last_request(&self) -> Option<ApiRequest> {
            self.requests.lock().last().cloned()
        }

        fn answer(&self, request: ApiRequest) -> Result<(), ApiError> {
            self.requests.lock().push(request);
            self.script.lock().pop_front().unwrap_or(Ok(()))
        }
    }

    impl SettingsApi for ScriptedApi {
        fn load_settings(&self) -> Result<LoadedSettings, ApiError> {
            Ok(self.loaded.clone())
        }

        fn save_settings(&self, settings: &SettingsAggregate) -> Result<(), ApiError> {
            self.answer(ApiRequest::SaveSettings(settings.clone()))
        }

        fn bust_cache(&self) -> Result<(), ApiError> {
            self.answer(ApiRequest::BustCache)
        }

        fn activate_license(&self, license: &str) -> Result<(), ApiError> {
            self.answer(ApiRequest::ActivateLicense(license.to_owned()))
        }

        fn remove_license(&self) -> Result<(), ApiError> {
            self.answer(ApiRequest::RemoveLicense)
        }
    }
}
