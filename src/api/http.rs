use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;

use super::{
    ApiError, ErrorBody, SettingsApi, LICENSE_PATH, SETTINGS_CACHE_PATH, SETTINGS_PATH,
};
use crate::config::ApiOptions;
use crate::settings::{LoadedSettings, SettingsAggregate};

/// Talks to the mail client backend over its JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSettingsApi {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct LicenseBody<'a> {
    license: &'a str,
}

impl HttpSettingsApi {
    pub fn new(options: &ApiOptions) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(options.timeout())
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response.text().unwrap_or_default();
        let message = ErrorBody::message_from(&raw);
        tracing::warn!(status = status.as_u16(), ?message, "backend rejected request");
        Err(ApiError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

impl SettingsApi for HttpSettingsApi {
    fn load_settings(&self) -> Result<LoadedSettings, ApiError> {
        let response = self.send(self.client.get(self.url(SETTINGS_PATH)))?;
        Ok(response.json::<LoadedSettings>()?)
    }

    fn save_settings(&self, settings: &SettingsAggregate) -> Result<(), ApiError> {
        self.send(self.client.put(self.url(SETTINGS_PATH)).json(settings))?;
        Ok(())
    }

    fn bust_cache(&self) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(SETTINGS_CACHE_PATH)))?;
        Ok(())
    }

    fn activate_license(&self, license: &str) -> Result<(), ApiError> {
        self.send(
            self.client
                .post(self.url(LICENSE_PATH))
                .json(&LicenseBody { license }),
        )?;
        Ok(())
    }

    fn remove_license(&self) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(LICENSE_PATH)))?;
        Ok(())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
