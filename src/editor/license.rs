use super::{ButtonLabel, Message};
use crate::api::{ApiError, ApiRequest, RequestKind};
use crate::config::HostCapabilities;
use crate::lifecycle::{
    DestructiveLifecycle, DestructiveStatus, ErrorSurface, RetryPolicy, SaveError, SaveLifecycle,
    SaveStatus, SubmitDecision,
};

const SUBMIT_TEXT: &str = "Validate license →";
const SAVED_TEXT: &str = "License saved, please close this window & reload the main one";

/// What the license window shows, decided by the host's license flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseView {
    Licensed { email: String },
    Unlicensed { purchase_url: String },
}

/// Single-field editor that activates or removes the license key.
#[derive(Debug, Clone)]
pub struct LicenseEditor {
    license: String,
    host: HostCapabilities,
    save: SaveLifecycle,
    remove: DestructiveLifecycle,
    remove_error: Option<SaveError>,
    close_requested: bool,
}

impl LicenseEditor {
    pub fn new(host: HostCapabilities) -> Self {
        Self {
            license: String::new(),
            host,
            save: SaveLifecycle::new(RetryPolicy::AcknowledgeOnly),
            remove: DestructiveLifecycle::new("remove_license", ErrorSurface::Inline),
            remove_error: None,
            close_requested: false,
        }
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    pub fn update_license(&mut self, text: impl Into<String>) {
        self.license = text.into();
    }

    pub fn license_mut(&mut self) -> &mut String {
        &mut self.license
    }

    pub fn view(&self) -> LicenseView {
        if self.host.licensed {
            LicenseView::Licensed {
                email: self.host.licensed_email.clone(),
            }
        } else {
            LicenseView::Unlicensed {
                purchase_url: self.host.license_purchase_url(),
            }
        }
    }

    pub fn save_lifecycle(&self) -> &SaveLifecycle {
        &self.save
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Error from the last activation or removal attempt.
    pub fn error(&self) -> Option<&SaveError> {
        self.save.error().or(self.remove_error.as_ref())
    }

    /// The key is sent as typed; the backend is the only validator.
    pub fn submit(&mut self) -> Option<ApiRequest> {
        match self.save.submit() {
            SubmitDecision::Submit => {
                self.remove_error = None;
                Some(ApiRequest::ActivateLicense(self.license.clone()))
            }
            SubmitDecision::Acknowledged => {
                self.remove_error = None;
                None
            }
            SubmitDecision::Ignored => None,
        }
    }

    pub fn request_remove(&mut self) -> Option<ApiRequest> {
        if !self.remove.begin() {
            return None;
        }
        self.remove_error = None;
        Some(ApiRequest::RemoveLicense)
    }

    pub fn complete(&mut self, kind: RequestKind, outcome: Result<(), ApiError>) {
        let outcome = outcome.map_err(|err| err.to_save_error());
        match kind {
            RequestKind::ActivateLicense => {
                if self.save.complete(outcome) && self.save.is_saved() {
                    self.close_requested = true;
                }
            }
            RequestKind::RemoveLicense => {
                self.remove_error = self.remove.complete(outcome);
                if self.remove.status() == DestructiveStatus::Done {
                    self.close_requested = true;
                }
            }
            RequestKind::SaveSettings | RequestKind::BustCache => {
                tracing::warn!(%kind, "license editor ignoring settings outcome");
            }
        }
    }

    pub fn submit_button(&self) -> ButtonLabel {
        match self.save.status() {
            SaveStatus::Idle => ButtonLabel::enabled(SUBMIT_TEXT),
            SaveStatus::Saving => ButtonLabel::disabled("Saving..."),
            SaveStatus::Saved { .. } => ButtonLabel::disabled(SAVED_TEXT),
            SaveStatus::Error(err) => ButtonLabel::enabled(format!(
                "Error saving license: {}",
                err.display_message()
            )),
        }
    }

    pub fn remove_button(&self) -> ButtonLabel {
        if self.remove.is_pending() {
            ButtonLabel::disabled("Removing...")
        } else {
            ButtonLabel::enabled("Remove license")
        }
    }

    /// Inline message for the licensed view, where no submit button is shown.
    pub fn message(&self) -> Option<Message> {
        self.remove_error.as_ref().map(|err| {
            Message::error(format!("Error removing license: {}", err.display_message()))
        })
    }
}
