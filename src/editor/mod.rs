//! Settings and license editors: edit state plus the lifecycles that commit it.

pub mod license;
pub mod settings;
pub mod tabs;

pub use license::{LicenseEditor, LicenseView};
pub use settings::{SaveAttempt, SettingsEditor};
pub use tabs::{FormAction, FormRow, Tab, TabSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonLabel {
    pub text: String,
    pub enabled: bool,
}

impl ButtonLabel {
    pub fn enabled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            enabled: true,
        }
    }

    pub fn disabled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            enabled: false,
        }
    }
}
