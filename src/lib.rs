pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod editor;
pub mod lifecycle;
pub mod settings;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths, HostCapabilities};
