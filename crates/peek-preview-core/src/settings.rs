//! Injected configuration and process-scoped UI settings.

use serde::{Deserialize, Serialize};

use crate::diagram::DiagramConfig;
use crate::error::{PreviewError, StorageError};
use crate::keymap::ZoomCommand;
use crate::store::KeyValueStore;

pub const ZOOM_KEY: &str = "zoom-level";
pub const ZOOM_DEFAULT: u32 = 100;
pub const ZOOM_MIN: u32 = 50;
pub const ZOOM_MAX: u32 = 250;
pub const ZOOM_STEP: u32 = 10;

/// Where the preview page is hosted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostContext {
    /// A regular browser tab. The browser owns zoom.
    #[default]
    Browser,
    /// An embedded webview without browser chrome.
    Webview,
}

/// Configuration the serving page injects as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    /// `host:port` of the preview server.
    pub server_url: String,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub ctx: HostContext,
    #[serde(default)]
    pub diagram: DiagramConfig,
}

impl PreviewConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            theme: None,
            ctx: HostContext::default(),
            diagram: DiagramConfig::default(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, PreviewError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn socket_url(&self) -> String {
        format!("ws://{}/", self.server_url)
    }
}

/// Zoom level and theme, with an explicit load, apply, persist lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    ctx: HostContext,
    zoom_level: u32,
    theme: Option<String>,
}

impl Settings {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            ctx: config.ctx,
            zoom_level: ZOOM_DEFAULT,
            theme: config.theme.clone(),
        }
    }

    /// Whether zoom is ours to manage in this context.
    pub fn zoom_enabled(&self) -> bool {
        self.ctx == HostContext::Webview
    }

    pub fn zoom_level(&self) -> u32 {
        self.zoom_level
    }

    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }

    /// Read the persisted zoom level. Missing, zero or unparsable values
    /// fall back to the default.
    pub fn load(&mut self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        if !self.zoom_enabled() {
            return Ok(());
        }
        let stored = store
            .get(ZOOM_KEY)?
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|level| level.is_finite() && *level >= 1.0);
        self.zoom_level = stored
            .map(|level| (level.round() as u32).clamp(ZOOM_MIN, ZOOM_MAX))
            .unwrap_or(ZOOM_DEFAULT);
        tracing::debug!(target: "peek::session", zoom = self.zoom_level, "zoom level loaded");
        Ok(())
    }

    pub fn persist(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        store.set(ZOOM_KEY, &self.zoom_level.to_string())
    }

    /// Step the zoom level; returns the new level.
    pub fn zoom(&mut self, command: ZoomCommand) -> u32 {
        self.zoom_level = match command {
            ZoomCommand::In => (self.zoom_level + ZOOM_STEP).min(ZOOM_MAX),
            ZoomCommand::Out => self.zoom_level.saturating_sub(ZOOM_STEP).max(ZOOM_MIN),
            ZoomCommand::Reset => ZOOM_DEFAULT,
        };
        self.zoom_level
    }

    /// Font size of the content root, e.g. `"110%"`.
    pub fn font_size(&self) -> String {
        format!("{}%", self.zoom_level)
    }

    /// The initial apply stays quiet at the default level.
    pub fn initial_apply_is_silent(&self) -> bool {
        self.zoom_level == ZOOM_DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn webview() -> PreviewConfig {
        PreviewConfig::from_json(r#"{"serverUrl":"localhost:8080","ctx":"webview","theme":"dark"}"#)
            .unwrap()
    }

    #[test]
    fn test_config_from_json() {
        let config = webview();
        assert_eq!(config.server_url, "localhost:8080");
        assert_eq!(config.ctx, HostContext::Webview);
        assert_eq!(config.theme.as_deref(), Some("dark"));
        assert_eq!(config.diagram, DiagramConfig::default());
        assert_eq!(config.socket_url(), "ws://localhost:8080/");

        let minimal = PreviewConfig::from_json(r#"{"serverUrl":"127.0.0.1:1"}"#).unwrap();
        assert_eq!(minimal.ctx, HostContext::Browser);
        assert!(minimal.theme.is_none());
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut settings = Settings::new(&webview());
        assert_eq!(settings.zoom(ZoomCommand::In), 110);
        for _ in 0..30 {
            settings.zoom(ZoomCommand::In);
        }
        assert_eq!(settings.zoom_level(), 250);
        for _ in 0..30 {
            settings.zoom(ZoomCommand::Out);
        }
        assert_eq!(settings.zoom_level(), 50);
        assert_eq!(settings.zoom(ZoomCommand::Reset), 100);
        assert_eq!(settings.font_size(), "100%");
    }

    #[test]
    fn test_load_persist() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::new(&webview());
        settings.zoom(ZoomCommand::In);
        settings.persist(&mut store).unwrap();

        let mut fresh = Settings::new(&webview());
        fresh.load(&store).unwrap();
        assert_eq!(fresh.zoom_level(), 110);
        assert!(!fresh.initial_apply_is_silent());

        store.set(ZOOM_KEY, "0").unwrap();
        fresh.load(&store).unwrap();
        assert_eq!(fresh.zoom_level(), 100);
        assert!(fresh.initial_apply_is_silent());
    }

    #[test]
    fn test_browser_context_ignores_zoom() {
        let mut store = MemoryStore::new();
        store.set(ZOOM_KEY, "150").unwrap();
        let mut settings = Settings::new(&PreviewConfig::new("localhost:1"));
        settings.load(&store).unwrap();
        assert!(!settings.zoom_enabled());
        assert_eq!(settings.zoom_level(), 100);
    }
}
