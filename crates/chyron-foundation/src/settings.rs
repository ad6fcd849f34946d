//! Persisted user settings: a JSON file in the platform app-data directory,
//! layered under environment variable overrides via the `config` crate.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "CHYRON";
const APP_DIR: &str = "chyron";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStyle {
    Default,
    WhiteOnBlack,
    SmallCaps,
    LargeText,
    YellowOnBlue,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        CaptionStyle::Default
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Default for WindowPosition {
    fn default() -> Self {
        WindowPosition::BottomCenter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterSettings {
    pub silence_ms: u64,
    pub inference_interval_ms: u64,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            silence_ms: 800,
            inference_interval_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub chars_per_line: usize,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self { chars_per_line: 42 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub include_microphone: bool,
    pub filter_profanity: bool,
    pub show_audio_tags: bool,
    pub caption_style: CaptionStyle,
    pub window_position: WindowPosition,
    pub segmenter: SegmenterSettings,
    pub renderer: RendererSettings,
    pub geometry: WindowGeometry,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_microphone: false,
            filter_profanity: false,
            show_audio_tags: true,
            caption_style: CaptionStyle::default(),
            window_position: WindowPosition::default(),
            segmenter: SegmenterSettings::default(),
            renderer: RendererSettings::default(),
            geometry: WindowGeometry::default(),
            language: "en".to_string(),
        }
    }
}

impl Settings {
    /// Platform per-user app-data path for the settings file, e.g.
    /// `~/.local/share/chyron/settings.json` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads defaults, then the settings file (if present), then environment
    /// variable overrides prefixed `CHYRON_` (e.g. `CHYRON_SEGMENTER__SILENCE_MS`).
    /// An unreadable or unparsable file is logged and defaults are used,
    /// matching the `ConfigError` policy: "Logged; defaults applied."
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default()).unwrap());

        if let Some(path) = &resolved {
            if path.exists() {
                builder = builder.add_source(config::File::from(path.as_path()).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        match builder.build().and_then(|c| c.try_deserialize::<Settings>()) {
            Ok(mut settings) => {
                settings.validate();
                settings
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Writes the full settings struct as pretty JSON to `path` (or the
    /// platform default). The core never calls this; it is the owning
    /// application's responsibility to persist changes.
    pub fn save(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        let resolved = path
            .map(Path::to_path_buf)
            .or_else(Self::default_path)
            .ok_or_else(|| ConfigError::Validation {
                field: "path".to_string(),
                reason: "no platform app-data directory available".to_string(),
            })?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(resolved, json)?;
        Ok(())
    }

    /// Warn-and-clamp validation: out-of-range tunables are logged and reset
    /// to their default rather than rejected.
    pub fn validate(&mut self) {
        let defaults = SegmenterSettings::default();
        if self.segmenter.silence_ms == 0 {
            tracing::warn!("segmenter.silence_ms == 0 is invalid, clamping to default");
            self.segmenter.silence_ms = defaults.silence_ms;
        }
        if self.segmenter.inference_interval_ms == 0 {
            tracing::warn!("segmenter.inference_interval_ms == 0 is invalid, clamping to default");
            self.segmenter.inference_interval_ms = defaults.inference_interval_ms;
        }
        if self.renderer.chars_per_line < 8 {
            tracing::warn!(
                chars_per_line = self.renderer.chars_per_line,
                "renderer.chars_per_line too small, clamping to default"
            );
            self.renderer.chars_per_line = RendererSettings::default().chars_per_line;
        }
        if self.language.trim().is_empty() {
            tracing::warn!("empty language code, clamping to \"en\"");
            self.language = "en".to_string();
        }
    }
}
