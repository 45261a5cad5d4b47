//! Editor configuration
//!
//! A TOML file where every section and key is optional:
//!
//! ```toml
//! [canvas]
//! reference_width = 900
//!
//! [drawing]
//! color = "#0000FF"
//! hit_policy = "all-shapes"
//! measurement_unit = "mm"
//!
//! [store]
//! base_url = "https://example.com/api"
//! bearer_token = "secret"
//! list_style = "path"
//!
//! [logging]
//! level = "debug"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use markup_model::{Color, HitPolicy, MeasurementUnit};
use markup_store::ListStyle;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MARKUP_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub drawing: DrawingConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Width in pixels of the frame annotation coordinates are stored in.
    pub reference_width: u32,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            reference_width: 900,
            zoom_min: 0.25,
            zoom_max: 4.0,
            zoom_step: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    pub color: Color,
    pub line_width: f64,
    pub font_size: f64,
    pub copy_offset: f64,
    pub hit_tolerance: f64,
    pub hit_policy: HitPolicy,
    pub rotation_handle_offset: f64,
    pub rotation_handle_radius: f64,
    pub measurement_unit: MeasurementUnit,
    pub undo_depth: usize,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            color: Color::RED,
            line_width: 2.0,
            font_size: 16.0,
            copy_offset: 20.0,
            hit_tolerance: 10.0,
            hit_policy: HitPolicy::Reference,
            rotation_handle_offset: 30.0,
            rotation_handle_radius: 10.0,
            measurement_unit: MeasurementUnit::Px,
            undo_depth: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Persistence API root. Without one, annotations go to a sidecar file.
    pub base_url: Option<String>,
    /// Sent as `Authorization: Bearer` on every API request.
    pub bearer_token: Option<String>,
    pub list_style: ListStyle,
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { base_url: None, bearer_token: None, list_style: ListStyle::Query, timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned() }
    }
}

impl EditorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Load from `explicit`, then `MARKUP_CONFIG`, then the user config
    /// directory, falling back to defaults when no file exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }
        match default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/config.toml` for this application, if the platform has one.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "Markup", "Markup").map(|dirs| dirs.config_dir().join("config.toml"))
}
