//! User settings persisted in the platform config directory.

use crate::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub accent_color: [u8; 4],
    pub ui_scale: f32,
    pub show_canvas_grid: bool,
    /// Where delivered exports are written. Falls back to the download dir.
    pub export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accent_color: [168, 196, 84, 255],
            ui_scale: 1.0,
            show_canvas_grid: true,
            export_dir: None,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "estimator", "Estimator")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&content)
            .map_err(|e| EstimatorError::Config(format!("{}: {e}", path.display())))?;
        settings.normalize();
        Ok(settings)
    }

    /// Loads from the platform location; a missing or broken file yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(%err, "using default settings");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()
            .ok_or_else(|| EstimatorError::Config("no config directory".to_string()))?;
        self.save_to(&path)
    }

    fn normalize(&mut self) {
        if !self.ui_scale.is_finite() {
            self.ui_scale = 1.0;
        }
        self.ui_scale = self.ui_scale.clamp(0.8, 1.5);
    }

    pub fn resolved_export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(|| {
                directories::UserDirs::new().and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
