// Layout configuration persisted as JSON in the platform config dir:
// e.g. ~/Library/Application Support/berth/layout.json on macOS,
// ~/.config/berth/layout.json on Linux.

use std::path::{Path, PathBuf};
use std::time::Duration;

use berth_core::{RatioBounds, Size};
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::smart::SmartConstraints;
use crate::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Smallest extent a splitter tries to leave on either side.
    pub min_panel_size: Size,
    pub ratio_bounds: RatioBounds,
    /// Sash thickness reported to hosts.
    pub sash_size: f32,
    pub max_nesting_depth: usize,
    /// Delay between a structural change and the geometry pass it triggers.
    pub debounce_ms: u64,
    pub animation_ms: u64,
    pub enable_animations: bool,
    pub strategy: StrategyKind,
    pub smart: SmartConstraints,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_panel_size: Size::new(150.0, 100.0),
            ratio_bounds: RatioBounds::default(),
            sash_size: 4.0,
            max_nesting_depth: 5,
            debounce_ms: 50,
            animation_ms: 250,
            enable_animations: false,
            strategy: StrategyKind::default(),
            smart: SmartConstraints::default(),
        }
    }
}

impl LayoutConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = self.ratio_bounds;
        if !(bounds.min.is_finite() && bounds.max.is_finite()) {
            return Err(LayoutError::Config("ratio bounds must be finite".into()));
        }
        if bounds.min < 0.0 || bounds.max > 1.0 || bounds.min > bounds.max {
            return Err(LayoutError::Config(format!(
                "ratio bounds [{}, {}] must be ordered and within [0, 1]",
                bounds.min, bounds.max
            )));
        }
        if self.min_panel_size.width < 0.0 || self.min_panel_size.height < 0.0 {
            return Err(LayoutError::Config("minimum panel size cannot be negative".into()));
        }
        if self.sash_size < 0.0 {
            return Err(LayoutError::Config("sash size cannot be negative".into()));
        }
        self.smart.validate()
    }
}

fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("berth").join("layout.json"))
}

/// Load the user's config, falling back to defaults on any problem.
pub fn load_config() -> LayoutConfig {
    let Some(path) = config_path() else {
        return LayoutConfig::default();
    };
    if !path.exists() {
        return LayoutConfig::default();
    }
    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load layout config from {}: {e}", path.display());
            LayoutConfig::default()
        }
    }
}

pub fn save_config(config: &LayoutConfig) {
    let Some(path) = config_path() else {
        log::warn!("Cannot determine layout config path");
        return;
    };
    if let Err(e) = save_config_to(config, &path) {
        log::error!("Failed to save layout config to {}: {e}", path.display());
    }
}

pub fn load_config_from(path: &Path) -> Result<LayoutConfig> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| LayoutError::Config(format!("cannot read {}: {e}", path.display())))?;
    let config: LayoutConfig = serde_json::from_str(&data)
        .map_err(|e| LayoutError::Config(format!("cannot parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config_to(config: &LayoutConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LayoutError::Config(format!("cannot create {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| LayoutError::Config(format!("cannot serialize config: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| LayoutError::Config(format!("cannot write {}: {e}", path.display())))
}
