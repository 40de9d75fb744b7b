//! Controller configuration, loadable from YAML or JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use vrctl_scene::{Layer, Shader};

/// Strongest pulse the actuator accepts.
pub const MAX_HAPTIC_STRENGTH: u16 = 3999;

/// Errors from loading or validating a [`ControllerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What happens when a timed pulse starts while another is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseOverlap {
    /// Let both run side by side.
    #[default]
    Concurrent,
    /// Cancel the running sequence and start the new one.
    Replace,
}

/// Child paths of the highlightable sub-elements, relative to the controller
/// root. An element may map to several nodes (left and right grip).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPaths {
    pub trigger: Vec<String>,
    pub grip: Vec<String>,
    pub touchpad: Vec<String>,
    pub application_menu: Vec<String>,
}

impl Default for ElementPaths {
    fn default() -> Self {
        Self {
            trigger: vec!["Model/trigger".into()],
            grip: vec!["Model/lgrip".into(), "Model/rgrip".into()],
            touchpad: vec!["Model/trackpad".into()],
            application_menu: vec!["Model/button".into()],
        }
    }
}

impl ElementPaths {
    fn all(&self) -> impl Iterator<Item = &String> {
        self.trigger
            .iter()
            .chain(&self.grip)
            .chain(&self.touchpad)
            .chain(&self.application_menu)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Upper clamp for every pulse strength.
    pub max_haptic_strength: u16,
    /// Shader swapped in while an element is highlighted.
    pub highlight_shader: Shader,
    /// Layer the controller root is moved to on attach.
    pub raycast_ignore_layer: String,
    pub element_paths: ElementPaths,
    pub pulse_overlap: PulseOverlap,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_haptic_strength: MAX_HAPTIC_STRENGTH,
            highlight_shader: Shader::unlit_color(),
            raycast_ignore_layer: "Ignore Raycast".into(),
            element_paths: ElementPaths::default(),
            pulse_overlap: PulseOverlap::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&data),
            Some("json") => Self::from_json_str(&data),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_haptic_strength == 0 {
            return Err(ConfigError::Invalid(
                "max_haptic_strength must be positive".into(),
            ));
        }
        if self.max_haptic_strength > MAX_HAPTIC_STRENGTH {
            return Err(ConfigError::Invalid(format!(
                "max_haptic_strength {} exceeds actuator limit {MAX_HAPTIC_STRENGTH}",
                self.max_haptic_strength
            )));
        }
        if self.highlight_shader.name().is_empty() {
            return Err(ConfigError::Invalid("highlight_shader is empty".into()));
        }
        if self.element_paths.all().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid("element path is empty".into()));
        }
        self.ignore_layer()?;
        Ok(())
    }

    /// Resolve `raycast_ignore_layer` to a layer number.
    pub fn ignore_layer(&self) -> Result<Layer, ConfigError> {
        Layer::from_name(&self.raycast_ignore_layer).ok_or_else(|| {
            ConfigError::Invalid(format!("unknown layer {:?}", self.raycast_ignore_layer))
        })
    }
}
