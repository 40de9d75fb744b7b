use vrctl_common::EntityId;
use vrctl_input::InputError;
use vrctl_scene::SceneError;

use crate::config::ConfigError;

/// Errors from controller actions.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("entity {0} not found in scene")]
    UnknownEntity(EntityId),
    #[error("element {0} is not highlighted")]
    NotHighlighted(EntityId),
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("device error: {0}")]
    Device(#[from] InputError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
