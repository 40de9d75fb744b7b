//! Shared types for the vrctl workspace: entity identity and colours.

pub mod types;

pub use types::{Color, EntityId};
