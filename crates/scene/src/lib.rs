//! Scene graph: named hierarchy, layers, renderers and shared materials.
//!
//! # Invariants
//! - All mutations flow through explicit operations and produce events.
//! - Iteration order is deterministic (BTreeMap).
//! - Materials are referenced by handle; a handle may be shared by many
//!   renderers and edits through one are seen by all.

mod graph;
mod material;
mod outline;

pub use graph::{Layer, Node, Renderer, RendererKind, Scene, SceneError, SceneEvent};
pub use material::{
    BlendFactor, KEYWORD_ALPHABLEND, KEYWORD_ALPHAPREMULTIPLY, KEYWORD_ALPHATEST, Material,
    MaterialHandle, MaterialStore, RenderQueue, Shader,
};
pub use outline::outline;

pub fn crate_info() -> &'static str {
    "vrctl-scene v0.1.0"
}
