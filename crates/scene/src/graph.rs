use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vrctl_common::EntityId;

use crate::material::{Material, MaterialHandle, MaterialStore};

/// Physics/raycast layer a node lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Layer(pub u8);

impl Layer {
    pub const DEFAULT: Self = Self(0);
    pub const TRANSPARENT_FX: Self = Self(1);
    pub const IGNORE_RAYCAST: Self = Self(2);
    pub const WATER: Self = Self(4);
    pub const UI: Self = Self(5);

    /// Resolve one of the built-in layer names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Default" => Some(Self::DEFAULT),
            "TransparentFX" => Some(Self::TRANSPARENT_FX),
            "Ignore Raycast" => Some(Self::IGNORE_RAYCAST),
            "Water" => Some(Self::WATER),
            "UI" => Some(Self::UI),
            _ => None,
        }
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RendererKind {
    Mesh,
    SkinnedMesh,
    Sprite,
}

impl RendererKind {
    /// Mesh and skinned mesh renderers draw the controller model itself.
    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Mesh | Self::SkinnedMesh)
    }
}

/// Renderer component attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderer {
    pub kind: RendererKind,
    pub enabled: bool,
    pub material: Option<MaterialHandle>,
}

impl Renderer {
    pub fn mesh(material: MaterialHandle) -> Self {
        Self {
            kind: RendererKind::Mesh,
            enabled: true,
            material: Some(material),
        }
    }

    pub fn skinned(material: MaterialHandle) -> Self {
        Self {
            kind: RendererKind::SkinnedMesh,
            enabled: true,
            material: Some(material),
        }
    }

    pub fn sprite(material: MaterialHandle) -> Self {
        Self {
            kind: RendererKind::Sprite,
            enabled: true,
            material: Some(material),
        }
    }

    /// A renderer with no material bound.
    pub fn bare(kind: RendererKind) -> Self {
        Self {
            kind,
            enabled: true,
            material: None,
        }
    }
}

/// One node of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub layer: Layer,
    pub renderer: Option<Renderer>,
}

/// Events produced by scene mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    NodeSpawned {
        id: EntityId,
        parent: Option<EntityId>,
        name: String,
    },
    LayerChanged {
        id: EntityId,
        old: Layer,
        new: Layer,
    },
    RendererAttached {
        id: EntityId,
        renderer: Renderer,
    },
    RendererToggled {
        id: EntityId,
        enabled: bool,
    },
    MaterialAssigned {
        id: EntityId,
        material: MaterialHandle,
    },
    MaterialChanged {
        material: MaterialHandle,
    },
}

/// Errors from scene operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("entity {0} not found")]
    UnknownEntity(EntityId),
    #[error("entity {0} has no renderer")]
    NoRenderer(EntityId),
    #[error("entity {0} has no material")]
    NoMaterial(EntityId),
    #[error("material {0:?} not found")]
    UnknownMaterial(MaterialHandle),
}

/// The scene graph: a named hierarchy of nodes with optional renderers, plus
/// the material store they draw with.
///
/// Nodes live in a BTreeMap for deterministic iteration; child order is the
/// order of insertion. Every mutation appends a [`SceneEvent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    nodes: BTreeMap<EntityId, Node>,
    materials: MaterialStore,
    #[serde(skip)]
    events: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Drain and return all pending scene events.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn materials(&self) -> &MaterialStore {
        &self.materials
    }

    /// Register a material so renderers can reference it.
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    /// Create a node under `parent` (or as a root).
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        parent: Option<EntityId>,
    ) -> Result<EntityId, SceneError> {
        let name = name.into();
        if let Some(p) = parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::UnknownEntity(p));
            }
        }
        let id = EntityId::new();
        self.nodes.insert(
            id,
            Node {
                name: name.clone(),
                parent,
                children: Vec::new(),
                layer: Layer::DEFAULT,
                renderer: None,
            },
        );
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(id);
        }
        self.events.push(SceneEvent::NodeSpawned { id, parent, name });
        Ok(id)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve a slash-separated path of child names relative to `root`.
    ///
    /// Each segment matches the first child with that name. Empty segments
    /// are ignored, so `""` resolves to `root` itself.
    pub fn find_child(&self, root: EntityId, path: &str) -> Option<EntityId> {
        if !self.nodes.contains_key(&root) {
            return None;
        }
        let mut current = root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = *self
                .children(current)
                .iter()
                .find(|c| self.nodes.get(*c).is_some_and(|n| n.name == segment))?;
        }
        Some(current)
    }

    /// `root` followed by every node below it, depth-first pre-order.
    pub fn descendants(&self, root: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            // reversed so children come out in insertion order
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// True when `node` is `ancestor` or lies anywhere below it.
    pub fn is_self_or_descendant_of(&self, node: EntityId, ancestor: EntityId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    pub fn layer(&self, id: EntityId) -> Option<Layer> {
        self.nodes.get(&id).map(|n| n.layer)
    }

    pub fn set_layer(&mut self, id: EntityId, layer: Layer) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        let old = node.layer;
        node.layer = layer;
        self.events.push(SceneEvent::LayerChanged {
            id,
            old,
            new: layer,
        });
        Ok(())
    }

    pub fn renderer(&self, id: EntityId) -> Option<&Renderer> {
        self.nodes.get(&id).and_then(|n| n.renderer.as_ref())
    }

    pub fn set_renderer(&mut self, id: EntityId, renderer: Renderer) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        node.renderer = Some(renderer);
        self.events
            .push(SceneEvent::RendererAttached { id, renderer });
        Ok(())
    }

    /// Enable or disable a node's renderer. Only logs an event on change.
    pub fn set_renderer_enabled(&mut self, id: EntityId, enabled: bool) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        let renderer = node.renderer.as_mut().ok_or(SceneError::NoRenderer(id))?;
        if renderer.enabled != enabled {
            renderer.enabled = enabled;
            self.events
                .push(SceneEvent::RendererToggled { id, enabled });
        }
        Ok(())
    }

    /// Material handle bound to a node's renderer, if any.
    pub fn material_handle(&self, id: EntityId) -> Option<MaterialHandle> {
        self.renderer(id).and_then(|r| r.material)
    }

    /// The material a node renders with, if it has a renderer and material.
    pub fn material_of(&self, id: EntityId) -> Option<&Material> {
        self.material_handle(id)
            .and_then(|h| self.materials.get(h))
    }

    /// Mutate the material a node renders with, in place.
    ///
    /// The change is visible to every renderer sharing that material.
    pub fn modify_material<F>(&mut self, id: EntityId, f: F) -> Result<(), SceneError>
    where
        F: FnOnce(&mut Material),
    {
        let node = self.nodes.get(&id).ok_or(SceneError::UnknownEntity(id))?;
        let renderer = node.renderer.as_ref().ok_or(SceneError::NoRenderer(id))?;
        let handle = renderer.material.ok_or(SceneError::NoMaterial(id))?;
        let material = self
            .materials
            .get_mut(handle)
            .ok_or(SceneError::UnknownMaterial(handle))?;
        f(material);
        self.events.push(SceneEvent::MaterialChanged { material: handle });
        Ok(())
    }

    /// Bind an existing material to a node's renderer.
    pub fn assign_material(
        &mut self,
        id: EntityId,
        material: MaterialHandle,
    ) -> Result<(), SceneError> {
        if self.materials.get(material).is_none() {
            return Err(SceneError::UnknownMaterial(material));
        }
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::UnknownEntity(id))?;
        let renderer = node.renderer.as_mut().ok_or(SceneError::NoRenderer(id))?;
        renderer.material = Some(material);
        self.events
            .push(SceneEvent::MaterialAssigned { id, material });
        Ok(())
    }

    /// Give a node's renderer a private copy of its current material so later
    /// edits no longer reach other renderers. Returns the new handle.
    pub fn instance_material(&mut self, id: EntityId) -> Result<MaterialHandle, SceneError> {
        let renderer = self
            .nodes
            .get(&id)
            .ok_or(SceneError::UnknownEntity(id))?
            .renderer
            .ok_or(SceneError::NoRenderer(id))?;
        let shared = renderer.material.ok_or(SceneError::NoMaterial(id))?;
        let copy = self
            .materials
            .duplicate(shared)
            .ok_or(SceneError::UnknownMaterial(shared))?;
        self.assign_material(id, copy)?;
        tracing::trace!(entity = %id, ?shared, ?copy, "instanced material");
        Ok(copy)
    }

    /// Number of renderers currently bound to `material`.
    pub fn material_users(&self, material: MaterialHandle) -> usize {
        self.nodes
            .values()
            .filter(|n| n.renderer.and_then(|r| r.material) == Some(material))
            .count()
    }
}
