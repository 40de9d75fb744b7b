use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vrctl_common::Color;

/// Shader keyword toggled for alpha-tested (cutout) rendering.
pub const KEYWORD_ALPHATEST: &str = "_ALPHATEST_ON";
/// Shader keyword toggled for straight alpha blending.
pub const KEYWORD_ALPHABLEND: &str = "_ALPHABLEND_ON";
/// Shader keyword toggled for premultiplied alpha blending.
pub const KEYWORD_ALPHAPREMULTIPLY: &str = "_ALPHAPREMULTIPLY_ON";

/// A handle referencing a material in the [`MaterialStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub u64);

/// Blend factor applied to the source or destination colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Render queue a material is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderQueue {
    /// Use whatever queue the shader declares.
    FromShader,
    Explicit(i32),
}

impl RenderQueue {
    pub const GEOMETRY: i32 = 2000;
    pub const TRANSPARENT: i32 = 3000;

    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Explicit(q) if *q >= Self::TRANSPARENT)
    }
}

/// Shader reference by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shader(pub String);

impl Shader {
    pub const STANDARD: &'static str = "Standard";
    pub const UNLIT_COLOR: &'static str = "Unlit/Color";

    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn standard() -> Self {
        Self::named(Self::STANDARD)
    }

    pub fn unlit_color() -> Self {
        Self::named(Self::UNLIT_COLOR)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Shader {
    fn default() -> Self {
        Self::standard()
    }
}

/// Render state for one material. Cloning produces an independent snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub shader: Shader,
    pub color: Color,
    pub src_blend: BlendFactor,
    pub dst_blend: BlendFactor,
    pub depth_write: bool,
    pub keywords: BTreeSet<String>,
    pub render_queue: RenderQueue,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            shader: Shader::standard(),
            color: Color::WHITE,
            src_blend: BlendFactor::One,
            dst_blend: BlendFactor::Zero,
            depth_write: true,
            keywords: BTreeSet::new(),
            render_queue: RenderQueue::FromShader,
        }
    }
}

impl Material {
    /// Opaque standard material with the given base colour.
    pub fn opaque(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn enable_keyword(&mut self, keyword: &str) {
        self.keywords.insert(keyword.to_string());
    }

    pub fn disable_keyword(&mut self, keyword: &str) {
        self.keywords.remove(keyword);
    }

    pub fn is_keyword_enabled(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }
}

/// Material storage. Several renderers may reference one handle, in which
/// case a mutation through any of them is visible to all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialStore {
    materials: BTreeMap<MaterialHandle, Material>,
    next_id: u64,
}

impl MaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and return its handle.
    pub fn insert(&mut self, material: Material) -> MaterialHandle {
        let handle = MaterialHandle(self.next_id);
        self.next_id += 1;
        self.materials.insert(handle, material);
        handle
    }

    /// Copy an existing material into a new handle.
    pub fn duplicate(&mut self, handle: MaterialHandle) -> Option<MaterialHandle> {
        let copy = self.materials.get(&handle)?.clone();
        Some(self.insert(copy))
    }

    pub fn get(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(&handle)
    }

    pub fn get_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(&handle)
    }

    pub fn remove(&mut self, handle: MaterialHandle) -> Option<Material> {
        self.materials.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
