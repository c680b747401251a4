//! Error types for scene-graph lookups, material binding and shader resolution.
//!
//! The rendering core distinguishes three kinds of failure:
//!
//! - **Lookup failures** ([`SceneError`]): a node handle no longer exists, a node
//!   is not below the ancestor it was resolved against, or a name was never
//!   registered. These are returned instead of null references.
//! - **Programmer errors** ([`MaterialError`]): a light pass outside the
//!   material's light set, or a texture slot with no image. The frame that
//!   hit it is aborted before any GPU work is recorded.
//! - **Start-up errors** ([`ShaderError`]): a program could not be resolved from
//!   its source identifiers. Scene construction fails and the app exits.
//!
//! [`RenderError`] wraps all of them for the frame pipeline.

use hecs::Entity;

use crate::material::MaterialId;
use crate::mesh::MeshId;
use crate::render_target::TargetSlot;
use crate::texture::TextureId;

/// Failure to resolve nodes or transforms in the scene graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node handle does not refer to a live node.
    NodeNotFound(Entity),
    /// `descendant` is not reachable from `ancestor` through child links.
    NotADescendant { ancestor: Entity, descendant: Entity },
    /// The node already has a parent; a tree node cannot be attached twice.
    AlreadyAttached(Entity),
    /// Attaching `child` below `parent` would close a cycle.
    WouldCreateCycle { parent: Entity, child: Entity },
    /// No node, model or material was registered under this name.
    UnknownName(String),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::NodeNotFound(node) => write!(f, "node {:?} does not exist", node),
            SceneError::NotADescendant {
                ancestor,
                descendant,
            } => write!(
                f,
                "node {:?} is not a descendant of {:?}",
                descendant, ancestor
            ),
            SceneError::AlreadyAttached(node) => {
                write!(f, "node {:?} already has a parent", node)
            }
            SceneError::WouldCreateCycle { parent, child } => write!(
                f,
                "attaching {:?} below {:?} would create a cycle",
                child, parent
            ),
            SceneError::UnknownName(name) => write!(f, "unknown name '{}'", name),
        }
    }
}

impl std::error::Error for SceneError {}

/// Failure while binding a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    /// The requested light pass has no light descriptor in this material.
    LightPassOutOfRange { pass: usize, lights: usize },
    /// The material handle does not exist.
    UnknownMaterial(MaterialId),
    /// A texture slot is enabled but has no texture assigned.
    MissingTexture {
        material: &'static str,
        slot: &'static str,
    },
    /// A texture slot maps past the last texture unit.
    TextureUnitOutOfRange { unit: u32, units: u32 },
}

impl std::fmt::Display for MaterialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialError::LightPassOutOfRange { pass, lights } => write!(
                f,
                "light pass {} out of range (material has {} lights)",
                pass, lights
            ),
            MaterialError::UnknownMaterial(id) => write!(f, "unknown material {:?}", id),
            MaterialError::MissingTexture { material, slot } => {
                write!(f, "{} material has no texture for slot '{}'", material, slot)
            }
            MaterialError::TextureUnitOutOfRange { unit, units } => {
                write!(f, "texture unit {} out of range ({} units)", unit, units)
            }
        }
    }
}

impl std::error::Error for MaterialError {}

/// Failure to resolve shader sources into a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// No built-in stage is registered under this source identifier.
    UnknownSource(String),
    /// The vertex and fragment stages belong to different programs.
    StageMismatch { vertex: String, fragment: String },
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderError::UnknownSource(source) => {
                write!(f, "could not add shader '{}'", source)
            }
            ShaderError::StageMismatch { vertex, fragment } => write!(
                f,
                "could not link shader program ('{}' + '{}')",
                vertex, fragment
            ),
        }
    }
}

impl std::error::Error for ShaderError {}

/// Any failure that aborts a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Scene(SceneError),
    Material(MaterialError),
    Shader(ShaderError),
    /// A node references a mesh that was never created.
    UnknownMesh(MeshId),
    /// A material binds an image that is not in the scene's textures.
    UnknownTexture(TextureId),
    /// A pass needs a target that was not allocated this frame.
    TargetMissing(TargetSlot),
    /// Reading a render target back from the GPU failed.
    Readback(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Scene(e) => write!(f, "scene error: {}", e),
            RenderError::Material(e) => write!(f, "material error: {}", e),
            RenderError::Shader(e) => write!(f, "shader error: {}", e),
            RenderError::UnknownMesh(id) => write!(f, "unknown mesh {:?}", id),
            RenderError::UnknownTexture(id) => write!(f, "unknown texture {:?}", id),
            RenderError::TargetMissing(slot) => write!(f, "{:?} target is not allocated", slot),
            RenderError::Readback(e) => write!(f, "readback failed: {}", e),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Scene(e) => Some(e),
            RenderError::Material(e) => Some(e),
            RenderError::Shader(e) => Some(e),
            RenderError::UnknownMesh(_)
            | RenderError::UnknownTexture(_)
            | RenderError::TargetMissing(_)
            | RenderError::Readback(_) => None,
        }
    }
}

impl From<SceneError> for RenderError {
    fn from(e: SceneError) -> Self {
        RenderError::Scene(e)
    }
}

impl From<MaterialError> for RenderError {
    fn from(e: MaterialError) -> Self {
        RenderError::Material(e)
    }
}

impl From<ShaderError> for RenderError {
    fn from(e: ShaderError) -> Self {
        RenderError::Shader(e)
    }
}
