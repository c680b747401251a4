//! Parameters of the unlit materials: wave, skybox, the debug overlays and
//! post-processing.

use glam::{UVec2, Vec3};

use super::lit::{BumpMap, DisplacementMap};
use super::uniforms::USE_JITTER;
use super::{MaterialBinding, TextureSlots};
use crate::error::MaterialError;
use crate::texture::TextureId;

/// Vertex-animated waves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveParams {
    /// Color darkening towards the wave troughs.
    pub depth: f32,
    /// Phase speed in radians per second.
    pub speed: f32,
    /// Amplitude in model units.
    pub height: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            depth: 0.1,
            speed: 1.0,
            height: 0.05,
        }
    }
}

impl WaveParams {
    pub(crate) fn write(&self, binding: &mut MaterialBinding) {
        binding.uniforms.shape = [self.depth, self.speed, self.height, 0.0];
    }
}

/// Cube-mapped sky.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyBoxParams {
    pub cube_map: Option<TextureId>,
    pub intensity_scale: f32,
    pub slots: TextureSlots,
}

impl Default for SkyBoxParams {
    fn default() -> Self {
        Self {
            cube_map: None,
            intensity_scale: 1.0,
            slots: TextureSlots::new(0),
        }
    }
}

impl SkyBoxParams {
    pub(crate) fn write(&self, binding: &mut MaterialBinding) -> Result<(), MaterialError> {
        binding.uniforms.scalars[3] = self.intensity_scale;
        if self.cube_map.is_some() {
            binding.bind("skybox", self.slots, 0, "cubeMap", self.cube_map)?;
        }
        Ok(())
    }
}

/// Which per-vertex direction the vectors overlay draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VectorKind {
    #[default]
    Normal,
    Tangent,
    Bitangent,
}

impl VectorKind {
    /// Value of the `flags.w` selector in the vectors program.
    pub fn index(self) -> u32 {
        match self {
            VectorKind::Normal => 1,
            VectorKind::Tangent => 2,
            VectorKind::Bitangent => 3,
        }
    }

    /// Inverse of [`VectorKind::index`]; 0 and unknown values mean "none".
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            1 => Some(VectorKind::Normal),
            2 => Some(VectorKind::Tangent),
            3 => Some(VectorKind::Bitangent),
            _ => None,
        }
    }
}

/// Lines along the normals, tangents or bitangents of a mesh. Bump and
/// displacement follow the surface material so the lines match what is shaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorsParams {
    pub kind: VectorKind,
    pub color: Vec3,
    /// Line length in model units.
    pub scale: f32,
    pub bump: BumpMap,
    pub displacement: DisplacementMap,
    pub slots: TextureSlots,
}

impl Default for VectorsParams {
    fn default() -> Self {
        Self {
            kind: VectorKind::Normal,
            color: Vec3::new(1.0, 1.0, 0.0),
            scale: 0.1,
            bump: BumpMap::default(),
            displacement: DisplacementMap::default(),
            slots: TextureSlots::new(0),
        }
    }
}

impl VectorsParams {
    pub const BUMP: u32 = 0;
    pub const DISPLACEMENT: u32 = 1;

    pub(crate) fn write(&self, binding: &mut MaterialBinding) -> Result<(), MaterialError> {
        binding.uniforms.set_color(self.color);
        binding.uniforms.shape[0] = self.scale;
        binding.uniforms.flags[3] = self.kind.index();
        self.bump.write(binding, "vectors", self.slots, Self::BUMP)?;
        self.displacement
            .write(binding, "vectors", self.slots, Self::DISPLACEMENT)
    }
}

/// Mesh edges in a flat color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WireframeParams {
    pub color: Vec3,
}

impl Default for WireframeParams {
    fn default() -> Self {
        Self { color: Vec3::ONE }
    }
}

/// Full-screen filter reading one input image.
///
/// The input is the previous stage's render target; the renderer binds it
/// next to the uniforms written here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostParams {
    pub image_size: UVec2,
    pub kernel_size: UVec2,
    pub use_jitter: bool,
}

impl Default for PostParams {
    fn default() -> Self {
        Self {
            image_size: UVec2::ZERO,
            kernel_size: UVec2::new(5, 5),
            use_jitter: false,
        }
    }
}

impl PostParams {
    pub(crate) fn write(&self, binding: &mut MaterialBinding) {
        let u = &mut binding.uniforms;
        u.sizes = [
            self.image_size.x,
            self.image_size.y,
            self.kernel_size.x,
            self.kernel_size.y,
        ];
        u.enable(USE_JITTER, self.use_jitter);
    }
}
