//! Parameters of the lit shading models.

use glam::{Vec2, Vec3};

use super::uniforms::{
    BUMP_DEBUG, USE_BUMP, USE_DIFFUSE, USE_DISPLACEMENT, USE_EMISSIVE, USE_ENVIRONMENT, USE_GLOSS,
};
use super::{MaterialBinding, TextureSlots};
use crate::error::MaterialError;
use crate::texture::TextureId;

/// Phong reflection coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhongParams {
    pub k_ambient: Vec3,
    pub k_diffuse: Vec3,
    pub k_specular: Vec3,
    pub shininess: f32,
}

impl Default for PhongParams {
    fn default() -> Self {
        Self {
            k_ambient: Vec3::new(0.1, 0.1, 0.5),
            k_diffuse: Vec3::new(0.1, 0.5, 0.1),
            k_specular: Vec3::splat(0.8),
            shininess: 80.0,
        }
    }
}

impl PhongParams {
    /// Diffuse color with ambient at 30% of it.
    pub fn colored(k_diffuse: Vec3) -> Self {
        Self {
            k_ambient: k_diffuse * 0.3,
            k_diffuse,
            ..Self::default()
        }
    }
}

/// Cel shading: Phong quantized into `shades` bands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CelParams {
    pub phong: PhongParams,
    pub shades: i32,
}

impl Default for CelParams {
    fn default() -> Self {
        Self {
            phong: PhongParams::default(),
            shades: 1,
        }
    }
}

impl CelParams {
    pub(crate) fn write(&self, binding: &mut MaterialBinding) {
        binding.uniforms.set_phong(&self.phong);
        binding.uniforms.flags[2] = self.shades.max(1) as u32;
    }
}

/// Cel shading with a grid of dots painted over the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotsParams {
    pub cel: CelParams,
    /// Dots per unit of texture coordinate.
    pub frequency: f32,
    /// Dot radius relative to the cell size.
    pub radius: f32,
    pub dot_color: Vec3,
}

impl Default for DotsParams {
    fn default() -> Self {
        Self {
            cel: CelParams::default(),
            frequency: 10.0,
            radius: 0.25,
            dot_color: Vec3::new(0.5, 0.6, 0.7),
        }
    }
}

impl DotsParams {
    pub(crate) fn write(&self, binding: &mut MaterialBinding) {
        self.cel.write(binding);
        binding.uniforms.shape = [self.frequency, self.radius, 0.0, 0.0];
        binding.uniforms.set_color(self.dot_color);
    }
}

/// Optional textures of a textured Phong surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceTextures {
    pub use_diffuse: bool,
    pub use_emissive: bool,
    pub use_gloss: bool,
    pub use_environment: bool,
    pub diffuse: Option<TextureId>,
    pub emissive: Option<TextureId>,
    pub gloss: Option<TextureId>,
    /// Cube map used for mirror and refraction terms.
    pub environment: Option<TextureId>,
    pub emissive_scale: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BumpMap {
    pub enabled: bool,
    pub scale: f32,
    /// Render the perturbed normal instead of the shaded color.
    pub debug: bool,
    pub texture: Option<TextureId>,
}

impl Default for BumpMap {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: 1.0,
            debug: false,
            texture: None,
        }
    }
}

impl BumpMap {
    /// Sets the bump flags and scale, and binds the map at `offset` when
    /// enabled.
    pub(crate) fn write(
        &self,
        binding: &mut MaterialBinding,
        material: &'static str,
        slots: TextureSlots,
        offset: u32,
    ) -> Result<(), MaterialError> {
        binding.uniforms.enable(USE_BUMP, self.enabled);
        binding.uniforms.enable(BUMP_DEBUG, self.enabled && self.debug);
        binding.uniforms.scalars[1] = self.scale;
        if self.enabled {
            binding.bind(material, slots, offset, "bumpTexture", self.texture)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplacementMap {
    pub enabled: bool,
    pub scale: f32,
    pub texture: Option<TextureId>,
}

impl Default for DisplacementMap {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: 1.0,
            texture: None,
        }
    }
}

impl DisplacementMap {
    pub(crate) fn write(
        &self,
        binding: &mut MaterialBinding,
        material: &'static str,
        slots: TextureSlots,
        offset: u32,
    ) -> Result<(), MaterialError> {
        binding.uniforms.enable(USE_DISPLACEMENT, self.enabled);
        binding.uniforms.scalars[2] = self.scale;
        if self.enabled {
            binding.bind(material, slots, offset, "displacementTexture", self.texture)?;
        }
        Ok(())
    }
}

/// Environment mapping coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvMap {
    pub k_mirror: Vec3,
    pub k_refract: Vec3,
    pub refract_ratio: f32,
}

impl Default for EnvMap {
    fn default() -> Self {
        Self {
            k_mirror: Vec3::splat(0.5),
            k_refract: Vec3::ZERO,
            refract_ratio: 1.5,
        }
    }
}

/// Phong with diffuse/emissive/gloss/environment textures and bump and
/// displacement mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexturedPhongParams {
    pub phong: PhongParams,
    pub tex: SurfaceTextures,
    pub bump: BumpMap,
    pub displacement: DisplacementMap,
    pub envmap: EnvMap,
    pub slots: TextureSlots,
}

impl Default for TexturedPhongParams {
    fn default() -> Self {
        Self {
            phong: PhongParams::default(),
            tex: SurfaceTextures {
                emissive_scale: 1.0,
                ..SurfaceTextures::default()
            },
            bump: BumpMap::default(),
            displacement: DisplacementMap::default(),
            envmap: EnvMap::default(),
            slots: TextureSlots::new(0),
        }
    }
}

impl TexturedPhongParams {
    pub const DIFFUSE: u32 = 0;
    pub const EMISSIVE: u32 = 1;
    pub const GLOSS: u32 = 2;
    pub const ENVIRONMENT: u32 = 3;
    pub const BUMP: u32 = 4;
    pub const DISPLACEMENT: u32 = 5;

    pub(crate) fn write(&self, binding: &mut MaterialBinding) -> Result<(), MaterialError> {
        const NAME: &str = "textured phong";
        let tex = &self.tex;
        let u = &mut binding.uniforms;
        u.set_phong(&self.phong);
        u.enable(USE_DIFFUSE, tex.use_diffuse);
        u.enable(USE_EMISSIVE, tex.use_emissive);
        u.enable(USE_GLOSS, tex.use_gloss);
        u.enable(USE_ENVIRONMENT, tex.use_environment);
        u.k_mirror = self.envmap.k_mirror.extend(self.envmap.refract_ratio).to_array();
        u.k_refract = self.envmap.k_refract.extend(tex.emissive_scale).to_array();

        let textures = [
            (tex.use_diffuse, tex.diffuse, Self::DIFFUSE, "diffuseTexture"),
            (tex.use_emissive, tex.emissive, Self::EMISSIVE, "emissiveTexture"),
            (tex.use_gloss, tex.gloss, Self::GLOSS, "glossTexture"),
            (tex.use_environment, tex.environment, Self::ENVIRONMENT, "environmentTexture"),
        ];
        for (enabled, texture, offset, slot) in textures {
            if enabled {
                binding.bind(NAME, self.slots, offset, slot, texture)?;
            }
        }
        self.bump.write(binding, NAME, self.slots, Self::BUMP)?;
        self.displacement
            .write(binding, NAME, self.slots, Self::DISPLACEMENT)
    }
}

/// Grass/gravel/sand blend of the ground.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundSurfaces {
    pub grass: Option<TextureId>,
    pub gravel: Option<TextureId>,
    pub sand: Option<TextureId>,
}

/// Textured terrain: three surfaces blended by height, a bump map and a
/// scrolling texture offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundParams {
    pub phong: PhongParams,
    pub surfaces: GroundSurfaces,
    pub bump: BumpMap,
    pub displacement: DisplacementMap,
    pub translation: Vec2,
    pub slots: TextureSlots,
}

impl Default for GroundParams {
    fn default() -> Self {
        Self {
            phong: PhongParams::colored(Vec3::splat(0.8)),
            surfaces: GroundSurfaces::default(),
            bump: BumpMap {
                enabled: true,
                ..BumpMap::default()
            },
            displacement: DisplacementMap {
                enabled: true,
                ..DisplacementMap::default()
            },
            translation: Vec2::ZERO,
            slots: TextureSlots::new(0),
        }
    }
}

impl GroundParams {
    pub const GRASS: u32 = 0;
    pub const GRAVEL: u32 = 1;
    pub const SAND: u32 = 2;
    pub const BUMP: u32 = 3;
    pub const DISPLACEMENT: u32 = 4;

    pub(crate) fn write(&self, binding: &mut MaterialBinding) -> Result<(), MaterialError> {
        const NAME: &str = "ground";
        binding.uniforms.set_phong(&self.phong);
        binding.uniforms.shape = [self.translation.x, self.translation.y, 0.0, 0.0];
        let surfaces = [
            (Self::GRASS, "grassTexture", self.surfaces.grass),
            (Self::GRAVEL, "gravelTexture", self.surfaces.gravel),
            (Self::SAND, "sandTexture", self.surfaces.sand),
        ];
        for (offset, slot, texture) in surfaces {
            binding.bind(NAME, self.slots, offset, slot, texture)?;
        }
        self.bump.write(binding, NAME, self.slots, Self::BUMP)?;
        self.displacement
            .write(binding, NAME, self.slots, Self::DISPLACEMENT)
    }
}
