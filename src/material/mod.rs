//! Materials: a program plus the uniforms and textures it is drawn with.
//!
//! The set of materials is closed. [`MaterialKind`] has one variant per
//! shading model, each holding its own parameter struct, and
//! [`Material::apply`] is the single dispatch point that turns a material into
//! a [`MaterialBinding`] for one light pass.
//!
//! # Binding Order
//!
//! `apply` fills the binding in a fixed order so later writes are never
//! clobbered:
//!
//! 1. the program
//! 2. base state: `time` and the light pass for animated variants, the light
//!    descriptor of the requested pass for lit variants
//! 3. the variant's own uniforms
//! 4. the variant's textures, each on the unit fixed by its [`TextureSlots`]
//!
//! The light pass is bounds-checked before anything else, so a failing
//! `apply` produces nothing the renderer could draw.
//!
//! # Texture Units
//!
//! Units are decided once when the material is built. Each logical texture has
//! a fixed offset from the material's base unit, whether or not the texture is
//! currently enabled, so toggling one texture never moves another.

mod lit;
mod uniforms;
mod unlit;

pub use lit::{
    BumpMap, CelParams, DisplacementMap, DotsParams, EnvMap, GroundParams, GroundSurfaces,
    PhongParams, SurfaceTextures, TexturedPhongParams,
};
pub use uniforms::{
    BUMP_DEBUG, MaterialUniforms, USE_BUMP, USE_DIFFUSE, USE_DISPLACEMENT, USE_EMISSIVE,
    USE_ENVIRONMENT, USE_GLOSS, USE_JITTER,
};
pub use unlit::{
    PostParams, SkyBoxParams, VectorKind, VectorsParams, WaveParams, WireframeParams,
};

use glam::Vec3;

use crate::error::MaterialError;
use crate::shader::Program;
use crate::texture::TextureId;

/// Number of texture units a material may address.
pub const MAX_TEXTURE_UNITS: u32 = 16;

/// Logical textures per material; the largest slot offset plus one.
pub const MAX_SLOTS: usize = 6;

/// Type-safe handle to a material stored in [`Materials`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// A point light as seen by one material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    /// Homogeneous world position.
    pub position_wc: glam::Vec4,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position_wc: glam::Vec4::new(0.0, 1.0, 5.0, 1.0),
            color: Vec3::ONE,
            intensity: 0.5,
        }
    }
}

/// Base texture unit of a material. Logical textures sit at fixed offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureSlots {
    pub base: u32,
}

impl TextureSlots {
    pub const fn new(base: u32) -> Self {
        Self { base }
    }

    /// Unit of the logical texture at `offset`.
    pub const fn unit(&self, offset: u32) -> u32 {
        self.base + offset
    }
}

/// An image placed on a texture unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub unit: u32,
    pub texture: TextureId,
}

/// Everything the renderer needs to draw with a material in one light pass.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialBinding {
    pub program: Program,
    pub uniforms: MaterialUniforms,
    /// Indexed by slot offset.
    pub textures: [Option<TextureBinding>; MAX_SLOTS],
}

impl MaterialBinding {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            uniforms: MaterialUniforms::default(),
            textures: [None; MAX_SLOTS],
        }
    }

    /// Unit `texture` is bound on, if any.
    pub fn unit_of(&self, texture: TextureId) -> Option<u32> {
        self.textures
            .iter()
            .flatten()
            .find(|b| b.texture == texture)
            .map(|b| b.unit)
    }

    /// Places `texture` on the unit of slot `offset`.
    pub(crate) fn bind(
        &mut self,
        material: &'static str,
        slots: TextureSlots,
        offset: u32,
        slot: &'static str,
        texture: Option<TextureId>,
    ) -> Result<(), MaterialError> {
        let texture = texture.ok_or(MaterialError::MissingTexture { material, slot })?;
        let unit = slots.unit(offset);
        if unit >= MAX_TEXTURE_UNITS {
            return Err(MaterialError::TextureUnitOutOfRange {
                unit,
                units: MAX_TEXTURE_UNITS,
            });
        }
        self.textures[offset as usize] = Some(TextureBinding { unit, texture });
        Ok(())
    }
}

/// The shading model of a material and its parameters.
#[derive(Clone, Debug)]
pub enum MaterialKind {
    Phong(PhongParams),
    TexturedPhong(TexturedPhongParams),
    Cartoon(CelParams),
    Dots(DotsParams),
    Wave(WaveParams),
    Ground(GroundParams),
    SkyBox(SkyBoxParams),
    Vectors(VectorsParams),
    Wireframe(WireframeParams),
    Post(PostParams),
}

impl MaterialKind {
    /// Whether the variant reads a light descriptor.
    pub fn is_lit(&self) -> bool {
        matches!(
            self,
            MaterialKind::Phong(_)
                | MaterialKind::TexturedPhong(_)
                | MaterialKind::Cartoon(_)
                | MaterialKind::Dots(_)
                | MaterialKind::Ground(_)
        )
    }

    /// Whether the variant reads the `time` uniform.
    pub fn is_animated(&self) -> bool {
        !matches!(
            self,
            MaterialKind::SkyBox(_)
                | MaterialKind::Vectors(_)
                | MaterialKind::Wireframe(_)
                | MaterialKind::Post(_)
        )
    }

    /// Short name for log messages and errors.
    pub fn label(&self) -> &'static str {
        match self {
            MaterialKind::Phong(_) => "phong",
            MaterialKind::TexturedPhong(_) => "textured phong",
            MaterialKind::Cartoon(_) => "cartoon",
            MaterialKind::Dots(_) => "dots",
            MaterialKind::Wave(_) => "wave",
            MaterialKind::Ground(_) => "ground",
            MaterialKind::SkyBox(_) => "skybox",
            MaterialKind::Vectors(_) => "vectors",
            MaterialKind::Wireframe(_) => "wireframe",
            MaterialKind::Post(_) => "post",
        }
    }

    /// Phong coefficients of the variants that have them.
    pub fn phong_mut(&mut self) -> Option<&mut PhongParams> {
        match self {
            MaterialKind::Phong(p) => Some(p),
            MaterialKind::TexturedPhong(p) => Some(&mut p.phong),
            MaterialKind::Cartoon(p) => Some(&mut p.phong),
            MaterialKind::Dots(p) => Some(&mut p.cel.phong),
            MaterialKind::Ground(p) => Some(&mut p.phong),
            _ => None,
        }
    }

    /// Cel parameters of the cartoon and dots variants.
    pub fn cel_mut(&mut self) -> Option<&mut CelParams> {
        match self {
            MaterialKind::Cartoon(p) => Some(p),
            MaterialKind::Dots(p) => Some(&mut p.cel),
            _ => None,
        }
    }

    fn write(&self, binding: &mut MaterialBinding) -> Result<(), MaterialError> {
        match self {
            MaterialKind::Phong(p) => binding.uniforms.set_phong(p),
            MaterialKind::TexturedPhong(p) => p.write(binding)?,
            MaterialKind::Cartoon(p) => p.write(binding),
            MaterialKind::Dots(p) => p.write(binding),
            MaterialKind::Wave(p) => p.write(binding),
            MaterialKind::Ground(p) => p.write(binding)?,
            MaterialKind::SkyBox(p) => p.write(binding)?,
            MaterialKind::Vectors(p) => p.write(binding)?,
            MaterialKind::Wireframe(p) => binding.uniforms.set_color(p.color),
            MaterialKind::Post(p) => p.write(binding),
        }
        Ok(())
    }
}

/// A program together with the state it is drawn with.
#[derive(Clone, Debug)]
pub struct Material {
    program: Program,
    /// Animation time in seconds.
    pub time: f32,
    /// One descriptor per light pass. Empty for unlit variants.
    pub lights: Vec<PointLight>,
    pub ambient_light_intensity: Vec3,
    pub kind: MaterialKind,
}

impl Material {
    /// Creates a material with `light_count` default lights if the variant is lit.
    pub fn new(program: Program, kind: MaterialKind, light_count: usize) -> Self {
        let lights = if kind.is_lit() {
            vec![PointLight::default(); light_count.max(1)]
        } else {
            Vec::new()
        };
        Self {
            program,
            time: 0.0,
            lights,
            ambient_light_intensity: Vec3::splat(0.3),
            kind,
        }
    }

    pub fn program(&self) -> Program {
        self.program
    }

    pub fn is_lit(&self) -> bool {
        self.kind.is_lit()
    }

    pub fn is_animated(&self) -> bool {
        self.kind.is_animated()
    }

    /// Builds the program, uniforms and texture units for `light_pass`.
    ///
    /// Unlit variants accept any `light_pass`. Lit variants fail with
    /// [`MaterialError::LightPassOutOfRange`] when `light_pass` has no light.
    pub fn apply(&self, light_pass: usize) -> Result<MaterialBinding, MaterialError> {
        let light = if self.is_lit() {
            Some(
                self.lights
                    .get(light_pass)
                    .ok_or(MaterialError::LightPassOutOfRange {
                        pass: light_pass,
                        lights: self.lights.len(),
                    })?,
            )
        } else {
            None
        };

        let mut binding = MaterialBinding::new(self.program);
        let u = &mut binding.uniforms;
        if self.is_animated() {
            u.scalars[0] = self.time;
            u.flags[0] = light_pass as u32;
        }
        if let Some(light) = light {
            u.ambient_light = self.ambient_light_intensity.extend(0.0).to_array();
            u.light_position = light.position_wc.to_array();
            u.light_intensity = (light.color * light.intensity).extend(0.0).to_array();
        }
        self.kind.write(&mut binding)?;
        Ok(binding)
    }

    pub fn set_time(&mut self, time: f32) {
        if self.is_animated() {
            self.time = time;
        }
    }

    /// Moves light `index`. Out-of-range indices are ignored.
    pub fn set_light_position(&mut self, index: usize, position_wc: Vec3) {
        if let Some(light) = self.lights.get_mut(index) {
            light.position_wc = position_wc.extend(1.0);
        }
    }

    /// Sets the intensity of light `index`. Out-of-range indices are ignored.
    pub fn set_light_intensity(&mut self, index: usize, intensity: f32) {
        if let Some(light) = self.lights.get_mut(index) {
            light.intensity = intensity;
        }
    }
}

/// Arena of materials.
#[derive(Clone, Debug, Default)]
pub struct Materials {
    materials: Vec<Material>,
}

impl Materials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Material> {
        self.materials.iter_mut()
    }

    /// Pushes the animation time into every animated material.
    pub fn set_time(&mut self, time: f32) {
        for m in self.materials.iter_mut() {
            m.set_time(time);
        }
    }

    /// Moves light `index` in every lit material.
    pub fn set_light_position(&mut self, index: usize, position_wc: Vec3) {
        for m in self.materials.iter_mut() {
            m.set_light_position(index, position_wc);
        }
    }

    /// Sets the intensity of light `index` in every lit material.
    pub fn set_light_intensity(&mut self, index: usize, intensity: f32) {
        for m in self.materials.iter_mut() {
            m.set_light_intensity(index, intensity);
        }
    }
}
