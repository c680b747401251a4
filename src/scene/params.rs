//! Tunable scene parameters and the control panel state that emits them.

use glam::{Vec2, Vec3};

use super::{Model, PostChain, Surface};
use crate::material::VectorKind;

/// One scene setting. Applying a parameter changes exactly one thing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Param {
    Background(Vec3),
    /// Intensity of the light drawn in pass `light`.
    LightIntensity { light: usize, value: f32 },
    /// Ambient coefficient of every lit surface, relative to its base color.
    AmbientScale(f32),
    /// Diffuse coefficient of every lit surface, relative to its base color.
    DiffuseScale(f32),
    SpecularScale(f32),
    Shininess(f32),
    ToonShades(i32),
    DotColor(Vec3),
    WaveDepth(f32),
    WaveSpeed(f32),
    WaveHeight(f32),
    EnvironmentMapping(bool),
    MirrorScale(f32),
    RefractScale(f32),
    RefractRatio(f32),
    /// Bump mapping on the textured surface.
    BumpMapping(bool),
    /// Bump strength of the ground and the vectors overlay, times three.
    BumpScale(f32),
    /// Displacement mapping on the textured surface.
    DisplacementMapping(bool),
    /// Displacement of the ground and the vectors overlay, in percent of 20.
    DisplacementScale(f32),
    /// Draw mesh edges over the current model.
    Wireframe(bool),
    /// Per-vertex direction to draw over the current model, or none.
    VisualizeVectors(Option<VectorKind>),
    /// Length of the drawn vectors, in tenths of a model unit.
    VectorScale(f32),
    SkyBox(bool),
    SkylightScale(f32),
    /// Kernel width and height of every post filter, in texels.
    KernelSize(u32),
    PostFilter(PostChain),
    Jitter(bool),
    SplitDisplay(bool),
    FboPreview(bool),
    SceneModel(Model),
    /// Draw `model` with `surface`.
    Material { model: Model, surface: Surface },
    GroundTranslation(Vec2),
    Animation(bool),
    /// Arrow keys fly the camera instead of stepping it.
    Flight(bool),
}

impl Param {
    /// Vector selection from a radio group whose buttons have the ids -2
    /// (none), -3 (normals), -4 (tangents) and -5 (bitangents).
    ///
    /// # Example
    ///
    /// ```
    /// use lightpass::Param;
    /// use lightpass::material::VectorKind;
    ///
    /// assert_eq!(Param::visualize_vectors(-2), Param::VisualizeVectors(None));
    /// assert_eq!(
    ///     Param::visualize_vectors(-4),
    ///     Param::VisualizeVectors(Some(VectorKind::Tangent))
    /// );
    /// ```
    pub fn visualize_vectors(button_id: i32) -> Self {
        let index = u32::try_from(-2 - button_id).unwrap_or(0);
        Param::VisualizeVectors(VectorKind::from_index(index))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Param::Background(_) => "background",
            Param::LightIntensity { .. } => "light intensity",
            Param::AmbientScale(_) => "ambient scale",
            Param::DiffuseScale(_) => "diffuse scale",
            Param::SpecularScale(_) => "specular scale",
            Param::Shininess(_) => "shininess",
            Param::ToonShades(_) => "toon shades",
            Param::DotColor(_) => "dot color",
            Param::WaveDepth(_) => "wave depth",
            Param::WaveSpeed(_) => "wave speed",
            Param::WaveHeight(_) => "wave height",
            Param::EnvironmentMapping(_) => "environment mapping",
            Param::MirrorScale(_) => "mirror scale",
            Param::RefractScale(_) => "refract scale",
            Param::RefractRatio(_) => "refract ratio",
            Param::BumpMapping(_) => "bump mapping",
            Param::BumpScale(_) => "bump scale",
            Param::DisplacementMapping(_) => "displacement mapping",
            Param::DisplacementScale(_) => "displacement scale",
            Param::Wireframe(_) => "wireframe",
            Param::VisualizeVectors(_) => "visualize vectors",
            Param::VectorScale(_) => "vector scale",
            Param::SkyBox(_) => "skybox",
            Param::SkylightScale(_) => "skylight scale",
            Param::KernelSize(_) => "kernel size",
            Param::PostFilter(_) => "post filter",
            Param::Jitter(_) => "jitter",
            Param::SplitDisplay(_) => "split display",
            Param::FboPreview(_) => "fbo preview",
            Param::SceneModel(_) => "scene model",
            Param::Material { .. } => "material",
            Param::GroundTranslation(_) => "ground translation",
            Param::Animation(_) => "animation",
            Param::Flight(_) => "flight",
        }
    }

    /// Identifies the control this value belongs to. Per-light and per-model
    /// parameters have one control each.
    fn key(&self) -> (&'static str, usize) {
        let index = match self {
            Param::LightIntensity { light, .. } => *light,
            Param::Material { model, .. } => *model as usize,
            _ => 0,
        };
        (self.name(), index)
    }
}

/// Current value of every control, in the order they were first set.
///
/// [`set`](Self::set) only reports values that actually changed, so a
/// control dragged back and forth over the same value costs nothing.
/// [`force_notify`](Self::force_notify) re-emits every current value, which
/// is how a freshly built scene is brought in line with the panel.
#[derive(Clone, Debug, Default)]
pub struct Controls {
    values: Vec<Param>,
}

impl Controls {
    pub fn new(initial: impl IntoIterator<Item = Param>) -> Self {
        let mut controls = Self::default();
        for param in initial {
            controls.set(param);
        }
        controls
    }

    /// Default panel of the demo scene with `lights` light sliders.
    pub fn demo(lights: usize) -> Self {
        let mut values = vec![
            Param::Background(Vec3::splat(0.4)),
            Param::AmbientScale(0.3),
            Param::DiffuseScale(1.0),
            Param::SpecularScale(0.8),
            Param::Shininess(80.0),
            Param::ToonShades(3),
            Param::DotColor(Vec3::new(0.5, 0.6, 0.7)),
            Param::WaveDepth(0.1),
            Param::WaveSpeed(1.0),
            Param::WaveHeight(0.07),
            Param::EnvironmentMapping(false),
            Param::MirrorScale(0.5),
            Param::RefractScale(0.0),
            Param::RefractRatio(1.5),
            Param::BumpMapping(true),
            Param::BumpScale(0.2),
            Param::DisplacementMapping(false),
            Param::DisplacementScale(0.5),
            Param::Wireframe(false),
            Param::VisualizeVectors(None),
            Param::VectorScale(1.0),
            Param::SkyBox(false),
            Param::SkylightScale(1.0),
            Param::KernelSize(5),
            Param::PostFilter(PostChain::Gauss),
            Param::Jitter(false),
            Param::SplitDisplay(true),
            Param::FboPreview(false),
            Param::Material {
                model: Model::Cube,
                surface: Surface::Textured,
            },
            Param::Material {
                model: Model::Sphere,
                surface: Surface::Phong,
            },
            Param::Material {
                model: Model::Torus,
                surface: Surface::Toon,
            },
            Param::Material {
                model: Model::Plane,
                surface: Surface::Ground,
            },
            Param::SceneModel(Model::Sphere),
            Param::GroundTranslation(Vec2::ZERO),
            Param::Animation(true),
            Param::Flight(false),
        ];
        for light in 0..lights {
            let value = if light == 0 { 0.8 } else { 0.4 };
            values.insert(1 + light, Param::LightIntensity { light, value });
        }
        Self::new(values)
    }

    /// Stores `param`. Returns it if the control's value changed.
    pub fn set(&mut self, param: Param) -> Option<Param> {
        let key = param.key();
        match self.values.iter_mut().find(|p| p.key() == key) {
            Some(current) if *current == param => None,
            Some(current) => {
                *current = param;
                Some(param)
            }
            None => {
                self.values.push(param);
                Some(param)
            }
        }
    }

    /// Current value of the control `param` belongs to.
    pub fn current(&self, param: &Param) -> Option<Param> {
        let key = param.key();
        self.values.iter().copied().find(|p| p.key() == key)
    }

    /// Every current value, changed or not.
    pub fn force_notify(&self) -> impl Iterator<Item = Param> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
