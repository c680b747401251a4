//! The demo scene.
//!
//! A [`Scene`] owns everything one frame reads: the node tree, the mesh and
//! material arenas, the skybox and the display [`Settings`]. Nodes and
//! materials the application needs at runtime are resolved once at
//! construction into typed handles ([`SceneNodes`], [`Models`],
//! [`SurfaceMaterials`], [`PostMaterials`]), so nothing is looked up by name
//! while drawing.
//!
//! ```text
//! World
//! ├── Scene ── <current model>
//! ├── Camera
//! │   └── Light0
//! └── Light1
//! ```
//!
//! The scene is tuned through [`Param`] values and driven by [`Command`]s.
//! Each accepted command reports whether the frame must be redrawn.
//!
//! Keys orbit the camera around the model, or move the last light while alt
//! is held, or steer the camera like a vehicle in flight mode. The mouse
//! turns and pans the model.
//!
//! A scene is plain CPU data. Textures live in the scene's [`Textures`]
//! arena and are uploaded by the renderer when first drawn.

mod params;
mod setup;

pub use params::{Controls, Param};
pub use setup::SceneConfig;

use glam::{UVec2, Vec3, Vec4};
use hecs::Entity;

use crate::error::SceneError;
use crate::material::{
    MaterialId, MaterialKind, Materials, PhongParams, PostParams, VectorKind, WaveParams,
};
use crate::mesh::{MeshId, Meshes, Overlays};
use crate::navigator::{
    InputEvent, ModelTrackball, Navigator, PlaneNavigator, PositionNavigator, RotateYNavigator,
};
use crate::scene_graph::SceneGraph;
use crate::skybox::SkyBox;
use crate::texture::Textures;

/// Models that can be shown under the scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Model {
    Cube,
    Sphere,
    Torus,
    Plane,
}

impl Model {
    pub const ALL: [Model; 4] = [Model::Cube, Model::Sphere, Model::Torus, Model::Plane];

    pub fn label(self) -> &'static str {
        match self {
            Model::Cube => "cube",
            Model::Sphere => "sphere",
            Model::Torus => "torus",
            Model::Plane => "plane",
        }
    }
}

/// Surface materials a model can be drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    Phong,
    Toon,
    Dots,
    Wave,
    Textured,
    Ground,
}

impl Surface {
    pub const ALL: [Surface; 6] = [
        Surface::Phong,
        Surface::Toon,
        Surface::Dots,
        Surface::Wave,
        Surface::Textured,
        Surface::Ground,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Surface::Phong => "phong",
            Surface::Toon => "toon",
            Surface::Dots => "dots",
            Surface::Wave => "wave",
            Surface::Textured => "textured",
            Surface::Ground => "ground",
        }
    }
}

/// Post-processing chain applied to the rendered scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PostChain {
    /// Copy without filtering.
    Passthrough,
    /// Box blur, optionally jittered.
    Blur,
    /// Separable Gaussian: horizontal stage, then vertical stage.
    #[default]
    Gauss,
    MotionBlur,
}

impl PostChain {
    pub const ALL: [PostChain; 4] = [
        PostChain::Passthrough,
        PostChain::Blur,
        PostChain::Gauss,
        PostChain::MotionBlur,
    ];

    /// Whether the chain needs a second off-screen target.
    pub fn is_two_stage(self) -> bool {
        self == PostChain::Gauss
    }
}

/// Nodes the application refers to after construction.
#[derive(Clone, Debug)]
pub struct SceneNodes {
    /// Root of the tree. Every world-space position is resolved against it.
    pub world: Entity,
    /// Parent of the current model. The trackball rotates this node.
    pub scene: Entity,
    /// Node the view is rendered from. Its inverse world transform is the
    /// view matrix.
    pub camera: Entity,
    /// One node per light, in light pass order.
    pub lights: Vec<Entity>,
}

/// Node and mesh of each model.
#[derive(Clone, Copy, Debug)]
pub struct Models {
    nodes: [Entity; 4],
    meshes: [MeshId; 4],
}

impl Models {
    pub fn node(&self, model: Model) -> Entity {
        self.nodes[model as usize]
    }

    pub fn mesh(&self, model: Model) -> MeshId {
        self.meshes[model as usize]
    }
}

/// Surface materials with the base color their coefficients scale from.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceMaterials {
    ids: [MaterialId; 6],
    base_colors: [Vec3; 6],
}

impl SurfaceMaterials {
    pub fn get(&self, surface: Surface) -> MaterialId {
        self.ids[surface as usize]
    }

    pub fn base_color(&self, surface: Surface) -> Vec3 {
        self.base_colors[surface as usize]
    }
}

/// Materials of the post-processing programs.
#[derive(Clone, Copy, Debug)]
pub struct PostMaterials {
    pub passthrough: MaterialId,
    pub blur: MaterialId,
    pub gauss_a: MaterialId,
    pub gauss_b: MaterialId,
    pub motion_blur: MaterialId,
}

impl PostMaterials {
    /// First and, for two-stage chains, second filter of `chain`.
    pub fn stages(&self, chain: PostChain) -> (MaterialId, Option<MaterialId>) {
        match chain {
            PostChain::Passthrough => (self.passthrough, None),
            PostChain::Blur => (self.blur, None),
            PostChain::Gauss => (self.gauss_a, Some(self.gauss_b)),
            PostChain::MotionBlur => (self.motion_blur, None),
        }
    }

    pub fn all(&self) -> [MaterialId; 5] {
        [
            self.passthrough,
            self.blur,
            self.gauss_a,
            self.gauss_b,
            self.motion_blur,
        ]
    }
}

/// Materials drawn on top of the current model when enabled.
#[derive(Clone, Copy, Debug)]
pub struct OverlayMaterials {
    pub wireframe: MaterialId,
    pub vectors: MaterialId,
}

/// Display state read by the renderer.
///
/// Everything here is changed through [`Param`]s; the renderer only reads it.
///
/// # Example
///
/// ```
/// use lightpass::scene::{PostChain, Settings};
///
/// let settings = Settings::default();
/// assert_eq!(settings.post, PostChain::Gauss);
/// assert!(settings.split_display);
/// assert!(!settings.wireframe);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Clear color of the scene target, RGBA.
    pub background: Vec4,
    /// Filter chain between the scene target and the screen.
    pub post: PostChain,
    /// Left half unfiltered, right half filtered.
    pub split_display: bool,
    /// Export the off-screen buffers periodically.
    pub fbo_preview: bool,
    /// Draw the sky cube behind the model.
    pub skybox: bool,
    /// Advance material time between frames.
    pub animating: bool,
    /// Whether the control panel is shown.
    pub ui_visible: bool,
    /// Arrow keys fly the camera instead of orbiting it.
    pub flight: bool,
    /// Model under the scene node.
    pub model: Model,
    /// Draw mesh edges over the shaded surface.
    pub wireframe: bool,
    /// Per-vertex direction drawn over the surface, if any.
    pub vectors: Option<VectorKind>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            background: Vec4::new(0.4, 0.4, 0.4, 1.0),
            post: PostChain::default(),
            split_display: true,
            fbo_preview: false,
            skybox: false,
            animating: true,
            ui_visible: true,
            flight: false,
            model: Model::Sphere,
            wireframe: false,
            vectors: None,
        }
    }
}

/// Something the user asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Quit,
    ToggleUi,
    Navigate(InputEvent),
    Set(Param),
}

/// What the application should do after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    Quit,
    Redraw,
    Ignored,
}

/// The demo scene: node tree, arenas and display state.
///
/// Built by [`Scene::new`] or [`Scene::with_config`].
pub struct Scene {
    /// Node tree. Models, camera and lights all live here.
    pub graph: SceneGraph,
    /// Handles of the named nodes.
    pub nodes: SceneNodes,
    /// Node and mesh of every model, shown or not.
    pub models: Models,
    /// Drawables referenced from graph nodes.
    pub meshes: Meshes,
    /// Every material: surfaces, sky, overlays and post filters.
    pub materials: Materials,
    /// Images referenced by materials.
    pub textures: Textures,
    /// Surface material per [`Surface`].
    pub surfaces: SurfaceMaterials,
    /// Filter materials per post stage.
    pub post: PostMaterials,
    /// Wireframe and vectors materials.
    pub overlays: OverlayMaterials,
    pub skybox: SkyBox,
    pub settings: Settings,
    trackball: ModelTrackball,
    orbit: RotateYNavigator,
    light_mover: PositionNavigator,
    plane: PlaneNavigator,
}

impl Scene {
    /// Shows `model` under the scene node, replacing the previous one.
    ///
    /// # Arguments
    ///
    /// * `model` - Model to attach. The previous one stays alive, detached.
    ///
    /// # Example
    ///
    /// ```
    /// use lightpass::scene::{Model, Scene};
    ///
    /// let mut scene = Scene::new()?;
    /// scene.set_scene_node(Model::Torus)?;
    /// assert_eq!(scene.settings.model, Model::Torus);
    /// # Ok::<(), lightpass::RenderError>(())
    /// ```
    pub fn set_scene_node(&mut self, model: Model) -> Result<(), SceneError> {
        self.graph
            .set_children(self.nodes.scene, &[self.models.node(model)])?;
        self.settings.model = model;
        Ok(())
    }

    /// Draws `model` with `surface` from now on. The geometry stays shared.
    ///
    /// # Arguments
    ///
    /// * `model` - Model whose mesh gets the new material
    /// * `surface` - Surface material to draw it with
    pub fn set_material_node(&mut self, model: Model, surface: Surface) {
        let material = self.surfaces.get(surface);
        if let Some(mesh) = self.meshes.get_mut(self.models.mesh(model)) {
            mesh.replace_material(material);
        }
    }

    /// Material the current model is drawn with.
    pub fn current_material(&self) -> Option<MaterialId> {
        self.meshes
            .get(self.models.mesh(self.settings.model))
            .map(|m| m.material())
    }

    /// World positions of the lights, in light pass order.
    pub fn light_positions(&self) -> Result<Vec<Vec3>, SceneError> {
        self.nodes
            .lights
            .iter()
            .map(|&light| self.graph.world_position(self.nodes.world, light))
            .collect()
    }

    pub fn light_count(&self) -> usize {
        self.nodes.lights.len()
    }

    /// The flight navigator, for reading its speed and heading.
    pub fn plane(&self) -> &PlaneNavigator {
        &self.plane
    }

    /// The camera orbit.
    pub fn orbit(&self) -> &RotateYNavigator {
        &self.orbit
    }

    /// Overlay materials to draw this frame, per the current settings.
    pub fn active_overlays(&self) -> Overlays {
        Overlays {
            wireframe: self.settings.wireframe.then_some(self.overlays.wireframe),
            vectors: self.settings.vectors.map(|_| self.overlays.vectors),
        }
    }

    /// Executes `command` and reports what the caller should do next.
    ///
    /// Failed parameters and failed navigation are logged and ignored.
    pub fn handle_input(&mut self, command: Command) -> Response {
        match command {
            Command::Quit => Response::Quit,
            Command::ToggleUi => {
                self.settings.ui_visible = !self.settings.ui_visible;
                Response::Redraw
            }
            Command::Set(param) => match self.apply_param(param) {
                Ok(()) => Response::Redraw,
                Err(e) => {
                    log::warn!("could not apply {}: {}", param.name(), e);
                    Response::Ignored
                }
            },
            Command::Navigate(event) => self.navigate(&event),
        }
    }

    fn navigate(&mut self, event: &InputEvent) -> Response {
        let result = match event {
            InputEvent::KeyPress(..) | InputEvent::KeyRelease(..) if self.settings.flight => {
                self.plane.handle(&mut self.graph, event)
            }
            InputEvent::KeyPress(_, mods) | InputEvent::KeyRelease(_, mods) if mods.alt => {
                self.light_mover.handle(&mut self.graph, event)
            }
            InputEvent::KeyPress(..) | InputEvent::KeyRelease(..) => {
                self.orbit.handle(&mut self.graph, event)
            }
            _ => self.trackball.handle(&mut self.graph, event),
        };
        match result {
            Ok(true) => Response::Redraw,
            Ok(false) => Response::Ignored,
            Err(e) => {
                log::warn!("navigation failed: {}", e);
                Response::Ignored
            }
        }
    }

    /// Advances continuous navigation. Returns whether anything moved.
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.settings.flight {
            return false;
        }
        match self.plane.update(&mut self.graph, dt) {
            Ok(moved) => moved,
            Err(e) => {
                log::warn!("flight update failed: {}", e);
                self.plane.stop();
                false
            }
        }
    }

    /// Applies one parameter.
    ///
    /// # Example
    ///
    /// ```
    /// use lightpass::scene::{Param, Scene};
    /// use lightpass::material::VectorKind;
    ///
    /// let mut scene = Scene::new()?;
    /// scene.apply_param(Param::VisualizeVectors(Some(VectorKind::Tangent)))?;
    /// assert!(scene.active_overlays().vectors.is_some());
    /// # Ok::<(), lightpass::RenderError>(())
    /// ```
    pub fn apply_param(&mut self, param: Param) -> Result<(), SceneError> {
        log::debug!("{:?}", param);
        match param {
            Param::Background(color) => self.settings.background = color.extend(1.0),
            Param::LightIntensity { light, value } => {
                self.materials.set_light_intensity(light, value)
            }
            Param::AmbientScale(scale) => {
                self.for_each_lit(|phong, base| phong.k_ambient = base * scale)
            }
            Param::DiffuseScale(scale) => {
                self.for_each_lit(|phong, base| phong.k_diffuse = base * scale)
            }
            Param::SpecularScale(scale) => {
                self.for_each_lit(|phong, _| phong.k_specular = Vec3::splat(scale))
            }
            Param::Shininess(shininess) => {
                self.for_each_lit(|phong, _| phong.shininess = shininess)
            }
            Param::ToonShades(shades) => {
                for surface in [Surface::Toon, Surface::Dots] {
                    if let Some(cel) = self.kind_mut(surface).and_then(|k| k.cel_mut()) {
                        cel.shades = shades;
                    }
                }
            }
            Param::DotColor(color) => {
                if let Some(MaterialKind::Dots(dots)) = self.kind_mut(Surface::Dots) {
                    dots.dot_color = color;
                }
            }
            Param::WaveDepth(v) => self.with_wave(|w| w.depth = v),
            Param::WaveSpeed(v) => self.with_wave(|w| w.speed = v),
            Param::WaveHeight(v) => self.with_wave(|w| w.height = v),
            Param::EnvironmentMapping(on) => {
                if let Some(MaterialKind::TexturedPhong(p)) = self.kind_mut(Surface::Textured) {
                    p.tex.use_environment = on;
                }
            }
            Param::MirrorScale(v) => {
                if let Some(MaterialKind::TexturedPhong(p)) = self.kind_mut(Surface::Textured) {
                    p.envmap.k_mirror = Vec3::splat(v);
                }
            }
            Param::RefractScale(v) => {
                if let Some(MaterialKind::TexturedPhong(p)) = self.kind_mut(Surface::Textured) {
                    p.envmap.k_refract = Vec3::splat(v);
                }
            }
            Param::RefractRatio(v) => {
                if let Some(MaterialKind::TexturedPhong(p)) = self.kind_mut(Surface::Textured) {
                    p.envmap.refract_ratio = v;
                }
            }
            Param::BumpMapping(on) => {
                if let Some(MaterialKind::TexturedPhong(p)) = self.kind_mut(Surface::Textured) {
                    p.bump.enabled = on;
                }
            }
            Param::BumpScale(v) => {
                if let Some(MaterialKind::Ground(g)) = self.kind_mut(Surface::Ground) {
                    g.bump.scale = v * 3.0;
                }
                if let Some(MaterialKind::Vectors(p)) = self.overlay_kind_mut() {
                    p.bump.scale = v * 3.0;
                }
            }
            Param::DisplacementMapping(on) => {
                if let Some(MaterialKind::TexturedPhong(p)) = self.kind_mut(Surface::Textured) {
                    p.displacement.enabled = on;
                }
            }
            Param::DisplacementScale(v) => {
                let scale = v / 100.0 * 20.0;
                if let Some(MaterialKind::Ground(g)) = self.kind_mut(Surface::Ground) {
                    g.displacement.scale = scale;
                }
                if let Some(MaterialKind::Vectors(p)) = self.overlay_kind_mut() {
                    p.displacement.scale = scale;
                }
            }
            Param::Wireframe(on) => self.settings.wireframe = on,
            Param::VisualizeVectors(kind) => {
                if let (Some(kind), Some(MaterialKind::Vectors(p))) =
                    (kind, self.overlay_kind_mut())
                {
                    p.kind = kind;
                }
                self.settings.vectors = kind;
            }
            Param::VectorScale(v) => {
                if let Some(MaterialKind::Vectors(p)) = self.overlay_kind_mut() {
                    p.scale = v / 10.0;
                }
            }
            Param::SkyBox(on) => self.settings.skybox = on,
            Param::SkylightScale(v) => {
                let sky = self.materials.get_mut(self.skybox.material());
                if let Some(MaterialKind::SkyBox(p)) = sky.map(|m| &mut m.kind) {
                    p.intensity_scale = v;
                }
            }
            Param::KernelSize(size) => self.with_post(|p| p.kernel_size = UVec2::splat(size)),
            Param::PostFilter(chain) => self.settings.post = chain,
            Param::Jitter(on) => self.with_post(|p| p.use_jitter = on),
            Param::SplitDisplay(on) => self.settings.split_display = on,
            Param::FboPreview(on) => self.settings.fbo_preview = on,
            Param::SceneModel(model) => self.set_scene_node(model)?,
            Param::Material { model, surface } => self.set_material_node(model, surface),
            Param::GroundTranslation(offset) => {
                if let Some(MaterialKind::Ground(g)) = self.kind_mut(Surface::Ground) {
                    g.translation = offset;
                }
            }
            Param::Animation(on) => self.settings.animating = on,
            Param::Flight(on) => {
                if !on {
                    self.plane.stop();
                }
                self.settings.flight = on;
            }
        }
        Ok(())
    }

    fn kind_mut(&mut self, surface: Surface) -> Option<&mut MaterialKind> {
        self.materials
            .get_mut(self.surfaces.get(surface))
            .map(|m| &mut m.kind)
    }

    fn overlay_kind_mut(&mut self) -> Option<&mut MaterialKind> {
        self.materials
            .get_mut(self.overlays.vectors)
            .map(|m| &mut m.kind)
    }

    fn for_each_lit(&mut self, mut f: impl FnMut(&mut PhongParams, Vec3)) {
        for surface in Surface::ALL {
            let base = self.surfaces.base_color(surface);
            if let Some(phong) = self.kind_mut(surface).and_then(|k| k.phong_mut()) {
                f(phong, base);
            }
        }
    }

    fn with_wave(&mut self, f: impl FnOnce(&mut WaveParams)) {
        if let Some(MaterialKind::Wave(wave)) = self.kind_mut(Surface::Wave) {
            f(wave);
        }
    }

    fn with_post(&mut self, f: impl Fn(&mut PostParams)) {
        for id in self.post.all() {
            if let Some(MaterialKind::Post(p)) = self.materials.get_mut(id).map(|m| &mut m.kind) {
                f(p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::{Key, Modifiers};

    fn scene() -> Scene {
        Scene::new().unwrap()
    }

    fn vectors(scene: &Scene) -> crate::material::VectorsParams {
        match scene.materials.get(scene.overlays.vectors).map(|m| &m.kind) {
            Some(MaterialKind::Vectors(p)) => *p,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scene_node_holds_exactly_the_selected_model() {
        let mut scene = scene();
        assert_eq!(
            scene.graph.children(scene.nodes.scene).unwrap(),
            vec![scene.models.node(Model::Sphere)]
        );
        scene.set_scene_node(Model::Torus).unwrap();
        scene.set_scene_node(Model::Cube).unwrap();
        assert_eq!(
            scene.graph.children(scene.nodes.scene).unwrap(),
            vec![scene.models.node(Model::Cube)]
        );
        // the swapped-out model survives detached
        let torus = scene.models.node(Model::Torus);
        assert!(scene.graph.contains(torus));
        assert_eq!(scene.graph.parent(torus).unwrap(), None);
    }

    #[test]
    fn material_assignment_swaps_only_the_material() {
        let mut scene = scene();
        let geometry = scene
            .meshes
            .get(scene.models.mesh(Model::Sphere))
            .map(|m| m.geometry().clone())
            .unwrap();
        scene.handle_input(Command::Set(Param::Material {
            model: Model::Sphere,
            surface: Surface::Dots,
        }));
        assert_eq!(scene.current_material(), Some(scene.surfaces.get(Surface::Dots)));
        let mesh = scene.meshes.get(scene.models.mesh(Model::Sphere)).unwrap();
        assert!(std::rc::Rc::ptr_eq(mesh.geometry(), &geometry));
    }

    #[test]
    fn coefficient_scales_follow_base_color() {
        let mut scene = scene();
        scene.apply_param(Param::AmbientScale(0.5)).unwrap();
        let base = scene.surfaces.base_color(Surface::Phong);
        let id = scene.surfaces.get(Surface::Phong);
        match &scene.materials.get(id).unwrap().kind {
            MaterialKind::Phong(p) => assert_eq!(p.k_ambient, base * 0.5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn commands_report_redraw_or_quit() {
        let mut scene = scene();
        assert_eq!(scene.handle_input(Command::Quit), Response::Quit);
        assert_eq!(scene.handle_input(Command::ToggleUi), Response::Redraw);
        assert!(!scene.settings.ui_visible);
        let press = InputEvent::KeyPress(Key::Up, Modifiers::NONE);
        assert_eq!(scene.handle_input(Command::Navigate(press)), Response::Redraw);
    }

    #[test]
    fn arrow_keys_orbit_the_camera() {
        let mut scene = scene();
        let world = scene.nodes.world;
        let camera = scene.nodes.camera;
        let start = scene.graph.world_position(world, camera).unwrap();
        assert!((start.length() - 3.0).abs() < 1e-5);

        let press = InputEvent::KeyPress(Key::Right, Modifiers::NONE);
        assert_eq!(scene.handle_input(Command::Navigate(press)), Response::Redraw);
        let moved = scene.graph.world_position(world, camera).unwrap();
        assert!(moved.x > 0.0);
        assert!((moved.length() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn alt_keys_move_the_last_light() {
        let mut scene = scene();
        let before = scene.light_positions().unwrap();
        let camera = scene.graph.transformation(scene.nodes.camera).unwrap();
        let alt = Modifiers {
            shift: false,
            alt: true,
        };
        let press = InputEvent::KeyPress(Key::Right, alt);
        assert_eq!(scene.handle_input(Command::Navigate(press)), Response::Redraw);

        let after = scene.light_positions().unwrap();
        assert_eq!(after[0], before[0]);
        assert!((after[1] - before[1] - Vec3::new(0.1, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(scene.graph.transformation(scene.nodes.camera).unwrap(), camera);
    }

    #[test]
    fn flight_mode_routes_keys_to_the_plane() {
        let mut scene = scene();
        scene.apply_param(Param::Flight(true)).unwrap();
        let camera = scene.nodes.camera;
        let before = scene.graph.transformation(camera).unwrap();
        let press = InputEvent::KeyPress(Key::Up, Modifiers::NONE);
        // the press only sets the throttle
        assert_eq!(scene.handle_input(Command::Navigate(press)), Response::Ignored);
        assert_eq!(scene.graph.transformation(camera).unwrap(), before);
        assert!(scene.update(0.5));
        assert_ne!(scene.graph.transformation(camera).unwrap(), before);

        scene.apply_param(Param::Flight(false)).unwrap();
        assert_eq!(scene.plane().speed(), 0.0);
        assert!(!scene.update(0.5));
    }

    #[test]
    fn overlays_follow_their_settings() {
        let mut scene = scene();
        assert_eq!(scene.active_overlays(), Overlays::default());

        scene.apply_param(Param::Wireframe(true)).unwrap();
        scene.apply_param(Param::VisualizeVectors(Some(VectorKind::Bitangent))).unwrap();
        let overlays = scene.active_overlays();
        assert_eq!(overlays.wireframe, Some(scene.overlays.wireframe));
        assert_eq!(overlays.vectors, Some(scene.overlays.vectors));
        assert_eq!(vectors(&scene).kind, VectorKind::Bitangent);

        scene.apply_param(Param::VisualizeVectors(None)).unwrap();
        assert_eq!(scene.active_overlays().vectors, None);
        // the last shown direction is kept for next time
        assert_eq!(vectors(&scene).kind, VectorKind::Bitangent);
    }

    #[test]
    fn map_scales_reach_ground_and_vectors() {
        let mut scene = scene();
        scene.apply_param(Param::BumpScale(0.5)).unwrap();
        scene.apply_param(Param::DisplacementScale(10.0)).unwrap();
        scene.apply_param(Param::VectorScale(2.0)).unwrap();

        let vectors = vectors(&scene);
        assert_eq!(vectors.bump.scale, 1.5);
        assert!((vectors.displacement.scale - 2.0).abs() < 1e-6);
        assert!((vectors.scale - 0.2).abs() < 1e-6);
        match scene.materials.get(scene.surfaces.get(Surface::Ground)).map(|m| &m.kind) {
            Some(MaterialKind::Ground(g)) => {
                assert_eq!(g.bump.scale, 1.5);
                assert!((g.displacement.scale - 2.0).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn removed_camera_is_reported_not_fatal() {
        let mut scene = scene();
        let camera = scene.nodes.camera;
        scene.graph.remove_subtree(camera).unwrap();
        let press = InputEvent::KeyPress(Key::Left, Modifiers::NONE);
        assert_eq!(scene.handle_input(Command::Navigate(press)), Response::Ignored);
        assert!(scene.light_positions().is_err());
    }
}
