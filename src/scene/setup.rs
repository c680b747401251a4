//! Construction of the demo scene.

use std::rc::Rc;

use glam::{Mat4, Vec3, Vec4};

use super::{
    Models, OverlayMaterials, PostMaterials, Scene, SceneNodes, Settings, SurfaceMaterials,
};
use crate::error::RenderError;
use crate::geometry::Geometry;
use crate::material::{
    BumpMap, CelParams, DisplacementMap, DotsParams, GroundParams, GroundSurfaces, Material,
    MaterialId, MaterialKind, Materials, PhongParams, PostParams, SkyBoxParams, SurfaceTextures,
    TextureSlots, TexturedPhongParams, VectorsParams, WaveParams, WireframeParams,
};
use crate::mesh::{Mesh, Meshes};
use crate::navigator::{
    Frame, ModelTrackball, NodeRefs, PlaneNavigator, PositionNavigator, RotateYNavigator,
};
use crate::scene_graph::SceneGraph;
use crate::shader::{Program, ProgramLibrary};
use crate::skybox::SkyBox;
use crate::texture::{CubeMap, Texture2d, Textures};

/// Knobs for building the demo scene.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    /// Side length of the procedural textures, in texels.
    pub texture_size: u32,
    /// Segments around the sphere and torus.
    pub tessellation: u32,
    /// Radius of the camera orbit around the model.
    pub camera_distance: f32,
    /// World positions of the lights after the first, which rides on the camera.
    pub extra_lights: Vec<Vec3>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            texture_size: 64,
            tessellation: 32,
            camera_distance: 3.0,
            extra_lights: vec![Vec3::new(-2.0, 2.0, 1.0)],
        }
    }
}

/// Sky used both as background and as environment map.
fn sky_cube() -> CubeMap {
    CubeMap::gradient(
        32,
        Vec4::new(0.2, 0.4, 0.9, 1.0),
        Vec4::new(0.8, 0.85, 0.9, 1.0),
        Vec4::new(0.3, 0.25, 0.2, 1.0),
    )
}

/// Rolling gray height field for bump and displacement maps.
fn hills(size: u32) -> Texture2d {
    let tau = std::f32::consts::TAU;
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let u = x as f32 / size as f32;
            let v = y as f32 / size as f32;
            let h = 0.5 + 0.3 * (tau * 2.0 * u).sin() * (tau * 3.0 * v).cos()
                + 0.2 * (tau * 5.0 * (u + v)).sin();
            let g = (h.clamp(0.0, 1.0) * 255.0) as u8;
            data.extend_from_slice(&[g, g, g, 255]);
        }
    }
    Texture2d::from_rgba(&data, size, size)
}

/// Scales a model to unit size around its center.
fn normalize(geometry: &Geometry) -> Mat4 {
    let bbox = geometry.bbox();
    let extent = bbox.max_extent();
    let scale = if extent > 0.0 { 1.0 / extent } else { 1.0 };
    Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(-bbox.center())
}

fn load(programs: &mut ProgramLibrary, name: &str) -> Result<Program, RenderError> {
    Ok(programs.create_program(
        &format!(":/shaders/{name}.vert"),
        &format!(":/shaders/{name}.frag"),
        None,
    )?)
}

impl Scene {
    /// Builds the demo scene with [`SceneConfig::default`].
    ///
    /// # Example
    ///
    /// ```
    /// use lightpass::Scene;
    ///
    /// let scene = Scene::new()?;
    /// assert_eq!(scene.light_count(), 2);
    /// # Ok::<(), lightpass::RenderError>(())
    /// ```
    pub fn new() -> Result<Self, RenderError> {
        Self::with_config(&SceneConfig::default())
    }

    /// Builds the demo scene.
    ///
    /// # Arguments
    ///
    /// * `config` - Texture resolution, tessellation, camera distance and
    ///   the positions of the lights after the first
    pub fn with_config(config: &SceneConfig) -> Result<Self, RenderError> {
        let mut programs = ProgramLibrary::new();
        let light_count = 1 + config.extra_lights.len();
        let size = config.texture_size.max(1);

        // textures
        let mut textures = Textures::new();
        let sky = textures.add(sky_cube());
        let height = textures.add(hills(size));
        let diffuse = textures.add(Texture2d::checker(
            size,
            8,
            Vec4::new(0.9, 0.9, 0.85, 1.0),
            Vec4::new(0.8, 0.4, 0.1, 1.0),
        ));
        let gloss = textures.add(Texture2d::checker(size, 8, Vec4::ONE, Vec4::splat(0.2)));
        let emissive = textures.add(Texture2d::solid(Vec4::new(0.2, 0.1, 0.0, 1.0)));
        let grass = textures.add(Texture2d::grass(size, 1));
        let gravel = textures.add(Texture2d::gravel(size, 2));
        let sand = textures.add(Texture2d::sand(size, 3));
        let bump = BumpMap {
            enabled: true,
            scale: 0.6,
            debug: false,
            texture: Some(height),
        };
        let displacement = DisplacementMap {
            enabled: true,
            scale: 0.1,
            texture: Some(height),
        };

        // surface materials
        let mut materials = Materials::new();
        let mut surface = |kind: MaterialKind, program: &str| -> Result<MaterialId, RenderError> {
            let program = load(&mut programs, program)?;
            Ok(materials.add(Material::new(program, kind, light_count)))
        };

        let red = Vec3::new(0.8, 0.1, 0.1);
        let blue = Vec3::new(0.1, 0.1, 0.8);
        let green = Vec3::new(0.1, 0.8, 0.1);
        let white = Vec3::splat(0.8);

        let phong = surface(MaterialKind::Phong(PhongParams::colored(red)), "phong")?;
        let toon = surface(
            MaterialKind::Cartoon(CelParams {
                phong: PhongParams::colored(blue),
                shades: 3,
            }),
            "cartoon",
        )?;
        let dots = surface(
            MaterialKind::Dots(DotsParams {
                cel: CelParams {
                    phong: PhongParams::colored(green),
                    shades: 3,
                },
                ..DotsParams::default()
            }),
            "dots",
        )?;
        let wave = surface(
            MaterialKind::Wave(WaveParams {
                height: 0.07,
                ..WaveParams::default()
            }),
            "wave",
        )?;
        let textured = surface(
            MaterialKind::TexturedPhong(TexturedPhongParams {
                phong: PhongParams::colored(white),
                tex: SurfaceTextures {
                    use_diffuse: true,
                    use_emissive: false,
                    use_gloss: true,
                    use_environment: false,
                    diffuse: Some(diffuse),
                    emissive: Some(emissive),
                    gloss: Some(gloss),
                    environment: Some(sky),
                    emissive_scale: 1.0,
                },
                bump,
                displacement: DisplacementMap {
                    enabled: false,
                    ..displacement
                },
                ..TexturedPhongParams::default()
            }),
            "texphong",
        )?;
        let ground = surface(
            MaterialKind::Ground(GroundParams {
                phong: PhongParams::colored(white),
                surfaces: GroundSurfaces {
                    grass: Some(grass),
                    gravel: Some(gravel),
                    sand: Some(sand),
                },
                bump,
                displacement,
                ..GroundParams::default()
            }),
            "ground",
        )?;
        let surfaces = SurfaceMaterials {
            ids: [phong, toon, dots, wave, textured, ground],
            base_colors: [red, blue, green, Vec3::ZERO, white, white],
        };

        // sky, overlays and post filters
        let skybox_program = load(&mut programs, "skybox")?;
        let sky_material = materials.add(Material::new(
            skybox_program,
            MaterialKind::SkyBox(SkyBoxParams {
                cube_map: Some(sky),
                intensity_scale: 1.0,
                slots: TextureSlots::new(8),
            }),
            0,
        ));
        let wireframe = materials.add(Material::new(
            load(&mut programs, "wireframe")?,
            MaterialKind::Wireframe(WireframeParams::default()),
            0,
        ));
        let vectors = materials.add(Material::new(
            load(&mut programs, "vectors")?,
            MaterialKind::Vectors(VectorsParams {
                bump,
                displacement,
                ..VectorsParams::default()
            }),
            0,
        ));
        let overlays = OverlayMaterials { wireframe, vectors };
        let mut filter = |program: &str| -> Result<MaterialId, RenderError> {
            let program = load(&mut programs, program)?;
            Ok(materials.add(Material::new(
                program,
                MaterialKind::Post(PostParams::default()),
                0,
            )))
        };
        let post = PostMaterials {
            passthrough: filter("passthrough")?,
            blur: filter("blur")?,
            gauss_a: filter("gauss_a")?,
            gauss_b: filter("gauss_b")?,
            motion_blur: filter("motion_blur")?,
        };

        // geometry and meshes
        let segments = config.tessellation.max(3);
        let shapes = [
            (Geometry::cube(), textured),
            (Geometry::sphere(segments, segments / 2), phong),
            (Geometry::torus(0.35, 0.15, segments, segments / 2), toon),
            (Geometry::plane(1.0, segments), ground),
        ];
        let mut graph = SceneGraph::new();
        let mut meshes = Meshes::new();
        let mut model_nodes = Vec::with_capacity(shapes.len());
        let mut model_meshes = Vec::with_capacity(shapes.len());
        for (geometry, material) in shapes {
            let transform = normalize(&geometry);
            let mesh = meshes.add(Mesh::new(Rc::new(geometry), material));
            model_nodes.push(graph.create_node(Some(mesh), transform));
            model_meshes.push(mesh);
        }
        let models = Models {
            nodes: [model_nodes[0], model_nodes[1], model_nodes[2], model_nodes[3]],
            meshes: [model_meshes[0], model_meshes[1], model_meshes[2], model_meshes[3]],
        };

        // node tree
        let world = graph.create_named("World", None, Mat4::IDENTITY);
        let scene = graph.create_named("Scene", None, Mat4::IDENTITY);
        let camera = graph.create_named(
            "Camera",
            None,
            Mat4::from_translation(Vec3::new(0.0, 0.0, config.camera_distance)),
        );
        let light0 = graph.create_named("Light0", None, Mat4::from_translation(Vec3::Y));
        graph.add_child(world, scene)?;
        graph.add_child(world, camera)?;
        graph.add_child(camera, light0)?;
        let mut lights = vec![light0];
        for (i, position) in config.extra_lights.iter().enumerate() {
            let light = graph.create_named(
                &format!("Light{}", i + 1),
                None,
                Mat4::from_translation(*position),
            );
            graph.add_child(world, light)?;
            lights.push(light);
        }

        let trackball = ModelTrackball::new(NodeRefs::new(scene, world, camera));
        let mut orbit = RotateYNavigator::new(NodeRefs::new(camera, world, camera));
        orbit.set_distance(&mut graph, config.camera_distance)?;
        let last_light = lights[lights.len() - 1];
        let light_mover =
            PositionNavigator::new(NodeRefs::new(last_light, world, camera), Frame::World);
        let plane = PlaneNavigator::new(NodeRefs::new(camera, world, camera));
        let nodes = SceneNodes {
            world,
            scene,
            camera,
            lights,
        };

        let mut result = Self {
            graph,
            nodes,
            models,
            meshes,
            materials,
            textures,
            surfaces,
            post,
            overlays,
            skybox: SkyBox::new(Rc::new(Geometry::cube()), sky_material),
            settings: Settings::default(),
            trackball,
            orbit,
            light_mover,
            plane,
        };
        result.set_scene_node(result.settings.model)?;

        log::info!(
            "scene ready: {} nodes, {} meshes, {} materials, {} textures, {} programs, {} lights",
            result.graph.len(),
            result.meshes.len(),
            result.materials.len(),
            result.textures.len(),
            programs.len(),
            light_count
        );
        Ok(result)
    }
}
