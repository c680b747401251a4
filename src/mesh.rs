//! Drawables: shared geometry paired with a swappable material.
//!
//! A [`Mesh`] does not own its vertex data. Several meshes may point at the
//! same [`Geometry`] through an `Rc` and draw it with different materials,
//! e.g. the same cube once with a toon material and once textured.
//!
//! Meshes live in a [`Meshes`] arena and are referenced from scene-graph nodes
//! by [`MeshId`]. Their GPU buffers are created on first draw and shared the
//! same way the geometry is; see [`GpuMeshes`].
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use lightpass::{Geometry, Mesh, Meshes};
//! use lightpass::material::MaterialId;
//!
//! let cube = Rc::new(Geometry::cube());
//! let mut meshes = Meshes::new();
//! let a = meshes.add(Mesh::new(cube.clone(), MaterialId(0)));
//! let b = meshes.add(Mesh::new(cube, MaterialId(1)));
//! assert_ne!(a, b);
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::error::{MaterialError, RenderError};
use crate::frame::{DrawItem, DrawList, light_pass_state};
use crate::geometry::Geometry;
use crate::gpu::GpuContext;
use crate::material::{MaterialId, Materials};
use crate::scene_graph::DrawMesh;
use crate::shader::{Blend, DepthTest};

/// Type-safe handle to a mesh stored in [`Meshes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// Geometry plus the material it is currently drawn with.
#[derive(Clone, Debug)]
pub struct Mesh {
    geometry: Rc<Geometry>,
    material: MaterialId,
}

impl Mesh {
    /// Pairs shared geometry with a material.
    ///
    /// # Arguments
    ///
    /// * `geometry` - Vertex data, possibly shared with other meshes
    /// * `material` - Handle into the scene's [`Materials`]
    ///
    /// # Example
    ///
    /// ```
    /// use std::rc::Rc;
    /// use lightpass::{Geometry, Mesh};
    /// use lightpass::material::MaterialId;
    ///
    /// let mesh = Mesh::new(Rc::new(Geometry::sphere(16, 8)), MaterialId(2));
    /// assert_eq!(mesh.material(), MaterialId(2));
    /// ```
    pub fn new(geometry: Rc<Geometry>, material: MaterialId) -> Self {
        Self { geometry, material }
    }

    /// The shared geometry. Cloning the `Rc` shares it with another mesh.
    ///
    /// # Example
    ///
    /// ```
    /// use std::rc::Rc;
    /// use lightpass::{Geometry, Mesh};
    /// use lightpass::material::MaterialId;
    ///
    /// let a = Mesh::new(Rc::new(Geometry::cube()), MaterialId(0));
    /// let b = Mesh::new(a.geometry().clone(), MaterialId(1));
    /// assert!(Rc::ptr_eq(a.geometry(), b.geometry()));
    /// ```
    pub fn geometry(&self) -> &Rc<Geometry> {
        &self.geometry
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Draws with `material` from now on. The geometry is untouched.
    pub fn replace_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    /// Binds the material for `light_pass` and queues one draw of the
    /// geometry at `model`, with the depth and blend state of that pass.
    pub fn draw(
        &self,
        list: &mut DrawList,
        materials: &Materials,
        camera: &Camera,
        model: Mat4,
        light_pass: usize,
    ) -> Result<(), MaterialError> {
        let material = materials
            .get(self.material)
            .ok_or(MaterialError::UnknownMaterial(self.material))?;
        let binding = material.apply(light_pass)?;
        let (depth, blend) = light_pass_state(light_pass);
        list.push(DrawItem {
            geometry: self.geometry.clone(),
            binding,
            transforms: camera.transforms(model),
            depth,
            blend,
        });
        Ok(())
    }
}

/// Arena of meshes.
#[derive(Clone, Debug, Default)]
pub struct Meshes {
    meshes: Vec<Mesh>,
}

impl Meshes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Materials drawn over every mesh in the first light pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overlays {
    pub wireframe: Option<MaterialId>,
    pub vectors: Option<MaterialId>,
}

/// Collects scene-graph drawables into a draw list.
pub struct MeshDrawer<'a> {
    pub meshes: &'a Meshes,
    pub materials: &'a Materials,
    pub list: &'a mut DrawList,
    pub overlays: Overlays,
}

impl DrawMesh for MeshDrawer<'_> {
    fn draw_mesh(
        &mut self,
        mesh: MeshId,
        model: Mat4,
        camera: &Camera,
        light_pass: usize,
    ) -> Result<(), RenderError> {
        let mesh = self.meshes.get(mesh).ok_or(RenderError::UnknownMesh(mesh))?;
        mesh.draw(self.list, self.materials, camera, model, light_pass)?;
        if light_pass > 0 {
            return Ok(());
        }
        for overlay in [self.overlays.wireframe, self.overlays.vectors]
            .into_iter()
            .flatten()
        {
            let material = self
                .materials
                .get(overlay)
                .ok_or(MaterialError::UnknownMaterial(overlay))?;
            self.list.push_overlay(DrawItem {
                geometry: mesh.geometry().clone(),
                binding: material.apply(0)?,
                transforms: camera.transforms(model),
                depth: DepthTest::LessEqual,
                blend: Blend::Replace,
            });
        }
        Ok(())
    }
}

/// Vertex, triangle index and edge index buffers of one [`Geometry`].
pub struct GpuMesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) edge_buffer: wgpu::Buffer,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub(crate) edge_count: u32,
}

impl GpuMesh {
    pub fn upload(gpu: &GpuContext, geometry: &Geometry) -> Self {
        let edges = geometry.edge_indices();
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: geometry.vertex_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(geometry.indices()),
                usage: wgpu::BufferUsages::INDEX,
            });
        let edge_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Edge Buffer"),
                contents: bytemuck::cast_slice(&edges),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            edge_buffer,
            vertex_count: geometry.vertices().len() as u32,
            index_count: geometry.indices().len() as u32,
            edge_count: edges.len() as u32,
        }
    }
}

/// GPU buffers per shared geometry, uploaded on first use.
///
/// Keyed by the geometry's address. Each entry keeps an `Rc` to its geometry
/// so the address cannot be reused by another one while the entry lives.
#[derive(Default)]
pub struct GpuMeshes {
    meshes: HashMap<*const Geometry, (Rc<Geometry>, GpuMesh)>,
}

impl GpuMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `geometry` unless it already has buffers.
    pub fn prepare(&mut self, gpu: &GpuContext, geometry: &Rc<Geometry>) {
        self.meshes
            .entry(Rc::as_ptr(geometry))
            .or_insert_with(|| {
                log::debug!(
                    "uploading geometry with {} triangles",
                    geometry.triangle_count()
                );
                (geometry.clone(), GpuMesh::upload(gpu, geometry))
            });
    }

    pub fn get(&self, geometry: &Rc<Geometry>) -> Option<&GpuMesh> {
        self.meshes.get(&Rc::as_ptr(geometry)).map(|(_, mesh)| mesh)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, MaterialKind, PhongParams, WireframeParams};
    use crate::shader::Program;

    fn materials() -> (Materials, MaterialId, MaterialId) {
        let mut materials = Materials::new();
        let phong = materials.add(Material::new(
            Program::Phong,
            MaterialKind::Phong(PhongParams::default()),
            2,
        ));
        let wire = materials.add(Material::new(
            Program::Wireframe,
            MaterialKind::Wireframe(WireframeParams::default()),
            0,
        ));
        (materials, phong, wire)
    }

    #[test]
    fn replacing_material_keeps_geometry_shared() {
        let cube = Rc::new(Geometry::cube());
        let mut mesh = Mesh::new(cube.clone(), MaterialId(0));
        mesh.replace_material(MaterialId(3));
        assert_eq!(mesh.material(), MaterialId(3));
        assert!(Rc::ptr_eq(mesh.geometry(), &cube));
        assert_eq!(Rc::strong_count(&cube), 2);
    }

    #[test]
    fn drawing_with_unknown_material_fails() {
        let mut list = DrawList::new();
        let mesh = Mesh::new(Rc::new(Geometry::cube()), MaterialId(9));
        let err = mesh
            .draw(&mut list, &Materials::new(), &Camera::default(), Mat4::IDENTITY, 0)
            .unwrap_err();
        assert_eq!(err, MaterialError::UnknownMaterial(MaterialId(9)));
        assert!(list.is_empty());
    }

    #[test]
    fn overlays_are_queued_once_per_mesh() {
        let (materials, phong, wire) = materials();
        let mut meshes = Meshes::new();
        let id = meshes.add(Mesh::new(Rc::new(Geometry::cube()), phong));
        let mut list = DrawList::new();
        let mut drawer = MeshDrawer {
            meshes: &meshes,
            materials: &materials,
            list: &mut list,
            overlays: Overlays {
                wireframe: Some(wire),
                vectors: None,
            },
        };
        for pass in 0..2 {
            drawer
                .draw_mesh(id, Mat4::IDENTITY, &Camera::default(), pass)
                .unwrap();
        }

        let items: Vec<_> = list.iter().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].blend, Blend::Additive);
        assert_eq!(items[2].binding.program, Program::Wireframe);
        assert_eq!(items[2].depth, DepthTest::LessEqual);
    }

    #[test]
    fn unknown_mesh_is_reported() {
        let (materials, ..) = materials();
        let meshes = Meshes::new();
        let mut list = DrawList::new();
        let mut drawer = MeshDrawer {
            meshes: &meshes,
            materials: &materials,
            list: &mut list,
            overlays: Overlays::default(),
        };
        let err = drawer
            .draw_mesh(MeshId(4), Mat4::IDENTITY, &Camera::default(), 0)
            .unwrap_err();
        assert_eq!(err, RenderError::UnknownMesh(MeshId(4)));
    }
}
