//! Vertex data and procedural primitives.
//!
//! [`Geometry`] is the immutable vertex/index payload a [`Mesh`](crate::Mesh)
//! points at. It is shared read-only (`Rc<Geometry>`) between meshes that draw
//! the same shape with different materials. Asset loading lives outside this
//! crate: an external loader builds `Geometry` from parsed files with
//! [`Geometry::new`].
//!
//! # Vertex Layout
//!
//! | Attribute | Type       | Offset |
//! |-----------|------------|--------|
//! | position  | `[f32; 3]` | 0      |
//! | normal    | `[f32; 3]` | 12     |
//! | uv        | `[f32; 2]` | 24     |
//! | tangent   | `[f32; 3]` | 32     |
//!
//! Shader locations follow the table order; see [`Vertex3d::LAYOUT`].

use glam::Vec3;

/// A vertex with position, normal, texture coordinates and tangent.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Position in model space.
    pub position: [f32; 3],
    /// Surface normal (normalized).
    pub normal: [f32; 3],
    /// Texture coordinates, `v = 0` is the first texture row.
    pub uv: [f32; 2],
    /// Tangent along increasing `u`, used by bump mapping.
    pub tangent: [f32; 3],
}

impl Vertex3d {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3,
    ];

    /// Per-vertex layout for pipelines drawing triangles or edges.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
    ///     vertex: wgpu::VertexState {
    ///         module: &shader,
    ///         entry_point: Some("vs_main"),
    ///         buffers: &[Vertex3d::LAYOUT],
    ///         ..Default::default()
    ///     },
    ///     // ...
    /// });
    /// ```
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &Self::ATTRIBUTES,
    };

    /// The same attributes stepped once per instance, for drawing one line
    /// per vertex.
    pub const INSTANCE_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &Self::ATTRIBUTES,
    };

    /// Creates a vertex; the tangent is derived from the normal.
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: any_tangent(Vec3::from(normal)).into(),
        }
    }

    /// Creates a vertex with an explicit tangent.
    pub fn with_tangent(mut self, tangent: [f32; 3]) -> Self {
        self.tangent = tangent;
        self
    }
}

fn any_tangent(normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    if n == Vec3::ZERO {
        return Vec3::X;
    }
    let helper = if n.y.abs() < 0.99 { Vec3::Y } else { Vec3::X };
    helper.cross(n).normalize()
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Size along the largest axis.
    pub fn max_extent(&self) -> f32 {
        (self.max - self.min).max_element()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Immutable triangle-list geometry.
#[derive(Clone, Debug)]
pub struct Geometry {
    vertices: Vec<Vertex3d>,
    indices: Vec<u32>,
    bbox: BoundingBox,
}

impl Geometry {
    /// Creates geometry from vertices and triangle-list indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        let bbox = compute_bounds(&vertices);
        Self {
            vertices,
            indices,
            bbox,
        }
    }

    pub fn vertices(&self) -> &[Vertex3d] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Number of triangles in the index list.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Line-list indices of every triangle edge. Edges shared by two
    /// triangles appear once.
    pub fn edge_indices(&self) -> Vec<u32> {
        let mut edges = self
            .indices
            .chunks_exact(3)
            .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect::<Vec<_>>();
        edges.sort_unstable();
        edges.dedup();
        edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
    }

    /// Raw vertex bytes, e.g. for uploading to a GPU buffer.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Unit cube centered at the origin, one quad per face.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal            u axis             v axis
            ([ 0.0,  0.0,  1.0], [ 1.0, 0.0,  0.0], [0.0, -1.0,  0.0]),
            ([ 0.0,  0.0, -1.0], [-1.0, 0.0,  0.0], [0.0, -1.0,  0.0]),
            ([ 0.0,  1.0,  0.0], [ 1.0, 0.0,  0.0], [0.0,  0.0,  1.0]),
            ([ 0.0, -1.0,  0.0], [ 1.0, 0.0,  0.0], [0.0,  0.0, -1.0]),
            ([ 1.0,  0.0,  0.0], [ 0.0, 0.0, -1.0], [0.0, -1.0,  0.0]),
            ([-1.0,  0.0,  0.0], [ 0.0, 0.0,  1.0], [0.0, -1.0,  0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u_axis, v_axis) in faces {
            let n = Vec3::from(normal);
            let u = Vec3::from(u_axis);
            let v = Vec3::from(v_axis);
            let base = vertices.len() as u32;
            for (su, sv) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let p = n * 0.5 + u * (su - 0.5) + v * (sv - 0.5);
                vertices.push(Vertex3d::new(p.into(), normal, [su, sv]).with_tangent(u_axis));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// UV sphere of radius 0.5.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                let tangent = [-theta.sin(), 0.0, theta.cos()];
                vertices.push(
                    Vertex3d::new(
                        [x * 0.5, y * 0.5, z * 0.5],
                        [x, y, z],
                        [seg as f32 / segments as f32, ring as f32 / rings as f32],
                    )
                    .with_tangent(tangent),
                );
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                indices.extend_from_slice(&[current, next, current + 1]);
                indices.extend_from_slice(&[current + 1, next, next + 1]);
            }
        }

        Self::new(vertices, indices)
    }

    /// Torus in the XZ plane.
    pub fn torus(major_radius: f32, minor_radius: f32, segments: u32, sides: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let tau = std::f32::consts::TAU;

        for i in 0..=segments {
            let u = i as f32 / segments as f32;
            let theta = u * tau;
            let ring_dir = Vec3::new(theta.cos(), 0.0, theta.sin());
            for j in 0..=sides {
                let v = j as f32 / sides as f32;
                let phi = v * tau;
                let normal = ring_dir * phi.cos() + Vec3::Y * phi.sin();
                let position = ring_dir * major_radius + normal * minor_radius;
                let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());
                vertices.push(
                    Vertex3d::new(position.into(), normal.into(), [u, v])
                        .with_tangent(tangent.into()),
                );
            }
        }

        for i in 0..segments {
            for j in 0..sides {
                let a = i * (sides + 1) + j;
                let b = a + sides + 1;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self::new(vertices, indices)
    }

    /// Square in the XZ plane facing +Y, subdivided `resolution` times per side.
    pub fn plane(size: f32, resolution: u32) -> Self {
        let resolution = resolution.max(1);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let half = size * 0.5;

        for row in 0..=resolution {
            for col in 0..=resolution {
                let u = col as f32 / resolution as f32;
                let v = row as f32 / resolution as f32;
                let position = [-half + u * size, 0.0, -half + v * size];
                vertices.push(
                    Vertex3d::new(position, [0.0, 1.0, 0.0], [u, v]).with_tangent([1.0, 0.0, 0.0]),
                );
            }
        }

        for row in 0..resolution {
            for col in 0..resolution {
                let a = row * (resolution + 1) + col;
                let b = a + resolution + 1;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self::new(vertices, indices)
    }
}

fn compute_bounds(vertices: &[Vertex3d]) -> BoundingBox {
    if vertices.is_empty() {
        return BoundingBox {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        };
    }
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for v in vertices {
        let p = Vec3::from(v.position);
        min = min.min(p);
        max = max.max(p);
    }
    BoundingBox { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_bounds_are_unit() {
        let cube = Geometry::cube();
        assert_eq!(cube.bbox().min, Vec3::splat(-0.5));
        assert_eq!(cube.bbox().max, Vec3::splat(0.5));
        assert_eq!(cube.triangle_count(), 12);
        assert!((cube.bbox().max_extent() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cube_faces_point_outward() {
        let cube = Geometry::cube();
        for v in cube.vertices() {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!(p.dot(n) > 0.0, "normal {:?} at {:?} points inward", n, p);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = Geometry::sphere(16, 8);
        for v in sphere.vertices() {
            let r = Vec3::from(v.position).length();
            assert!((r - 0.5).abs() < 1e-5);
        }
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);
    }

    #[test]
    fn shared_edges_are_listed_once() {
        let cube = Geometry::cube();
        let edges = cube.edge_indices();
        // faces share no vertices: four sides and a diagonal each
        assert_eq!(edges.len(), 2 * 6 * 5);
        assert_eq!(std::mem::size_of::<Vertex3d>() as u64, Vertex3d::LAYOUT.array_stride);
    }

    #[test]
    fn empty_geometry_has_degenerate_bounds() {
        let g = Geometry::new(Vec::new(), Vec::new());
        assert_eq!(g.bbox().max_extent(), 0.0);
        assert_eq!(g.triangle_count(), 0);
    }
}
