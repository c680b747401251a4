//! View + projection value type.
//!
//! A [`Camera`] is rebuilt for every viewport from the camera node's place in
//! the scene graph and the viewport's aspect ratio. It has no identity and no
//! mutable state beyond the two matrices.

use glam::{Mat3, Mat4};
use hecs::Entity;

use crate::error::SceneError;
use crate::scene_graph::SceneGraph;

/// Matrices of one draw, laid out like `struct Transforms` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Transforms {
    /// Object to world.
    pub model: [[f32; 4]; 4],
    /// World to eye.
    pub view: [[f32; 4]; 4],
    /// Eye to clip, with depth in `[0, 1]`.
    pub projection: [[f32; 4]; 4],
    /// Inverse transpose of model-view, for normals in eye coordinates.
    pub normal: [[f32; 4]; 4],
}

/// Perspective projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_deg: 30.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

/// A `(view, projection)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Perspective camera with depth mapped to `[0, 1]`.
    pub fn perspective(view: Mat4, projection: &Projection, aspect: f32) -> Self {
        Self {
            view,
            projection: Mat4::perspective_rh(
                projection.fov_deg.to_radians(),
                aspect,
                projection.near,
                projection.far,
            ),
        }
    }

    /// Camera looking through `camera` node: the view matrix is the inverse of
    /// the camera's transform into `world`.
    pub fn from_scene(
        graph: &SceneGraph,
        world: Entity,
        camera: Entity,
        projection: &Projection,
        aspect: f32,
    ) -> Result<Self, SceneError> {
        let cam_to_world = graph.to_parent_transform(world, camera)?;
        Ok(Self::perspective(cam_to_world.inverse(), projection, aspect))
    }

    /// Same camera with the translation removed from the view, as if the eye
    /// sat at the world origin. Used for objects at infinity.
    pub fn without_translation(&self) -> Self {
        let mut view = self.view;
        view.w_axis = glam::Vec4::W;
        Self {
            view,
            projection: self.projection,
        }
    }

    /// Matrices for drawing an object placed at `model`.
    pub fn transforms(&self, model: Mat4) -> Transforms {
        let model_view = self.view * model;
        let normal = Mat3::from_mat4(model_view).inverse().transpose();
        Transforms {
            model: model.to_cols_array_2d(),
            view: self.view.to_cols_array_2d(),
            projection: self.projection.to_cols_array_2d(),
            normal: Mat4::from_mat3(normal).to_cols_array_2d(),
        }
    }
}
