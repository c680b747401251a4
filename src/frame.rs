//! What one frame draws, collected before any GPU work is recorded.
//!
//! Traversing the scene graph produces a [`DrawList`]: one [`DrawItem`] per
//! drawable and light pass, each holding the material binding, the matrices
//! and the depth/blend state of its pass. Collecting first means a material
//! error aborts the frame while the command encoder is still empty.

use std::rc::Rc;

use crate::camera::Transforms;
use crate::geometry::Geometry;
use crate::material::{MaterialBinding, MaterialUniforms};
use crate::shader::{Blend, DepthTest};

/// Everything a program reads from group 0, laid out like `struct Draw`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub transforms: Transforms,
    pub material: MaterialUniforms,
}

/// Depth test and blending of light pass `pass`.
///
/// The first pass lays down depth; every later one re-draws the same
/// surfaces where depth matches exactly and adds its light on top.
pub fn light_pass_state(pass: usize) -> (DepthTest, Blend) {
    if pass == 0 {
        (DepthTest::Less, Blend::Replace)
    } else {
        (DepthTest::Equal, Blend::Additive)
    }
}

/// One draw call of the scene pass.
#[derive(Clone, Debug)]
pub struct DrawItem {
    pub geometry: Rc<Geometry>,
    pub binding: MaterialBinding,
    pub transforms: Transforms,
    pub depth: DepthTest,
    pub blend: Blend,
}

impl DrawItem {
    pub fn uniforms(&self) -> DrawUniforms {
        DrawUniforms {
            transforms: self.transforms,
            material: self.binding.uniforms,
        }
    }
}

/// Draws of the scene pass in submission order.
///
/// Overlays are collected during the first light pass but drawn after all
/// of them, so the additive passes never brighten overlay lines.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
    overlays: Vec<DrawItem>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    pub fn push_overlay(&mut self, item: DrawItem) {
        self.overlays.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len() + self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draws first, then overlays.
    pub fn iter(&self) -> impl Iterator<Item = &DrawItem> {
        self.items.iter().chain(self.overlays.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::Program;

    fn item(program: Program, pass: usize) -> DrawItem {
        let (depth, blend) = light_pass_state(pass);
        DrawItem {
            geometry: Rc::new(Geometry::cube()),
            binding: MaterialBinding::new(program),
            transforms: Transforms::default(),
            depth,
            blend,
        }
    }

    #[test]
    fn first_pass_replaces_later_passes_add() {
        assert_eq!(light_pass_state(0), (DepthTest::Less, Blend::Replace));
        for pass in 1..4 {
            assert_eq!(light_pass_state(pass), (DepthTest::Equal, Blend::Additive));
        }
    }

    #[test]
    fn overlays_come_after_every_light_pass() {
        let mut list = DrawList::new();
        list.push(item(Program::Phong, 0));
        list.push_overlay(item(Program::Wireframe, 0));
        list.push(item(Program::Phong, 1));
        let order: Vec<_> = list.iter().map(|i| i.binding.program).collect();
        assert_eq!(order, [Program::Phong, Program::Phong, Program::Wireframe]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn draw_block_matches_the_shader_layout() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 256 + 13 * 16);
    }
}
