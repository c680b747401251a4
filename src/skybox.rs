//! Background cube drawn around the eye.

use std::rc::Rc;

use glam::Mat4;

use crate::camera::Camera;
use crate::error::MaterialError;
use crate::frame::{DrawItem, DrawList};
use crate::geometry::Geometry;
use crate::material::{MaterialId, Materials};
use crate::shader::{Blend, DepthTest};

/// A cube-mapped sky. The sky is infinitely far away, so it is drawn with
/// the camera's translation removed and without depth testing, before any
/// scene geometry.
#[derive(Clone, Debug)]
pub struct SkyBox {
    cube: Rc<Geometry>,
    material: MaterialId,
}

impl SkyBox {
    pub fn new(cube: Rc<Geometry>, material: MaterialId) -> Self {
        Self { cube, material }
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Queues the sky. It neither tests nor writes depth.
    pub fn draw(
        &self,
        list: &mut DrawList,
        materials: &Materials,
        camera: &Camera,
    ) -> Result<(), MaterialError> {
        let material = materials
            .get(self.material)
            .ok_or(MaterialError::UnknownMaterial(self.material))?;
        list.push(DrawItem {
            geometry: self.cube.clone(),
            binding: material.apply(0)?,
            transforms: camera.without_translation().transforms(Mat4::IDENTITY),
            depth: DepthTest::Disabled,
            blend: Blend::Replace,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::material::{Material, MaterialKind, SkyBoxParams};
    use crate::shader::Program;
    use crate::texture::TextureId;

    #[test]
    fn sky_ignores_camera_position_and_depth() {
        let mut materials = Materials::new();
        let id = materials.add(Material::new(
            Program::SkyBox,
            MaterialKind::SkyBox(SkyBoxParams {
                cube_map: Some(TextureId(0)),
                intensity_scale: 0.5,
                ..SkyBoxParams::default()
            }),
            0,
        ));
        let sky = SkyBox::new(Rc::new(Geometry::cube()), id);

        let far_away = Mat4::from_translation(Vec3::new(100.0, -40.0, 7.0)).inverse();
        let camera = Camera::perspective(far_away, &Default::default(), 1.0);
        let mut list = DrawList::new();
        sky.draw(&mut list, &materials, &camera).unwrap();

        let item = list.iter().next().unwrap();
        assert_eq!(item.depth, DepthTest::Disabled);
        assert_eq!(item.transforms.view[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(item.binding.uniforms.scalars[3], 0.5);
        assert_eq!(item.binding.unit_of(TextureId(0)), Some(0));
    }

    #[test]
    fn unknown_material_queues_nothing() {
        let sky = SkyBox::new(Rc::new(Geometry::cube()), MaterialId(3));
        let mut list = DrawList::new();
        let err = sky
            .draw(&mut list, &Materials::new(), &Camera::default())
            .unwrap_err();
        assert_eq!(err, MaterialError::UnknownMaterial(MaterialId(3)));
        assert!(list.is_empty());
    }
}
