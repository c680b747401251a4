//! The material block every program reads from the per-draw uniform buffer.
//!
//! Field order and packing mirror `struct Material` in `common.wgsl`. Every
//! member is a 16-byte vector so the Rust and WGSL layouts agree without
//! padding.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use super::lit::PhongParams;

pub const USE_DIFFUSE: u32 = 1 << 0;
pub const USE_EMISSIVE: u32 = 1 << 1;
pub const USE_GLOSS: u32 = 1 << 2;
pub const USE_ENVIRONMENT: u32 = 1 << 3;
pub const USE_BUMP: u32 = 1 << 4;
pub const BUMP_DEBUG: u32 = 1 << 5;
pub const USE_DISPLACEMENT: u32 = 1 << 6;
pub const USE_JITTER: u32 = 1 << 7;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub k_ambient: [f32; 4],
    pub k_diffuse: [f32; 4],
    /// w: shininess
    pub k_specular: [f32; 4],
    /// Homogeneous world position of the pass's light.
    pub light_position: [f32; 4],
    pub light_intensity: [f32; 4],
    pub ambient_light: [f32; 4],
    /// w: refraction ratio
    pub k_mirror: [f32; 4],
    /// w: emissive scale
    pub k_refract: [f32; 4],
    /// Dot, vector or wireframe color.
    pub color: [f32; 4],
    /// time, bump scale, displacement scale, intensity scale
    pub scalars: [f32; 4],
    /// Variant specific: dots (frequency, radius), wave (depth, speed,
    /// height), ground (translation), vectors (length).
    pub shape: [f32; 4],
    /// light pass, feature bits, shades, vector kind
    pub flags: [u32; 4],
    /// image width, image height, kernel width, kernel height
    pub sizes: [u32; 4],
}

impl MaterialUniforms {
    pub fn light_pass(&self) -> u32 {
        self.flags[0]
    }

    pub fn features(&self) -> u32 {
        self.flags[1]
    }

    pub fn has(&self, feature: u32) -> bool {
        self.flags[1] & feature != 0
    }

    pub(crate) fn enable(&mut self, feature: u32, on: bool) {
        if on {
            self.flags[1] |= feature;
        }
    }

    pub(crate) fn set_phong(&mut self, phong: &PhongParams) {
        self.k_ambient = vec3(phong.k_ambient);
        self.k_diffuse = vec3(phong.k_diffuse);
        self.k_specular = phong.k_specular.extend(phong.shininess).to_array();
    }

    pub(crate) fn set_color(&mut self, color: Vec3) {
        self.color = Vec4::from((color, 1.0)).to_array();
    }
}

fn vec3(v: Vec3) -> [f32; 4] {
    v.extend(0.0).to_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_thirteen_vectors() {
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 13 * 16);
    }

    #[test]
    fn phong_packs_shininess_into_specular() {
        let mut u = MaterialUniforms::default();
        u.set_phong(&PhongParams::default());
        assert_eq!(u.k_specular, [0.8, 0.8, 0.8, 80.0]);
        assert_eq!(u.k_diffuse[3], 0.0);

        u.enable(USE_BUMP, true);
        u.enable(USE_GLOSS, false);
        assert!(u.has(USE_BUMP));
        assert!(!u.has(USE_GLOSS));
        assert_eq!(u.features(), USE_BUMP);
    }
}
