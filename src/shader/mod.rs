//! Built-in WGSL programs and their resolution from source identifiers.
//!
//! Programs are requested the way a GL application loads shader files: by a
//! vertex and a fragment source identifier, optionally a geometry one. The
//! [`ProgramLibrary`] maps identifiers such as `":/shaders/phong.vert"` to
//! the built-in [`Program`]s below.
//!
//! | Program       | Stage      | Used by                 |
//! |---------------|------------|-------------------------|
//! | `phong`       | surface    | Phong                   |
//! | `texphong`    | surface    | textured Phong          |
//! | `cartoon`     | surface    | cel shading             |
//! | `dots`        | surface    | dots                    |
//! | `ground`      | surface    | ground                  |
//! | `wave`        | surface    | wave                    |
//! | `skybox`      | surface    | skybox                  |
//! | `wireframe`   | edges      | wireframe overlay       |
//! | `vectors`     | vectors    | normal/tangent overlay  |
//! | `passthrough` | screen     | presentation            |
//! | `blur`        | screen     | box blur                |
//! | `gauss_a`     | screen     | Gaussian, horizontal    |
//! | `gauss_b`     | screen     | Gaussian, vertical      |
//! | `motion_blur` | screen     | directional blur        |
//!
//! Unknown identifiers and mismatched stage pairs are [`ShaderError`]s. The
//! same program requested twice is linked once and shared.

mod pipeline;

pub use pipeline::{
    Blend, CUBE_BINDING, DEPTH_FORMAT, DepthTest, PipelineKey, Pipelines, SAMPLER_BINDING,
    TEXTURE_BINDINGS,
};

use std::collections::HashMap;

use crate::error::ShaderError;

const COMMON: &str = include_str!("common.wgsl");
const LIGHTING: &str = include_str!("lighting.wgsl");
const SCREEN: &str = include_str!("screen.wgsl");

/// How a program consumes geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Indexed triangles of a mesh.
    Surface,
    /// The mesh's edges as a line list.
    Edges,
    /// One line per mesh vertex, drawn instanced.
    Vectors,
    /// A full-screen triangle without vertex buffers.
    Screen,
}

/// A built-in shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Program {
    Phong,
    TexturedPhong,
    Cartoon,
    Dots,
    Ground,
    Wave,
    SkyBox,
    Wireframe,
    Vectors,
    Passthrough,
    Blur,
    GaussA,
    GaussB,
    MotionBlur,
}

impl Program {
    pub const ALL: [Program; 14] = [
        Program::Phong,
        Program::TexturedPhong,
        Program::Cartoon,
        Program::Dots,
        Program::Ground,
        Program::Wave,
        Program::SkyBox,
        Program::Wireframe,
        Program::Vectors,
        Program::Passthrough,
        Program::Blur,
        Program::GaussA,
        Program::GaussB,
        Program::MotionBlur,
    ];

    /// Name used in source identifiers (`name.vert`, `name.frag`).
    pub fn name(self) -> &'static str {
        match self {
            Program::Phong => "phong",
            Program::TexturedPhong => "texphong",
            Program::Cartoon => "cartoon",
            Program::Dots => "dots",
            Program::Ground => "ground",
            Program::Wave => "wave",
            Program::SkyBox => "skybox",
            Program::Wireframe => "wireframe",
            Program::Vectors => "vectors",
            Program::Passthrough => "passthrough",
            Program::Blur => "blur",
            Program::GaussA => "gauss_a",
            Program::GaussB => "gauss_b",
            Program::MotionBlur => "motion_blur",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn stage(self) -> Stage {
        match self {
            Program::Wireframe => Stage::Edges,
            Program::Vectors => Stage::Vectors,
            Program::Passthrough
            | Program::Blur
            | Program::GaussA
            | Program::GaussB
            | Program::MotionBlur => Stage::Screen,
            _ => Stage::Surface,
        }
    }

    /// Complete WGSL module: the shared declarations plus the program body.
    pub fn source(self) -> String {
        let body = match self {
            Program::Phong => include_str!("phong.wgsl"),
            Program::TexturedPhong => include_str!("texphong.wgsl"),
            Program::Cartoon => include_str!("cartoon.wgsl"),
            Program::Dots => include_str!("dots.wgsl"),
            Program::Ground => include_str!("ground.wgsl"),
            Program::Wave => include_str!("wave.wgsl"),
            Program::SkyBox => include_str!("skybox.wgsl"),
            Program::Wireframe => include_str!("wireframe.wgsl"),
            Program::Vectors => include_str!("vectors.wgsl"),
            Program::Passthrough => include_str!("passthrough.wgsl"),
            Program::Blur => include_str!("blur.wgsl"),
            Program::GaussA => include_str!("gauss_a.wgsl"),
            Program::GaussB => include_str!("gauss_b.wgsl"),
            Program::MotionBlur => include_str!("motion_blur.wgsl"),
        };
        let middle = match self.stage() {
            Stage::Screen => SCREEN,
            _ => LIGHTING,
        };
        format!("{COMMON}\n{middle}\n{body}")
    }
}

/// Resolves shader source identifiers to programs.
#[derive(Debug, Default)]
pub struct ProgramLibrary {
    linked: HashMap<String, Program>,
}

impl ProgramLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the program made of `vertex` and `fragment` (and `geometry`,
    /// if given), or returns the already linked one.
    ///
    /// # Arguments
    ///
    /// * `vertex` - Identifier ending in `.vert`, e.g. `":/shaders/phong.vert"`
    /// * `fragment` - Identifier ending in `.frag` naming the same program
    /// * `geometry` - Identifier ending in `.geom`; no built-in program has one
    ///
    /// # Example
    ///
    /// ```
    /// use lightpass::shader::{Program, ProgramLibrary};
    ///
    /// let mut programs = ProgramLibrary::new();
    /// let phong = programs.create_program(":/shaders/phong.vert", ":/shaders/phong.frag", None)?;
    /// assert_eq!(phong, Program::Phong);
    /// # Ok::<(), lightpass::ShaderError>(())
    /// ```
    pub fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
        geometry: Option<&str>,
    ) -> Result<Program, ShaderError> {
        let vs = stage_name(vertex, "vert")?;
        let fs = stage_name(fragment, "frag")?;
        if let Some(geometry) = geometry {
            stage_name(geometry, "geom")?;
            return Err(ShaderError::UnknownSource(geometry.to_string()));
        }
        if vs != fs {
            return Err(ShaderError::StageMismatch {
                vertex: vertex.to_string(),
                fragment: fragment.to_string(),
            });
        }
        if let Some(&program) = self.linked.get(vs) {
            return Ok(program);
        }
        let program =
            Program::from_name(vs).ok_or_else(|| ShaderError::UnknownSource(vertex.to_string()))?;
        log::debug!("linked program '{}'", vs);
        self.linked.insert(vs.to_string(), program);
        Ok(program)
    }

    /// Shorthand for `name.vert` + `name.frag`.
    pub fn program(&mut self, name: &str) -> Result<Program, ShaderError> {
        self.create_program(&format!("{name}.vert"), &format!("{name}.frag"), None)
    }

    /// Number of linked programs.
    pub fn len(&self) -> usize {
        self.linked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linked.is_empty()
    }
}

/// Program name of a source identifier with the given stage extension.
fn stage_name<'a>(source: &'a str, extension: &str) -> Result<&'a str, ShaderError> {
    let file = source.rsplit('/').next().unwrap_or(source);
    match file.rsplit_once('.') {
        Some((stem, ext)) if ext == extension && !stem.is_empty() => Ok(stem),
        _ => Err(ShaderError::UnknownSource(source.to_string())),
    }
}

/// Normalized 1D Gaussian taps for a kernel of `size` texels.
///
/// The kernel has `2 * (size / 2) + 1` taps centered on the middle one, with
/// sigma of half the radius (at least 0.5). This is the kernel the
/// `gauss_a` and `gauss_b` programs evaluate per fragment.
pub fn gaussian_weights(size: u32) -> Vec<f32> {
    let radius = size / 2;
    let sigma = (radius as f32 * 0.5).max(0.5);
    let mut weights: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_pairs_once() {
        let mut lib = ProgramLibrary::new();
        let a = lib
            .create_program(":/shaders/phong.vert", ":/shaders/phong.frag", None)
            .unwrap();
        let b = lib.program("phong").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name(), "phong");
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn unknown_sources_fail() {
        let mut lib = ProgramLibrary::new();
        assert_eq!(
            lib.create_program("toon.vert", "toon.frag", None),
            Err(ShaderError::UnknownSource("toon.vert".into()))
        );
        assert_eq!(
            lib.create_program("phong.frag", "phong.frag", None),
            Err(ShaderError::UnknownSource("phong.frag".into()))
        );
        assert_eq!(
            lib.create_program("phong.vert", "phong.frag", Some("phong.geom")),
            Err(ShaderError::UnknownSource("phong.geom".into()))
        );
    }

    #[test]
    fn mismatched_stages_fail_to_link() {
        let mut lib = ProgramLibrary::new();
        assert!(matches!(
            lib.create_program("phong.vert", "dots.frag", None),
            Err(ShaderError::StageMismatch { .. })
        ));
        assert!(lib.is_empty());
    }

    #[test]
    fn every_program_has_entry_points() {
        for program in Program::ALL {
            let source = program.source();
            assert!(source.contains("fn vs_main"), "{}", program.name());
            assert!(source.contains("fn fs_main"), "{}", program.name());
            assert_eq!(Program::from_name(program.name()), Some(program));
        }
    }

    #[test]
    fn gaussian_weights_are_normalized_and_symmetric() {
        for size in [1, 3, 5, 9] {
            let w = gaussian_weights(size);
            assert_eq!(w.len(), (2 * (size / 2) + 1) as usize);
            assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            for i in 0..w.len() / 2 {
                assert_eq!(w[i], w[w.len() - 1 - i]);
            }
        }
        assert_eq!(gaussian_weights(1), vec![1.0]);
    }

    #[test]
    fn huge_kernels_stay_finite() {
        let w = gaussian_weights(100_000);
        assert_eq!(w.len(), 100_001);
        assert!(w.iter().all(|w| w.is_finite() && *w > 0.0));
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-3);
        assert!(w[50_000] > w[0]);
    }
}
