//! # lightpass
//!
//! **Multi-light forward rendering with off-screen post-processing.**
//!
//! A small rendering demo built around a scene graph. Every light gets its own
//! pass over the scene: the first pass lays down depth, the following passes
//! re-draw the same surfaces with an `EQUAL` depth test and add their light
//! on top. The lit frame is rendered into an off-screen target, filtered
//! (box blur, separable Gaussian, motion blur) and presented either whole or
//! split, unfiltered on the left and filtered on the right.
//!
//! Rendering runs on `wgpu`. Each light pass uses its own pipeline state, and
//! the filters are WGSL programs reading the previous target. The whole
//! frame can run headless and be read back, which is how the tests inspect
//! it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lightpass::renderer::OffscreenOutput;
//! use lightpass::{GpuContext, Renderer, RendererConfig, Scene};
//!
//! let gpu = GpuContext::headless()?;
//! let mut scene = Scene::new()?;
//! let mut renderer = Renderer::new(&gpu, RendererConfig::default(), 320, 240);
//! let screen = OffscreenOutput::new(&gpu, 320, 240);
//!
//! renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0)?;
//! screen.read(&gpu)?.save("frame.png")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Or open the interactive window with [`run`].

mod app;
pub mod camera;
pub mod error;
pub mod frame;
mod geometry;
mod gpu;
pub mod input;
pub mod material;
mod mesh;
pub mod navigator;
pub mod readback;
pub mod render_target;
pub mod renderer;
pub mod scene;
mod scene_graph;
pub mod scheduler;
pub mod shader;
pub mod skybox;
pub mod texture;

pub use app::{AppConfig, run};
pub use camera::{Camera, Projection};
pub use error::{MaterialError, RenderError, SceneError, ShaderError};
pub use geometry::{BoundingBox, Geometry, Vertex3d};
pub use gpu::{GpuContext, WindowSurface};
pub use mesh::{GpuMeshes, Mesh, MeshDrawer, MeshId, Meshes, Overlays};
pub use renderer::{BufferSnapshot, FrameOutput, Renderer, RendererConfig};
pub use scene::{Command, Controls, Param, Response, Scene, SceneConfig};
pub use scene_graph::{DrawMesh, SceneGraph};
pub use scheduler::RedrawScheduler;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

pub use hecs::Entity;
