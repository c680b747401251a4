#![allow(dead_code)]

use image::RgbaImage;
use lightpass::readback::read_texture;
use lightpass::renderer::OffscreenOutput;
use lightpass::{GpuContext, Renderer, RendererConfig, Scene, Vec4};

/// One 8-bit step of a color channel.
pub const STEP: f32 = 1.0 / 255.0;

pub struct Harness {
    pub gpu: GpuContext,
    pub scene: Scene,
    pub renderer: Renderer,
    pub screen: OffscreenOutput,
}

impl Harness {
    /// A scene rendered off-screen, or `None` on machines without any adapter.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let Ok(gpu) = GpuContext::headless() else {
            eprintln!("skipping: no GPU adapter");
            return None;
        };
        let scene = Scene::new().unwrap();
        let renderer = Renderer::new(&gpu, RendererConfig::default(), width, height);
        let screen = OffscreenOutput::new(&gpu, width, height);
        Some(Self {
            gpu,
            scene,
            renderer,
            screen,
        })
    }

    pub fn frame(&mut self) {
        self.renderer
            .draw_at(&self.gpu, &mut self.scene, &self.screen.output(), 0.0)
            .unwrap();
    }

    /// Resizes the output and the renderer's targets, like a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen = OffscreenOutput::new(&self.gpu, width, height);
        self.renderer.resize(width, height);
    }

    /// Contents of the target currently allocated under `label`.
    pub fn buffer(&self, label: &str) -> RgbaImage {
        let (_, _, target) = self
            .renderer
            .targets()
            .live()
            .find(|(_, l, _)| *l == label)
            .unwrap_or_else(|| panic!("no live {} target", label));
        read_texture(&self.gpu, &target.texture).unwrap()
    }

    /// What the last frame presented.
    pub fn screen(&self) -> RgbaImage {
        self.screen.read(&self.gpu).unwrap()
    }
}

pub fn pixel(image: &RgbaImage, x: u32, y: u32) -> Vec4 {
    let [r, g, b, a] = image.get_pixel(x, y).0;
    Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
}

pub fn pixels(image: &RgbaImage) -> Vec<Vec4> {
    image
        .enumerate_pixels()
        .map(|(x, y, _)| pixel(image, x, y))
        .collect()
}

pub fn assert_close(a: Vec4, b: Vec4, tolerance: f32, what: &str) {
    assert!(
        (a - b).abs().max_element() <= tolerance,
        "{}: {:?} vs {:?}",
        what,
        a,
        b
    );
}
