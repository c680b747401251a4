//! Off-screen targets used by the frame pipeline.
//!
//! Targets are created lazily at the current viewport size the first time a
//! frame asks for them. A resize frees every target right away and only
//! records the new size; the next frame allocates each target it uses once.

use glam::UVec2;

use crate::gpu::GpuContext;
use crate::shader::DEPTH_FORMAT;

/// Color format of every off-screen target.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// An allocated color texture, with a depth buffer for the scene target.
///
/// The color texture can be rendered to, sampled by the next stage and
/// copied out for diagnostic exports.
pub struct Target {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: Option<wgpu::TextureView>,
    size: UVec2,
}

impl Target {
    fn new(gpu: &GpuContext, label: &str, size: UVec2, with_depth: bool) -> Self {
        let extent = wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = with_depth.then(|| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Scene Depth Texture"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: DEPTH_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        Self {
            texture,
            view,
            depth,
            size,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }
}

/// One lazily allocated target.
///
/// The target is (re)created by [`ensure_size`](Self::ensure_size) when it is
/// missing or was allocated for a different size.
pub struct RenderTarget {
    label: &'static str,
    with_depth: bool,
    target: Option<Target>,
}

impl RenderTarget {
    pub fn new(label: &'static str, with_depth: bool) -> Self {
        Self {
            label,
            with_depth,
            target: None,
        }
    }

    /// Debug label, also used for diagnostic snapshots.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The allocated target, if any.
    pub fn get(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Allocates the target at `size` unless it already has that size.
    /// Returns whether a texture was created.
    pub fn ensure_size(&mut self, gpu: &GpuContext, size: UVec2) -> bool {
        if self.target.as_ref().is_some_and(|t| t.size == size) {
            return false;
        }
        self.target = Some(Target::new(gpu, self.label, size, self.with_depth));
        log::debug!("allocated {} target at {}x{}", self.label, size.x, size.y);
        true
    }

    /// Frees the target. Returns whether there was one.
    pub fn release(&mut self) -> bool {
        let released = self.target.take().is_some();
        if released {
            log::debug!("released {} target", self.label);
        }
        released
    }
}

/// Which target a pass reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetSlot {
    Scene,
    PostA,
    PostB,
}

/// Targets created and freed since start-up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetStats {
    pub created: usize,
    pub deleted: usize,
}

/// The scene target plus the two post-processing targets.
///
/// `post_b` is only allocated once a two-stage filter chain runs, so
/// single-stage filtering keeps two targets alive and a two-stage chain
/// three.
pub struct RenderTargets {
    size: UVec2,
    scene: RenderTarget,
    post_a: RenderTarget,
    post_b: RenderTarget,
    stats: TargetStats,
}

impl RenderTargets {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width.max(1), height.max(1)),
            scene: RenderTarget::new("scene", true),
            post_a: RenderTarget::new("post A", false),
            post_b: RenderTarget::new("post B", false),
            stats: TargetStats::default(),
        }
    }

    /// Size future allocations use.
    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn stats(&self) -> TargetStats {
        self.stats
    }

    /// Frees every target and records the new viewport size.
    pub fn invalidate(&mut self, width: u32, height: u32) {
        for target in [&mut self.scene, &mut self.post_a, &mut self.post_b] {
            if target.release() {
                self.stats.deleted += 1;
            }
        }
        self.size = UVec2::new(width.max(1), height.max(1));
    }

    /// Makes sure the target in `slot` exists at the current size.
    pub fn ensure(&mut self, gpu: &GpuContext, slot: TargetSlot) {
        let size = self.size;
        let target = self.slot_mut(slot);
        let existed = target.get().is_some();
        if target.ensure_size(gpu, size) {
            self.stats.created += 1;
            if existed {
                self.stats.deleted += 1;
            }
        }
    }

    pub fn get(&self, slot: TargetSlot) -> Option<&Target> {
        match slot {
            TargetSlot::Scene => self.scene.get(),
            TargetSlot::PostA => self.post_a.get(),
            TargetSlot::PostB => self.post_b.get(),
        }
    }

    fn slot_mut(&mut self, slot: TargetSlot) -> &mut RenderTarget {
        match slot {
            TargetSlot::Scene => &mut self.scene,
            TargetSlot::PostA => &mut self.post_a,
            TargetSlot::PostB => &mut self.post_b,
        }
    }

    /// Number of allocated targets.
    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    /// Allocated targets with their labels.
    pub fn live(&self) -> impl Iterator<Item = (TargetSlot, &'static str, &Target)> + '_ {
        [
            (TargetSlot::Scene, &self.scene),
            (TargetSlot::PostA, &self.post_a),
            (TargetSlot::PostB, &self.post_b),
        ]
        .into_iter()
        .filter_map(|(slot, t)| t.get().map(|target| (slot, t.label(), target)))
    }
}
