//! The frame pipeline.
//!
//! One call to [`Renderer::draw_at`] produces one frame:
//!
//! 1. push the animation time and light positions into the materials
//! 2. collect the draw list: optional skybox, then one pass per light.
//!    Pass 0 draws with `LESS` depth and no blending; every later pass
//!    re-draws the same geometry with `EQUAL` depth and additive blending,
//!    so each pixel ends up with the sum of all lights
//! 3. make sure the off-screen targets exist at the current size and that
//!    every mesh and texture the list needs is on the GPU
//! 4. record the scene pass into the scene target
//! 5. filter the scene target: `scene -> A` for single-stage filters,
//!    `scene -> A -> B` for the separable Gaussian
//! 6. present to the output, either the filtered image alone or split with
//!    scissor rectangles, the unfiltered scene on the left half and the
//!    filtered one on the right
//!
//! Every material is applied in steps 1 and 2, so a material error aborts the
//! frame before anything is recorded.
//!
//! Every `export_interval` frames, if the scene asks for it, a copy of each
//! live target is read back and sent to whoever listens on the export
//! channel. Copies are collected without blocking on later frames (or
//! explicitly with [`Renderer::flush_exports`]) and dropped when nobody
//! listens.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::time::Instant;

use glam::{UVec2, Vec4};
use image::RgbaImage;

use crate::camera::{Camera, Projection, Transforms};
use crate::error::{MaterialError, RenderError};
use crate::frame::{DrawList, DrawUniforms};
use crate::geometry::Geometry;
use crate::gpu::GpuContext;
use crate::material::{MaterialBinding, MaterialId, MaterialKind, Materials};
use crate::mesh::{GpuMeshes, MeshDrawer};
use crate::readback::{ImageReadback, read_texture};
use crate::render_target::{RenderTargets, TARGET_FORMAT, TargetSlot};
use crate::scene::Scene;
use crate::shader::{
    Blend, CUBE_BINDING, PipelineKey, Pipelines, SAMPLER_BINDING, Stage, TEXTURE_BINDINGS,
};
use crate::texture::{GpuTexture, TextureId, Textures};

/// Renderer settings.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Frames between diagnostic exports.
    pub export_interval: u64,
    pub projection: Projection,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            export_interval: 20,
            projection: Projection::default(),
        }
    }
}

/// Copy of one off-screen target.
#[derive(Clone, Debug)]
pub struct BufferSnapshot {
    pub slot: TargetSlot,
    pub label: &'static str,
    /// Frame the copy was taken after.
    pub frame: u64,
    pub image: RgbaImage,
}

/// Where a frame ends up: a surface texture or an [`OffscreenOutput`].
pub struct FrameOutput<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub size: UVec2,
}

/// A texture standing in for the window, for tests and headless rendering.
pub struct OffscreenOutput {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl OffscreenOutput {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Output"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn output(&self) -> FrameOutput<'_> {
        FrameOutput {
            view: &self.view,
            format: self.texture.format(),
            size: UVec2::new(self.texture.width(), self.texture.height()),
        }
    }

    /// Copies the presented frame back to the CPU.
    pub fn read(&self, gpu: &GpuContext) -> Result<RgbaImage, RenderError> {
        read_texture(gpu, &self.texture)
    }
}

/// One uniform block per draw in a single buffer, addressed with dynamic
/// offsets.
struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl UniformArena {
    fn new(gpu: &GpuContext, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let size = std::mem::size_of::<DrawUniforms>() as u64;
        let align = u64::from(gpu.device.limits().min_uniform_buffer_offset_alignment);
        let stride = size.div_ceil(align) * align;
        let capacity = capacity.max(1);
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Uploads `uniforms`, growing the buffer when they do not fit.
    fn write(
        &mut self,
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        uniforms: &[DrawUniforms],
    ) {
        if uniforms.len() > self.capacity {
            *self = Self::new(gpu, layout, uniforms.len().next_power_of_two());
        }
        let stride = self.stride as usize;
        let mut bytes = vec![0u8; stride * uniforms.len()];
        for (chunk, block) in bytes.chunks_exact_mut(stride).zip(uniforms) {
            let block = bytemuck::bytes_of(block);
            chunk[..block.len()].copy_from_slice(block);
        }
        if !bytes.is_empty() {
            gpu.queue.write_buffer(&self.buffer, 0, &bytes);
        }
    }

    fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }
}

/// Borrowed pieces a render pass needs to issue draws.
struct Recorder<'a> {
    gpu: &'a GpuContext,
    pipelines: &'a mut Pipelines,
    meshes: &'a GpuMeshes,
    uniforms: &'a UniformArena,
}

impl Recorder<'_> {
    fn draw(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        key: PipelineKey,
        geometry: Option<&Rc<Geometry>>,
        uniform: usize,
        textures: &wgpu::BindGroup,
    ) {
        let stage = key.program.stage();
        let mesh = match stage {
            Stage::Screen => None,
            _ => match geometry.and_then(|g| self.meshes.get(g)) {
                Some(mesh) => Some(mesh),
                None => {
                    log::warn!("{} has no uploaded geometry", key.program.name());
                    return;
                }
            },
        };

        pass.set_pipeline(self.pipelines.get(self.gpu, key));
        pass.set_bind_group(0, &self.uniforms.bind_group, &[self.uniforms.offset(uniform)]);
        pass.set_bind_group(1, textures, &[]);

        let Some(mesh) = mesh else {
            pass.draw(0..3, 0..1);
            return;
        };
        if mesh.vertex_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        match stage {
            Stage::Surface if mesh.index_count > 0 => {
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
            Stage::Edges if mesh.edge_count > 0 => {
                pass.set_index_buffer(mesh.edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.edge_count, 0, 0..1);
            }
            Stage::Vectors => pass.draw(0..2, 0..mesh.vertex_count),
            _ => {}
        }
    }
}

/// Which target an export copies and when.
#[derive(Clone, Copy, Debug)]
struct ExportTag {
    slot: TargetSlot,
    label: &'static str,
    frame: u64,
}

/// A readback waiting for its mapping.
struct PendingExport {
    tag: ExportTag,
    readback: ImageReadback,
}

/// A full-screen draw: its material binding and the texture it reads.
struct ScreenDraw {
    binding: MaterialBinding,
    input: TargetSlot,
    output: TargetSlot,
}

pub struct Renderer {
    config: RendererConfig,
    pipelines: Pipelines,
    meshes: GpuMeshes,
    /// Uploaded scene textures. Ids refer to the textures of the scene the
    /// renderer draws.
    textures: HashMap<TextureId, GpuTexture>,
    white: GpuTexture,
    black_cube: GpuTexture,
    targets: RenderTargets,
    uniforms: UniformArena,
    frame: u64,
    last_tick: Instant,
    /// Animation time of the last frame.
    time: f32,
    exports: Option<Sender<BufferSnapshot>>,
    pending: Vec<PendingExport>,
}

impl Renderer {
    pub fn new(gpu: &GpuContext, config: RendererConfig, width: u32, height: u32) -> Self {
        let pipelines = Pipelines::new(gpu);
        let uniforms = UniformArena::new(gpu, pipelines.uniform_layout(), 64);
        Self {
            config,
            pipelines,
            meshes: GpuMeshes::new(),
            textures: HashMap::new(),
            white: GpuTexture::white(gpu),
            black_cube: GpuTexture::black_cube(gpu),
            targets: RenderTargets::new(width, height),
            uniforms,
            frame: 0,
            last_tick: Instant::now(),
            time: 0.0,
            exports: None,
            pending: Vec::new(),
        }
    }

    /// Sends diagnostic snapshots to `sender` from now on.
    pub fn set_export_sender(&mut self, sender: Sender<BufferSnapshot>) {
        self.exports = Some(sender);
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Pipelines created so far, one per program and pass state.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Frames drawn so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Frees the off-screen targets if the size changed. They are
    /// reallocated once, by the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = UVec2::new(width.max(1), height.max(1));
        if self.targets.size() != size {
            self.targets.invalidate(size.x, size.y);
        }
    }

    /// Draws a frame at the renderer's own clock. The clock stands still
    /// while the scene's animation is off.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        output: &FrameOutput<'_>,
    ) -> Result<(), RenderError> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        let time = if scene.settings.animating {
            self.time + elapsed
        } else {
            self.time
        };
        self.draw_at(gpu, scene, output, time)
    }

    /// Draws a frame at animation time `seconds`.
    pub fn draw_at(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        output: &FrameOutput<'_>,
        seconds: f32,
    ) -> Result<(), RenderError> {
        self.poll_exports(gpu);
        self.time = seconds;
        scene.materials.set_time(seconds);

        let size = self.targets.size();
        let list = collect(scene, &self.config.projection, size)?;

        let (first, second) = scene.post.stages(scene.settings.post);
        let mut filters = vec![ScreenDraw {
            binding: screen_binding(&mut scene.materials, first, size)?,
            input: TargetSlot::Scene,
            output: TargetSlot::PostA,
        }];
        if let Some(second) = second {
            filters.push(ScreenDraw {
                binding: screen_binding(&mut scene.materials, second, size)?,
                input: TargetSlot::PostA,
                output: TargetSlot::PostB,
            });
        }
        let filtered = filters
            .last()
            .map_or(TargetSlot::Scene, |filter| filter.output);
        let present = screen_binding(&mut scene.materials, scene.post.passthrough, size)?;

        for filter in &filters {
            self.targets.ensure(gpu, filter.input);
            self.targets.ensure(gpu, filter.output);
        }
        for item in list.iter() {
            self.meshes.prepare(gpu, &item.geometry);
            self.upload_textures(gpu, &scene.textures, &item.binding)?;
        }

        let mut uniforms: Vec<DrawUniforms> = list.iter().map(|item| item.uniforms()).collect();
        let filter_base = uniforms.len();
        uniforms.extend(filters.iter().map(|f| screen_uniforms(&f.binding)));
        let present_index = uniforms.len();
        uniforms.push(screen_uniforms(&present));
        self.uniforms
            .write(gpu, self.pipelines.uniform_layout(), &uniforms);

        let scene_groups: Vec<wgpu::BindGroup> = list
            .iter()
            .map(|item| self.material_group(gpu, &item.binding))
            .collect();
        let filter_groups = filters
            .iter()
            .map(|f| self.input_group(gpu, f.input))
            .collect::<Result<Vec<_>, _>>()?;
        let present_groups = [
            self.input_group(gpu, TargetSlot::Scene)?,
            self.input_group(gpu, filtered)?,
        ];

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        let Self {
            pipelines,
            meshes,
            targets,
            uniforms: arena,
            ..
        } = &mut *self;
        let mut recorder = Recorder {
            gpu,
            pipelines,
            meshes,
            uniforms: arena,
        };

        let scene_target = targets
            .get(TargetSlot::Scene)
            .ok_or(RenderError::TargetMissing(TargetSlot::Scene))?;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &scene_target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.settings.background)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: scene_target.depth.as_ref().map(|depth| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for (index, (item, group)) in list.iter().zip(&scene_groups).enumerate() {
                let key = PipelineKey {
                    program: item.binding.program,
                    depth: Some(item.depth),
                    blend: item.blend,
                    format: TARGET_FORMAT,
                };
                recorder.draw(&mut pass, key, Some(&item.geometry), index, group);
            }
        }

        for (index, (filter, group)) in filters.iter().zip(&filter_groups).enumerate() {
            let target = targets
                .get(filter.output)
                .ok_or(RenderError::TargetMissing(filter.output))?;
            let mut pass = begin_screen_pass(&mut encoder, "Post Pass", &target.view);
            let key = screen_key(&filter.binding, TARGET_FORMAT);
            recorder.draw(&mut pass, key, None, filter_base + index, group);
        }

        {
            let mut pass = begin_screen_pass(&mut encoder, "Present Pass", output.view);
            let key = screen_key(&present, output.format);
            let (width, height) = (output.size.x, output.size.y);
            if scene.settings.split_display {
                let half = width / 2;
                let halves = [
                    (0, half, &present_groups[0]),
                    (half, width - half, &present_groups[1]),
                ];
                for (x, w, group) in halves {
                    if w == 0 || height == 0 {
                        continue;
                    }
                    pass.set_scissor_rect(x, 0, w, height);
                    recorder.draw(&mut pass, key, None, present_index, group);
                }
            } else {
                recorder.draw(&mut pass, key, None, present_index, &present_groups[1]);
            }
        }

        self.frame += 1;
        let mut exports = Vec::new();
        if scene.settings.fbo_preview && self.frame % self.config.export_interval.max(1) == 0 {
            if self.exports.is_some() {
                for (slot, label, target) in self.targets.live() {
                    exports.push(PendingExport {
                        tag: ExportTag {
                            slot,
                            label,
                            frame: self.frame,
                        },
                        readback: ImageReadback::record(gpu, &mut encoder, &target.texture),
                    });
                }
            } else {
                log::debug!("no listener for buffer export at frame {}", self.frame);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        for mut export in exports {
            export.readback.map();
            self.pending.push(export);
        }
        Ok(())
    }

    /// Sends every export whose copy has reached the CPU, without blocking.
    pub fn poll_exports(&mut self, gpu: &GpuContext) {
        if self.pending.is_empty() {
            return;
        }
        if let Err(e) = gpu.device.poll(wgpu::PollType::Poll) {
            log::warn!("polling the device failed: {}", e);
        }
        let exports = &self.exports;
        self.pending.retain_mut(|export| match export.readback.try_take() {
            None => true,
            Some(result) => {
                deliver(exports.as_ref(), export.tag, result);
                false
            }
        });
    }

    /// Waits for every outstanding export and sends it.
    pub fn flush_exports(&mut self, gpu: &GpuContext) {
        for export in std::mem::take(&mut self.pending) {
            let result = export.readback.wait(gpu);
            deliver(self.exports.as_ref(), export.tag, result);
        }
    }

    fn upload_textures(
        &mut self,
        gpu: &GpuContext,
        textures: &Textures,
        binding: &MaterialBinding,
    ) -> Result<(), RenderError> {
        for bound in binding.textures.iter().flatten() {
            if self.textures.contains_key(&bound.texture) {
                continue;
            }
            let image = textures
                .get(bound.texture)
                .ok_or(RenderError::UnknownTexture(bound.texture))?;
            let label = format!("Scene Texture {}", bound.texture.0);
            self.textures
                .insert(bound.texture, GpuTexture::upload(gpu, image, &label));
        }
        Ok(())
    }

    /// Group 1 for a material: its textures at their slots, defaults elsewhere.
    fn material_group(&self, gpu: &GpuContext, binding: &MaterialBinding) -> wgpu::BindGroup {
        let mut flat = [&self.white.view; TEXTURE_BINDINGS as usize];
        let mut cube = &self.black_cube.view;
        for (slot, bound) in binding.textures.iter().enumerate() {
            let Some(texture) = bound.and_then(|b| self.textures.get(&b.texture)) else {
                continue;
            };
            if texture.is_cube {
                cube = &texture.view;
            } else if let Some(view) = flat.get_mut(slot) {
                *view = &texture.view;
            }
        }
        self.texture_group(gpu, flat, cube)
    }

    /// Group 1 for a full-screen pass reading `slot` at unit 0.
    fn input_group(
        &self,
        gpu: &GpuContext,
        slot: TargetSlot,
    ) -> Result<wgpu::BindGroup, RenderError> {
        let input = self
            .targets
            .get(slot)
            .ok_or(RenderError::TargetMissing(slot))?;
        let mut flat = [&self.white.view; TEXTURE_BINDINGS as usize];
        flat[0] = &input.view;
        Ok(self.texture_group(gpu, flat, &self.black_cube.view))
    }

    fn texture_group(
        &self,
        gpu: &GpuContext,
        flat: [&wgpu::TextureView; TEXTURE_BINDINGS as usize],
        cube: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = flat
            .iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: CUBE_BINDING,
            resource: wgpu::BindingResource::TextureView(cube),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: SAMPLER_BINDING,
            resource: wgpu::BindingResource::Sampler(self.pipelines.sampler()),
        });
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: self.pipelines.texture_layout(),
            entries: &entries,
        })
    }
}

/// Camera, light positions and every draw of the scene pass.
fn collect(
    scene: &mut Scene,
    projection: &Projection,
    size: UVec2,
) -> Result<DrawList, RenderError> {
    let aspect = size.x as f32 / size.y.max(1) as f32;
    let camera = Camera::from_scene(
        &scene.graph,
        scene.nodes.world,
        scene.nodes.camera,
        projection,
        aspect,
    )?;
    for (pass, position) in scene.light_positions()?.into_iter().enumerate() {
        scene.materials.set_light_position(pass, position);
    }

    let mut list = DrawList::new();
    if scene.settings.skybox {
        scene.skybox.draw(&mut list, &scene.materials, &camera)?;
    }
    let overlays = scene.active_overlays();
    for pass in 0..scene.light_count() {
        let mut drawer = MeshDrawer {
            meshes: &scene.meshes,
            materials: &scene.materials,
            list: &mut list,
            overlays,
        };
        scene
            .graph
            .draw(scene.nodes.world, &camera, pass, &mut drawer)?;
    }
    Ok(list)
}

/// Applies the post material `id` for an image of `size`.
fn screen_binding(
    materials: &mut Materials,
    id: MaterialId,
    size: UVec2,
) -> Result<MaterialBinding, MaterialError> {
    let material = materials
        .get_mut(id)
        .ok_or(MaterialError::UnknownMaterial(id))?;
    if let MaterialKind::Post(params) = &mut material.kind {
        params.image_size = size;
    }
    material.apply(0)
}

fn screen_uniforms(binding: &MaterialBinding) -> DrawUniforms {
    DrawUniforms {
        transforms: Transforms::default(),
        material: binding.uniforms,
    }
}

fn screen_key(binding: &MaterialBinding, format: wgpu::TextureFormat) -> PipelineKey {
    PipelineKey {
        program: binding.program,
        depth: None,
        blend: Blend::Replace,
        format,
    }
}

fn begin_screen_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

fn clear_color(color: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}

fn deliver(
    sender: Option<&Sender<BufferSnapshot>>,
    tag: ExportTag,
    result: Result<RgbaImage, RenderError>,
) {
    let image = match result {
        Ok(image) => image,
        Err(e) => {
            log::warn!("dropping {} export: {}", tag.label, e);
            return;
        }
    };
    let Some(sender) = sender else {
        return;
    };
    let snapshot = BufferSnapshot {
        slot: tag.slot,
        label: tag.label,
        frame: tag.frame,
        image,
    };
    if sender.send(snapshot).is_err() {
        log::debug!("buffer export listener is gone, dropping {}", tag.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Param, PostChain};
    use std::sync::mpsc;

    fn setup(width: u32, height: u32) -> Option<(GpuContext, Scene, Renderer, OffscreenOutput)> {
        let Ok(gpu) = GpuContext::headless() else {
            eprintln!("skipping: no GPU adapter");
            return None;
        };
        let scene = Scene::new().unwrap();
        let renderer = Renderer::new(&gpu, RendererConfig::default(), width, height);
        let screen = OffscreenOutput::new(&gpu, width, height);
        Some((gpu, scene, renderer, screen))
    }

    #[test]
    fn single_stage_filters_use_two_targets() {
        let Some((gpu, mut scene, mut renderer, screen)) = setup(16, 12) else { return };
        scene.apply_param(Param::PostFilter(PostChain::Blur)).unwrap();
        renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();
        assert_eq!(renderer.targets().live_count(), 2);

        scene.apply_param(Param::PostFilter(PostChain::Gauss)).unwrap();
        renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();
        assert_eq!(renderer.targets().live_count(), 3);
        assert_eq!(renderer.targets().stats().created, 3);
        assert_eq!(renderer.frame_count(), 2);
    }

    #[test]
    fn pipelines_are_reused_across_frames() {
        let Some((gpu, mut scene, mut renderer, screen)) = setup(8, 8) else { return };
        renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();
        let count = renderer.pipeline_count();
        assert!(count > 0);
        renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.5).unwrap();
        assert_eq!(renderer.pipeline_count(), count);
    }

    #[test]
    fn exports_every_interval_when_enabled() {
        let Some((gpu, mut scene, mut renderer, screen)) = setup(8, 8) else { return };
        let (tx, rx) = mpsc::channel();
        renderer.set_export_sender(tx);
        for _ in 0..40 {
            renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();
        }
        renderer.flush_exports(&gpu);
        assert!(rx.try_recv().is_err());

        scene.apply_param(Param::FboPreview(true)).unwrap();
        for _ in 0..40 {
            renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();
        }
        renderer.flush_exports(&gpu);
        let snapshots: Vec<_> = rx.try_iter().collect();
        // frames 60 and 80, three targets each
        assert_eq!(snapshots.len(), 6);
        assert!(snapshots.iter().all(|s| s.frame % 20 == 0));
        let first = snapshots.iter().find(|s| s.frame == 60).unwrap();
        assert_eq!(first.label, "scene");
        assert_eq!(first.slot, TargetSlot::Scene);
        assert_eq!(first.image.dimensions(), (8, 8));
    }

    #[test]
    fn dropped_listener_does_not_fail_the_frame() {
        let Some((gpu, mut scene, mut renderer, screen)) = setup(4, 4) else { return };
        let (tx, rx) = mpsc::channel();
        renderer.set_export_sender(tx);
        drop(rx);
        scene.apply_param(Param::FboPreview(true)).unwrap();
        for _ in 0..20 {
            renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();
        }
        renderer.flush_exports(&gpu);
        assert_eq!(renderer.frame_count(), 20);
    }

    #[test]
    fn background_reaches_the_screen() {
        let Some((gpu, mut scene, mut renderer, screen)) = setup(8, 8) else { return };
        scene.apply_param(Param::Background(glam::Vec3::new(0.0, 1.0, 0.0))).unwrap();
        // nothing in view
        scene.graph.clear_children(scene.nodes.scene).unwrap();
        scene.apply_param(Param::PostFilter(PostChain::Passthrough)).unwrap();
        renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();

        let image = screen.read(&gpu).unwrap();
        for (x, y) in [(0, 0), (7, 7), (3, 5)] {
            assert_eq!(image.get_pixel(x, y).0, [0, 255, 0, 255]);
        }
    }

    #[test]
    fn huge_gaussian_kernel_still_renders() {
        let Some((gpu, mut scene, mut renderer, screen)) = setup(4, 4) else { return };
        scene.apply_param(Param::Background(glam::Vec3::new(1.0, 0.0, 0.0))).unwrap();
        scene.graph.clear_children(scene.nodes.scene).unwrap();
        scene.apply_param(Param::PostFilter(PostChain::Gauss)).unwrap();
        scene.apply_param(Param::KernelSize(100_000)).unwrap();
        renderer.draw_at(&gpu, &mut scene, &screen.output(), 0.0).unwrap();

        // a uniform image stays uniform under any normalized blur
        let image = screen.read(&gpu).unwrap();
        for pixel in image.pixels() {
            assert!(pixel.0[0] >= 254, "{:?}", pixel);
            assert_eq!(pixel.0[1], 0);
        }
    }

    #[test]
    fn resize_reallocates_on_the_next_frame() {
        let Some((gpu, mut scene, mut renderer, _)) = setup(8, 8) else { return };
        let small = OffscreenOutput::new(&gpu, 8, 8);
        renderer.draw_at(&gpu, &mut scene, &small.output(), 0.0).unwrap();
        renderer.resize(6, 4);
        assert_eq!(renderer.targets().live_count(), 0);
        renderer.resize(6, 4);

        let resized = OffscreenOutput::new(&gpu, 6, 4);
        renderer.draw_at(&gpu, &mut scene, &resized.output(), 0.0).unwrap();
        let scene_target = renderer.targets().get(TargetSlot::Scene).unwrap();
        assert_eq!(scene_target.size(), UVec2::new(6, 4));
        assert_eq!(renderer.targets().stats().deleted, 2);
    }
}
