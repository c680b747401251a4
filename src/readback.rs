//! Copying textures back to the CPU.
//!
//! A copy is recorded into the frame's encoder with
//! [`ImageReadback::record`], mapped after the frame is submitted with
//! [`ImageReadback::map`], and collected either without blocking
//! ([`ImageReadback::try_take`]) or by waiting for the GPU
//! ([`ImageReadback::wait`]).

use std::sync::mpsc;

use image::RgbaImage;

use crate::error::RenderError;
use crate::gpu::GpuContext;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a copy, padded to the alignment buffer copies require.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// One texture copy on its way to the CPU.
pub struct ImageReadback {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
    swap_red_blue: bool,
    mapped: Option<mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>>,
}

impl ImageReadback {
    /// Records a copy of the whole `texture` into a new staging buffer.
    ///
    /// `texture` must be a 4-byte RGBA or BGRA color texture created with
    /// `COPY_SRC`.
    pub fn record(
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
    ) -> Self {
        let (width, height) = (texture.width(), texture.height());
        let padded_row = padded_bytes_per_row(width);
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let swap_red_blue = matches!(
            texture.format(),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        Self {
            buffer,
            width,
            height,
            padded_row,
            swap_red_blue,
            mapped: None,
        }
    }

    /// Requests the mapping. Call after the encoder holding the copy was
    /// submitted.
    pub fn map(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        self.mapped = Some(rx);
    }

    /// The image if the mapping has completed, without blocking.
    pub fn try_take(&mut self) -> Option<Result<RgbaImage, RenderError>> {
        let result = self.mapped.as_ref()?.try_recv().ok()?;
        Some(self.finish(result))
    }

    /// Blocks until the copy has reached the CPU.
    pub fn wait(mut self, gpu: &GpuContext) -> Result<RgbaImage, RenderError> {
        if self.mapped.is_none() {
            self.map();
        }
        gpu.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        let result = self
            .mapped
            .as_ref()
            .ok_or_else(|| RenderError::Readback("buffer was never mapped".into()))?
            .recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        self.finish(result)
    }

    fn finish(
        &mut self,
        result: Result<(), wgpu::BufferAsyncError>,
    ) -> Result<RgbaImage, RenderError> {
        self.mapped = None;
        result.map_err(|e| RenderError::Readback(e.to_string()))?;

        let row = (self.width * BYTES_PER_PIXEL) as usize;
        let mut pixels = Vec::with_capacity(row * self.height as usize);
        {
            let data = self.buffer.slice(..).get_mapped_range();
            for chunk in data.chunks(self.padded_row as usize) {
                pixels.extend_from_slice(&chunk[..row]);
            }
        }
        self.buffer.unmap();
        if self.swap_red_blue {
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| RenderError::Readback("short readback buffer".into()))
    }
}

/// Copies `texture` to the CPU and waits for the result.
pub fn read_texture(gpu: &GpuContext, texture: &wgpu::Texture) -> Result<RgbaImage, RenderError> {
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    let readback = ImageReadback::record(gpu, &mut encoder, texture);
    gpu.queue.submit(std::iter::once(encoder.finish()));
    readback.wait(gpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn uploaded_pixels_come_back_unchanged() {
        let Ok(gpu) = GpuContext::headless() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };
        let (width, height) = (3, 2);
        let pixels: Vec<u8> = (0..width * height * 4).map(|i| (i * 10) as u8).collect();
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("readback test"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        gpu.queue.write_texture(
            texture.as_image_copy(),
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            texture.size(),
        );

        let image = read_texture(&gpu, &texture).unwrap();
        assert_eq!(image.dimensions(), (width, height));
        assert_eq!(image.into_raw(), pixels);
    }
}
