//! wgpu device and window surface.
//!
//! [`GpuContext`] holds the device and queue every pass records with. It is
//! created either for a window, together with its [`WindowSurface`], or
//! headless for off-screen rendering and readback.
//!
//! # Example
//!
//! ```no_run
//! use lightpass::GpuContext;
//!
//! let gpu = GpuContext::headless()?;
//! let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
//!     label: Some("My Buffer"),
//!     size: 256,
//!     usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
//!     mapped_at_creation: false,
//! });
//! gpu.queue.write_buffer(&buffer, 0, &[0u8; 256]);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::sync::Arc;

use anyhow::{Context, anyhow};
use winit::window::Window;

/// Device, queue and the name of the adapter behind them.
///
/// Fields are public so passes can create resources directly.
pub struct GpuContext {
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    pub adapter: wgpu::AdapterInfo,
}

/// The presentable surface of a window.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Creates a device without a window.
    ///
    /// Falls back to a software adapter when no hardware adapter is found,
    /// and fails only when neither exists.
    pub fn headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = [false, true]
            .into_iter()
            .find_map(|force_fallback_adapter| {
                pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter,
                }))
                .ok()
            })
            .ok_or_else(|| anyhow!("no GPU adapter available"))?;

        Self::from_adapter(&adapter)
    }

    /// Creates the surface for `window` and a device able to present to it.
    ///
    /// Picks a non-sRGB surface format when there is one, so rendered bytes
    /// reach the screen unchanged, and presents with vsync (`Fifo`).
    pub fn with_window(window: Arc<Window>) -> anyhow::Result<(Self, WindowSurface)> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create a window surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let gpu = Self::from_adapter(&adapter)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        log::info!(
            "surface {}x{} {:?} on {}",
            config.width,
            config.height,
            config.format,
            gpu.adapter.name
        );

        Ok((gpu, WindowSurface { surface, config }))
    }

    fn from_adapter(adapter: &wgpu::Adapter) -> anyhow::Result<Self> {
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("lightpass device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .context("failed to create a GPU device")?;

        let info = adapter.get_info();
        log::debug!("adapter {} ({:?})", info.name, info.backend);
        Ok(Self {
            device,
            queue,
            adapter: info,
        })
    }
}

impl WindowSurface {
    /// Reconfigures the surface. Zero sizes (minimized windows) are ignored.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&gpu.device, &self.config);
        }
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// The next texture to draw into, or `None` when this frame should be skipped.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn acquire(&self, gpu: &GpuContext) -> anyhow::Result<Option<wgpu::SurfaceTexture>> {
        match self.surface.get_current_texture() {
            Ok(output) => Ok(Some(output)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&gpu.device, &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                Ok(None)
            }
            Err(e) => Err(anyhow!("surface error: {}", e)),
        }
    }
}
