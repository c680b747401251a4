//! The interactive window.
//!
//! [`run`] opens a window, builds the demo [`Scene`] and renders it with a
//! [`Renderer`] into the window surface. Keyboard and mouse input becomes
//! [`Command`]s through [`InputState`]; redraws are paced by a
//! [`RedrawScheduler`] so that many requests between two ticks cost one
//! frame. Diagnostic exports are written as PNG files or logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::gpu::{GpuContext, WindowSurface};
use crate::input::InputState;
use crate::renderer::{BufferSnapshot, FrameOutput, Renderer, RendererConfig};
use crate::scene::{Command, Controls, Param, Response, Scene, SceneConfig};
use crate::scheduler::RedrawScheduler;

/// Configuration for the app window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Ticks per second of the redraw scheduler.
    pub tick_rate_hz: f32,
    pub scene: SceneConfig,
    pub renderer: RendererConfig,
    /// Where exported buffers are written as PNG. Exports are only logged
    /// when unset.
    pub export_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "lightpass".to_string(),
            width: 800,
            height: 600,
            tick_rate_hz: 60.0,
            scene: SceneConfig::default(),
            renderer: RendererConfig::default(),
            export_dir: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial inner size of the window in logical pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Redraw ticks per second. Invalid rates fall back to 60.
    pub fn tick_rate(mut self, hz: f32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Writes diagnostic exports into `dir` instead of only logging them.
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }
}

/// Opens the demo window and runs until it is closed.
///
/// # Example
/// ```no_run
/// lightpass::run(lightpass::AppConfig::new().title("lights").size(1024, 768)).unwrap();
/// ```
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create the event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::Pending { config };
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    match app {
        App::Failed(error) => Err(error),
        _ => Ok(()),
    }
}

struct Running {
    config: AppConfig,
    window: Arc<Window>,
    gpu: GpuContext,
    surface: WindowSurface,
    scene: Scene,
    renderer: Renderer,
    controls: Controls,
    scheduler: RedrawScheduler,
    input: InputState,
    exports: Receiver<BufferSnapshot>,
    last_update: Instant,
}

enum App {
    Pending { config: AppConfig },
    Running(Box<Running>),
    Failed(anyhow::Error),
}

impl Running {
    fn start(config: AppConfig, event_loop: &ActiveEventLoop) -> anyhow::Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("failed to create the window")?,
        );

        let (gpu, surface) = GpuContext::with_window(window.clone())?;
        let mut scene = Scene::with_config(&config.scene).context("failed to build the scene")?;

        let mut renderer = Renderer::new(
            &gpu,
            config.renderer.clone(),
            surface.width(),
            surface.height(),
        );
        let (sender, exports) = mpsc::channel();
        renderer.set_export_sender(sender);

        // bring the fresh scene in line with the panel defaults
        let controls = Controls::demo(scene.light_count());
        for param in controls.force_notify() {
            if let Err(e) = scene.apply_param(param) {
                log::warn!("default {} rejected: {}", param.name(), e);
            }
        }

        let now = Instant::now();
        let mut scheduler = RedrawScheduler::with_rate(config.tick_rate_hz, now);
        scheduler.set_animating(scene.settings.animating);

        let mut running = Self {
            config,
            window,
            gpu,
            surface,
            scene,
            renderer,
            controls,
            scheduler,
            input: InputState::new(),
            exports,
            last_update: now,
        };
        running.update_title();
        Ok(running)
    }

    fn command(&mut self, command: Command, event_loop: &ActiveEventLoop) {
        // the panel filters out values that did not change
        let command = match command {
            Command::Set(param) => match self.controls.set(param) {
                Some(param) => Command::Set(param),
                None => return,
            },
            other => other,
        };
        let is_setting = matches!(command, Command::Set(_) | Command::ToggleUi);

        match self.scene.handle_input(command) {
            Response::Quit => event_loop.exit(),
            Response::Redraw => {
                if is_setting {
                    self.update_title();
                }
                self.scheduler.request_redraw();
            }
            Response::Ignored => {}
        }
        self.scheduler.set_animating(self.scene.settings.animating);
    }

    fn update_title(&self) {
        if !self.scene.settings.ui_visible {
            self.window.set_title(&self.config.title);
            return;
        }
        let settings = &self.scene.settings;
        let surface = match self.controls.current(&Param::Material {
            model: settings.model,
            surface: crate::scene::Surface::Phong,
        }) {
            Some(Param::Material { surface, .. }) => surface.label(),
            _ => "?",
        };
        self.window.set_title(&format!(
            "{} | {} / {} | {:?}{}",
            self.config.title,
            settings.model.label(),
            surface,
            settings.post,
            if settings.split_display { " | split" } else { "" },
        ));
    }

    fn redraw(&mut self) {
        let frame = match self.surface.acquire(&self.gpu) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.scheduler.request_redraw();
                return;
            }
            Err(e) => {
                log::error!("present failed: {:#}", e);
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let output = FrameOutput {
            view: &view,
            format: self.surface.format(),
            size: glam::UVec2::new(self.surface.width(), self.surface.height()),
        };
        if let Err(e) = self.renderer.draw(&self.gpu, &mut self.scene, &output) {
            log::error!("frame {} skipped: {}", self.renderer.frame_count(), e);
        }
        self.window.pre_present_notify();
        frame.present();
    }

    fn drain_exports(&mut self) {
        while let Ok(snapshot) = self.exports.try_recv() {
            let Some(dir) = &self.config.export_dir else {
                log::debug!(
                    "frame {}: {} buffer {}x{}",
                    snapshot.frame,
                    snapshot.label,
                    snapshot.image.width(),
                    snapshot.image.height()
                );
                continue;
            };
            let path = dir.join(format!("{}_{:06}.png", snapshot.label, snapshot.frame));
            if let Err(e) = snapshot.image.save(&path) {
                log::warn!("could not write {}: {}", path.display(), e);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let App::Pending { config } = self else {
            return;
        };
        *self = match Running::start(config.clone(), event_loop) {
            Ok(running) => {
                log::info!("ready: {} lights", running.scene.light_count());
                App::Running(Box::new(running))
            }
            Err(e) => {
                log::error!("startup failed: {:#}", e);
                event_loop.exit();
                App::Failed(e)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let App::Running(app) = self else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.surface.resize(&app.gpu, size.width, size.height);
                app.renderer
                    .resize(app.surface.width(), app.surface.height());
                app.scheduler.request_redraw();
            }
            WindowEvent::RedrawRequested => app.redraw(),
            event => {
                if let Some(command) = app.input.translate(&event, &app.controls) {
                    app.command(command, event_loop);
                }
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let App::Running(app) = self else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(app.last_update).as_secs_f32();
        app.last_update = now;
        if app.scene.update(dt) {
            app.scheduler.request_redraw();
        }

        if app.scheduler.poll(now) {
            app.window.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(app.scheduler.next_deadline()));

        app.renderer.poll_exports(&app.gpu);
        app.drain_exports();
    }
}
