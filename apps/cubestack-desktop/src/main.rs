use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use cubestack_game::{Game, GameConfig, GameEvent};
use cubestack_input::{Action, Direction, InputState};
use cubestack_render::DrawList;
use cubestack_render_wgpu::{ChaseCamera, WgpuRenderer};
use cubestack_tools::SceneInspector;
use egui::Context as EguiContext;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "cubestack-desktop", about = "Collect cubes, stack them, build the house")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config overriding the built-in tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the config seed
    #[arg(long)]
    seed: Option<u64>,
}

fn direction_for(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(Direction::Forward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(Direction::Back),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(Direction::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(Direction::Right),
        _ => None,
    }
}

fn action_for(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::KeyR => Some(Action::Restart),
        KeyCode::KeyP => Some(Action::TogglePause),
        KeyCode::F1 => Some(Action::ToggleInspector),
        KeyCode::Escape | KeyCode::Enter => Some(Action::DismissPopup),
        _ => None,
    }
}

/// Read and decode a picture for an egui texture.
fn decode_image(path: &Path) -> Result<egui::ColorImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let rgba = image::load_from_memory(&bytes)
        .with_context(|| format!("decoding {}", path.display()))?
        .to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// The popup picture, decoded the first time the popup opens.
enum PopupImage {
    NotLoaded,
    Loaded(egui::TextureHandle),
    Missing,
}

/// Game plus everything the window needs around it.
struct AppState {
    game: Game,
    input: InputState,
    camera: ChaseCamera,
    show_inspector: bool,
    last_frame: Instant,
    tick_accumulator: f64,
    tick_rate: f64,
    popup_image: PopupImage,
}

impl AppState {
    fn new(config: GameConfig) -> Result<Self> {
        let tick_rate = f64::from(config.tick_seconds());
        let game = Game::new(config)?;
        let mut camera = ChaseCamera::default();
        camera.snap_to(game.character_position());
        Ok(Self {
            game,
            input: InputState::new(),
            camera,
            show_inspector: false,
            last_frame: Instant::now(),
            tick_accumulator: 0.0,
            tick_rate,
            popup_image: PopupImage::NotLoaded,
        })
    }

    fn update(&mut self, dt: f32) {
        for action in self.input.take_actions() {
            match action {
                Action::ToggleInspector => self.show_inspector = !self.show_inspector,
                Action::Restart => {
                    if let Err(e) = self.game.apply_action(&action) {
                        tracing::error!("restart failed: {e}");
                        continue;
                    }
                    self.input.clear();
                    self.tick_accumulator = 0.0;
                    self.camera.snap_to(self.game.character_position());
                }
                other => {
                    if let Err(e) = self.game.apply_action(&other) {
                        tracing::error!("action {other:?} failed: {e}");
                    }
                }
            }
        }

        // Fixed timestep for the simulation
        self.tick_accumulator += f64::from(dt);
        while self.tick_accumulator >= self.tick_rate {
            self.tick_accumulator -= self.tick_rate;
            match self.game.tick(self.input.move_intent()) {
                Ok(report) => {
                    for event in &report.events {
                        match event {
                            GameEvent::Scored { .. } | GameEvent::Collected { .. } => {
                                tracing::debug!(?event, tick = report.tick, "game event");
                            }
                            _ => tracing::info!(?event, tick = report.tick, "game event"),
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("tick failed: {e}");
                    break;
                }
            }
        }

        self.camera.follow(self.game.character_position(), dt);
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if let Some(direction) = direction_for(key) {
            self.input.set_direction(direction, pressed);
            return;
        }
        if pressed {
            if let Some(action) = action_for(key) {
                self.input.push_action(action);
            }
        }
    }

    fn draw_list(&self) -> DrawList {
        let mut draw = DrawList::build(
            self.game.scene(),
            self.game.components(),
            self.game.assets(),
        );
        if let Some(burst) = self.game.particles() {
            for particle in burst.live() {
                draw.push_point(
                    particle.position,
                    burst.size(),
                    particle.color,
                    burst.opacity(),
                );
            }
        }
        draw
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        egui::Area::new(egui::Id::new("score"))
            .anchor(egui::Align2::CENTER_TOP, [0.0, 100.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(egui::Color32::from_black_alpha(128))
                    .corner_radius(10.0)
                    .inner_margin(egui::Margin::symmetric(20, 10))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(self.game.score_label())
                                .size(40.0)
                                .color(egui::Color32::WHITE),
                        );
                    });
            });

        if self.game.is_paused() {
            egui::Area::new(egui::Id::new("paused"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .interactable(false)
                .show(ctx, |ui| {
                    ui.label(
                        egui::RichText::new("Paused")
                            .size(32.0)
                            .color(egui::Color32::WHITE),
                    );
                });
        }

        let popup = self.game.popup();
        if popup.is_visible() {
            if matches!(self.popup_image, PopupImage::NotLoaded) {
                self.popup_image = match decode_image(Path::new(popup.image())) {
                    Ok(picture) => PopupImage::Loaded(ctx.load_texture(
                        "popup_image",
                        picture,
                        egui::TextureOptions::LINEAR,
                    )),
                    Err(err) => {
                        tracing::warn!("popup image unavailable: {err:#}");
                        PopupImage::Missing
                    }
                };
            }
            let picture = &self.popup_image;
            let mut close = false;
            egui::Window::new(popup.title())
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(popup.message());
                    match picture {
                        PopupImage::Loaded(texture) => {
                            ui.add(egui::Image::new(texture).max_width(400.0));
                        }
                        PopupImage::NotLoaded | PopupImage::Missing => {
                            ui.small(format!("Image: {}", popup.image()));
                        }
                    }
                    ui.separator();
                    close = ui.button("Close").clicked();
                });
            if close {
                self.game.dismiss_popup();
            }
        }

        if self.show_inspector {
            self.draw_inspector(ctx);
        }
    }

    fn draw_inspector(&self, ctx: &EguiContext) {
        let summary = SceneInspector::summary(self.game.scene(), self.game.components());
        let stack = self.game.stack();

        egui::SidePanel::left("inspector")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("Cube Stack");
                ui.separator();
                ui.label(format!("Tick: {}  Seed: {}", summary.tick, summary.seed));
                ui.label(format!(
                    "Entities: {}  Materials: {}",
                    summary.entity_count,
                    self.game.assets().materials().count()
                ));
                ui.label(format!("Layout: {:016x}", summary.layout_hash));
                let p = self.game.character_position();
                ui.label(format!("Character: ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
                ui.separator();

                ui.heading("Round");
                ui.label(self.game.score_label());
                ui.label(format!("Carrying: {}", stack.len()));
                ui.label(format!(
                    "In drop zone: {}  Dropping: {}",
                    self.game.in_drop_zone(),
                    stack.is_dropping()
                ));
                ui.label(format!(
                    "Collectibles left: {}",
                    self.game.collectibles_remaining()
                ));
                ui.label(format!("House scale: {:.3}", self.game.house_scale()));
                ui.label(format!("Celebrated: {}", self.game.has_celebrated()));
                if let Some(burst) = self.game.particles() {
                    ui.label(format!(
                        "Particles: {} (opacity {:.2})",
                        burst.len(),
                        burst.opacity()
                    ));
                }
                ui.separator();

                ui.heading("Names");
                for (name, count) in &summary.by_name {
                    ui.label(format!("{name}: {count}"));
                }
                ui.separator();

                ui.collapsing("Roots", |ui| {
                    egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                        for id in SceneInspector::roots(self.game.scene()) {
                            if let Some(info) = SceneInspector::inspect_entity(
                                self.game.scene(),
                                self.game.components(),
                                id,
                            ) {
                                ui.small(info.to_string());
                            }
                        }
                    });
                });

                ui.separator();
                ui.small("WASD/Arrows: Move | R: Restart | P: Pause | F1: Inspector");
            });
    }
}

/// GPU objects created once the window exists.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("Cube Stack")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("create window")?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cubestack_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
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
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        self.state.camera.set_viewport(config.width, config.height);

        let renderer = WgpuRenderer::new(&device, surface_format, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Gpu {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;
        self.state.update(dt);

        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draw = self.state.draw_list();
        gpu.renderer
            .render(&gpu.device, &gpu.queue, &view, &self.state.camera, &draw);

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                tracing::error!("failed to start renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    self.state
                        .camera
                        .set_viewport(gpu.config.width, gpu.config.height);
                    gpu.renderer
                        .resize(&gpu.device, gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.state.input.clear();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("cubestack-desktop starting");

    let mut config = GameConfig::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let state = AppState::new(config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_into_color_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        let mut picture = image::RgbaImage::new(3, 2);
        picture.put_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        picture.save(&path).unwrap();

        let decoded = decode_image(&path).unwrap();
        assert_eq!(decoded.size, [3, 2]);
        assert_eq!(decoded.pixels[5], egui::Color32::from_rgb(255, 0, 0));
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_image(&dir.path().join("absent.jpg")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.jpg"));
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.jpg");
        std::fs::write(&path, b"not a picture").unwrap();
        assert!(decode_image(&path).is_err());
    }
}
