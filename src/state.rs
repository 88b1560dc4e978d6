use crate::audio::Soundtrack;
use crate::camera::{Camera, CameraController, CameraUniform};
use crate::intro::Intro;
use crate::render::*;
use crate::scene::Scene;
use crate::tier::{classify, GpuInfo, PerformanceTier};
use crate::{CameraParams, SnowParams, TreeParams};
use log::{info, warn};
use rand::{rngs::SmallRng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wgpu::util::DeviceExt;
use winit::event::ElementState;
use winit::keyboard::*;
use winit::{
  dpi::PhysicalSize,
  event::{Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{EventLoop, EventLoopWindowTarget},
  window::Window,
};

/// Desktop width assumed when there is no window to measure.
const HEADLESS_VIEWPORT_WIDTH: f64 = 1920.0;
const HEADLESS_FRAME: Duration = Duration::from_micros(16_667);
/// Headless mode toggles the tree on this period to keep the tweens busy.
const HEADLESS_TOGGLE_EVERY: u64 = 120;

pub struct RunOptions {
  pub tier: Option<PerformanceTier>,
  pub tree: TreeParams,
  pub snow: SnowParams,
  pub camera: CameraParams,
  pub seed: Option<u64>,
  pub skip_intro: bool,
  pub soundtrack: Box<dyn Soundtrack>,
  pub headless: bool,
  pub frames: Option<u64>,
}

impl RunOptions {
  fn rng(&self) -> SmallRng {
    match self.seed {
      Some(seed) => SmallRng::seed_from_u64(seed),
      None => SmallRng::from_entropy(),
    }
  }

  fn tier(&self, viewport_width: f64, gpu: Option<&GpuInfo>) -> PerformanceTier {
    let tier = self.tier.unwrap_or_else(|| classify(viewport_width, gpu));
    info!(
      "performance tier {tier:?} ({} particles), adapter {:?}",
      tier.particle_count(),
      gpu.map(|gpu| gpu.name.as_str())
    );
    tier
  }
}

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  pub fn new(title: &str) -> Self {
    let event_loop = EventLoop::new().unwrap();
    let mut builder = winit::window::WindowBuilder::new();
    builder = builder.with_title(title).with_resizable(true);
    let window = Arc::new(builder.build(&event_loop).unwrap());

    Self { event_loop, window }
  }
}

struct SurfaceWrapper {
  surface: wgpu::Surface<'static>,
  config: Option<wgpu::SurfaceConfiguration>,
}

impl SurfaceWrapper {
  fn new(instance: &wgpu::Instance, window: Arc<Window>) -> Self {
    Self {
      surface: instance.create_surface(window).unwrap(),
      config: None,
    }
  }

  fn resume(&mut self, context: &State, size: PhysicalSize<u32>) {
    let width = size.width.max(1);
    let height = size.height.max(1);
    let mut config = self
      .surface
      .get_default_config(&context.adapter, width, height)
      .unwrap();
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    self.surface.configure(&context.device, &config);
    self.config = Some(config);
  }

  fn resize(&mut self, context: &State, size: PhysicalSize<u32>) {
    if let Some(config) = self.config.as_mut() {
      config.width = size.width.max(1);
      config.height = size.height.max(1);
      self.surface.configure(&context.device, config);
    }
  }

  /// None when the surface could not produce a frame even after being
  /// reconfigured; the frame is skipped.
  fn acquire(&mut self, context: &State) -> Option<wgpu::SurfaceTexture> {
    match self.surface.get_current_texture() {
      Ok(frame) => Some(frame),
      Err(wgpu::SurfaceError::Timeout) => self.surface.get_current_texture().ok(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        self.surface.configure(&context.device, self.config());
        match self.surface.get_current_texture() {
          Ok(frame) => Some(frame),
          Err(err) => {
            warn!("dropping frame: {err}");
            None
          }
        }
      }
    }
  }

  fn config(&self) -> &wgpu::SurfaceConfiguration {
    self.config.as_ref().unwrap()
  }
}

struct State {
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
  camera: Camera,
  camera_uniform: CameraUniform,
  camera_buffer: wgpu::Buffer,
  camera_bind_group: wgpu::BindGroup,
  camera_controller: CameraController,
  camera_bind_group_layout: wgpu::BindGroupLayout,
}

impl State {
  fn update(&mut self, scene: &Scene) {
    self.camera.eye.z = scene.zoom().camera_z();
    self.camera_uniform.update_view_proj(&self.camera);
    self.queue.write_buffer(
      &self.camera_buffer,
      0,
      bytemuck::cast_slice(&[self.camera_uniform]),
    );
  }

  async fn init(
    instance: &wgpu::Instance,
    surface: &SurfaceWrapper,
    size: &PhysicalSize<u32>,
    params: &CameraParams,
  ) -> Self {
    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: Some(&surface.surface),
        force_fallback_adapter: false,
      })
      .await
      .unwrap();

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await
      .unwrap();
    let camera = Camera::new(
      params,
      size.width.max(1) as f32 / size.height.max(1) as f32,
    );
    let mut camera_uniform = CameraUniform::new();
    camera_uniform.update_view_proj(&camera);

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Camera Buffer"),
      contents: bytemuck::cast_slice(&[camera_uniform]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let camera_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
          },
          count: None,
        }],
        label: Some("camera_bind_group_layout"),
      });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &camera_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: camera_buffer.as_entire_binding(),
      }],
      label: Some("camera_bind_group"),
    });
    let camera_controller = CameraController::init(params.rotational_speed);

    Self {
      adapter,
      device,
      queue,
      camera,
      camera_uniform,
      camera_buffer,
      camera_bind_group,
      camera_controller,
      camera_bind_group_layout,
    }
  }
}

async fn start(options: RunOptions) {
  let window_loop = EventLoopWrapper::new("Merry Christmas");
  let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
    #[cfg(not(target_arch = "wasm32"))]
    backends: wgpu::Backends::PRIMARY,
    ..Default::default()
  });
  let mut surface = SurfaceWrapper::new(&instance, window_loop.window.clone());
  let size = window_loop.window.inner_size();
  let mut context = State::init(&instance, &surface, &size, &options.camera).await;

  let viewport_width = size
    .to_logical::<f64>(window_loop.window.scale_factor())
    .width;
  let gpu = GpuInfo::from(&context.adapter.get_info());
  let tier = options.tier(viewport_width, Some(&gpu));
  let rng = options.rng();
  let intro = if options.skip_intro {
    Intro::revealed()
  } else {
    Intro::sealed()
  };
  let mut scene = Scene::new(
    options.tree,
    options.snow,
    &options.camera,
    tier.particle_count(),
    intro,
    options.soundtrack,
    rng,
  );

  let clock = Instant::now();
  let event_loop_function = EventLoop::run;
  let mut example = None;

  let result = (event_loop_function)(
    window_loop.event_loop,
    move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => {
        surface.resume(&context, window_loop.window.inner_size());
        if example.is_none() {
          example = Some(Render::init(
            surface.config(),
            &context.device,
            &context.camera_bind_group_layout,
            &scene,
          ));
        }
        window_loop.window.request_redraw();
      }
      Event::WindowEvent { event, window_id } if window_id == window_loop.window.id() => {
        if let Some(action) = context.camera_controller.process_events(&event) {
          scene.apply(action, clock.elapsed());
          return;
        }
        match event {
          WindowEvent::CloseRequested
          | WindowEvent::KeyboardInput {
            event:
              KeyEvent {
                state: ElementState::Pressed,
                physical_key: PhysicalKey::Code(KeyCode::Escape),
                ..
              },
            ..
          } => target.exit(),
          WindowEvent::Resized(size) => {
            surface.resize(&context, size);
            context.camera.resize(size.width, size.height);
          }
          WindowEvent::RedrawRequested => {
            window_loop.window.request_redraw();
            let Some(example) = &mut example else {
              return;
            };
            scene.tick(clock.elapsed());
            context.update(&scene);
            let Some(frame) = surface.acquire(&context) else {
              return;
            };
            let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
              format: Some(surface.config().view_formats[0]),
              ..wgpu::TextureViewDescriptor::default()
            });
            example.render(
              &view,
              &context.device,
              &context.queue,
              &context.camera_bind_group,
              &scene,
            );
            frame.present();
          }
          _ => {}
        }
      }
      _ => {}
    },
  );
  if let Err(err) = result {
    warn!("event loop exited with an error: {err}");
  }
}

/// Simulated time of a headless frame.
fn headless_clock(frame: u64) -> Duration {
  HEADLESS_FRAME.mul_f64(frame as f64)
}

/// Run the frame driver without a window at a fixed 60 Hz until Ctrl-C or
/// the frame limit.
async fn start_headless(options: RunOptions) {
  let instance = wgpu::Instance::default();
  let gpu = instance
    .request_adapter(&wgpu::RequestAdapterOptions::default())
    .await
    .map(|adapter| GpuInfo::from(&adapter.get_info()));
  let tier = options.tier(HEADLESS_VIEWPORT_WIDTH, gpu.as_ref());
  let rng = options.rng();
  let frames = options.frames;
  let mut scene = Scene::new(
    options.tree,
    options.snow,
    &options.camera,
    tier.particle_count(),
    Intro::revealed(),
    options.soundtrack,
    rng,
  );

  let running = Arc::new(AtomicBool::new(true));
  let handler_flag = running.clone();
  if let Err(err) = ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst)) {
    warn!("could not install the Ctrl-C handler: {err}");
  }

  let mut frame: u64 = 0;
  while running.load(Ordering::SeqCst) && frames.map_or(true, |limit| frame < limit) {
    let now = headless_clock(frame);
    if frame % HEADLESS_TOGGLE_EVERY == 0 {
      scene.activate(now);
    }
    scene.tick(now);
    if frame % 60 == 0 {
      info!(
        "t={:.1}s gathered={} tweens={} rotation={:.3}",
        now.as_secs_f32(),
        scene.tree().is_gathered(),
        scene.tree().active_tweens(),
        scene.rotation().y
      );
    }
    frame += 1;
    std::thread::sleep(HEADLESS_FRAME);
  }
  info!("stopped after {frame} frames");
}

pub fn run(options: RunOptions) {
  env_logger::init();
  if options.headless {
    pollster::block_on(start_headless(options));
  } else {
    pollster::block_on(start(options));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn headless_clock_runs_past_u32_frames() {
    assert_eq!(headless_clock(0), Duration::ZERO);
    assert!((headless_clock(60).as_secs_f64() - 1.000_02).abs() < 1e-9);

    let wrap = u64::from(u32::MAX) + 1;
    assert!(headless_clock(wrap) > headless_clock(wrap - 1));
    let expected = 0.016_667 * wrap as f64;
    assert!((headless_clock(wrap).as_secs_f64() - expected).abs() < 1e-3);
  }
}
