pub mod audio;
pub mod camera;
pub mod initialize;
pub mod intro;
pub mod render;
pub mod scene;
pub mod snow;
pub mod state;
pub mod tier;
pub mod tree;
pub mod tween;

use std::time::Duration;

/// How particle positions are spread inside the tree and the dispersion cloud.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Sampling {
  /// Radius scaled by a plain uniform draw, which packs points toward the axis.
  #[default]
  Original,
  /// Area-uniform slices and volume-uniform cone/ball.
  Uniform,
}

#[derive(Copy, Clone, Debug)]
pub struct TreeParams {
  pub y_offset: f32,
  pub star_height: f32,
  pub star_radius: f32,
  pub trunk_percent: usize,
  pub trunk_height: f32,
  pub trunk_radius: f32,
  pub crown_height: f32,
  pub crown_floor: f32,
  pub crown_base_radius: f32,
  pub scatter_radius: f32,
  pub toggle_cooldown: Duration,
  pub tween_duration: Duration,
  pub ambient_rotation: f32,
  pub sampling: Sampling,
}

impl Default for TreeParams {
  fn default() -> Self {
    Self {
      // moves the whole tree down so it sits low in the view
      y_offset: -5.0,
      star_height: 8.0,
      star_radius: 2.5,
      trunk_percent: 15,
      trunk_height: 3.0,
      trunk_radius: 0.5,
      crown_height: 12.0,
      crown_floor: -1.0,
      crown_base_radius: 6.0,
      scatter_radius: 20.0,
      toggle_cooldown: Duration::from_millis(300),
      tween_duration: Duration::from_millis(600),
      ambient_rotation: 0.001,
      sampling: Sampling::Original,
    }
  }
}

#[derive(Copy, Clone, Debug)]
pub struct SnowParams {
  pub count: usize,
  pub speed: f32,
  pub size: f32,
  pub spread: f32,
  pub floor: f32,
  pub drift: f32,
  pub initial_band: (f32, f32),
  pub respawn_band: (f32, f32),
}

impl Default for SnowParams {
  fn default() -> Self {
    Self {
      count: 1000,
      speed: 0.02,
      size: 1.5,
      spread: 40.0,
      floor: -15.0,
      drift: 0.01,
      initial_band: (10.0, 30.0),
      respawn_band: (15.0, 25.0),
    }
  }
}

#[derive(Copy, Clone, Debug)]
pub struct CameraParams {
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
  pub distance: f32,
  pub min_distance: f32,
  pub max_distance: f32,
  pub zoom_speed: f32,
  pub zoom_duration: Duration,
  pub rotational_speed: f32,
}

impl Default for CameraParams {
  fn default() -> Self {
    Self {
      fovy: 75.0,
      znear: 0.1,
      zfar: 1000.0,
      distance: 25.0,
      min_distance: 10.0,
      max_distance: 50.0,
      zoom_speed: 0.5,
      zoom_duration: Duration::from_millis(200),
      rotational_speed: 0.005,
    }
  }
}

/// One billboard as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointInstance {
  pub pos: [f32; 3],
  pub color: [f32; 3],
  pub size: f32,
}
