use crate::tween::{Easing, Tween};
use crate::CameraParams;
use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};
use std::time::Duration;
use winit::{
  dpi::PhysicalPosition,
  event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
  keyboard::{KeyCode, PhysicalKey},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

pub struct Camera {
  pub eye: cgmath::Point3<f32>,
  pub target: cgmath::Point3<f32>,
  pub up: cgmath::Vector3<f32>,
  pub aspect: f32,
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
}

impl Camera {
  pub fn new(params: &CameraParams, aspect: f32) -> Self {
    Self {
      // on the +z axis looking back at the origin
      eye: Point3::new(0.0, 0.0, params.distance),
      target: Point3::new(0.0, 0.0, 0.0),
      up: Vector3::unit_y(),
      aspect,
      fovy: params.fovy,
      znear: params.znear,
      zfar: params.zfar,
    }
  }

  pub fn resize(&mut self, width: u32, height: u32) {
    self.aspect = width.max(1) as f32 / height.max(1) as f32;
  }

  fn build_view_matrix(&self) -> Matrix4<f32> {
    Matrix4::look_at_rh(self.eye, self.target, self.up)
  }

  fn build_projection_matrix(&self) -> Matrix4<f32> {
    let proj = cgmath::perspective(cgmath::Deg(self.fovy), self.aspect, self.znear, self.zfar);
    OPENGL_TO_WGPU_MATRIX * proj
  }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
  view: [[f32; 4]; 4],
  proj: [[f32; 4]; 4],
  /// x holds the viewport aspect ratio, the rest is padding.
  screen: [f32; 4],
}

impl CameraUniform {
  pub fn new() -> Self {
    Self {
      view: Matrix4::identity().into(),
      proj: Matrix4::identity().into(),
      screen: [1.0, 0.0, 0.0, 0.0],
    }
  }

  pub fn update_view_proj(&mut self, camera: &Camera) {
    self.view = camera.build_view_matrix().into();
    self.proj = camera.build_projection_matrix().into();
    self.screen[0] = camera.aspect;
  }
}

impl Default for CameraUniform {
  fn default() -> Self {
    Self::new()
  }
}

/// Wheel zoom: the requested distance jumps in fixed steps inside its
/// clamp, and the camera eases toward it.
#[derive(Clone, Debug)]
pub struct Zoom {
  distance: f32,
  camera_z: f32,
  min: f32,
  max: f32,
  step: f32,
  duration: Duration,
  tween: Option<Tween<f32>>,
}

impl Zoom {
  pub fn new(params: &CameraParams) -> Self {
    Self {
      distance: params.distance,
      camera_z: params.distance,
      min: params.min_distance,
      max: params.max_distance,
      step: params.zoom_speed,
      duration: params.zoom_duration,
      tween: None,
    }
  }

  /// Target distance after the last wheel event.
  pub fn distance(&self) -> f32 {
    self.distance
  }

  /// Where the camera currently is.
  pub fn camera_z(&self) -> f32 {
    self.camera_z
  }

  /// `delta` follows the page convention: negative scrolls up and zooms in.
  pub fn wheel(&mut self, delta: f32, now: Duration) {
    self.distance = if delta < 0.0 {
      (self.distance - self.step).max(self.min)
    } else {
      (self.distance + self.step).min(self.max)
    };
    self.tween = Some(Tween::new(
      self.camera_z,
      self.distance,
      now,
      self.duration,
      Easing::QuadraticInOut,
    ));
  }

  pub fn update(&mut self, now: Duration) {
    if let Some(tween) = &self.tween {
      self.camera_z = tween.value_at(now);
      if tween.is_finished(now) {
        self.tween = None;
      }
    }
  }
}

/// What a window event means for the scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action {
  /// Click, tap or Enter/Space.
  Activate,
  /// Radians to add to the tree's rotation.
  Rotate { pitch: f32, yaw: f32 },
  /// Wheel delta, negative zooms in.
  Zoom { delta: f32 },
}

pub struct CameraController {
  rotation_speed: f32,
  is_rotating: bool,
  cursor: PhysicalPosition<f64>,
  previous: PhysicalPosition<f64>,
}

impl CameraController {
  pub fn init(rotation_speed: f32) -> Self {
    Self {
      rotation_speed,
      is_rotating: false,
      cursor: PhysicalPosition::new(0.0, 0.0),
      previous: PhysicalPosition::new(0.0, 0.0),
    }
  }

  pub fn is_rotating(&self) -> bool {
    self.is_rotating
  }

  pub fn process_events(&mut self, event: &WindowEvent) -> Option<Action> {
    match event {
      WindowEvent::MouseInput {
        state,
        button: MouseButton::Left,
        ..
      } => match state {
        ElementState::Pressed => {
          self.mouse_down();
          None
        }
        ElementState::Released => self.mouse_up(),
      },
      WindowEvent::CursorMoved { position, .. } => self.cursor_moved(*position),
      WindowEvent::CursorLeft { .. } => {
        self.is_rotating = false;
        None
      }
      WindowEvent::MouseWheel { delta, .. } => {
        let delta = match delta {
          MouseScrollDelta::LineDelta(_, y) => -*y,
          MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
        };
        Some(Action::Zoom { delta })
      }
      WindowEvent::Touch(Touch {
        phase: TouchPhase::Started,
        ..
      }) => Some(Action::Activate),
      WindowEvent::KeyboardInput {
        event:
          KeyEvent {
            state: ElementState::Pressed,
            physical_key: PhysicalKey::Code(KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space),
            repeat: false,
            ..
          },
        ..
      } => Some(Action::Activate),
      _ => None,
    }
  }

  fn mouse_down(&mut self) {
    self.is_rotating = true;
    self.previous = self.cursor;
  }

  /// A release ends the drag; if the press landed in the window it also
  /// counts as a click.
  fn mouse_up(&mut self) -> Option<Action> {
    let clicked = self.is_rotating;
    self.is_rotating = false;
    clicked.then_some(Action::Activate)
  }

  fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<Action> {
    self.cursor = position;
    if !self.is_rotating {
      return None;
    }
    let dx = (position.x - self.previous.x) as f32;
    let dy = (position.y - self.previous.y) as f32;
    self.previous = position;
    Some(Action::Rotate {
      pitch: dy * self.rotation_speed,
      yaw: dx * self.rotation_speed,
    })
  }
}
