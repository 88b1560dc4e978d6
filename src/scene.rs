use crate::audio::Soundtrack;
use crate::camera::{Action, Zoom};
use crate::intro::Intro;
use crate::snow::SnowField;
use crate::tree::ParticleSystem;
use crate::tween::Easing;
use crate::{CameraParams, PointInstance, SnowParams, TreeParams};
use cgmath::{Matrix4, Rad, Vector2};
use log::debug;
use rand::rngs::SmallRng;
use std::time::Duration;

pub const RIPPLE_LIFETIME: Duration = Duration::from_millis(600);
/// Ripple diameter at full expansion, as a fraction of the viewport height.
const RIPPLE_SIZE: f32 = 0.35;
const RIPPLE_COLOR: [f32; 3] = [1.0, 0.95, 0.8];
/// Envelope card height as a fraction of the viewport height.
const ENVELOPE_SIZE: f32 = 0.6;
const ENVELOPE_COLOR: [f32; 3] = [0.85, 0.16, 0.12];

/// Everything that changes from frame to frame, owned in one place and only
/// touched from the event loop thread.
pub struct Scene {
  rng: SmallRng,
  tree: ParticleSystem,
  snow: SnowField,
  zoom: Zoom,
  rotation: Vector2<f32>,
  ambient_rotation: f32,
  ripples: Vec<Duration>,
  intro: Intro,
  soundtrack: Box<dyn Soundtrack>,
  opacity: f32,
  envelope_opacity: f32,
  frame: u64,
  tree_instances: Vec<PointInstance>,
  snow_instances: Vec<PointInstance>,
  ripple_instances: Vec<PointInstance>,
  envelope_instances: Vec<PointInstance>,
}

impl Scene {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    tree_params: TreeParams,
    snow_params: SnowParams,
    camera_params: &CameraParams,
    particle_count: usize,
    intro: Intro,
    soundtrack: Box<dyn Soundtrack>,
    mut rng: SmallRng,
  ) -> Self {
    let tree = ParticleSystem::new(tree_params, particle_count, &mut rng);
    let snow = SnowField::new(snow_params, &mut rng);
    let mut scene = Self {
      rng,
      tree_instances: Vec::with_capacity(tree.len()),
      snow_instances: Vec::with_capacity(snow.len()),
      ripple_instances: Vec::with_capacity(Self::MAX_RIPPLES),
      envelope_instances: Vec::with_capacity(1),
      tree,
      snow,
      zoom: Zoom::new(camera_params),
      rotation: Vector2::new(0.0, 0.0),
      ambient_rotation: tree_params.ambient_rotation,
      ripples: Vec::with_capacity(Self::MAX_RIPPLES),
      intro,
      soundtrack,
      opacity: 0.0,
      envelope_opacity: 0.0,
      frame: 0,
    };
    scene.opacity = scene.intro.opacity(Duration::ZERO);
    scene.envelope_opacity = scene.intro.envelope_opacity(Duration::ZERO);
    scene.write_envelope(Duration::ZERO);
    scene.write_instances();
    scene
  }

  /// Ripples live 600 ms and toggles are at least 300 ms apart.
  pub const MAX_RIPPLES: usize = 4;

  pub fn tree(&self) -> &ParticleSystem {
    &self.tree
  }

  pub fn snow(&self) -> &SnowField {
    &self.snow
  }

  pub fn zoom(&self) -> &Zoom {
    &self.zoom
  }

  pub fn intro(&self) -> &Intro {
    &self.intro
  }

  /// Accumulated (pitch, yaw) of the tree.
  pub fn rotation(&self) -> Vector2<f32> {
    self.rotation
  }

  pub fn opacity(&self) -> f32 {
    self.opacity
  }

  /// Opacity of the envelope card drawn over the scene.
  pub fn envelope_opacity(&self) -> f32 {
    self.envelope_opacity
  }

  pub fn frame(&self) -> u64 {
    self.frame
  }

  pub fn ripples(&self) -> usize {
    self.ripples.len()
  }

  pub fn apply(&mut self, action: Action, now: Duration) {
    match action {
      Action::Activate => {
        self.activate(now);
      }
      Action::Rotate { pitch, yaw } => {
        self.rotation.x += pitch;
        self.rotation.y += yaw;
      }
      Action::Zoom { delta } => self.zoom.wheel(delta, now),
    }
  }

  /// Opens the envelope the first time, toggles the tree afterwards.
  /// Returns whether the tree toggled.
  pub fn activate(&mut self, now: Duration) -> bool {
    if !self.intro.is_open() {
      self.intro.open(now, self.soundtrack.as_mut());
      return false;
    }
    if !self.intro.is_interactive(now) || !self.tree.toggle(now) {
      return false;
    }
    if self.ripples.len() == Self::MAX_RIPPLES {
      self.ripples.remove(0);
    }
    self.ripples.push(now);
    true
  }

  /// One frame of animation.
  pub fn tick(&mut self, now: Duration) {
    self.tree.advance(now);
    self.tree.pulse_star(now, &mut self.rng);
    self.rotation.y += self.ambient_rotation;
    let respawned = self.snow.update(now, &mut self.rng);

    self.zoom.update(now);
    self.ripples.retain(|&born| now.saturating_sub(born) < RIPPLE_LIFETIME);
    self.opacity = self.intro.opacity(now);
    self.envelope_opacity = self.intro.envelope_opacity(now);

    self.frame += 1;
    if self.frame % 600 == 0 {
      debug!(
        "frame {}: {} tweens in flight, {} flakes respawned",
        self.frame,
        self.tree.active_tweens(),
        respawned
      );
    }

    self.write_ripples(now);
    self.write_envelope(now);
    self.write_instances();
  }

  /// Tree rotation, X then Y.
  pub fn model_matrix(&self) -> Matrix4<f32> {
    Matrix4::from_angle_x(Rad(self.rotation.x)) * Matrix4::from_angle_y(Rad(self.rotation.y))
  }

  pub fn tree_instances(&self) -> &[PointInstance] {
    &self.tree_instances
  }

  pub fn snow_instances(&self) -> &[PointInstance] {
    &self.snow_instances
  }

  /// Screen-space billboards centred on the viewport.
  pub fn ripple_instances(&self) -> &[PointInstance] {
    &self.ripple_instances
  }

  /// The envelope card at the viewport centre; empty once it has faded.
  pub fn envelope_instances(&self) -> &[PointInstance] {
    &self.envelope_instances
  }

  fn write_instances(&mut self) {
    self.tree.write_instances(&mut self.tree_instances);
    self.snow.write_instances(&mut self.snow_instances);
  }

  fn write_ripples(&mut self, now: Duration) {
    self.ripple_instances.clear();
    for &born in &self.ripples {
      let k = now.saturating_sub(born).as_secs_f32() / RIPPLE_LIFETIME.as_secs_f32();
      let fade = 1.0 - k;
      self.ripple_instances.push(PointInstance {
        pos: [0.0; 3],
        color: RIPPLE_COLOR.map(|c| c * fade),
        size: RIPPLE_SIZE * Easing::QuadraticOut.apply(k),
      });
    }
  }

  fn write_envelope(&mut self, now: Duration) {
    self.envelope_instances.clear();
    if self.envelope_opacity > 0.0 {
      self.envelope_instances.push(PointInstance {
        pos: [0.0; 3],
        color: ENVELOPE_COLOR,
        size: ENVELOPE_SIZE * self.intro.envelope_scale(now),
      });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::audio::Silence;
  use rand::SeedableRng;

  fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
  }

  fn scene(count: usize, intro: Intro) -> Scene {
    Scene::new(
      TreeParams::default(),
      SnowParams {
        count: 50,
        ..Default::default()
      },
      &CameraParams::default(),
      count,
      intro,
      Box::new(Silence),
      SmallRng::seed_from_u64(9),
    )
  }

  #[test]
  fn first_activation_opens_the_envelope() {
    let mut scene = scene(200, Intro::sealed());
    assert_eq!(scene.opacity(), 0.0);

    assert!(!scene.activate(ms(0)));
    assert!(scene.intro().is_open());
    assert!(scene.tree().is_gathered());

    // still fading in
    assert!(!scene.activate(ms(500)));
    assert!(scene.tree().is_gathered());

    scene.tick(ms(2000));
    assert_eq!(scene.opacity(), 1.0);
    assert!(scene.activate(ms(2000)));
    assert!(!scene.tree().is_gathered());
  }

  #[test]
  fn sealed_scene_shows_the_envelope() {
    let mut scene = scene(100, Intro::sealed());
    assert_eq!(scene.envelope_opacity(), 1.0);
    assert_eq!(scene.envelope_instances().len(), 1);

    let mut sizes = Vec::new();
    for i in 0..30 {
      scene.tick(ms(i * 50));
      assert_eq!(scene.envelope_opacity(), 1.0);
      sizes.push(scene.envelope_instances()[0].size);
    }
    assert!(sizes.windows(2).any(|w| w[0] != w[1]));

    scene.activate(ms(1500));
    scene.tick(ms(1800));
    assert_eq!(scene.envelope_opacity(), 1.0);
    scene.tick(ms(2300));
    let fading = scene.envelope_opacity();
    assert!(fading > 0.0 && fading < 1.0);
    assert!((fading + scene.opacity() - 1.0).abs() < 1e-6);

    scene.tick(ms(2700));
    assert_eq!(scene.envelope_opacity(), 0.0);
    assert!(scene.envelope_instances().is_empty());
  }

  #[test]
  fn skipped_intro_has_no_envelope() {
    let mut scene = scene(100, Intro::revealed());
    assert_eq!(scene.envelope_opacity(), 0.0);
    assert!(scene.envelope_instances().is_empty());
    scene.tick(ms(16));
    assert!(scene.envelope_instances().is_empty());
  }

  #[test]
  fn ambient_rotation_accumulates_with_drag() {
    let mut scene = scene(100, Intro::revealed());
    for i in 0..10 {
      scene.tick(ms(i * 16));
    }
    assert!((scene.rotation().y - 0.01).abs() < 1e-6);
    scene.apply(Action::Rotate { pitch: 0.2, yaw: -0.5 }, ms(160));
    assert!((scene.rotation().x - 0.2).abs() < 1e-6);
    assert!((scene.rotation().y + 0.49).abs() < 1e-6);
  }

  #[test]
  fn toggle_drives_particles_to_scatter() {
    let mut scene = scene(1000, Intro::revealed());
    assert!(scene.activate(ms(0)));
    assert!(!scene.activate(ms(200)));
    assert_eq!(scene.ripples(), 1);

    scene.tick(ms(16));
    assert_eq!(scene.ripple_instances().len(), 1);

    scene.tick(ms(600));
    assert_eq!(scene.tree().positions(), scene.tree().scattered());
    assert_eq!(scene.ripples(), 0);
    assert!(scene.ripple_instances().is_empty());

    let scattered: Vec<[f32; 3]> = scene.tree().scattered().iter().map(|&p| p.into()).collect();
    let uploaded: Vec<[f32; 3]> = scene.tree_instances().iter().map(|p| p.pos).collect();
    assert_eq!(uploaded, scattered);
  }

  #[test]
  fn ripples_expand_and_fade() {
    let mut scene = scene(50, Intro::revealed());
    scene.activate(ms(0));
    scene.tick(ms(100));
    let early = scene.ripple_instances()[0];
    scene.tick(ms(500));
    let late = scene.ripple_instances()[0];
    assert!(late.size > early.size);
    assert!(late.color[0] < early.color[0]);
  }

  #[test]
  fn wheel_moves_the_camera() {
    let mut scene = scene(50, Intro::revealed());
    scene.apply(Action::Zoom { delta: -100.0 }, ms(0));
    scene.tick(ms(250));
    assert_eq!(scene.zoom().camera_z(), 24.5);
  }

  #[test]
  fn instance_buffers_keep_their_size() {
    let mut scene = scene(321, Intro::revealed());
    for i in 0..5 {
      scene.activate(ms(i * 400));
      scene.tick(ms(i * 400 + 16));
      assert_eq!(scene.tree_instances().len(), 321);
      assert_eq!(scene.snow_instances().len(), 50);
    }
    assert_eq!(scene.frame(), 5);
  }
}
