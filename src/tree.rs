use crate::initialize::{create_scatter, create_tree, Partition};
use crate::tween::{Easing, Tween, TweenPool};
use crate::{PointInstance, TreeParams};
use cgmath::Vector3;
use log::debug;
use rand::Rng;
use std::time::Duration;

/// Every tree particle plus the gathered/dispersed toggle.
pub struct ParticleSystem {
  params: TreeParams,
  partition: Partition,
  positions: Vec<Vector3<f32>>,
  gathered: Vec<Vector3<f32>>,
  scattered: Vec<Vector3<f32>>,
  colors: Vec<Vector3<f32>>,
  sizes: Vec<f32>,
  tweens: TweenPool<Vector3<f32>>,
  is_gathered: bool,
  last_toggle: Option<Duration>,
}

impl ParticleSystem {
  pub fn new<R: Rng + ?Sized>(params: TreeParams, count: usize, rng: &mut R) -> Self {
    let shape = create_tree(&params, count, rng);
    let scattered = create_scatter(&params, count, rng);
    Self {
      params,
      partition: shape.partition,
      gathered: shape.positions.clone(),
      positions: shape.positions,
      scattered,
      colors: shape.colors,
      sizes: shape.sizes,
      tweens: TweenPool::new(count),
      is_gathered: true,
      last_toggle: None,
    }
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn partition(&self) -> &Partition {
    &self.partition
  }

  pub fn is_gathered(&self) -> bool {
    self.is_gathered
  }

  pub fn positions(&self) -> &[Vector3<f32>] {
    &self.positions
  }

  pub fn gathered(&self) -> &[Vector3<f32>] {
    &self.gathered
  }

  pub fn scattered(&self) -> &[Vector3<f32>] {
    &self.scattered
  }

  pub fn colors(&self) -> &[Vector3<f32>] {
    &self.colors
  }

  pub fn sizes(&self) -> &[f32] {
    &self.sizes
  }

  pub fn active_tweens(&self) -> usize {
    self.tweens.active()
  }

  pub fn tween(&self, index: usize) -> Option<&Tween<Vector3<f32>>> {
    self.tweens.get(index)
  }

  /// The set every particle is currently heading for.
  pub fn targets(&self) -> &[Vector3<f32>] {
    if self.is_gathered {
      &self.gathered
    } else {
      &self.scattered
    }
  }

  /// Flip between gathered and dispersed. Activations inside the cooldown
  /// window are dropped; returns whether the toggle was accepted.
  pub fn toggle(&mut self, now: Duration) -> bool {
    if let Some(last) = self.last_toggle {
      if now.saturating_sub(last) < self.params.toggle_cooldown {
        debug!("toggle ignored, {:?} since last", now.saturating_sub(last));
        return false;
      }
    }
    self.last_toggle = Some(now);
    self.is_gathered = !self.is_gathered;
    debug!("toggle accepted, gathered = {}", self.is_gathered);
    self.retarget(now);
    true
  }

  fn retarget(&mut self, now: Duration) {
    let duration = self.params.tween_duration;
    let targets = if self.is_gathered {
      &self.gathered
    } else {
      &self.scattered
    };
    for (i, (&start, &target)) in self.positions.iter().zip(targets.iter()).enumerate() {
      self
        .tweens
        .start(i, Tween::new(start, target, now, duration, Easing::QuadraticInOut));
    }
  }

  pub fn advance(&mut self, now: Duration) {
    self.tweens.advance(now, &mut self.positions);
  }

  /// Phase-staggered breathing with fresh amplitude noise every frame.
  pub fn pulse_star<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
    let t = now.as_secs_f64() * 1000.0 * 0.002;
    for (i, size) in self.sizes[self.partition.star.clone()].iter_mut().enumerate() {
      let pulse = 0.8 + 0.2 * (t + i as f64).sin() as f32;
      *size = (3.0 + rng.gen::<f32>() * 2.0) * pulse;
    }
  }

  pub fn write_instances(&self, out: &mut Vec<PointInstance>) {
    out.clear();
    out.extend(
      self
        .positions
        .iter()
        .zip(&self.colors)
        .zip(&self.sizes)
        .map(|((pos, color), &size)| PointInstance {
          pos: (*pos).into(),
          color: (*color).into(),
          size,
        }),
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::SmallRng, SeedableRng};

  fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
  }

  fn system(count: usize) -> (ParticleSystem, SmallRng) {
    let mut rng = SmallRng::seed_from_u64(42);
    let system = ParticleSystem::new(TreeParams::default(), count, &mut rng);
    (system, rng)
  }

  #[test]
  fn starts_gathered_at_creation_positions() {
    let (system, _) = system(500);
    assert!(system.is_gathered());
    assert_eq!(system.positions(), system.gathered());
    assert_eq!(system.scattered().len(), 500);
    assert_eq!(system.active_tweens(), 0);
  }

  #[test]
  fn cooldown_drops_rapid_toggles() {
    let (mut system, _) = system(100);
    assert!(system.toggle(ms(0)));
    assert!(!system.toggle(ms(200)));
    assert!(!system.is_gathered());
  }

  #[test]
  fn cooldown_ends_at_exactly_300_ms() {
    let (mut system, _) = system(100);
    assert!(system.toggle(ms(0)));
    assert!(!system.toggle(ms(299)));
    assert!(!system.is_gathered());
    assert!(system.toggle(ms(300)));
    assert!(system.is_gathered());
  }

  #[test]
  fn targets_follow_the_toggle() {
    let (mut system, _) = system(200);
    assert_eq!(system.targets(), system.gathered());
    system.toggle(ms(0));
    assert_eq!(system.targets(), system.scattered());
    system.toggle(ms(400));
    assert_eq!(system.targets(), system.gathered());
  }

  #[test]
  fn medium_tier_scenario() {
    let (mut system, _) = system(6500);
    assert!(system.toggle(ms(0)));
    assert!(!system.is_gathered());
    assert_eq!(system.active_tweens(), 6500);
    for i in [0, 12, 987, 6499] {
      assert_eq!(system.tween(i).map(|t| t.target), Some(system.scattered()[i]));
    }

    assert!(!system.toggle(ms(100)));
    assert!(!system.is_gathered());

    assert!(system.toggle(ms(350)));
    assert!(system.is_gathered());
    // retargeted, not queued
    assert_eq!(system.active_tweens(), 6500);
    assert_eq!(system.tween(0).map(|t| t.target), Some(system.gathered()[0]));
  }

  #[test]
  fn disperse_lands_on_scatter_after_duration() {
    let (mut system, _) = system(800);
    system.toggle(ms(0));
    system.advance(ms(300));
    assert_ne!(system.positions(), system.gathered());
    system.advance(ms(600));
    assert_eq!(system.positions(), system.scattered());
    assert_eq!(system.active_tweens(), 0);
  }

  #[test]
  fn retarget_starts_from_live_position() {
    let (mut system, _) = system(50);
    system.toggle(ms(0));
    system.advance(ms(400));
    let midway = system.positions()[20];

    assert!(system.toggle(ms(400)));
    let tween = system.tween(20).copied().unwrap();
    assert_eq!(tween.start, midway);
    assert_eq!(tween.started, ms(400));

    system.advance(ms(1000));
    assert_eq!(system.positions(), system.gathered());
  }

  #[test]
  fn gathered_targets_survive_cycles() {
    let (mut system, _) = system(300);
    let original = system.gathered().to_vec();
    let mut now = 0;
    for _ in 0..4 {
      system.toggle(ms(now));
      now += 250;
      system.advance(ms(now));
      now += 100;
    }
    system.advance(ms(now + 600));
    assert!(system.is_gathered());
    assert_eq!(system.gathered(), original.as_slice());
    assert_eq!(system.positions(), original.as_slice());
  }

  #[test]
  fn star_pulse_stays_in_envelope() {
    let (mut system, mut rng) = system(100);
    let crown_before = system.sizes()[50];
    for frame in 0..120 {
      system.pulse_star(ms(frame * 16), &mut rng);
      for &size in &system.sizes()[0..12] {
        assert!((1.8..=5.0).contains(&size), "size {size}");
      }
    }
    assert_eq!(system.sizes()[50], crown_before);
  }

  #[test]
  fn instances_mirror_attributes() {
    let (system, _) = system(64);
    let mut out = vec![PointInstance::default(); 3];
    system.write_instances(&mut out);
    assert_eq!(out.len(), 64);
    let pos: [f32; 3] = system.positions()[5].into();
    let color: [f32; 3] = system.colors()[5].into();
    assert_eq!(out[5].pos, pos);
    assert_eq!(out[5].color, color);
    assert_eq!(out[5].size, system.sizes()[5]);
    assert_eq!(system.colors().len(), 64);
    assert_eq!(system.colors()[0], Vector3::new(1.0, 1.0, 0.3));
  }
}
