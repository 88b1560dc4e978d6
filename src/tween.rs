use cgmath::{Vector3, VectorSpace};
use std::time::Duration;

pub trait Lerp: Copy {
  fn lerp(self, other: Self, amount: f32) -> Self;
}

impl Lerp for f32 {
  fn lerp(self, other: Self, amount: f32) -> Self {
    self + (other - self) * amount
  }
}

impl Lerp for Vector3<f32> {
  fn lerp(self, other: Self, amount: f32) -> Self {
    VectorSpace::lerp(self, other, amount)
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Easing {
  Linear,
  QuadraticOut,
  /// Smooth start and smooth end.
  QuadraticInOut,
}

impl Easing {
  pub fn apply(self, k: f32) -> f32 {
    let k = k.clamp(0.0, 1.0);
    match self {
      Easing::Linear => k,
      Easing::QuadraticOut => k * (2.0 - k),
      Easing::QuadraticInOut => {
        if k < 0.5 {
          2.0 * k * k
        } else {
          let k = 2.0 * k - 1.0;
          -0.5 * (k * (k - 2.0) - 1.0)
        }
      }
    }
  }
}

/// A time-bounded transition from `start` to `target`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tween<T> {
  pub start: T,
  pub target: T,
  pub started: Duration,
  pub duration: Duration,
  pub easing: Easing,
}

impl<T: Lerp> Tween<T> {
  pub fn new(start: T, target: T, started: Duration, duration: Duration, easing: Easing) -> Self {
    Self {
      start,
      target,
      started,
      duration,
      easing,
    }
  }

  pub fn progress(&self, now: Duration) -> f32 {
    if self.duration.is_zero() {
      return 1.0;
    }
    let elapsed = now.saturating_sub(self.started);
    (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
  }

  pub fn is_finished(&self, now: Duration) -> bool {
    now.saturating_sub(self.started) >= self.duration
  }

  pub fn value_at(&self, now: Duration) -> T {
    if self.is_finished(now) {
      return self.target;
    }
    self.start.lerp(self.target, self.easing.apply(self.progress(now)))
  }
}

/// Indexed table of in-flight tweens, at most one per slot.
///
/// Starting a tween on a busy slot replaces the old one, so two overlapping
/// transitions never write the same value.
#[derive(Clone, Debug)]
pub struct TweenPool<T> {
  slots: Vec<Option<Tween<T>>>,
  active: usize,
}

impl<T: Lerp> TweenPool<T> {
  pub fn new(len: usize) -> Self {
    Self {
      slots: vec![None; len],
      active: 0,
    }
  }

  /// Returns true if an in-flight tween was superseded.
  pub fn start(&mut self, index: usize, tween: Tween<T>) -> bool {
    let replaced = self.slots[index].replace(tween).is_some();
    if !replaced {
      self.active += 1;
    }
    replaced
  }

  pub fn get(&self, index: usize) -> Option<&Tween<T>> {
    self.slots.get(index).and_then(Option::as_ref)
  }

  pub fn active(&self) -> usize {
    self.active
  }

  /// Write every tween's value for `now` into `values`; finished tweens land
  /// exactly on their target and are dropped.
  pub fn advance(&mut self, now: Duration, values: &mut [T]) {
    if self.active == 0 {
      return;
    }
    for (slot, value) in self.slots.iter_mut().zip(values.iter_mut()) {
      let Some(tween) = slot else { continue };
      *value = tween.value_at(now);
      if tween.is_finished(now) {
        *slot = None;
        self.active -= 1;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
  }

  #[test]
  fn easing_endpoints_and_symmetry() {
    for easing in [Easing::Linear, Easing::QuadraticOut, Easing::QuadraticInOut] {
      assert_eq!(easing.apply(0.0), 0.0);
      assert_eq!(easing.apply(1.0), 1.0);
      let mut last = 0.0;
      for i in 0..=100 {
        let v = easing.apply(i as f32 / 100.0);
        assert!(v >= last);
        last = v;
      }
    }
    let e = Easing::QuadraticInOut;
    assert!((e.apply(0.5) - 0.5).abs() < 1e-6);
    for k in [0.1, 0.25, 0.4] {
      assert!((e.apply(k) + e.apply(1.0 - k) - 1.0).abs() < 1e-6);
    }
    // slow start
    assert!(e.apply(0.1) < 0.1);
  }

  #[test]
  fn scalar_tween() {
    let t = Tween::new(10.0_f32, 20.0, ms(100), ms(200), Easing::Linear);
    assert_eq!(t.value_at(ms(0)), 10.0);
    assert_eq!(t.value_at(ms(100)), 10.0);
    assert!((t.value_at(ms(200)) - 15.0).abs() < 1e-4);
    assert_eq!(t.value_at(ms(300)), 20.0);
    assert!(t.is_finished(ms(300)));
    assert!(!t.is_finished(ms(299)));
  }

  #[test]
  fn pool_lands_on_target_and_drains() {
    let mut values = vec![Vector3::new(0.0, 0.0, 0.0); 3];
    let mut pool = TweenPool::new(3);
    for i in 0..3 {
      let target = Vector3::new(i as f32, 1.0, -2.5);
      pool.start(
        i,
        Tween::new(values[i], target, ms(0), ms(600), Easing::QuadraticInOut),
      );
    }
    assert_eq!(pool.active(), 3);

    pool.advance(ms(300), &mut values);
    assert_eq!(pool.active(), 3);
    assert!((values[2].x - 1.0).abs() < 1e-5);

    pool.advance(ms(600), &mut values);
    assert_eq!(pool.active(), 0);
    assert_eq!(values[2], Vector3::new(2.0, 1.0, -2.5));
    assert!(pool.get(2).is_none());
  }

  #[test]
  fn restarting_a_slot_supersedes_it() {
    let mut values = vec![0.0_f32];
    let mut pool = TweenPool::new(1);
    assert!(!pool.start(0, Tween::new(0.0, 10.0, ms(0), ms(100), Easing::Linear)));
    pool.advance(ms(50), &mut values);
    assert!((values[0] - 5.0).abs() < 1e-4);

    assert!(pool.start(0, Tween::new(values[0], -5.0, ms(50), ms(100), Easing::Linear)));
    assert_eq!(pool.active(), 1);
    pool.advance(ms(100), &mut values);
    assert!(values[0].abs() < 1e-4);
    pool.advance(ms(150), &mut values);
    assert_eq!(values[0], -5.0);
    assert_eq!(pool.active(), 0);
  }
}
