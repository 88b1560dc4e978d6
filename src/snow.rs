use crate::{PointInstance, SnowParams};
use cgmath::Vector3;
use rand::Rng;
use std::time::Duration;

const SNOW_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Independent flakes falling in a loop.
pub struct SnowField {
  params: SnowParams,
  positions: Vec<Vector3<f32>>,
  sizes: Vec<f32>,
}

impl SnowField {
  pub fn new<R: Rng + ?Sized>(params: SnowParams, rng: &mut R) -> Self {
    let mut positions = Vec::with_capacity(params.count);
    let mut sizes = Vec::with_capacity(params.count);
    for _ in 0..params.count {
      positions.push(spawn(&params, params.initial_band, rng));
      sizes.push(params.size + rng.gen::<f32>());
    }
    Self {
      params,
      positions,
      sizes,
    }
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn positions(&self) -> &[Vector3<f32>] {
    &self.positions
  }

  pub fn sizes(&self) -> &[f32] {
    &self.sizes
  }

  /// Returns how many flakes were respawned at the top.
  pub fn update<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> usize {
    let t = now.as_secs_f64() * 1000.0 * 0.002;
    let mut respawned = 0;
    for (i, pos) in self.positions.iter_mut().enumerate() {
      pos.y -= self.params.speed;
      // wind
      pos.x += (t + i as f64 * 0.1).sin() as f32 * self.params.drift;

      if pos.y < self.params.floor {
        *pos = spawn(&self.params, self.params.respawn_band, rng);
        respawned += 1;
      }
    }
    respawned
  }

  pub fn write_instances(&self, out: &mut Vec<PointInstance>) {
    out.clear();
    out.extend(
      self
        .positions
        .iter()
        .zip(&self.sizes)
        .map(|(pos, &size)| PointInstance {
          pos: (*pos).into(),
          color: SNOW_COLOR,
          size,
        }),
    );
  }
}

fn spawn<R: Rng + ?Sized>(params: &SnowParams, band: (f32, f32), rng: &mut R) -> Vector3<f32> {
  Vector3::new(
    (rng.gen::<f32>() - 0.5) * params.spread,
    band.0 + rng.gen::<f32>() * (band.1 - band.0),
    (rng.gen::<f32>() - 0.5) * params.spread,
  )
}
