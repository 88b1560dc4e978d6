use crate::{Sampling, TreeParams};
use cgmath::Vector3;
use rand::Rng;
use rand_distr::{Distribution, UnitBall, UnitDisc};
use std::f32::consts::PI;
use std::ops::Range;

pub const STAR_PARTICLES: usize = 12;

const STAR_COLOR: [f32; 3] = [1.0, 1.0, 0.3];
const TRUNK_COLOR: [f32; 3] = [0.55, 0.27, 0.07];
const RED_LIGHT: [f32; 3] = [1.0, 0.0, 0.0];
const YELLOW_LIGHT: [f32; 3] = [1.0, 1.0, 0.0];

/// Contiguous index ranges of the three parts of the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
  pub star: Range<usize>,
  pub trunk: Range<usize>,
  pub crown: Range<usize>,
}

impl Partition {
  #[must_use]
  pub fn new(total: usize, trunk_percent: usize) -> Self {
    let star_end = STAR_PARTICLES.min(total);
    let trunk_end = (star_end + total * trunk_percent / 100).min(total);
    Self {
      star: 0..star_end,
      trunk: star_end..trunk_end,
      crown: trunk_end..total,
    }
  }

  pub fn total(&self) -> usize {
    self.crown.end
  }
}

/// Gathered layout of the tree. `positions` doubles as the live and the
/// gathered position at creation time.
pub struct TreeShape {
  pub partition: Partition,
  pub positions: Vec<Vector3<f32>>,
  pub colors: Vec<Vector3<f32>>,
  pub sizes: Vec<f32>,
}

impl TreeShape {
  fn with_capacity(partition: Partition) -> Self {
    let total = partition.total();
    Self {
      partition,
      positions: Vec::with_capacity(total),
      colors: Vec::with_capacity(total),
      sizes: Vec::with_capacity(total),
    }
  }

  fn push(&mut self, pos: Vector3<f32>, color: [f32; 3], size: f32) {
    self.positions.push(pos);
    self.colors.push(color.into());
    self.sizes.push(size);
  }
}

#[must_use]
pub fn create_tree<R: Rng + ?Sized>(params: &TreeParams, count: usize, rng: &mut R) -> TreeShape {
  let mut shape = TreeShape::with_capacity(Partition::new(count, params.trunk_percent));

  star(params, &mut shape, rng);
  for _ in shape.partition.trunk.clone() {
    trunk(params, &mut shape, rng);
  }
  for _ in shape.partition.crown.clone() {
    crown(params, &mut shape, rng);
  }

  debug_assert_eq!(shape.positions.len(), count);
  shape
}

/// Initial sizes only; the frame driver resamples them every tick.
fn star<R: Rng + ?Sized>(params: &TreeParams, shape: &mut TreeShape, rng: &mut R) {
  let center = Vector3::new(0.0, params.star_height + params.y_offset, 0.0);
  let count = shape.partition.star.len();
  for i in 0..count {
    let angle = i as f32 / STAR_PARTICLES as f32 * 2.0 * PI;
    // alternate outer and inner points
    let radius = if i % 2 == 0 {
      params.star_radius
    } else {
      params.star_radius * 0.5
    };
    let pos = center + Vector3::new(angle.cos() * radius, angle.sin() * radius, 0.0);
    shape.push(pos, STAR_COLOR, 3.0 + rng.gen::<f32>() * 2.0);
  }
}

fn trunk<R: Rng + ?Sized>(params: &TreeParams, shape: &mut TreeShape, rng: &mut R) {
  let (x, z) = match params.sampling {
    Sampling::Original => {
      let angle = rng.gen::<f32>() * 2.0 * PI;
      let radius = rng.gen::<f32>() * params.trunk_radius;
      (angle.cos() * radius, angle.sin() * radius)
    }
    Sampling::Uniform => {
      let [x, z]: [f32; 2] = UnitDisc.sample(rng);
      (x * params.trunk_radius, z * params.trunk_radius)
    }
  };
  let height = rng.gen::<f32>() * params.trunk_height - params.trunk_height / 2.0;
  let pos = Vector3::new(x, height + params.y_offset, z);
  shape.push(pos, TRUNK_COLOR, 2.0 + rng.gen::<f32>());
}

fn crown<R: Rng + ?Sized>(params: &TreeParams, shape: &mut TreeShape, rng: &mut R) {
  let crown_height = params.crown_height;
  let height = match params.sampling {
    Sampling::Original => rng.gen::<f32>() * crown_height + params.crown_floor,
    Sampling::Uniform => {
      // the cone radius is proportional to (crown_height - height), so weight
      // heights by that squared to keep the volume density flat
      let lo = crown_height - (params.crown_floor + crown_height);
      let hi = crown_height - params.crown_floor;
      let (lo3, hi3) = (lo.powi(3), hi.powi(3));
      let a = (lo3 + rng.gen::<f32>() * (hi3 - lo3)).cbrt();
      crown_height - a
    }
  };
  let radius = params.crown_base_radius * (1.0 - height / crown_height);

  let (x, z) = match params.sampling {
    Sampling::Original => {
      let angle = rng.gen::<f32>() * 2.0 * PI;
      (
        angle.cos() * radius * rng.gen::<f32>(),
        angle.sin() * radius * rng.gen::<f32>(),
      )
    }
    Sampling::Uniform => {
      let [x, z]: [f32; 2] = UnitDisc.sample(rng);
      (x * radius, z * radius)
    }
  };
  let pos = Vector3::new(x, height + params.y_offset, z);

  // larger at the bottom, smaller at the top
  let size = 1.0 + (1.0 - height / crown_height);

  // 90% green, 10% string lights split between red and yellow
  let roll = rng.gen::<f32>();
  let color = if roll < 0.05 {
    RED_LIGHT
  } else if roll < 0.1 {
    YELLOW_LIGHT
  } else {
    [0.0, 0.2 + rng.gen::<f32>() * 0.15, 0.0]
  };

  shape.push(pos, color, size);
}

/// Dispersed targets, one per particle.
#[must_use]
pub fn create_scatter<R: Rng + ?Sized>(
  params: &TreeParams,
  count: usize,
  rng: &mut R,
) -> Vec<Vector3<f32>> {
  let radius = params.scatter_radius;
  (0..count)
    .map(|_| match params.sampling {
      Sampling::Original => {
        let theta = rng.gen::<f32>() * 2.0 * PI;
        let phi = rng.gen::<f32>() * PI;
        Vector3::new(
          phi.sin() * theta.cos() * radius * rng.gen::<f32>(),
          phi.cos() * radius * rng.gen::<f32>(),
          phi.sin() * theta.sin() * radius * rng.gen::<f32>(),
        )
      }
      Sampling::Uniform => {
        let [x, y, z]: [f32; 3] = UnitBall.sample(rng);
        Vector3::new(x, y, z) * radius
      }
    })
    .collect()
}
