/// Coarse device class that sets the tree's particle budget.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PerformanceTier {
  Low,
  Medium,
  High,
}

impl PerformanceTier {
  pub fn particle_count(self) -> usize {
    match self {
      PerformanceTier::Low => 5000,
      PerformanceTier::Medium => 6500,
      PerformanceTier::High => 8000,
    }
  }
}

const HIGH_END_GPUS: [&str; 7] = ["RTX", "GTX", "RX ", "Radeon RX", "GeForce", "Quadro", "Titan"];

/// What we know about the graphics adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GpuInfo {
  pub name: String,
  pub software: bool,
}

impl From<&wgpu::AdapterInfo> for GpuInfo {
  fn from(info: &wgpu::AdapterInfo) -> Self {
    Self {
      name: info.name.clone(),
      software: info.device_type == wgpu::DeviceType::Cpu,
    }
  }
}

/// Pick a tier from the logical viewport width and the adapter, if any.
/// Narrow viewports are treated as phones whatever the GPU says.
pub fn classify(viewport_width: f64, gpu: Option<&GpuInfo>) -> PerformanceTier {
  if viewport_width < 768.0 {
    return if viewport_width < 480.0 {
      PerformanceTier::Low
    } else {
      PerformanceTier::Medium
    };
  }

  let Some(gpu) = gpu else {
    return PerformanceTier::Low;
  };
  if gpu.software {
    return PerformanceTier::Low;
  }
  if gpu.name.is_empty() {
    return PerformanceTier::Medium;
  }

  if HIGH_END_GPUS.iter().any(|needle| gpu.name.contains(needle)) {
    PerformanceTier::High
  } else {
    PerformanceTier::Medium
  }
}
