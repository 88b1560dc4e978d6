use crate::scene::Scene;
use crate::PointInstance;
use cgmath::{Matrix4, SquareMatrix};
use std::borrow::Cow;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

/// World size of one unit of particle size.
const POINT_SCALE: f32 = 0.06;

const SHAPE_DISC: u32 = 0;
const SHAPE_RING: u32 = 1;
const SHAPE_ENVELOPE: u32 = 2;

const NIGHT: wgpu::Color = wgpu::Color {
  r: 0.005,
  g: 0.008,
  b: 0.025,
  a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LayerUniform {
  model: [[f32; 4]; 4],
  opacity: f32,
  point_scale: f32,
  shape: u32,
  screen_space: u32,
}

impl LayerUniform {
  fn world(shape: u32) -> Self {
    Self {
      model: Matrix4::identity().into(),
      opacity: 1.0,
      point_scale: POINT_SCALE,
      shape,
      screen_space: 0,
    }
  }
}

/// One instanced draw: a fixed-capacity instance buffer plus its uniform.
struct Layer {
  instances: wgpu::Buffer,
  capacity: usize,
  count: u32,
  uniform: LayerUniform,
  uniform_buffer: wgpu::Buffer,
  bind_group: wgpu::BindGroup,
}

impl Layer {
  fn new(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    capacity: usize,
    uniform: LayerUniform,
  ) -> Self {
    let instances = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some(&format!("{label} Instance Buffer")),
      size: (capacity.max(1) * std::mem::size_of::<PointInstance>()) as u64,
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some(&format!("{label} Layer Buffer")),
      contents: bytemuck::cast_slice(&[uniform]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: uniform_buffer.as_entire_binding(),
      }],
      label: Some(label),
    });
    Self {
      instances,
      capacity,
      count: 0,
      uniform,
      uniform_buffer,
      bind_group,
    }
  }

  fn upload(&mut self, queue: &wgpu::Queue, data: &[PointInstance]) {
    let data = &data[..data.len().min(self.capacity)];
    self.count = data.len() as u32;
    if !data.is_empty() {
      queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(data));
    }
    queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniform]));
  }

  fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>) {
    if self.count == 0 {
      return;
    }
    rpass.set_bind_group(1, &self.bind_group, &[]);
    rpass.set_vertex_buffer(0, self.instances.slice(..));
    rpass.draw(0..6, 0..self.count);
  }
}

pub struct Render {
  render_pipeline: wgpu::RenderPipeline,
  corners_buffer: wgpu::Buffer,
  snow: Layer,
  tree: Layer,
  ripple: Layer,
  envelope: Layer,
}

impl Render {
  #[must_use]
  pub fn init(
    config: &wgpu::SurfaceConfiguration,
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    scene: &Scene,
  ) -> Self {
    let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("points"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/points.wgsl"))),
    });

    let layer_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<LayerUniform>() as _),
          },
          count: None,
        }],
        label: Some("layer_bind_group_layout"),
      });

    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("render"),
      bind_group_layouts: &[camera_bind_group_layout, &layer_bind_group_layout],
      push_constant_ranges: &[],
    });
    let instance_buffer = wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<PointInstance>() as _, // pos3 + color3 + size
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32],
    };
    let corner_buffer = wgpu::VertexBufferLayout {
      array_stride: 2 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![3 => Float32x2],
    };
    // additive, so overlapping points glow and draw order does not matter
    let additive = wgpu::BlendComponent {
      src_factor: wgpu::BlendFactor::One,
      dst_factor: wgpu::BlendFactor::One,
      operation: wgpu::BlendOperation::Add,
    };
    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Render Pipeline"),
      layout: Some(&render_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &draw_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[instance_buffer, corner_buffer],
      },
      fragment: Some(wgpu::FragmentState {
        module: &draw_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(wgpu::ColorTargetState {
          format: config.view_formats[0],
          blend: Some(wgpu::BlendState {
            color: additive,
            alpha: additive,
          }),
          write_mask: wgpu::ColorWrites::ALL,
        })],
      }),
      primitive: wgpu::PrimitiveState::default(),
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    // two triangles covering [-1, 1]^2
    let corners: [[f32; 2]; 6] = [
      [-1.0, -1.0],
      [1.0, -1.0],
      [1.0, 1.0],
      [-1.0, -1.0],
      [1.0, 1.0],
      [-1.0, 1.0],
    ];
    let corners_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Corner Buffer"),
      contents: bytemuck::cast_slice(&corners),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let snow = Layer::new(
      device,
      &layer_bind_group_layout,
      "Snow",
      scene.snow_instances().len(),
      LayerUniform::world(SHAPE_DISC),
    );
    let tree = Layer::new(
      device,
      &layer_bind_group_layout,
      "Tree",
      scene.tree_instances().len(),
      LayerUniform::world(SHAPE_DISC),
    );
    let ripple = Layer::new(
      device,
      &layer_bind_group_layout,
      "Ripple",
      Scene::MAX_RIPPLES,
      LayerUniform {
        point_scale: 1.0,
        screen_space: 1,
        ..LayerUniform::world(SHAPE_RING)
      },
    );

    let envelope = Layer::new(
      device,
      &layer_bind_group_layout,
      "Envelope",
      1,
      LayerUniform {
        point_scale: 1.0,
        screen_space: 1,
        ..LayerUniform::world(SHAPE_ENVELOPE)
      },
    );

    Render {
      render_pipeline,
      corners_buffer,
      snow,
      tree,
      ripple,
      envelope,
    }
  }

  /// Upload this frame's instances and draw snow, tree, ripples and the
  /// envelope card.
  pub fn render(
    &mut self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group: &wgpu::BindGroup,
    scene: &Scene,
  ) {
    let opacity = scene.opacity();
    self.tree.uniform.model = scene.model_matrix().into();
    self.tree.uniform.opacity = opacity;
    self.snow.uniform.opacity = opacity;
    self.ripple.uniform.opacity = opacity;
    self.envelope.uniform.opacity = scene.envelope_opacity();
    self.tree.upload(queue, scene.tree_instances());
    self.snow.upload(queue, scene.snow_instances());
    self.ripple.upload(queue, scene.ripple_instances());
    self.envelope.upload(queue, scene.envelope_instances());

    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(NIGHT),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: None,
      color_attachments: &color_attachments,
      depth_stencil_attachment: None,
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      rpass.set_pipeline(&self.render_pipeline);
      rpass.set_bind_group(0, camera_bind_group, &[]);
      rpass.set_vertex_buffer(1, self.corners_buffer.slice(..));
      self.snow.draw(&mut rpass);
      self.tree.draw(&mut rpass);
      self.ripple.draw(&mut rpass);
      self.envelope.draw(&mut rpass);
    }
    queue.submit(Some(command_encoder.finish()));
  }
}
