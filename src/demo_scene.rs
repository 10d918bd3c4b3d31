use ash::vk;
use glam::{vec2, vec3, vec4, Vec2, Vec3, Vec4};
use log::debug;

use vk_frame_pump::error::FrameResult;
use vk_frame_pump::frame::{Drawable, FrameContext, FrameScene, ResourceUploader};
use vk_frame_pump::vk_ctx::VkCtxDevice;
use vk_frame_pump::vk_utils::{
  allocate_descriptor_sets, create_descriptor_set_layout, create_ubo_binding,
  create_ubo_descriptor_pool, write_ubo_descriptor, DeviceOwned, VertexInputDescription, VkBuffer,
  VkMemoryPreference,
};

/// Log frame time every _this many_ frames.
const STATS_INTERVAL: u64 = 600;

#[derive(Copy, Clone, Debug)] // , bytemuck::Zeroable, bytemuck::Pod
#[repr(C)]
pub struct DemoVertex {
  pos: Vec2,
  color: Vec3,
}
unsafe impl bytemuck::Zeroable for DemoVertex {}
unsafe impl bytemuck::Pod for DemoVertex {}

impl DemoVertex {
  pub fn new(pos: (f32, f32), col: (f32, f32, f32)) -> Self {
    Self {
      pos: vec2(pos.0, pos.1),
      color: vec3(col.0, col.1, col.2),
    }
  }

  pub fn input_description() -> VertexInputDescription {
    VertexInputDescription {
      bindings: vec![vk::VertexInputBindingDescription {
        binding: 0,
        input_rate: vk::VertexInputRate::VERTEX,
        stride: std::mem::size_of::<DemoVertex>() as u32,
      }],
      attributes: vec![
        vk::VertexInputAttributeDescription {
          binding: 0,
          location: 0,
          format: vk::Format::R32G32_SFLOAT,
          offset: 0,
        },
        vk::VertexInputAttributeDescription {
          binding: 0,
          location: 1,
          format: vk::Format::R32G32B32_SFLOAT,
          offset: std::mem::size_of::<Vec2>() as u32,
        },
      ],
    }
  }
}

/// Per-frame uniforms, std140. One buffer per frame slot.
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct DemoUniforms {
  /// Indexed with `gl_InstanceIndex`, xy is used
  instance_offsets: [Vec4; DEMO_INSTANCES],
  /// x: seconds elapsed, y: aspect ratio (height / width)
  params: Vec4,
}
unsafe impl bytemuck::Zeroable for DemoUniforms {}
unsafe impl bytemuck::Pod for DemoUniforms {}

const DEMO_INSTANCES: usize = 2;

impl DemoUniforms {
  pub fn at(elapsed: f32, extent: vk::Extent2D) -> Self {
    let bob = 0.25 * elapsed.sin();
    let aspect = if extent.width == 0 {
      1.0
    } else {
      extent.height as f32 / extent.width as f32
    };
    Self {
      instance_offsets: [vec4(-0.5, bob, 0.0, 0.0), vec4(0.5, -bob, 0.0, 0.0)],
      params: vec4(elapsed, aspect, 0.0, 0.0),
    }
  }
}

/// Two instances of one colored quad, counter-clockwise with y up. Instance
/// offsets come from the uniform buffer of the frame slot being recorded.
pub struct DemoScene {
  vertex_buffer: VkBuffer,
  index_buffer: VkBuffer,
  index_count: u32,
  frame_uniforms: Vec<VkBuffer>,
  // freed with the pool
  descriptor_sets: Vec<vk::DescriptorSet>,
  _descriptor_pool: DeviceOwned<vk::DescriptorPool>,
  descriptor_set_layout: DeviceOwned<vk::DescriptorSetLayout>,
  slot: usize,
  elapsed: f32,
}

impl DemoScene {
  pub fn new(
    uploader: &ResourceUploader<VkCtxDevice>,
    frames_in_flight: usize,
  ) -> FrameResult<Self> {
    let device = uploader.device();
    let vertices = [
      DemoVertex::new((-0.3, -0.3), (1.0, 0.0, 0.0)),
      DemoVertex::new((0.3, -0.3), (0.0, 1.0, 0.0)),
      DemoVertex::new((0.3, 0.3), (0.0, 0.0, 1.0)),
      DemoVertex::new((-0.3, 0.3), (1.0, 1.0, 1.0)),
    ];
    let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];

    let vertex_buffer = VkBuffer::device_local_from_data(
      uploader,
      String::from("demo-vertices"),
      bytemuck::cast_slice(&vertices),
      vk::BufferUsageFlags::VERTEX_BUFFER,
    )?;
    let index_buffer = VkBuffer::device_local_from_data(
      uploader,
      String::from("demo-indices"),
      bytemuck::cast_slice(&indices),
      vk::BufferUsageFlags::INDEX_BUFFER,
    )?;

    let descriptor_set_layout = create_descriptor_set_layout(
      device,
      &[create_ubo_binding(0, vk::ShaderStageFlags::VERTEX)],
    )?;
    let descriptor_pool = create_ubo_descriptor_pool(device, frames_in_flight as u32)?;
    let descriptor_sets = allocate_descriptor_sets(
      device,
      *descriptor_pool,
      *descriptor_set_layout,
      frames_in_flight,
    )?;

    let mut frame_uniforms = Vec::with_capacity(frames_in_flight);
    for (slot, set) in descriptor_sets.iter().enumerate() {
      let buffer = VkBuffer::empty(
        device,
        format!("demo-uniforms-{}", slot),
        std::mem::size_of::<DemoUniforms>(),
        vk::BufferUsageFlags::UNIFORM_BUFFER,
        VkMemoryPreference::GpuMappable,
      )?;
      write_ubo_descriptor(device, *set, 0, &buffer);
      frame_uniforms.push(buffer);
    }

    Ok(Self {
      vertex_buffer,
      index_buffer,
      index_count: indices.len() as u32,
      frame_uniforms,
      descriptor_sets,
      _descriptor_pool: descriptor_pool,
      descriptor_set_layout,
      slot: 0,
      elapsed: 0.0,
    })
  }

  /// For the pipeline layout, set 0.
  pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
    *self.descriptor_set_layout
  }
}

impl FrameScene for DemoScene {
  fn update_frame(&mut self, ctx: &FrameContext) -> FrameResult<()> {
    self.elapsed += ctx.delta_time;
    // GPU is done with this slot's buffer, safe to overwrite
    self.slot = ctx.slot;
    let uniforms = DemoUniforms::at(self.elapsed, ctx.extent);
    self.frame_uniforms[ctx.slot].write_bytes(bytemuck::bytes_of(&uniforms))?;

    if ctx.frame_idx % STATS_INTERVAL == 0 {
      debug!(
        "Frame {}: {:.2}ms, {:.1}s elapsed, {}x{}",
        ctx.frame_idx,
        ctx.delta_time * 1000.0,
        self.elapsed,
        ctx.extent.width,
        ctx.extent.height
      );
    }
    Ok(())
  }

  fn drawables(&self) -> Vec<Drawable> {
    (0..DEMO_INSTANCES as u32)
      .map(|instance_index| Drawable {
        vertex_buffer: self.vertex_buffer.buffer,
        index_buffer: self.index_buffer.buffer,
        index_count: self.index_count,
        instance_index,
        descriptor_set: Some(self.descriptor_sets[self.slot]),
      })
      .collect()
  }
}
