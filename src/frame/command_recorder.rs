use std::sync::Arc;

use ash::vk;
use log::trace;

use super::gpu::{CommandEncoder, FrameDevice};
use super::scene::Drawable;
use super::surface_chain::RenderTargets;
use crate::error::{FrameError, FrameResult};

/// One resettable primary command buffer per frame slot.
///
/// Does not know if GPU still executes a buffer. Frame pump only resets a
/// slot after waiting on the slot's fence.
pub struct CommandRecorder<D: FrameDevice> {
  device: Arc<D>,
  pool: vk::CommandPool,
  cmd_buffers: Vec<vk::CommandBuffer>,
}

impl<D: FrameDevice> CommandRecorder<D> {
  pub fn new(device: Arc<D>, frames_in_flight: usize) -> FrameResult<Self> {
    let pool = device.create_command_pool(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)?;
    let mut result = Self {
      device,
      pool,
      cmd_buffers: Vec::new(),
    };
    result.cmd_buffers = result
      .device
      .allocate_command_buffers(pool, frames_in_flight as u32)?;
    trace!("Allocated {} frame command buffers", frames_in_flight);
    Ok(result)
  }

  pub fn command_buffer(&self, slot: usize) -> vk::CommandBuffer {
    self.cmd_buffers[slot]
  }

  pub fn reset(&mut self, slot: usize) -> FrameResult<()> {
    self.device.reset_command_buffer(self.cmd_buffers[slot])
  }

  /// Re-record the slot's buffer to draw `drawables` into `framebuffers[image_index]`.
  pub fn record(
    &mut self,
    slot: usize,
    targets: &RenderTargets,
    drawables: &[Drawable],
    image_index: u32,
    clear_values: &[vk::ClearValue],
  ) -> FrameResult<vk::CommandBuffer> {
    let cmd = self.cmd_buffers[slot];
    record_draw_list(
      self.device.as_ref(),
      cmd,
      targets,
      drawables,
      image_index,
      clear_values,
    )?;
    Ok(cmd)
  }
}

impl<D: FrameDevice> Drop for CommandRecorder<D> {
  /// Device has to be idle.
  fn drop(&mut self) {
    self.device.free_command_buffers(self.pool, &self.cmd_buffers);
    self.device.destroy_command_pool(self.pool);
  }
}

/// begin, render pass over the whole image, pipeline, then one indexed draw per drawable.
pub fn record_draw_list<E: CommandEncoder + ?Sized>(
  encoder: &E,
  cmd: vk::CommandBuffer,
  targets: &RenderTargets,
  drawables: &[Drawable],
  image_index: u32,
  clear_values: &[vk::ClearValue],
) -> FrameResult<()> {
  let framebuffer = targets
    .framebuffers
    .get(image_index as usize)
    .copied()
    .ok_or(FrameError::ImageIndexOutOfRange {
      index: image_index,
      count: targets.framebuffers.len(),
    })?;

  encoder.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

  let render_area = vk::Rect2D {
    offset: vk::Offset2D { x: 0, y: 0 },
    extent: targets.extent,
  };
  encoder.cmd_begin_render_pass(
    cmd,
    targets.render_pass,
    framebuffer,
    render_area,
    clear_values,
  );
  encoder.cmd_bind_pipeline(cmd, targets.pipeline);

  for drawable in drawables {
    encoder.cmd_bind_vertex_buffer(cmd, drawable.vertex_buffer);
    encoder.cmd_bind_index_buffer(cmd, drawable.index_buffer);
    if let Some(set) = drawable.descriptor_set {
      encoder.cmd_bind_descriptor_set(cmd, targets.pipeline_layout, set);
    }
    encoder.cmd_draw_indexed(cmd, drawable.index_count, drawable.instance_index);
  }

  encoder.cmd_end_render_pass(cmd);
  encoder.end_command_buffer(cmd)
}
