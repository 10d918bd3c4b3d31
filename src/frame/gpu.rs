use ash::vk;

use crate::error::FrameResult;

/// Commands the frame loop records. Kept narrow so recording order can be
/// checked without a GPU.
pub trait CommandEncoder {
  fn begin_command_buffer(
    &self,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
  ) -> FrameResult<()>;
  fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> FrameResult<()>;
  fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> FrameResult<()>;

  fn cmd_begin_render_pass(
    &self,
    cmd: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    render_area: vk::Rect2D,
    clear_values: &[vk::ClearValue],
  );
  fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
  fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer);
  /// Indices are always `u32`.
  fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer);
  fn cmd_bind_descriptor_set(
    &self,
    cmd: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    set: vk::DescriptorSet,
  );
  fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32, first_instance: u32);
  fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);
}

/// One graphics queue submission. All semaphores are binary.
#[derive(Debug, Clone, Copy)]
pub struct QueueSubmission {
  pub command_buffer: vk::CommandBuffer,
  pub wait: Option<(vk::Semaphore, vk::PipelineStageFlags)>,
  pub signal: Option<vk::Semaphore>,
  /// `vk::Fence::null()` for none
  pub fence: vk::Fence,
}

/// Device-level operations used by the frame slots and the uploader.
///
/// Waits use an infinite timeout. Any status other than success is an error.
pub trait FrameDevice: CommandEncoder {
  fn create_fence(&self, signaled: bool) -> FrameResult<vk::Fence>;
  fn destroy_fence(&self, fence: vk::Fence);
  fn create_semaphore(&self) -> FrameResult<vk::Semaphore>;
  fn destroy_semaphore(&self, semaphore: vk::Semaphore);

  fn wait_for_fence(&self, fence: vk::Fence) -> FrameResult<()>;
  fn reset_fence(&self, fence: vk::Fence) -> FrameResult<()>;
  fn fence_signaled(&self, fence: vk::Fence) -> FrameResult<bool>;

  /// Pool on the graphics queue family.
  fn create_command_pool(&self, flags: vk::CommandPoolCreateFlags)
    -> FrameResult<vk::CommandPool>;
  fn destroy_command_pool(&self, pool: vk::CommandPool);
  fn allocate_command_buffers(
    &self,
    pool: vk::CommandPool,
    count: u32,
  ) -> FrameResult<Vec<vk::CommandBuffer>>;
  fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);

  fn submit_graphics(&self, submission: &QueueSubmission) -> FrameResult<()>;
  fn graphics_queue_wait_idle(&self) -> FrameResult<()>;
  fn wait_idle(&self) -> FrameResult<()>;
}
