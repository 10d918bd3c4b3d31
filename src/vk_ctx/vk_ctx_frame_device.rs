use ash::vk;

use super::VkCtxDevice;
use crate::error::{FrameError, FrameResult};
use crate::frame::{CommandEncoder, FrameDevice, QueueSubmission};

impl CommandEncoder for VkCtxDevice {
  fn begin_command_buffer(
    &self,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
  ) -> FrameResult<()> {
    let begin_info = vk::CommandBufferBeginInfo::builder().flags(flags).build();
    unsafe { self.device.begin_command_buffer(cmd, &begin_info)? };
    Ok(())
  }

  fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> FrameResult<()> {
    unsafe { self.device.end_command_buffer(cmd)? };
    Ok(())
  }

  fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> FrameResult<()> {
    unsafe {
      self
        .device
        .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?
    };
    Ok(())
  }

  fn cmd_begin_render_pass(
    &self,
    cmd: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    render_area: vk::Rect2D,
    clear_values: &[vk::ClearValue],
  ) {
    let begin_info = vk::RenderPassBeginInfo::builder()
      .render_pass(render_pass)
      .framebuffer(framebuffer)
      .render_area(render_area)
      .clear_values(clear_values);
    unsafe {
      self
        .device
        .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE)
    };
  }

  fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
    unsafe {
      self
        .device
        .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
    };
  }

  fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
    unsafe { self.device.cmd_bind_vertex_buffers(cmd, 0, &[buffer], &[0]) };
  }

  fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
    unsafe {
      self
        .device
        .cmd_bind_index_buffer(cmd, buffer, 0, vk::IndexType::UINT32)
    };
  }

  fn cmd_bind_descriptor_set(
    &self,
    cmd: vk::CommandBuffer,
    layout: vk::PipelineLayout,
    set: vk::DescriptorSet,
  ) {
    unsafe {
      self.device.cmd_bind_descriptor_sets(
        cmd,
        vk::PipelineBindPoint::GRAPHICS,
        layout,
        0,
        &[set],
        &[],
      )
    };
  }

  fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32, first_instance: u32) {
    unsafe {
      self
        .device
        .cmd_draw_indexed(cmd, index_count, 1, 0, 0, first_instance)
    };
  }

  fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
    unsafe { self.device.cmd_end_render_pass(cmd) };
  }
}

impl FrameDevice for VkCtxDevice {
  fn create_fence(&self, signaled: bool) -> FrameResult<vk::Fence> {
    let flags = if signaled {
      vk::FenceCreateFlags::SIGNALED
    } else {
      vk::FenceCreateFlags::empty()
    };
    let create_info = vk::FenceCreateInfo::builder().flags(flags).build();
    let fence = unsafe { self.device.create_fence(&create_info, None)? };
    Ok(fence)
  }

  fn destroy_fence(&self, fence: vk::Fence) {
    unsafe { self.device.destroy_fence(fence, None) };
  }

  fn create_semaphore(&self) -> FrameResult<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::builder().build();
    let semaphore = unsafe { self.device.create_semaphore(&create_info, None)? };
    Ok(semaphore)
  }

  fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
    unsafe { self.device.destroy_semaphore(semaphore, None) };
  }

  fn wait_for_fence(&self, fence: vk::Fence) -> FrameResult<()> {
    unsafe { self.device.wait_for_fences(&[fence], true, u64::MAX) }
      .map_err(|e| FrameError::unexpected("vkWaitForFences", e))
  }

  fn reset_fence(&self, fence: vk::Fence) -> FrameResult<()> {
    unsafe { self.device.reset_fences(&[fence])? };
    Ok(())
  }

  fn fence_signaled(&self, fence: vk::Fence) -> FrameResult<bool> {
    let signaled = unsafe { self.device.get_fence_status(fence)? };
    Ok(signaled)
  }

  fn create_command_pool(
    &self,
    flags: vk::CommandPoolCreateFlags,
  ) -> FrameResult<vk::CommandPool> {
    let create_info = vk::CommandPoolCreateInfo::builder()
      .queue_family_index(self.queue_families.graphics)
      .flags(flags)
      .build();
    let pool = unsafe { self.device.create_command_pool(&create_info, None)? };
    Ok(pool)
  }

  fn destroy_command_pool(&self, pool: vk::CommandPool) {
    unsafe { self.device.destroy_command_pool(pool, None) };
  }

  fn allocate_command_buffers(
    &self,
    pool: vk::CommandPool,
    count: u32,
  ) -> FrameResult<Vec<vk::CommandBuffer>> {
    let alloc_info = vk::CommandBufferAllocateInfo::builder()
      .command_buffer_count(count)
      .command_pool(pool)
      .level(vk::CommandBufferLevel::PRIMARY)
      .build();
    let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info)? };
    Ok(buffers)
  }

  fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
    if !buffers.is_empty() {
      unsafe { self.device.free_command_buffers(pool, buffers) };
    }
  }

  fn submit_graphics(&self, submission: &QueueSubmission) -> FrameResult<()> {
    let command_buffers = [submission.command_buffer];
    let (wait_semaphores, wait_stages) = match submission.wait {
      Some((semaphore, stage)) => (vec![semaphore], vec![stage]),
      None => (vec![], vec![]),
    };
    let signal_semaphores: Vec<vk::Semaphore> = submission.signal.into_iter().collect();

    let submit_info = vk::SubmitInfo::builder()
      .wait_semaphores(&wait_semaphores)
      .wait_dst_stage_mask(&wait_stages)
      .command_buffers(&command_buffers)
      .signal_semaphores(&signal_semaphores)
      .build();

    unsafe {
      self
        .device
        .queue_submit(self.graphics_queue, &[submit_info], submission.fence)
    }
    .map_err(|e| FrameError::unexpected("vkQueueSubmit", e))
  }

  fn graphics_queue_wait_idle(&self) -> FrameResult<()> {
    unsafe { self.device.queue_wait_idle(self.graphics_queue)? };
    Ok(())
  }

  fn wait_idle(&self) -> FrameResult<()> {
    unsafe { self.device.device_wait_idle()? };
    Ok(())
  }
}
