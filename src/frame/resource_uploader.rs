use std::sync::Arc;

use ash::vk;
use log::trace;

use super::gpu::{FrameDevice, QueueSubmission};
use crate::error::{FrameError, FrameResult};
use crate::vk_ctx::VkCtxDevice;
use crate::vk_utils::{create_image_barrier, get_image_aspect_from_format, BarrierScope};

/// Records, submits and waits for one-off command buffers. Used for
/// uploads and layout transitions outside of the frame loop.
///
/// Waits for the whole graphics queue to go idle, so do not call it per frame.
pub struct ResourceUploader<D: FrameDevice> {
  device: Arc<D>,
  pool: vk::CommandPool,
}

impl<D: FrameDevice> ResourceUploader<D> {
  pub fn new(device: &Arc<D>) -> FrameResult<Self> {
    let pool = device.create_command_pool(vk::CommandPoolCreateFlags::TRANSIENT)?;
    Ok(Self {
      device: device.clone(),
      pool,
    })
  }

  pub fn device(&self) -> &Arc<D> {
    &self.device
  }

  /// Returns after the GPU executed everything `record` wrote into the
  /// command buffer. The buffer is freed on every path.
  pub fn run_once<R>(&self, record: impl FnOnce(&D, vk::CommandBuffer) -> R) -> FrameResult<R> {
    let cmd_buffers = self.device.allocate_command_buffers(self.pool, 1)?;
    let result = self.submit_and_wait(cmd_buffers[0], record);
    self.device.free_command_buffers(self.pool, &cmd_buffers);
    result
  }

  fn submit_and_wait<R>(
    &self,
    cmd: vk::CommandBuffer,
    record: impl FnOnce(&D, vk::CommandBuffer) -> R,
  ) -> FrameResult<R> {
    let device = self.device.as_ref();
    device.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
    let output = record(device, cmd);
    device.end_command_buffer(cmd)?;

    device.submit_graphics(&QueueSubmission {
      command_buffer: cmd,
      wait: None,
      signal: None,
      fence: vk::Fence::null(),
    })?;
    device.graphics_queue_wait_idle()?;
    trace!("One-time command buffer done");
    Ok(output)
  }
}

impl ResourceUploader<VkCtxDevice> {
  pub fn copy_buffer(
    &self,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
  ) -> FrameResult<()> {
    self.run_once(|ctx, cmd| cmd_copy_buffer(&ctx.device, cmd, src, dst, size))
  }

  /// Image has to be in `TRANSFER_DST_OPTIMAL`.
  pub fn copy_buffer_to_image(
    &self,
    buffer: vk::Buffer,
    image: vk::Image,
    size: vk::Extent2D,
  ) -> FrameResult<()> {
    self.run_once(|ctx, cmd| cmd_copy_buffer_to_image(&ctx.device, cmd, buffer, image, size))
  }

  pub fn transition_image_layout(
    &self,
    image: vk::Image,
    format: vk::Format,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
  ) -> FrameResult<()> {
    // validate before anything is submitted
    let masks = layout_transition_masks(old_layout, new_layout)?;
    self.run_once(|ctx, cmd| {
      cmd_image_barrier(&ctx.device, cmd, image, format, (old_layout, new_layout), masks)
    })
  }
}

impl<D: FrameDevice> Drop for ResourceUploader<D> {
  fn drop(&mut self) {
    self.device.destroy_command_pool(self.pool);
  }
}

/// Source and destination scope of the layout transitions used when
/// uploading resources. Other pairs are rejected.
///
/// https://github.com/KhronosGroup/Vulkan-Docs/wiki/Synchronization-Examples
pub fn layout_transition_masks(
  old_layout: vk::ImageLayout,
  new_layout: vk::ImageLayout,
) -> FrameResult<(BarrierScope, BarrierScope)> {
  use vk::ImageLayout as L;

  let scopes = match (old_layout, new_layout) {
    (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => (
      BarrierScope {
        access: vk::AccessFlags::empty(),
        stage: vk::PipelineStageFlags::TOP_OF_PIPE,
      },
      BarrierScope {
        access: vk::AccessFlags::TRANSFER_WRITE,
        stage: vk::PipelineStageFlags::TRANSFER,
      },
    ),
    (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => (
      BarrierScope {
        access: vk::AccessFlags::TRANSFER_WRITE,
        stage: vk::PipelineStageFlags::TRANSFER,
      },
      BarrierScope {
        access: vk::AccessFlags::SHADER_READ,
        stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
      },
    ),
    (L::UNDEFINED, L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => (
      BarrierScope {
        access: vk::AccessFlags::empty(),
        stage: vk::PipelineStageFlags::TOP_OF_PIPE,
      },
      BarrierScope {
        access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
          | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
      },
    ),
    (from, to) => return Err(FrameError::UnsupportedLayoutTransition { from, to }),
  };
  Ok(scopes)
}

fn cmd_image_barrier(
  device: &ash::Device,
  cmd: vk::CommandBuffer,
  image: vk::Image,
  format: vk::Format,
  layouts: (vk::ImageLayout, vk::ImageLayout),
  (src, dst): (BarrierScope, BarrierScope),
) {
  let barrier = create_image_barrier(
    image,
    get_image_aspect_from_format(format),
    layouts.0,
    layouts.1,
    src.access,
    dst.access,
  );
  unsafe {
    device.cmd_pipeline_barrier(
      cmd,
      src.stage,
      dst.stage,
      vk::DependencyFlags::empty(),
      &[],
      &[],
      &[barrier],
    )
  };
}

pub fn cmd_copy_buffer(
  device: &ash::Device,
  cmd: vk::CommandBuffer,
  src: vk::Buffer,
  dst: vk::Buffer,
  size: vk::DeviceSize,
) {
  let region = vk::BufferCopy {
    src_offset: 0,
    dst_offset: 0,
    size,
  };
  unsafe { device.cmd_copy_buffer(cmd, src, dst, &[region]) };
}

/// Tightly packed buffer into mip 0 of a color image.
pub fn cmd_copy_buffer_to_image(
  device: &ash::Device,
  cmd: vk::CommandBuffer,
  buffer: vk::Buffer,
  image: vk::Image,
  size: vk::Extent2D,
) {
  let region = vk::BufferImageCopy::builder()
    .buffer_offset(0)
    .buffer_row_length(0)
    .buffer_image_height(0)
    .image_subresource(vk::ImageSubresourceLayers {
      aspect_mask: vk::ImageAspectFlags::COLOR,
      mip_level: 0,
      base_array_layer: 0,
      layer_count: 1,
    })
    .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
    .image_extent(vk::Extent3D {
      width: size.width,
      height: size.height,
      depth: 1,
    })
    .build();
  unsafe {
    device.cmd_copy_buffer_to_image(
      cmd,
      buffer,
      image,
      vk::ImageLayout::TRANSFER_DST_OPTIMAL,
      &[region],
    )
  };
}
