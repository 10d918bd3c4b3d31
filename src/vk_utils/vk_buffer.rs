use std::sync::Arc;

use ash::vk;
use log::trace;
use vma::Alloc;

use super::{
  determine_gpu_allocation_info, get_persistently_mapped_pointer, MemoryMapPointer,
  VkMemoryPreference,
};
use crate::error::FrameResult;
use crate::frame::ResourceUploader;
use crate::vk_ctx::VkCtxDevice;

// https://gpuopen-librariesandsdks.github.io/VulkanMemoryAllocator/html/quick_start.html
// https://github.com/expenses/vulkan-base/blob/main/ash-helpers/src/lib.rs

/// Buffer with its own VMA allocation. Released on drop.
pub struct VkBuffer {
  device: Arc<VkCtxDevice>,
  // For debugging
  pub name: String,
  /// Size in bytes
  pub size: usize,
  /// Native Vulkan buffer
  pub buffer: vk::Buffer,
  allocation: vma::Allocation,
  mapped_pointer: Option<MemoryMapPointer>,
}

impl VkBuffer {
  /// Allocate empty vulkan buffer
  pub fn empty(
    device: &Arc<VkCtxDevice>,
    name: String,
    size: usize,
    usage: vk::BufferUsageFlags,
    memory_pref: VkMemoryPreference,
  ) -> FrameResult<Self> {
    let buffer_info = vk::BufferCreateInfo::builder()
      .size(size as u64)
      .usage(usage)
      .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let alloc_info = determine_gpu_allocation_info(memory_pref);

    let (buffer, allocation) =
      unsafe { device.allocator.create_buffer(&buffer_info, &alloc_info)? };
    let mapped_pointer = get_persistently_mapped_pointer(&device.allocator, &allocation);
    trace!("Allocated buffer '{}' ({} bytes)", name, size);

    Ok(Self {
      device: device.clone(),
      name,
      size,
      buffer,
      allocation,
      mapped_pointer,
    })
  }

  /// Device local buffer filled through a temporary staging buffer.
  /// Blocks until the copy is done.
  pub fn device_local_from_data(
    uploader: &ResourceUploader<VkCtxDevice>,
    name: String,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
  ) -> FrameResult<Self> {
    let device = uploader.device();
    let size = bytes.len();

    let mut staging = VkBuffer::empty(
      device,
      format!("{}-staging", name),
      size,
      vk::BufferUsageFlags::TRANSFER_SRC,
      VkMemoryPreference::ScratchTransfer,
    )?;
    staging.write_bytes(bytes)?;

    let buffer = VkBuffer::empty(
      device,
      name,
      size,
      usage | vk::BufferUsageFlags::TRANSFER_DST,
      VkMemoryPreference::GpuOnly,
    )?;

    uploader.copy_buffer(staging.buffer, buffer.buffer, size as u64)?;

    Ok(buffer)
  }

  /// Copies `bytes` to the start of the buffer. Memory has to be host visible.
  pub fn write_bytes(&mut self, bytes: &[u8]) -> FrameResult<()> {
    let size = bytes.len().min(self.size);

    if let Some(pointer) = self.mapped_pointer {
      unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), pointer.0, size) };
      return Ok(());
    }

    unsafe {
      let pointer = self.device.allocator.map_memory(&mut self.allocation)?;
      std::ptr::copy_nonoverlapping(bytes.as_ptr(), pointer, size);
      self.device.allocator.unmap_memory(&mut self.allocation);
    }
    Ok(())
  }
}

impl Drop for VkBuffer {
  fn drop(&mut self) {
    trace!("Destroying buffer '{}'", self.name);
    unsafe {
      self
        .device
        .allocator
        .destroy_buffer(self.buffer, &mut self.allocation)
    };
  }
}
