use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::extensions::khr::Swapchain;
use ash::vk;
use log::info;

use super::VkCtxInstance;
use crate::error::FrameResult;
use crate::frame::SurfaceSupport;
use crate::vk_utils::query_surface_support;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
  pub graphics: u32,
  pub present: u32,
}

impl QueueFamilies {
  pub fn is_shared(&self) -> bool {
    self.graphics == self.present
  }

  /// Deduplicated, as required by `VkDeviceCreateInfo` and concurrent sharing.
  pub fn unique(&self) -> Vec<u32> {
    if self.is_shared() {
      vec![self.graphics]
    } else {
      vec![self.graphics, self.present]
    }
  }
}

/// Logical device, its queues and memory allocator. Handed to every
/// component that creates GPU objects as `Arc<VkCtxDevice>`, so the device
/// is destroyed only after all of them.
pub struct VkCtxDevice {
  pub instance: Arc<VkCtxInstance>,
  pub phys_device: vk::PhysicalDevice,
  pub queue_families: QueueFamilies,
  pub device: ash::Device,
  pub graphics_queue: vk::Queue,
  pub present_queue: vk::Queue,
  pub swapchain_loader: Swapchain,
  /// Has to be destroyed before the device.
  pub allocator: ManuallyDrop<vma::Allocator>,
}

impl VkCtxDevice {
  pub fn surface_support(&self) -> FrameResult<SurfaceSupport> {
    query_surface_support(
      &self.instance.surface_loader,
      self.instance.surface_khr,
      self.phys_device,
    )
  }

  pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
    unsafe {
      self
        .instance
        .instance
        .get_physical_device_format_properties(self.phys_device, format)
    }
  }
}

impl Drop for VkCtxDevice {
  fn drop(&mut self) {
    info!("Destroying logical device");
    unsafe {
      let _ = self.device.device_wait_idle();
      ManuallyDrop::drop(&mut self.allocator);
      self.device.destroy_device(None);
    }
  }
}
