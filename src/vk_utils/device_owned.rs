use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use ash::vk;

use crate::vk_ctx::VkCtxDevice;

/// Vulkan handle that is destroyed through the logical device.
pub trait DeviceObject: Copy + fmt::Debug {
  /// # Safety
  /// GPU must not use the object anymore.
  unsafe fn destroy(self, ctx: &VkCtxDevice);
}

impl DeviceObject for vk::Pipeline {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_pipeline(self, None);
  }
}

impl DeviceObject for vk::PipelineLayout {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_pipeline_layout(self, None);
  }
}

impl DeviceObject for vk::RenderPass {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_render_pass(self, None);
  }
}

impl DeviceObject for vk::Framebuffer {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_framebuffer(self, None);
  }
}

impl DeviceObject for vk::ImageView {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_image_view(self, None);
  }
}

impl DeviceObject for vk::ShaderModule {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_shader_module(self, None);
  }
}

impl DeviceObject for vk::DescriptorSetLayout {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_descriptor_set_layout(self, None);
  }
}

/// Sets allocated from the pool are freed with it.
impl DeviceObject for vk::DescriptorPool {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.device.destroy_descriptor_pool(self, None);
  }
}

/// Will also destroy images. From validation layers:
/// VK_OBJECT_TYPE_IMAGE; is a presentable image and it is controlled by the implementation and is destroyed with vkDestroySwapchainKHR.
impl DeviceObject for vk::SwapchainKHR {
  unsafe fn destroy(self, ctx: &VkCtxDevice) {
    ctx.swapchain_loader.destroy_swapchain(self, None);
  }
}

/// Owns `handle` and destroys it on drop. Keeps the device alive until then.
pub struct DeviceOwned<T: DeviceObject> {
  device: Arc<VkCtxDevice>,
  handle: T,
}

impl<T: DeviceObject> DeviceOwned<T> {
  pub fn new(device: &Arc<VkCtxDevice>, handle: T) -> Self {
    Self {
      device: device.clone(),
      handle,
    }
  }

  pub fn handle(&self) -> T {
    self.handle
  }
}

impl<T: DeviceObject> Deref for DeviceOwned<T> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.handle
  }
}

impl<T: DeviceObject> fmt::Debug for DeviceOwned<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "DeviceOwned({:?})", self.handle)
  }
}

impl<T: DeviceObject> Drop for DeviceOwned<T> {
  fn drop(&mut self) {
    unsafe { self.handle.destroy(&self.device) };
  }
}
