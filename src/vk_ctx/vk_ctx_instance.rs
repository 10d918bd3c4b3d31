use ash::extensions::{ext::DebugUtils, khr::Surface};
use ash::vk;
use log::info;

/// Instance level objects. Outlives every `VkCtxDevice` created from it.
pub struct VkCtxInstance {
  pub entry: ash::Entry,
  pub instance: ash::Instance,
  pub surface_loader: Surface,
  pub surface_khr: vk::SurfaceKHR,
  /// Only with validation layers enabled
  pub debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl Drop for VkCtxInstance {
  fn drop(&mut self) {
    info!("Destroying Vulkan instance");
    unsafe {
      self.surface_loader.destroy_surface(self.surface_khr, None);
      if let Some((loader, messenger)) = self.debug_utils.take() {
        loader.destroy_debug_utils_messenger(messenger, None);
      }
      self.instance.destroy_instance(None);
    }
  }
}
