use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::extensions::khr::{Surface, Swapchain};
use log::info;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use super::{VkCtxDevice, VkCtxInstance};
use crate::config::Config;
use crate::error::FrameResult;
use crate::vk_utils::debug::setup_debug_reporting;
use crate::vk_utils::device::{create_instance, pick_device_and_queues, pick_physical_device};

// https://github.com/MaikKlein/ash/blob/master/examples/src/lib.rs#L332
pub fn vk_ctx_initialize(
  window: &winit::window::Window,
  config: &Config,
) -> FrameResult<Arc<VkCtxDevice>> {
  let display_handle = window.raw_display_handle();
  let window_handle = window.raw_window_handle();

  let entry = unsafe { ash::Entry::load()? };
  let instance = create_instance(&entry, display_handle, config.graphics_debugging)?;

  // from here on instance objects are destroyed by `VkCtxInstance`
  let mut instance_ctx = VkCtxInstance {
    surface_loader: Surface::new(&entry, &instance),
    surface_khr: ash::vk::SurfaceKHR::null(),
    debug_utils: None,
    entry,
    instance,
  };
  if config.graphics_debugging {
    instance_ctx.debug_utils = Some(setup_debug_reporting(
      &instance_ctx.entry,
      &instance_ctx.instance,
    )?);
  }
  instance_ctx.surface_khr = unsafe {
    ash_window::create_surface(
      &instance_ctx.entry,
      &instance_ctx.instance,
      display_handle,
      window_handle,
      None,
    )?
  };
  let instance_ctx = Arc::new(instance_ctx);

  // devices
  let (phys_device, queue_families) = pick_physical_device(
    &instance_ctx.instance,
    &instance_ctx.surface_loader,
    instance_ctx.surface_khr,
  )?;
  let (device, graphics_queue, present_queue) =
    pick_device_and_queues(&instance_ctx.instance, phys_device, &queue_families)?;

  // gpu memory allocator
  let allocator_info =
    vma::AllocatorCreateInfo::new(&instance_ctx.instance, &device, phys_device);
  #[allow(unused_unsafe)]
  let allocator = match unsafe { vma::Allocator::new(allocator_info) } {
    Ok(a) => a,
    Err(e) => {
      unsafe { device.destroy_device(None) };
      return Err(e.into());
    }
  };

  let swapchain_loader = Swapchain::new(&instance_ctx.instance, &device);
  info!("Vulkan context created, queue families {:?}", queue_families);

  Ok(Arc::new(VkCtxDevice {
    instance: instance_ctx,
    phys_device,
    queue_families,
    device,
    graphics_queue,
    present_queue,
    swapchain_loader,
    allocator: ManuallyDrop::new(allocator),
  }))
}
