use std::sync::Arc;

use ash::extensions::khr::Surface;
use ash::vk;
use log::trace;

use super::{create_image_view, DeviceOwned};
use crate::error::FrameResult;
use crate::frame::{ChainGeneration, SurfaceSupport};
use crate::vk_ctx::VkCtxDevice;

pub fn query_surface_support(
  surface_loader: &Surface,
  surface_khr: vk::SurfaceKHR,
  phys_device: vk::PhysicalDevice,
) -> FrameResult<SurfaceSupport> {
  let support = unsafe {
    SurfaceSupport {
      capabilities: surface_loader
        .get_physical_device_surface_capabilities(phys_device, surface_khr)?,
      formats: surface_loader.get_physical_device_surface_formats(phys_device, surface_khr)?,
      present_modes: surface_loader
        .get_physical_device_surface_present_modes(phys_device, surface_khr)?,
    }
  };
  trace!("Surface_capabilities {:?}", support.capabilities);
  Ok(support)
}

fn get_pre_transform(
  surface_capabilities: &vk::SurfaceCapabilitiesKHR,
) -> vk::SurfaceTransformFlagsKHR {
  // Check if surface supports SurfaceTransformFlagsKHR::IDENTITY
  let can_identity = surface_capabilities
    .supported_transforms
    .contains(vk::SurfaceTransformFlagsKHR::IDENTITY);
  if can_identity {
    vk::SurfaceTransformFlagsKHR::IDENTITY
  } else {
    surface_capabilities.current_transform
  }
}

/// Images are used by graphics and present queue. Concurrent sharing if
/// those are different families, so no ownership transfers are needed.
pub fn create_swapchain_khr(
  device: &Arc<VkCtxDevice>,
  generation: &ChainGeneration,
  surface_capabilities: &vk::SurfaceCapabilitiesKHR,
) -> FrameResult<DeviceOwned<vk::SwapchainKHR>> {
  let families = device.queue_families.unique();
  let sharing_mode = if families.len() > 1 {
    vk::SharingMode::CONCURRENT
  } else {
    vk::SharingMode::EXCLUSIVE
  };

  let create_info = vk::SwapchainCreateInfoKHR::builder()
    .surface(device.instance.surface_khr)
    .min_image_count(generation.image_count)
    .image_format(generation.format)
    .image_color_space(generation.color_space)
    .image_extent(generation.extent)
    .image_array_layers(1)
    .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
    .image_sharing_mode(sharing_mode)
    .queue_family_indices(&families)
    .present_mode(generation.present_mode)
    .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
    .pre_transform(get_pre_transform(surface_capabilities))
    .clipped(true);

  let swapchain = unsafe {
    device
      .swapchain_loader
      .create_swapchain(&create_info, None)?
  };
  trace!("Swapchain created");
  Ok(DeviceOwned::new(device, swapchain))
}

/// Images are owned by the swapchain, views are ours.
pub fn create_swapchain_images(
  device: &Arc<VkCtxDevice>,
  swapchain: vk::SwapchainKHR,
  image_format: vk::Format,
) -> FrameResult<(Vec<vk::Image>, Vec<DeviceOwned<vk::ImageView>>)> {
  let swapchain_images = unsafe { device.swapchain_loader.get_swapchain_images(swapchain)? };
  trace!("Will create {} swapchain image views", swapchain_images.len());

  let image_views = swapchain_images
    .iter()
    .map(|&image| create_image_view(device, image, image_format, vk::ImageAspectFlags::COLOR))
    .collect::<FrameResult<Vec<_>>>()?;

  Ok((swapchain_images, image_views))
}
