use std::sync::Arc;

use ash::vk;

use super::DeviceOwned;
use crate::error::FrameResult;
use crate::vk_ctx::VkCtxDevice;

// https://github.com/zeux/niagara/blob/master/src/resources.cpp

pub fn create_image_view(
  device: &Arc<VkCtxDevice>,
  image: vk::Image,
  image_format: vk::Format,
  aspect_mask_flags: vk::ImageAspectFlags,
) -> FrameResult<DeviceOwned<vk::ImageView>> {
  let subresource_range = vk::ImageSubresourceRange::builder()
    .aspect_mask(aspect_mask_flags)
    .base_array_layer(0)
    .layer_count(1)
    .base_mip_level(0)
    .level_count(1)
    .build();

  let create_info = vk::ImageViewCreateInfo::builder()
    .image(image)
    .view_type(vk::ImageViewType::TYPE_2D)
    .format(image_format)
    .subresource_range(subresource_range);

  let view = unsafe { device.device.create_image_view(&create_info, None)? };
  Ok(DeviceOwned::new(device, view))
}

pub fn create_framebuffer(
  device: &Arc<VkCtxDevice>,
  render_pass: vk::RenderPass,
  attachments: &[vk::ImageView],
  size: &vk::Extent2D,
) -> FrameResult<DeviceOwned<vk::Framebuffer>> {
  let create_info = vk::FramebufferCreateInfo::builder()
    .render_pass(render_pass)
    .attachments(attachments)
    .width(size.width)
    .height(size.height)
    .layers(1);
  let framebuffer = unsafe { device.device.create_framebuffer(&create_info, None)? };
  Ok(DeviceOwned::new(device, framebuffer))
}

pub fn create_viewport(size: &vk::Extent2D) -> vk::Viewport {
  vk::Viewport {
    x: 0f32,
    y: size.height as f32, // flip vulkan coord system - important!
    width: size.width as f32,
    height: -(size.height as f32), // flip vulkan coord system - important!
    min_depth: 0f32,
    max_depth: 1.0f32,
  }
}

pub fn size_to_rect_vk(size: &vk::Extent2D) -> vk::Rect2D {
  vk::Rect2D {
    offset: vk::Offset2D { x: 0, y: 0 },
    extent: *size,
  }
}
