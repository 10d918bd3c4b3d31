use ash::vk;

/*
https://github.com/KhronosGroup/Vulkan-Docs/wiki/Synchronization-Examples
https://gpuopen.com/learn/vulkan-barriers-explained/
*/

/// Access and stage masks of one side of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierScope {
  pub access: vk::AccessFlags,
  pub stage: vk::PipelineStageFlags,
}

/// https://registry.khronos.org/vulkan/specs/1.3-extensions/man/html/VkImageMemoryBarrier.html
pub fn create_image_barrier(
  image: vk::Image,
  aspect_mask: vk::ImageAspectFlags,
  old_layout: vk::ImageLayout,
  new_layout: vk::ImageLayout,
  src_access_mask: vk::AccessFlags,
  dst_access_mask: vk::AccessFlags,
) -> vk::ImageMemoryBarrier {
  vk::ImageMemoryBarrier::builder()
    .old_layout(old_layout)
    .new_layout(new_layout)
    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
    .image(image)
    .src_access_mask(src_access_mask)
    .dst_access_mask(dst_access_mask)
    .subresource_range(vk::ImageSubresourceRange {
      aspect_mask,
      base_mip_level: 0,
      level_count: 1, // vk::REMAINING_MIP_LEVELS
      base_array_layer: 0,
      layer_count: 1, // vk::REMAINING_ARRAY_LAYERS
    })
    .build()
}

pub fn get_image_aspect_from_format(format: vk::Format) -> vk::ImageAspectFlags {
  match format {
    vk::Format::D32_SFLOAT | vk::Format::D16_UNORM => vk::ImageAspectFlags::DEPTH,
    vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D16_UNORM_S8_UINT => {
      vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    }
    _ => vk::ImageAspectFlags::COLOR,
  }
}
