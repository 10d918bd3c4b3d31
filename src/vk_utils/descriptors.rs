use std::sync::Arc;

use ash::vk;
use log::trace;

use super::{DeviceOwned, VkBuffer};
use crate::error::FrameResult;
use crate::vk_ctx::VkCtxDevice;

/*
Descriptor sets in short:
  1. Layout describes the bindings of one set. Needed by the pipeline layout
     and when allocating sets.
  2. Pool hands out sets. Destroying the pool frees them.
  3. `vkUpdateDescriptorSets` points a (set, binding) at a real buffer.
  4. `vkCmdBindDescriptorSets` before the draw.

https://vulkan-tutorial.com/Uniform_buffers/Descriptor_layout_and_buffer
*/

/// Layout entry for a single uniform buffer object.
pub fn create_ubo_binding(
  binding: u32,
  stage_flags: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding {
  vk::DescriptorSetLayoutBinding::builder()
    .binding(binding)
    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
    .descriptor_count(1)
    .stage_flags(stage_flags)
    .build()
}

pub fn create_descriptor_set_layout(
  device: &Arc<VkCtxDevice>,
  bindings: &[vk::DescriptorSetLayoutBinding],
) -> FrameResult<DeviceOwned<vk::DescriptorSetLayout>> {
  let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
  let layout = unsafe {
    device
      .device
      .create_descriptor_set_layout(&create_info, None)?
  };
  Ok(DeviceOwned::new(device, layout))
}

/// Pool for `max_sets` sets with one uniform buffer each.
pub fn create_ubo_descriptor_pool(
  device: &Arc<VkCtxDevice>,
  max_sets: u32,
) -> FrameResult<DeviceOwned<vk::DescriptorPool>> {
  let pool_sizes = [vk::DescriptorPoolSize {
    ty: vk::DescriptorType::UNIFORM_BUFFER,
    descriptor_count: max_sets,
  }];
  let create_info = vk::DescriptorPoolCreateInfo::builder()
    .max_sets(max_sets)
    .pool_sizes(&pool_sizes);
  let pool = unsafe { device.device.create_descriptor_pool(&create_info, None)? };
  trace!("Created descriptor pool for {} sets", max_sets);
  Ok(DeviceOwned::new(device, pool))
}

/// `count` sets of the same layout. Freed when the pool is destroyed.
pub fn allocate_descriptor_sets(
  device: &VkCtxDevice,
  pool: vk::DescriptorPool,
  layout: vk::DescriptorSetLayout,
  count: usize,
) -> FrameResult<Vec<vk::DescriptorSet>> {
  let layouts = vec![layout; count];
  let alloc_info = vk::DescriptorSetAllocateInfo::builder()
    .descriptor_pool(pool)
    .set_layouts(&layouts);
  let sets = unsafe { device.device.allocate_descriptor_sets(&alloc_info)? };
  Ok(sets)
}

/// Point `binding` of `set` at the whole of `buffer`.
pub fn write_ubo_descriptor(
  device: &VkCtxDevice,
  set: vk::DescriptorSet,
  binding: u32,
  buffer: &VkBuffer,
) {
  let buffer_info = [vk::DescriptorBufferInfo {
    buffer: buffer.buffer,
    offset: 0,
    range: vk::WHOLE_SIZE,
  }];
  let write = vk::WriteDescriptorSet::builder()
    .dst_set(set)
    .dst_binding(binding)
    .dst_array_element(0)
    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
    .buffer_info(&buffer_info)
    .build();
  unsafe { device.device.update_descriptor_sets(&[write], &[]) };
}
