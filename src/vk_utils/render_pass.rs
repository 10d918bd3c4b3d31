use std::sync::Arc;

use ash::vk;

use super::DeviceOwned;
use crate::error::FrameResult;
use crate::vk_ctx::VkCtxDevice;

/// Raw Vulkan objects used to create vk::RenderPass
pub type AttachmentDefinition = (vk::AttachmentDescription, vk::AttachmentReference);

/// Swapchain image as color attachment: cleared on load, stored, handed to
/// present afterwards. Previous content is never needed.
pub fn create_present_color_attachment(
  attachment_idx: u32,
  image_format: vk::Format,
) -> AttachmentDefinition {
  let attachment = vk::AttachmentDescription::builder()
    .format(image_format)
    .samples(vk::SampleCountFlags::TYPE_1) // single sampled
    .load_op(vk::AttachmentLoadOp::CLEAR)
    .store_op(vk::AttachmentStoreOp::STORE)
    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
    .initial_layout(vk::ImageLayout::UNDEFINED)
    .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
    .build();

  let attachment_reference = vk::AttachmentReference {
    attachment: attachment_idx,
    layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
  };

  (attachment, attachment_reference)
}

/// Depth is cleared every frame and not needed after the pass.
pub fn create_depth_attachment(
  attachment_idx: u32,
  image_format: vk::Format,
) -> AttachmentDefinition {
  let layout = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;
  let attachment = vk::AttachmentDescription::builder()
    .format(image_format)
    .samples(vk::SampleCountFlags::TYPE_1) // single sampled
    .load_op(vk::AttachmentLoadOp::CLEAR)
    .store_op(vk::AttachmentStoreOp::DONT_CARE)
    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
    .initial_layout(vk::ImageLayout::UNDEFINED)
    .final_layout(layout)
    .build();

  let attachment_reference = vk::AttachmentReference {
    attachment: attachment_idx,
    layout,
  };

  (attachment, attachment_reference)
}

/// Dependency on whatever touched the attachments before this pass. Depth
/// image is shared between frames in flight, so previous depth writes count too.
pub fn create_external_dependency(has_depth: bool, has_colors: bool) -> vk::SubpassDependency {
  let mut src_stage_mask = vk::PipelineStageFlags::empty();
  let mut src_access_mask = vk::AccessFlags::empty();
  let mut dst_stage_mask = vk::PipelineStageFlags::empty();
  let mut dst_access_mask = vk::AccessFlags::empty();

  if has_depth {
    src_stage_mask |= vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    src_access_mask |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    dst_stage_mask |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    dst_access_mask |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
  }
  if has_colors {
    // waits on the acquire semaphore happen at this stage
    src_stage_mask |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    dst_stage_mask |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    dst_access_mask |= vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
  }

  vk::SubpassDependency::builder()
    .src_subpass(vk::SUBPASS_EXTERNAL)
    .dst_subpass(0)
    .src_stage_mask(src_stage_mask)
    .src_access_mask(src_access_mask)
    .dst_stage_mask(dst_stage_mask)
    .dst_access_mask(dst_access_mask)
    .build()
}

/// Single subpass render pass. Depth (if any) is stored after colors in the attachment list.
pub fn create_render_pass_from_attachments(
  device: &Arc<VkCtxDevice>,
  depth: Option<AttachmentDefinition>,
  colors: &[AttachmentDefinition],
) -> FrameResult<DeviceOwned<vk::RenderPass>> {
  let mut all_attachment_descs: Vec<vk::AttachmentDescription> =
    colors.iter().map(|a| a.0).collect();
  let color_refs: Vec<vk::AttachmentReference> = colors.iter().map(|a| a.1).collect();
  let depth_ref = depth.map(|a| a.1);
  if let Some((depth_desc, _)) = depth {
    all_attachment_descs.push(depth_desc);
  }

  let mut subpass = vk::SubpassDescription::builder()
    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
    .color_attachments(&color_refs);
  if let Some(reference) = depth_ref.as_ref() {
    subpass = subpass.depth_stencil_attachment(reference);
  }
  let subpasses = [subpass.build()];

  let dependencies = [create_external_dependency(
    depth.is_some(),
    !colors.is_empty(),
  )];

  let create_info = vk::RenderPassCreateInfo::builder()
    .dependencies(&dependencies)
    .attachments(&all_attachment_descs)
    .subpasses(&subpasses);
  let render_pass = unsafe { device.device.create_render_pass(&create_info, None)? };
  Ok(DeviceOwned::new(device, render_pass))
}

/// Color (swapchain image) at index 0, depth at index 1. Matches `Config::clear_values`.
pub fn create_present_render_pass(
  device: &Arc<VkCtxDevice>,
  color_format: vk::Format,
  depth_format: vk::Format,
) -> FrameResult<DeviceOwned<vk::RenderPass>> {
  let color = create_present_color_attachment(0, color_format);
  let depth = create_depth_attachment(1, depth_format);
  create_render_pass_from_attachments(device, Some(depth), &[color])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_color_attachment_ends_presentable() {
    let (desc, reference) = create_present_color_attachment(0, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(desc.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(desc.store_op, vk::AttachmentStoreOp::STORE);
    assert_eq!(desc.initial_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(desc.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(reference.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
  }

  #[test]
  fn test_depth_attachment_is_not_stored() {
    let (desc, reference) = create_depth_attachment(1, vk::Format::D32_SFLOAT);
    assert_eq!(desc.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(desc.store_op, vk::AttachmentStoreOp::DONT_CARE);
    assert_eq!(
      desc.final_layout,
      vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(reference.attachment, 1);
  }

  #[test]
  fn test_external_dependency_covers_depth_and_color() {
    let dep = create_external_dependency(true, true);
    assert_eq!(dep.src_subpass, vk::SUBPASS_EXTERNAL);
    assert!(dep
      .src_stage_mask
      .contains(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT));
    assert!(dep
      .src_stage_mask
      .contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
    assert!(dep
      .dst_stage_mask
      .contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
    assert!(dep
      .dst_access_mask
      .contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));
    assert!(dep
      .dst_access_mask
      .contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
  }
}
