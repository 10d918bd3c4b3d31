use std::path::Path;
use std::sync::Arc;

use ash::vk;
use log::trace;

use super::{create_viewport, load_shader, size_to_rect_vk, DeviceOwned};
use crate::error::{FrameError, FrameResult};
use crate::vk_ctx::VkCtxDevice;

/// Vertex layout of the meshes drawn with the pipeline. Owned by the scene.
#[derive(Debug, Clone, Default)]
pub struct VertexInputDescription {
  pub bindings: Vec<vk::VertexInputBindingDescription>,
  pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

pub fn create_pipeline_layout(
  device: &Arc<VkCtxDevice>,
  uniform_layouts: &[vk::DescriptorSetLayout],
  push_constant_ranges: &[vk::PushConstantRange],
) -> FrameResult<DeviceOwned<vk::PipelineLayout>> {
  let create_info = vk::PipelineLayoutCreateInfo::builder()
    .set_layouts(uniform_layouts)
    .push_constant_ranges(push_constant_ranges);
  let layout = unsafe { device.device.create_pipeline_layout(&create_info, None)? };
  Ok(DeviceOwned::new(device, layout))
}

/// Graphics pipeline for the present render pass. Viewport and scissor are
/// baked in, so the pipeline is tied to one swapchain extent.
pub fn create_mesh_pipeline(
  device: &Arc<VkCtxDevice>,
  render_pass: vk::RenderPass,
  pipeline_layout: vk::PipelineLayout,
  extent: &vk::Extent2D,
  shader_paths: (&Path, &Path),
  vertex_desc: &VertexInputDescription,
) -> FrameResult<DeviceOwned<vk::Pipeline>> {
  trace!("Will create pipeline for extent {:?}", extent);
  // modules are destroyed at the end of this fn
  let (_module_vs, stage_vs) = load_shader(device, vk::ShaderStageFlags::VERTEX, shader_paths.0)?;
  let (_module_fs, stage_fs) =
    load_shader(device, vk::ShaderStageFlags::FRAGMENT, shader_paths.1)?;
  let stages = [stage_vs, stage_fs];

  let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder()
    .vertex_binding_descriptions(&vertex_desc.bindings)
    .vertex_attribute_descriptions(&vertex_desc.attributes);

  let viewports = [create_viewport(extent)];
  let scissors = [size_to_rect_vk(extent)];
  let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
    .viewports(&viewports)
    .scissors(&scissors);

  let input_assembly_state = ps_ia_triangle_list();
  let rasterization_state = ps_raster_polygons(vk::CullModeFlags::BACK);
  let multisample_state = ps_multisample_disabled();
  let depth_stencil_state = ps_depth_less_stencil_always();
  let color_attachments = ps_color_attachments_write_all(1);
  let color_blend_state =
    vk::PipelineColorBlendStateCreateInfo::builder().attachments(&color_attachments);

  let create_info = vk::GraphicsPipelineCreateInfo::builder()
    .stages(&stages)
    .vertex_input_state(&vertex_input_state)
    .input_assembly_state(&input_assembly_state)
    .viewport_state(&viewport_state)
    .rasterization_state(&rasterization_state)
    .multisample_state(&multisample_state)
    .depth_stencil_state(&depth_stencil_state)
    .color_blend_state(&color_blend_state)
    .layout(pipeline_layout)
    .render_pass(render_pass)
    .subpass(0)
    .build();

  let pipelines = unsafe {
    device
      .device
      .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
  }
  .map_err(|(_, err)| FrameError::from(err))?;

  match pipelines.first() {
    Some(&pipeline) => Ok(DeviceOwned::new(device, pipeline)),
    None => Err(FrameError::UnexpectedStatus {
      op: "vkCreateGraphicsPipelines",
      result: vk::Result::ERROR_UNKNOWN,
    }),
  }
}

// Presets for `vk::GraphicsPipelineCreateInfo`.

/// PipelineInputAssembly-TRIANGLE_LIST
pub fn ps_ia_triangle_list() -> vk::PipelineInputAssemblyStateCreateInfo {
  vk::PipelineInputAssemblyStateCreateInfo::builder()
    .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
    .build()
}

/// Default state that you would use to display opaque cube
pub fn ps_raster_polygons(
  cull_mode: vk::CullModeFlags,
) -> vk::PipelineRasterizationStateCreateInfo {
  vk::PipelineRasterizationStateCreateInfo::builder()
    .depth_clamp_enable(false)
    .polygon_mode(vk::PolygonMode::FILL)
    .cull_mode(cull_mode)
    .front_face(vk::FrontFace::COUNTER_CLOCKWISE) // viewport is flipped, see `create_viewport`
    .line_width(1.0) // validation layers: has to be 1.0 if not dynamic
    .build()
}

/// - Depth: test LESS, write ON
/// - Stencil: test SKIP
pub fn ps_depth_less_stencil_always() -> vk::PipelineDepthStencilStateCreateInfo {
  vk::PipelineDepthStencilStateCreateInfo::builder()
    .depth_test_enable(true)
    .depth_write_enable(true)
    .depth_compare_op(vk::CompareOp::LESS)
    .depth_bounds_test_enable(false)
    .stencil_test_enable(false)
    .build()
}

pub fn ps_multisample_disabled() -> vk::PipelineMultisampleStateCreateInfo {
  vk::PipelineMultisampleStateCreateInfo::builder()
    .rasterization_samples(vk::SampleCountFlags::TYPE_1)
    .sample_shading_enable(false)
    .build()
}

/// Write result to all color attachments, disable blending
pub fn ps_color_attachments_write_all(
  attachment_count: usize,
) -> Vec<vk::PipelineColorBlendAttachmentState> {
  // VULKAN SPEC:
  // > If the independent blending feature is not enabled on the device,
  // all VkPipelineColorBlendAttachmentState elements in the pAttachments
  // array must be identical.
  let write_all = vk::PipelineColorBlendAttachmentState::builder()
    .color_write_mask(vk::ColorComponentFlags::RGBA)
    .blend_enable(false)
    .src_color_blend_factor(vk::BlendFactor::ONE) // shader output
    .dst_color_blend_factor(vk::BlendFactor::ZERO) // existing value on destination attachment
    .src_alpha_blend_factor(vk::BlendFactor::ONE)
    .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
    .build();

  vec![write_all; attachment_count]
}
