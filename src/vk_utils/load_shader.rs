use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use log::trace;

use super::DeviceOwned;
use crate::error::{FrameError, FrameResult};
use crate::vk_ctx::VkCtxDevice;

// https://github.com/zeux/niagara/blob/master/src/shaders.cpp

fn shader_entry_point() -> &'static CStr {
  unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") }
}

fn load_shader_module(
  device: &Arc<VkCtxDevice>,
  path: &Path,
) -> FrameResult<DeviceOwned<vk::ShaderModule>> {
  trace!("Loading shader from {}", path.to_string_lossy());
  let shader_load_err = |source: std::io::Error| FrameError::ShaderLoad {
    path: path.to_path_buf(),
    source,
  };

  let mut file = std::fs::File::open(path).map_err(shader_load_err)?;
  let spirv_code = ash::util::read_spv(&mut file).map_err(shader_load_err)?;
  let create_info = vk::ShaderModuleCreateInfo::builder().code(&spirv_code);

  let shader_module = unsafe { device.device.create_shader_module(&create_info, None)? };
  Ok(DeviceOwned::new(device, shader_module))
}

/// Module is only needed until the pipeline is created. Drop it afterwards.
pub fn load_shader(
  device: &Arc<VkCtxDevice>,
  stage: vk::ShaderStageFlags,
  path: &Path,
) -> FrameResult<(DeviceOwned<vk::ShaderModule>, vk::PipelineShaderStageCreateInfo)> {
  let shader_module = load_shader_module(device, path)?;

  let stage_info = vk::PipelineShaderStageCreateInfo::builder()
    .stage(stage)
    .module(shader_module.handle())
    .name(shader_entry_point())
    .build();
  trace!("Shader {:?} loaded from {}", stage, path.to_string_lossy());

  Ok((shader_module, stage_info))
}
