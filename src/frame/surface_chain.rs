use std::path::PathBuf;
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use log::{debug, info, trace};

use super::chain_generation::{choose_depth_format, ChainGeneration};
use crate::config::Config;
use crate::error::{FrameError, FrameResult};
use crate::vk_ctx::VkCtxDevice;
use crate::vk_utils::{
  create_framebuffer, create_mesh_pipeline, create_pipeline_layout, create_present_render_pass,
  create_swapchain_images, create_swapchain_khr, DeviceOwned, VertexInputDescription, VkImage,
};

/// Raw handles the command recorder needs. Valid until the next teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargets {
  pub render_pass: vk::RenderPass,
  /// One per swapchain image, indexed by image index
  pub framebuffers: Vec<vk::Framebuffer>,
  pub pipeline: vk::Pipeline,
  pub pipeline_layout: vk::PipelineLayout,
  pub extent: vk::Extent2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
  /// Acquire semaphore will be signaled. Suboptimal images are still presentable.
  Acquired { image_index: u32, suboptimal: bool },
  /// Nothing was acquired, semaphore stays unsignaled.
  OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
  Presented,
  Suboptimal,
  OutOfDate,
}

/// Everything that depends on the surface: swapchain and the objects sized
/// or formatted after it. Rebuilt as a whole.
pub trait PresentChain {
  /// Tears down the current generation (if any) and creates a new one.
  /// On error the chain is left torn down.
  fn build(&mut self, window_size: vk::Extent2D) -> FrameResult<ChainGeneration>;

  /// Device has to be idle.
  fn teardown(&mut self);

  fn is_built(&self) -> bool {
    self.generation().is_some()
  }

  fn generation(&self) -> Option<&ChainGeneration>;

  /// Swapchain images of the current generation, 0 if not built.
  fn image_count(&self) -> usize;

  fn render_targets(&self) -> Option<&RenderTargets>;

  /// Blocks until an image is available.
  fn acquire_next_image(&mut self, signal: vk::Semaphore) -> FrameResult<AcquireOutcome>;

  fn present(&mut self, image_index: u32, wait: vk::Semaphore) -> FrameResult<PresentOutcome>;

  /// Takes effect on the next build.
  fn set_vsync(&mut self, vsync: bool);

  fn vsync(&self) -> bool;
}

pub fn acquire_outcome(result: VkResult<(u32, bool)>) -> FrameResult<AcquireOutcome> {
  match result {
    Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
      image_index,
      suboptimal,
    }),
    Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
    Err(e) => Err(FrameError::unexpected("vkAcquireNextImageKHR", e)),
  }
}

pub fn present_outcome(result: VkResult<bool>) -> FrameResult<PresentOutcome> {
  match result {
    Ok(false) => Ok(PresentOutcome::Presented),
    Ok(true) => Ok(PresentOutcome::Suboptimal),
    Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
    Err(e) => Err(FrameError::unexpected("vkQueuePresentKHR", e)),
  }
}

/// Field order is drop order: reverse of creation.
struct ChainResources {
  generation: ChainGeneration,
  targets: RenderTargets,
  _pipeline: DeviceOwned<vk::Pipeline>,
  _pipeline_layout: DeviceOwned<vk::PipelineLayout>,
  _framebuffers: Vec<DeviceOwned<vk::Framebuffer>>,
  _render_pass: DeviceOwned<vk::RenderPass>,
  _depth_image: VkImage,
  _image_views: Vec<DeviceOwned<vk::ImageView>>,
  swapchain: DeviceOwned<vk::SwapchainKHR>,
}

/// Swapchain, depth buffer, render pass, framebuffers and the mesh pipeline.
pub struct VkSurfaceChain {
  device: Arc<VkCtxDevice>,
  shader_paths: (PathBuf, PathBuf),
  vertex_desc: VertexInputDescription,
  descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
  vsync: bool,
  resources: Option<ChainResources>,
}

impl VkSurfaceChain {
  /// Not built yet. Descriptor set layouts are owned by the caller and have
  /// to outlive the chain.
  pub fn new(
    device: &Arc<VkCtxDevice>,
    config: &Config,
    vertex_desc: VertexInputDescription,
    descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
  ) -> Self {
    Self {
      device: device.clone(),
      shader_paths: (config.shader_vertex.clone(), config.shader_fragment.clone()),
      vertex_desc,
      descriptor_set_layouts,
      vsync: config.vsync,
      resources: None,
    }
  }

  fn create_resources(&self, window_size: vk::Extent2D) -> FrameResult<ChainResources> {
    let device = &self.device;
    let support = device.surface_support()?;
    let mut generation = ChainGeneration::select(&support, window_size, self.vsync)?;
    let depth_format =
      choose_depth_format(&Config::DEPTH_FORMATS, |f| device.format_properties(f))?;
    debug!("Depth format {:?}", depth_format);

    let swapchain = create_swapchain_khr(device, &generation, &support.capabilities)?;
    let (images, image_views) =
      create_swapchain_images(device, swapchain.handle(), generation.format)?;
    if images.len() as u32 != generation.image_count {
      debug!(
        "Requested {} swapchain images, driver created {}",
        generation.image_count,
        images.len()
      );
      generation.image_count = images.len() as u32;
    }

    let depth_image = VkImage::depth_attachment(device, generation.extent, depth_format)?;
    let render_pass = create_present_render_pass(device, generation.format, depth_format)?;
    let framebuffers = image_views
      .iter()
      .map(|view| {
        let attachments = [view.handle(), depth_image.image_view()];
        create_framebuffer(device, render_pass.handle(), &attachments, &generation.extent)
      })
      .collect::<FrameResult<Vec<_>>>()?;

    let pipeline_layout = create_pipeline_layout(device, &self.descriptor_set_layouts, &[])?;
    let pipeline = create_mesh_pipeline(
      device,
      render_pass.handle(),
      pipeline_layout.handle(),
      &generation.extent,
      (self.shader_paths.0.as_path(), self.shader_paths.1.as_path()),
      &self.vertex_desc,
    )?;

    let targets = RenderTargets {
      render_pass: render_pass.handle(),
      framebuffers: framebuffers.iter().map(|fb| fb.handle()).collect(),
      pipeline: pipeline.handle(),
      pipeline_layout: pipeline_layout.handle(),
      extent: generation.extent,
    };

    Ok(ChainResources {
      generation,
      targets,
      _pipeline: pipeline,
      _pipeline_layout: pipeline_layout,
      _framebuffers: framebuffers,
      _render_pass: render_pass,
      _depth_image: depth_image,
      _image_views: image_views,
      swapchain,
    })
  }
}

impl PresentChain for VkSurfaceChain {
  fn build(&mut self, window_size: vk::Extent2D) -> FrameResult<ChainGeneration> {
    self.teardown();
    // partially created objects are dropped when this returns early
    let resources = self.create_resources(window_size)?;
    let generation = resources.generation;
    info!(
      "Surface chain built: {}x{}, {} images, {:?}, {:?}",
      generation.extent.width,
      generation.extent.height,
      generation.image_count,
      generation.format,
      generation.present_mode
    );
    self.resources = Some(resources);
    Ok(generation)
  }

  fn teardown(&mut self) {
    if self.resources.take().is_some() {
      trace!("Surface chain torn down");
    }
  }

  fn generation(&self) -> Option<&ChainGeneration> {
    self.resources.as_ref().map(|r| &r.generation)
  }

  fn image_count(&self) -> usize {
    self
      .resources
      .as_ref()
      .map_or(0, |r| r.targets.framebuffers.len())
  }

  fn render_targets(&self) -> Option<&RenderTargets> {
    self.resources.as_ref().map(|r| &r.targets)
  }

  fn acquire_next_image(&mut self, signal: vk::Semaphore) -> FrameResult<AcquireOutcome> {
    let resources = self.resources.as_ref().ok_or(FrameError::ChainNotBuilt)?;
    let result = unsafe {
      self.device.swapchain_loader.acquire_next_image(
        resources.swapchain.handle(),
        u64::MAX,
        signal,
        vk::Fence::null(),
      )
    };
    acquire_outcome(result)
  }

  fn present(&mut self, image_index: u32, wait: vk::Semaphore) -> FrameResult<PresentOutcome> {
    let resources = self.resources.as_ref().ok_or(FrameError::ChainNotBuilt)?;
    let swapchains = [resources.swapchain.handle()];
    let image_indices = [image_index];
    let wait_semaphores = [wait];
    let present_info = vk::PresentInfoKHR::builder()
      .wait_semaphores(&wait_semaphores)
      .swapchains(&swapchains)
      .image_indices(&image_indices);

    let result = unsafe {
      self
        .device
        .swapchain_loader
        .queue_present(self.device.present_queue, &present_info)
    };
    present_outcome(result)
  }

  fn set_vsync(&mut self, vsync: bool) {
    self.vsync = vsync;
  }

  fn vsync(&self) -> bool {
    self.vsync
  }
}

impl Drop for VkSurfaceChain {
  fn drop(&mut self) {
    self.teardown();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_acquire_outcomes() {
    assert_eq!(
      acquire_outcome(Ok((2, false))).unwrap(),
      AcquireOutcome::Acquired {
        image_index: 2,
        suboptimal: false
      }
    );
    assert_eq!(
      acquire_outcome(Ok((0, true))).unwrap(),
      AcquireOutcome::Acquired {
        image_index: 0,
        suboptimal: true
      }
    );
    assert_eq!(
      acquire_outcome(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
      AcquireOutcome::OutOfDate
    );
  }

  #[test]
  fn test_acquire_failures_are_fatal() {
    let err = acquire_outcome(Err(vk::Result::ERROR_DEVICE_LOST)).unwrap_err();
    assert!(err.is_device_lost());

    let err = acquire_outcome(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).unwrap_err();
    assert!(matches!(
      err,
      FrameError::UnexpectedStatus {
        op: "vkAcquireNextImageKHR",
        result: vk::Result::ERROR_SURFACE_LOST_KHR
      }
    ));
  }

  #[test]
  fn test_present_outcomes() {
    assert_eq!(present_outcome(Ok(false)).unwrap(), PresentOutcome::Presented);
    assert_eq!(present_outcome(Ok(true)).unwrap(), PresentOutcome::Suboptimal);
    assert_eq!(
      present_outcome(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
      PresentOutcome::OutOfDate
    );
    assert!(present_outcome(Err(vk::Result::ERROR_DEVICE_LOST))
      .unwrap_err()
      .is_device_lost());
  }
}
