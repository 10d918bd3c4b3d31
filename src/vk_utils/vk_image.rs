use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use log::trace;
use vma::Alloc;

use super::{
  create_image_view, determine_gpu_allocation_info, get_image_aspect_from_format, DeviceOwned,
  VkMemoryPreference,
};
use crate::error::FrameResult;
use crate::vk_ctx::VkCtxDevice;

/// 2D image with its own VMA allocation and a view over the whole image.
pub struct VkImage {
  /// Destroyed before the image
  image_view: ManuallyDrop<DeviceOwned<vk::ImageView>>,
  device: Arc<VkCtxDevice>,
  pub name: String,
  pub size: vk::Extent2D,
  pub format: vk::Format,
  pub image: vk::Image,
  allocation: vma::Allocation,
}

impl VkImage {
  pub fn empty(
    device: &Arc<VkCtxDevice>,
    name: String,
    size: vk::Extent2D,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
  ) -> FrameResult<Self> {
    let create_info = vk::ImageCreateInfo::builder()
      .image_type(vk::ImageType::TYPE_2D)
      .format(format)
      .extent(vk::Extent3D {
        width: size.width,
        height: size.height,
        depth: 1,
      })
      .mip_levels(1)
      .array_layers(1)
      .samples(vk::SampleCountFlags::TYPE_1)
      .tiling(vk::ImageTiling::OPTIMAL)
      .usage(usage)
      .sharing_mode(vk::SharingMode::EXCLUSIVE)
      .initial_layout(vk::ImageLayout::UNDEFINED);
    let alloc_info = determine_gpu_allocation_info(VkMemoryPreference::GpuOnly);

    let (image, mut allocation) =
      unsafe { device.allocator.create_image(&create_info, &alloc_info)? };

    let aspect = get_image_aspect_from_format(format);
    let image_view = match create_image_view(device, image, format, aspect) {
      Ok(view) => view,
      Err(e) => {
        unsafe { device.allocator.destroy_image(image, &mut allocation) };
        return Err(e);
      }
    };
    trace!("Created image '{}' {:?} {:?}", name, size, format);

    Ok(Self {
      image_view: ManuallyDrop::new(image_view),
      device: device.clone(),
      name,
      size,
      format,
      image,
      allocation,
    })
  }

  /// Depth(+stencil) render target. Render pass moves it out of `UNDEFINED` on first use.
  pub fn depth_attachment(
    device: &Arc<VkCtxDevice>,
    size: vk::Extent2D,
    format: vk::Format,
  ) -> FrameResult<Self> {
    Self::empty(
      device,
      String::from("depth"),
      size,
      format,
      vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    )
  }

  pub fn image_view(&self) -> vk::ImageView {
    self.image_view.handle()
  }
}

impl Drop for VkImage {
  fn drop(&mut self) {
    trace!("Destroying image '{}'", self.name);
    unsafe {
      ManuallyDrop::drop(&mut self.image_view);
      self
        .device
        .allocator
        .destroy_image(self.image, &mut self.allocation)
    };
  }
}
