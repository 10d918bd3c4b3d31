use ash::vk;
use log::trace;

use crate::error::{FrameError, FrameResult};

/// What the surface reported for the physical device, queried right before a build.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
  pub capabilities: vk::SurfaceCapabilitiesKHR,
  pub formats: Vec<vk::SurfaceFormatKHR>,
  pub present_modes: Vec<vk::PresentModeKHR>,
}

/// One consistent set of swapchain parameters. Framebuffers, depth image and
/// pipeline viewport are all derived from exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainGeneration {
  pub format: vk::Format,
  pub color_space: vk::ColorSpaceKHR,
  pub extent: vk::Extent2D,
  pub present_mode: vk::PresentModeKHR,
  pub image_count: u32,
}

impl ChainGeneration {
  /// Deterministic for the same inputs, so a rebuild with unchanged surface
  /// gives an equivalent chain.
  pub fn select(
    support: &SurfaceSupport,
    window_size: vk::Extent2D,
    vsync: bool,
  ) -> FrameResult<Self> {
    let surface_format =
      choose_surface_format(&support.formats).ok_or(FrameError::NoSurfaceFormat)?;
    let result = Self {
      format: surface_format.format,
      color_space: surface_format.color_space,
      extent: choose_extent(&support.capabilities, window_size),
      present_mode: choose_present_mode(&support.present_modes, vsync),
      image_count: choose_image_count(&support.capabilities),
    };
    trace!("Selected swapchain parameters {:?}", result);
    Ok(result)
  }
}

/// 8-bit sRGB BGRA/RGBA with nonlinear color space if available, first reported format otherwise.
///
/// https://registry.khronos.org/vulkan/specs/1.3-extensions/man/html/VkSurfaceFormatKHR.html
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
  // https://stackoverflow.com/questions/66401081/vulkan-swapchain-format-unorm-vs-srgb
  let preferred = formats.iter().find(|surface_fmt| {
    let fmt_ok = surface_fmt.format == vk::Format::B8G8R8A8_SRGB
      || surface_fmt.format == vk::Format::R8G8B8A8_SRGB;
    let color_space_ok = surface_fmt.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR;
    fmt_ok && color_space_ok
  });

  preferred.or_else(|| formats.first()).copied()
}

/// https://registry.khronos.org/vulkan/specs/1.3-extensions/man/html/VkPresentModeKHR.html
/// https://github.com/EmbarkStudios/kajiya/blob/main/crates/lib/kajiya-backend/src/vulkan/swapchain.rs#L85
pub fn choose_present_mode(
  present_modes: &[vk::PresentModeKHR],
  vsync: bool,
) -> vk::PresentModeKHR {
  let present_mode_preference: &[vk::PresentModeKHR] = if vsync {
    &[vk::PresentModeKHR::FIFO]
  } else {
    &[vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
  };

  present_mode_preference
    .iter()
    .copied()
    .find(|mode| present_modes.contains(mode))
    .unwrap_or(vk::PresentModeKHR::FIFO) // FIFO is guaranteed
}

/// `current_extent.width == u32::MAX` means the window manager lets the
/// swapchain decide. Use window size then.
pub fn choose_extent(
  capabilities: &vk::SurfaceCapabilitiesKHR,
  window_size: vk::Extent2D,
) -> vk::Extent2D {
  if capabilities.current_extent.width != u32::MAX {
    return capabilities.current_extent;
  }

  let min = capabilities.min_image_extent;
  let max = capabilities.max_image_extent;
  vk::Extent2D {
    width: window_size.width.clamp(min.width, max.width.max(min.width)),
    height: window_size.height.clamp(min.height, max.height.max(min.height)),
  }
}

/// One more than the minimum, so we do not wait on the driver. `max_image_count == 0` means no limit.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
  let image_count = capabilities.min_image_count.saturating_add(1);
  if capabilities.max_image_count > 0 {
    image_count.min(capabilities.max_image_count)
  } else {
    image_count
  }
}

/// First of `candidates` usable as optimal-tiling depth attachment.
/// `format_properties` is usually `vkGetPhysicalDeviceFormatProperties`.
pub fn choose_depth_format(
  candidates: &[vk::Format],
  format_properties: impl Fn(vk::Format) -> vk::FormatProperties,
) -> FrameResult<vk::Format> {
  candidates
    .iter()
    .copied()
    .find(|&format| {
      format_properties(format)
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
    .ok_or_else(|| FrameError::NoSupportedDepthFormat(candidates.to_vec()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;

  fn extent(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
  }

  fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
      format,
      color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
  }

  fn capabilities(min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
      min_image_count: min_count,
      max_image_count: max_count,
      current_extent: extent(1280, 720),
      min_image_extent: extent(1, 1),
      max_image_extent: extent(4096, 4096),
      ..Default::default()
    }
  }

  #[test]
  fn test_choose_surface_format_prefers_srgb() {
    let formats = [
      surface_format(vk::Format::B8G8R8A8_UNORM),
      surface_format(vk::Format::B8G8R8A8_SRGB),
    ];
    let fmt = choose_surface_format(&formats).unwrap();
    assert_eq!(fmt.format, vk::Format::B8G8R8A8_SRGB);

    let formats = [
      surface_format(vk::Format::A2B10G10R10_UNORM_PACK32),
      surface_format(vk::Format::R8G8B8A8_SRGB),
    ];
    let fmt = choose_surface_format(&formats).unwrap();
    assert_eq!(fmt.format, vk::Format::R8G8B8A8_SRGB);
  }

  #[test]
  fn test_choose_surface_format_ignores_srgb_in_other_color_space() {
    let formats = [
      surface_format(vk::Format::B8G8R8A8_UNORM),
      vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
      },
    ];
    let fmt = choose_surface_format(&formats).unwrap();
    assert_eq!(fmt.format, vk::Format::B8G8R8A8_UNORM);
  }

  #[test]
  fn test_choose_surface_format_fallback_and_empty() {
    let formats = [surface_format(vk::Format::R16G16B16A16_SFLOAT)];
    let fmt = choose_surface_format(&formats).unwrap();
    assert_eq!(fmt.format, vk::Format::R16G16B16A16_SFLOAT);
    assert!(choose_surface_format(&[]).is_none());
  }

  #[test]
  fn test_choose_present_mode_only_fifo_available() {
    let modes = [vk::PresentModeKHR::FIFO];
    assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::FIFO);
    assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
  }

  #[test]
  fn test_choose_present_mode_prefers_low_latency_without_vsync() {
    let modes = [
      vk::PresentModeKHR::FIFO,
      vk::PresentModeKHR::IMMEDIATE,
      vk::PresentModeKHR::MAILBOX,
    ];
    assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
    assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);

    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
    assert_eq!(
      choose_present_mode(&modes, false),
      vk::PresentModeKHR::IMMEDIATE
    );
  }

  #[test]
  fn test_image_count_with_unbounded_max() {
    assert_eq!(choose_image_count(&capabilities(2, 0)), 3);
  }

  #[test]
  fn test_image_count_capped_by_max() {
    assert_eq!(choose_image_count(&capabilities(2, 2)), 2);
    assert_eq!(choose_image_count(&capabilities(3, 8)), 4);
  }

  #[test]
  fn test_extent_uses_current_extent() {
    let caps = capabilities(2, 0);
    assert_eq!(choose_extent(&caps, extent(10, 10)), extent(1280, 720));
  }

  #[test]
  fn test_undefined_extent_clamps_window_size() {
    let mut caps = capabilities(2, 0);
    caps.current_extent = extent(u32::MAX, u32::MAX);
    caps.min_image_extent = extent(100, 100);
    caps.max_image_extent = extent(1920, 1080);

    assert_eq!(choose_extent(&caps, extent(800, 600)), extent(800, 600));
    assert_eq!(choose_extent(&caps, extent(5000, 50)), extent(1920, 100));
    assert_eq!(choose_extent(&caps, extent(1, 4000)), extent(100, 1080));
  }

  #[test]
  fn test_select_is_deterministic() {
    let support = SurfaceSupport {
      capabilities: capabilities(2, 0),
      formats: vec![surface_format(vk::Format::B8G8R8A8_SRGB)],
      present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
    };
    let a = ChainGeneration::select(&support, extent(800, 600), false).unwrap();
    let b = ChainGeneration::select(&support, extent(800, 600), false).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.image_count, 3);
    assert_eq!(a.present_mode, vk::PresentModeKHR::MAILBOX);
    assert_eq!(a.extent, extent(1280, 720));
  }

  #[test]
  fn test_select_without_formats_fails() {
    let support = SurfaceSupport {
      capabilities: capabilities(2, 0),
      formats: vec![],
      present_modes: vec![vk::PresentModeKHR::FIFO],
    };
    let result = ChainGeneration::select(&support, extent(800, 600), false);
    assert!(matches!(result, Err(FrameError::NoSurfaceFormat)));
  }

  #[test]
  fn test_depth_format_first_supported_wins() {
    let props = |format: vk::Format| {
      let mut p = vk::FormatProperties::default();
      if format == vk::Format::D32_SFLOAT_S8_UINT || format == vk::Format::D24_UNORM_S8_UINT {
        p.optimal_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
      }
      p
    };
    let format = choose_depth_format(&Config::DEPTH_FORMATS, props).unwrap();
    assert_eq!(format, vk::Format::D32_SFLOAT_S8_UINT);
  }

  #[test]
  fn test_depth_format_linear_tiling_does_not_count() {
    let props = |_format: vk::Format| vk::FormatProperties {
      linear_tiling_features: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
      ..Default::default()
    };
    let result = choose_depth_format(&Config::DEPTH_FORMATS, props);
    assert!(matches!(result, Err(FrameError::NoSupportedDepthFormat(_))));
  }
}
