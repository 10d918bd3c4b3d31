use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

/// Everything that can stop the render loop.
///
/// Surface staleness (out-of-date, suboptimal, resize) is not an error:
/// the frame pump absorbs it with a rebuild and never returns it.
#[derive(Debug, Error)]
pub enum FrameError {
  #[error("Vulkan call failed: {0}")]
  Vulkan(vk::Result),

  #[error("GPU device was lost")]
  DeviceLost,

  #[error("{op} returned unexpected status {result}")]
  UnexpectedStatus {
    op: &'static str,
    result: vk::Result,
  },

  #[error("Failed to load Vulkan library: {0}")]
  Loading(#[from] ash::LoadingError),

  #[error("Failed to create window: {0}")]
  Window(#[from] winit::error::OsError),

  #[error("No physical device can render and present to this surface")]
  NoSuitableGpu,

  #[error("Surface does not report any format")]
  NoSurfaceFormat,

  #[error("Physical device supports none of the depth formats {0:?}")]
  NoSupportedDepthFormat(Vec<vk::Format>),

  #[error("Failed to read shader '{path}': {source}")]
  ShaderLoad {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Unsupported image layout transition {from:?} -> {to:?}")]
  UnsupportedLayoutTransition {
    from: vk::ImageLayout,
    to: vk::ImageLayout,
  },

  #[error("Swapchain image index {index} out of range, chain has {count} images")]
  ImageIndexOutOfRange { index: u32, count: usize },

  #[error("Surface chain is not built")]
  ChainNotBuilt,

  #[error("Surface chain rebuild failed: {0}")]
  RebuildFailed(#[source] Box<FrameError>),
}

pub type FrameResult<T> = Result<T, FrameError>;

impl From<vk::Result> for FrameError {
  fn from(result: vk::Result) -> Self {
    match result {
      vk::Result::ERROR_DEVICE_LOST => FrameError::DeviceLost,
      r => FrameError::Vulkan(r),
    }
  }
}

impl FrameError {
  /// Status codes that a particular call should never produce, e.g. a
  /// `TIMEOUT` from an infinite fence wait.
  pub fn unexpected(op: &'static str, result: vk::Result) -> Self {
    match result {
      vk::Result::ERROR_DEVICE_LOST => FrameError::DeviceLost,
      result => FrameError::UnexpectedStatus { op, result },
    }
  }

  pub fn is_device_lost(&self) -> bool {
    match self {
      FrameError::DeviceLost => true,
      FrameError::RebuildFailed(inner) => inner.is_device_lost(),
      _ => false,
    }
  }
}
