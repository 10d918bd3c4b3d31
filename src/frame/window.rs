use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use ash::vk;

/// Flag raised by the platform resize callback and cleared by the frame
/// pump once the surface chain was rebuilt. Cheap to clone, every clone
/// shares the flag.
#[derive(Debug, Clone, Default)]
pub struct ResizeHandle(Arc<AtomicBool>);

impl ResizeHandle {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn notify(&self) {
    self.0.store(true, Ordering::Release);
  }

  pub fn is_pending(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }

  pub fn clear(&self) {
    self.0.store(false, Ordering::Release);
  }
}

/// The little the frame pump needs from the windowing toolkit.
pub trait WindowHost {
  /// Drawable size in pixels. Minimized windows report `0x0`.
  fn framebuffer_size(&self) -> vk::Extent2D;

  /// Process pending events without blocking.
  fn poll_events(&mut self);

  /// Block until at least one event arrives, then process it.
  fn wait_events(&mut self);
}

pub fn is_zero_extent(size: vk::Extent2D) -> bool {
  size.width == 0 || size.height == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resize_handle_clones_share_flag() {
    let handle = ResizeHandle::new();
    let from_callback = handle.clone();
    assert!(!handle.is_pending());

    from_callback.notify();
    assert!(handle.is_pending());

    handle.clear();
    assert!(!from_callback.is_pending());
  }

  #[test]
  fn test_zero_extent() {
    assert!(is_zero_extent(vk::Extent2D {
      width: 0,
      height: 600
    }));
    assert!(is_zero_extent(vk::Extent2D {
      width: 800,
      height: 0
    }));
    assert!(!is_zero_extent(vk::Extent2D {
      width: 800,
      height: 600
    }));
  }
}
