use std::sync::Arc;

use ash::vk;
use log::trace;

use super::gpu::FrameDevice;
use crate::error::FrameResult;

struct SlotSync {
  /// Signaled by acquire, waited by submit.
  acquire_signal: vk::Semaphore,
  /// Signaled by submit, waited by present.
  render_done_signal: vk::Semaphore,
  frame_fence: vk::Fence,
  /// Fence was reset, but no submission will signal it yet. Happens when
  /// acquire reports out-of-date after `wait_and_reset`.
  awaiting_submit: bool,
}

/// Per frame slot handshake objects and "last user" of each swapchain image.
///
/// https://www.khronos.org/assets/uploads/developers/library/2016-vulkan-devday-uk/7-Keeping-your-GPU-fed.pdf
pub struct SyncPrimitiveSet<D: FrameDevice> {
  device: Arc<D>,
  slots: Vec<SlotSync>,
  /// Swapchain image index -> frame slot whose fence guards the last
  /// submission that wrote to the image.
  images_in_flight: Vec<Option<usize>>,
}

impl<D: FrameDevice> SyncPrimitiveSet<D> {
  /// Fences start signaled, so the first `frames_in_flight` frames do not block.
  pub fn new(device: Arc<D>, frames_in_flight: usize, image_count: usize) -> FrameResult<Self> {
    let mut result = Self {
      device,
      slots: Vec::with_capacity(frames_in_flight),
      images_in_flight: vec![None; image_count],
    };

    // anything created so far is released by `Drop` if we bail out
    for _ in 0..frames_in_flight {
      let acquire_signal = result.device.create_semaphore()?;
      let render_done_signal = match result.device.create_semaphore() {
        Ok(s) => s,
        Err(e) => {
          result.device.destroy_semaphore(acquire_signal);
          return Err(e);
        }
      };
      let frame_fence = match result.device.create_fence(true) {
        Ok(f) => f,
        Err(e) => {
          result.device.destroy_semaphore(acquire_signal);
          result.device.destroy_semaphore(render_done_signal);
          return Err(e);
        }
      };
      result.slots.push(SlotSync {
        acquire_signal,
        render_done_signal,
        frame_fence,
        awaiting_submit: false,
      });
    }

    trace!("Created sync primitives for {} frames in flight", frames_in_flight);
    Ok(result)
  }

  pub fn frames_in_flight(&self) -> usize {
    self.slots.len()
  }

  pub fn acquire_signal(&self, slot: usize) -> vk::Semaphore {
    self.slots[slot].acquire_signal
  }

  pub fn render_done_signal(&self, slot: usize) -> vk::Semaphore {
    self.slots[slot].render_done_signal
  }

  pub fn frame_fence(&self, slot: usize) -> vk::Fence {
    self.slots[slot].frame_fence
  }

  /// Block until GPU finished the last submission of `slot`, then reset its
  /// fence for the next one. This is the only CPU throttle of the frame loop.
  pub fn wait_and_reset(&mut self, slot: usize) -> FrameResult<()> {
    let s = &mut self.slots[slot];
    if s.awaiting_submit {
      // nothing was submitted with it, waiting would never return
      trace!("Frame fence {} already reset, not waiting", slot);
      return Ok(());
    }

    self.device.wait_for_fence(s.frame_fence)?;
    self.device.reset_fence(s.frame_fence)?;
    s.awaiting_submit = true;
    Ok(())
  }

  /// Call once a submission that signals `frame_fence(slot)` was queued.
  pub fn mark_submitted(&mut self, slot: usize) {
    self.slots[slot].awaiting_submit = false;
  }

  pub fn fence_signaled(&self, slot: usize) -> FrameResult<bool> {
    self.device.fence_signaled(self.slots[slot].frame_fence)
  }

  /// Before `slot` writes to swapchain image `image_index`, wait for whichever
  /// other slot used that image last. Image count and slot count differ, so
  /// the slot fence alone does not cover this.
  pub fn wait_for_image(&mut self, image_index: u32, slot: usize) -> FrameResult<()> {
    let image_index = image_index as usize;
    if image_index >= self.images_in_flight.len() {
      self.images_in_flight.resize(image_index + 1, None);
    }

    if let Some(owner) = self.images_in_flight[image_index] {
      let owner_sync = &self.slots[owner];
      // own fence was already waited in `wait_and_reset`. A fence that was
      // reset without submit has no work behind it.
      if owner != slot && !owner_sync.awaiting_submit {
        trace!(
          "Swapchain image {} still owned by frame {}, waiting",
          image_index,
          owner
        );
        self.device.wait_for_fence(owner_sync.frame_fence)?;
      }
    }

    self.images_in_flight[image_index] = Some(slot);
    Ok(())
  }

  /// Owner of each image, for diagnostics.
  pub fn image_owner(&self, image_index: u32) -> Option<usize> {
    self
      .images_in_flight
      .get(image_index as usize)
      .copied()
      .flatten()
  }

  /// Swapchain was recreated, old image indices mean nothing now.
  pub fn reset_image_tracking(&mut self, image_count: usize) {
    self.images_in_flight.clear();
    self.images_in_flight.resize(image_count, None);
  }
}

impl<D: FrameDevice> Drop for SyncPrimitiveSet<D> {
  /// Device has to be idle.
  fn drop(&mut self) {
    for s in self.slots.drain(..) {
      self.device.destroy_semaphore(s.acquire_signal);
      self.device.destroy_semaphore(s.render_done_signal);
      self.device.destroy_fence(s.frame_fence);
    }
  }
}
