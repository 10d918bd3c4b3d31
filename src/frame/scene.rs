use ash::vk;

use crate::error::FrameResult;

/// Single indexed draw. Buffers are owned by the scene and must outlive
/// every frame that references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawable {
  pub vertex_buffer: vk::Buffer,
  /// `u32` indices
  pub index_buffer: vk::Buffer,
  pub index_count: u32,
  /// Passed as `firstInstance`, shaders use it to look up per-object data.
  pub instance_index: u32,
  pub descriptor_set: Option<vk::DescriptorSet>,
}

/// What the scene learns about the frame it is about to update.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
  /// Frame slot, `0..FRAMES_IN_FLIGHT`. Per-frame uniform buffers are indexed with it.
  pub slot: usize,
  pub image_index: u32,
  pub extent: vk::Extent2D,
  /// Smoothed, in seconds
  pub delta_time: f32,
  pub frame_idx: u64,
}

pub trait FrameScene {
  /// Called after acquire and before recording. GPU is done with every
  /// resource of `ctx.slot` at this point.
  fn update_frame(&mut self, ctx: &FrameContext) -> FrameResult<()>;

  /// Queried once per tick, in draw order.
  fn drawables(&self) -> Vec<Drawable>;
}
