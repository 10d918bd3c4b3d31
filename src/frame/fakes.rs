//! In-memory stand-ins for the GPU, the surface chain, the window and the
//! scene. Submissions complete in queue order, and only when something
//! waits for them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk::{self, Handle};

use super::chain_generation::{ChainGeneration, SurfaceSupport};
use super::gpu::{CommandEncoder, FrameDevice, QueueSubmission};
use super::scene::{Drawable, FrameContext, FrameScene};
use super::surface_chain::{AcquireOutcome, PresentChain, PresentOutcome, RenderTargets};
use super::window::{ResizeHandle, WindowHost};
use crate::error::{FrameError, FrameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuCall {
  WaitFence(vk::Fence),
  ResetFence(vk::Fence),
  BeginCommandBuffer(vk::CommandBuffer),
  EndCommandBuffer(vk::CommandBuffer),
  ResetCommandBuffer(vk::CommandBuffer),
  BeginRenderPass {
    cmd: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
  },
  BindPipeline(vk::Pipeline),
  BindVertexBuffer(vk::Buffer),
  BindIndexBuffer(vk::Buffer),
  BindDescriptorSet(vk::DescriptorSet),
  DrawIndexed {
    index_count: u32,
    first_instance: u32,
  },
  EndRenderPass,
  Submit {
    cmd: vk::CommandBuffer,
    fence: vk::Fence,
    wait: Option<vk::Semaphore>,
    signal: Option<vk::Semaphore>,
    /// Swapchain image acquired last, if any
    image: Option<u32>,
  },
  QueueWaitIdle,
  DeviceWaitIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
  Signaled,
  Unsignaled,
  Pending,
}

#[derive(Debug, Clone, Copy)]
struct PendingSubmission {
  cmd: vk::CommandBuffer,
  fence: vk::Fence,
  image: Option<u32>,
}

#[derive(Default)]
struct FakeState {
  next_handle: u64,
  live: HashSet<u64>,
  fences: HashMap<vk::Fence, FenceState>,
  queue: VecDeque<PendingSubmission>,
  max_pending: usize,
  calls: Vec<GpuCall>,
  fence_wait_error: Option<vk::Result>,
  submit_error: Option<vk::Result>,
  idle_error: Option<vk::Result>,
  creations_left: Option<usize>,
  acquired_image: Option<u32>,
  image_hazards: usize,
  in_flight_rerecords: usize,
}

impl FakeState {
  fn new_handle(&mut self) -> u64 {
    self.next_handle += 1;
    self.next_handle
  }

  fn create_object(&mut self) -> FrameResult<u64> {
    match self.creations_left {
      Some(0) => return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY.into()),
      Some(ref mut n) => *n -= 1,
      None => {}
    }
    let raw = self.new_handle();
    self.live.insert(raw);
    Ok(raw)
  }

  fn destroy_object(&mut self, raw: u64) {
    assert!(self.live.remove(&raw), "object {} destroyed twice", raw);
  }

  /// Complete every submission up to and including the one signaling `fence`.
  fn retire_until(&mut self, fence: vk::Fence) {
    while let Some(sub) = self.queue.pop_front() {
      self.complete(&sub);
      if sub.fence == fence {
        break;
      }
    }
  }

  fn retire_all(&mut self) {
    while let Some(sub) = self.queue.pop_front() {
      self.complete(&sub);
    }
  }

  fn complete(&mut self, sub: &PendingSubmission) {
    if sub.fence != vk::Fence::null() {
      self.fences.insert(sub.fence, FenceState::Signaled);
    }
  }

  fn is_executing(&self, cmd: vk::CommandBuffer) -> bool {
    cmd != vk::CommandBuffer::null() && self.queue.iter().any(|s| s.cmd == cmd)
  }
}

pub struct FakeDevice {
  state: Mutex<FakeState>,
}

impl FakeDevice {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(FakeState::default()),
    }
  }

  fn state(&self) -> MutexGuard<'_, FakeState> {
    self.state.lock().unwrap()
  }

  fn call(&self, call: GpuCall) {
    self.state().calls.push(call);
  }

  pub fn new_handle<T: Handle>(&self) -> T {
    T::from_raw(self.state().new_handle())
  }

  pub fn calls(&self) -> Vec<GpuCall> {
    self.state().calls.clone()
  }

  pub fn clear_calls(&self) {
    self.state().calls.clear();
  }

  pub fn count_calls(&self, pred: impl Fn(&GpuCall) -> bool) -> usize {
    self.state().calls.iter().filter(|c| pred(c)).count()
  }

  /// Objects created and not yet destroyed. Command buffers included.
  pub fn live_objects(&self) -> usize {
    self.state().live.len()
  }

  pub fn pending_submissions(&self) -> usize {
    self.state().queue.len()
  }

  pub fn max_pending_submissions(&self) -> usize {
    self.state().max_pending
  }

  /// Submissions recorded for an image while an older submission for the
  /// same image was still executing.
  pub fn image_hazards(&self) -> usize {
    self.state().image_hazards
  }

  /// Command buffers reset or begun while still executing.
  pub fn in_flight_rerecords(&self) -> usize {
    self.state().in_flight_rerecords
  }

  /// Queue a submission that signals `fence`, without a command buffer.
  pub fn fake_submit(&self, fence: vk::Fence) {
    let mut s = self.state();
    s.fences.insert(fence, FenceState::Pending);
    s.queue.push_back(PendingSubmission {
      cmd: vk::CommandBuffer::null(),
      fence,
      image: None,
    });
  }

  pub fn fail_fence_waits(&self, result: vk::Result) {
    self.state().fence_wait_error = Some(result);
  }

  pub fn fail_submits(&self, result: vk::Result) {
    self.state().submit_error = Some(result);
  }

  pub fn fail_idle_waits(&self, result: vk::Result) {
    self.state().idle_error = Some(result);
  }

  /// Next `n` object creations succeed, every one after that fails.
  pub fn fail_object_creation_after(&self, n: usize) {
    self.state().creations_left = Some(n);
  }

  /// Swapchain image the next submissions render to.
  pub fn set_acquired_image(&self, image: Option<u32>) {
    self.state().acquired_image = image;
  }
}

impl CommandEncoder for FakeDevice {
  fn begin_command_buffer(
    &self,
    cmd: vk::CommandBuffer,
    _flags: vk::CommandBufferUsageFlags,
  ) -> FrameResult<()> {
    let mut s = self.state();
    if s.is_executing(cmd) {
      s.in_flight_rerecords += 1;
    }
    if let Some(image) = s.acquired_image {
      if s.queue.iter().any(|sub| sub.image == Some(image)) {
        s.image_hazards += 1;
      }
    }
    s.calls.push(GpuCall::BeginCommandBuffer(cmd));
    Ok(())
  }

  fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> FrameResult<()> {
    self.call(GpuCall::EndCommandBuffer(cmd));
    Ok(())
  }

  fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> FrameResult<()> {
    let mut s = self.state();
    if s.is_executing(cmd) {
      s.in_flight_rerecords += 1;
    }
    s.calls.push(GpuCall::ResetCommandBuffer(cmd));
    Ok(())
  }

  fn cmd_begin_render_pass(
    &self,
    cmd: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    render_area: vk::Rect2D,
    _clear_values: &[vk::ClearValue],
  ) {
    self.call(GpuCall::BeginRenderPass {
      cmd,
      render_pass,
      framebuffer,
      extent: render_area.extent,
    });
  }

  fn cmd_bind_pipeline(&self, _cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
    self.call(GpuCall::BindPipeline(pipeline));
  }

  fn cmd_bind_vertex_buffer(&self, _cmd: vk::CommandBuffer, buffer: vk::Buffer) {
    self.call(GpuCall::BindVertexBuffer(buffer));
  }

  fn cmd_bind_index_buffer(&self, _cmd: vk::CommandBuffer, buffer: vk::Buffer) {
    self.call(GpuCall::BindIndexBuffer(buffer));
  }

  fn cmd_bind_descriptor_set(
    &self,
    _cmd: vk::CommandBuffer,
    _layout: vk::PipelineLayout,
    set: vk::DescriptorSet,
  ) {
    self.call(GpuCall::BindDescriptorSet(set));
  }

  fn cmd_draw_indexed(&self, _cmd: vk::CommandBuffer, index_count: u32, first_instance: u32) {
    self.call(GpuCall::DrawIndexed {
      index_count,
      first_instance,
    });
  }

  fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {
    self.call(GpuCall::EndRenderPass);
  }
}

impl FrameDevice for FakeDevice {
  fn create_fence(&self, signaled: bool) -> FrameResult<vk::Fence> {
    let mut s = self.state();
    let fence = vk::Fence::from_raw(s.create_object()?);
    let state = if signaled {
      FenceState::Signaled
    } else {
      FenceState::Unsignaled
    };
    s.fences.insert(fence, state);
    Ok(fence)
  }

  fn destroy_fence(&self, fence: vk::Fence) {
    let mut s = self.state();
    s.fences.remove(&fence);
    s.destroy_object(fence.as_raw());
  }

  fn create_semaphore(&self) -> FrameResult<vk::Semaphore> {
    Ok(vk::Semaphore::from_raw(self.state().create_object()?))
  }

  fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
    self.state().destroy_object(semaphore.as_raw());
  }

  fn wait_for_fence(&self, fence: vk::Fence) -> FrameResult<()> {
    let mut s = self.state();
    s.calls.push(GpuCall::WaitFence(fence));
    if let Some(err) = s.fence_wait_error {
      return Err(FrameError::unexpected("vkWaitForFences", err));
    }
    match s.fences.get(&fence).copied() {
      Some(FenceState::Signaled) => Ok(()),
      Some(FenceState::Pending) => {
        s.retire_until(fence);
        Ok(())
      }
      // a real wait would never return
      Some(FenceState::Unsignaled) | None => Err(FrameError::unexpected(
        "vkWaitForFences",
        vk::Result::TIMEOUT,
      )),
    }
  }

  fn reset_fence(&self, fence: vk::Fence) -> FrameResult<()> {
    let mut s = self.state();
    s.calls.push(GpuCall::ResetFence(fence));
    assert_ne!(
      s.fences.get(&fence),
      Some(&FenceState::Pending),
      "reset of a fence with pending work"
    );
    s.fences.insert(fence, FenceState::Unsignaled);
    Ok(())
  }

  fn fence_signaled(&self, fence: vk::Fence) -> FrameResult<bool> {
    Ok(self.state().fences.get(&fence) == Some(&FenceState::Signaled))
  }

  fn create_command_pool(
    &self,
    _flags: vk::CommandPoolCreateFlags,
  ) -> FrameResult<vk::CommandPool> {
    Ok(vk::CommandPool::from_raw(self.state().create_object()?))
  }

  fn destroy_command_pool(&self, pool: vk::CommandPool) {
    self.state().destroy_object(pool.as_raw());
  }

  fn allocate_command_buffers(
    &self,
    _pool: vk::CommandPool,
    count: u32,
  ) -> FrameResult<Vec<vk::CommandBuffer>> {
    let mut s = self.state();
    (0..count)
      .map(|_| s.create_object().map(vk::CommandBuffer::from_raw))
      .collect()
  }

  fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
    let mut s = self.state();
    for cmd in buffers {
      s.destroy_object(cmd.as_raw());
    }
  }

  fn submit_graphics(&self, submission: &QueueSubmission) -> FrameResult<()> {
    let mut s = self.state();
    if let Some(err) = s.submit_error {
      return Err(FrameError::unexpected("vkQueueSubmit", err));
    }
    let fence = submission.fence;
    if fence != vk::Fence::null() {
      assert_eq!(
        s.fences.get(&fence),
        Some(&FenceState::Unsignaled),
        "submitted with a fence that is not unsignaled"
      );
      s.fences.insert(fence, FenceState::Pending);
    }

    let image = s.acquired_image;
    s.calls.push(GpuCall::Submit {
      cmd: submission.command_buffer,
      fence,
      wait: submission.wait.map(|w| w.0),
      signal: submission.signal,
      image,
    });
    s.queue.push_back(PendingSubmission {
      cmd: submission.command_buffer,
      fence,
      image,
    });
    s.max_pending = s.max_pending.max(s.queue.len());
    Ok(())
  }

  fn graphics_queue_wait_idle(&self) -> FrameResult<()> {
    let mut s = self.state();
    s.calls.push(GpuCall::QueueWaitIdle);
    s.retire_all();
    Ok(())
  }

  fn wait_idle(&self) -> FrameResult<()> {
    let mut s = self.state();
    s.calls.push(GpuCall::DeviceWaitIdle);
    if let Some(err) = s.idle_error {
      return Err(err.into());
    }
    s.retire_all();
    Ok(())
  }
}

pub fn fake_render_targets(
  device: &FakeDevice,
  image_count: usize,
  extent: vk::Extent2D,
) -> RenderTargets {
  RenderTargets {
    render_pass: device.new_handle(),
    framebuffers: (0..image_count).map(|_| device.new_handle()).collect(),
    pipeline: device.new_handle(),
    pipeline_layout: device.new_handle(),
    extent,
  }
}

pub fn fake_drawable(device: &FakeDevice, index_count: u32, instance_index: u32) -> Drawable {
  Drawable {
    vertex_buffer: device.new_handle(),
    index_buffer: device.new_handle(),
    index_count,
    instance_index,
    descriptor_set: None,
  }
}

/// min 2 images, no max, window decides extent, sRGB BGRA, FIFO and MAILBOX.
pub fn fake_surface_support() -> SurfaceSupport {
  SurfaceSupport {
    capabilities: vk::SurfaceCapabilitiesKHR {
      min_image_count: 2,
      max_image_count: 0,
      current_extent: vk::Extent2D {
        width: u32::MAX,
        height: u32::MAX,
      },
      min_image_extent: vk::Extent2D {
        width: 1,
        height: 1,
      },
      max_image_extent: vk::Extent2D {
        width: 4096,
        height: 4096,
      },
      ..Default::default()
    },
    formats: vec![vk::SurfaceFormatKHR {
      format: vk::Format::B8G8R8A8_SRGB,
      color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }],
    present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
  }
}

/// Surface chain with scripted acquire/present results. Without a script,
/// images are handed out round-robin.
pub struct FakeChain {
  device: Arc<FakeDevice>,
  pub support: SurfaceSupport,
  vsync: bool,
  built: Option<(ChainGeneration, RenderTargets)>,
  next_image: u32,
  pub acquire_script: VecDeque<Result<AcquireOutcome, vk::Result>>,
  pub present_script: VecDeque<Result<PresentOutcome, vk::Result>>,
  pub fail_next_build: Option<vk::Result>,
  pub build_sizes: Vec<vk::Extent2D>,
  pub teardowns: usize,
  pub acquires: usize,
  /// (image index, wait semaphore)
  pub presents: Vec<(u32, vk::Semaphore)>,
}

impl FakeChain {
  pub fn new(device: &Arc<FakeDevice>) -> Self {
    Self {
      device: device.clone(),
      support: fake_surface_support(),
      vsync: false,
      built: None,
      next_image: 0,
      acquire_script: VecDeque::new(),
      present_script: VecDeque::new(),
      fail_next_build: None,
      build_sizes: Vec::new(),
      teardowns: 0,
      acquires: 0,
      presents: Vec::new(),
    }
  }

  pub fn builds(&self) -> usize {
    self.build_sizes.len()
  }

  pub fn script_acquire(&mut self, outcome: AcquireOutcome) {
    self.acquire_script.push_back(Ok(outcome));
  }

  pub fn script_present(&mut self, outcome: PresentOutcome) {
    self.present_script.push_back(Ok(outcome));
  }
}

impl PresentChain for FakeChain {
  fn build(&mut self, window_size: vk::Extent2D) -> FrameResult<ChainGeneration> {
    self.teardown();
    self.build_sizes.push(window_size);
    if let Some(err) = self.fail_next_build.take() {
      return Err(err.into());
    }
    let generation = ChainGeneration::select(&self.support, window_size, self.vsync)?;
    let targets = fake_render_targets(
      &self.device,
      generation.image_count as usize,
      generation.extent,
    );
    self.built = Some((generation, targets));
    self.next_image = 0;
    Ok(generation)
  }

  fn teardown(&mut self) {
    if self.built.take().is_some() {
      self.teardowns += 1;
    }
    self.device.set_acquired_image(None);
  }

  fn generation(&self) -> Option<&ChainGeneration> {
    self.built.as_ref().map(|b| &b.0)
  }

  fn image_count(&self) -> usize {
    self.generation().map_or(0, |g| g.image_count as usize)
  }

  fn render_targets(&self) -> Option<&RenderTargets> {
    self.built.as_ref().map(|b| &b.1)
  }

  fn acquire_next_image(&mut self, _signal: vk::Semaphore) -> FrameResult<AcquireOutcome> {
    let image_count = self.image_count() as u32;
    if image_count == 0 {
      return Err(FrameError::ChainNotBuilt);
    }
    self.acquires += 1;

    let outcome = match self.acquire_script.pop_front() {
      Some(scripted) => scripted?,
      None => {
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % image_count;
        AcquireOutcome::Acquired {
          image_index,
          suboptimal: false,
        }
      }
    };
    if let AcquireOutcome::Acquired { image_index, .. } = outcome {
      self.device.set_acquired_image(Some(image_index));
    }
    Ok(outcome)
  }

  fn present(&mut self, image_index: u32, wait: vk::Semaphore) -> FrameResult<PresentOutcome> {
    if !self.is_built() {
      return Err(FrameError::ChainNotBuilt);
    }
    self.presents.push((image_index, wait));
    match self.present_script.pop_front() {
      Some(scripted) => Ok(scripted?),
      None => Ok(PresentOutcome::Presented),
    }
  }

  fn set_vsync(&mut self, vsync: bool) {
    self.vsync = vsync;
  }

  fn vsync(&self) -> bool {
    self.vsync
  }
}

/// Window whose framebuffer size advances through a list, one entry per `wait_events`.
/// A size change raises the resize handle, if one was given.
pub struct FakeWindow {
  size: vk::Extent2D,
  upcoming: VecDeque<vk::Extent2D>,
  resize: Option<ResizeHandle>,
  pub wait_events_calls: usize,
  pub poll_events_calls: usize,
}

impl FakeWindow {
  pub fn new(width: u32, height: u32) -> Self {
    Self::with_sizes(&[(width, height)])
  }

  pub fn with_sizes(sizes: &[(u32, u32)]) -> Self {
    let mut upcoming: VecDeque<vk::Extent2D> = sizes
      .iter()
      .map(|&(width, height)| vk::Extent2D { width, height })
      .collect();
    let size = upcoming.pop_front().unwrap_or_default();
    Self {
      size,
      upcoming,
      resize: None,
      wait_events_calls: 0,
      poll_events_calls: 0,
    }
  }

  pub fn with_resize_handle(mut self, resize: ResizeHandle) -> Self {
    self.resize = Some(resize);
    self
  }

  pub fn set_size(&mut self, width: u32, height: u32) {
    self.size = vk::Extent2D { width, height };
  }

  pub fn queue_sizes(&mut self, sizes: &[(u32, u32)]) {
    self.upcoming.extend(
      sizes
        .iter()
        .map(|&(width, height)| vk::Extent2D { width, height }),
    );
  }
}

impl WindowHost for FakeWindow {
  fn framebuffer_size(&self) -> vk::Extent2D {
    self.size
  }

  fn poll_events(&mut self) {
    self.poll_events_calls += 1;
  }

  fn wait_events(&mut self) {
    self.wait_events_calls += 1;
    if let Some(next) = self.upcoming.pop_front() {
      if next != self.size {
        if let Some(resize) = &self.resize {
          resize.notify();
        }
      }
      self.size = next;
    }
  }
}

#[derive(Default)]
pub struct FakeScene {
  pub drawables: Vec<Drawable>,
  pub updates: Vec<FrameContext>,
  pub fail_update: bool,
}

impl FakeScene {
  pub fn new(drawables: Vec<Drawable>) -> Self {
    Self {
      drawables,
      ..Default::default()
    }
  }
}

impl FrameScene for FakeScene {
  fn update_frame(&mut self, ctx: &FrameContext) -> FrameResult<()> {
    if self.fail_update {
      return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY.into());
    }
    self.updates.push(*ctx);
    Ok(())
  }

  fn drawables(&self) -> Vec<Drawable> {
    self.drawables.clone()
  }
}
