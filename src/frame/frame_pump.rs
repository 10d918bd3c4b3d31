use std::sync::Arc;

use ash::vk;
use log::{debug, error, info, trace};

use super::chain_generation::ChainGeneration;
use super::command_recorder::CommandRecorder;
use super::gpu::{FrameDevice, QueueSubmission};
use super::scene::{FrameContext, FrameScene};
use super::surface_chain::{AcquireOutcome, PresentChain, PresentOutcome};
use super::sync_primitives::SyncPrimitiveSet;
use super::window::{is_zero_extent, ResizeHandle, WindowHost};
use crate::config::Config;
use crate::error::{FrameError, FrameResult};
use crate::frame_timer::FrameTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
  Running,
  /// Surface chain is stale. Rebuilt at the end of the current tick.
  RebuildPending,
  /// Only observable if the rebuild failed.
  Rebuilding,
}

/// What happened during one `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
  pub slot: usize,
  /// `None` if nothing was rendered, e.g. acquire was out-of-date
  pub image_index: Option<u32>,
  pub rebuilt: bool,
  /// Surface chain generation after this tick. Increments on every rebuild.
  pub generation: u64,
}

/// Drives acquire, record, submit and present for `frames_in_flight` slots,
/// and rebuilds the surface chain when it goes stale.
///
/// Per tick:
/// 1. wait for the slot's previous submission, reset its fence
/// 2. acquire swapchain image (out-of-date skips to 7)
/// 3. let the scene update per-frame data
/// 4. wait for the slot that used the image last
/// 5. re-record the slot's command buffer
/// 6. submit and present
/// 7. rebuild if anything reported the chain as stale
/// 8. advance to the next slot
pub struct FramePump<D, C, W, S>
where
  D: FrameDevice,
  C: PresentChain,
  W: WindowHost,
  S: FrameScene,
{
  // dropped after `Drop::drop` waited for idle
  recorder: CommandRecorder<D>,
  sync: SyncPrimitiveSet<D>,
  device: Arc<D>,
  chain: C,
  window: W,
  scene: S,
  timer: FrameTimer,
  clear_values: Vec<vk::ClearValue>,
  resize: ResizeHandle,
  settings_changed: bool,
  state: PumpState,
  slot: usize,
  generation: u64,
}

impl<D, C, W, S> FramePump<D, C, W, S>
where
  D: FrameDevice,
  C: PresentChain,
  W: WindowHost,
  S: FrameScene,
{
  /// `resize` has to be the handle the window host raises, so resizes seen
  /// while the pump waits for the initial build are not lost.
  pub fn new(
    device: Arc<D>,
    chain: C,
    window: W,
    scene: S,
    resize: ResizeHandle,
    config: &Config,
  ) -> FrameResult<Self> {
    Self::with_frames_in_flight(
      device,
      chain,
      window,
      scene,
      resize,
      config.clear_values().to_vec(),
      Config::FRAMES_IN_FLIGHT,
    )
  }

  /// Builds the surface chain if the caller did not, waiting for the window
  /// to have a nonzero size first.
  pub fn with_frames_in_flight(
    device: Arc<D>,
    mut chain: C,
    mut window: W,
    scene: S,
    resize: ResizeHandle,
    clear_values: Vec<vk::ClearValue>,
    frames_in_flight: usize,
  ) -> FrameResult<Self> {
    let frames_in_flight = frames_in_flight.max(1);
    if !chain.is_built() {
      let size = wait_for_nonzero_size(&mut window);
      chain.build(size)?;
    }

    let sync = SyncPrimitiveSet::new(device.clone(), frames_in_flight, chain.image_count())?;
    let recorder = CommandRecorder::new(device.clone(), frames_in_flight)?;
    info!(
      "Frame pump ready: {} frames in flight, {} swapchain images",
      frames_in_flight,
      chain.image_count()
    );

    Ok(Self {
      recorder,
      sync,
      device,
      chain,
      window,
      scene,
      timer: FrameTimer::new(),
      clear_values,
      resize,
      settings_changed: false,
      state: PumpState::Running,
      slot: 0,
      generation: 0,
    })
  }

  /// Render one frame. Surface staleness is handled here with a rebuild;
  /// every returned error is fatal.
  pub fn tick(&mut self) -> FrameResult<FrameReport> {
    let slot = self.slot;
    self.window.poll_events();

    let image_index = self.render_frame(slot)?;

    if self.resize.is_pending() || self.settings_changed {
      self.state = PumpState::RebuildPending;
    }
    let rebuilt = self.state == PumpState::RebuildPending;
    if rebuilt {
      self.rebuild()?;
    }

    self.slot = (slot + 1) % self.sync.frames_in_flight();
    Ok(FrameReport {
      slot,
      image_index,
      rebuilt,
      generation: self.generation,
    })
  }

  fn render_frame(&mut self, slot: usize) -> FrameResult<Option<u32>> {
    self.sync.wait_and_reset(slot)?;

    let acquired = self
      .chain
      .acquire_next_image(self.sync.acquire_signal(slot))?;
    let image_index = match acquired {
      AcquireOutcome::OutOfDate => {
        debug!("Acquire reported out-of-date surface, skipping frame");
        self.state = PumpState::RebuildPending;
        return Ok(None);
      }
      AcquireOutcome::Acquired {
        image_index,
        suboptimal,
      } => {
        if suboptimal {
          trace!("Acquired suboptimal image {}", image_index);
        }
        image_index
      }
    };

    let targets = self
      .chain
      .render_targets()
      .ok_or(FrameError::ChainNotBuilt)?;

    self.timer.mark_start_frame();
    let ctx = FrameContext {
      slot,
      image_index,
      extent: targets.extent,
      delta_time: self.timer.delta_time(),
      frame_idx: self.timer.frame_idx(),
    };
    self.scene.update_frame(&ctx)?;

    self.sync.wait_for_image(image_index, slot)?;

    let drawables = self.scene.drawables();
    self.recorder.reset(slot)?;
    let cmd = self.recorder.record(
      slot,
      targets,
      &drawables,
      image_index,
      &self.clear_values,
    )?;

    let render_done = self.sync.render_done_signal(slot);
    self.device.submit_graphics(&QueueSubmission {
      command_buffer: cmd,
      wait: Some((
        self.sync.acquire_signal(slot),
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
      )),
      signal: Some(render_done),
      fence: self.sync.frame_fence(slot),
    })?;
    self.sync.mark_submitted(slot);

    match self.chain.present(image_index, render_done)? {
      PresentOutcome::Presented => {}
      outcome => {
        debug!("Present reported {:?}", outcome);
        self.state = PumpState::RebuildPending;
      }
    }

    Ok(Some(image_index))
  }

  fn rebuild(&mut self) -> FrameResult<()> {
    self.state = PumpState::Rebuilding;
    let size = wait_for_nonzero_size(&mut self.window);

    let generation = self.recreate_chain(size).map_err(|e| {
      error!("Surface chain rebuild failed: {}", e);
      FrameError::RebuildFailed(Box::new(e))
    })?;

    self.sync.reset_image_tracking(self.chain.image_count());
    self.resize.clear();
    self.settings_changed = false;
    self.generation += 1;
    self.state = PumpState::Running;
    info!(
      "Surface chain rebuilt ({}): {}x{}, {:?}",
      self.generation, generation.extent.width, generation.extent.height, generation.present_mode
    );
    Ok(())
  }

  /// Leaves the chain torn down on any error.
  fn recreate_chain(&mut self, size: vk::Extent2D) -> FrameResult<ChainGeneration> {
    let idle = self.device.wait_idle();
    self.chain.teardown();
    idle?;
    self.chain.build(size)
  }

  /// Rebuild at the end of the next tick.
  pub fn notify_resized(&self) {
    self.resize.notify();
  }

  /// For the platform resize callback.
  pub fn resize_handle(&self) -> ResizeHandle {
    self.resize.clone()
  }

  /// Switches present mode with a rebuild at the end of the next tick.
  pub fn set_vsync(&mut self, vsync: bool) {
    if self.chain.vsync() != vsync {
      info!("Vsync {}", if vsync { "on" } else { "off" });
      self.chain.set_vsync(vsync);
      self.settings_changed = true;
    }
  }

  pub fn vsync(&self) -> bool {
    self.chain.vsync()
  }

  pub fn state(&self) -> PumpState {
    self.state
  }

  /// Slot the next tick will use.
  pub fn current_slot(&self) -> usize {
    self.slot
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn frames_in_flight(&self) -> usize {
    self.sync.frames_in_flight()
  }

  pub fn chain(&self) -> &C {
    &self.chain
  }

  pub fn chain_mut(&mut self) -> &mut C {
    &mut self.chain
  }

  pub fn window(&self) -> &W {
    &self.window
  }

  pub fn window_mut(&mut self) -> &mut W {
    &mut self.window
  }

  pub fn scene(&self) -> &S {
    &self.scene
  }

  pub fn scene_mut(&mut self) -> &mut S {
    &mut self.scene
  }
}

impl<D, C, W, S> Drop for FramePump<D, C, W, S>
where
  D: FrameDevice,
  C: PresentChain,
  W: WindowHost,
  S: FrameScene,
{
  fn drop(&mut self) {
    if let Err(e) = self.device.wait_idle() {
      error!("Failed waiting for device idle before frame pump teardown: {}", e);
    }
  }
}

/// Minimized windows report 0x0. Blocks on window events until that changes.
fn wait_for_nonzero_size(window: &mut impl WindowHost) -> vk::Extent2D {
  let mut size = window.framebuffer_size();
  while is_zero_extent(size) {
    trace!("Window has zero size, waiting for events");
    window.wait_events();
    size = window.framebuffer_size();
  }
  size
}
