use std::{
  collections::VecDeque,
  time::{Duration, Instant},
};

// Delta times are filtered over _this many_ frames.
const DT_FILTER_WIDTH: usize = 20;
/// Cap for delta time reported during warm-up frames.
const WARMUP_MAX_DT: f32 = 1.0 / 60.0;

/// Smoothed delta time handed to the scene every tick.
pub struct FrameTimer {
  frame_idx: u64,
  /// Clamp delta time for _this many_ initial frames. First frames
  /// include init/shader compile hiccups.
  warmup_frames_left: usize,
  last_frame_start: Instant,
  delta_time: f32,
  /// Circular buffer for delta times
  dt_queue: VecDeque<f32>,
}

impl FrameTimer {
  pub fn new() -> Self {
    Self::starting_at(Instant::now())
  }

  pub fn starting_at(now: Instant) -> Self {
    Self {
      frame_idx: 0,
      warmup_frames_left: 2 * DT_FILTER_WIDTH,
      last_frame_start: now,
      delta_time: 0.0,
      dt_queue: VecDeque::with_capacity(DT_FILTER_WIDTH),
    }
  }

  /// Count of frames marked so far.
  pub fn frame_idx(&self) -> u64 {
    self.frame_idx
  }

  /// @return delta time in seconds
  pub fn mark_start_frame(&mut self) -> f32 {
    self.mark_start_frame_at(Instant::now())
  }

  pub fn mark_start_frame_at(&mut self, now: Instant) -> f32 {
    self.frame_idx = self.frame_idx.saturating_add(1);

    let dt_raw = now
      .checked_duration_since(self.last_frame_start)
      .unwrap_or(Duration::ZERO)
      .as_secs_f32();
    self.last_frame_start = now;

    self.delta_time = if self.warmup_frames_left > 0 {
      self.warmup_frames_left -= 1;
      dt_raw.min(WARMUP_MAX_DT)
    } else {
      while self.dt_queue.len() >= DT_FILTER_WIDTH {
        self.dt_queue.pop_front();
      }
      self.dt_queue.push_back(dt_raw);
      self.calc_average_frame_time()
    };
    self.delta_time
  }

  fn calc_average_frame_time(&self) -> f32 {
    let sum = self.dt_queue.iter().copied().sum::<f32>();
    sum / (self.dt_queue.len() as f32)
  }

  pub fn delta_time(&self) -> f32 {
    self.delta_time
  }

  pub fn delta_time_ms(&self) -> f32 {
    self.delta_time * 1000.0
  }
}

impl Default for FrameTimer {
  fn default() -> Self {
    Self::new()
  }
}
