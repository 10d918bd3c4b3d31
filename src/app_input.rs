use std::collections::HashSet;

use log::info;
use winit::event::{ElementState, Event, VirtualKeyCode, WindowEvent};

use crate::frame::ResizeHandle;

/// Window state collected from winit events between two frames.
///
/// Other implementations:
/// * https://github.com/rukai/winit_input_helper/blob/main/src/current_input.rs
pub struct AppInput {
  pub close_requested: bool,
  key_held: HashSet<VirtualKeyCode>,
  /// Went down since last `reset_transient_state`. Key repeat is ignored.
  pub key_pressed: HashSet<VirtualKeyCode>,
  /// Raised on every `Resized` and `ScaleFactorChanged` event.
  resize: ResizeHandle,
}

impl AppInput {
  pub fn new(resize: ResizeHandle) -> Self {
    Self {
      close_requested: false,
      key_held: HashSet::new(),
      key_pressed: HashSet::new(),
      resize,
    }
  }

  pub fn reset_transient_state(&mut self) {
    self.key_pressed.clear();
  }

  pub fn was_pressed(&self, key: VirtualKeyCode) -> bool {
    self.key_pressed.contains(&key)
  }

  pub fn handle_event<T>(&mut self, event: &Event<T>) {
    if let Event::WindowEvent { event, .. } = event {
      self.handle_window_event(event);
    }
  }

  pub fn handle_window_event(&mut self, event: &WindowEvent) {
    match event {
      // on clicked 'x'
      WindowEvent::CloseRequested => {
        self.close_requested = true;
      }
      WindowEvent::KeyboardInput { input, .. } => match (input.state, input.virtual_keycode) {
        (_, Some(VirtualKeyCode::Escape)) => {
          self.close_requested = true;
        }
        (ElementState::Pressed, Some(key)) => {
          if self.key_held.insert(key) {
            self.key_pressed.insert(key);
          }
        }
        (ElementState::Released, Some(key)) => {
          self.key_held.remove(&key);
        }
        _ => {}
      },
      WindowEvent::Resized(next_size) => {
        info!("Window resized. New size: {:?}", next_size);
        self.resize.notify();
      }
      WindowEvent::ScaleFactorChanged { .. } => {
        self.resize.notify();
      }
      _ => {}
    }
  }
}
