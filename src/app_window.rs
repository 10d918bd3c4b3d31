use ash::vk;
use winit::{
  dpi::LogicalSize,
  event::Event,
  event_loop::{ControlFlow, EventLoop},
  platform::run_return::EventLoopExtRunReturn,
  window::{Window, WindowBuilder},
};

use crate::app_input::AppInput;
use crate::config::Config;
use crate::error::FrameResult;
use crate::frame::{ResizeHandle, WindowHost};

pub fn create_window(event_loop: &EventLoop<()>, config: &Config) -> FrameResult<Window> {
  let window = WindowBuilder::new()
    .with_title(&config.window_title)
    .with_resizable(config.window_resizable)
    .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
    .build(event_loop)?;
  Ok(window)
}

/// Drives the winit event loop on demand instead of handing control to it.
///
/// Borrows the window, so anything created from its handles (the surface)
/// can be destroyed before the window is. `resize` is raised from the first
/// dispatched event on, so pass the same handle to the frame pump.
///
/// https://github.com/MaikKlein/ash/blob/master/examples/src/lib.rs
pub struct WinitHost<'a> {
  event_loop: &'a mut EventLoop<()>,
  window: &'a Window,
  pub input: AppInput,
}

impl<'a> WinitHost<'a> {
  pub fn new(event_loop: &'a mut EventLoop<()>, window: &'a Window, resize: ResizeHandle) -> Self {
    Self {
      event_loop,
      window,
      input: AppInput::new(resize),
    }
  }

  pub fn should_close(&self) -> bool {
    self.input.close_requested
  }

  /// Dispatch queued events. With `block`, first wait until there is at least one.
  fn pump_events(&mut self, block: bool) {
    let input = &mut self.input;
    let window_id = self.window.id();
    let mut received = false;

    self.event_loop.run_return(|event, _, control_flow| {
      match &event {
        Event::NewEvents(_) => {
          *control_flow = if block {
            ControlFlow::Wait
          } else {
            ControlFlow::Poll
          };
        }
        Event::WindowEvent { window_id: id, .. } if *id == window_id => {
          received = true;
          input.handle_event(&event);
        }
        Event::MainEventsCleared if received || !block => {
          *control_flow = ControlFlow::Exit;
        }
        _ => {}
      }
    });
  }
}

impl<'a> WindowHost for WinitHost<'a> {
  fn framebuffer_size(&self) -> vk::Extent2D {
    let size = self.window.inner_size();
    vk::Extent2D {
      width: size.width,
      height: size.height,
    }
  }

  fn poll_events(&mut self) {
    self.pump_events(false);
  }

  fn wait_events(&mut self) {
    self.pump_events(true);
  }
}
