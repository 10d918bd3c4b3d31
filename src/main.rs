use log::{error, info, trace, LevelFilter};
use simple_logger::SimpleLogger;
use winit::{event::VirtualKeyCode, event_loop::EventLoop};

use vk_frame_pump::app_window::{create_window, WinitHost};
use vk_frame_pump::config::Config;
use vk_frame_pump::error::FrameResult;
use vk_frame_pump::frame::{FramePump, ResizeHandle, ResourceUploader, VkSurfaceChain};
use vk_frame_pump::vk_ctx::vk_ctx_initialize;

use crate::demo_scene::{DemoScene, DemoVertex};

mod demo_scene;

// glslangValidator -V shaders/mesh.vert.glsl -o shaders/mesh.vert.spv
// glslangValidator -V shaders/mesh.frag.glsl -o shaders/mesh.frag.spv

fn main() {
  if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Debug).init() {
    eprintln!("Failed to initialize logger: {}", e);
  }
  info!("-- Start --");

  if let Err(e) = run() {
    error!("Fatal: {}", e);
    std::process::exit(1);
  }
  info!("-- End --");
}

fn run() -> FrameResult<()> {
  let config = Config::new();

  // init window. Declared first, so it outlives the surface
  let mut event_loop = EventLoop::new();
  let window = create_window(&event_loop, &config)?;

  // init renderer
  let device = vk_ctx_initialize(&window, &config)?;
  let uploader = ResourceUploader::new(&device)?;
  info!("Render init went OK!");

  let scene = DemoScene::new(&uploader, Config::FRAMES_IN_FLIGHT)?;
  let chain = VkSurfaceChain::new(
    &device,
    &config,
    DemoVertex::input_description(),
    vec![scene.descriptor_set_layout()],
  );

  // shared before any event is dispatched
  let resize = ResizeHandle::new();
  let host = WinitHost::new(&mut event_loop, &window, resize.clone());
  let mut pump = FramePump::new(device.clone(), chain, host, scene, resize, &config)?;

  info!("Starting frame loop");
  while !pump.window().should_close() {
    let report = pump.tick()?;
    if report.rebuilt {
      trace!("Surface chain generation {}", report.generation);
    }

    let input = &mut pump.window_mut().input;
    let toggle_vsync = input.was_pressed(VirtualKeyCode::V);
    input.reset_transient_state();
    if toggle_vsync {
      let vsync = !pump.vsync();
      pump.set_vsync(vsync);
    }
  }

  info!("Frame loop is shutting down");
  Ok(())
}
