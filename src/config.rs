use std::path::PathBuf;

use ash::vk;
use glam::{vec3, Vec3};

pub struct Config {
  // window
  pub window_title: String,
  pub window_width: f64,
  pub window_height: f64,
  pub window_resizable: bool,
  /// FIFO present mode when `true`. Otherwise MAILBOX/IMMEDIATE are preferred.
  pub vsync: bool,
  /// Enables validation layers and routes their messages to `log`.
  pub graphics_debugging: bool,
  // clear colors
  pub clear_color: Vec3,
  pub clear_depth: f32,
  pub clear_stencil: u32,
  // shaders, SPIR-V
  pub shader_vertex: PathBuf,
  pub shader_fragment: PathBuf,
}

impl Config {
  /// Count of frames CPU can record ahead of GPU. Independent of swapchain image count.
  pub const FRAMES_IN_FLIGHT: usize = 2;

  /// Preferred depth formats, first one supported as optimal-tiling
  /// depth-stencil attachment is used.
  pub const DEPTH_FORMATS: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
  ];

  pub fn new() -> Config {
    Config {
      window_title: String::from("vk-frame-pump"),
      window_width: 800f64,
      window_height: 600f64,
      window_resizable: true,
      vsync: false,
      graphics_debugging: cfg!(debug_assertions),
      clear_color: vec3(0.0, 0.0, 0.0),
      clear_depth: 1.0,
      clear_stencil: 0,
      shader_vertex: PathBuf::from("./shaders/mesh.vert.spv"),
      shader_fragment: PathBuf::from("./shaders/mesh.frag.spv"),
    }
  }

  pub fn clear_color(&self) -> vk::ClearValue {
    let cc = self.clear_color;
    vk::ClearValue {
      color: vk::ClearColorValue {
        float32: [cc[0], cc[1], cc[2], 1f32],
      },
    }
  }

  pub fn clear_depth_stencil(&self) -> vk::ClearValue {
    vk::ClearValue {
      depth_stencil: vk::ClearDepthStencilValue {
        depth: self.clear_depth,
        stencil: self.clear_stencil,
      },
    }
  }

  /// Order matches render pass attachments: color, then depth.
  pub fn clear_values(&self) -> [vk::ClearValue; 2] {
    [self.clear_color(), self.clear_depth_stencil()]
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}
