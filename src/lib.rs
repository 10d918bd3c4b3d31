pub mod app_input;
pub mod app_window;
pub mod config;
pub mod error;
pub mod frame;
pub mod frame_timer;
pub mod vk_ctx;
pub mod vk_utils;
