mod vk_ctx_device;
mod vk_ctx_frame_device;
mod vk_ctx_initialize;
mod vk_ctx_instance;

pub use vk_ctx_device::*;
pub use vk_ctx_initialize::*;
pub use vk_ctx_instance::*;
