// mostly inspired by:
// - https://github.com/zeux/niagara/tree/master/src
// - https://github.com/MaikKlein/ash/blob/master/examples/src/lib.rs#L256
pub mod debug;
pub mod device;
mod descriptors;
mod device_owned;
mod load_shader;
mod pipeline;
mod render_pass;
mod resources;
mod swapchain;
mod synchronization;
mod vk_buffer;
mod vk_image;
mod vk_memory_resource;

pub use self::descriptors::*;
pub use self::device_owned::*;
pub use self::load_shader::*;
pub use self::pipeline::*;
pub use self::render_pass::*;
pub use self::resources::*;
pub use self::swapchain::*;
pub use self::synchronization::*;
pub use self::vk_buffer::*;
pub use self::vk_image::*;
pub use self::vk_memory_resource::*;
