mod chain_generation;
mod command_recorder;
mod frame_pump;
mod gpu;
mod resource_uploader;
mod scene;
mod surface_chain;
mod sync_primitives;
mod window;

#[cfg(test)]
pub mod fakes;

pub use self::chain_generation::*;
pub use self::command_recorder::*;
pub use self::frame_pump::*;
pub use self::gpu::*;
pub use self::resource_uploader::*;
pub use self::scene::*;
pub use self::surface_chain::*;
pub use self::sync_primitives::*;
pub use self::window::*;
