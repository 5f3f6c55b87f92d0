//! Vulkan backend: device bring-up, resource managers, and presentation.

pub mod backend;
pub mod buffers;
pub mod commands;
pub mod context;
mod convert;
pub mod error;
pub mod handles;
pub mod memory;
pub mod screen;
mod staging;
pub mod textures;

pub use backend::Backend;
pub use buffers::BufferManager;
pub use commands::CommandRecycler;
pub use context::{DeviceContext, QueueFamilyIndices, ValidationConfig};
pub use error::{RenderError, RenderResult};
pub use handles::{BufferHandle, Handle, TextureHandle};
pub use memory::{Allocation, MemoryBookkeeper};
pub use screen::ScreenResources;
pub use textures::TextureManager;

use ash::vk;
use std::ffi::CStr;

/// Frames the core allows in flight at once.
pub const MAX_INFLIGHT: usize = 2;

/// Capacity of the texture handle pool.
pub const MAX_TEXTURES: usize = 1024;

/// Capacity of the buffer handle pool.
pub const MAX_BUFFERS: usize = 2048;

/// Primary command buffers per in-flight slot for the graphics recycler.
pub const GRAPHICS_COMMANDS_PER_SLOT: usize = 64;

/// Primary command buffers per in-flight slot for the compute recycler.
pub const COMPUTE_COMMANDS_PER_SLOT: usize = 32;

/// Engine name reported to the driver.
pub const ENGINE_NAME: &CStr = c"vermilion";

/// Engine version reported to the driver.
pub const ENGINE_VERSION: u32 = vk::make_api_version(0, 1, 0, 0);

/// Minimum instance API version the backend targets.
pub const REQUIRED_VK_VERSION: u32 = vk::API_VERSION_1_1;
