//! Vermilion's GPU resource and presentation core.
//!
//! This crate sits above the graphics API but below the engine's rendering
//! algorithms. It owns the Vulkan device context, manages texture and buffer
//! lifetimes behind stable `{index, generation}` handles, recycles per-frame
//! primary command buffers, and drives the double-buffered blit-to-present
//! pipeline that puts the engine's composite image on screen.
//!
//! Window creation, OS events, configuration parsing, and shader-level
//! rendering all live elsewhere; the seams to them are [`window::WindowSource`]
//! and the types in `vermilion-common`.

pub mod types;
pub mod vulkan;
pub mod window;

pub use types::{
    depth_format_size, texture_pitch, BufferDesc, BufferUsage, ColorFormat, GpuResourceAccess,
    TextureDesc, TextureRegion, TextureType, TextureUsage,
};
pub use vulkan::{
    Backend, BufferHandle, RenderError, RenderResult, TextureHandle, ValidationConfig,
};
pub use window::WindowSource;
