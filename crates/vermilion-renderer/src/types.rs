//! API-independent resource descriptions shared by every backend.

use bitflags::bitflags;

/// Shape of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureType {
    #[default]
    D2,
    D2Array,
    Cube,
    CubeArray,
    D3,
}

/// How the CPU accesses a resource, which decides its allocation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuResourceAccess {
    /// Device-local. Uploads go through staging; fastest for the GPU.
    #[default]
    Device,
    /// Host-visible scratch used as a staging source; not buffered for
    /// artifact-free rendering.
    Staging,
    /// Host-visible and rewritten often; the host maps it directly.
    Stream,
}

/// Color and depth formats the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorFormat {
    Depth,
    DepthLp,
    DepthStencil,
    #[default]
    Rgba8Unorm,
    Rgba16Unorm,
    Rgba16Sfloat,
    Rgba32Sfloat,
    R10G10B10A2Unorm,
    R8Unorm,
    R16Sfloat,
    R32Sfloat,
    Rg16Sfloat,
    Rg32Sfloat,
    Rgb16Sfloat,
    Rgb32Sfloat,
    Rgba32Uint,
    Bc1RgbaUnormBlock,
    Bc3UnormBlock,
    Bc5UnormBlock,
    Bc6hUfloatBlock,
    Bc7UnormBlock,
}

impl ColorFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth | Self::DepthLp | Self::DepthStencil)
    }

    /// Bytes per 4x4 block for block-compressed formats, `None` otherwise.
    pub fn block_bytes(self) -> Option<u32> {
        match self {
            Self::Bc1RgbaUnormBlock => Some(8),
            Self::Bc3UnormBlock
            | Self::Bc5UnormBlock
            | Self::Bc6hUfloatBlock
            | Self::Bc7UnormBlock => Some(16),
            _ => None,
        }
    }

    /// Bytes per pixel for uncompressed color formats.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::R16Sfloat => 2,
            Self::Rgba8Unorm | Self::Rg16Sfloat | Self::R32Sfloat | Self::R10G10B10A2Unorm => 4,
            Self::Rgb16Sfloat => 6,
            Self::Rgba16Unorm | Self::Rgba16Sfloat | Self::Rg32Sfloat => 8,
            Self::Rgb32Sfloat => 12,
            Self::Rgba32Sfloat | Self::Rgba32Uint => 16,
            Self::Depth | Self::DepthLp | Self::DepthStencil => depth_format_size(),
            Self::Bc1RgbaUnormBlock
            | Self::Bc3UnormBlock
            | Self::Bc5UnormBlock
            | Self::Bc6hUfloatBlock
            | Self::Bc7UnormBlock => 0,
        }
    }
}

/// Native size of the depth formats the swapchain path allocates (D32, D24S8).
pub fn depth_format_size() -> u32 {
    4
}

/// Row pitch in bytes for one mip row of `width` pixels.
///
/// Block-compressed formats are rounded up to whole 4-pixel blocks and never
/// report less than a single block.
pub fn texture_pitch(format: ColorFormat, width: u32) -> u32 {
    if let Some(block) = format.block_bytes() {
        return (((width + 3) / 4) * block).max(block);
    }
    if format.is_depth() {
        return depth_format_size();
    }
    let bits = format.bytes_per_pixel() * 8;
    (width * bits + 7) / 8
}

bitflags! {
    /// Ways a texture may be used by the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextureUsage: u32 {
        const TRANSFER_DST = 1 << 0;
        const TRANSFER_SRC = 1 << 1;
        const SAMPLED = 1 << 2;
        const RENDER_TARGET = 1 << 3;
        const DEPTH_BUFFER = 1 << 4;
    }
}

bitflags! {
    /// Ways a buffer may be used by the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferUsage: u32 {
        const TRANSFER_DST = 1 << 0;
        const TRANSFER_SRC = 1 << 1;
        const INDEX = 1 << 2;
        const VERTEX = 1 << 3;
        const INDIRECT = 1 << 4;
        const UNIFORM = 1 << 5;
        const STORAGE = 1 << 6;
    }
}

/// Maps a span of an initial-contents buffer onto part of a texture image.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureRegion {
    /// Starting byte of this region in the contents buffer.
    pub buffer_start: u64,
    /// UVW offset of the region in pixels.
    pub offset: [u32; 3],
    /// UVW extent of the region in pixels.
    pub extent: [u32; 3],
    pub mip_level: u32,
    pub layer: u32,
    pub layer_count: u32,
}

/// Description of a texture resource.
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub texture_type: TextureType,
    pub cpu_access: GpuResourceAccess,
    pub format: ColorFormat,
    pub usage: TextureUsage,
    pub width: u32,
    pub height: u32,
    /// Depth in pixels for 3D textures, array layer count otherwise.
    pub depth: u32,
    pub mips: u32,
    /// Raw bytes to upload after creation. Nothing is uploaded when `None`.
    pub initial_contents: Option<&'a [u8]>,
    /// Where each span of `initial_contents` lands in the image.
    pub regions: &'a [TextureRegion],
    /// Name shown by graphics debuggers.
    pub debug_label: Option<&'a str>,
}

impl Default for TextureDesc<'_> {
    fn default() -> Self {
        Self {
            texture_type: TextureType::D2,
            cpu_access: GpuResourceAccess::Device,
            format: ColorFormat::Rgba8Unorm,
            usage: TextureUsage::SAMPLED,
            width: 0,
            height: 0,
            depth: 1,
            mips: 1,
            initial_contents: None,
            regions: &[],
            debug_label: None,
        }
    }
}

/// Description of a linear buffer resource.
#[derive(Debug, Clone, Default)]
pub struct BufferDesc<'a> {
    pub cpu_access: GpuResourceAccess,
    pub usage: BufferUsage,
    /// Size of the buffer in bytes.
    pub size: u64,
    pub initial_contents: Option<&'a [u8]>,
    pub debug_label: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_block_compressed() {
        // 5 pixels round up to two 4-pixel blocks.
        assert_eq!(texture_pitch(ColorFormat::Bc1RgbaUnormBlock, 5), 16);
        // Never less than one block.
        assert_eq!(texture_pitch(ColorFormat::Bc1RgbaUnormBlock, 1), 8);
        assert_eq!(texture_pitch(ColorFormat::Bc7UnormBlock, 1), 16);
        assert_eq!(texture_pitch(ColorFormat::Bc3UnormBlock, 8), 32);
        assert_eq!(texture_pitch(ColorFormat::Bc5UnormBlock, 4), 16);
        assert_eq!(texture_pitch(ColorFormat::Bc6hUfloatBlock, 16), 64);
    }

    #[test]
    fn test_pitch_uncompressed() {
        assert_eq!(texture_pitch(ColorFormat::Rgba8Unorm, 7), 28);
        assert_eq!(texture_pitch(ColorFormat::Rgba8Unorm, 64), 256);
        assert_eq!(texture_pitch(ColorFormat::R8Unorm, 3), 3);
        assert_eq!(texture_pitch(ColorFormat::R16Sfloat, 3), 6);
        assert_eq!(texture_pitch(ColorFormat::R32Sfloat, 3), 12);
        assert_eq!(texture_pitch(ColorFormat::Rg16Sfloat, 2), 8);
        assert_eq!(texture_pitch(ColorFormat::Rgb16Sfloat, 2), 12);
        assert_eq!(texture_pitch(ColorFormat::Rgb32Sfloat, 2), 24);
        assert_eq!(texture_pitch(ColorFormat::Rgba16Sfloat, 2), 16);
        assert_eq!(texture_pitch(ColorFormat::Rgba32Sfloat, 2), 32);
        assert_eq!(texture_pitch(ColorFormat::R10G10B10A2Unorm, 2), 8);
    }

    #[test]
    fn test_pitch_depth_formats() {
        assert_eq!(texture_pitch(ColorFormat::Depth, 128), 4);
        assert_eq!(texture_pitch(ColorFormat::DepthLp, 128), 4);
        assert_eq!(texture_pitch(ColorFormat::DepthStencil, 128), 4);
    }

    #[test]
    fn test_texture_desc_defaults() {
        let desc = TextureDesc::default();
        assert_eq!(desc.depth, 1);
        assert_eq!(desc.mips, 1);
        assert_eq!(desc.usage, TextureUsage::SAMPLED);
        assert!(desc.initial_contents.is_none());
    }
}
