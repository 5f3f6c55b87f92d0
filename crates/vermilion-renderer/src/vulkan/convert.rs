//! Translation of the abstract resource descriptions into Vulkan enums.

use ash::vk;

use crate::types::{BufferUsage, ColorFormat, TextureType, TextureUsage};

pub(crate) fn native_format(format: ColorFormat) -> vk::Format {
    match format {
        ColorFormat::Depth => vk::Format::D32_SFLOAT,
        ColorFormat::DepthLp => vk::Format::D16_UNORM,
        ColorFormat::DepthStencil => vk::Format::D24_UNORM_S8_UINT,
        ColorFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        ColorFormat::Rgba16Unorm => vk::Format::R16G16B16A16_UNORM,
        ColorFormat::Rgba16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        ColorFormat::Rgba32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
        ColorFormat::R10G10B10A2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        ColorFormat::R8Unorm => vk::Format::R8_UNORM,
        ColorFormat::R16Sfloat => vk::Format::R16_SFLOAT,
        ColorFormat::R32Sfloat => vk::Format::R32_SFLOAT,
        ColorFormat::Rg16Sfloat => vk::Format::R16G16_SFLOAT,
        ColorFormat::Rg32Sfloat => vk::Format::R32G32_SFLOAT,
        ColorFormat::Rgb16Sfloat => vk::Format::R16G16B16_SFLOAT,
        ColorFormat::Rgb32Sfloat => vk::Format::R32G32B32_SFLOAT,
        ColorFormat::Rgba32Uint => vk::Format::R32G32B32A32_UINT,
        ColorFormat::Bc1RgbaUnormBlock => vk::Format::BC1_RGBA_UNORM_BLOCK,
        ColorFormat::Bc3UnormBlock => vk::Format::BC3_UNORM_BLOCK,
        ColorFormat::Bc5UnormBlock => vk::Format::BC5_UNORM_BLOCK,
        ColorFormat::Bc6hUfloatBlock => vk::Format::BC6H_UFLOAT_BLOCK,
        ColorFormat::Bc7UnormBlock => vk::Format::BC7_UNORM_BLOCK,
    }
}

/// 3D textures are the only ones backed by a 3D image; arrays and cubes are
/// layered 2D images.
pub(crate) fn image_type(texture_type: TextureType) -> vk::ImageType {
    match texture_type {
        TextureType::D3 => vk::ImageType::TYPE_3D,
        _ => vk::ImageType::TYPE_2D,
    }
}

pub(crate) fn view_type(texture_type: TextureType) -> vk::ImageViewType {
    match texture_type {
        TextureType::D2 => vk::ImageViewType::TYPE_2D,
        TextureType::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
        TextureType::Cube => vk::ImageViewType::CUBE,
        TextureType::CubeArray => vk::ImageViewType::CUBE_ARRAY,
        TextureType::D3 => vk::ImageViewType::TYPE_3D,
    }
}

pub(crate) fn image_usage(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsage::DEPTH_BUFFER) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(TextureUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    flags
}

pub(crate) fn buffer_usage(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_format_mapping() {
        assert_eq!(native_format(ColorFormat::Depth), vk::Format::D32_SFLOAT);
        assert_eq!(
            native_format(ColorFormat::R10G10B10A2Unorm),
            vk::Format::A2B10G10R10_UNORM_PACK32
        );
        assert_eq!(
            native_format(ColorFormat::Bc7UnormBlock),
            vk::Format::BC7_UNORM_BLOCK
        );
    }

    #[test]
    fn test_image_type_only_3d_is_3d() {
        assert_eq!(image_type(TextureType::D3), vk::ImageType::TYPE_3D);
        assert_eq!(image_type(TextureType::Cube), vk::ImageType::TYPE_2D);
        assert_eq!(image_type(TextureType::D2Array), vk::ImageType::TYPE_2D);
    }

    #[test]
    fn test_usage_translation_is_bit_for_bit() {
        let usage = TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST;
        assert_eq!(
            image_usage(usage),
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST
        );

        let usage = BufferUsage::VERTEX | BufferUsage::STORAGE;
        assert_eq!(
            buffer_usage(usage),
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER
        );
    }
}
