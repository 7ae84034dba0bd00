//! Sampler configuration helpers.
//!
//! Resolves the native sampler settings (filter × address mode) for a pass
//! input or lookup texture from the preset's renderer-independent modes.

use crate::preset::{FilterMode, WrapMode};

/// Filter used when the preset leaves a pass's filter unspecified.
pub const DEFAULT_FILTER: wgpu::FilterMode = wgpu::FilterMode::Linear;

pub fn native_filter(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
        FilterMode::Unspecified => DEFAULT_FILTER,
    }
}

pub fn native_address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

/// Sampler descriptor for sampling a texture with the given modes.
///
/// Border clamping samples transparent black outside the texture.
pub fn sampler_descriptor(
    filter: FilterMode,
    wrap: WrapMode,
    mipmap: bool,
) -> wgpu::SamplerDescriptor<'static> {
    let filter = native_filter(filter);
    let address = native_address_mode(wrap);
    wgpu::SamplerDescriptor {
        label: None,
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: if mipmap { filter } else { wgpu::FilterMode::Nearest },
        lod_min_clamp: 0.0,
        lod_max_clamp: if mipmap { 32.0 } else { 0.0 },
        compare: None,
        anisotropy_clamp: 1,
        border_color: (wrap == WrapMode::ClampToBorder)
            .then_some(wgpu::SamplerBorderColor::TransparentBlack),
    }
}
