//! Pixel format lookup tables.
//!
//! Interchange names (as written in presets and `#pragma format`) map to
//! native `wgpu` texture formats; native formats map to texel byte sizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wgpu::TextureFormat;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelFormat {
    #[default]
    Unknown,
    R8Unorm,
    R8Uint,
    R8Sint,
    R8G8Unorm,
    R8G8Uint,
    R8G8Sint,
    R8G8B8A8Unorm,
    R8G8B8A8Uint,
    R8G8B8A8Sint,
    R8G8B8A8Srgb,
    A2B10G10R10UnormPack32,
    A2B10G10R10UintPack32,
    R16Uint,
    R16Sint,
    R16Sfloat,
    R16G16Uint,
    R16G16Sint,
    R16G16Sfloat,
    R16G16B16A16Uint,
    R16G16B16A16Sint,
    R16G16B16A16Sfloat,
    R32Uint,
    R32Sint,
    R32Sfloat,
    R32G32Uint,
    R32G32Sint,
    R32G32Sfloat,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32A32Sfloat,
}

const FORMAT_TABLE: &[(PixelFormat, &str, Option<TextureFormat>)] = &[
    (PixelFormat::Unknown, "UNKNOWN", None),
    (PixelFormat::R8Unorm, "R8_UNORM", Some(TextureFormat::R8Unorm)),
    (PixelFormat::R8Uint, "R8_UINT", Some(TextureFormat::R8Uint)),
    (PixelFormat::R8Sint, "R8_SINT", Some(TextureFormat::R8Sint)),
    (PixelFormat::R8G8Unorm, "R8G8_UNORM", Some(TextureFormat::Rg8Unorm)),
    (PixelFormat::R8G8Uint, "R8G8_UINT", Some(TextureFormat::Rg8Uint)),
    (PixelFormat::R8G8Sint, "R8G8_SINT", Some(TextureFormat::Rg8Sint)),
    (PixelFormat::R8G8B8A8Unorm, "R8G8B8A8_UNORM", Some(TextureFormat::Rgba8Unorm)),
    (PixelFormat::R8G8B8A8Uint, "R8G8B8A8_UINT", Some(TextureFormat::Rgba8Uint)),
    (PixelFormat::R8G8B8A8Sint, "R8G8B8A8_SINT", Some(TextureFormat::Rgba8Sint)),
    (PixelFormat::R8G8B8A8Srgb, "R8G8B8A8_SRGB", Some(TextureFormat::Rgba8UnormSrgb)),
    (
        PixelFormat::A2B10G10R10UnormPack32,
        "A2B10G10R10_UNORM_PACK32",
        Some(TextureFormat::Rgb10a2Unorm),
    ),
    (
        PixelFormat::A2B10G10R10UintPack32,
        "A2B10G10R10_UINT_PACK32",
        Some(TextureFormat::Rgb10a2Uint),
    ),
    (PixelFormat::R16Uint, "R16_UINT", Some(TextureFormat::R16Uint)),
    (PixelFormat::R16Sint, "R16_SINT", Some(TextureFormat::R16Sint)),
    (PixelFormat::R16Sfloat, "R16_SFLOAT", Some(TextureFormat::R16Float)),
    (PixelFormat::R16G16Uint, "R16G16_UINT", Some(TextureFormat::Rg16Uint)),
    (PixelFormat::R16G16Sint, "R16G16_SINT", Some(TextureFormat::Rg16Sint)),
    (PixelFormat::R16G16Sfloat, "R16G16_SFLOAT", Some(TextureFormat::Rg16Float)),
    (PixelFormat::R16G16B16A16Uint, "R16G16B16A16_UINT", Some(TextureFormat::Rgba16Uint)),
    (PixelFormat::R16G16B16A16Sint, "R16G16B16A16_SINT", Some(TextureFormat::Rgba16Sint)),
    (PixelFormat::R16G16B16A16Sfloat, "R16G16B16A16_SFLOAT", Some(TextureFormat::Rgba16Float)),
    (PixelFormat::R32Uint, "R32_UINT", Some(TextureFormat::R32Uint)),
    (PixelFormat::R32Sint, "R32_SINT", Some(TextureFormat::R32Sint)),
    (PixelFormat::R32Sfloat, "R32_SFLOAT", Some(TextureFormat::R32Float)),
    (PixelFormat::R32G32Uint, "R32G32_UINT", Some(TextureFormat::Rg32Uint)),
    (PixelFormat::R32G32Sint, "R32G32_SINT", Some(TextureFormat::Rg32Sint)),
    (PixelFormat::R32G32Sfloat, "R32G32_SFLOAT", Some(TextureFormat::Rg32Float)),
    (PixelFormat::R32G32B32A32Uint, "R32G32B32A32_UINT", Some(TextureFormat::Rgba32Uint)),
    (PixelFormat::R32G32B32A32Sint, "R32G32B32A32_SINT", Some(TextureFormat::Rgba32Sint)),
    (PixelFormat::R32G32B32A32Sfloat, "R32G32B32A32_SFLOAT", Some(TextureFormat::Rgba32Float)),
];

impl PixelFormat {
    /// Interchange name, e.g. `R8G8B8A8_UNORM`.
    pub fn name(self) -> &'static str {
        FORMAT_TABLE
            .iter()
            .find(|(f, _, _)| *f == self)
            .map_or("UNKNOWN", |(_, name, _)| name)
    }

    /// Native texture format; `None` for [`PixelFormat::Unknown`].
    pub fn native(self) -> Option<TextureFormat> {
        FORMAT_TABLE
            .iter()
            .find(|(f, _, _)| *f == self)
            .and_then(|(_, _, native)| *native)
    }

    /// Interchange format for a native one, if the table has it.
    pub fn from_native(native: TextureFormat) -> Option<Self> {
        FORMAT_TABLE
            .iter()
            .find(|(_, _, n)| *n == Some(native))
            .map(|(f, _, _)| *f)
    }

    pub fn byte_size(self) -> Option<u32> {
        self.native().and_then(format_byte_size)
    }
}

/// Bytes per texel of an uncompressed native format.
pub fn format_byte_size(format: TextureFormat) -> Option<u32> {
    use TextureFormat as F;
    let size = match format {
        F::R8Unorm | F::R8Snorm | F::R8Uint | F::R8Sint => 1,
        F::Rg8Unorm | F::Rg8Snorm | F::Rg8Uint | F::Rg8Sint => 2,
        F::R16Uint | F::R16Sint | F::R16Unorm | F::R16Snorm | F::R16Float => 2,
        F::Rgba8Unorm
        | F::Rgba8UnormSrgb
        | F::Rgba8Snorm
        | F::Rgba8Uint
        | F::Rgba8Sint
        | F::Bgra8Unorm
        | F::Bgra8UnormSrgb => 4,
        F::Rgb10a2Unorm | F::Rgb10a2Uint | F::Rg11b10Float | F::Rgb9e5Ufloat => 4,
        F::Rg16Uint | F::Rg16Sint | F::Rg16Unorm | F::Rg16Snorm | F::Rg16Float => 4,
        F::R32Uint | F::R32Sint | F::R32Float => 4,
        F::Rg32Uint | F::Rg32Sint | F::Rg32Float => 8,
        F::Rgba16Uint | F::Rgba16Sint | F::Rgba16Unorm | F::Rgba16Snorm | F::Rgba16Float => 8,
        F::Rgba32Uint | F::Rgba32Sint | F::Rgba32Float => 16,
        _ => return None,
    };
    Some(size)
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pixel format '{0}'")]
pub struct UnknownPixelFormat(pub String);

impl FromStr for PixelFormat {
    type Err = UnknownPixelFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FORMAT_TABLE
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|(f, _, _)| *f)
            .ok_or_else(|| UnknownPixelFormat(trimmed.to_string()))
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = UnknownPixelFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PixelFormat> for String {
    fn from(value: PixelFormat) -> Self {
        value.name().to_string()
    }
}
