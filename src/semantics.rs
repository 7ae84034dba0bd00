//! Semantic vocabulary shared by the compiler, reflection and the renderer.
//!
//! Shaders name their inputs however they like; reflection translates those
//! names into the closed set of categories below so a renderer can bind
//! resources generically.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ── Limits ───────────────────────────────────────────────────────────────

/// Maximum number of passes in one preset.
pub const MAX_PASSES: usize = 64;

/// Maximum texture slot a pass may bind (exclusive).
pub const MAX_BOUND_TEXTURES: u32 = 64;

/// Maximum number of indexed shader parameters.
pub const MAX_PARAMETERS: usize = 1024;

/// Maximum `OriginalHistoryN` depth (exclusive).
pub const MAX_HISTORY: u32 = 128;

// ── Stages ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Token used in cache file names.
    pub fn token(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    pub fn mask(self) -> StageMask {
        match self {
            ShaderStage::Vertex => StageMask::VERTEX,
            ShaderStage::Fragment => StageMask::FRAGMENT,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

bitflags! {
    /// Stages in which a resource is referenced.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StageMask: u8 {
        const VERTEX = 0b01;
        const FRAGMENT = 0b10;
    }
}

// ── Texture categories ───────────────────────────────────────────────────

/// Texture roles a shader may sample.
///
/// `Original` and `Source` are unindexed (always index 0). The remaining
/// categories are parameterised by an integer: history distance, pass index,
/// or lookup-texture index in preset order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSemantic {
    /// Input frame of the whole chain.
    Original = 0,
    /// Output of the previous pass (or `Original` for pass 0).
    Source = 1,
    /// `N` frames ago.
    OriginalHistory = 2,
    /// Output of pass `N` in the current frame.
    PassOutput = 3,
    /// Output of pass `N` in the previous frame.
    PassFeedback = 4,
    /// Preset lookup texture `N`.
    User = 5,
}

impl TextureSemantic {
    pub const COUNT: usize = 6;

    pub const ALL: [TextureSemantic; Self::COUNT] = [
        TextureSemantic::Original,
        TextureSemantic::Source,
        TextureSemantic::OriginalHistory,
        TextureSemantic::PassOutput,
        TextureSemantic::PassFeedback,
        TextureSemantic::User,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Whether symbols for this category carry a numeric suffix.
    pub fn is_indexed(self) -> bool {
        !matches!(self, TextureSemantic::Original | TextureSemantic::Source)
    }

    /// Fixed symbol name (or symbol prefix for numbered categories).
    /// `User` has no fixed name; lookup textures are named by the preset.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            TextureSemantic::Original => Some("Original"),
            TextureSemantic::Source => Some("Source"),
            TextureSemantic::OriginalHistory => Some("OriginalHistory"),
            TextureSemantic::PassOutput => Some("PassOutput"),
            TextureSemantic::PassFeedback => Some("PassFeedback"),
            TextureSemantic::User => None,
        }
    }
}

// ── Buffer categories ────────────────────────────────────────────────────

/// Fixed uniform values the renderer supplies for every pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferSemantic {
    /// Model-view-projection matrix (`mat4`).
    Mvp = 0,
    /// Size of the pass's render target (`vec4`: w, h, 1/w, 1/h).
    Output = 1,
    /// Size of the final viewport (`vec4`).
    FinalViewport = 2,
    /// Frame counter (`uint`), already reduced by the pass's frame count modulus.
    FrameCount = 3,
    /// +1 when playing forward, -1 when rewinding (`int`).
    FrameDirection = 4,
}

impl BufferSemantic {
    pub const COUNT: usize = 5;

    pub const ALL: [BufferSemantic; Self::COUNT] = [
        BufferSemantic::Mvp,
        BufferSemantic::Output,
        BufferSemantic::FinalViewport,
        BufferSemantic::FrameCount,
        BufferSemantic::FrameDirection,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BufferSemantic::Mvp => "MVP",
            BufferSemantic::Output => "OutputSize",
            BufferSemantic::FinalViewport => "FinalViewportSize",
            BufferSemantic::FrameCount => "FrameCount",
            BufferSemantic::FrameDirection => "FrameDirection",
        }
    }

    pub fn from_symbol(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.symbol() == name)
    }
}

/// Suffix appended to a texture symbol to name its size vector.
pub const SIZE_SUFFIX: &str = "Size";

/// Suffix appended to a pass alias to name its feedback texture.
pub const FEEDBACK_SUFFIX: &str = "Feedback";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_match_all_order() {
        for (i, s) in TextureSemantic::ALL.iter().enumerate() {
            assert_eq!(s.ordinal(), i);
        }
        for (i, s) in BufferSemantic::ALL.iter().enumerate() {
            assert_eq!(s.ordinal(), i);
        }
    }

    #[test]
    fn buffer_symbols_are_case_sensitive() {
        assert_eq!(BufferSemantic::from_symbol("MVP"), Some(BufferSemantic::Mvp));
        assert_eq!(BufferSemantic::from_symbol("mvp"), None);
        assert_eq!(
            BufferSemantic::from_symbol("FinalViewportSize"),
            Some(BufferSemantic::FinalViewport)
        );
    }

    #[test]
    fn stage_tokens() {
        assert_eq!(ShaderStage::Vertex.token(), "vert");
        assert_eq!(ShaderStage::Fragment.token(), "frag");
        assert_eq!(
            ShaderStage::Vertex.mask() | ShaderStage::Fragment.mask(),
            StageMask::all()
        );
    }
}
