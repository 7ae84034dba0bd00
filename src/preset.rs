//! Preset records consumed by the pass compiler.
//!
//! The preset grammar itself is parsed elsewhere; this module only models the
//! already-parsed passes (deserialised from JSON) and the shader sources they
//! point at.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    formats::PixelFormat,
    semantics::{MAX_PARAMETERS, MAX_PASSES},
    source::ShaderSource,
};

// ── Modes ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    Unspecified,
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    #[default]
    #[serde(alias = "border")]
    ClampToBorder,
    #[serde(alias = "edge")]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    #[default]
    None,
    Source,
    Absolute,
    Viewport,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scale {
    pub type_x: ScaleType,
    pub type_y: ScaleType,
    pub x: f32,
    pub y: f32,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            type_x: ScaleType::None,
            type_y: ScaleType::None,
            x: 1.0,
            y: 1.0,
        }
    }
}

impl Scale {
    /// Output size of a pass given its source and the final viewport.
    /// `is_final` makes an unscaled pass fill the viewport.
    pub fn output_size(&self, source: [u32; 2], viewport: [u32; 2], is_final: bool) -> [u32; 2] {
        [
            scale_axis(self.type_x, self.x, source[0], viewport[0], is_final),
            scale_axis(self.type_y, self.y, source[1], viewport[1], is_final),
        ]
    }
}

fn scale_axis(ty: ScaleType, factor: f32, source: u32, viewport: u32, is_final: bool) -> u32 {
    let size = match ty {
        ScaleType::None if is_final => viewport as f32,
        ScaleType::None => source as f32,
        ScaleType::Source => source as f32 * factor,
        ScaleType::Viewport => viewport as f32 * factor,
        ScaleType::Absolute => factor,
    };
    size.round().max(1.0) as u32
}

// ── Records ──────────────────────────────────────────────────────────────

/// A `#pragma parameter` declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShaderParameter {
    pub name: String,
    pub description: String,
    pub initial: f32,
    pub minimum: f32,
    pub maximum: f32,
    pub step: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTexture {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub filter: FilterMode,
    #[serde(default)]
    pub wrap: WrapMode,
    #[serde(default)]
    pub mipmap: bool,
}

/// Per-pass settings as they appear in a parsed preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub filter: FilterMode,
    #[serde(default)]
    pub wrap: WrapMode,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub format: Option<PixelFormat>,
    #[serde(default)]
    pub float_framebuffer: bool,
    #[serde(default)]
    pub srgb_framebuffer: bool,
    /// `0` disables the modulus.
    #[serde(default)]
    pub frame_count_mod: u32,
    #[serde(default)]
    pub mipmap_input: bool,
}

impl PassConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            alias: None,
            filter: FilterMode::default(),
            wrap: WrapMode::default(),
            scale: Scale::default(),
            format: None,
            float_framebuffer: false,
            srgb_framebuffer: false,
            frame_count_mod: 0,
            mipmap_input: false,
        }
    }
}

/// One vertex + fragment program with its preset settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPass {
    pub config: PassConfig,
    pub source: ShaderSource,
}

impl ShaderPass {
    pub fn new(config: PassConfig, source: ShaderSource) -> Self {
        Self { config, source }
    }

    /// Preset alias, falling back to the source's `#pragma name`.
    pub fn alias(&self) -> Option<&str> {
        self.config
            .alias
            .as_deref()
            .or(self.source.name.as_deref())
            .filter(|a| !a.is_empty())
    }

    /// Render target format for this pass.
    pub fn resolved_format(&self) -> PixelFormat {
        if let Some(format) = self.config.format.filter(|f| *f != PixelFormat::Unknown) {
            return format;
        }
        if let Some(format) = self.source.format.filter(|f| *f != PixelFormat::Unknown) {
            return format;
        }
        if self.config.srgb_framebuffer {
            PixelFormat::R8G8B8A8Srgb
        } else if self.config.float_framebuffer {
            PixelFormat::R16G16B16A16Sfloat
        } else {
            PixelFormat::R8G8B8A8Unorm
        }
    }

    /// Frame counter value seen by this pass.
    pub fn frame_count(&self, frame: u64) -> u32 {
        match self.config.frame_count_mod {
            0 => frame as u32,
            m => (frame % u64::from(m)) as u32,
        }
    }
}

/// Preset file layout: passes plus lookup textures and parameter overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetFile {
    pub passes: Vec<PassConfig>,
    #[serde(default)]
    pub textures: Vec<LookupTexture>,
    #[serde(default)]
    pub parameters: HashMap<String, f32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderPreset {
    pub passes: Vec<ShaderPass>,
    pub textures: Vec<LookupTexture>,
    /// Parameters in preset order; the position is the parameter index.
    pub parameters: Vec<ShaderParameter>,
}

impl ShaderPreset {
    /// Assemble a preset, collecting parameters from the pass sources in pass order.
    pub fn new(passes: Vec<ShaderPass>, textures: Vec<LookupTexture>) -> Self {
        let mut parameters: Vec<ShaderParameter> = Vec::new();
        for pass in &passes {
            for param in &pass.source.parameters {
                if parameters.iter().any(|p| p.name == param.name) {
                    continue;
                }
                if parameters.len() == MAX_PARAMETERS {
                    log::warn!(
                        "parameter '{}' ignored: preset already declares {MAX_PARAMETERS} parameters",
                        param.name
                    );
                    continue;
                }
                parameters.push(param.clone());
            }
        }
        Self {
            passes,
            textures,
            parameters,
        }
    }

    /// Load a JSON preset and the shader sources it references.
    /// Relative paths resolve against the preset's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read preset {}", path.display()))?;
        let file: PresetFile = serde_json::from_str(&text)
            .with_context(|| format!("invalid preset json in {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base)
    }

    pub fn from_file(file: PresetFile, base: &Path) -> Result<Self> {
        if file.passes.is_empty() {
            bail!("preset declares no passes");
        }
        if file.passes.len() > MAX_PASSES {
            bail!(
                "preset declares {} passes, limit is {MAX_PASSES}",
                file.passes.len()
            );
        }

        let mut passes = Vec::with_capacity(file.passes.len());
        for config in file.passes {
            let source = ShaderSource::load(base.join(&config.path))?;
            passes.push(ShaderPass::new(config, source));
        }
        let textures = file
            .textures
            .into_iter()
            .map(|mut t| {
                t.path = base.join(&t.path);
                t
            })
            .collect();

        let mut preset = Self::new(passes, textures);
        for (name, value) in &file.parameters {
            match preset.parameters.iter_mut().find(|p| &p.name == name) {
                Some(param) => param.initial = *value,
                None => log::warn!("preset overrides unknown parameter '{name}'"),
            }
        }
        Ok(preset)
    }

    pub fn parameter_index(&self, name: &str) -> Option<u32> {
        self.parameters
            .iter()
            .position(|p| p.name == name)
            .map(|i| i as u32)
    }

    pub fn texture_index(&self, name: &str) -> Option<u32> {
        self.textures
            .iter()
            .position(|t| t.name == name)
            .map(|i| i as u32)
    }

    /// Output size of pass `index`.
    pub fn pass_output_size(&self, index: usize, source: [u32; 2], viewport: [u32; 2]) -> Option<[u32; 2]> {
        let pass = self.passes.get(index)?;
        let is_final = index + 1 == self.passes.len();
        Some(pass.config.scale.output_size(source, viewport, is_final))
    }
}
