//! Binding reflection.
//!
//! Maps the resources a backend reports for a compiled stage onto the
//! semantic vocabulary. Matching is by symbol name (case-sensitive):
//!
//! | Symbol | Category |
//! |--------|----------|
//! | `Original`, `Source` | unindexed textures |
//! | `OriginalHistoryN`, `PassOutputN`, `PassFeedbackN` | numbered textures |
//! | pass alias, `<alias>Feedback` | `PassOutput` / `PassFeedback` of that pass |
//! | lookup texture name | `User` |
//! | any of the above + `Size` (numbered: `PassOutputSizeN`, ...) | texture size vector |
//! | `MVP`, `OutputSize`, `FinalViewportSize`, `FrameCount`, `FrameDirection` | buffers |
//! | declared parameter name | parameter, keyed by preset index |
//!
//! Anything else is ignored.

pub mod pass_semantics;
pub mod registry;

use std::collections::HashMap;

use log::{trace, warn};

use crate::{
    compiler::backend::{BindingKind, ReportedBinding},
    error::ReflectError,
    preset::ShaderPreset,
    semantics::{
        BufferSemantic, FEEDBACK_SUFFIX, MAX_BOUND_TEXTURES, MAX_HISTORY, SIZE_SUFFIX, ShaderStage,
        TextureSemantic,
    },
};

use pass_semantics::{BlockLayout, PassSemantics, TextureBinding, UniformBinding, UniformStorage};
use registry::SemanticSources;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    Texture { semantic: TextureSemantic, index: u32 },
    TextureSize { semantic: TextureSemantic, index: u32 },
    Buffer(BufferSemantic),
    Parameter(u32),
    Unrecognized,
}

const NUMBERED: [TextureSemantic; 3] = [
    TextureSemantic::OriginalHistory,
    TextureSemantic::PassOutput,
    TextureSemantic::PassFeedback,
];

/// Preset-derived names that drive classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SemanticNames {
    pass_count: usize,
    aliases: Vec<Option<String>>,
    textures: Vec<String>,
    parameters: HashMap<String, u32>,
}

impl SemanticNames {
    pub fn from_preset(preset: &ShaderPreset) -> Self {
        let aliases = preset
            .passes
            .iter()
            .map(|p| p.alias().map(str::to_string))
            .collect();
        let textures = preset.textures.iter().map(|t| t.name.clone()).collect();
        let parameters = preset
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i as u32))
            .collect();
        Self {
            pass_count: preset.passes.len(),
            aliases,
            textures,
            parameters,
        }
    }

    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    /// Classify one reported binding of pass `pass_index`.
    ///
    /// Pure: the result depends only on the arguments and the preset names.
    /// The stage is accepted for symmetry with the backend's report; the
    /// vocabulary does not differ between stages.
    pub fn classify(
        &self,
        pass_index: usize,
        binding: &ReportedBinding,
        _stage: ShaderStage,
    ) -> Classification {
        match binding.kind {
            BindingKind::Texture => match self.texture_symbol(pass_index, &binding.name) {
                Some((semantic, index)) => Classification::Texture { semantic, index },
                None => Classification::Unrecognized,
            },
            kind if kind.is_member() => self.member_symbol(pass_index, &binding.name),
            _ => Classification::Unrecognized,
        }
    }

    fn member_symbol(&self, pass_index: usize, name: &str) -> Classification {
        if let Some(semantic) = BufferSemantic::from_symbol(name) {
            return Classification::Buffer(semantic);
        }
        if let Some((semantic, index)) = self.size_symbol(pass_index, name) {
            return Classification::TextureSize { semantic, index };
        }
        if let Some(index) = self.parameters.get(name) {
            return Classification::Parameter(*index);
        }
        Classification::Unrecognized
    }

    fn texture_symbol(&self, pass_index: usize, name: &str) -> Option<(TextureSemantic, u32)> {
        if let Some(semantic) = unindexed(name) {
            return Some((semantic, 0));
        }
        for semantic in NUMBERED {
            if let Some(prefix) = semantic.symbol()
                && let Some(suffix) = name.strip_prefix(prefix)
                && is_numeric_suffix(suffix)
            {
                return self.numbered(pass_index, semantic, suffix, name);
            }
        }
        self.named_texture(pass_index, name)
    }

    fn size_symbol(&self, pass_index: usize, name: &str) -> Option<(TextureSemantic, u32)> {
        for semantic in NUMBERED {
            if let Some(prefix) = semantic.symbol()
                && let Some(rest) = name.strip_prefix(prefix)
                && let Some(suffix) = rest.strip_prefix(SIZE_SUFFIX)
                && is_numeric_suffix(suffix)
            {
                return self.numbered(pass_index, semantic, suffix, name);
            }
        }
        let stem = name.strip_suffix(SIZE_SUFFIX)?;
        match unindexed(stem) {
            Some(semantic) => Some((semantic, 0)),
            None => self.named_texture(pass_index, stem),
        }
    }

    // Aliases and lookup textures.
    fn named_texture(&self, pass_index: usize, name: &str) -> Option<(TextureSemantic, u32)> {
        if name.is_empty() {
            return None;
        }
        for (i, alias) in self.aliases.iter().enumerate() {
            let Some(alias) = alias.as_deref() else {
                continue;
            };
            if alias == name {
                if i < pass_index {
                    return Some((TextureSemantic::PassOutput, i as u32));
                }
                // A later pass's alias may still name a lookup texture.
                warn!("pass {pass_index} references alias '{name}' of pass {i}, which has not run yet");
                break;
            }
            if name.strip_suffix(FEEDBACK_SUFFIX) == Some(alias) {
                return Some((TextureSemantic::PassFeedback, i as u32));
            }
        }
        self.textures
            .iter()
            .position(|t| t == name)
            .map(|i| (TextureSemantic::User, i as u32))
    }

    fn numbered(
        &self,
        pass_index: usize,
        semantic: TextureSemantic,
        suffix: &str,
        name: &str,
    ) -> Option<(TextureSemantic, u32)> {
        let Ok(index) = suffix.parse::<u32>() else {
            warn!("dropping '{name}': index does not fit");
            return None;
        };
        let in_range = match semantic {
            TextureSemantic::OriginalHistory => index < MAX_HISTORY,
            TextureSemantic::PassOutput => (index as usize) < pass_index,
            TextureSemantic::PassFeedback => (index as usize) < self.pass_count,
            _ => false,
        };
        if !in_range {
            warn!("dropping '{name}' in pass {pass_index}: index {index} out of range");
            return None;
        }
        if semantic == TextureSemantic::OriginalHistory && index == 0 {
            return Some((TextureSemantic::Original, 0));
        }
        Some((semantic, index))
    }
}

fn unindexed(name: &str) -> Option<TextureSemantic> {
    TextureSemantic::ALL
        .into_iter()
        .filter(|s| !s.is_indexed())
        .find(|s| s.symbol() == Some(name))
}

/// Decimal digits in canonical form: `0` alone, otherwise no leading zero.
fn is_numeric_suffix(suffix: &str) -> bool {
    !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && (suffix.len() == 1 || !suffix.starts_with('0'))
}

/// Classify every binding both stages report and assemble the pass's semantics.
///
/// Nothing is written outside the returned value; the caller commits it once
/// the whole pass succeeded.
pub fn reflect_pass(
    names: &SemanticNames,
    pass_index: usize,
    stages: &[(ShaderStage, Vec<ReportedBinding>)],
    sources: &SemanticSources,
) -> Result<PassSemantics, ReflectError> {
    let mut semantics = PassSemantics::default();

    for (stage, bindings) in stages {
        let stage = *stage;
        let mask = stage.mask();
        for binding in bindings {
            let uniform = |storage, offset, size, data| UniformBinding {
                storage,
                offset,
                size,
                stage_mask: mask,
                data,
            };

            let (storage, offset, size) = match binding.kind {
                BindingKind::UniformBlock { size } => {
                    semantics.insert_block(
                        UniformStorage::Ubo,
                        BlockLayout { binding: binding.index, size, stage_mask: mask },
                    );
                    continue;
                }
                BindingKind::PushConstantBlock { size } => {
                    semantics.insert_block(
                        UniformStorage::PushConstant,
                        BlockLayout { binding: binding.index, size, stage_mask: mask },
                    );
                    continue;
                }
                BindingKind::UniformMember { offset, size } => (UniformStorage::Ubo, offset, size),
                BindingKind::PushConstantMember { offset, size } => {
                    (UniformStorage::PushConstant, offset, size)
                }
                BindingKind::Texture | BindingKind::Sampler => (UniformStorage::Ubo, 0, 0),
            };

            match names.classify(pass_index, binding, stage) {
                Classification::Texture { semantic, index } => {
                    if binding.index >= MAX_BOUND_TEXTURES {
                        return Err(ReflectError::TextureSlotOutOfRange {
                            stage,
                            semantic,
                            index,
                            slot: binding.index,
                            limit: MAX_BOUND_TEXTURES,
                        });
                    }
                    trace!("pass {pass_index} {stage}: {} -> {semantic:?}[{index}] @ {}", binding.name, binding.index);
                    semantics.insert_texture(
                        semantic,
                        index,
                        TextureBinding {
                            binding: binding.index,
                            stage_mask: mask,
                            image: sources.texture(semantic).image_at(index),
                        },
                    );
                }
                Classification::TextureSize { semantic, index } => {
                    trace!("pass {pass_index} {stage}: {} -> {semantic:?}Size[{index}]", binding.name);
                    semantics.insert_texture_size(
                        semantic,
                        index,
                        uniform(storage, offset, size, sources.texture(semantic).size_at(index)),
                    );
                }
                Classification::Buffer(semantic) => {
                    trace!("pass {pass_index} {stage}: {} -> {semantic:?}", binding.name);
                    semantics.insert_buffer(
                        semantic,
                        uniform(storage, offset, size, sources.buffer(semantic)),
                    );
                }
                Classification::Parameter(index) => {
                    trace!("pass {pass_index} {stage}: {} -> parameter {index}", binding.name);
                    semantics.insert_parameter(
                        index,
                        uniform(storage, offset, size, sources.parameter(index)),
                    );
                }
                Classification::Unrecognized => {
                    trace!("pass {pass_index} {stage}: {} unrecognized", binding.name);
                }
            }
        }
    }

    Ok(semantics)
}
