//! Per-pass binding state.

use std::collections::BTreeMap;

use crate::{
    formats::PixelFormat,
    reflect::registry::DataRef,
    semantics::{BufferSemantic, StageMask, TextureSemantic},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformStorage {
    Ubo,
    PushConstant,
}

/// Size and slot of a uniform or push-constant block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    pub binding: u32,
    pub size: u32,
    pub stage_mask: StageMask,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub binding: u32,
    pub stage_mask: StageMask,
    pub image: DataRef,
}

/// A uniform value at `offset` within the pass's UBO or push-constant block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformBinding {
    pub storage: UniformStorage,
    pub offset: u32,
    pub size: u32,
    pub stage_mask: StageMask,
    pub data: DataRef,
}

/// Resources one pass binds, keyed by semantic category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSemantics {
    pub ubo: Option<BlockLayout>,
    pub push_constant: Option<BlockLayout>,
    textures: [BTreeMap<u32, TextureBinding>; TextureSemantic::COUNT],
    texture_sizes: [BTreeMap<u32, UniformBinding>; TextureSemantic::COUNT],
    buffers: [Option<UniformBinding>; BufferSemantic::COUNT],
    parameters: BTreeMap<u32, UniformBinding>,
}

fn merge_block(slot: &mut Option<BlockLayout>, block: BlockLayout) {
    *slot = Some(match slot.take() {
        Some(existing) => BlockLayout {
            binding: block.binding,
            size: existing.size.max(block.size),
            stage_mask: existing.stage_mask | block.stage_mask,
        },
        None => block,
    });
}

fn merge_uniform(existing: Option<&UniformBinding>, mut binding: UniformBinding) -> UniformBinding {
    if let Some(existing) = existing {
        binding.stage_mask |= existing.stage_mask;
    }
    binding
}

impl PassSemantics {
    pub fn texture(&self, semantic: TextureSemantic, index: u32) -> Option<&TextureBinding> {
        self.textures[semantic.ordinal()].get(&index)
    }

    pub fn texture_size(&self, semantic: TextureSemantic, index: u32) -> Option<&UniformBinding> {
        self.texture_sizes[semantic.ordinal()].get(&index)
    }

    pub fn buffer(&self, semantic: BufferSemantic) -> Option<&UniformBinding> {
        self.buffers[semantic.ordinal()].as_ref()
    }

    pub fn parameter(&self, index: u32) -> Option<&UniformBinding> {
        self.parameters.get(&index)
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureSemantic, u32, &TextureBinding)> {
        TextureSemantic::ALL.into_iter().flat_map(move |s| {
            self.textures[s.ordinal()]
                .iter()
                .map(move |(index, binding)| (s, *index, binding))
        })
    }

    pub fn texture_sizes(&self) -> impl Iterator<Item = (TextureSemantic, u32, &UniformBinding)> {
        TextureSemantic::ALL.into_iter().flat_map(move |s| {
            self.texture_sizes[s.ordinal()]
                .iter()
                .map(move |(index, binding)| (s, *index, binding))
        })
    }

    pub fn buffers(&self) -> impl Iterator<Item = (BufferSemantic, &UniformBinding)> {
        BufferSemantic::ALL
            .into_iter()
            .filter_map(move |s| self.buffer(s).map(|b| (s, b)))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (u32, &UniformBinding)> {
        self.parameters.iter().map(|(i, b)| (*i, b))
    }

    /// Category and index of the texture bound at `slot`, if any.
    pub fn texture_at_slot(&self, slot: u32) -> Option<(TextureSemantic, u32)> {
        self.textures()
            .find(|(_, _, binding)| binding.binding == slot)
            .map(|(s, index, _)| (s, index))
    }

    /// Whether the pass samples the category or reads any of its sizes.
    pub fn uses_texture_category(&self, semantic: TextureSemantic) -> bool {
        !self.textures[semantic.ordinal()].is_empty()
            || !self.texture_sizes[semantic.ordinal()].is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.ubo.is_none()
            && self.push_constant.is_none()
            && self.textures.iter().all(BTreeMap::is_empty)
            && self.texture_sizes.iter().all(BTreeMap::is_empty)
            && self.buffers.iter().all(Option::is_none)
            && self.parameters.is_empty()
    }

    // Insertions: the latest report for a category wins, stage masks accumulate.

    pub(crate) fn insert_block(&mut self, storage: UniformStorage, block: BlockLayout) {
        match storage {
            UniformStorage::Ubo => merge_block(&mut self.ubo, block),
            UniformStorage::PushConstant => merge_block(&mut self.push_constant, block),
        }
    }

    pub(crate) fn insert_texture(
        &mut self,
        semantic: TextureSemantic,
        index: u32,
        mut binding: TextureBinding,
    ) {
        let map = &mut self.textures[semantic.ordinal()];
        if let Some(existing) = map.get(&index) {
            binding.stage_mask |= existing.stage_mask;
        }
        map.insert(index, binding);
    }

    pub(crate) fn insert_texture_size(
        &mut self,
        semantic: TextureSemantic,
        index: u32,
        binding: UniformBinding,
    ) {
        let map = &mut self.texture_sizes[semantic.ordinal()];
        let merged = merge_uniform(map.get(&index), binding);
        map.insert(index, merged);
    }

    pub(crate) fn insert_buffer(&mut self, semantic: BufferSemantic, binding: UniformBinding) {
        let slot = &mut self.buffers[semantic.ordinal()];
        *slot = Some(merge_uniform(slot.as_ref(), binding));
    }

    pub(crate) fn insert_parameter(&mut self, index: u32, binding: UniformBinding) {
        let merged = merge_uniform(self.parameters.get(&index), binding);
        self.parameters.insert(index, merged);
    }
}

/// Binding record of one pass, kept for the compiler's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassBindings {
    /// Render target format, refreshed on every build.
    pub format: PixelFormat,
    /// Resources found by the latest successful reflection.
    pub semantics: PassSemantics,
}

impl PassBindings {
    pub fn native_format(&self) -> Option<wgpu::TextureFormat> {
        self.format.native()
    }

    pub fn texture_at_slot(&self, slot: u32) -> Option<(TextureSemantic, u32)> {
        self.semantics.texture_at_slot(slot)
    }
}
