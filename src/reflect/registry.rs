//! Semantics registry handed to the renderer.
//!
//! The caller describes where the data for every category lives
//! ([`SemanticSources`]); reflection records which of those categories the
//! compiled passes actually use. Absence from the registry means "unused".

use std::collections::BTreeMap;

use crate::{
    reflect::pass_semantics::PassSemantics,
    semantics::{BufferSemantic, TextureSemantic},
};

/// Opaque reference to caller-owned data (a handle, offset or index the
/// renderer understands).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataRef(pub u64);

impl DataRef {
    /// Reference to element `index` of an array starting here.
    /// Handles are opaque, so the arithmetic wraps.
    pub fn offset(self, index: u32, stride: u64) -> DataRef {
        DataRef(self.0.wrapping_add(u64::from(index).wrapping_mul(stride)))
    }
}

/// Where a texture category's images and size vectors live.
/// Indexed categories address element `N` at `base + N * stride`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureSource {
    pub image: DataRef,
    pub image_stride: u64,
    pub size: DataRef,
    pub size_stride: u64,
}

impl TextureSource {
    pub fn image_at(&self, index: u32) -> DataRef {
        self.image.offset(index, self.image_stride)
    }

    pub fn size_at(&self, index: u32) -> DataRef {
        self.size.offset(index, self.size_stride)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SemanticSources {
    pub textures: [TextureSource; TextureSemantic::COUNT],
    pub buffers: [DataRef; BufferSemantic::COUNT],
    pub parameters: DataRef,
    pub parameter_stride: u64,
}

impl SemanticSources {
    pub fn with_texture(mut self, semantic: TextureSemantic, source: TextureSource) -> Self {
        self.textures[semantic.ordinal()] = source;
        self
    }

    pub fn with_buffer(mut self, semantic: BufferSemantic, data: DataRef) -> Self {
        self.buffers[semantic.ordinal()] = data;
        self
    }

    pub fn with_parameters(mut self, base: DataRef, stride: u64) -> Self {
        self.parameters = base;
        self.parameter_stride = stride;
        self
    }

    pub fn texture(&self, semantic: TextureSemantic) -> &TextureSource {
        &self.textures[semantic.ordinal()]
    }

    pub fn buffer(&self, semantic: BufferSemantic) -> DataRef {
        self.buffers[semantic.ordinal()]
    }

    pub fn parameter(&self, index: u32) -> DataRef {
        self.parameters.offset(index, self.parameter_stride)
    }
}

/// Categories in use across all reflected passes, keyed by semantic identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SemanticsRegistry {
    sources: SemanticSources,
    textures: [Option<TextureSource>; TextureSemantic::COUNT],
    buffers: [Option<DataRef>; BufferSemantic::COUNT],
    parameters: BTreeMap<u32, DataRef>,
}

impl SemanticsRegistry {
    pub fn new(sources: SemanticSources) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn sources(&self) -> &SemanticSources {
        &self.sources
    }

    pub fn texture(&self, semantic: TextureSemantic) -> Option<&TextureSource> {
        self.textures[semantic.ordinal()].as_ref()
    }

    pub fn buffer(&self, semantic: BufferSemantic) -> Option<DataRef> {
        self.buffers[semantic.ordinal()]
    }

    pub fn parameter(&self, index: u32) -> Option<DataRef> {
        self.parameters.get(&index).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureSemantic, &TextureSource)> {
        TextureSemantic::ALL
            .into_iter()
            .filter_map(|s| self.texture(s).map(|t| (s, t)))
    }

    pub fn buffers(&self) -> impl Iterator<Item = (BufferSemantic, DataRef)> + '_ {
        BufferSemantic::ALL
            .into_iter()
            .filter_map(|s| self.buffer(s).map(|d| (s, d)))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (u32, DataRef)> + '_ {
        self.parameters.iter().map(|(i, d)| (*i, *d))
    }

    pub fn is_empty(&self) -> bool {
        self.textures.iter().all(Option::is_none)
            && self.buffers.iter().all(Option::is_none)
            && self.parameters.is_empty()
    }

    /// Record every category a pass uses. Re-registering overwrites.
    pub(crate) fn register(&mut self, pass: &PassSemantics) {
        for semantic in TextureSemantic::ALL {
            if pass.uses_texture_category(semantic) {
                self.textures[semantic.ordinal()] = Some(*self.sources.texture(semantic));
            }
        }
        for (semantic, binding) in pass.buffers() {
            self.buffers[semantic.ordinal()] = Some(binding.data);
        }
        for (index, binding) in pass.parameters() {
            self.parameters.insert(index, binding.data);
        }
    }
}
