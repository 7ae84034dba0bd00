//! Pass compiler.
//!
//! Drives each pass of a preset through the two-stage transpiler:
//!
//! ```text
//! source ──(TranspileCache / SourceCompiler)──► intermediate bytes
//!        ──(ShaderBackend::parse + create_compiler)──► BackendCompiler
//!        ──(generate)──► target source       ──(enumerate_bindings)──► reflection
//! ```
//!
//! The compiler owns one [`PassBindings`] record per pass for its whole
//! lifetime. Backend state is created per call and dropped on every exit path.

pub mod backend;
pub mod cache;
pub mod naga_backend;
pub mod options;

use std::sync::Arc;

use log::debug;

use crate::{
    error::{BackendError, BuildError, ReflectError, StageError},
    preset::{ShaderPass, ShaderPreset},
    reflect::{
        SemanticNames,
        pass_semantics::PassBindings,
        reflect_pass,
        registry::SemanticsRegistry,
    },
    semantics::ShaderStage,
};

use backend::{BackendCompiler, ShaderBackend, SourceCompiler};
use cache::TranspileCache;
use options::CompilerOptions;

/// Target-language text for both stages of one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedPass {
    pub vertex: String,
    pub fragment: String,
}

impl GeneratedPass {
    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

pub struct PassCompiler<C, B> {
    preset: Arc<ShaderPreset>,
    names: SemanticNames,
    cache: TranspileCache<C>,
    backend: B,
    bindings: Vec<PassBindings>,
}

impl<C: SourceCompiler, B: ShaderBackend> PassCompiler<C, B> {
    /// `compiler_version` identifies the source compiler build; it is part of
    /// every cache key.
    pub fn new(
        preset: Arc<ShaderPreset>,
        compiler: C,
        backend: B,
        compiler_version: impl Into<String>,
    ) -> Self {
        let names = SemanticNames::from_preset(&preset);
        let bindings = vec![PassBindings::default(); preset.passes.len()];
        Self {
            preset,
            names,
            cache: TranspileCache::new(compiler, compiler_version),
            backend,
            bindings,
        }
    }

    pub fn preset(&self) -> &ShaderPreset {
        &self.preset
    }

    pub fn pass_count(&self) -> usize {
        self.preset.passes.len()
    }

    pub fn bindings(&self) -> &[PassBindings] {
        &self.bindings
    }

    pub fn pass_bindings(&self, index: usize) -> Option<&PassBindings> {
        self.bindings.get(index)
    }

    pub fn transpile_cache(&self) -> &TranspileCache<C> {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compile pass `index` to the configured target language.
    ///
    /// When `registry` is given the pass is also reflected: its bindings are
    /// classified and recorded both in the pass's [`PassBindings`] and in the
    /// registry. Without a registry only code is generated (useful to warm the
    /// cache).
    ///
    /// The pass's pixel format is refreshed before anything else and stays
    /// refreshed even if the call fails. Nothing else is modified on failure.
    pub fn build_pass(
        &mut self,
        index: usize,
        options: &CompilerOptions,
        registry: Option<&mut SemanticsRegistry>,
    ) -> Result<GeneratedPass, BuildError> {
        let preset = Arc::clone(&self.preset);
        let pass = preset.passes.get(index).ok_or(BuildError::PassOutOfRange {
            index,
            count: preset.passes.len(),
        })?;

        self.bindings[index].format = pass.resolved_format();

        let mut vertex = self.stage_compiler(index, pass, ShaderStage::Vertex, options)?;
        let mut fragment = self.stage_compiler(index, pass, ShaderStage::Fragment, options)?;

        let generated = GeneratedPass {
            vertex: generate(&mut vertex, index, ShaderStage::Vertex)?,
            fragment: generate(&mut fragment, index, ShaderStage::Fragment)?,
        };

        let Some(registry) = registry else {
            return Ok(generated);
        };

        let mut reported = Vec::with_capacity(ShaderStage::ALL.len());
        for (stage, compiler) in [(ShaderStage::Vertex, &vertex), (ShaderStage::Fragment, &fragment)] {
            let bindings = compiler
                .enumerate_bindings()
                .map_err(|source| BuildError::ProcessFailed {
                    pass: index,
                    source: ReflectError::Enumerate { stage, source },
                })?;
            reported.push((stage, bindings));
        }

        let semantics = reflect_pass(&self.names, index, &reported, registry.sources())
            .map_err(|source| BuildError::ProcessFailed { pass: index, source })?;

        debug!(
            "pass {index}: {} textures, {} texture sizes, {} buffers, {} parameters",
            semantics.textures().count(),
            semantics.texture_sizes().count(),
            semantics.buffers().count(),
            semantics.parameters().count()
        );

        registry.register(&semantics);
        self.bindings[index].semantics = semantics;
        Ok(generated)
    }

    /// Build every pass in order, stopping at the first failure.
    pub fn build_all(
        &mut self,
        options: &CompilerOptions,
        mut registry: Option<&mut SemanticsRegistry>,
    ) -> Result<Vec<GeneratedPass>, BuildError> {
        (0..self.pass_count())
            .map(|index| self.build_pass(index, options, registry.as_deref_mut()))
            .collect()
    }

    fn stage_compiler(
        &self,
        index: usize,
        pass: &ShaderPass,
        stage: ShaderStage,
        options: &CompilerOptions,
    ) -> Result<B::Compiler, BuildError> {
        let fail = |source: StageError| BuildError::BuildFailed { pass: index, stage, source };

        let intermediate = self
            .cache
            .obtain_intermediate(index, pass, stage, options)
            .map_err(|e| fail(e.into()))?;
        let parsed = self
            .backend
            .parse(&intermediate)
            .map_err(|e| fail(e.into()))?;
        let mut compiler = self
            .backend
            .create_compiler(parsed, options.language_version.dialect())
            .map_err(|e| fail(e.into()))?;
        compiler.set_version(options.language_version.token());
        Ok(compiler)
    }
}

fn generate<T: BackendCompiler>(
    compiler: &mut T,
    index: usize,
    stage: ShaderStage,
) -> Result<String, BuildError> {
    let fail = |source: BackendError| BuildError::BuildFailed {
        pass: index,
        stage,
        source: source.into(),
    };
    let text = compiler.generate().map_err(fail)?;
    if text.trim().is_empty() {
        return Err(fail(BackendError::EmptyOutput));
    }
    Ok(text)
}
