//! Multi-pass shader preset compiler.
//!
//! Compiles every pass of a preset through a cached two-stage transpiler and
//! reflects the resources each pass binds into a renderer-independent
//! semantic vocabulary.

pub mod compiler;
pub mod error;
pub mod formats;
pub mod preset;
pub mod reflect;
pub mod sampler;
pub mod semantics;
pub mod source;

pub use compiler::{
    GeneratedPass, PassCompiler,
    naga_backend::{NagaBackend, NagaSourceCompiler},
    options::{CompilerOptions, LanguageVersion},
};
pub use error::{BuildError, CompileError};
pub use preset::{ShaderPass, ShaderPreset};
pub use reflect::registry::{SemanticSources, SemanticsRegistry};
