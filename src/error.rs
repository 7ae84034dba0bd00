//! Error types
//!
//! Failures are split by where they happen in the pipeline:
//! - [`CompileError`]: source text could not be turned into intermediate bytes
//! - [`BackendError`]: intermediate bytes were rejected or could not be lowered
//! - [`ReflectError`]: generated code exists but its bindings could not be mapped
//! - [`BuildError`]: what `PassCompiler::build_pass` returns to its caller

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::semantics::{ShaderStage, TextureSemantic};

/// Messages reported by a source compiler for one failed compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub messages: Vec<String>,
}

impl Diagnostics {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            return f.write_str("no diagnostics reported");
        }
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to compile {stage} stage of pass {pass} ({}):\n{diagnostics}", path.display())]
    Source {
        pass: usize,
        stage: ShaderStage,
        path: PathBuf,
        diagnostics: Diagnostics,
    },

    #[error("failed to create shader cache directory {}: {source}", path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("intermediate form rejected: {0}")]
    Parse(String),

    #[error("failed to create target compiler: {0}")]
    Create(String),

    #[error("target code generation failed: {0}")]
    Generate(String),

    #[error("target code generation produced no output")]
    EmptyOutput,

    #[error("failed to enumerate bindings: {0}")]
    Reflect(String),
}

/// Failure of one stage's source → intermediate → target pipeline.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("{stage} stage: {source}")]
    Enumerate {
        stage: ShaderStage,
        #[source]
        source: BackendError,
    },

    #[error("{stage} stage binds {semantic:?}{index} at texture slot {slot}, limit is {limit}")]
    TextureSlotOutOfRange {
        stage: ShaderStage,
        semantic: TextureSemantic,
        index: u32,
        slot: u32,
        limit: u32,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("pass index {index} out of range (preset has {count} passes)")]
    PassOutOfRange { index: usize, count: usize },

    #[error("failed to build {stage} stage of pass {pass}")]
    BuildFailed {
        pass: usize,
        stage: ShaderStage,
        #[source]
        source: StageError,
    },

    #[error("failed to reflect pass {pass}")]
    ProcessFailed {
        pass: usize,
        #[source]
        source: ReflectError,
    },
}

impl BuildError {
    pub fn is_build_failed(&self) -> bool {
        matches!(self, BuildError::BuildFailed { .. })
    }

    pub fn is_process_failed(&self) -> bool {
        matches!(self, BuildError::ProcessFailed { .. })
    }
}

/// Malformed combined shader source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{path}: no {stage} stage found")]
    MissingStage { path: String, stage: ShaderStage },

    #[error("{path}:{line}: unknown stage '{name}'")]
    UnknownStage {
        path: String,
        line: usize,
        name: String,
    },

    #[error("{path}:{line}: malformed #pragma parameter: {text}")]
    BadParameter {
        path: String,
        line: usize,
        text: String,
    },

    #[error("{path}:{line}: unknown format '{name}'")]
    BadFormat {
        path: String,
        line: usize,
        name: String,
    },
}
