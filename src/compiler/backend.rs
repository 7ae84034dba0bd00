//! Collaborator interfaces for the two-stage transpiler.
//!
//! Stage one ([`SourceCompiler`]) turns shader source into intermediate bytes;
//! stage two ([`ShaderBackend`] / [`BackendCompiler`]) parses those bytes,
//! emits target-language source and reports the resources the shader declares.
//! Diagnostics come back in the `Err` side of each call.

use crate::{
    compiler::options::TargetDialect,
    error::{BackendError, Diagnostics},
    semantics::ShaderStage,
};

pub trait SourceCompiler {
    fn compile(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>, Diagnostics>;
}

pub trait ShaderBackend {
    type Parsed;
    type Compiler: BackendCompiler;

    fn parse(&self, intermediate: &[u8]) -> Result<Self::Parsed, BackendError>;

    fn create_compiler(
        &self,
        parsed: Self::Parsed,
        dialect: TargetDialect,
    ) -> Result<Self::Compiler, BackendError>;
}

/// One stage's backend state; dropped when the build call returns.
pub trait BackendCompiler {
    /// Select the target language version (`major*10000 + minor*100 + patch`).
    fn set_version(&mut self, token: u32);

    fn generate(&mut self) -> Result<String, BackendError>;

    fn enumerate_bindings(&self) -> Result<Vec<ReportedBinding>, BackendError>;
}

impl<T: SourceCompiler + ?Sized> SourceCompiler for &T {
    fn compile(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>, Diagnostics> {
        (**self).compile(source, stage)
    }
}

impl<T: ShaderBackend + ?Sized> ShaderBackend for &T {
    type Parsed = T::Parsed;
    type Compiler = T::Compiler;

    fn parse(&self, intermediate: &[u8]) -> Result<Self::Parsed, BackendError> {
        (**self).parse(intermediate)
    }

    fn create_compiler(
        &self,
        parsed: Self::Parsed,
        dialect: TargetDialect,
    ) -> Result<Self::Compiler, BackendError> {
        (**self).create_compiler(parsed, dialect)
    }
}

/// Resource kind as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Texture,
    Sampler,
    /// Uniform block itself; `index` is its binding.
    UniformBlock { size: u32 },
    /// Push-constant block itself.
    PushConstantBlock { size: u32 },
    /// Member of the uniform block at `index`.
    UniformMember { offset: u32, size: u32 },
    PushConstantMember { offset: u32, size: u32 },
}

impl BindingKind {
    pub fn is_member(self) -> bool {
        matches!(
            self,
            BindingKind::UniformMember { .. } | BindingKind::PushConstantMember { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReportedBinding {
    pub name: String,
    pub kind: BindingKind,
    /// Binding slot of the resource (or of the enclosing block for members).
    pub index: u32,
}

impl ReportedBinding {
    pub fn new(name: impl Into<String>, kind: BindingKind, index: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            index,
        }
    }

    pub fn texture(name: impl Into<String>, slot: u32) -> Self {
        Self::new(name, BindingKind::Texture, slot)
    }

    pub fn uniform_member(name: impl Into<String>, block: u32, offset: u32, size: u32) -> Self {
        Self::new(name, BindingKind::UniformMember { offset, size }, block)
    }

    pub fn push_constant_member(name: impl Into<String>, offset: u32, size: u32) -> Self {
        Self::new(name, BindingKind::PushConstantMember { offset, size }, 0)
    }
}
