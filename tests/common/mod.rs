#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use preset_shader_compiler::{
    ShaderPass, ShaderPreset,
    compiler::{
        backend::{BackendCompiler, BindingKind, ReportedBinding, ShaderBackend, SourceCompiler},
        options::TargetDialect,
    },
    error::{BackendError, Diagnostics},
    preset::{LookupTexture, PassConfig, ShaderParameter},
    semantics::ShaderStage,
    source::ShaderSource,
};

/// Source compilation fails when the text contains this marker.
pub const FAIL_COMPILE: &str = "!fail-compile";
/// Backend parse fails.
pub const FAIL_PARSE: &str = "!fail-parse";
/// Backend generates an empty string.
pub const EMPTY_OUTPUT: &str = "!empty-output";
/// Binding enumeration fails.
pub const FAIL_REFLECT: &str = "!fail-reflect";

/// Intermediate bytes are `"<stage>\n<source>"`; every call is counted.
#[derive(Debug, Default)]
pub struct CountingCompiler {
    calls: AtomicUsize,
}

impl CountingCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceCompiler for CountingCompiler {
    fn compile(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>, Diagnostics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.contains(FAIL_COMPILE) {
            return Err(Diagnostics::new(format!("{stage}: forced failure")));
        }
        Ok(format!("{}\n{source}", stage.token()).into_bytes())
    }
}

/// Backend that reads bindings from `// bind ...` lines in the intermediate text:
///
/// ```text
/// // bind texture <name> <slot>
/// // bind sampler <name> <slot>
/// // bind ubo <binding> <size>
/// // bind push <size>
/// // bind member <name> <block> <offset> <size>
/// // bind pushmember <name> <offset> <size>
/// ```
#[derive(Debug, Default)]
pub struct ScriptedBackend;

pub struct ScriptedCompiler {
    text: String,
    dialect: TargetDialect,
    version: u32,
}

impl ShaderBackend for ScriptedBackend {
    type Parsed = String;
    type Compiler = ScriptedCompiler;

    fn parse(&self, intermediate: &[u8]) -> Result<String, BackendError> {
        let text = String::from_utf8(intermediate.to_vec())
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        if text.contains(FAIL_PARSE) {
            return Err(BackendError::Parse("forced failure".to_string()));
        }
        Ok(text)
    }

    fn create_compiler(
        &self,
        parsed: String,
        dialect: TargetDialect,
    ) -> Result<ScriptedCompiler, BackendError> {
        Ok(ScriptedCompiler {
            text: parsed,
            dialect,
            version: 0,
        })
    }
}

fn number(field: Option<&str>) -> Result<u32, BackendError> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| BackendError::Reflect("bad bind line".to_string()))
}

impl BackendCompiler for ScriptedCompiler {
    fn set_version(&mut self, token: u32) {
        self.version = token;
    }

    fn generate(&mut self) -> Result<String, BackendError> {
        if self.text.contains(EMPTY_OUTPUT) {
            return Ok(String::new());
        }
        Ok(format!("// {:?} {}\n{}", self.dialect, self.version, self.text))
    }

    fn enumerate_bindings(&self) -> Result<Vec<ReportedBinding>, BackendError> {
        if self.text.contains(FAIL_REFLECT) {
            return Err(BackendError::Reflect("forced failure".to_string()));
        }
        let mut out = Vec::new();
        for line in self.text.lines() {
            let Some(rest) = line.trim().strip_prefix("// bind ") else {
                continue;
            };
            let mut f = rest.split_whitespace();
            let binding = match f.next() {
                Some("texture") => {
                    let name = f.next().unwrap_or_default();
                    ReportedBinding::texture(name, number(f.next())?)
                }
                Some("sampler") => {
                    let name = f.next().unwrap_or_default();
                    ReportedBinding::new(name, BindingKind::Sampler, number(f.next())?)
                }
                Some("ubo") => {
                    let binding = number(f.next())?;
                    let size = number(f.next())?;
                    ReportedBinding::new("UBO", BindingKind::UniformBlock { size }, binding)
                }
                Some("push") => {
                    let size = number(f.next())?;
                    ReportedBinding::new("Push", BindingKind::PushConstantBlock { size }, 0)
                }
                Some("member") => {
                    let name = f.next().unwrap_or_default();
                    let block = number(f.next())?;
                    let offset = number(f.next())?;
                    let size = number(f.next())?;
                    ReportedBinding::uniform_member(name, block, offset, size)
                }
                Some("pushmember") => {
                    let name = f.next().unwrap_or_default();
                    let offset = number(f.next())?;
                    let size = number(f.next())?;
                    ReportedBinding::push_constant_member(name, offset, size)
                }
                _ => return Err(BackendError::Reflect(format!("unknown bind line: {line}"))),
            };
            out.push(binding);
        }
        Ok(out)
    }
}

pub fn parameter(name: &str) -> ShaderParameter {
    ShaderParameter {
        name: name.to_string(),
        description: name.to_string(),
        initial: 0.5,
        minimum: 0.0,
        maximum: 1.0,
        step: 0.05,
    }
}

pub fn pass(path: &str, vertex: &str, fragment: &str, params: &[&str]) -> ShaderPass {
    let mut source = ShaderSource::from_stages(path, vertex, fragment);
    source.parameters = params.iter().map(|p| parameter(p)).collect();
    ShaderPass::new(PassConfig::new(path), source)
}

pub fn lookup(name: &str) -> LookupTexture {
    LookupTexture {
        name: name.to_string(),
        path: format!("{name}.png").into(),
        filter: Default::default(),
        wrap: Default::default(),
        mipmap: false,
    }
}

pub fn preset(passes: Vec<ShaderPass>) -> Arc<ShaderPreset> {
    Arc::new(ShaderPreset::new(passes, Vec::new()))
}
