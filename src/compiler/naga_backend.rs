//! Default transpiler built on naga.
//!
//! Vulkan-flavoured GLSL is lowered to SPIR-V (the intermediate form that gets
//! cached), then parsed back and written out as WGSL or GLSL/ESSL.
//!
//! The SPIR-V round trip loses the member names of uniform and push-constant
//! blocks, so the intermediate bytes carry them in a trailer:
//!
//! ```text
//! [SPIR-V words][name table json][json length: u32 le]["PSNT"]
//! ```

use naga::{AddressSpace, Module, TypeInner, valid::ModuleInfo};
use serde::{Deserialize, Serialize};

use crate::{
    compiler::{
        backend::{BackendCompiler, BindingKind, ReportedBinding, ShaderBackend, SourceCompiler},
        options::TargetDialect,
    },
    error::{BackendError, Diagnostics},
    semantics::ShaderStage,
};

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn validate(module: &Module) -> Result<ModuleInfo, String> {
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(module)
    .map_err(|e| format!("{e:?}"))
}

// ── Block member names ───────────────────────────────────────────────────

const NAME_TABLE_MAGIC: &[u8; 4] = b"PSNT";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockNames {
    push_constant: bool,
    group: u32,
    binding: u32,
    members: Vec<Option<String>>,
}

/// Member names of every uniform and push-constant block, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTable {
    blocks: Vec<BlockNames>,
}

impl NameTable {
    fn from_module(module: &Module) -> Self {
        let blocks = module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let push_constant = match var.space {
                    AddressSpace::PushConstant => true,
                    AddressSpace::Uniform => false,
                    _ => return None,
                };
                let TypeInner::Struct { members, .. } = &module.types[var.ty].inner else {
                    return None;
                };
                let (group, binding) = var
                    .binding
                    .as_ref()
                    .map_or((0, 0), |b| (b.group, b.binding));
                Some(BlockNames {
                    push_constant,
                    group,
                    binding,
                    members: members.iter().map(|m| m.name.clone()).collect(),
                })
            })
            .collect();
        Self { blocks }
    }

    /// Name of member `index` of the block at `(group, binding)`; push-constant
    /// blocks ignore the binding.
    pub fn member_name(
        &self,
        push_constant: bool,
        group: u32,
        binding: u32,
        index: usize,
    ) -> Option<&str> {
        self.blocks
            .iter()
            .find(|b| {
                b.push_constant == push_constant
                    && (push_constant || (b.group == group && b.binding == binding))
            })
            .and_then(|b| b.members.get(index))
            .and_then(|name| name.as_deref())
    }
}

fn append_name_table(bytes: &mut Vec<u8>, table: &NameTable) -> Result<(), String> {
    let json = serde_json::to_vec(table).map_err(|e| e.to_string())?;
    let len = u32::try_from(json.len()).map_err(|e| e.to_string())?;
    bytes.extend_from_slice(&json);
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(NAME_TABLE_MAGIC);
    Ok(())
}

/// Split intermediate bytes into SPIR-V and the name table (empty when absent).
fn split_name_table(bytes: &[u8]) -> Result<(&[u8], NameTable), BackendError> {
    let Some(rest) = bytes.strip_suffix(NAME_TABLE_MAGIC.as_slice()) else {
        return Ok((bytes, NameTable::default()));
    };
    let malformed = || BackendError::Parse("malformed name table".to_string());
    let len_start = rest.len().checked_sub(4).ok_or_else(malformed)?;
    let mut len = [0u8; 4];
    len.copy_from_slice(&rest[len_start..]);
    let json_start = len_start
        .checked_sub(u32::from_le_bytes(len) as usize)
        .ok_or_else(malformed)?;
    let table = serde_json::from_slice(&rest[json_start..len_start])
        .map_err(|e| BackendError::Parse(format!("malformed name table: {e}")))?;
    Ok((&rest[..json_start], table))
}

// ── Source → SPIR-V ──────────────────────────────────────────────────────

/// GLSL → SPIR-V through naga's GLSL frontend and SPIR-V writer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NagaSourceCompiler;

impl SourceCompiler for NagaSourceCompiler {
    fn compile(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>, Diagnostics> {
        let mut parser = naga::front::glsl::Frontend::default();
        let options = naga::front::glsl::Options {
            stage: naga_stage(stage),
            defines: Default::default(),
        };
        let module = parser
            .parse(&options, source)
            .map_err(|e| Diagnostics::new(format!("GLSL parse failed: {e:?}")))?;

        let info = validate(&module)
            .map_err(|e| Diagnostics::new(format!("GLSL validation failed: {e}")))?;

        // Debug names keep symbol names visible to reflection after the round trip.
        let mut spv_options = naga::back::spv::Options::default();
        spv_options.flags |= naga::back::spv::WriterFlags::DEBUG;

        let words = naga::back::spv::write_vec(&module, &info, &spv_options, None)
            .map_err(|e| Diagnostics::new(format!("SPIR-V writer failed: {e:?}")))?;
        let mut bytes = bytemuck::cast_slice::<u32, u8>(&words).to_vec();
        append_name_table(&mut bytes, &NameTable::from_module(&module))
            .map_err(|e| Diagnostics::new(format!("name table: {e}")))?;
        Ok(bytes)
    }
}

// ── SPIR-V → target ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
pub struct NagaBackend;

/// SPIR-V module parsed back from intermediate bytes.
#[derive(Debug)]
pub struct ParsedIntermediate {
    pub module: Module,
    pub names: NameTable,
}

impl ShaderBackend for NagaBackend {
    type Parsed = ParsedIntermediate;
    type Compiler = NagaCompiler;

    fn parse(&self, intermediate: &[u8]) -> Result<ParsedIntermediate, BackendError> {
        let (spirv, names) = split_name_table(intermediate)?;
        let module = naga::front::spv::parse_u8_slice(spirv, &naga::front::spv::Options::default())
            .map_err(|e| BackendError::Parse(format!("{e:?}")))?;
        Ok(ParsedIntermediate { module, names })
    }

    fn create_compiler(
        &self,
        parsed: ParsedIntermediate,
        dialect: TargetDialect,
    ) -> Result<NagaCompiler, BackendError> {
        let ParsedIntermediate { module: parsed, names } = parsed;
        let info = validate(&parsed).map_err(BackendError::Create)?;
        let entry = parsed
            .entry_points
            .first()
            .ok_or_else(|| BackendError::Create("module has no entry point".to_string()))?;
        let stage = entry.stage;
        let entry_point = entry.name.clone();
        Ok(NagaCompiler {
            module: parsed,
            names,
            info,
            dialect,
            stage,
            entry_point,
            version: None,
        })
    }
}

/// Validated module plus target settings for one stage.
pub struct NagaCompiler {
    module: Module,
    names: NameTable,
    info: ModuleInfo,
    dialect: TargetDialect,
    stage: naga::ShaderStage,
    entry_point: String,
    version: Option<u32>,
}

impl NagaCompiler {
    /// GLSL `#version` number (`450`, `310`, ...) for the selected token.
    fn glsl_version_number(&self) -> u16 {
        let default = match self.dialect {
            TargetDialect::Essl => 310,
            _ => 450,
        };
        match self.version {
            Some(token) => {
                let major = token / 10000;
                let minor = (token / 100) % 100;
                u16::try_from(major * 100 + minor * 10).unwrap_or(default)
            }
            None => default,
        }
    }

    fn write_glsl(&self, version: naga::back::glsl::Version) -> Result<String, BackendError> {
        let options = naga::back::glsl::Options {
            version,
            ..Default::default()
        };
        let pipeline = naga::back::glsl::PipelineOptions {
            shader_stage: self.stage,
            entry_point: self.entry_point.clone(),
            multiview: None,
        };
        let mut out = String::new();
        let mut writer = naga::back::glsl::Writer::new(
            &mut out,
            &self.module,
            &self.info,
            &options,
            &pipeline,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(|e| BackendError::Generate(format!("{e:?}")))?;
        writer
            .write()
            .map_err(|e| BackendError::Generate(format!("{e:?}")))?;
        drop(writer);
        Ok(out)
    }
}

impl BackendCompiler for NagaCompiler {
    fn set_version(&mut self, token: u32) {
        self.version = Some(token);
    }

    fn generate(&mut self) -> Result<String, BackendError> {
        match self.dialect {
            TargetDialect::Wgsl => naga::back::wgsl::write_string(
                &self.module,
                &self.info,
                naga::back::wgsl::WriterFlags::EXPLICIT_TYPES,
            )
            .map_err(|e| BackendError::Generate(format!("{e:?}"))),
            TargetDialect::Glsl => {
                self.write_glsl(naga::back::glsl::Version::Desktop(self.glsl_version_number()))
            }
            TargetDialect::Essl => self.write_glsl(naga::back::glsl::Version::Embedded {
                version: self.glsl_version_number(),
                is_webgl: false,
            }),
        }
    }

    fn enumerate_bindings(&self) -> Result<Vec<ReportedBinding>, BackendError> {
        let module = &self.module;
        let mut out = Vec::new();

        for (_, var) in module.global_variables.iter() {
            let name = var.name.clone().unwrap_or_default();
            let (group, slot) = var
                .binding
                .as_ref()
                .map_or((0, 0), |b| (b.group, b.binding));
            let inner = &module.types[var.ty].inner;

            match var.space {
                AddressSpace::Handle => match inner {
                    TypeInner::Image { .. } => {
                        out.push(ReportedBinding::new(name, BindingKind::Texture, slot));
                    }
                    TypeInner::Sampler { .. } => {
                        out.push(ReportedBinding::new(name, BindingKind::Sampler, slot));
                    }
                    _ => {}
                },
                AddressSpace::Uniform | AddressSpace::PushConstant => {
                    let TypeInner::Struct { members, span } = inner else {
                        continue;
                    };
                    let push = var.space == AddressSpace::PushConstant;
                    let (block_kind, block_slot) = if push {
                        (BindingKind::PushConstantBlock { size: *span }, 0)
                    } else {
                        (BindingKind::UniformBlock { size: *span }, slot)
                    };
                    out.push(ReportedBinding::new(name, block_kind, block_slot));

                    for (index, member) in members.iter().enumerate() {
                        let member_name = member
                            .name
                            .as_deref()
                            .or_else(|| self.names.member_name(push, group, slot, index));
                        let Some(member_name) = member_name else {
                            continue;
                        };
                        let offset = member.offset;
                        let size = module.types[member.ty].inner.size(module.to_ctx());
                        let kind = if push {
                            BindingKind::PushConstantMember { offset, size }
                        } else {
                            BindingKind::UniformMember { offset, size }
                        };
                        out.push(ReportedBinding::new(member_name, kind, block_slot));
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"#version 450
layout(set = 0, binding = 0, std140) uniform UBO {
    mat4 MVP;
    vec4 OutputSize;
} global;
layout(location = 0) in vec4 Position;
layout(location = 0) out vec4 vColor;
void main() {
    gl_Position = global.MVP * Position;
    vColor = global.OutputSize;
}
"#;

    #[test]
    fn glsl_compiles_to_spirv() {
        let bytes = NagaSourceCompiler
            .compile(VERTEX, ShaderStage::Vertex)
            .expect("compile");
        assert_eq!(&bytes[..4], &0x0723_0203u32.to_le_bytes());
        assert!(bytes.ends_with(NAME_TABLE_MAGIC));
    }

    #[test]
    fn name_table_survives_the_intermediate_form() {
        let bytes = NagaSourceCompiler
            .compile(VERTEX, ShaderStage::Vertex)
            .expect("compile");
        let (spirv, names) = split_name_table(&bytes).expect("split");
        assert_eq!(spirv.len() % 4, 0);
        assert_eq!(names.member_name(false, 0, 0, 0), Some("MVP"));
        assert_eq!(names.member_name(false, 0, 0, 1), Some("OutputSize"));
        assert_eq!(names.member_name(false, 0, 1, 0), None);
        assert_eq!(names.member_name(true, 0, 0, 0), None);
    }

    #[test]
    fn bare_spirv_has_an_empty_name_table() {
        let (spirv, names) = split_name_table(&[3, 2, 35, 7]).expect("split");
        assert_eq!(spirv, &[3, 2, 35, 7]);
        assert_eq!(names, NameTable::default());

        let truncated = [b'P', b'S', b'N', b'T'];
        assert!(matches!(
            split_name_table(&truncated),
            Err(BackendError::Parse(_))
        ));
    }

    #[test]
    fn broken_glsl_reports_diagnostics() {
        let err = NagaSourceCompiler
            .compile("#version 450\nvoid main() { nope }\n", ShaderStage::Fragment)
            .expect_err("broken source");
        assert!(!err.is_empty());
    }

    #[test]
    fn garbage_intermediate_is_a_parse_error() {
        let err = NagaBackend.parse(&[1, 2, 3, 4, 5, 6, 7, 8]).expect_err("garbage");
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[test]
    fn uniform_block_members_are_reported() {
        let bytes = NagaSourceCompiler
            .compile(VERTEX, ShaderStage::Vertex)
            .expect("compile");
        let parsed = NagaBackend.parse(&bytes).expect("parse");
        let compiler = NagaBackend
            .create_compiler(parsed, TargetDialect::Wgsl)
            .expect("create");
        let bindings = compiler.enumerate_bindings().expect("enumerate");

        let mvp = bindings.iter().find(|b| b.name == "MVP").expect("MVP reported");
        assert_eq!(mvp.kind, BindingKind::UniformMember { offset: 0, size: 64 });
        let output = bindings
            .iter()
            .find(|b| b.name == "OutputSize")
            .expect("OutputSize reported");
        assert_eq!(output.kind, BindingKind::UniformMember { offset: 64, size: 16 });
        assert!(
            bindings
                .iter()
                .any(|b| matches!(b.kind, BindingKind::UniformBlock { size: 80 }))
        );
    }

    #[test]
    fn glsl_version_follows_token() {
        let bytes = NagaSourceCompiler
            .compile(VERTEX, ShaderStage::Vertex)
            .expect("compile");
        let parsed = NagaBackend.parse(&bytes).expect("parse");
        let mut compiler = NagaBackend
            .create_compiler(parsed, TargetDialect::Glsl)
            .expect("create");
        compiler.set_version(crate::compiler::options::LanguageVersion::Glsl450.token());
        let text = compiler.generate().expect("generate");
        assert!(text.starts_with("#version 450"));
    }
}
