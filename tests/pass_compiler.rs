mod common;

use std::sync::Arc;

use common::{
    CountingCompiler, EMPTY_OUTPUT, FAIL_COMPILE, FAIL_PARSE, FAIL_REFLECT, ScriptedBackend, lookup,
    pass, preset,
};
use preset_shader_compiler::{
    BuildError, CompilerOptions, LanguageVersion, PassCompiler, SemanticSources, SemanticsRegistry,
    ShaderPreset,
    error::{BackendError, ReflectError, StageError},
    formats::PixelFormat,
    reflect::registry::{DataRef, TextureSource},
    semantics::{BufferSemantic, StageMask, TextureSemantic},
};

type Compiler = PassCompiler<CountingCompiler, ScriptedBackend>;

fn compiler(preset: Arc<ShaderPreset>) -> Compiler {
    PassCompiler::new(preset, CountingCompiler::default(), ScriptedBackend, "2.0.0")
}

fn sources() -> SemanticSources {
    SemanticSources::default()
        .with_texture(
            TextureSemantic::Source,
            TextureSource {
                image: DataRef(100),
                image_stride: 0,
                size: DataRef(200),
                size_stride: 0,
            },
        )
        .with_texture(
            TextureSemantic::PassOutput,
            TextureSource {
                image: DataRef(1000),
                image_stride: 8,
                size: DataRef(2000),
                size_stride: 16,
            },
        )
        .with_buffer(BufferSemantic::Mvp, DataRef(10))
        .with_buffer(BufferSemantic::Output, DataRef(20))
        .with_parameters(DataRef(5000), 4)
}

const VERTEX: &str = "\
// bind ubo 0 80
// bind member MVP 0 0 64
// bind member OutputSize 0 64 16
";

#[test]
fn sharpness_lands_at_its_preset_index() {
    let fragment = "\
// bind texture Source 1
// bind sampler Source 1
// bind push 32
// bind pushmember SourceSize 0 16
// bind pushmember sharpness 16 4
";
    let preset = preset(vec![pass(
        "frag_a.slang",
        VERTEX,
        fragment,
        &["a", "b", "c", "sharpness", "e"],
    )]);
    let mut compiler = compiler(preset);
    let mut registry = SemanticsRegistry::new(sources());

    compiler
        .build_pass(0, &CompilerOptions::default(), Some(&mut registry))
        .expect("build");

    assert_eq!(registry.parameter(3), Some(DataRef(5012)));
    assert_eq!(registry.parameter(4), None);
    assert_eq!(registry.buffer(BufferSemantic::Mvp), Some(DataRef(10)));
    assert_eq!(registry.buffer(BufferSemantic::FrameCount), None);
    assert!(registry.texture(TextureSemantic::Source).is_some());
    assert!(registry.texture(TextureSemantic::Original).is_none());

    let semantics = &compiler.pass_bindings(0).expect("pass 0").semantics;
    let sharpness = semantics.parameter(3).expect("sharpness");
    assert_eq!(sharpness.offset, 16);
    assert_eq!(sharpness.stage_mask, StageMask::FRAGMENT);
    assert_eq!(semantics.ubo.map(|b| b.size), Some(80));
    assert_eq!(semantics.push_constant.map(|b| b.size), Some(32));
    assert_eq!(
        semantics.texture_size(TextureSemantic::Source, 0).map(|b| b.data),
        Some(DataRef(200))
    );
}

#[test]
fn parameter_handles_near_the_top_of_the_range_wrap() {
    let fragment = "// bind push 8\n// bind pushmember b 4 4\n";
    let preset = preset(vec![pass("wrap.slang", VERTEX, fragment, &["a", "b"])]);
    let mut compiler = compiler(preset);
    let mut registry =
        SemanticsRegistry::new(SemanticSources::default().with_parameters(DataRef(u64::MAX - 2), 4));

    compiler
        .build_pass(0, &CompilerOptions::default(), Some(&mut registry))
        .expect("build");
    assert_eq!(registry.parameter(1), Some(DataRef(1)));
}

#[test]
fn uniforms_shared_by_both_stages_merge_masks() {
    let preset = preset(vec![pass("a.slang", VERTEX, VERTEX, &[])]);
    let mut compiler = compiler(preset);
    let mut registry = SemanticsRegistry::new(sources());
    compiler
        .build_pass(0, &CompilerOptions::default(), Some(&mut registry))
        .expect("build");

    let mvp = compiler.bindings()[0]
        .semantics
        .buffer(BufferSemantic::Mvp)
        .copied()
        .expect("mvp");
    assert_eq!(mvp.stage_mask, StageMask::VERTEX | StageMask::FRAGMENT);
}

#[test]
fn rebuilding_is_deterministic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = CompilerOptions::default().with_cache_directory(dir.path());
    let preset = preset(vec![pass(
        "a.slang",
        VERTEX,
        "// bind texture Source 0\n",
        &[],
    )]);
    let mut compiler = compiler(preset);

    let mut first_registry = SemanticsRegistry::new(sources());
    let first = compiler
        .build_pass(0, &options, Some(&mut first_registry))
        .expect("first");
    let first_bindings = compiler.bindings().to_vec();

    let mut second_registry = SemanticsRegistry::new(sources());
    let second = compiler
        .build_pass(0, &options, Some(&mut second_registry))
        .expect("second");

    assert_eq!(first, second);
    assert_eq!(first_registry, second_registry);
    assert_eq!(first_bindings, compiler.bindings());
    // Both stages came from the cache the second time.
    assert_eq!(compiler.transpile_cache().compiler().calls(), 2);
}

#[test]
fn reflection_does_not_depend_on_build_order() {
    let preset = preset(vec![
        pass("first.slang", VERTEX, "// bind texture Source 0\n", &[]),
        pass(
            "second.slang",
            VERTEX,
            "// bind texture Source 0\n// bind texture PassOutput0 1\n",
            &[],
        ),
    ]);
    let mut compiler = compiler(preset);
    let options = CompilerOptions::default();
    let mut registry = SemanticsRegistry::new(sources());

    compiler
        .build_pass(1, &options, Some(&mut registry))
        .expect("pass 1");
    let before = compiler.bindings()[1].clone();
    compiler
        .build_pass(0, &options, Some(&mut registry))
        .expect("pass 0");
    compiler
        .build_pass(1, &options, Some(&mut registry))
        .expect("pass 1 again");

    assert_eq!(before, compiler.bindings()[1]);
    assert_eq!(
        compiler.bindings()[1].texture_at_slot(0),
        Some((TextureSemantic::Source, 0))
    );
    assert_eq!(
        compiler.bindings()[1].texture_at_slot(1),
        Some((TextureSemantic::PassOutput, 0))
    );
    assert_eq!(
        compiler.bindings()[1]
            .semantics
            .texture(TextureSemantic::PassOutput, 0)
            .map(|t| t.image),
        Some(DataRef(1000))
    );
}

#[test]
fn aliases_and_lookup_textures_classify() {
    let mut first = pass("first.slang", VERTEX, "// bind texture Source 0\n", &[]);
    first.config.alias = Some("Blurred".to_string());
    let second = pass(
        "second.slang",
        VERTEX,
        "\
// bind texture Blurred 1
// bind texture Mask 2
// bind member BlurredSize 0 80 16
// bind member MaskSize 0 96 16
",
        &[],
    );
    let preset = Arc::new(ShaderPreset::new(vec![first, second], vec![lookup("Mask")]));
    let mut compiler = compiler(preset);
    let mut registry = SemanticsRegistry::new(sources());
    compiler
        .build_pass(1, &CompilerOptions::default(), Some(&mut registry))
        .expect("build");

    let bindings = &compiler.bindings()[1];
    assert_eq!(bindings.texture_at_slot(1), Some((TextureSemantic::PassOutput, 0)));
    assert_eq!(bindings.texture_at_slot(2), Some((TextureSemantic::User, 0)));
    assert!(bindings.semantics.texture_size(TextureSemantic::PassOutput, 0).is_some());
    assert!(bindings.semantics.texture_size(TextureSemantic::User, 0).is_some());
    assert!(registry.texture(TextureSemantic::User).is_some());
}

#[test]
fn compile_failure_only_updates_the_format() {
    let source = format!("// {FAIL_COMPILE}\n");
    let mut broken = pass("broken.slang", VERTEX, &source, &["sharpness"]);
    broken.config.format = Some(PixelFormat::R16G16B16A16Sfloat);
    let mut compiler = compiler(preset(vec![broken]));
    let mut registry = SemanticsRegistry::new(sources());

    let err = compiler
        .build_pass(0, &CompilerOptions::default(), Some(&mut registry))
        .expect_err("fragment fails");
    assert!(err.is_build_failed());
    assert!(matches!(
        err,
        BuildError::BuildFailed {
            pass: 0,
            source: StageError::Compile(_),
            ..
        }
    ));

    let bindings = &compiler.bindings()[0];
    assert_eq!(bindings.format, PixelFormat::R16G16B16A16Sfloat);
    assert_eq!(bindings.native_format(), Some(wgpu::TextureFormat::Rgba16Float));
    assert!(bindings.semantics.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn parse_failure_is_a_build_failure() {
    let source = format!("// {FAIL_PARSE}\n");
    let mut compiler = compiler(preset(vec![pass("a.slang", &source, "", &[])]));
    let err = compiler
        .build_pass(0, &CompilerOptions::default(), None)
        .expect_err("parse fails");
    assert!(matches!(
        err,
        BuildError::BuildFailed {
            source: StageError::Backend(BackendError::Parse(_)),
            ..
        }
    ));
}

#[test]
fn empty_output_is_a_build_failure() {
    let source = format!("// {EMPTY_OUTPUT}\n");
    let mut compiler = compiler(preset(vec![pass("a.slang", VERTEX, &source, &[])]));
    let err = compiler
        .build_pass(0, &CompilerOptions::default(), None)
        .expect_err("empty output");
    assert!(matches!(
        err,
        BuildError::BuildFailed {
            source: StageError::Backend(BackendError::EmptyOutput),
            ..
        }
    ));
}

#[test]
fn enumeration_failure_is_a_process_failure() {
    let source = format!("// bind texture Source 0\n// {FAIL_REFLECT}\n");
    let mut compiler = compiler(preset(vec![pass("a.slang", VERTEX, &source, &[])]));
    let mut registry = SemanticsRegistry::new(sources());
    let options = CompilerOptions::default();

    // Code generation alone still works.
    compiler.build_pass(0, &options, None).expect("codegen only");

    let err = compiler
        .build_pass(0, &options, Some(&mut registry))
        .expect_err("reflection fails");
    assert!(err.is_process_failed());
    assert!(registry.is_empty());
    assert!(compiler.bindings()[0].semantics.is_empty());
}

#[test]
fn out_of_range_texture_slot_is_a_process_failure() {
    let mut compiler = compiler(preset(vec![pass(
        "a.slang",
        VERTEX,
        "// bind member MVP 0 0 64\n// bind texture Source 64\n",
        &[],
    )]));
    let mut registry = SemanticsRegistry::new(sources());
    let err = compiler
        .build_pass(0, &CompilerOptions::default(), Some(&mut registry))
        .expect_err("slot too high");
    assert!(matches!(
        err,
        BuildError::ProcessFailed {
            source: ReflectError::TextureSlotOutOfRange { slot: 64, .. },
            ..
        }
    ));
    // Vertex-stage matches from the same call were not committed either.
    assert!(registry.is_empty());
}

#[test]
fn codegen_only_skips_reflection() {
    let mut compiler = compiler(preset(vec![pass(
        "a.slang",
        VERTEX,
        "// bind texture Source 0\n",
        &[],
    )]));
    let generated = compiler
        .build_pass(0, &CompilerOptions::default(), None)
        .expect("build");
    assert!(generated.vertex.contains("bind member MVP"));
    assert_eq!(compiler.bindings()[0].format, PixelFormat::R8G8B8A8Unorm);
    assert!(compiler.bindings()[0].semantics.is_empty());
}

#[test]
fn language_version_reaches_the_backend() {
    let mut compiler = compiler(preset(vec![pass("a.slang", VERTEX, "// frag\n", &[])]));
    let options = CompilerOptions::default().with_language_version(LanguageVersion::Glsl450);
    let generated = compiler.build_pass(0, &options, None).expect("build");
    assert!(generated.vertex.starts_with("// Glsl 40500\n"));
    assert!(generated.fragment.starts_with("// Glsl 40500\n"));
}

#[test]
fn pass_index_out_of_range() {
    let mut compiler = compiler(preset(vec![pass("a.slang", VERTEX, "// frag\n", &[])]));
    let err = compiler
        .build_pass(3, &CompilerOptions::default(), None)
        .expect_err("no such pass");
    assert!(matches!(err, BuildError::PassOutOfRange { index: 3, count: 1 }));
}

#[test]
fn build_all_compiles_every_pass() {
    let mut compiler = compiler(preset(vec![
        pass("a.slang", VERTEX, "// bind texture Source 0\n", &[]),
        pass("b.slang", VERTEX, "// bind texture PassOutput0 0\n", &[]),
    ]));
    let mut registry = SemanticsRegistry::new(sources());
    let generated = compiler
        .build_all(&CompilerOptions::default(), Some(&mut registry))
        .expect("build all");
    assert_eq!(generated.len(), 2);
    assert!(registry.texture(TextureSemantic::PassOutput).is_some());
    assert_eq!(compiler.transpile_cache().compiler().calls(), 4);
}
