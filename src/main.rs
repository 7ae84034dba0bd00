use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use log::info;
use preset_shader_compiler::{
    CompilerOptions, LanguageVersion, NagaBackend, NagaSourceCompiler, PassCompiler,
    SemanticSources, SemanticsRegistry, ShaderPreset, compiler::options::TargetDialect,
    semantics::ShaderStage,
};

#[derive(Debug, Clone)]
struct Cli {
    preset: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    no_cache: bool,
    language: LanguageVersion,
    output_dir: Option<PathBuf>,
    reflect: bool,
    compiler_version: String,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            preset: None,
            cache_dir: None,
            no_cache: false,
            language: LanguageVersion::default(),
            output_dir: None,
            reflect: false,
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

const USAGE: &str = "supported: --preset <preset.json>, --cache-dir <dir>, --no-cache, \
--language <wgsl|glsl330|glsl450|glsl460|essl300|essl310>, --output-dir <dir>, --reflect, \
--compiler-version <v>";

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing value for {flag}"))
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--preset" => {
                cli.preset = Some(PathBuf::from(value(args, i, "--preset")?));
                i += 2;
            }
            "--cache-dir" => {
                cli.cache_dir = Some(PathBuf::from(value(args, i, "--cache-dir")?));
                i += 2;
            }
            "--no-cache" => {
                cli.no_cache = true;
                i += 1;
            }
            "--language" => {
                let v = value(args, i, "--language")?;
                cli.language = LanguageVersion::from_name(v)
                    .ok_or_else(|| anyhow!("unknown language '{v}' ({USAGE})"))?;
                i += 2;
            }
            "--output-dir" | "--outputdir" => {
                cli.output_dir = Some(PathBuf::from(value(args, i, "--output-dir")?));
                i += 2;
            }
            "--reflect" => {
                cli.reflect = true;
                i += 1;
            }
            "--compiler-version" => {
                cli.compiler_version = value(args, i, "--compiler-version")?.to_string();
                i += 2;
            }
            other => {
                return Err(anyhow!("unknown argument: {other} ({USAGE})"));
            }
        }
    }
    Ok(cli)
}

fn output_extension(language: LanguageVersion) -> &'static str {
    match language.dialect() {
        TargetDialect::Wgsl => "wgsl",
        TargetDialect::Glsl | TargetDialect::Essl => "glsl",
    }
}

fn write_output(dir: &Path, file_name: &str, text: &str) -> Result<()> {
    let path = dir.join(file_name);
    std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;
    let preset_path = cli
        .preset
        .clone()
        .ok_or_else(|| anyhow!("--preset is required ({USAGE})"))?;

    let preset = Arc::new(ShaderPreset::load(&preset_path)?);
    info!(
        "loaded {} ({} passes, {} parameters, {} lookup textures)",
        preset_path.display(),
        preset.passes.len(),
        preset.parameters.len(),
        preset.textures.len()
    );

    let mut options = CompilerOptions::default()
        .with_language_version(cli.language)
        .with_cache_disabled(cli.no_cache);
    if let Some(dir) = &cli.cache_dir {
        options = options.with_cache_directory(dir);
    }

    let mut compiler = PassCompiler::new(
        Arc::clone(&preset),
        NagaSourceCompiler,
        NagaBackend,
        cli.compiler_version.clone(),
    );
    let mut registry = SemanticsRegistry::new(SemanticSources::default());
    let generated = compiler
        .build_all(&options, cli.reflect.then_some(&mut registry))
        .context("preset compilation failed")?;

    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output dir {}", dir.display()))?;
        let ext = output_extension(cli.language);
        for (index, (pass, code)) in preset.passes.iter().zip(&generated).enumerate() {
            let basename = pass.source.basename();
            for stage in ShaderStage::ALL {
                let file_name = format!("{index}.{basename}.{}.{ext}", stage.token());
                write_output(dir, &file_name, code.stage(stage))?;
            }
        }
    }

    if cli.reflect {
        for (index, bindings) in compiler.bindings().iter().enumerate() {
            info!("pass {index}: format {}", bindings.format);
            for (semantic, n, binding) in bindings.semantics.textures() {
                info!("  texture {semantic:?}[{n}] -> slot {}", binding.binding);
            }
            for (semantic, n, binding) in bindings.semantics.texture_sizes() {
                info!("  size {semantic:?}[{n}] -> offset {}", binding.offset);
            }
            for (semantic, binding) in bindings.semantics.buffers() {
                info!("  buffer {semantic:?} -> offset {}", binding.offset);
            }
            for (index, binding) in bindings.semantics.parameters() {
                let name = preset
                    .parameters
                    .get(index as usize)
                    .map(|p| p.name.as_str())
                    .unwrap_or("?");
                info!("  parameter {index} ({name}) -> offset {}", binding.offset);
            }
        }
    } else {
        info!("compiled {} passes", generated.len());
    }

    Ok(())
}
