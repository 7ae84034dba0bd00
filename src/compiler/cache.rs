//! Persistent cache of intermediate shader bytes.
//!
//! Entries are addressed by a content-derived [`CacheKey`]; a file that exists
//! under the key is trusted as-is. Writes are best effort and go through a
//! temporary file plus rename so readers never observe a partial entry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::{
    compiler::{backend::SourceCompiler, options::CompilerOptions},
    error::CompileError,
    preset::ShaderPass,
    semantics::ShaderStage,
};

/// File extension of cached intermediate (SPIR-V) blobs.
pub const INTERMEDIATE_EXTENSION: &str = "spv";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hex SHA-256 of a stage's source text.
pub fn content_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

fn sanitize_token(value: &str) -> String {
    let out: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() { "_".to_string() } else { out }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub basename: String,
    pub content_hash: String,
    pub version: String,
    pub stage: ShaderStage,
}

impl CacheKey {
    pub fn new(basename: &str, source: &str, version: &str, stage: ShaderStage) -> Self {
        Self {
            basename: sanitize_token(basename),
            content_hash: content_hash(source),
            version: sanitize_token(version),
            stage,
        }
    }

    /// `{basename}.{contentHash}.{version}.{stage}.spv`
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.{}.{INTERMEDIATE_EXTENSION}",
            self.basename,
            self.content_hash,
            self.version,
            self.stage.token()
        )
    }
}

/// Source compiler fronted by the on-disk cache.
pub struct TranspileCache<C> {
    compiler: C,
    compiler_version: String,
}

impl<C: SourceCompiler> TranspileCache<C> {
    pub fn new(compiler: C, compiler_version: impl Into<String>) -> Self {
        Self {
            compiler,
            compiler_version: compiler_version.into(),
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn compiler_version(&self) -> &str {
        &self.compiler_version
    }

    /// Version token embedded in cache keys: compiler version plus target language token.
    pub fn version_token(&self, options: &CompilerOptions) -> String {
        format!(
            "{}-{}",
            self.compiler_version,
            options.language_version.token()
        )
    }

    pub fn key(&self, pass: &ShaderPass, stage: ShaderStage, options: &CompilerOptions) -> CacheKey {
        CacheKey::new(
            &pass.source.basename(),
            pass.source.stage(stage),
            &self.version_token(options),
            stage,
        )
    }

    /// Intermediate bytes for one stage of pass `pass_index`, from the cache when possible.
    pub fn obtain_intermediate(
        &self,
        pass_index: usize,
        pass: &ShaderPass,
        stage: ShaderStage,
        options: &CompilerOptions,
    ) -> Result<Vec<u8>, CompileError> {
        let Some(dir) = options.active_cache_directory() else {
            return self.compile(pass_index, pass, stage);
        };

        fs::create_dir_all(dir).map_err(|source| CompileError::CacheDirectory {
            path: dir.clone(),
            source,
        })?;

        let key = self.key(pass, stage, options);
        let path = dir.join(key.file_name());
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("shader cache hit: {}", path.display());
                return Ok(bytes);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("shader cache miss: {}", path.display());
            }
            Err(err) => {
                warn!("shader cache entry {} unreadable, recompiling: {err}", path.display());
            }
        }

        let bytes = self.compile(pass_index, pass, stage)?;
        if let Err(err) = write_atomic(&path, &bytes) {
            warn!("failed to write shader cache entry {}: {err}", path.display());
        }
        Ok(bytes)
    }

    fn compile(
        &self,
        pass_index: usize,
        pass: &ShaderPass,
        stage: ShaderStage,
    ) -> Result<Vec<u8>, CompileError> {
        self.compiler
            .compile(pass.source.stage(stage), stage)
            .map_err(|diagnostics| CompileError::Source {
                pass: pass_index,
                stage,
                path: pass.source.path.clone(),
                diagnostics,
            })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp: PathBuf = path.with_extension(format!(
        "{INTERMEDIATE_EXTENSION}.{}.{seq}.tmp",
        std::process::id()
    ));
    fs::write(&tmp, bytes)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}
