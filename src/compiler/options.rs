//! Compiler configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Target shading language family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetDialect {
    Wgsl,
    /// Desktop GLSL.
    Glsl,
    /// GLSL ES.
    Essl,
}

/// Target dialect and version selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageVersion {
    #[default]
    Wgsl,
    Glsl330,
    Glsl450,
    Glsl460,
    Essl300,
    Essl310,
}

impl LanguageVersion {
    pub const ALL: [LanguageVersion; 6] = [
        LanguageVersion::Wgsl,
        LanguageVersion::Glsl330,
        LanguageVersion::Glsl450,
        LanguageVersion::Glsl460,
        LanguageVersion::Essl300,
        LanguageVersion::Essl310,
    ];

    /// `(major, minor, patch)`.
    pub fn triple(self) -> (u32, u32, u32) {
        match self {
            LanguageVersion::Wgsl => (1, 0, 0),
            LanguageVersion::Glsl330 => (3, 3, 0),
            LanguageVersion::Glsl450 => (4, 5, 0),
            LanguageVersion::Glsl460 => (4, 6, 0),
            LanguageVersion::Essl300 => (3, 0, 0),
            LanguageVersion::Essl310 => (3, 1, 0),
        }
    }

    /// `major * 10000 + minor * 100 + patch`.
    pub fn token(self) -> u32 {
        let (major, minor, patch) = self.triple();
        major * 10000 + minor * 100 + patch
    }

    pub fn dialect(self) -> TargetDialect {
        match self {
            LanguageVersion::Wgsl => TargetDialect::Wgsl,
            LanguageVersion::Glsl330 | LanguageVersion::Glsl450 | LanguageVersion::Glsl460 => {
                TargetDialect::Glsl
            }
            LanguageVersion::Essl300 | LanguageVersion::Essl310 => TargetDialect::Essl,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| format!("{v:?}").to_ascii_lowercase() == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    /// Where intermediate bytes are cached; `None` disables caching.
    pub cache_directory: Option<PathBuf>,
    /// Bypass the cache even when a directory is configured.
    pub cache_disabled: bool,
    pub language_version: LanguageVersion,
}

impl CompilerOptions {
    pub fn with_cache_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(dir.into());
        self
    }

    pub fn with_language_version(mut self, version: LanguageVersion) -> Self {
        self.language_version = version;
        self
    }

    pub fn with_cache_disabled(mut self, disabled: bool) -> Self {
        self.cache_disabled = disabled;
        self
    }

    /// Cache directory to use, if caching is in effect.
    pub fn active_cache_directory(&self) -> Option<&PathBuf> {
        if self.cache_disabled {
            return None;
        }
        self.cache_directory.as_ref()
    }
}
