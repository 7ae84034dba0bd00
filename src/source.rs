//! Combined shader sources.
//!
//! A pass's shader lives in one file holding both stages:
//!
//! ```text
//! #version 450
//! #pragma name Blur
//! #pragma parameter sharpness "Sharpness" 1.0 0.0 5.0 0.1
//! layout(set = 0, binding = 0, std140) uniform UBO { mat4 MVP; } global;
//! #pragma stage vertex
//! ...
//! #pragma stage fragment
//! ...
//! ```
//!
//! Lines before the first `#pragma stage` are shared by both stages. Metadata
//! pragmas are extracted and stripped so the stage text is plain GLSL.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{error::SourceError, formats::PixelFormat, preset::ShaderParameter, semantics::ShaderStage};

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub path: PathBuf,
    pub vertex: String,
    pub fragment: String,
    /// `#pragma name`: alias other passes may use to sample this pass.
    pub name: Option<String>,
    /// `#pragma format`: requested output format.
    pub format: Option<PixelFormat>,
    pub parameters: Vec<ShaderParameter>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Shared,
    Stage(ShaderStage),
}

impl ShaderSource {
    /// Read and split a combined source file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shader source {}", path.display()))?;
        Ok(Self::parse(path, &text)?)
    }

    /// Source built from already-separated stage texts.
    pub fn from_stages(
        path: impl Into<PathBuf>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            name: None,
            format: None,
            parameters: Vec::new(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, SourceError> {
        let path = path.into();
        let display = path.display().to_string();

        let mut shared = String::new();
        let mut vertex = String::new();
        let mut fragment = String::new();
        let mut seen_vertex = false;
        let mut seen_fragment = false;
        let mut section = Section::Shared;
        let mut name = None;
        let mut format = None;
        let mut parameters: Vec<ShaderParameter> = Vec::new();

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let trimmed = line.trim_start();

            if let Some(rest) = pragma_arg(trimmed, "stage") {
                section = match rest {
                    "vertex" => {
                        seen_vertex = true;
                        Section::Stage(ShaderStage::Vertex)
                    }
                    "fragment" => {
                        seen_fragment = true;
                        Section::Stage(ShaderStage::Fragment)
                    }
                    other => {
                        return Err(SourceError::UnknownStage {
                            path: display,
                            line: line_no,
                            name: other.to_string(),
                        });
                    }
                };
                continue;
            }
            if let Some(rest) = pragma_arg(trimmed, "name") {
                if !rest.is_empty() {
                    name = Some(rest.to_string());
                }
                continue;
            }
            if let Some(rest) = pragma_arg(trimmed, "format") {
                let parsed = rest.parse::<PixelFormat>().map_err(|_| SourceError::BadFormat {
                    path: display.clone(),
                    line: line_no,
                    name: rest.to_string(),
                })?;
                format = Some(parsed);
                continue;
            }
            if let Some(rest) = pragma_arg(trimmed, "parameter") {
                let param = parse_parameter(rest).ok_or_else(|| SourceError::BadParameter {
                    path: display.clone(),
                    line: line_no,
                    text: line.trim().to_string(),
                })?;
                // Both stages usually repeat the same declaration.
                if !parameters.iter().any(|p| p.name == param.name) {
                    parameters.push(param);
                }
                continue;
            }

            let target = match section {
                Section::Shared => &mut shared,
                Section::Stage(ShaderStage::Vertex) => &mut vertex,
                Section::Stage(ShaderStage::Fragment) => &mut fragment,
            };
            target.push_str(line);
            target.push('\n');
        }

        if !seen_vertex {
            return Err(SourceError::MissingStage {
                path: display,
                stage: ShaderStage::Vertex,
            });
        }
        if !seen_fragment {
            return Err(SourceError::MissingStage {
                path: display,
                stage: ShaderStage::Fragment,
            });
        }

        Ok(Self {
            path,
            vertex: format!("{shared}{vertex}"),
            fragment: format!("{shared}{fragment}"),
            name,
            format,
            parameters,
        })
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    /// Final path component, used to make cache file names readable.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "shader".to_string())
    }
}

fn pragma_arg<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("pragma")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix(key)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

// NAME "Description" initial minimum maximum [step]
fn parse_parameter(rest: &str) -> Option<ShaderParameter> {
    let (name, rest) = rest.split_once(char::is_whitespace)?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let (description, rest) = rest.split_once('"')?;
    let numbers: Vec<f32> = rest
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<_, _>>()
        .ok()?;
    let (initial, minimum, maximum, step) = match numbers.as_slice() {
        [initial, minimum, maximum] => (*initial, *minimum, *maximum, 0.0),
        [initial, minimum, maximum, step] => (*initial, *minimum, *maximum, *step),
        _ => return None,
    };
    Some(ShaderParameter {
        name: name.to_string(),
        description: description.to_string(),
        initial,
        minimum,
        maximum,
        step,
    })
}
