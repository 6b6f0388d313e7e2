//! Import settings: naming rules, selection policy and output layout.
//!
//! Settings are read from TOML or JSON (chosen by file extension). Every field has a default so a
//! partial file only overrides what it names.

use crate::image_loading::TextureRole;
use crate::material::ShaderPipeline;
use crate::resolver::{RolePriorities, SelectionPolicy};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ordered keyword lists per role. Matching is a case-insensitive substring test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    pub albedo: Vec<String>,
    pub normal: Vec<String>,
    pub metallic: Vec<String>,
    pub roughness: Vec<String>,
    pub smoothness: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            albedo: words(&["albedo", "basecolor", "diff", "color"]),
            normal: words(&["normal", "nrm", "_nor"]),
            metallic: words(&["metal", "metallic"]),
            roughness: words(&["rough", "roughness", "_rgh"]),
            smoothness: words(&["smooth", "gloss"]),
        }
    }
}

impl KeywordTable {
    pub fn keywords(&self, role: TextureRole) -> &[String] {
        match role {
            TextureRole::Albedo => &self.albedo,
            TextureRole::Normal => &self.normal,
            TextureRole::Metallic => &self.metallic,
            TextureRole::Roughness => &self.roughness,
            TextureRole::Smoothness => &self.smoothness,
            TextureRole::Unknown => &[],
        }
    }
}

/// How candidates are picked during automatic processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Only a single candidate is picked automatically
    #[default]
    AutoSingle,
    /// Pick by configured per-role index
    Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub auto_import_enabled: bool,
    pub shader_pipeline: ShaderPipeline,
    pub generate_metallic_smoothness: bool,
    pub selection: SelectionMode,
    pub keywords: KeywordTable,
    pub priorities: RolePriorities,
    /// Suffix appended to the model stem to find its texture folder
    pub texture_folder_suffix: String,
    /// Folder (next to the model) that receives generated materials
    pub material_folder: String,
    /// Model file extensions that trigger processing
    pub model_extensions: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            auto_import_enabled: true,
            shader_pipeline: ShaderPipeline::Standard,
            generate_metallic_smoothness: true,
            selection: SelectionMode::AutoSingle,
            keywords: KeywordTable::default(),
            priorities: RolePriorities::default(),
            texture_folder_suffix: ".fbm".to_string(),
            material_folder: "Materials".to_string(),
            model_extensions: vec!["fbx".to_string()],
        }
    }
}

impl ImportSettings {
    /// Load settings from a `.toml` or `.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let settings = match ext.as_deref() {
            Some("json") => serde_json::from_str(&s)?,
            Some("toml") => toml::from_str(&s)?,
            _ => {
                return Err(crate::Error::Config(format!(
                    "Unsupported settings file: {}. Use .toml or .json.",
                    path.display()
                )))
            }
        };
        tracing::debug!(path = %path.display(), "loaded import settings");
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Policy used by automatic (import-triggered) processing.
    pub fn selection_policy(&self) -> SelectionPolicy {
        match self.selection {
            SelectionMode::AutoSingle => SelectionPolicy::AutoSingle,
            SelectionMode::Priority => SelectionPolicy::PriorityIndex(self.priorities.clone()),
        }
    }

    pub fn is_model_path(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.model_extensions
            .iter()
            .any(|m| m.eq_ignore_ascii_case(ext))
    }

    /// `<dir>/<stem><suffix>` texture folder of a model.
    pub fn texture_folder(&self, model: &Path) -> PathBuf {
        let stem = model_stem(model);
        model_dir(model).join(format!("{}{}", stem, self.texture_folder_suffix))
    }

    /// `<dir>/<material_folder>` next to a model.
    pub fn material_folder(&self, model: &Path) -> PathBuf {
        model_dir(model).join(&self.material_folder)
    }
}

pub(crate) fn model_stem(model: &Path) -> String {
    model
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn model_dir(model: &Path) -> PathBuf {
    model.parent().map(Path::to_path_buf).unwrap_or_default()
}
