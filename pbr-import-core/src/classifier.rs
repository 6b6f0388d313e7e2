//! Texture role classification by file name.

use crate::image_loading::TextureRole;
use crate::settings::KeywordTable;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A scanned image file and the role its name maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureHandle {
    pub path: PathBuf,
    /// File name used for matching and display
    pub name: String,
    pub role: TextureRole,
    /// Whether raw pixels can currently be read
    pub readable: bool,
}

/// Input entry for [`classify`]
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub readable: bool,
}

impl ImageEntry {
    pub fn new(path: impl Into<PathBuf>, readable: bool) -> Self {
        Self {
            path: path.into(),
            readable,
        }
    }
}

impl From<PathBuf> for ImageEntry {
    fn from(path: PathBuf) -> Self {
        Self::new(path, false)
    }
}

impl From<&Path> for ImageEntry {
    fn from(path: &Path) -> Self {
        Self::new(path, false)
    }
}

impl From<&str> for ImageEntry {
    fn from(path: &str) -> Self {
        Self::new(path, false)
    }
}

/// Candidates per role, each list in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextureSearchResult {
    pub albedo: Vec<TextureHandle>,
    pub normal: Vec<TextureHandle>,
    pub metallic: Vec<TextureHandle>,
    pub roughness: Vec<TextureHandle>,
    pub smoothness: Vec<TextureHandle>,
    pub unknown: Vec<TextureHandle>,
}

impl TextureSearchResult {
    pub fn candidates(&self, role: TextureRole) -> &[TextureHandle] {
        match role {
            TextureRole::Albedo => &self.albedo,
            TextureRole::Normal => &self.normal,
            TextureRole::Metallic => &self.metallic,
            TextureRole::Roughness => &self.roughness,
            TextureRole::Smoothness => &self.smoothness,
            TextureRole::Unknown => &self.unknown,
        }
    }

    fn candidates_mut(&mut self, role: TextureRole) -> &mut Vec<TextureHandle> {
        match role {
            TextureRole::Albedo => &mut self.albedo,
            TextureRole::Normal => &mut self.normal,
            TextureRole::Metallic => &mut self.metallic,
            TextureRole::Roughness => &mut self.roughness,
            TextureRole::Smoothness => &mut self.smoothness,
            TextureRole::Unknown => &mut self.unknown,
        }
    }

    /// Every scanned texture: assignable roles in classification order, then unknown.
    pub fn all(&self) -> Vec<TextureHandle> {
        TextureRole::ASSIGNABLE
            .iter()
            .chain(std::iter::once(&TextureRole::Unknown))
            .flat_map(|r| self.candidates(*r).iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.albedo.len()
            + self.normal.len()
            + self.metallic.len()
            + self.roughness.len()
            + self.smoothness.len()
            + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Albedo={}, Normal={}, Metallic={}, Roughness={}, Smoothness={}, Unknown={}",
            self.albedo.len(),
            self.normal.len(),
            self.metallic.len(),
            self.roughness.len(),
            self.smoothness.len(),
            self.unknown.len()
        )
    }
}

/// Role of a single file name under `table`. First matching role wins.
pub fn classify_name(file_name: &str, table: &KeywordTable) -> TextureRole {
    let name = file_name.to_lowercase();
    TextureRole::ASSIGNABLE
        .into_iter()
        .find(|role| {
            table
                .keywords(*role)
                .iter()
                .filter(|k| !k.is_empty())
                .any(|k| name.contains(&k.to_lowercase()))
        })
        .unwrap_or(TextureRole::Unknown)
}

/// Partitions `files` into per-role candidate lists, preserving input order within each role.
pub fn classify<I, E>(files: I, table: &KeywordTable) -> TextureSearchResult
where
    I: IntoIterator<Item = E>,
    E: Into<ImageEntry>,
{
    let mut result = TextureSearchResult::default();
    for entry in files {
        let entry = entry.into();
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let role = classify_name(&name, table);
        result.candidates_mut(role).push(TextureHandle {
            path: entry.path,
            name,
            role,
            readable: entry.readable,
        });
    }
    result
}
