//! Contracts consumed from the host asset database and model importer.
//!
//! The pipeline only reaches the outside world through these traits. [`crate::fs_host::FsHost`]
//! implements them over a plain directory tree.

use crate::material::{MaterialDescription, TextureMap};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How the host treats a texture's pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    #[default]
    Default,
    NormalMap,
}

/// Per-texture import metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureImportSettings {
    /// Raw pixels can be read back
    pub readable: bool,
    pub kind: TextureKind,
    /// Sampled as sRGB (false = linear)
    pub srgb: bool,
}

impl Default for TextureImportSettings {
    fn default() -> Self {
        Self {
            readable: false,
            kind: TextureKind::Default,
            srgb: true,
        }
    }
}

/// How import-record changes are flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
    /// Save and re-import the model; re-enters import callbacks
    Full,
    /// Mark dirty and save; no re-import
    Light,
}

/// Host busy state consulted before deferred work runs.
pub trait HostStatus {
    /// True while the host compiles or mutates its asset index.
    fn is_busy(&self) -> bool;
}

/// Folder, texture and material storage.
pub trait AssetStore {
    fn asset_exists(&self, path: &Path) -> bool;

    fn folder_exists(&self, path: &Path) -> bool;

    fn ensure_folder(&mut self, path: &Path) -> Result<()>;

    /// Image files directly inside `folder`, in a stable discovery order.
    fn list_images(&self, folder: &Path) -> Result<Vec<PathBuf>>;

    fn texture_settings(&self, path: &Path) -> Result<TextureImportSettings>;

    /// Updates import metadata. May re-import the texture before the change is visible.
    fn set_texture_settings(&mut self, path: &Path, settings: &TextureImportSettings) -> Result<()>;

    /// Reads pixels. Fails with [`crate::Error::NotReadable`] unless the texture is readable.
    fn load_texture(&self, path: &Path) -> Result<TextureMap>;

    /// Writes a new image asset and returns the reloaded, persisted copy.
    fn write_texture(&mut self, path: &Path, texture: &TextureMap) -> Result<TextureMap>;

    fn load_material(&self, path: &Path) -> Result<Option<MaterialDescription>>;

    fn write_material(&mut self, path: &Path, material: &MaterialDescription) -> Result<()>;

    fn shader_available(&self, shader: &str) -> bool;
}

/// Per-model import record access.
pub trait ModelImporter {
    /// Names of the materials embedded in the model
    fn internal_material_names(&self, model: &Path) -> Result<Vec<String>>;

    fn user_tag(&self, model: &Path) -> Result<Option<String>>;

    fn set_user_tag(&mut self, model: &Path, tag: &str) -> Result<()>;

    fn remap_table(&self, model: &Path) -> Result<BTreeMap<String, PathBuf>>;

    fn set_remap(&mut self, model: &Path, internal_name: &str, material: &Path) -> Result<()>;

    fn commit(&mut self, model: &Path, kind: CommitKind) -> Result<()>;
}

/// Everything the pipeline needs from its host.
pub trait Host: HostStatus + AssetStore + ModelImporter {}

impl<T: HostStatus + AssetStore + ModelImporter> Host for T {}
