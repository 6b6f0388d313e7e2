//! Filesystem-backed host.
//!
//! Layout next to the files it manages:
//!
//! - `<image>.meta.json` - texture import settings
//! - `<model>.import.json` - processing tag, remap table and embedded material names
//! - `Materials/<name>.mat` - material descriptions (JSON)
//!
//! Record changes are staged in memory and only written by [`ModelImporter::commit`]. A `Full`
//! commit queues a synthetic import event, the same way a host re-import calls back into the
//! import hook; drivers feed [`FsHost::take_import_events`] back into the pipeline.

use crate::host::{
    AssetStore, CommitKind, HostStatus, ModelImporter, TextureImportSettings, TextureKind,
};
use crate::image_loading::ImageLoader;
use crate::material::{MaterialBuilder, MaterialDescription, ShaderPipeline, TextureMap};
use crate::packing::save_texture;
use crate::settings::model_stem;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

const META_SUFFIX: &str = ".meta.json";
const RECORD_SUFFIX: &str = ".import.json";

/// Persisted per-model import record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRecordFile {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub remap: BTreeMap<String, PathBuf>,
    /// Materials embedded in the model; the model stem is used when empty
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One flushed record write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub model: PathBuf,
    pub kind: CommitKind,
}

pub struct FsHost {
    busy: bool,
    reject_remaps: bool,
    shaders: Vec<String>,
    staged: HashMap<PathBuf, ModelRecordFile>,
    import_events: VecDeque<PathBuf>,
    commits: Vec<CommitEntry>,
}

impl Default for FsHost {
    fn default() -> Self {
        Self::new()
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

impl FsHost {
    /// Host that offers every built-in shader family.
    pub fn new() -> Self {
        let shaders = [ShaderPipeline::Standard, ShaderPipeline::Urp, ShaderPipeline::Hdrp]
            .iter()
            .map(|p| p.builder().shader_identifier().to_string())
            .collect();
        Self {
            busy: false,
            reject_remaps: false,
            shaders,
            staged: HashMap::new(),
            import_events: VecDeque::new(),
            commits: Vec::new(),
        }
    }

    pub fn with_shaders<I, S>(mut self, shaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shaders = shaders.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Makes every remap write fail, as a host that refuses binding changes would.
    pub fn set_reject_remaps(&mut self, reject: bool) {
        self.reject_remaps = reject;
    }

    /// Records which materials a model embeds.
    pub fn declare_materials<I, S>(&mut self, model: &Path, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut record = self.read_record(model)?;
        record.materials = names.into_iter().map(Into::into).collect();
        write_json(&with_suffix(model, RECORD_SUFFIX), &record)
    }

    /// Model paths whose full re-import has been requested since the last call.
    pub fn take_import_events(&mut self) -> Vec<PathBuf> {
        self.import_events.drain(..).collect()
    }

    pub fn commits(&self) -> &[CommitEntry] {
        &self.commits
    }

    pub fn commit_count(&self, model: &Path, kind: CommitKind) -> usize {
        self.commits
            .iter()
            .filter(|c| c.model == model && c.kind == kind)
            .count()
    }

    /// The record as last written to disk, ignoring staged changes.
    pub fn persisted_record(&self, model: &Path) -> Result<ModelRecordFile> {
        let path = with_suffix(model, RECORD_SUFFIX);
        if !path.exists() {
            return Ok(ModelRecordFile::default());
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    fn read_record(&self, model: &Path) -> Result<ModelRecordFile> {
        match self.staged.get(model) {
            Some(r) => Ok(r.clone()),
            None => self.persisted_record(model),
        }
    }

    fn stage(&mut self, model: &Path, update: impl FnOnce(&mut ModelRecordFile)) -> Result<()> {
        let mut record = self.read_record(model)?;
        update(&mut record);
        self.staged.insert(model.to_path_buf(), record);
        Ok(())
    }
}

impl HostStatus for FsHost {
    fn is_busy(&self) -> bool {
        self.busy
    }
}

impl AssetStore for FsHost {
    fn asset_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn folder_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn ensure_folder(&mut self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            fs::create_dir_all(path)?;
            tracing::info!(folder = %path.display(), "created folder");
        }
        Ok(())
    }

    fn list_images(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();
        for entry in fs::read_dir(folder)? {
            let path = entry?.path();
            if path.is_file() && ImageLoader::is_image_path(&path) {
                images.push(path);
            }
        }
        // Sort for deterministic ordering across scans
        images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(images)
    }

    fn texture_settings(&self, path: &Path) -> Result<TextureImportSettings> {
        let meta = with_suffix(path, META_SUFFIX);
        if !meta.exists() {
            return Ok(TextureImportSettings::default());
        }
        Ok(serde_json::from_slice(&fs::read(meta)?)?)
    }

    fn set_texture_settings(&mut self, path: &Path, settings: &TextureImportSettings) -> Result<()> {
        write_json(&with_suffix(path, META_SUFFIX), settings)
    }

    fn load_texture(&self, path: &Path) -> Result<TextureMap> {
        if !self.texture_settings(path)?.readable {
            return Err(crate::Error::NotReadable(path.to_path_buf()));
        }
        let image = ImageLoader::load(path)?;
        Ok(TextureMap::from_loaded(image, Some(path.to_path_buf())))
    }

    fn write_texture(&mut self, path: &Path, texture: &TextureMap) -> Result<TextureMap> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        save_texture(texture, path)?;
        self.set_texture_settings(
            path,
            &TextureImportSettings {
                readable: true,
                kind: TextureKind::Default,
                srgb: false,
            },
        )?;
        self.load_texture(path)
    }

    fn load_material(&self, path: &Path) -> Result<Option<MaterialDescription>> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
    }

    fn write_material(&mut self, path: &Path, material: &MaterialDescription) -> Result<()> {
        write_json(path, material)
    }

    fn shader_available(&self, shader: &str) -> bool {
        self.shaders.iter().any(|s| s == shader)
    }
}

impl ModelImporter for FsHost {
    fn internal_material_names(&self, model: &Path) -> Result<Vec<String>> {
        let record = self.read_record(model)?;
        if record.materials.is_empty() {
            return Ok(vec![model_stem(model)]);
        }
        Ok(record.materials)
    }

    fn user_tag(&self, model: &Path) -> Result<Option<String>> {
        Ok(self.read_record(model)?.tag)
    }

    fn set_user_tag(&mut self, model: &Path, tag: &str) -> Result<()> {
        self.stage(model, |r| r.tag = Some(tag.to_string()))
    }

    fn remap_table(&self, model: &Path) -> Result<BTreeMap<String, PathBuf>> {
        Ok(self.read_record(model)?.remap)
    }

    fn set_remap(&mut self, model: &Path, internal_name: &str, material: &Path) -> Result<()> {
        if self.reject_remaps {
            return Err(crate::Error::Binding(format!(
                "remap of '{}' on {} rejected",
                internal_name,
                model.display()
            )));
        }
        self.stage(model, |r| {
            r.remap
                .insert(internal_name.to_string(), material.to_path_buf());
        })
    }

    fn commit(&mut self, model: &Path, kind: CommitKind) -> Result<()> {
        let mut record = self.read_record(model)?;
        record.updated_at = Some(chrono::Utc::now().to_rfc3339());
        write_json(&with_suffix(model, RECORD_SUFFIX), &record)?;
        self.staged.remove(model);
        self.commits.push(CommitEntry {
            model: model.to_path_buf(),
            kind,
        });
        if kind == CommitKind::Full {
            self.import_events.push_back(model.to_path_buf());
        }
        Ok(())
    }
}
