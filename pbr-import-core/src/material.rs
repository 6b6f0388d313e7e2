//! Texture buffers, material descriptions and shader-family builders.
//!
//! A [`MaterialDescription`] is the packed result of an import: a shader identifier plus the
//! texture bound to each shader slot. [`MaterialBuilder`] implementations know the naming and
//! slot conventions of one shader family and are selected by [`ShaderPipeline`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::image_loading::LoadedImage;

/// A texture map with resolution and pixel data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureMap {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel, row-major)
    pub data: Vec<u8>,
    /// Source path when loaded from file
    pub path: Option<PathBuf>,
}

impl TextureMap {
    pub fn from_loaded(image: LoadedImage, path: Option<PathBuf>) -> Self {
        Self {
            width: image.width,
            height: image.height,
            data: image.data,
            path,
        }
    }

    /// Get pixel at (x, y) as [R, G, B, A]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        if i + 4 > self.data.len() {
            return None;
        }
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when both maps hold the same pixels, ignoring where they came from.
    pub fn same_pixels(&self, other: &TextureMap) -> bool {
        self.width == other.width && self.height == other.height && self.data == other.data
    }
}

/// Texture slots a built material exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSlot {
    BaseColor,
    Normal,
    MetallicGloss,
}

/// Textures to bind onto a material. `None` leaves the slot empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    pub base_color: Option<PathBuf>,
    pub normal: Option<PathBuf>,
    pub metallic_gloss: Option<PathBuf>,
}

/// Persisted material: shader plus slot bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    pub shader: String,
    #[serde(default)]
    pub textures: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl MaterialDescription {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            textures: BTreeMap::new(),
            keywords: BTreeSet::new(),
        }
    }

    pub fn texture(&self, property: &str) -> Option<&Path> {
        self.textures.get(property).map(PathBuf::as_path)
    }

    pub fn set_texture(&mut self, property: &str, texture: Option<&Path>) {
        match texture {
            Some(p) => {
                self.textures.insert(property.to_string(), p.to_path_buf());
            }
            None => {
                self.textures.remove(property);
            }
        }
    }

    pub fn set_keyword(&mut self, keyword: &str, enabled: bool) {
        if enabled {
            self.keywords.insert(keyword.to_string());
        } else {
            self.keywords.remove(keyword);
        }
    }
}

/// Shader family used for generated materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderPipeline {
    #[default]
    Standard,
    Urp,
    Hdrp,
}

impl ShaderPipeline {
    pub fn builder(&self) -> Box<dyn MaterialBuilder> {
        match self {
            ShaderPipeline::Standard => Box::new(StandardBuilder),
            ShaderPipeline::Urp => Box::new(UrpBuilder),
            ShaderPipeline::Hdrp => Box::new(HdrpBuilder),
        }
    }
}

/// Naming and slot conventions of one shader family.
pub trait MaterialBuilder: Send + Sync {
    fn shader_identifier(&self) -> &'static str;

    fn slot_property(&self, slot: MaterialSlot) -> &'static str;

    /// Keyword enabled while a metallic/gloss map is bound
    fn metallic_keyword(&self) -> &'static str;

    fn normal_keyword(&self) -> &'static str {
        "_NORMALMAP"
    }

    /// File-safe material name derived from an internal material name.
    fn build_name(&self, base: &str) -> String {
        let base = base.trim();
        if base.is_empty() {
            "Unnamed_mat".to_string()
        } else {
            sanitize_file_name(&format!("{}_mat", base))
        }
    }

    fn new_material(&self, base: &str) -> MaterialDescription {
        MaterialDescription::new(self.build_name(base), self.shader_identifier())
    }

    /// Binds `textures` onto `material`. Returns true when anything changed.
    fn apply(&self, material: &mut MaterialDescription, textures: &MaterialTextures) -> bool {
        let before = material.clone();
        material.shader = self.shader_identifier().to_string();
        material.set_texture(
            self.slot_property(MaterialSlot::BaseColor),
            textures.base_color.as_deref(),
        );
        material.set_texture(
            self.slot_property(MaterialSlot::Normal),
            textures.normal.as_deref(),
        );
        material.set_keyword(self.normal_keyword(), textures.normal.is_some());
        material.set_texture(
            self.slot_property(MaterialSlot::MetallicGloss),
            textures.metallic_gloss.as_deref(),
        );
        material.set_keyword(self.metallic_keyword(), textures.metallic_gloss.is_some());
        *material != before
    }
}

/// Built-in Standard shader
pub struct StandardBuilder;

impl MaterialBuilder for StandardBuilder {
    fn shader_identifier(&self) -> &'static str {
        "Standard"
    }

    fn slot_property(&self, slot: MaterialSlot) -> &'static str {
        match slot {
            MaterialSlot::BaseColor => "_MainTex",
            MaterialSlot::Normal => "_BumpMap",
            MaterialSlot::MetallicGloss => "_MetallicGlossMap",
        }
    }

    fn metallic_keyword(&self) -> &'static str {
        "_METALLICGLOSSMAP"
    }
}

/// Universal Render Pipeline Lit shader
pub struct UrpBuilder;

impl MaterialBuilder for UrpBuilder {
    fn shader_identifier(&self) -> &'static str {
        "Universal Render Pipeline/Lit"
    }

    fn slot_property(&self, slot: MaterialSlot) -> &'static str {
        match slot {
            MaterialSlot::BaseColor => "_BaseMap",
            MaterialSlot::Normal => "_BumpMap",
            MaterialSlot::MetallicGloss => "_MetallicGlossMap",
        }
    }

    fn metallic_keyword(&self) -> &'static str {
        "_METALLICSPECGLOSSMAP"
    }
}

/// High Definition Render Pipeline Lit shader
pub struct HdrpBuilder;

impl MaterialBuilder for HdrpBuilder {
    fn shader_identifier(&self) -> &'static str {
        "HDRP/Lit"
    }

    fn slot_property(&self, slot: MaterialSlot) -> &'static str {
        match slot {
            MaterialSlot::BaseColor => "_BaseColorMap",
            MaterialSlot::Normal => "_NormalMap",
            MaterialSlot::MetallicGloss => "_MaskMap",
        }
    }

    fn metallic_keyword(&self) -> &'static str {
        "_MASKMAP"
    }

    fn normal_keyword(&self) -> &'static str {
        "_NORMALMAP_TANGENT_SPACE"
    }
}

/// Replaces characters that are not allowed in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
