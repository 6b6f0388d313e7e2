//! Image loading and texture role identifiers.
//!
//! Loads PNG, JPG, and TGA files and returns width, height, and RGBA color data.

use crate::Result;
use image::GenericImageView;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// Image extensions picked up by folder scans
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga"];

/// Supported image formats for loading
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Tga];

/// Semantic PBR role of a texture file
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TextureRole {
    Albedo,
    Normal,
    Metallic,
    Roughness,
    Smoothness,
    Unknown,
}

impl TextureRole {
    /// Roles that can be assigned, in classification order (first match wins).
    pub const ASSIGNABLE: [TextureRole; 5] = [
        TextureRole::Albedo,
        TextureRole::Normal,
        TextureRole::Metallic,
        TextureRole::Roughness,
        TextureRole::Smoothness,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextureRole::Albedo => "albedo",
            TextureRole::Normal => "normal",
            TextureRole::Metallic => "metallic",
            TextureRole::Roughness => "roughness",
            TextureRole::Smoothness => "smoothness",
            TextureRole::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TextureRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A loaded texture image with pixel data
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel, row-major)
    pub data: Vec<u8>,
}

impl LoadedImage {
    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.to_rgba8().into_raw();

        Self {
            width,
            height,
            data,
        }
    }
}

/// Loads PBR texture images (PNG, JPG, TGA)
pub struct ImageLoader;

impl ImageLoader {
    /// Load an image from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedImage> {
        let reader = image::ImageReader::open(path.as_ref())?.with_guessed_format()?;
        let format = reader.format().unwrap_or(ImageFormat::Png);

        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(crate::Error::Other(format!(
                "Unsupported format: {:?}. Use PNG, JPG, or TGA.",
                format
            )));
        }

        let image = reader.decode()?;
        Ok(LoadedImage::from_dynamic(image))
    }

    /// True when the path carries one of the scanned image extensions.
    pub fn is_image_path<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}
