//! Metallic/smoothness channel packing.
//!
//! Builds one RGBA texture from independent grayscale sources:
//!
//! - **RGB** = metallic (R channel of the source), 0 when absent
//! - **A** = smoothness: `1 - roughness`, or a smoothness map as-is, or 1 when neither exists
//!
//! All sources are treated as grayscale (R channel used). Values are 8-bit unorm, so
//! `1 - r` is `255 - r`.

use crate::host::AssetStore;
use crate::material::TextureMap;
use crate::Result;
use image::{ImageBuffer, RgbaImage};
use std::path::{Path, PathBuf};

const METAL_TOKENS: &[&str] = &["metal"];
const SMOOTH_TOKENS: &[&str] = &["smooth", "gloss"];

/// Suffix of generated packed maps
pub const PACKED_SUFFIX: &str = "_MetallicSmoothness.png";

/// A readable single-channel source
#[derive(Debug, Clone)]
pub struct PackSource {
    pub path: PathBuf,
    pub image: TextureMap,
}

impl PackSource {
    pub fn new(path: impl Into<PathBuf>, image: TextureMap) -> Self {
        Self {
            path: path.into(),
            image,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PackInputs {
    pub metallic: Option<PackSource>,
    pub roughness: Option<PackSource>,
    pub smoothness: Option<PackSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOutcome {
    /// A source is already a combined metallic/smoothness map; use it unmodified
    PassThrough(PathBuf),
    Packed(TextureMap),
    /// Nothing to pack; any bound packed map should be cleared
    Empty,
}

/// True when a file name carries both a metal token and a smooth/gloss token.
pub fn is_combined_map_name(name: &str) -> bool {
    let name = name.to_lowercase();
    METAL_TOKENS.iter().any(|t| name.contains(t)) && SMOOTH_TOKENS.iter().any(|t| name.contains(t))
}

/// First path whose file name marks it as a combined metallic/smoothness map.
pub fn find_combined<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .find(|p| {
            p.file_name()
                .map(|n| is_combined_map_name(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(Path::to_path_buf)
}

/// True for maps this crate generated (`*_MetallicSmoothness.png`).
pub fn is_generated_map_name(name: &str) -> bool {
    name.ends_with(PACKED_SUFFIX)
}

/// `<base>_MetallicSmoothness.png`
pub fn packed_file_name(base: &str) -> String {
    format!("{}{}", base, PACKED_SUFFIX)
}

/// Extracts grayscale value from an RGBA pixel (uses R channel; for grayscale maps R=G=B).
#[inline]
fn sample_grayscale(data: &[u8], width: u32, x: u32, y: u32) -> u8 {
    let i = (y as usize * width as usize + x as usize) * 4;
    if i < data.len() {
        data[i]
    } else {
        0
    }
}

enum Alpha<'a> {
    Opaque,
    InvertedRoughness(&'a TextureMap),
    Smoothness(&'a TextureMap),
}

fn ensure_same_size(a: &PackSource, b: &PackSource) -> Result<()> {
    if a.image.dimensions() != b.image.dimensions() {
        return Err(crate::Error::DimensionMismatch {
            first: a.path.clone(),
            first_size: a.image.dimensions(),
            second: b.path.clone(),
            second_size: b.image.dimensions(),
        });
    }
    Ok(())
}

fn compose(width: u32, height: u32, metallic: Option<&TextureMap>, alpha: Alpha<'_>) -> TextureMap {
    let pixel_count = (width as usize) * (height as usize);
    let mut data = Vec::with_capacity(pixel_count * 4);

    for y in 0..height {
        for x in 0..width {
            let m = metallic
                .map(|t| sample_grayscale(&t.data, t.width, x, y))
                .unwrap_or(0);
            let a = match alpha {
                Alpha::Opaque => 255,
                Alpha::InvertedRoughness(t) => 255 - sample_grayscale(&t.data, t.width, x, y),
                Alpha::Smoothness(t) => sample_grayscale(&t.data, t.width, x, y),
            };
            data.extend_from_slice(&[m, m, m, a]);
        }
    }

    TextureMap {
        width,
        height,
        data,
        path: None,
    }
}

/// Packs the given sources. Errors when two consumed sources differ in size.
pub fn pack(inputs: &PackInputs) -> Result<PackOutcome> {
    let combined = find_combined(
        [&inputs.metallic, &inputs.smoothness]
            .into_iter()
            .flatten()
            .map(|s| s.path.as_path()),
    );
    if let Some(path) = combined {
        return Ok(PackOutcome::PassThrough(path));
    }

    let packed = match (&inputs.metallic, &inputs.roughness, &inputs.smoothness) {
        (Some(m), Some(r), _) => {
            ensure_same_size(m, r)?;
            let (w, h) = m.image.dimensions();
            compose(w, h, Some(&m.image), Alpha::InvertedRoughness(&r.image))
        }
        (Some(m), None, Some(s)) => {
            ensure_same_size(m, s)?;
            let (w, h) = m.image.dimensions();
            compose(w, h, Some(&m.image), Alpha::Smoothness(&s.image))
        }
        (Some(m), None, None) => {
            let (w, h) = m.image.dimensions();
            compose(w, h, Some(&m.image), Alpha::Opaque)
        }
        (None, Some(r), _) => {
            let (w, h) = r.image.dimensions();
            compose(w, h, None, Alpha::InvertedRoughness(&r.image))
        }
        (None, None, Some(s)) => {
            let (w, h) = s.image.dimensions();
            compose(w, h, None, Alpha::Smoothness(&s.image))
        }
        (None, None, None) => return Ok(PackOutcome::Empty),
    };
    Ok(PackOutcome::Packed(packed))
}

/// Like [`pack`], but a size mismatch drops the second source and packs metallic alone.
pub fn pack_with_fallback(mut inputs: PackInputs) -> Result<PackOutcome> {
    match pack(&inputs) {
        Err(crate::Error::DimensionMismatch {
            first,
            first_size,
            second,
            second_size,
        }) => {
            tracing::warn!(
                metallic = %first.display(),
                ?first_size,
                other = %second.display(),
                ?second_size,
                "source sizes differ; packing metallic only"
            );
            inputs.roughness = None;
            inputs.smoothness = None;
            pack(&inputs)
        }
        other => other,
    }
}

/// Writes a packed map through the host and returns the reloaded copy.
pub fn persist_packed<S>(store: &mut S, path: &Path, packed: &TextureMap) -> Result<TextureMap>
where
    S: AssetStore + ?Sized,
{
    let stored = store.write_texture(path, packed)?;
    tracing::info!(path = %path.display(), width = stored.width, height = stored.height, "generated metallic/smoothness map");
    Ok(stored)
}

/// Saves a TextureMap to the given path.
/// Format is inferred from the file extension (PNG, JPG, TGA).
pub fn save_texture<P: AsRef<Path>>(texture: &TextureMap, output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase());

    let img: RgbaImage = ImageBuffer::from_raw(texture.width, texture.height, texture.data.clone())
        .ok_or_else(|| crate::Error::Other("Invalid texture dimensions".into()))?;

    match ext.as_deref() {
        Some("png") | Some("tga") => img.save(path)?,
        _ => {
            return Err(crate::Error::Other(format!(
                "Unsupported output format: {:?}. Packed maps need alpha; use .png or .tga.",
                ext
            )))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_grayscale_texture(w: u32, h: u32, value: u8) -> TextureMap {
        let len = (w as usize) * (h as usize) * 4;
        TextureMap {
            width: w,
            height: h,
            data: (0..len).map(|i| if i % 4 == 3 { 255 } else { value }).collect(),
            path: None,
        }
    }

    fn gradient_texture(w: u32, h: u32) -> TextureMap {
        let mut data = Vec::new();
        for i in 0..(w * h) {
            let v = (i * 37 % 256) as u8;
            data.extend_from_slice(&[v, v, v, 255]);
        }
        TextureMap {
            width: w,
            height: h,
            data,
            path: None,
        }
    }

    fn src(name: &str, image: TextureMap) -> Option<PackSource> {
        Some(PackSource::new(name, image))
    }

    fn packed(outcome: PackOutcome) -> TextureMap {
        match outcome {
            PackOutcome::Packed(t) => t,
            other => panic!("expected packed image, got {:?}", other),
        }
    }

    #[test]
    fn metallic_and_roughness_follow_composition_law() {
        let m = gradient_texture(5, 3);
        let r = make_grayscale_texture(5, 3, 64);
        let out = packed(
            pack(&PackInputs {
                metallic: src("wood_metal.png", m.clone()),
                roughness: src("wood_rough.png", r.clone()),
                smoothness: None,
            })
            .unwrap(),
        );

        assert_eq!(out.dimensions(), (5, 3));
        for y in 0..3 {
            for x in 0..5 {
                let mv = m.pixel(x, y).unwrap()[0];
                let rv = r.pixel(x, y).unwrap()[0];
                assert_eq!(out.pixel(x, y), Some([mv, mv, mv, 255 - rv]));
            }
        }
    }

    #[test]
    fn metallic_alone_is_fully_smooth() {
        let out = packed(
            pack(&PackInputs {
                metallic: src("wood_metal.png", make_grayscale_texture(4, 4, 200)),
                ..Default::default()
            })
            .unwrap(),
        );
        assert!(out.data.chunks(4).all(|p| p == [200, 200, 200, 255]));
    }

    #[test]
    fn roughness_alone_has_no_metal() {
        let out = packed(
            pack(&PackInputs {
                roughness: src("wood_rough.png", make_grayscale_texture(2, 2, 30)),
                ..Default::default()
            })
            .unwrap(),
        );
        assert!(out.data.chunks(4).all(|p| p == [0, 0, 0, 225]));
    }

    #[test]
    fn smoothness_is_used_without_inversion() {
        let out = packed(
            pack(&PackInputs {
                metallic: src("wood_metal.png", make_grayscale_texture(2, 2, 10)),
                smoothness: src("wood_smooth.png", make_grayscale_texture(2, 2, 90)),
                ..Default::default()
            })
            .unwrap(),
        );
        assert_eq!(out.pixel(1, 1), Some([10, 10, 10, 90]));

        let only = packed(
            pack(&PackInputs {
                smoothness: src("wood_gloss.png", make_grayscale_texture(2, 2, 90)),
                ..Default::default()
            })
            .unwrap(),
        );
        assert_eq!(only.pixel(0, 0), Some([0, 0, 0, 90]));
    }

    #[test]
    fn nothing_to_pack_yields_no_image() {
        assert_eq!(pack(&PackInputs::default()).unwrap(), PackOutcome::Empty);
    }

    #[test]
    fn combined_source_passes_through() {
        let outcome = pack(&PackInputs {
            metallic: src("t/wood_MetallicSmoothness.png", make_grayscale_texture(2, 2, 1)),
            roughness: src("t/wood_rough.png", make_grayscale_texture(2, 2, 1)),
            smoothness: None,
        })
        .unwrap();
        assert_eq!(
            outcome,
            PackOutcome::PassThrough(PathBuf::from("t/wood_MetallicSmoothness.png"))
        );
        assert!(is_combined_map_name("crate_metal_gloss.tga"));
        assert!(!is_combined_map_name("crate_metal.tga"));
    }

    #[test]
    fn generated_names_are_recognized() {
        assert!(is_generated_map_name(&packed_file_name("wood")));
        assert!(!is_generated_map_name("wood_metallic_smoothness.png"));
        assert!(!is_generated_map_name("wood_metal.png"));
    }

    #[test]
    fn mismatched_sizes_error_then_fall_back() {
        let inputs = PackInputs {
            metallic: src("wood_metal.png", make_grayscale_texture(4, 4, 100)),
            roughness: src("wood_rough.png", make_grayscale_texture(2, 2, 50)),
            smoothness: None,
        };
        assert!(matches!(
            pack(&inputs),
            Err(crate::Error::DimensionMismatch { .. })
        ));

        let out = packed(pack_with_fallback(inputs).unwrap());
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.pixel(3, 3), Some([100, 100, 100, 255]));
    }

    #[test]
    fn save_texture_rejects_formats_without_alpha() {
        let tmp = tempfile::tempdir().unwrap();
        let tex = make_grayscale_texture(2, 2, 5);
        save_texture(&tex, tmp.path().join("out.png")).unwrap();
        assert!(save_texture(&tex, tmp.path().join("out.jpg")).is_err());
    }
}
