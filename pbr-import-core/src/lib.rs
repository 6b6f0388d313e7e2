//! # PBR Import Core
//!
//! Turns loose PBR texture sets into packed material descriptions and rebinds a model's
//! embedded materials to them without re-entrant reprocessing.
//!
//! ## Architecture
//!
//! - [`classifier`] - Texture role classification by file name
//! - [`resolver`] - Candidate resolution (auto, priority, manual override)
//! - [`packing`] - Metallic/smoothness channel packing
//! - [`state`] - Per-model processing state machine
//! - [`scheduler`] - Deferred task queue drained on idle ticks
//! - [`orchestrator`] - Pipeline composing the above against a [`host::Host`]
//! - [`fs_host`] - Filesystem-backed host

pub mod classifier;
pub mod fs_host;
pub mod host;
pub mod image_loading;
pub mod material;
pub mod orchestrator;
pub mod packing;
pub mod resolver;
pub mod scheduler;
pub mod settings;
pub mod state;

use std::path::PathBuf;

// Re-export main types for convenient access
pub use classifier::{classify, classify_name, ImageEntry, TextureHandle, TextureSearchResult};
pub use fs_host::{CommitEntry, FsHost};
pub use host::{
    AssetStore, CommitKind, Host, HostStatus, ModelImporter, TextureImportSettings, TextureKind,
};
pub use image_loading::{ImageLoader, LoadedImage, TextureRole};
pub use material::{
    MaterialBuilder, MaterialDescription, MaterialSlot, MaterialTextures, ShaderPipeline,
    TextureMap,
};
pub use orchestrator::{CycleReport, PipelineOrchestrator};
pub use packing::{pack, pack_with_fallback, save_texture, PackInputs, PackOutcome, PackSource};
pub use resolver::{
    resolve, Assignment, ManualSelection, RolePick, RolePriorities, RoleSelection,
    SelectionPolicy,
};
pub use scheduler::{DeferredScheduler, TickReport};
pub use settings::{ImportSettings, KeywordTable, SelectionMode};
pub use state::{CyclePlan, ImportRecord, ImportStateMachine, ProcessingState};

/// Common result type for import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Library-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Missing folder, unavailable shader, bad settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Texture is not readable: {}", .0.display())]
    NotReadable(PathBuf),

    #[error(
        "Size mismatch: {} is {}x{}, {} is {}x{}",
        .first.display(), .first_size.0, .first_size.1,
        .second.display(), .second_size.0, .second_size.1
    )]
    DimensionMismatch {
        first: PathBuf,
        first_size: (u32, u32),
        second: PathBuf,
        second_size: (u32, u32),
    },

    /// The host rejected a remap or record write
    #[error("Binding error: {0}")]
    Binding(String),

    #[error("{0}")]
    Other(String),
}
