//! PBR texture import CLI

use clap::{Args, Parser, Subcommand};
use pbr_import_core::{
    pack_with_fallback, save_texture, Assignment, CycleReport, FsHost, ImageLoader,
    ImportSettings, ManualSelection, PackInputs, PackOutcome, PackSource, PipelineOrchestrator,
    RolePick, TextureMap, TextureRole, TextureSearchResult,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pbr-import")]
#[command(about = "Classifies PBR texture sets, packs metallic/smoothness maps and binds model materials.")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Import settings file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Per-role candidate indices; a negative index clears the role
#[derive(Args, Debug, Default, Clone)]
struct PickArgs {
    #[arg(long, allow_negative_numbers = true)]
    albedo: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    normal: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    metallic: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    roughness: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    smoothness: Option<i64>,
}

impl PickArgs {
    fn selection(&self) -> ManualSelection {
        let picks = [
            (TextureRole::Albedo, self.albedo),
            (TextureRole::Normal, self.normal),
            (TextureRole::Metallic, self.metallic),
            (TextureRole::Roughness, self.roughness),
            (TextureRole::Smoothness, self.smoothness),
        ];
        picks
            .into_iter()
            .filter_map(|(role, index)| index.map(|i| (role, RolePick::from_index(i))))
            .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the images in a texture folder by role
    Classify {
        folder: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Resolve one texture per role, optionally with manual picks
    Resolve {
        folder: PathBuf,
        #[command(flatten)]
        picks: PickArgs,
        #[arg(long)]
        json: bool,
    },
    /// Pack grayscale maps into a metallic/smoothness texture
    Pack {
        #[arg(long)]
        metallic: Option<PathBuf>,
        #[arg(long)]
        roughness: Option<PathBuf>,
        #[arg(long)]
        smoothness: Option<PathBuf>,
        /// Output file (.png or .tga)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the import pipeline over model files until idle
    Process {
        #[arg(required = true)]
        models: Vec<PathBuf>,
        /// Upper bound on idle ticks
        #[arg(long, default_value = "16")]
        max_ticks: usize,
    },
    /// Reset models to unprocessed and replay the full bind
    Force {
        #[arg(required = true)]
        models: Vec<PathBuf>,
        #[arg(long, default_value = "16")]
        max_ticks: usize,
    },
    /// Apply a manually resolved texture set to a model's material
    Assign {
        model: PathBuf,
        #[command(flatten)]
        picks: PickArgs,
    },
    /// Show a model's import record
    Status {
        model: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    model: String,
    state: String,
    remap: Vec<RemapEntry>,
}

#[derive(Debug, Serialize)]
struct RemapEntry {
    internal: String,
    material: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = ImportSettings::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { folder, json } => cmd_classify(&folder, settings, json),
        Commands::Resolve { folder, picks, json } => cmd_resolve(&folder, &picks, settings, json),
        Commands::Pack {
            metallic,
            roughness,
            smoothness,
            output,
        } => cmd_pack(
            metallic.as_deref(),
            roughness.as_deref(),
            smoothness.as_deref(),
            &output,
        ),
        Commands::Process { models, max_ticks } => cmd_process(&models, settings, max_ticks, false),
        Commands::Force { models, max_ticks } => cmd_process(&models, settings, max_ticks, true),
        Commands::Assign { model, picks } => cmd_assign(&model, &picks, settings),
        Commands::Status { model, json } => cmd_status(&model, settings, json),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn classify_folder(
    folder: &Path,
    settings: ImportSettings,
) -> Result<TextureSearchResult, Box<dyn std::error::Error>> {
    let orchestrator = PipelineOrchestrator::new(FsHost::new(), settings);
    Ok(orchestrator.classify_folder(folder)?)
}

fn cmd_classify(
    folder: &Path,
    settings: ImportSettings,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let search = classify_folder(folder, settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&search)?);
        return Ok(());
    }

    for role in TextureRole::ASSIGNABLE.into_iter().chain([TextureRole::Unknown]) {
        let candidates = search.candidates(role);
        if candidates.is_empty() {
            continue;
        }
        println!("{}:", role);
        for t in candidates {
            println!("  {}", t.name);
        }
    }
    println!("\n{}", search.summary());
    Ok(())
}

fn print_assignment(assignment: &Assignment) {
    for role in TextureRole::ASSIGNABLE {
        let value = match assignment.get(role).texture() {
            Some(t) => t.name.clone(),
            None if assignment.get(role).is_unresolved() => "(unresolved)".to_string(),
            None => "(none)".to_string(),
        };
        println!("{:<12} {}", format!("{}:", role), value);
    }
}

fn cmd_resolve(
    folder: &Path,
    picks: &PickArgs,
    settings: ImportSettings,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = PipelineOrchestrator::new(FsHost::new(), settings);
    let assignment = orchestrator.resolve_manual(folder, picks.selection())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assignment)?);
    } else {
        print_assignment(&assignment);
    }
    Ok(())
}

fn load_source(path: Option<&Path>) -> Result<Option<PackSource>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let image = ImageLoader::load(path)?;
    Ok(Some(PackSource::new(
        path,
        TextureMap::from_loaded(image, Some(path.to_path_buf())),
    )))
}

fn cmd_pack(
    metallic: Option<&Path>,
    roughness: Option<&Path>,
    smoothness: Option<&Path>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = PackInputs {
        metallic: load_source(metallic)?,
        roughness: load_source(roughness)?,
        smoothness: load_source(smoothness)?,
    };

    match pack_with_fallback(inputs)? {
        PackOutcome::Packed(texture) => {
            save_texture(&texture, output)?;
            println!(
                "Wrote {}x{} metallic/smoothness map to {}",
                texture.width,
                texture.height,
                output.display()
            );
        }
        PackOutcome::PassThrough(path) => {
            println!("{} is already a combined map; nothing written", path.display());
        }
        PackOutcome::Empty => {
            return Err("no metallic, roughness or smoothness source given".into());
        }
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!(
        "{}: {:?} {} -> {}{}",
        file_name(&report.model),
        report.plan,
        report.transition.from,
        report.transition.to,
        match report.transition.commit {
            Some(kind) => format!(" ({:?} commit)", kind),
            None => String::new(),
        }
    );
    if let Some(path) = &report.metallic_gloss {
        println!("  metallic/smoothness: {}", file_name(path));
    }
    if report.materials_written > 0 {
        println!("  materials written: {}", report.materials_written);
    }
    if !report.unresolved.is_empty() {
        let roles: Vec<String> = report.unresolved.iter().map(|r| r.to_string()).collect();
        println!("  unresolved: {}", roles.join(", "));
    }
}

/// Runs the pipeline for `models`. Returns the reports in execution order.
fn process_models(
    models: &[PathBuf],
    settings: ImportSettings,
    max_ticks: usize,
    force: bool,
) -> Result<Vec<CycleReport>, Box<dyn std::error::Error>> {
    let mut orchestrator = PipelineOrchestrator::new(FsHost::new(), settings);
    for model in models {
        if force {
            orchestrator.force_reprocess(model)?;
        } else if !orchestrator.on_model_imported(model) {
            tracing::warn!(model = %model.display(), "ignored; not a model or auto import disabled");
        }
    }
    orchestrator.run_until_idle(max_ticks, |host| host.take_import_events());
    if orchestrator.has_pending() {
        tracing::warn!("tick limit reached with work still queued");
    }
    Ok(orchestrator.take_reports())
}

fn cmd_process(
    models: &[PathBuf],
    settings: ImportSettings,
    max_ticks: usize,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = process_models(models, settings, max_ticks, force)?;
    for report in &reports {
        print_report(report);
    }

    let missing: Vec<String> = models
        .iter()
        .filter(|m| !reports.iter().any(|r| &r.model == *m))
        .map(|m| m.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(format!("not processed: {}", missing.join(", ")).into());
    }
    Ok(())
}

fn cmd_assign(
    model: &Path,
    picks: &PickArgs,
    settings: ImportSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let folder = settings.texture_folder(model);
    let mut orchestrator = PipelineOrchestrator::new(FsHost::new(), settings);
    let assignment = orchestrator.resolve_manual(&folder, picks.selection())?;
    print_assignment(&assignment);

    let material = orchestrator.apply_manual(model, &assignment)?;
    println!("\nMaterial {} ({})", material.name, material.shader);
    for (property, texture) in &material.textures {
        println!("  {} = {}", property, file_name(texture));
    }
    Ok(())
}

fn cmd_status(
    model: &Path,
    settings: ImportSettings,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = PipelineOrchestrator::new(FsHost::new(), settings);
    let record = orchestrator.record(model)?;

    if json {
        let output = StatusOutput {
            model: model.display().to_string(),
            state: record.state.tag().to_string(),
            remap: record
                .remap
                .iter()
                .map(|(internal, material)| RemapEntry {
                    internal: internal.clone(),
                    material: material.display().to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}: {}", model.display(), record.state);
    for (internal, material) in &record.remap {
        println!("  {} -> {}", internal, material.display());
    }
    Ok(())
}
