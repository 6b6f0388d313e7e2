//! Import pipeline: classification, resolution, packing and binding behind a deferred queue.
//!
//! Import callbacks call [`PipelineOrchestrator::on_model_imported`], which only enqueues.
//! The work runs on a later [`PipelineOrchestrator::tick`], once the host is idle.

use crate::classifier::{classify, ImageEntry, TextureSearchResult};
use crate::host::{Host, HostStatus, TextureImportSettings, TextureKind};
use crate::image_loading::TextureRole;
use crate::material::{MaterialBuilder, MaterialDescription, MaterialTextures};
use crate::packing::{
    find_combined, is_generated_map_name, pack_with_fallback, packed_file_name, persist_packed,
    PackInputs, PackOutcome, PackSource,
};
use crate::resolver::{resolve, Assignment, ManualSelection, SelectionPolicy};
use crate::scheduler::{DeferredScheduler, TickReport};
use crate::settings::{model_stem, ImportSettings};
use crate::state::{CyclePlan, ImportRecord, ImportStateMachine, ProcessingState, Transition};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of one processed model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub model: PathBuf,
    pub plan: CyclePlan,
    pub transition: Transition,
    /// Bound metallic/smoothness texture, if any
    pub metallic_gloss: Option<PathBuf>,
    pub materials_written: usize,
    pub unresolved: Vec<TextureRole>,
}

/// Host, settings and material builder shared by every deferred task.
pub struct ImportContext<H> {
    host: H,
    settings: ImportSettings,
    builder: Box<dyn MaterialBuilder>,
    reports: Vec<CycleReport>,
}

impl<H: HostStatus> HostStatus for ImportContext<H> {
    fn is_busy(&self) -> bool {
        self.host.is_busy()
    }
}

struct PreparedTextures {
    textures: MaterialTextures,
    /// The packed map was written or rewritten this cycle
    packed_rewritten: bool,
}

impl<H: Host> ImportContext<H> {
    /// Classifies the images in `folder`. Generated packed maps are never candidates.
    fn scan(&self, folder: &Path) -> Result<TextureSearchResult> {
        let mut entries = Vec::new();
        for path in self.host.list_images(folder)? {
            let generated = path
                .file_name()
                .map(|n| is_generated_map_name(&n.to_string_lossy()))
                .unwrap_or(false);
            if generated {
                debug!(texture = %path.display(), "generated map skipped");
                continue;
            }
            let readable = self.host.texture_settings(&path)?.readable;
            entries.push(ImageEntry::new(path, readable));
        }
        let search = classify(entries, &self.settings.keywords);
        info!(folder = %folder.display(), "texture scan: {}", search.summary());
        Ok(search)
    }

    fn ensure_normal_map(&mut self, path: &Path) -> Result<()> {
        let current = self.host.texture_settings(path)?;
        if current.kind == TextureKind::NormalMap && !current.srgb {
            return Ok(());
        }
        let updated = TextureImportSettings {
            kind: TextureKind::NormalMap,
            srgb: false,
            ..current
        };
        self.host.set_texture_settings(path, &updated)?;
        info!(texture = %path.display(), "reimported as normal map");
        Ok(())
    }

    /// Flips a grayscale source to readable + linear and loads it. `None` when still unreadable.
    fn load_readable(&mut self, path: &Path) -> Result<Option<PackSource>> {
        let current = self.host.texture_settings(path)?;
        if !current.readable || current.srgb {
            let updated = TextureImportSettings {
                readable: true,
                srgb: false,
                ..current
            };
            self.host.set_texture_settings(path, &updated)?;
            debug!(texture = %path.display(), "made readable and linear");
        }
        match self.host.load_texture(path) {
            Ok(image) => Ok(Some(PackSource::new(path, image))),
            Err(e) => {
                warn!(texture = %path.display(), error = %e, "source skipped for packing");
                Ok(None)
            }
        }
    }

    fn source(&mut self, assignment: &Assignment, role: TextureRole) -> Result<Option<PackSource>> {
        match assignment.texture(role) {
            Some(t) => self.load_readable(&t.path),
            None => Ok(None),
        }
    }

    fn metallic_gloss(
        &mut self,
        folder: &Path,
        packed_name: &str,
        assignment: &Assignment,
    ) -> Result<(Option<PathBuf>, bool)> {
        if !self.settings.generate_metallic_smoothness {
            return Ok((
                assignment.texture(TextureRole::Metallic).map(|t| t.path.clone()),
                false,
            ));
        }

        let named = [TextureRole::Metallic, TextureRole::Smoothness]
            .into_iter()
            .filter_map(|r| assignment.texture(r))
            .map(|t| t.path.as_path());
        if let Some(combined) = find_combined(named) {
            debug!(texture = %combined.display(), "using existing metallic/smoothness map");
            return Ok((Some(combined), false));
        }

        let inputs = PackInputs {
            metallic: self.source(assignment, TextureRole::Metallic)?,
            roughness: self.source(assignment, TextureRole::Roughness)?,
            smoothness: self.source(assignment, TextureRole::Smoothness)?,
        };

        match pack_with_fallback(inputs)? {
            PackOutcome::PassThrough(path) => Ok((Some(path), false)),
            PackOutcome::Empty => {
                debug!(folder = %folder.display(), "no metallic/roughness sources");
                Ok((None, false))
            }
            PackOutcome::Packed(packed) => {
                let path = folder.join(packed_name);
                let unchanged = self.host.asset_exists(&path)
                    && self
                        .host
                        .load_texture(&path)
                        .map(|existing| existing.same_pixels(&packed))
                        .unwrap_or(false);
                if unchanged {
                    debug!(path = %path.display(), "packed map unchanged");
                    return Ok((Some(path), false));
                }
                persist_packed(&mut self.host, &path, &packed)?;
                Ok((Some(path), true))
            }
        }
    }

    fn prepare(&mut self, model: &Path, folder: &Path, assignment: &Assignment) -> Result<PreparedTextures> {
        let normal = assignment.texture(TextureRole::Normal).map(|t| t.path.clone());
        if let Some(path) = &normal {
            self.ensure_normal_map(path)?;
        }

        let packed_name = packed_file_name(&model_stem(model));
        let (metallic_gloss, packed_rewritten) = self.metallic_gloss(folder, &packed_name, assignment)?;

        Ok(PreparedTextures {
            textures: MaterialTextures {
                base_color: assignment.texture(TextureRole::Albedo).map(|t| t.path.clone()),
                normal,
                metallic_gloss,
            },
            packed_rewritten,
        })
    }

    fn check_configuration(&self, folder: &Path) -> Result<()> {
        if !self.host.folder_exists(folder) {
            return Err(crate::Error::Config(format!(
                "texture folder not found: {}",
                folder.display()
            )));
        }
        let shader = self.builder.shader_identifier();
        if !self.host.shader_available(shader) {
            return Err(crate::Error::Config(format!("shader '{}' is not available", shader)));
        }
        Ok(())
    }

    fn material_path(&self, model: &Path, base: &str) -> PathBuf {
        self.settings
            .material_folder(model)
            .join(format!("{}.mat", self.builder.build_name(base)))
    }

    /// Creates or reuses a material and binds `textures`. Returns it and whether it was written.
    fn upsert_material(
        &mut self,
        path: &Path,
        base: &str,
        textures: &MaterialTextures,
    ) -> Result<(MaterialDescription, bool)> {
        let (mut material, existed) = match self.host.load_material(path)? {
            Some(m) => {
                debug!(material = %path.display(), "reusing existing material");
                (m, true)
            }
            None => (self.builder.new_material(base), false),
        };
        let changed = self.builder.apply(&mut material, textures);
        if changed || !existed {
            self.host.write_material(path, &material)?;
        }
        Ok((material, changed || !existed))
    }

    fn full_bind(
        &mut self,
        model: &Path,
        from: ProcessingState,
        textures: &MaterialTextures,
    ) -> Result<(Transition, usize)> {
        let folder = self.settings.material_folder(model);
        self.host.ensure_folder(&folder)?;

        let existing = self.host.remap_table(model)?;
        let mut written = 0;
        for name in self.host.internal_material_names(model)? {
            let path = self.material_path(model, &name);
            let (_, was_written) = self.upsert_material(&path, &name, textures)?;
            if was_written {
                written += 1;
            }
            if existing.get(&name) != Some(&path) {
                self.host.set_remap(model, &name, &path)?;
                debug!(model = %model.display(), internal = %name, material = %path.display(), "remapped");
            }
        }

        let transition = ImportStateMachine::after_full_bind(from);
        ImportStateMachine::apply(&mut self.host, model, &transition)?;
        Ok((transition, written))
    }

    fn refresh(
        &mut self,
        model: &Path,
        record: &ImportRecord,
        prepared: &PreparedTextures,
    ) -> Result<(Transition, usize)> {
        if record.remap.is_empty() {
            warn!(model = %model.display(), state = %record.state, "bound model has no remapped materials");
        }

        let mut written = 0;
        for (name, path) in &record.remap {
            let Some(mut material) = self.host.load_material(path)? else {
                warn!(internal = %name, material = %path.display(), "bound material missing");
                continue;
            };
            if self.builder.apply(&mut material, &prepared.textures) {
                self.host.write_material(path, &material)?;
                written += 1;
            }
        }

        let changed = written > 0 || prepared.packed_rewritten;
        let transition = ImportStateMachine::after_refresh(record.state, changed);
        ImportStateMachine::apply(&mut self.host, model, &transition)?;
        Ok((transition, written))
    }

    /// Runs one mutation cycle for `model`. `None` when the model is not eligible or gone.
    pub fn process_model(&mut self, model: &Path, force: bool) -> Result<Option<CycleReport>> {
        if !self.settings.is_model_path(model) {
            debug!(model = %model.display(), "not a model file; skipping");
            return Ok(None);
        }
        if !self.host.asset_exists(model) {
            info!(model = %model.display(), "model no longer exists; skipping");
            return Ok(None);
        }

        let mut record = ImportRecord::read(&self.host, model)?;
        if force {
            record.state = ProcessingState::Unprocessed;
        }
        let plan = ImportStateMachine::plan(record.state, force);

        let folder = self.settings.texture_folder(model);
        self.check_configuration(&folder)?;

        let search = self.scan(&folder)?;
        let assignment = resolve(&search, &self.settings.selection_policy());
        let unresolved = assignment.unresolved_roles();
        let prepared = self.prepare(model, &folder, &assignment)?;

        let (transition, materials_written) = match plan {
            CyclePlan::FullBind => self.full_bind(model, record.state, &prepared.textures)?,
            CyclePlan::Refresh => self.refresh(model, &record, &prepared)?,
        };

        let report = CycleReport {
            model: model.to_path_buf(),
            plan,
            transition,
            metallic_gloss: prepared.textures.metallic_gloss.clone(),
            materials_written,
            unresolved,
        };
        self.reports.push(report.clone());
        Ok(Some(report))
    }
}

/// Entry points exposed to the host and to interactive tools.
pub struct PipelineOrchestrator<H> {
    scheduler: DeferredScheduler<ImportContext<H>>,
    context: ImportContext<H>,
}

impl<H: Host + 'static> PipelineOrchestrator<H> {
    pub fn new(host: H, settings: ImportSettings) -> Self {
        let builder = settings.shader_pipeline.builder();
        Self {
            scheduler: DeferredScheduler::new(),
            context: ImportContext {
                host,
                settings,
                builder,
                reports: Vec::new(),
            },
        }
    }

    pub fn host(&self) -> &H {
        &self.context.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.context.host
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.context.settings
    }

    /// Import hook. Only enqueues; returns false when the event is ignored.
    pub fn on_model_imported(&self, model: impl AsRef<Path>) -> bool {
        let model = model.as_ref();
        if !self.context.settings.auto_import_enabled {
            debug!(model = %model.display(), "auto import disabled");
            return false;
        }
        if !self.context.settings.is_model_path(model) {
            return false;
        }
        self.enqueue(model.to_path_buf(), false);
        true
    }

    fn enqueue(&self, model: PathBuf, force: bool) {
        let label = model.display().to_string();
        self.scheduler.enqueue(label, move |ctx: &mut ImportContext<H>| {
            ctx.process_model(&model, force).map(|_| ())
        });
    }

    /// Resets the model to `Unprocessed` now and queues a full replay.
    pub fn force_reprocess(&mut self, model: impl AsRef<Path>) -> Result<()> {
        let model = model.as_ref();
        ImportStateMachine::reset(&mut self.context.host, model)?;
        info!(model = %model.display(), "forced reprocess");
        self.enqueue(model.to_path_buf(), true);
        Ok(())
    }

    /// Idle-tick entry point.
    pub fn tick(&mut self) -> TickReport {
        self.scheduler.tick(&mut self.context)
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Ticks until the queue is empty, feeding host re-import events back as import events.
    /// Returns the number of ticks that ran work.
    pub fn run_until_idle<F>(&mut self, max_ticks: usize, mut import_events: F) -> usize
    where
        F: FnMut(&mut H) -> Vec<PathBuf>,
    {
        let mut ticks = 0;
        while ticks < max_ticks {
            for model in import_events(&mut self.context.host) {
                self.on_model_imported(model);
            }
            if !self.has_pending() {
                break;
            }
            let report = self.tick();
            if report.deferred_busy {
                debug!("host busy; drain deferred");
                break;
            }
            ticks += 1;
        }
        ticks
    }

    pub fn take_reports(&mut self) -> Vec<CycleReport> {
        std::mem::take(&mut self.context.reports)
    }

    pub fn record(&self, model: impl AsRef<Path>) -> Result<ImportRecord> {
        ImportRecord::read(&self.context.host, model.as_ref())
    }

    /// Classifies a texture folder the same way an import cycle does.
    pub fn classify_folder(&self, folder: impl AsRef<Path>) -> Result<TextureSearchResult> {
        let folder = folder.as_ref();
        if !self.context.host.folder_exists(folder) {
            return Err(crate::Error::Config(format!(
                "texture folder not found: {}",
                folder.display()
            )));
        }
        self.context.scan(folder)
    }

    /// Scans `folder` and resolves it with explicit per-role picks.
    pub fn resolve_manual(
        &self,
        folder: impl AsRef<Path>,
        picks: ManualSelection,
    ) -> Result<Assignment> {
        let search = self.classify_folder(folder)?;
        Ok(resolve(&search, &SelectionPolicy::ManualOverride(picks)))
    }

    /// Builds the model's own material (`<stem>_mat`) from a manually resolved assignment.
    pub fn apply_manual(
        &mut self,
        model: impl AsRef<Path>,
        assignment: &Assignment,
    ) -> Result<MaterialDescription> {
        let model = model.as_ref();
        let folder = self.context.settings.texture_folder(model);
        self.context.check_configuration(&folder)?;
        self.context
            .host
            .ensure_folder(&self.context.settings.material_folder(model))?;

        let prepared = self.context.prepare(model, &folder, assignment)?;
        let stem = model_stem(model);
        let path = self.context.material_path(model, &stem);
        let (material, _) = self
            .context
            .upsert_material(&path, &stem, &prepared.textures)?;
        info!(model = %model.display(), material = %path.display(), "applied manual assignment");
        Ok(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_host::FsHost;
    use crate::host::{AssetStore, CommitKind};
    use crate::resolver::RolePick;
    use std::fs;

    struct Fixture {
        _tmp: tempfile::TempDir,
        model: PathBuf,
        textures: PathBuf,
    }

    fn write_gray(path: &Path, w: u32, h: u32, value: u8) {
        image::RgbaImage::from_pixel(w, h, image::Rgba([value, value, value, 255]))
            .save(path)
            .unwrap();
    }

    fn fixture(files: &[(&str, u8)]) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let model = tmp.path().join("wood.fbx");
        fs::write(&model, b"fbx").unwrap();
        let textures = tmp.path().join("wood.fbm");
        fs::create_dir_all(&textures).unwrap();
        for (name, value) in files {
            write_gray(&textures.join(name), 4, 4, *value);
        }
        Fixture {
            _tmp: tmp,
            model,
            textures,
        }
    }

    fn wood_set() -> Fixture {
        fixture(&[
            ("wood_basecolor.png", 180),
            ("wood_normal.png", 128),
            ("wood_metal.png", 200),
            ("wood_rough.png", 60),
        ])
    }

    fn orchestrator() -> PipelineOrchestrator<FsHost> {
        PipelineOrchestrator::new(FsHost::new(), ImportSettings::default())
    }

    fn settle(o: &mut PipelineOrchestrator<FsHost>) {
        o.run_until_idle(16, |h| h.take_import_events());
    }

    fn packed_pixel(f: &Fixture) -> [u8; 4] {
        let img = image::open(f.textures.join("wood_MetallicSmoothness.png"))
            .unwrap()
            .to_rgba8();
        img.get_pixel(0, 0).0
    }

    #[test]
    fn first_import_binds_and_reimports_once() {
        let f = wood_set();
        let mut o = orchestrator();

        assert!(o.on_model_imported(&f.model));
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Unprocessed);

        let tick = o.tick();
        assert_eq!((tick.executed, tick.failed), (1, 0));

        let reports = o.take_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].plan, CyclePlan::FullBind);
        assert!(reports[0].unresolved.iter().all(|r| *r == TextureRole::Smoothness));

        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::InitialBound);
        assert_eq!(o.host().commit_count(&f.model, CommitKind::Full), 1);
        assert_eq!(packed_pixel(&f), [200, 200, 200, 255 - 60]);

        let record = o.record(&f.model).unwrap();
        let material_path = record.remap.get("wood").unwrap();
        let material = o.host().load_material(material_path).unwrap().unwrap();
        assert_eq!(material.name, "wood_mat");
        assert_eq!(
            material.texture("_MainTex"),
            Some(f.textures.join("wood_basecolor.png").as_path())
        );
        assert_eq!(
            material.texture("_MetallicGlossMap"),
            Some(f.textures.join("wood_MetallicSmoothness.png").as_path())
        );

        let normal = o
            .host()
            .texture_settings(&f.textures.join("wood_normal.png"))
            .unwrap();
        assert_eq!(normal.kind, TextureKind::NormalMap);
        assert!(!normal.srgb);
    }

    #[test]
    fn reimport_after_bind_settles_without_another_full_commit() {
        let f = wood_set();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        settle(&mut o);

        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Bound);
        assert_eq!(o.host().commit_count(&f.model, CommitKind::Full), 1);
        let commits_after_settle = o.host().commits().len();

        // Unchanged sources: further import events write nothing at all.
        for _ in 0..3 {
            o.on_model_imported(&f.model);
            settle(&mut o);
        }
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Bound);
        assert_eq!(o.host().commits().len(), commits_after_settle);
    }

    #[test]
    fn changed_roughness_updates_in_place() {
        let f = wood_set();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        settle(&mut o);
        o.take_reports();

        write_gray(&f.textures.join("wood_rough.png"), 4, 4, 10);
        o.on_model_imported(&f.model);
        settle(&mut o);

        let reports = o.take_reports();
        assert_eq!(reports[0].plan, CyclePlan::Refresh);
        assert_eq!(reports[0].transition.to, ProcessingState::UpdateOnly);
        assert_eq!(reports[0].transition.commit, Some(CommitKind::Light));
        assert_eq!(packed_pixel(&f), [200, 200, 200, 245]);
        assert_eq!(o.host().commit_count(&f.model, CommitKind::Full), 1);
    }

    #[test]
    fn duplicate_events_in_one_drain_stay_idempotent() {
        let f = wood_set();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        o.on_model_imported(&f.model);
        assert_eq!(o.tick().executed, 2);

        assert_eq!(o.host().commit_count(&f.model, CommitKind::Full), 1);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Bound);
    }

    #[test]
    fn metal_only_folder_is_fully_smooth() {
        let f = fixture(&[("wood_metal.png", 77)]);
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        o.tick();
        assert_eq!(packed_pixel(&f), [77, 77, 77, 255]);
    }

    #[test]
    fn no_grayscale_sources_binds_no_packed_map() {
        let f = fixture(&[("wood_basecolor.png", 1)]);
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        o.tick();

        let reports = o.take_reports();
        assert_eq!(reports[0].metallic_gloss, None);
        assert!(!f.textures.join("wood_MetallicSmoothness.png").exists());
    }

    #[test]
    fn missing_texture_folder_leaves_state_unprocessed() {
        let f = wood_set();
        fs::remove_dir_all(&f.textures).unwrap();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);

        let tick = o.tick();
        assert_eq!(tick.failed, 1);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Unprocessed);
        assert!(o.host().commits().is_empty());
    }

    #[test]
    fn unavailable_shader_is_a_configuration_error() {
        let f = wood_set();
        let host = FsHost::new().with_shaders(["Standard"]);
        let settings = ImportSettings {
            shader_pipeline: crate::material::ShaderPipeline::Hdrp,
            ..Default::default()
        };
        let mut o = PipelineOrchestrator::new(host, settings);
        o.on_model_imported(&f.model);
        assert_eq!(o.tick().failed, 1);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Unprocessed);
    }

    #[test]
    fn rejected_remap_does_not_advance_state() {
        let f = wood_set();
        let mut o = orchestrator();
        o.host_mut().set_reject_remaps(true);
        o.on_model_imported(&f.model);
        assert_eq!(o.tick().failed, 1);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Unprocessed);

        // Retried from scratch on the next event.
        o.host_mut().set_reject_remaps(false);
        o.on_model_imported(&f.model);
        settle(&mut o);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Bound);
        assert_eq!(o.host().commit_count(&f.model, CommitKind::Full), 1);
    }

    #[test]
    fn busy_host_holds_work() {
        let f = wood_set();
        let mut o = orchestrator();
        o.host_mut().set_busy(true);
        o.on_model_imported(&f.model);
        assert!(o.tick().deferred_busy);
        assert!(o.has_pending());
        assert!(o.host().commits().is_empty());

        o.host_mut().set_busy(false);
        assert_eq!(o.tick().executed, 1);
    }

    #[test]
    fn force_resets_state_before_next_tick() {
        let f = wood_set();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        settle(&mut o);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Bound);

        o.force_reprocess(&f.model).unwrap();
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Unprocessed);

        o.tick();
        let reports = o.take_reports();
        assert_eq!(reports.last().unwrap().plan, CyclePlan::FullBind);
        assert_eq!(o.host().commit_count(&f.model, CommitKind::Full), 2);
        settle(&mut o);
        assert_eq!(o.record(&f.model).unwrap().state, ProcessingState::Bound);
    }

    #[test]
    fn auto_import_disabled_ignores_events() {
        let f = wood_set();
        let settings = ImportSettings {
            auto_import_enabled: false,
            ..Default::default()
        };
        let o = PipelineOrchestrator::new(FsHost::new(), settings);
        assert!(!o.on_model_imported(&f.model));
        assert!(!o.on_model_imported(f.textures.join("wood_metal.png")));
        assert!(!o.has_pending());
    }

    #[test]
    fn deleted_model_is_a_no_op() {
        let f = wood_set();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        fs::remove_file(&f.model).unwrap();
        let tick = o.tick();
        assert_eq!((tick.executed, tick.failed), (1, 0));
        assert!(o.take_reports().is_empty());
    }

    #[test]
    fn manual_resolution_picks_and_clears() {
        let f = fixture(&[("wood_metal_a.png", 10), ("wood_metal_b.png", 20), ("wood_rough.png", 0)]);
        let mut o = orchestrator();

        let auto = o.resolve_manual(&f.textures, ManualSelection::new()).unwrap();
        assert!(auto.metallic.is_unresolved());

        let mut picks = ManualSelection::new();
        picks.insert(TextureRole::Metallic, RolePick::from_index(1));
        let assignment = o.resolve_manual(&f.textures, picks).unwrap();
        assert_eq!(
            assignment.texture(TextureRole::Metallic).map(|t| t.name.as_str()),
            Some("wood_metal_b.png")
        );

        let material = o.apply_manual(&f.model, &assignment).unwrap();
        assert_eq!(material.name, "wood_mat");
        assert_eq!(packed_pixel(&f), [20, 20, 20, 255]);

        let mut clear = ManualSelection::new();
        clear.insert(TextureRole::Roughness, RolePick::None);
        let cleared = o.resolve_manual(&f.textures, clear).unwrap();
        assert!(cleared.texture(TextureRole::Roughness).is_none());
        assert!(!cleared.roughness.is_unresolved());
    }

    #[test]
    fn manual_apply_after_import_keeps_packed_map() {
        let f = wood_set();
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        settle(&mut o);
        assert_eq!(packed_pixel(&f), [200, 200, 200, 195]);

        let search = o.classify_folder(&f.textures).unwrap();
        assert_eq!(search.candidates(TextureRole::Metallic).len(), 1);
        assert!(search
            .all()
            .iter()
            .all(|t| t.name != "wood_MetallicSmoothness.png"));

        let assignment = o.resolve_manual(&f.textures, ManualSelection::new()).unwrap();
        assert_eq!(
            assignment.texture(TextureRole::Metallic).map(|t| t.name.as_str()),
            Some("wood_metal.png")
        );

        let mut picks = ManualSelection::new();
        picks.insert(TextureRole::Metallic, RolePick::from_index(0));
        let picked = o.resolve_manual(&f.textures, picks).unwrap();
        assert_eq!(picked, assignment);

        o.apply_manual(&f.model, &assignment).unwrap();
        assert_eq!(packed_pixel(&f), [200, 200, 200, 195]);
    }

    #[test]
    fn mismatched_sources_fall_back_to_metallic_only() {
        let f = fixture(&[("wood_metal.png", 90)]);
        write_gray(&f.textures.join("wood_rough.png"), 2, 2, 40);
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        assert_eq!(o.tick().failed, 0);
        assert_eq!(packed_pixel(&f), [90, 90, 90, 255]);
    }

    #[test]
    fn existing_combined_map_is_bound_as_is() {
        let f = fixture(&[("wood_metallic_smoothness.png", 50), ("wood_basecolor.png", 1)]);
        let mut o = orchestrator();
        o.on_model_imported(&f.model);
        o.tick();
        let reports = o.take_reports();
        assert_eq!(
            reports[0].metallic_gloss,
            Some(f.textures.join("wood_metallic_smoothness.png"))
        );
        assert!(!f.textures.join("wood_MetallicSmoothness.png").exists());
    }

    #[test]
    fn multiple_internal_materials_are_all_bound() {
        let f = wood_set();
        let mut o = orchestrator();
        o.host_mut()
            .declare_materials(&f.model, ["Hull", "Deck"])
            .unwrap();
        o.on_model_imported(&f.model);
        o.tick();

        let record = o.record(&f.model).unwrap();
        assert_eq!(record.remap.len(), 2);
        assert!(record.remap["Hull"].ends_with("Materials/Hull_mat.mat"));
        assert!(record.remap["Deck"].ends_with("Materials/Deck_mat.mat"));
    }
}
