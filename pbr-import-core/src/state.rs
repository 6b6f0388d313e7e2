//! Per-model processing state and the transitions between mutation cycles.
//!
//! The tag stored on the model's import record is the only persisted signal that stops a
//! full re-import from being issued again. It is read before any mutation:
//!
//! | from | plan | outcome | to | commit |
//! |------|------|---------|----|--------|
//! | Unprocessed | FullBind | bound | InitialBound | Full |
//! | InitialBound | Refresh | unchanged | Bound | Light |
//! | any bound state | Refresh | changed | UpdateOnly | Light |
//! | UpdateOnly | Refresh | unchanged | Bound | Light |
//! | Bound | Refresh | unchanged | Bound | none |

use crate::host::{CommitKind, ModelImporter};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Unprocessed,
    /// Bindings written, full re-import issued
    InitialBound,
    /// Last cycle updated bound materials in place
    UpdateOnly,
    Bound,
}

impl ProcessingState {
    pub fn tag(&self) -> &'static str {
        match self {
            ProcessingState::Unprocessed => "unprocessed",
            ProcessingState::InitialBound => "initial_bound",
            ProcessingState::UpdateOnly => "update_only",
            ProcessingState::Bound => "bound",
        }
    }

    /// Absent or unrecognized tags read as `Unprocessed`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("initial_bound") => ProcessingState::InitialBound,
            Some("update_only") => ProcessingState::UpdateOnly,
            Some("bound") => ProcessingState::Bound,
            _ => ProcessingState::Unprocessed,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, ProcessingState::Unprocessed)
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which mutation path a cycle takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePlan {
    /// Bind every internal material and issue one full re-import
    FullBind,
    /// Keep bindings; update bound materials in place when their content changed
    Refresh,
}

/// State change to persist after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ProcessingState,
    pub to: ProcessingState,
    /// `None` means nothing is written
    pub commit: Option<CommitKind>,
}

/// Snapshot of a model's import record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportRecord {
    pub state: ProcessingState,
    pub remap: BTreeMap<String, PathBuf>,
}

impl ImportRecord {
    pub fn read<M: ModelImporter + ?Sized>(importer: &M, model: &Path) -> Result<Self> {
        let tag = importer.user_tag(model)?;
        Ok(Self {
            state: ProcessingState::from_tag(tag.as_deref()),
            remap: importer.remap_table(model)?,
        })
    }
}

/// Decides cycle paths and transitions. Holds no state of its own; the record is the state.
pub struct ImportStateMachine;

impl ImportStateMachine {
    pub fn plan(state: ProcessingState, force: bool) -> CyclePlan {
        if force || state == ProcessingState::Unprocessed {
            CyclePlan::FullBind
        } else {
            CyclePlan::Refresh
        }
    }

    /// Transition after a completed full bind.
    pub fn after_full_bind(from: ProcessingState) -> Transition {
        Transition {
            from,
            to: ProcessingState::InitialBound,
            commit: Some(CommitKind::Full),
        }
    }

    /// Transition after a refresh cycle. Never yields a full commit.
    pub fn after_refresh(from: ProcessingState, changed: bool) -> Transition {
        let to = if changed {
            ProcessingState::UpdateOnly
        } else {
            ProcessingState::Bound
        };
        let commit = if changed || from != to {
            Some(CommitKind::Light)
        } else {
            None
        };
        Transition { from, to, commit }
    }

    /// Writes the tag and flushes it with the transition's commit kind.
    pub fn apply<M: ModelImporter + ?Sized>(
        importer: &mut M,
        model: &Path,
        transition: &Transition,
    ) -> Result<()> {
        let Some(kind) = transition.commit else {
            tracing::debug!(model = %model.display(), state = %transition.to, "state unchanged");
            return Ok(());
        };
        importer.set_user_tag(model, transition.to.tag())?;
        importer.commit(model, kind)?;
        tracing::info!(
            model = %model.display(),
            from = %transition.from,
            to = %transition.to,
            ?kind,
            "import state advanced"
        );
        Ok(())
    }

    /// Resets the persisted tag so the next cycle replays the full bind.
    pub fn reset<M: ModelImporter + ?Sized>(importer: &mut M, model: &Path) -> Result<()> {
        importer.set_user_tag(model, ProcessingState::Unprocessed.tag())?;
        importer.commit(model, CommitKind::Light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_and_unknown_tags_read_unprocessed() {
        for s in [
            ProcessingState::Unprocessed,
            ProcessingState::InitialBound,
            ProcessingState::UpdateOnly,
            ProcessingState::Bound,
        ] {
            assert_eq!(ProcessingState::from_tag(Some(s.tag())), s);
        }
        assert_eq!(ProcessingState::from_tag(None), ProcessingState::Unprocessed);
        assert_eq!(
            ProcessingState::from_tag(Some("BTU_PBR_IMPORTED")),
            ProcessingState::Unprocessed
        );
    }

    #[test]
    fn plan_selects_exactly_one_path() {
        assert_eq!(
            ImportStateMachine::plan(ProcessingState::Unprocessed, false),
            CyclePlan::FullBind
        );
        for s in [
            ProcessingState::InitialBound,
            ProcessingState::UpdateOnly,
            ProcessingState::Bound,
        ] {
            assert_eq!(ImportStateMachine::plan(s, false), CyclePlan::Refresh);
            assert_eq!(ImportStateMachine::plan(s, true), CyclePlan::FullBind);
        }
    }

    #[test]
    fn refresh_never_requests_full_commit() {
        let states = [
            ProcessingState::InitialBound,
            ProcessingState::UpdateOnly,
            ProcessingState::Bound,
        ];
        for from in states {
            for changed in [false, true] {
                let t = ImportStateMachine::after_refresh(from, changed);
                assert_ne!(t.commit, Some(CommitKind::Full));
            }
        }

        let settled = ImportStateMachine::after_refresh(ProcessingState::Bound, false);
        assert_eq!(settled.to, ProcessingState::Bound);
        assert_eq!(settled.commit, None);

        let first = ImportStateMachine::after_refresh(ProcessingState::InitialBound, false);
        assert_eq!(first.to, ProcessingState::Bound);
        assert_eq!(first.commit, Some(CommitKind::Light));

        let touched = ImportStateMachine::after_refresh(ProcessingState::Bound, true);
        assert_eq!(touched.to, ProcessingState::UpdateOnly);
        assert_eq!(touched.commit, Some(CommitKind::Light));
    }

    #[test]
    fn full_bind_goes_to_initial_bound_with_full_commit() {
        let t = ImportStateMachine::after_full_bind(ProcessingState::Unprocessed);
        assert_eq!(t.to, ProcessingState::InitialBound);
        assert_eq!(t.commit, Some(CommitKind::Full));
    }
}
