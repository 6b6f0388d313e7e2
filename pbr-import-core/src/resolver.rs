//! Candidate resolution: turns classified candidate lists into one texture per role.
//!
//! Resolution is pure. The same search result and policy always produce the same
//! [`Assignment`], and the search result is never modified.

use crate::classifier::{TextureHandle, TextureSearchResult};
use crate::image_loading::TextureRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-role candidate index used by [`SelectionPolicy::PriorityIndex`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePriorities {
    pub albedo: usize,
    pub normal: usize,
    pub metallic: usize,
    pub roughness: usize,
    pub smoothness: usize,
}

impl RolePriorities {
    pub fn index(&self, role: TextureRole) -> usize {
        match role {
            TextureRole::Albedo => self.albedo,
            TextureRole::Normal => self.normal,
            TextureRole::Metallic => self.metallic,
            TextureRole::Roughness => self.roughness,
            TextureRole::Smoothness => self.smoothness,
            TextureRole::Unknown => 0,
        }
    }
}

/// An explicit choice for one role in a manual override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePick {
    /// Clear the role even if it would have been picked automatically
    None,
    /// Index into the role's own candidate list
    Candidate(usize),
    /// Index into the union of every scanned texture
    AnyTexture(usize),
}

impl RolePick {
    /// Maps a UI popup index: negative means "None".
    pub fn from_index(index: i64) -> Self {
        if index < 0 {
            RolePick::None
        } else {
            RolePick::Candidate(index as usize)
        }
    }
}

pub type ManualSelection = BTreeMap<TextureRole, RolePick>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Select only when a role has exactly one candidate
    AutoSingle,
    /// Select by configured index, clamped to the first candidate when out of range
    PriorityIndex(RolePriorities),
    /// Explicit picks; roles without a pick resolve as `AutoSingle`
    ManualOverride(ManualSelection),
}

/// Outcome for one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "texture", rename_all = "snake_case")]
pub enum RoleSelection {
    /// Not decided yet: no candidate, or an ambiguous set
    #[default]
    Unresolved,
    /// Explicitly set to none
    Cleared,
    Selected(TextureHandle),
}

impl RoleSelection {
    pub fn texture(&self) -> Option<&TextureHandle> {
        match self {
            RoleSelection::Selected(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, RoleSelection::Unresolved)
    }
}

static UNRESOLVED: RoleSelection = RoleSelection::Unresolved;

/// One selection per role plus every scanned texture for override UIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub albedo: RoleSelection,
    pub normal: RoleSelection,
    pub metallic: RoleSelection,
    pub roughness: RoleSelection,
    pub smoothness: RoleSelection,
    pub all_textures: Vec<TextureHandle>,
}

impl Assignment {
    pub fn get(&self, role: TextureRole) -> &RoleSelection {
        match role {
            TextureRole::Albedo => &self.albedo,
            TextureRole::Normal => &self.normal,
            TextureRole::Metallic => &self.metallic,
            TextureRole::Roughness => &self.roughness,
            TextureRole::Smoothness => &self.smoothness,
            TextureRole::Unknown => &UNRESOLVED,
        }
    }

    /// Replace the selection for a role. Unknown is not assignable and is ignored.
    pub fn set(&mut self, role: TextureRole, selection: RoleSelection) {
        match role {
            TextureRole::Albedo => self.albedo = selection,
            TextureRole::Normal => self.normal = selection,
            TextureRole::Metallic => self.metallic = selection,
            TextureRole::Roughness => self.roughness = selection,
            TextureRole::Smoothness => self.smoothness = selection,
            TextureRole::Unknown => {}
        }
    }

    pub fn texture(&self, role: TextureRole) -> Option<&TextureHandle> {
        self.get(role).texture()
    }

    pub fn unresolved_roles(&self) -> Vec<TextureRole> {
        TextureRole::ASSIGNABLE
            .into_iter()
            .filter(|r| self.get(*r).is_unresolved())
            .collect()
    }
}

fn auto_single(candidates: &[TextureHandle]) -> RoleSelection {
    match candidates {
        [only] => RoleSelection::Selected(only.clone()),
        _ => RoleSelection::Unresolved,
    }
}

fn by_priority(candidates: &[TextureHandle], index: usize) -> RoleSelection {
    candidates
        .get(index)
        .or_else(|| candidates.first())
        .cloned()
        .map(RoleSelection::Selected)
        .unwrap_or_default()
}

fn manual(
    role: TextureRole,
    candidates: &[TextureHandle],
    all: &[TextureHandle],
    pick: Option<&RolePick>,
) -> RoleSelection {
    let (list, index) = match pick {
        None => return auto_single(candidates),
        Some(RolePick::None) => return RoleSelection::Cleared,
        Some(RolePick::Candidate(i)) => (candidates, *i),
        Some(RolePick::AnyTexture(i)) => (all, *i),
    };
    match list.get(index) {
        Some(t) => RoleSelection::Selected(t.clone()),
        None => {
            tracing::warn!(%role, index, available = list.len(), "manual pick out of range");
            RoleSelection::Unresolved
        }
    }
}

/// Resolve one texture per role from `search` under `policy`.
pub fn resolve(search: &TextureSearchResult, policy: &SelectionPolicy) -> Assignment {
    let all = search.all();
    let mut assignment = Assignment::default();

    for role in TextureRole::ASSIGNABLE {
        let candidates = search.candidates(role);
        let selection = match policy {
            SelectionPolicy::AutoSingle => auto_single(candidates),
            SelectionPolicy::PriorityIndex(p) => by_priority(candidates, p.index(role)),
            SelectionPolicy::ManualOverride(picks) => manual(role, candidates, &all, picks.get(&role)),
        };
        assignment.set(role, selection);
    }

    assignment.all_textures = all;
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::settings::KeywordTable;

    fn search(files: &[&str]) -> TextureSearchResult {
        classify(files.iter().copied(), &KeywordTable::default())
    }

    fn picked(a: &Assignment, role: TextureRole) -> Option<&str> {
        a.texture(role).map(|t| t.name.as_str())
    }

    #[test]
    fn auto_single_selects_unique_candidates() {
        let s = search(&["wood_basecolor.png", "wood_normal.png", "wood_metal.png", "wood_rough.png"]);
        let a = resolve(&s, &SelectionPolicy::AutoSingle);

        assert_eq!(picked(&a, TextureRole::Albedo), Some("wood_basecolor.png"));
        assert_eq!(picked(&a, TextureRole::Normal), Some("wood_normal.png"));
        assert_eq!(picked(&a, TextureRole::Metallic), Some("wood_metal.png"));
        assert_eq!(picked(&a, TextureRole::Roughness), Some("wood_rough.png"));
        assert_eq!(a.unresolved_roles(), vec![TextureRole::Smoothness]);
        assert_eq!(a.all_textures.len(), 4);
    }

    #[test]
    fn ambiguous_metallic_then_manual_override() {
        let s = search(&["wood_metal_a.png", "wood_metal_b.png"]);

        let auto = resolve(&s, &SelectionPolicy::AutoSingle);
        assert!(auto.metallic.is_unresolved());

        let mut picks = ManualSelection::new();
        picks.insert(TextureRole::Metallic, RolePick::from_index(1));
        let manual = resolve(&s, &SelectionPolicy::ManualOverride(picks));
        assert_eq!(picked(&manual, TextureRole::Metallic), Some("wood_metal_b.png"));
    }

    #[test]
    fn manual_none_clears_an_automatic_pick() {
        let s = search(&["wood_metal.png", "wood_rough.png"]);
        assert!(resolve(&s, &SelectionPolicy::AutoSingle).metallic.texture().is_some());

        let mut picks = ManualSelection::new();
        picks.insert(TextureRole::Metallic, RolePick::from_index(-1));
        let a = resolve(&s, &SelectionPolicy::ManualOverride(picks));

        assert_eq!(a.metallic, RoleSelection::Cleared);
        // Roles without a pick still resolve automatically.
        assert_eq!(picked(&a, TextureRole::Roughness), Some("wood_rough.png"));
    }

    #[test]
    fn manual_any_texture_and_out_of_range() {
        let s = search(&["wood_basecolor.png", "wood_spec.png"]);
        let mut picks = ManualSelection::new();
        picks.insert(TextureRole::Smoothness, RolePick::AnyTexture(1));
        picks.insert(TextureRole::Normal, RolePick::Candidate(3));
        let a = resolve(&s, &SelectionPolicy::ManualOverride(picks));

        assert_eq!(picked(&a, TextureRole::Smoothness), Some("wood_spec.png"));
        assert!(a.normal.is_unresolved());
    }

    #[test]
    fn priority_index_clamps_to_first() {
        let s = search(&["a_metal.png", "b_metal.png", "c_metal.png"]);
        let p = RolePriorities {
            metallic: 2,
            ..Default::default()
        };
        let a = resolve(&s, &SelectionPolicy::PriorityIndex(p));
        assert_eq!(picked(&a, TextureRole::Metallic), Some("c_metal.png"));

        let p = RolePriorities {
            metallic: 9,
            ..Default::default()
        };
        let a = resolve(&s, &SelectionPolicy::PriorityIndex(p));
        assert_eq!(picked(&a, TextureRole::Metallic), Some("a_metal.png"));
        assert!(a.albedo.is_unresolved());
    }

    #[test]
    fn resolution_is_idempotent_and_pure() {
        let s = search(&["a_metal.png", "b_metal.png", "x_albedo.png"]);
        let before = s.clone();
        let policy = SelectionPolicy::PriorityIndex(RolePriorities::default());

        assert_eq!(resolve(&s, &policy), resolve(&s, &policy));
        assert_eq!(s, before);
    }
}
