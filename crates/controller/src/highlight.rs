use std::collections::BTreeMap;
use vrctl_common::EntityId;
use vrctl_scene::Material;

/// Highlight state of one controller element.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HighlightState {
    #[default]
    Normal,
    /// Tinted; `saved` is the material as it was before the first highlight.
    Highlighted { saved: Material },
}

static NORMAL: HighlightState = HighlightState::Normal;

/// Per-element highlight state machine.
///
/// Elements are referenced, not owned. Only highlighted elements have an
/// entry; everything else is implicitly [`HighlightState::Normal`].
#[derive(Debug, Clone, Default)]
pub struct HighlightTable {
    entries: BTreeMap<EntityId, HighlightState>,
}

impl HighlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, element: EntityId) -> &HighlightState {
        self.entries.get(&element).unwrap_or(&NORMAL)
    }

    pub fn is_highlighted(&self, element: EntityId) -> bool {
        matches!(self.state(element), HighlightState::Highlighted { .. })
    }

    /// Normal -> Highlighted. Returns false and keeps the first snapshot
    /// when the element is already highlighted.
    pub fn highlight(&mut self, element: EntityId, saved: Material) -> bool {
        if self.is_highlighted(element) {
            return false;
        }
        self.entries
            .insert(element, HighlightState::Highlighted { saved });
        true
    }

    /// Highlighted -> Normal, handing back the saved material.
    pub fn restore(&mut self, element: EntityId) -> Option<Material> {
        match self.entries.remove(&element)? {
            HighlightState::Highlighted { saved } => Some(saved),
            HighlightState::Normal => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn highlighted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.keys().copied()
    }
}
