//! Boundary traits for the loaded model.
//!
//! The checker never talks to a viewer or loader directly. Whatever holds the
//! model implements these traits and is handed to the core through a
//! [`CheckContext`].

use super::property::PropertyNode;
use crate::highlight::HighlightStyle;
use std::collections::{BTreeMap, BTreeSet};

/// Session-scoped element ids grouped by model id.
pub type ModelIdMap = BTreeMap<String, BTreeSet<u64>>;

/// Maps between stable GUIDs and session-local element ids.
pub trait ElementIndex {
    /// Every element of every loaded model.
    fn all_elements(&self) -> ModelIdMap;

    /// Declared IFC entity type (e.g. `IFCWALL`) of a local element.
    fn entity_type(&self, model: &str, local_id: u64) -> Option<String>;

    /// Unknown GUIDs are omitted from the result.
    fn guids_to_local_ids(&self, guids: &[String]) -> ModelIdMap;

    /// Local ids without a GUID record are omitted from the result.
    fn local_ids_to_guids(&self, ids: &ModelIdMap) -> Vec<String>;
}

/// Provides the nested property tree of a local element.
pub trait PropertySource {
    fn property_tree(&self, model: &str, local_id: u64) -> Option<PropertyNode>;
}

/// Applies a visual style to a set of local elements.
pub trait Highlighter {
    fn apply_highlight(&mut self, style: HighlightStyle, ids: &ModelIdMap);
}

/// Explicit handle to the model collaborators, threaded through the core.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub index: &'a dyn ElementIndex,
    pub properties: &'a dyn PropertySource,
}

impl<'a> CheckContext<'a> {
    #[must_use]
    pub fn new(index: &'a dyn ElementIndex, properties: &'a dyn PropertySource) -> Self {
        Self { index, properties }
    }
}

/// Total number of local ids across all models.
#[must_use]
pub fn count_ids(ids: &ModelIdMap) -> usize {
    ids.values().map(BTreeSet::len).sum()
}
