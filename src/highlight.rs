//! Translates pass/fail GUID sets into highlight requests on the model.

use crate::model::{count_ids, ElementIndex, Highlighter, ModelIdMap};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightStyle {
    Pass,
    Fail,
    /// Partial compliance. [`apply`] requests it with an empty set until a
    /// partial class exists.
    Warn,
}

impl HighlightStyle {
    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Pass => (0, 200, 0),
            Self::Fail => (220, 0, 0),
            Self::Warn => (230, 200, 0),
        }
    }
}

/// Pass set with every failing GUID removed, deduplicated and sorted.
///
/// An element failing any specification must only be highlighted as failing.
#[must_use]
pub fn disjoint_pass_set(pass: &[String], fail: &[String]) -> Vec<String> {
    let failing: BTreeSet<&str> = fail.iter().map(String::as_str).collect();
    pass.iter()
        .map(String::as_str)
        .filter(|guid| !failing.contains(guid))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Resolves both GUID lists to local ids and highlights them on `model`.
///
/// Every style is requested once, `Warn` with an empty set. Styles are
/// additive; previous highlights are not cleared. Callers pass disjoint lists
/// (see [`disjoint_pass_set`]). GUIDs unknown to the model are ignored.
pub fn apply<M>(model: &mut M, pass_guids: &[String], fail_guids: &[String])
where
    M: ElementIndex + Highlighter + ?Sized,
{
    let pass = model.guids_to_local_ids(pass_guids);
    let fail = model.guids_to_local_ids(fail_guids);

    tracing::debug!(
        pass = count_ids(&pass),
        fail = count_ids(&fail),
        "Applying highlights"
    );

    model.apply_highlight(HighlightStyle::Pass, &pass);
    model.apply_highlight(HighlightStyle::Fail, &fail);
    model.apply_highlight(HighlightStyle::Warn, &ModelIdMap::new());
}
