use crate::error::EvalError;
use crate::ids::Specification;
use crate::model::{CheckContext, ModelIdMap};
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of one specification, projected to stable GUIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    pub pass_guids: BTreeSet<String>,
    pub fail_guids: BTreeSet<String>,
}

/// Partitions the applicable elements of the model into pass and fail sets.
///
/// An element passes when every required requirement of `spec` is present
/// with a non-empty value. Elements the index has no GUID for are dropped.
///
/// # Errors
///
/// [`EvalError::MalformedFilter`] when the applicability filter is unusable,
/// [`EvalError::Lookup`] when the model cannot describe one of its elements.
pub fn evaluate(spec: &Specification, ctx: CheckContext<'_>) -> Result<EvaluationResult, EvalError> {
    spec.applicability.validate()?;

    let mut pass = ModelIdMap::new();
    let mut fail = ModelIdMap::new();

    for (model, ids) in ctx.index.all_elements() {
        for local_id in ids {
            let lookup_error = || EvalError::Lookup {
                model: model.clone(),
                local_id,
            };

            let entity = ctx
                .index
                .entity_type(&model, local_id)
                .ok_or_else(lookup_error)?;
            if !spec.applicability.matches(&entity) {
                continue;
            }

            let props = ctx
                .properties
                .property_tree(&model, local_id)
                .ok_or_else(lookup_error)?
                .flatten();

            let target = if spec.is_compliant(&props) {
                &mut pass
            } else {
                &mut fail
            };
            target.entry(model.clone()).or_default().insert(local_id);
        }
    }

    let result = EvaluationResult {
        pass_guids: ctx.index.local_ids_to_guids(&pass).into_iter().collect(),
        fail_guids: ctx.index.local_ids_to_guids(&fail).into_iter().collect(),
    };

    tracing::debug!(
        spec = %spec.name,
        passed = result.pass_guids.len(),
        failed = result.fail_guids.len(),
        "Evaluated specification"
    );

    Ok(result)
}
