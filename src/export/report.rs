use crate::check::{derive_status, AggregatedResults, CheckRun, SkippedSpec};
use crate::model::issue::now_rfc3339;
use crate::model::{Element, Scalar, Status};
use crate::parser::LoadedModel;
use serde::Serialize;
use std::collections::BTreeMap;

/// Element row of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub status: Status,
    pub props: BTreeMap<String, Scalar>,
}

impl From<Element> for ElementRecord {
    fn from(element: Element) -> Self {
        Self {
            id: element.id,
            element_type: element.element_type,
            status: element.status,
            props: element.props,
        }
    }
}

/// Everything one check run produced for a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub project: String,
    pub model: String,
    pub generated_at: String,
    pub results: AggregatedResults,
    pub skipped: Vec<SkippedSpec>,
    pub elements: Vec<ElementRecord>,
}

impl ValidationReport {
    /// Collects every element with a GUID, with its status under `run`.
    #[must_use]
    pub fn new(model: &LoadedModel, run: &CheckRun) -> Self {
        let elements = model
            .elements()
            .filter_map(|e| model.project_element(&e.guid))
            .map(|element| {
                let status = derive_status(&element.guid, Some(&run.results));
                ElementRecord::from(element.with_status(status))
            })
            .collect();

        Self {
            project: model.project_name.clone(),
            model: model.model_id.clone(),
            generated_at: now_rfc3339(),
            results: run.results.clone(),
            skipped: run.skipped.clone(),
            elements,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::check::run_check;
    use crate::ids::parse_document;
    use crate::ids::store::tests::SAMPLE_IDS;
    use crate::model::CheckContext;
    use crate::parser::ifc::tests::SAMPLE_IFC;
    use crate::parser::parse_ifc_str;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_report() -> ValidationReport {
        let model = parse_ifc_str("demo", SAMPLE_IFC).unwrap();
        let run = run_check(&parse_document(SAMPLE_IDS), CheckContext::new(&model, &model));
        ValidationReport::new(&model, &run)
    }

    #[test]
    fn report_lists_elements_with_derived_status() {
        let report = sample_report();
        assert_eq!(report.project, "Demo Project");
        let statuses: Vec<(&str, Status)> = report
            .elements
            .iter()
            .map(|e| (e.id.as_str(), e.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("2O2Fr$t4X7Zf8NOew3FLOH", Status::Pass),
                ("1hOSvn6df7F8_7GcBWlRGQ", Status::Warn),
                ("3cUkl32yn9qRSPvBJVyWYp", Status::Warn),
            ]
        );
    }
}
