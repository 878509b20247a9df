use super::evaluate::{evaluate, EvaluationResult};
use crate::ids::Specification;
use crate::model::CheckContext;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub guids: Vec<String>,
}

impl SpecSummary {
    #[must_use]
    pub fn contains(&self, guid: &str) -> bool {
        self.guids.iter().any(|g| g == guid)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub total_specs: usize,
    pub passed_specs: usize,
    pub failed_specs: usize,
    /// Sum over specifications, not a distinct element count.
    pub total_passed_elements: usize,
    pub total_failed_elements: usize,
}

/// Merged outcome of one check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedResults {
    pub passed: Vec<SpecSummary>,
    pub failed: Vec<SpecSummary>,
    pub summary: CheckSummary,
    /// Every passing GUID of every specification; duplicates kept.
    pub all_pass: Vec<String>,
    /// Every failing GUID of every specification; duplicates kept.
    pub all_fail: Vec<String>,
}

impl AggregatedResults {
    /// Number of failed specification entries listing `guid`.
    #[must_use]
    pub fn fail_count(&self, guid: &str) -> usize {
        self.failed.iter().filter(|s| s.contains(guid)).count()
    }

    pub fn failed_for<'a>(&'a self, guid: &'a str) -> impl Iterator<Item = &'a SpecSummary> {
        self.failed.iter().filter(move |s| s.contains(guid))
    }

    pub fn passed_for<'a>(&'a self, guid: &'a str) -> impl Iterator<Item = &'a SpecSummary> {
        self.passed.iter().filter(move |s| s.contains(guid))
    }

    /// Distinct failing GUIDs, sorted.
    #[must_use]
    pub fn failing_guids(&self) -> BTreeSet<&str> {
        self.all_fail.iter().map(String::as_str).collect()
    }
}

/// Builds the aggregated view of per-specification results.
///
/// `results[i]` belongs to `specs[i]`; surplus entries on either side are
/// ignored. Inputs are not modified.
#[must_use]
pub fn aggregate(results: &[EvaluationResult], specs: &[Specification]) -> AggregatedResults {
    let mut out = AggregatedResults::default();

    for (result, spec) in results.iter().zip(specs) {
        out.summary.total_specs += 1;

        if !result.pass_guids.is_empty() {
            out.passed.push(summary_entry(spec, &result.pass_guids));
            out.summary.passed_specs += 1;
            out.summary.total_passed_elements += result.pass_guids.len();
            out.all_pass.extend(result.pass_guids.iter().cloned());
        }

        if !result.fail_guids.is_empty() {
            out.failed.push(summary_entry(spec, &result.fail_guids));
            out.summary.failed_specs += 1;
            out.summary.total_failed_elements += result.fail_guids.len();
            out.all_fail.extend(result.fail_guids.iter().cloned());
        }
    }

    out
}

fn summary_entry(spec: &Specification, guids: &BTreeSet<String>) -> SpecSummary {
    SpecSummary {
        name: spec.name.clone(),
        description: spec.description.clone(),
        guids: guids.iter().cloned().collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSpec {
    pub name: String,
    pub reason: String,
}

/// What a run did with one specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecOutcome {
    Evaluated { passed: usize, failed: usize },
    Skipped { reason: String },
}

/// Aggregated results of a run plus the specifications it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckRun {
    pub results: AggregatedResults,
    pub skipped: Vec<SkippedSpec>,
    /// One entry per input specification, in input order.
    #[serde(skip)]
    pub outcomes: Vec<SpecOutcome>,
}

/// Evaluates every specification in order and aggregates the outcome.
///
/// A specification whose evaluation fails is logged and left out of the
/// results; the rest of the run continues.
#[must_use]
pub fn run_check(specs: &[Specification], ctx: CheckContext<'_>) -> CheckRun {
    let mut evaluated = Vec::with_capacity(specs.len());
    let mut results = Vec::with_capacity(specs.len());
    let mut skipped = Vec::new();
    let mut outcomes = Vec::with_capacity(specs.len());

    for spec in specs {
        match evaluate(spec, ctx) {
            Ok(result) => {
                outcomes.push(SpecOutcome::Evaluated {
                    passed: result.pass_guids.len(),
                    failed: result.fail_guids.len(),
                });
                evaluated.push(spec.clone());
                results.push(result);
            }
            Err(error) => {
                tracing::warn!(spec = %spec.name, %error, "Skipping specification");
                let reason = error.to_string();
                outcomes.push(SpecOutcome::Skipped {
                    reason: reason.clone(),
                });
                skipped.push(SkippedSpec {
                    name: spec.name.clone(),
                    reason,
                });
            }
        }
    }

    let results = aggregate(&results, &evaluated);
    tracing::info!(
        specs = results.summary.total_specs,
        skipped = skipped.len(),
        failed_specs = results.summary.failed_specs,
        "Check run complete"
    );

    CheckRun {
        results,
        skipped,
        outcomes,
    }
}

/// Process-wide holder of the latest [`AggregatedResults`].
///
/// Only [`ResultsStore::publish`] replaces the snapshot, and it does so in a
/// single swap. Readers clone the `Arc` and never block the writer for longer
/// than that clone.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    sender: Arc<watch::Sender<Option<Arc<AggregatedResults>>>>,
}

impl Default for ResultsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsStore {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replaces the current snapshot and notifies subscribers.
    pub fn publish(&self, results: AggregatedResults) -> Arc<AggregatedResults> {
        let snapshot = Arc::new(results);
        self.sender.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Latest snapshot, `None` before the first run completes.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<AggregatedResults>> {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<AggregatedResults>>> {
        self.sender.subscribe()
    }
}
