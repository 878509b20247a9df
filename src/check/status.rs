use super::aggregate::AggregatedResults;
use crate::model::Status;

/// Failed specifications at which an element counts as failing outright.
pub const FAIL_THRESHOLD: usize = 3;

#[must_use]
pub const fn status_for_fail_count(fail_count: usize) -> Status {
    if fail_count >= FAIL_THRESHOLD {
        Status::Fail
    } else if fail_count > 0 {
        Status::Warn
    } else {
        Status::Pass
    }
}

/// Status of `guid` under the given results; `Unknown` when no run has
/// completed yet.
#[must_use]
pub fn derive_status(guid: &str, results: Option<&AggregatedResults>) -> Status {
    results.map_or(Status::Unknown, |r| status_for_fail_count(r.fail_count(guid)))
}
