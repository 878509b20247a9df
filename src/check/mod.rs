//! Rule evaluation, aggregation and status derivation.

pub mod aggregate;
pub mod evaluate;
pub mod status;

pub use aggregate::{
    aggregate, run_check, AggregatedResults, CheckRun, CheckSummary, ResultsStore, SkippedSpec,
    SpecOutcome, SpecSummary,
};
pub use evaluate::{evaluate, EvaluationResult};
pub use status::{derive_status, status_for_fail_count, FAIL_THRESHOLD};
