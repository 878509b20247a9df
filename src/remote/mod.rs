//! Network collaborators: IDS portal, text generation and issue tracker.

pub mod generator;
pub mod portal;
pub mod tracker;

pub use generator::{json_payload, GenerationRequest, OpenAiClient, TextGenerator};
pub use portal::{ids_url, PortalClient};
pub use tracker::{
    bcf_document, bcf_from_generated, draft_issue, sanitize_labels, BcfIssue, GeneratedIssue,
    HttpTracker, IssueContext, IssueTracker, TrackerRequest, TrackerResponse,
};
