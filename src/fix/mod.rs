//! Suggestions and fixes for non-passing elements.

pub mod local;
pub mod recommend;
pub mod retry;

pub use local::{apply_suggestion, local_status, manual_fix, LinePrompter, ManualFix, Prompter};
pub use recommend::{
    explain, mock_explain, parse_suggestions, request_recommendations, rule_based_recommendations,
    validation_context, Recommendation, Suggestion, SuggestionOption,
};
pub use retry::{retry_until_valid, RetryPolicy};
