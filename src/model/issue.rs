use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A user-filed note attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: String,
    pub element_id: String,
    pub title: String,
    pub description: String,
    pub created_at: String,
}

/// Append-only list of issues for the current session.
#[derive(Debug, Default)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files an issue against the selected element.
    ///
    /// Returns `None` without touching the log when nothing is selected.
    pub fn create(
        &mut self,
        selected: Option<&str>,
        title: &str,
        description: &str,
    ) -> Option<&Issue> {
        let Some(element_id) = selected else {
            tracing::warn!("issue requested with no element selected");
            return None;
        };

        let issue = Issue {
            id: format!("ISSUE-{}", self.issues.len() + 1),
            element_id: element_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: now_rfc3339(),
        };
        tracing::info!(id = %issue.id, element = %issue.element_id, "Issue created");
        self.issues.push(issue);
        self.issues.last()
    }

    /// Issues, most recent first.
    pub fn newest_first(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_are_sequential_and_listing_is_newest_first() {
        let mut log = IssueLog::new();
        log.create(Some("W1"), "Missing fire rating", "add FireRating");
        log.create(Some("D1"), "Door", "check");

        let ids: Vec<&str> = log.newest_first().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["ISSUE-2", "ISSUE-1"]);
        assert!(!log.newest_first().next().unwrap().created_at.is_empty());
    }

    #[test]
    fn no_selection_creates_nothing() {
        let mut log = IssueLog::new();
        assert!(log.create(None, "t", "d").is_none());
        assert!(log.is_empty());
    }
}
