//! BCF 2.1 issues and submission to an external tracker.

use super::generator::{json_payload, GenerationRequest, TextGenerator};
use crate::error::TrackerError;
use crate::model::issue::now_rfc3339;
use crate::model::Element;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BcfIssue {
    pub markup: Markup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewpoint: Option<Viewpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Markup {
    pub header: Header,
    pub topic: Topic,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub files: Vec<HeaderFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderFile {
    pub filename: String,
    pub date: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub guid: String,
    pub topic_type: String,
    pub topic_status: String,
    pub title: String,
    pub priority: String,
    pub index: u32,
    pub labels: Vec<String>,
    pub creation_date: String,
    pub creation_author: String,
    pub modified_date: String,
    pub modified_author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bim_snippet: Option<BimSnippet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BimSnippet {
    pub snippet_type: String,
    pub reference: String,
    pub reference_schema: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub guid: String,
    pub date: String,
    pub author: String,
    pub comment: String,
    pub topic_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_comment_guid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub guid: String,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub visibility: Visibility,
    pub selection: Vec<ComponentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub default_visibility: bool,
    pub exceptions: Vec<ComponentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub ifc_guid: String,
}

/// Issue fields proposed by the generator; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratedIssue {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic_type: Option<String>,
    pub priority: Option<String>,
    pub labels: Option<Vec<String>>,
    pub comment: Option<String>,
}

pub struct IssueContext<'a> {
    pub project_name: &'a str,
    pub author: &'a str,
    /// Requirement summary appended to the comment.
    pub requirements: &'a str,
}

/// Builds a BCF issue for `element`, filling gaps in `generated` with
/// defaults.
#[must_use]
pub fn bcf_from_generated(element: &Element, generated: GeneratedIssue, ctx: &IssueContext<'_>) -> BcfIssue {
    let now = now_rfc3339();
    let topic_guid = Uuid::new_v4().to_string();
    let target = || ComponentRef {
        ifc_guid: element.guid.clone(),
    };

    let comment = format!(
        "{}\n\nIDS requirements:\n{}",
        generated
            .comment
            .unwrap_or_else(|| "Technical analysis required.".to_string()),
        ctx.requirements
    );

    BcfIssue {
        markup: Markup {
            header: Header {
                files: vec![HeaderFile {
                    filename: format!("{}.ifc", ctx.project_name),
                    date: now.clone(),
                    reference: element.guid.clone(),
                }],
            },
            topic: Topic {
                guid: topic_guid.clone(),
                topic_type: generated.topic_type.unwrap_or_else(|| "Warning".to_string()),
                topic_status: "Open".to_string(),
                title: generated.title.unwrap_or_else(|| {
                    format!("{} {} - Compliance Issue", element.element_type, element.id)
                }),
                priority: generated.priority.unwrap_or_else(|| "Medium".to_string()),
                index: 1,
                labels: generated.labels.unwrap_or_else(|| {
                    vec!["IDS-Compliance".to_string(), "German-Standards".to_string()]
                }),
                creation_date: now.clone(),
                creation_author: ctx.author.to_string(),
                modified_date: now.clone(),
                modified_author: ctx.author.to_string(),
                assigned_to: None,
                description: Some(generated.description.unwrap_or_else(|| {
                    format!(
                        "Element {} requires attention for building standards compliance.",
                        element.id
                    )
                })),
                bim_snippet: Some(BimSnippet {
                    snippet_type: "IfcPropertySet".to_string(),
                    reference: element.guid.clone(),
                    reference_schema: "IFC4".to_string(),
                }),
            },
            comments: vec![Comment {
                guid: Uuid::new_v4().to_string(),
                date: now,
                author: ctx.author.to_string(),
                comment,
                topic_guid,
                reply_to_comment_guid: None,
            }],
        },
        viewpoint: Some(Viewpoint {
            guid: Uuid::new_v4().to_string(),
            components: Components {
                visibility: Visibility {
                    default_visibility: false,
                    exceptions: vec![target()],
                },
                selection: vec![target()],
            },
        }),
    }
}

/// Asks the generator for issue content and builds the BCF issue.
///
/// Returns `None` when generation fails or the reply is not a JSON object.
pub async fn draft_issue(
    generator: &dyn TextGenerator,
    element: &Element,
    validation: &str,
    ctx: &IssueContext<'_>,
) -> Option<BcfIssue> {
    let props = serde_json::to_string(&element.props).unwrap_or_default();
    let request = GenerationRequest {
        system: "You are a BIM expert for German building regulations. Reply with valid JSON only, no other text."
            .to_string(),
        prompt: format!(
            "Create a BCF issue for this element.\n\n\
             Element: {id} ({kind})\nProperties: {props}\nStatus: {status}\n\n\
             IDS requirements:\n{requirements}\n\n{validation}\n\n\
             Reply with this JSON object:\n\
             {{\"title\": \"Short title\", \"description\": \"Problem description\", \
             \"topic_type\": \"Error|Warning|Info\", \"priority\": \"High|Medium|Low\", \
             \"labels\": [\"label\"], \"comment\": \"Technical comment with a proposed fix\"}}",
            id = element.id,
            kind = element.element_type,
            status = element.status,
            requirements = ctx.requirements,
        ),
        max_tokens: 400,
        temperature: 0.2,
    };

    let text = match generator.generate(&request).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(guid = %element.guid, %error, "Issue generation failed");
            return None;
        }
    };

    match serde_json::from_str::<GeneratedIssue>(json_payload(&text)) {
        Ok(generated) => Some(bcf_from_generated(element, generated, ctx)),
        Err(error) => {
            tracing::warn!(guid = %element.guid, %error, "Generated issue is not valid JSON");
            None
        }
    }
}

/// Tracker-safe labels: spaces become `-`, German umlauts are transliterated
/// and anything but alphanumerics, `-` and `_` is dropped.
#[must_use]
pub fn sanitize_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|label| {
            let mut clean = String::with_capacity(label.len());
            for c in label.chars() {
                match c {
                    ' ' => clean.push('-'),
                    'ä' => clean.push_str("ae"),
                    'ö' => clean.push_str("oe"),
                    'ü' => clean.push_str("ue"),
                    'ß' => clean.push_str("ss"),
                    c if c.is_alphanumeric() || c == '-' || c == '_' => clean.push(c),
                    _ => {}
                }
            }
            clean
        })
        .filter(|l| !l.is_empty())
        .collect()
}

/// Body posted to the tracker bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerRequest {
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: String,
    pub labels: Vec<String>,
    pub bcf_reference: String,
}

impl From<&BcfIssue> for TrackerRequest {
    fn from(issue: &BcfIssue) -> Self {
        let topic = &issue.markup.topic;
        let comment = issue
            .markup
            .comments
            .first()
            .map_or("", |c| c.comment.as_str());
        let details = topic
            .description
            .as_deref()
            .unwrap_or("No additional details provided.");

        let labels = if topic.labels.is_empty() {
            vec!["BIM".to_string(), "BCF".to_string()]
        } else {
            sanitize_labels(&topic.labels)
        };

        Self {
            summary: topic.title.clone(),
            description: format!(
                "{comment}\n\nTechnical Details:\n{details}\n\nBCF Reference: {}",
                topic.guid
            ),
            issue_type: "Task".to_string(),
            priority: topic.priority.clone(),
            labels,
            bcf_reference: topic.guid.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackerResponse {
    pub success: bool,
    #[serde(default, alias = "issue_key")]
    pub key: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn submit(&self, issue: &BcfIssue) -> Result<TrackerResponse, TrackerError>;
}

/// Posts issues as JSON to a tracker bridge endpoint.
pub struct HttpTracker {
    url: String,
    http: reqwest::Client,
}

impl HttpTracker {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IssueTracker for HttpTracker {
    async fn submit(&self, issue: &BcfIssue) -> Result<TrackerResponse, TrackerError> {
        let body = TrackerRequest::from(issue);
        let resp = self.http.post(&self.url).json(&body).send().await?;
        let status = resp.status();

        // The bridge answers with a JSON body on rejections too.
        match resp.json::<TrackerResponse>().await {
            Ok(response) => {
                if response.success {
                    tracing::info!(key = ?response.key, "Issue submitted");
                } else {
                    tracing::warn!(%status, error = ?response.error, "Tracker refused issue");
                }
                Ok(response)
            }
            Err(_) if !status.is_success() => Err(TrackerError::Rejected(format!("HTTP {status}"))),
            Err(error) => Err(error.into()),
        }
    }
}

/// BCF exchange document holding a single issue.
#[must_use]
pub fn bcf_document(issue: &BcfIssue) -> serde_json::Value {
    serde_json::json!({ "version": "2.1", "issues": [issue] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::model::Status;
    use crate::remote::generator::tests::ScriptedGenerator;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn ctx() -> IssueContext<'static> {
        IssueContext {
            project_name: "Demo",
            author: "BIM Analyst",
            requirements: "Wall fire rating:\n  • Pset_WallCommon.FireRating (required)",
        }
    }

    fn wall() -> Element {
        Element::new("W1", "Wall", BTreeMap::new()).with_status(Status::Fail)
    }

    #[test]
    fn labels_are_sanitized() {
        let labels = vec![
            "Brandschutz Prüfung".to_string(),
            "Maß/Straße!".to_string(),
            "?!".to_string(),
            "IDS_ok".to_string(),
        ];
        assert_eq!(
            sanitize_labels(&labels),
            vec!["Brandschutz-Pruefung", "MassStrasse", "IDS_ok"]
        );
    }

    #[test]
    fn missing_generated_fields_fall_back() {
        let issue = bcf_from_generated(&wall(), GeneratedIssue::default(), &ctx());
        let topic = &issue.markup.topic;
        assert_eq!(topic.title, "Wall W1 - Compliance Issue");
        assert_eq!(topic.topic_type, "Warning");
        assert_eq!(topic.priority, "Medium");
        assert_eq!(topic.labels, vec!["IDS-Compliance", "German-Standards"]);
        assert_eq!(issue.markup.comments[0].topic_guid, topic.guid);
        assert!(issue.markup.comments[0]
            .comment
            .starts_with("Technical analysis required.\n\nIDS requirements:\nWall fire rating"));

        let viewpoint = issue.viewpoint.unwrap();
        assert_eq!(viewpoint.components.selection[0].ifc_guid, "W1");
        assert!(!viewpoint.components.visibility.default_visibility);
    }

    #[test]
    fn tracker_request_from_issue() {
        let generated = GeneratedIssue {
            title: Some("Fehlende Brandschutzklasse".to_string()),
            priority: Some("High".to_string()),
            labels: Some(vec!["Brand schutz".to_string()]),
            comment: Some("Add F90".to_string()),
            ..GeneratedIssue::default()
        };
        let issue = bcf_from_generated(&wall(), generated, &ctx());
        let request = TrackerRequest::from(&issue);

        assert_eq!(request.summary, "Fehlende Brandschutzklasse");
        assert_eq!(request.priority, "High");
        assert_eq!(request.labels, vec!["Brand-schutz"]);
        assert_eq!(request.bcf_reference, issue.markup.topic.guid);
        assert!(request.description.starts_with("Add F90"));
        assert!(request.description.ends_with(&issue.markup.topic.guid));
    }

    #[test]
    fn tracker_response_accepts_bridge_field_names() {
        let ok: TrackerResponse =
            serde_json::from_str(r#"{"success": true, "issue_key": "CRM-12"}"#).unwrap();
        assert_eq!(ok.key.as_deref(), Some("CRM-12"));

        let refused: TrackerResponse =
            serde_json::from_str(r#"{"success": false, "error": "no credentials"}"#).unwrap();
        assert!(!refused.success);
        assert_eq!(refused.error.as_deref(), Some("no credentials"));
    }

    #[tokio::test]
    async fn draft_issue_parses_generated_json() {
        let generator = ScriptedGenerator::new(vec![Ok(
            r#"```json
{"title": "Missing fire class", "priority": "High", "labels": ["Fire"]}
```"#
                .to_string(),
        )]);
        let issue = draft_issue(&generator, &wall(), "", &ctx()).await.unwrap();
        assert_eq!(issue.markup.topic.title, "Missing fire class");
        assert_eq!(issue.markup.topic.priority, "High");

        let broken = ScriptedGenerator::new(vec![Ok("sorry".to_string())]);
        assert!(draft_issue(&broken, &wall(), "", &ctx()).await.is_none());

        let down = ScriptedGenerator::new(vec![Err(GenerationError::Transport("503".to_string()))]);
        assert!(draft_issue(&down, &wall(), "", &ctx()).await.is_none());
    }

    #[test]
    fn bcf_document_wraps_issue() {
        let issue = bcf_from_generated(&wall(), GeneratedIssue::default(), &ctx());
        let doc = bcf_document(&issue);
        assert_eq!(doc["version"], "2.1");
        assert_eq!(doc["issues"][0]["markup"]["topic"]["title"], "Wall W1 - Compliance Issue");
    }
}
