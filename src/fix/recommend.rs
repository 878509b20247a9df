//! Property value suggestions for non-passing elements.
//!
//! Suggestions come from a text generator when one is configured and from a
//! fixed rule table otherwise.

use super::local::{has_fire_class, has_thermal, FIRE_PROPERTY, THERMAL_PROPERTY};
use super::retry::{retry_until_valid, RetryPolicy};
use crate::check::AggregatedResults;
use crate::model::{Element, Scalar, Status};
use crate::remote::{json_payload, GenerationRequest, TextGenerator};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionOption {
    pub value: Scalar,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub property: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub options: Vec<SuggestionOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub analysis: String,
    pub suggestions: Vec<Suggestion>,
}

impl Recommendation {
    /// First option of the first suggestion, if any.
    #[must_use]
    pub fn first_option(&self) -> Option<(&str, &Scalar)> {
        self.suggestions
            .iter()
            .find_map(|s| s.options.first().map(|o| (s.property.as_str(), &o.value)))
    }
}

#[derive(Deserialize)]
struct SuggestionPayload {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

/// Parses the `suggestions` of a generated JSON object.
///
/// Text around the outermost braces (code fences, chatter) is ignored.
pub fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>, serde_json::Error> {
    serde_json::from_str::<SuggestionPayload>(json_payload(text)).map(|p| p.suggestions)
}

const RECOMMEND_SYSTEM: &str =
    "You are a BIM expert for German building regulations. Reply with valid JSON only, no other text.";

const EXPLAIN_SYSTEM: &str = "You are a BIM expert specialised in German building regulations and IDS analysis. \
Give precise technical explanations.";

fn props_json(element: &Element) -> String {
    serde_json::to_string(&element.props).unwrap_or_else(|_| "{}".to_string())
}

fn recommendation_prompt(element: &Element, context: &str) -> String {
    format!(
        r#"As a BIM expert, analyse this element and propose concrete fixes.

Element: {id} ({kind})
Current properties: {props}
Status: {status}

Context: {context}

Return 2-4 suggestions in exactly this JSON format and nothing else:
{{"suggestions": [{{"property": "name", "label": "Description", "options": [{{"value": "v1", "reason": "Short reason"}}]}}]}}

Focus on missing or wrong properties."#,
        id = element.id,
        kind = element.element_type,
        props = props_json(element),
        status = element.status,
    )
}

/// Asks `generator` for suggestions, retrying malformed output under `policy`.
///
/// Returns `None` when the element already passes, when every attempt fails,
/// when the generator refuses the element, or when `cancel` fires.
pub async fn request_recommendations(
    generator: &dyn TextGenerator,
    element: &Element,
    context: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Option<Recommendation> {
    if element.status == Status::Pass {
        tracing::debug!(guid = %element.guid, "Element passes, no recommendations requested");
        return None;
    }

    let request = GenerationRequest {
        system: RECOMMEND_SYSTEM.to_string(),
        prompt: recommendation_prompt(element, context),
        max_tokens: 300,
        temperature: 0.2,
    };

    let result = retry_until_valid(
        policy,
        cancel,
        |_| generator.generate(&request),
        parse_suggestions,
    )
    .await;

    match result {
        Ok(suggestions) => Some(Recommendation {
            analysis: context.to_string(),
            suggestions,
        }),
        Err(error) => {
            tracing::warn!(guid = %element.guid, %error, "Could not generate recommendations");
            None
        }
    }
}

fn suggestion(property: &str, label: &str, options: &[(Scalar, &str)]) -> Suggestion {
    Suggestion {
        property: property.to_string(),
        label: label.to_string(),
        options: options
            .iter()
            .map(|(value, reason)| SuggestionOption {
                value: value.clone(),
                reason: (*reason).to_string(),
            })
            .collect(),
    }
}

/// Offline suggestions for walls and doors.
#[must_use]
pub fn rule_based_recommendations(element: &Element) -> Recommendation {
    const U_LABEL: &str = "U-Value (W/m²K)";
    const FIRE_LABEL: &str = "Fire Resistance Class";
    let id = &element.id;

    match element.element_type.as_str() {
        "Wall" => match (has_thermal(element), has_fire_class(element)) {
            (false, false) => Recommendation {
                analysis: format!(
                    "Wall {id} is missing both thermal insulation (U-Value) and fire protection properties."
                ),
                suggestions: vec![
                    suggestion(
                        THERMAL_PROPERTY,
                        U_LABEL,
                        &[
                            (Scalar::Number(0.18), "Passive house standard"),
                            (Scalar::Number(0.25), "Modern building code compliance"),
                            (Scalar::Number(0.35), "Standard insulation requirement"),
                        ],
                    ),
                    suggestion(
                        FIRE_PROPERTY,
                        FIRE_LABEL,
                        &[
                            (Scalar::from("F90"), "High-rise or critical structural element"),
                            (Scalar::from("F60"), "Standard residential/commercial"),
                            (Scalar::from("F30"), "Non-load bearing partition"),
                        ],
                    ),
                ],
            },
            (false, true) => Recommendation {
                analysis: format!("Wall {id} needs a thermal insulation value."),
                suggestions: vec![suggestion(
                    THERMAL_PROPERTY,
                    U_LABEL,
                    &[
                        (Scalar::Number(0.18), "Energy-efficient standard"),
                        (Scalar::Number(0.25), "Building code minimum"),
                        (Scalar::Number(0.30), "Basic compliance"),
                    ],
                )],
            },
            (true, false) => Recommendation {
                analysis: format!("Wall {id} has thermal properties but no fire resistance class."),
                suggestions: vec![suggestion(
                    FIRE_PROPERTY,
                    FIRE_LABEL,
                    &[
                        (Scalar::from("F60"), "Typical for insulated walls"),
                        (Scalar::from("F30"), "Minimum for partition walls"),
                        (Scalar::from("F90"), "Load-bearing or escape route"),
                    ],
                )],
            },
            (true, true) => Recommendation::default(),
        },
        "Door" => Recommendation {
            analysis: format!("Door {id} requires a fire resistance rating."),
            suggestions: vec![suggestion(
                FIRE_PROPERTY,
                FIRE_LABEL,
                &[
                    (Scalar::from("F30"), "Standard interior door"),
                    (Scalar::from("F60"), "Fire compartment separation"),
                    (Scalar::from("F90"), "Emergency exit or high-risk area"),
                ],
            )],
        },
        _ => Recommendation::default(),
    }
}

/// Lists the failed and passed specifications that name the element.
#[must_use]
pub fn validation_context(element: &Element, results: Option<&AggregatedResults>) -> String {
    let Some(results) = results else {
        return String::new();
    };

    let failed: Vec<_> = results.failed_for(&element.guid).collect();
    let passed: Vec<_> = results.passed_for(&element.guid).collect();
    if failed.is_empty() && passed.is_empty() {
        return "No IDS validation results found for this element.".to_string();
    }

    let mut out = String::from("IDS validation results for this element:\n");
    for (heading, entries) in [("FAILED SPECIFICATIONS", &failed), ("PASSED SPECIFICATIONS", &passed)] {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{heading}:");
        for spec in entries {
            let description = spec.description.as_deref().unwrap_or("No description");
            let _ = writeln!(out, "- {}: {description}", spec.name);
        }
    }
    let _ = write!(
        out,
        "Validation summary: {} failed, {} passed specifications for this element.",
        failed.len(),
        passed.len()
    );
    out
}

/// Deterministic explanation used without a generator.
#[must_use]
pub fn mock_explain(element: &Element) -> String {
    let verdict = match element.status {
        Status::Pass => "All required properties are present.",
        Status::Warn => {
            "Some properties are missing. Please add values such as the fire resistance class or U-Value."
        }
        Status::Fail | Status::Unknown => {
            "Essential properties are missing. This can block approvals and cause delays."
        }
    };
    format!("In short: {} is a {}. {verdict}", element.id, element.element_type)
}

/// Free-text explanation of the element's status.
///
/// Falls back to [`mock_explain`] without a generator or when generation fails.
pub async fn explain(
    generator: Option<&dyn TextGenerator>,
    element: &Element,
    requirements: &str,
    validation: &str,
) -> String {
    let Some(generator) = generator else {
        return mock_explain(element);
    };

    let request = GenerationRequest {
        system: EXPLAIN_SYSTEM.to_string(),
        prompt: format!(
            "Analyse this BIM element.\n\n\
             ID: {id}\nType: {kind}\nProperties: {props}\nStatus: {status}\n\n\
             Requirements: {requirements}\n\nValidation: {validation}\n\n\
             Explain what the element is, what its status means, which IDS requirements apply \
             and which properties are missing or wrong. Answer in at most 50 words.",
            id = element.id,
            kind = element.element_type,
            props = props_json(element),
            status = element.status,
        ),
        max_tokens: 500,
        temperature: 0.3,
    };

    match generator.generate(&request).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(guid = %element.guid, %error, "Explanation failed, using fallback");
            mock_explain(element)
        }
    }
}
