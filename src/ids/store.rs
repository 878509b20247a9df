use super::spec::{Cardinality, EntityFilter, PropertyRequirement, Specification};
use super::xml::{self, XmlElement};
use crate::error::IdsError;

/// Holds the specifications of the most recently loaded IDS document.
#[derive(Debug, Default)]
pub struct SpecificationStore {
    title: Option<String>,
    specs: Vec<Specification>,
}

impl SpecificationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current specification set with the one in `document`.
    ///
    /// Malformed specification blocks are logged and skipped. A document with
    /// no valid specification leaves the store empty.
    pub fn load(&mut self, document: &str) -> &[Specification] {
        self.title = document_title(document);
        self.specs = parse_document(document);
        tracing::info!(
            title = self.title.as_deref().unwrap_or("-"),
            specifications = self.specs.len(),
            "Loaded IDS document"
        );
        &self.specs
    }

    #[must_use]
    pub fn specs(&self) -> &[Specification] {
        &self.specs
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Human-readable requirement list for specifications covering `category`.
    #[must_use]
    pub fn requirements_for(&self, category: &str) -> String {
        let mut lines = Vec::new();
        for spec in self
            .specs
            .iter()
            .filter(|s| s.applicability.covers_category(category))
        {
            if spec.requirements.is_empty() {
                continue;
            }
            lines.push(format!("{}:", spec.name));
            lines.extend(spec.requirements.iter().map(|r| format!("  • {r}")));
        }

        if lines.is_empty() {
            format!("No IDS requirements found for {category}.")
        } else {
            format!("Relevant IDS requirements:\n{}", lines.join("\n"))
        }
    }
}

/// Parses every specification block of an IDS document.
#[must_use]
pub fn parse_document(document: &str) -> Vec<Specification> {
    let mut specs = Vec::new();

    for (index, block) in xml::find_blocks(document, "specification")
        .into_iter()
        .enumerate()
    {
        match xml::parse(block).and_then(|element| specification_from_xml(&element)) {
            Ok(spec) => specs.push(spec),
            Err(error) => {
                tracing::warn!(block = index, %error, "Skipping malformed specification block");
            }
        }
    }

    specs
}

fn document_title(document: &str) -> Option<String> {
    let info = xml::find_blocks(document, "info").into_iter().next()?;
    let info = xml::parse(info).ok()?;
    info.child("title")?.text().map(str::to_string)
}

fn specification_from_xml(element: &XmlElement) -> Result<Specification, IdsError> {
    let name = element
        .attr("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Unnamed specification")
        .to_string();

    let description = element
        .attr("description")
        .or_else(|| element.attr("instructions"))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let entity_names = element
        .child("applicability")
        .into_iter()
        .flat_map(|a| a.children_named("entity"))
        .filter_map(|entity| entity.child("name"))
        .flat_map(facet_values)
        .collect();

    let mut requirements = Vec::new();
    if let Some(block) = element.child("requirements") {
        for facet in &block.children {
            let base = match facet.name.as_str() {
                "property" => "baseName",
                "attribute" => "name",
                other => {
                    tracing::debug!(spec = %name, facet = other, "Ignoring unsupported requirement facet");
                    continue;
                }
            };
            if let Some(requirement) = requirement_from_xml(&name, facet, base)? {
                requirements.push(requirement);
            }
        }
    }

    Ok(Specification {
        name,
        description,
        applicability: EntityFilter::new(entity_names),
        requirements,
    })
}

fn requirement_from_xml(
    spec_name: &str,
    facet: &XmlElement,
    base_tag: &str,
) -> Result<Option<PropertyRequirement>, IdsError> {
    let invalid = |message: String| IdsError::InvalidSpecification {
        name: spec_name.to_string(),
        message,
    };

    let base_name = facet
        .child(base_tag)
        .and_then(|b| facet_values(b).into_iter().next())
        .ok_or_else(|| invalid(format!("{} facet without {base_tag}", facet.name)))?;

    let property_set = facet
        .child("propertySet")
        .and_then(|p| facet_values(p).into_iter().next());

    let cardinality = match (facet.attr("cardinality"), facet.attr("minOccurs")) {
        (Some("required"), _) => Cardinality::Required,
        (Some("optional"), _) => Cardinality::Optional,
        (Some("prohibited"), _) => {
            tracing::warn!(spec = spec_name, property = %base_name, "Prohibited requirements are not checked");
            return Ok(None);
        }
        (Some(other), _) => return Err(invalid(format!("unknown cardinality '{other}'"))),
        (None, Some("0")) => Cardinality::Optional,
        (None, _) => Cardinality::Required,
    };

    let allowed_values = facet.child("value").map(facet_values).unwrap_or_default();

    Ok(Some(PropertyRequirement {
        property_set,
        base_name,
        cardinality,
        allowed_values,
    }))
}

/// Values of an IDS facet parameter: a `simpleValue`, or the enumeration of
/// an `xs:restriction`.
fn facet_values(parameter: &XmlElement) -> Vec<String> {
    if let Some(value) = parameter.child("simpleValue").and_then(XmlElement::text) {
        return vec![value.to_string()];
    }
    parameter
        .children_named("restriction")
        .flat_map(|r| r.children_named("enumeration"))
        .filter_map(|e| e.attr("value"))
        .map(str::to_string)
        .collect()
}
