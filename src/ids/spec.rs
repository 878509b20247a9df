use crate::error::EvalError;
use crate::model::{FlatProperties, Scalar};
use serde::Serialize;
use std::fmt;

/// Entity type → element category. Entity types sharing a category match the
/// same applicability filter.
const CATEGORIES: &[(&str, &str)] = &[
    ("IFCWALL", "Wall"),
    ("IFCWALLSTANDARDCASE", "Wall"),
    ("IFCWALLELEMENTEDCASE", "Wall"),
    ("IFCCURTAINWALL", "CurtainWall"),
    ("IFCDOOR", "Door"),
    ("IFCDOORSTANDARDCASE", "Door"),
    ("IFCWINDOW", "Window"),
    ("IFCWINDOWSTANDARDCASE", "Window"),
    ("IFCSLAB", "Slab"),
    ("IFCSLABSTANDARDCASE", "Slab"),
    ("IFCROOF", "Roof"),
    ("IFCCOLUMN", "Column"),
    ("IFCCOLUMNSTANDARDCASE", "Column"),
    ("IFCBEAM", "Beam"),
    ("IFCBEAMSTANDARDCASE", "Beam"),
    ("IFCMEMBER", "Member"),
    ("IFCPLATE", "Plate"),
    ("IFCSTAIR", "Stair"),
    ("IFCSTAIRFLIGHT", "Stair"),
    ("IFCRAILING", "Railing"),
    ("IFCCOVERING", "Covering"),
    ("IFCFURNISHINGELEMENT", "Furniture"),
    ("IFCFLOWTERMINAL", "Fixture"),
    ("IFCSANITARYTERMINAL", "Fixture"),
    ("IFCBUILDINGELEMENTPROXY", "Proxy"),
    ("IFCSPACE", "Space"),
];

/// Every entity type with a known category, in table order.
pub fn categorized_entities() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|(entity, _)| *entity)
}

/// Category of an IFC entity type, matched case-insensitively.
#[must_use]
pub fn ifc_category(entity_type: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(entity, _)| entity.eq_ignore_ascii_case(entity_type))
        .map(|(_, category)| *category)
}

/// Applicability filter over the declared IFC entity type.
///
/// Holds the raw names from the document; validation is deferred to
/// evaluation so one bad filter only affects its own specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFilter {
    pub names: Vec<String>,
}

impl EntityFilter {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: names.into_iter().map(|n| n.trim().to_ascii_uppercase()).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        let valid = !self.names.is_empty()
            && self.names.iter().all(|name| {
                name.len() > 3
                    && name.starts_with("IFC")
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if valid {
            Ok(())
        } else {
            Err(EvalError::MalformedFilter {
                filter: self.names.join("|"),
            })
        }
    }

    /// True when `entity_type` equals or contains a filter name, or falls in
    /// the same category as one.
    #[must_use]
    pub fn matches(&self, entity_type: &str) -> bool {
        let entity = entity_type.to_ascii_uppercase();
        let category = ifc_category(&entity);
        self.names.iter().any(|name| {
            entity == *name
                || entity.contains(name.as_str())
                || (category.is_some() && category == ifc_category(name))
        })
    }

    /// True when this filter covers elements of `category` (e.g. `Wall`).
    #[must_use]
    pub fn covers_category(&self, category: &str) -> bool {
        self.names
            .iter()
            .any(|name| ifc_category(name).is_some_and(|c| c.eq_ignore_ascii_case(category)))
    }
}

impl fmt::Display for EntityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join(" | "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRequirement {
    pub property_set: Option<String>,
    pub base_name: String,
    pub cardinality: Cardinality,
    /// Accepted values; empty means any non-empty value.
    pub allowed_values: Vec<String>,
}

impl PropertyRequirement {
    #[must_use]
    pub fn required(property_set: Option<&str>, base_name: &str) -> Self {
        Self {
            property_set: property_set.map(str::to_string),
            base_name: base_name.to_string(),
            cardinality: Cardinality::Required,
            allowed_values: Vec::new(),
        }
    }

    fn lookup<'p>(&self, props: &'p FlatProperties) -> Option<&'p Scalar> {
        match &self.property_set {
            Some(pset) => props.qualified(pset, &self.base_name),
            None => props.unqualified(&self.base_name),
        }
    }

    /// Optional requirements always hold.
    #[must_use]
    pub fn is_satisfied_by(&self, props: &FlatProperties) -> bool {
        if self.cardinality == Cardinality::Optional {
            return true;
        }
        match self.lookup(props) {
            Some(value) if !value.is_blank() => {
                self.allowed_values.is_empty()
                    || self.allowed_values.iter().any(|v| *v == value.to_string())
            }
            _ => false,
        }
    }
}

impl fmt::Display for PropertyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pset) = &self.property_set {
            write!(f, "{pset}.")?;
        }
        f.write_str(&self.base_name)?;
        if !self.allowed_values.is_empty() {
            write!(f, " = {}", self.allowed_values.join(" | "))?;
        }
        if self.cardinality == Cardinality::Required {
            f.write_str(" (required)")?;
        }
        Ok(())
    }
}

/// One IDS rule unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specification {
    pub name: String,
    pub description: Option<String>,
    pub applicability: EntityFilter,
    pub requirements: Vec<PropertyRequirement>,
}

impl Specification {
    /// True when every required requirement holds for `props`.
    #[must_use]
    pub fn is_compliant(&self, props: &FlatProperties) -> bool {
        self.requirements.iter().all(|r| r.is_satisfied_by(props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyNode;

    fn props(pairs: &[(&str, &str, Scalar)]) -> FlatProperties {
        let mut root = PropertyNode::default();
        for (pset, name, value) in pairs {
            root.children.push(PropertyNode::group(
                pset,
                vec![PropertyNode::property(name, value.clone())],
            ));
        }
        root.flatten()
    }

    #[test]
    fn filter_matches_equality_substring_and_category() {
        let filter = EntityFilter::new(vec!["IfcWall".to_string()]);
        assert!(filter.matches("IFCWALL"));
        assert!(filter.matches("IfcWallStandardCase"));
        assert!(!filter.matches("IFCCURTAINWALL"));
        assert!(!filter.matches("IFCDOOR"));

        let standard = EntityFilter::new(vec!["IFCWALLSTANDARDCASE".to_string()]);
        assert!(standard.matches("IFCWALL"));
        assert!(standard.covers_category("wall"));
    }

    #[test]
    fn filter_validation() {
        assert!(EntityFilter::new(vec!["IFCDOOR".to_string()]).validate().is_ok());
        assert!(EntityFilter::new(vec![]).validate().is_err());
        assert!(EntityFilter::new(vec!["IFC WALL??".to_string()]).validate().is_err());
        assert!(EntityFilter::new(vec!["Door".to_string()]).validate().is_err());
    }

    #[test]
    fn required_property_must_be_present_and_non_empty() {
        let req = PropertyRequirement::required(Some("Pset_WallCommon"), "FireRating");
        assert!(req.is_satisfied_by(&props(&[(
            "Pset_WallCommon",
            "FireRating",
            Scalar::from("F90")
        )])));
        assert!(!req.is_satisfied_by(&props(&[(
            "Pset_WallCommon",
            "FireRating",
            Scalar::from("  ")
        )])));
        assert!(!req.is_satisfied_by(&props(&[(
            "Pset_Other",
            "FireRating",
            Scalar::from("F90")
        )])));

        let unqualified = PropertyRequirement::required(None, "FireRating");
        assert!(unqualified.is_satisfied_by(&props(&[(
            "Pset_Other",
            "FireRating",
            Scalar::from("F90")
        )])));
    }

    #[test]
    fn optional_never_fails_and_allowed_values_restrict() {
        let mut optional = PropertyRequirement::required(None, "AcousticRating");
        optional.cardinality = Cardinality::Optional;
        assert!(optional.is_satisfied_by(&FlatProperties::default()));

        let mut restricted = PropertyRequirement::required(Some("Pset_DoorCommon"), "FireRating");
        restricted.allowed_values = vec!["T30".to_string(), "T90".to_string()];
        let ok = props(&[("Pset_DoorCommon", "FireRating", Scalar::from("T30"))]);
        let bad = props(&[("Pset_DoorCommon", "FireRating", Scalar::from("T60"))]);
        assert!(restricted.is_satisfied_by(&ok));
        assert!(!restricted.is_satisfied_by(&bad));
    }

    #[test]
    fn requirement_display() {
        let req = PropertyRequirement::required(Some("Pset_WallCommon"), "FireRating");
        assert_eq!(req.to_string(), "Pset_WallCommon.FireRating (required)");
    }
}
