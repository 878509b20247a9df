use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single property value as shown in the property panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Empty or whitespace-only text counts as "not provided".
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Text(s) => s.trim().is_empty(),
            Scalar::Number(n) => n.is_nan(),
            Scalar::Bool(_) => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", if *b { "Yes" } else { "No" }),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

/// Compliance status of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Unknown,
}

impl Status {
    /// Display color (0xRRGGBB) used for the element in the property panel.
    #[must_use]
    pub fn color(self) -> u32 {
        match self {
            Status::Pass => 0x00ff00,
            Status::Warn => 0xffaa00,
            Status::Fail => 0xff0000,
            Status::Unknown => 0x808080,
        }
    }

    /// Ordering by severity: pass < warn < fail. `Unknown` sorts below pass.
    #[must_use]
    pub fn severity(self) -> u8 {
        match self {
            Status::Unknown => 0,
            Status::Pass => 1,
            Status::Warn => 2,
            Status::Fail => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI-facing projection of a model element.
///
/// `id` and `guid` both carry the stable IFC GlobalId; local ids never leave
/// the model collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub props: BTreeMap<String, Scalar>,
    pub status: Status,
    pub color: u32,
    pub guid: String,
}

impl Element {
    #[must_use]
    pub fn new(
        guid: impl Into<String>,
        element_type: impl Into<String>,
        props: BTreeMap<String, Scalar>,
    ) -> Self {
        let guid = guid.into();
        Self {
            id: guid.clone(),
            element_type: element_type.into(),
            props,
            status: Status::Unknown,
            color: Status::Unknown.color(),
            guid,
        }
    }

    /// Returns a copy carrying `status` and its matching color.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self.color = status.color();
        self
    }

    /// Finds the first non-blank value among `names`, matching either a bare
    /// key or the base name of a `Pset.Name` key.
    #[must_use]
    pub fn find_prop(&self, names: &[&str]) -> Option<&Scalar> {
        names.iter().find_map(|name| {
            self.props
                .iter()
                .find(|(key, value)| {
                    let base = key.split_once('.').map_or(key.as_str(), |(_, b)| b);
                    (key.as_str() == *name || base == *name) && !value.is_blank()
                })
                .map(|(_, value)| value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn with_status_sets_matching_color() {
        let element = Element::new("2O2Fr$t4X7Zf8NOew3FLOH", "Wall", BTreeMap::new())
            .with_status(Status::Warn);
        assert_eq!(element.status, Status::Warn);
        assert_eq!(element.color, 0xffaa00);
        assert_eq!(element.id, element.guid);
    }

    #[test]
    fn find_prop_matches_qualified_and_bare_keys() {
        let mut props = BTreeMap::new();
        props.insert("Pset_WallCommon.FireRating".to_string(), Scalar::from("F90"));
        props.insert("UValue".to_string(), Scalar::from(""));
        let element = Element::new("g", "Wall", props);

        assert_eq!(element.find_prop(&["FireRating"]), Some(&Scalar::from("F90")));
        assert_eq!(element.find_prop(&["UValue"]), None);
    }

    #[test]
    fn scalar_deserializes_untagged() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[0.25, "F60", true]"#).unwrap();
        assert_eq!(
            values,
            vec![Scalar::Number(0.25), Scalar::from("F60"), Scalar::Bool(true)]
        );
    }
}
