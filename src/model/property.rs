//! Nested property trees as delivered by the model collaborator.
//!
//! The root node carries element attributes in `data`. Every child node whose
//! `data` holds both `Name` and `Value` is a property; a child with a `Name` but
//! no `Value` is a group (property set) that qualifies the properties below it.

use super::element::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NAME_KEY: &str = "Name";
const VALUE_KEY: &str = "Value";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyNode {
    #[serde(default)]
    pub data: BTreeMap<String, Scalar>,
    #[serde(default)]
    pub children: Vec<PropertyNode>,
}

impl PropertyNode {
    #[must_use]
    pub fn with_data(data: impl IntoIterator<Item = (String, Scalar)>) -> Self {
        Self {
            data: data.into_iter().collect(),
            children: Vec::new(),
        }
    }

    /// A property set group node.
    #[must_use]
    pub fn group(name: &str, children: Vec<PropertyNode>) -> Self {
        let mut node = Self::with_data([(NAME_KEY.to_string(), Scalar::from(name))]);
        node.children = children;
        node
    }

    /// A single named property.
    #[must_use]
    pub fn property(name: &str, value: Scalar) -> Self {
        Self::with_data([
            (NAME_KEY.to_string(), Scalar::from(name)),
            (VALUE_KEY.to_string(), value),
        ])
    }

    fn name(&self) -> Option<String> {
        self.data.get(NAME_KEY).map(ToString::to_string)
    }

    /// Flattens the tree into `propertySet.baseName -> value` pairs.
    ///
    /// Root attributes keep their bare key. The first occurrence of a key wins,
    /// so instance values listed before inherited type values take precedence.
    #[must_use]
    pub fn flatten(&self) -> FlatProperties {
        let mut out = BTreeMap::new();
        for (key, value) in &self.data {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for child in &self.children {
            child.flatten_into(None, &mut out);
        }
        FlatProperties(out)
    }

    fn flatten_into(&self, qualifier: Option<&str>, out: &mut BTreeMap<String, Scalar>) {
        let name = self.name();
        match (name, self.data.get(VALUE_KEY)) {
            (Some(name), Some(value)) => {
                let key = match qualifier {
                    Some(q) => format!("{q}.{name}"),
                    None => name,
                };
                out.entry(key).or_insert_with(|| value.clone());
                for child in &self.children {
                    child.flatten_into(qualifier, out);
                }
            }
            (Some(group), None) => {
                for child in &self.children {
                    child.flatten_into(Some(&group), out);
                }
            }
            (None, _) => {
                for child in &self.children {
                    child.flatten_into(qualifier, out);
                }
            }
        }
    }
}

/// Flattened property map keyed by `Pset.BaseName` (or a bare attribute name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatProperties(BTreeMap<String, Scalar>);

impl FlatProperties {
    /// Looks up `base_name` inside `property_set`.
    #[must_use]
    pub fn qualified(&self, property_set: &str, base_name: &str) -> Option<&Scalar> {
        self.0.get(&format!("{property_set}.{base_name}"))
    }

    /// Looks up `base_name` as a bare attribute or inside any property set.
    /// Bare attributes are preferred, then property sets in name order.
    #[must_use]
    pub fn unqualified(&self, base_name: &str) -> Option<&Scalar> {
        self.0.get(base_name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.split_once('.').is_some_and(|(_, b)| b == base_name))
                .map(|(_, value)| value)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Scalar> {
        self.0
    }
}
