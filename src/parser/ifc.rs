use crate::error::ParseError;
use crate::highlight::HighlightStyle;
use crate::ids::spec::{categorized_entities, ifc_category};
use crate::model::{
    Element, ElementIndex, Highlighter, ModelIdMap, PropertyNode, PropertySource, Scalar,
};
use crate::parser::step::{StepEntity, StepFile, StepValue};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One element of a loaded model.
#[derive(Debug, Clone)]
pub struct ModelElement {
    pub local_id: u64,
    pub guid: String,
    pub entity_type: String,
    pub name: String,
    pub tree: PropertyNode,
}

impl ModelElement {
    /// Builds an element whose tree holds the standard root attributes.
    #[must_use]
    pub fn new(local_id: u64, guid: &str, entity_type: &str, name: &str) -> Self {
        let entity_type = entity_type.to_ascii_uppercase();
        let tree = PropertyNode::with_data([
            ("GlobalId".to_string(), Scalar::from(guid)),
            ("Name".to_string(), Scalar::from(name)),
            ("Entity".to_string(), Scalar::from(entity_type.as_str())),
            ("Category".to_string(), Scalar::from(display_type(&entity_type))),
        ]);
        Self {
            local_id,
            guid: guid.to_string(),
            entity_type,
            name: name.to_string(),
            tree,
        }
    }

    /// Appends a property set group; earlier sets take precedence on lookup.
    #[must_use]
    pub fn with_property_set(mut self, name: &str, props: Vec<(&str, Scalar)>) -> Self {
        let children = props
            .into_iter()
            .map(|(n, v)| PropertyNode::property(n, v))
            .collect();
        self.tree.children.push(PropertyNode::group(name, children));
        self
    }
}

/// A parsed IFC model with lookup tables for GUID ↔ local id projection.
///
/// Also keeps the highlight style last applied to each element.
#[derive(Debug, Default)]
pub struct LoadedModel {
    pub model_id: String,
    pub project_name: String,
    pub schema: String,
    elements: BTreeMap<u64, ModelElement>,
    guid_to_local: HashMap<String, u64>,
    styles: HashMap<u64, HighlightStyle>,
}

impl LoadedModel {
    #[must_use]
    pub fn from_elements(model_id: &str, elements: Vec<ModelElement>) -> Self {
        let mut model = Self {
            model_id: model_id.to_string(),
            ..Self::default()
        };
        for element in elements {
            if !element.guid.is_empty() {
                model.guid_to_local.insert(element.guid.clone(), element.local_id);
            }
            model.elements.insert(element.local_id, element);
        }
        model
    }

    /// Elements in ascending local id order.
    pub fn elements(&self) -> impl Iterator<Item = &ModelElement> {
        self.elements.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// UI projection of the element with the given GUID, status still unknown.
    #[must_use]
    pub fn project_element(&self, guid: &str) -> Option<Element> {
        let local_id = self.guid_to_local.get(guid)?;
        let element = self.elements.get(local_id)?;
        Some(Element::new(
            guid,
            display_type(&element.entity_type),
            element.tree.flatten().into_inner(),
        ))
    }

    #[must_use]
    pub fn style_of(&self, guid: &str) -> Option<HighlightStyle> {
        let local_id = self.guid_to_local.get(guid)?;
        self.styles.get(local_id).copied()
    }

    pub fn clear_styles(&mut self) {
        self.styles.clear();
    }
}

impl ElementIndex for LoadedModel {
    fn all_elements(&self) -> ModelIdMap {
        let mut map = ModelIdMap::new();
        if !self.elements.is_empty() {
            map.insert(self.model_id.clone(), self.elements.keys().copied().collect());
        }
        map
    }

    fn entity_type(&self, model: &str, local_id: u64) -> Option<String> {
        if model != self.model_id {
            return None;
        }
        self.elements.get(&local_id).map(|e| e.entity_type.clone())
    }

    fn guids_to_local_ids(&self, guids: &[String]) -> ModelIdMap {
        let ids: std::collections::BTreeSet<u64> = guids
            .iter()
            .filter_map(|g| self.guid_to_local.get(g).copied())
            .collect();
        let mut map = ModelIdMap::new();
        if !ids.is_empty() {
            map.insert(self.model_id.clone(), ids);
        }
        map
    }

    fn local_ids_to_guids(&self, ids: &ModelIdMap) -> Vec<String> {
        ids.get(&self.model_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.elements.get(id))
            .filter(|e| !e.guid.is_empty())
            .map(|e| e.guid.clone())
            .collect()
    }
}

impl PropertySource for LoadedModel {
    fn property_tree(&self, model: &str, local_id: u64) -> Option<PropertyNode> {
        if model != self.model_id {
            return None;
        }
        self.elements.get(&local_id).map(|e| e.tree.clone())
    }
}

impl Highlighter for LoadedModel {
    fn apply_highlight(&mut self, style: HighlightStyle, ids: &ModelIdMap) {
        for id in ids.get(&self.model_id).into_iter().flatten() {
            if self.elements.contains_key(id) {
                self.styles.insert(*id, style);
            }
        }
    }
}

/// Category name shown for an entity type, falling back to the entity itself.
fn display_type(entity_type: &str) -> String {
    ifc_category(entity_type).map_or_else(|| entity_type.to_string(), str::to_string)
}

/// Parses an IFC file into a [`LoadedModel`].
///
/// The model id is the file stem. Every element entity with a GlobalId gets a
/// property tree with its own property sets first, followed by the property
/// sets inherited from its type object.
///
/// # Errors
///
/// Returns [`ParseError::FileRead`] if the file cannot be read.
/// Returns [`ParseError::InvalidStep`] if the STEP format is malformed.
///
/// # Example
///
/// ```no_run
/// use ifc_ids_checker::parser::parse_ifc_file;
///
/// let model = parse_ifc_file("model.ifc")?;
/// println!("{}: {} elements", model.project_name, model.len());
/// # Ok::<(), ifc_ids_checker::error::ParseError>(())
/// ```
pub fn parse_ifc_file<P: AsRef<Path>>(path: P) -> Result<LoadedModel, ParseError> {
    let content = std::fs::read_to_string(&path).map_err(|source| ParseError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;

    let model_id = path
        .as_ref()
        .file_stem()
        .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().to_string());

    parse_ifc_str(&model_id, &content)
}

/// Parses IFC STEP text held in memory.
pub fn parse_ifc_str(model_id: &str, content: &str) -> Result<LoadedModel, ParseError> {
    let step_file = StepFile::parse(content)?;

    let property_sets = extract_property_sets(&step_file);
    let instance_psets = extract_instance_property_links(&step_file);
    let type_psets = extract_type_property_links(&step_file);

    let mut elements = Vec::new();
    for entity_type in categorized_entities() {
        for entity in step_file.get_entities_by_type(entity_type) {
            let Some(guid) = entity.str_at(0).filter(|g| !g.is_empty()) else {
                continue;
            };
            let name = entity.str_at(2).unwrap_or_default();
            let mut element = ModelElement::new(entity.id, guid, entity_type, name);

            let own = instance_psets.get(&entity.id).into_iter().flatten();
            let inherited = type_psets.get(&entity.id).into_iter().flatten();
            for pset_id in own.chain(inherited) {
                if let Some(group) = property_sets.get(pset_id) {
                    element.tree.children.push(group.clone());
                }
            }
            elements.push(element);
        }
    }

    let mut model = LoadedModel::from_elements(model_id, elements);
    model.project_name = extract_project_name(&step_file);
    model.schema = step_file.schema;

    tracing::info!(
        model = %model.model_id,
        schema = %model.schema,
        elements = model.len(),
        "Loaded IFC model"
    );

    Ok(model)
}

fn extract_project_name(step_file: &StepFile) -> String {
    step_file
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|e| e.str_at(2))
        .map_or_else(|| "Unknown Project".to_string(), str::to_string)
}

/// Property set id → group node with one child per single-value property.
fn extract_property_sets(step_file: &StepFile) -> HashMap<u64, PropertyNode> {
    step_file
        .get_entities_by_type("IFCPROPERTYSET")
        .into_iter()
        .map(|pset| {
            let name = pset.str_at(2).unwrap_or("Unnamed");
            let children = pset
                .values
                .get(4)
                .map(StepValue::references)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| step_file.get_entity(id))
                .filter_map(single_value_property)
                .collect();
            (pset.id, PropertyNode::group(name, children))
        })
        .collect()
}

fn single_value_property(prop: &StepEntity) -> Option<PropertyNode> {
    if prop.entity_type != "IFCPROPERTYSINGLEVALUE" {
        return None;
    }
    let name = prop.str_at(0).filter(|n| !n.is_empty())?;
    let value = prop.values.get(2).and_then(to_scalar)?;
    Some(PropertyNode::property(name, value))
}

fn to_scalar(value: &StepValue) -> Option<Scalar> {
    match value {
        StepValue::String(s) | StepValue::Enum(s) => Some(Scalar::Text(s.clone())),
        StepValue::Real(f) => Some(Scalar::Number(*f)),
        StepValue::Integer(i) => Some(Scalar::Number(*i as f64)),
        StepValue::Boolean(b) => Some(Scalar::Bool(*b)),
        StepValue::Typed(_, inner) => to_scalar(inner),
        StepValue::Reference(id) => Some(Scalar::Text(format!("#{id}"))),
        StepValue::List(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(to_scalar)
                .map(|s| s.to_string())
                .collect();
            Some(Scalar::Text(parts.join(", ")))
        }
        StepValue::Null | StepValue::Derived => None,
    }
}

/// Element id → property set ids, via IFCRELDEFINESBYPROPERTIES.
fn extract_instance_property_links(step_file: &StepFile) -> HashMap<u64, Vec<u64>> {
    let mut links: HashMap<u64, Vec<u64>> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
        // Index 4 = RelatedObjects, index 5 = RelatingPropertyDefinition
        let Some(pset_id) = rel.values.get(5).and_then(StepValue::as_reference) else {
            continue;
        };
        for element_id in rel.values.get(4).map(StepValue::references).unwrap_or_default() {
            links.entry(element_id).or_default().push(pset_id);
        }
    }

    links
}

/// Element id → property set ids declared on its type object.
fn extract_type_property_links(step_file: &StepFile) -> HashMap<u64, Vec<u64>> {
    let mut links: HashMap<u64, Vec<u64>> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELDEFINESBYTYPE") {
        // Index 4 = RelatedObjects, index 5 = RelatingType
        let Some(type_entity) = rel
            .values
            .get(5)
            .and_then(StepValue::as_reference)
            .and_then(|id| step_file.get_entity(id))
        else {
            continue;
        };
        // IfcTypeObject.HasPropertySets is attribute 5
        let psets = type_entity
            .values
            .get(5)
            .map(StepValue::references)
            .unwrap_or_default();
        for element_id in rel.values.get(4).map(StepValue::references).unwrap_or_default() {
            links.entry(element_id).or_default().extend(psets.iter().copied());
        }
    }

    links
}
