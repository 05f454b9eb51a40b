//! Stem aggregation: resolves a query stem into linked data chains.
//!
//! # Responsibility
//! - Resolve the resource chain of a stem (collection, link type,
//!   collection, ...).
//! - Follow link instances from every root document into data chains.
//! - Group chains by attribute values (Kanban) and collect data objects per
//!   distinct resource combination (Gantt).
//!
//! # Invariants
//! - Chains keep the document order of the input data.
//! - A chain stops at the first hop that has no matching record.
//! - Group and object order is first-seen order.

use crate::constraint::value::{expand, value_to_text};
use crate::constraint::{resolve_constraint, Constraint, ConstraintData};
use crate::model::data_resource::{DataResource, DocumentsAndLinksStemData};
use crate::model::input::PerspectiveInput;
use crate::model::permissions::{user_can_edit_data_resource, AllowedPermissions, ResourcesPermissions};
use crate::model::query::{
    find_resource_by_query_resource, QueryAttribute, QueryResource, QueryStem,
};
use crate::model::resource::{
    resource_color, Attribute, AttributesResource, Collection, LinkType,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Resolves the resources of a stem: root collection, then alternating link
/// types and collections. Resolution stops at the first unknown resource.
pub fn resolve_stem_resources<'a>(
    stem: &QueryStem,
    collections: &'a [Collection],
    link_types: &'a [LinkType],
) -> Vec<AttributesResource<'a>> {
    let mut resources = Vec::new();
    let Some(mut collection) = collections
        .iter()
        .find(|collection| collection.id == stem.collection_id)
    else {
        return resources;
    };
    resources.push(AttributesResource::Collection(collection));

    for link_type_id in &stem.link_type_ids {
        let Some(link_type) = link_types
            .iter()
            .find(|link_type| &link_type.id == link_type_id)
        else {
            break;
        };
        let Some(next) = link_type
            .other_collection_id(&collection.id)
            .and_then(|id| collections.iter().find(|candidate| candidate.id == id))
        else {
            break;
        };
        resources.push(AttributesResource::LinkType(link_type));
        resources.push(AttributesResource::Collection(next));
        collection = next;
    }
    resources
}

/// Records grouped under one attribute value.
#[derive(Debug, Clone)]
pub struct AttributeGroup<'a> {
    /// `None` collects null and whitespace-only values.
    pub title: Option<String>,
    pub items: Vec<GroupItem<'a>>,
}

#[derive(Debug, Clone)]
pub struct GroupItem<'a> {
    pub data_resource: &'a DataResource,
    /// Chain prefix from the root document up to the grouped records.
    pub chain: Vec<&'a DataResource>,
}

/// One distinct combination of object records and grouping values.
#[derive(Debug, Clone)]
pub struct DataObjectInfo<'a> {
    pub object_data_resources: HashMap<String, &'a DataResource>,
    pub meta_data_resources: HashMap<String, Vec<&'a DataResource>>,
    pub grouping_values: Vec<Value>,
    pub grouping_data_resources: Vec<&'a DataResource>,
    /// Ids along the chain of the first occurrence.
    pub data_resources_chain: Vec<String>,
}

/// Aggregator bound to one stem of one input snapshot.
pub struct StemAggregator<'a> {
    collections: &'a [Collection],
    link_types: &'a [LinkType],
    permissions: &'a ResourcesPermissions,
    constraint_data: &'a ConstraintData,
    resources: Vec<AttributesResource<'a>>,
    chains: Vec<Vec<&'a DataResource>>,
}

impl<'a> StemAggregator<'a> {
    pub fn new(
        input: &'a PerspectiveInput,
        stem: &QueryStem,
        data: Option<&'a DocumentsAndLinksStemData>,
    ) -> Self {
        let resources = resolve_stem_resources(stem, &input.collections, &input.link_types);
        let chains = data
            .map(|data| build_chains(&resources, data))
            .unwrap_or_default();
        Self {
            collections: &input.collections,
            link_types: &input.link_types,
            permissions: &input.permissions,
            constraint_data: &input.constraint_data,
            resources,
            chains,
        }
    }

    pub fn resources(&self) -> &[AttributesResource<'a>] {
        &self.resources
    }

    pub fn chains(&self) -> &[Vec<&'a DataResource>] {
        &self.chains
    }

    pub fn constraint_data(&self) -> &'a ConstraintData {
        self.constraint_data
    }

    pub fn resource(&self, index: usize) -> Option<AttributesResource<'a>> {
        self.resources.get(index).copied()
    }

    /// Resolves a stem position, falling back to a lookup by id.
    pub fn resource_for(&self, resource: &QueryResource) -> Option<AttributesResource<'a>> {
        match self.resource(resource.resource_index) {
            Some(found)
                if found.id() == resource.resource_id
                    && found.resource_type() == resource.resource_type =>
            {
                Some(found)
            }
            _ => find_resource_by_query_resource(resource, self.collections, self.link_types),
        }
    }

    pub fn attribute(&self, attribute: &QueryAttribute) -> Option<&'a Attribute> {
        self.resource_for(&attribute.resource())?
            .find_attribute(&attribute.attribute_id)
    }

    /// Constraint of the attribute itself; `Unknown` when unresolved.
    pub fn attribute_constraint(&self, attribute: &QueryAttribute) -> Constraint {
        self.attribute(attribute)
            .and_then(|attribute| attribute.constraint.clone())
            .unwrap_or_default()
    }

    /// Constraint after applying a valid view-level override.
    pub fn display_constraint(&self, attribute: &QueryAttribute) -> Constraint {
        resolve_constraint(
            self.attribute(attribute)
                .and_then(|attribute| attribute.constraint.as_ref()),
            attribute.constraint.as_ref(),
        )
    }

    pub fn attribute_permissions(&self, attribute: &QueryAttribute) -> AllowedPermissions {
        self.permissions
            .for_resource(attribute.resource_type, &attribute.resource_id)
    }

    /// Returns whether the attribute accepts edits on this record.
    pub fn is_attribute_editable(
        &self,
        attribute: &QueryAttribute,
        data_resource: Option<&DataResource>,
    ) -> bool {
        data_resource.is_some()
            && self
                .attribute(attribute)
                .is_some_and(|attribute| attribute.is_editable())
    }

    /// Returns whether the current user may edit `data_resource` through the
    /// permissions of the attribute's resource.
    pub fn user_can_edit(
        &self,
        attribute: &QueryAttribute,
        data_resource: Option<&DataResource>,
    ) -> bool {
        user_can_edit_data_resource(
            data_resource,
            self.attribute_permissions(attribute),
            self.constraint_data.current_user.as_deref(),
        )
    }

    /// Color of the attribute's resource.
    pub fn resource_color(&self, attribute: &QueryAttribute) -> Option<String> {
        let resource = self.resource_for(&attribute.resource())?;
        resource_color(resource, self.collections).map(str::to_string)
    }

    /// First non-empty color value of `attribute` among the records.
    pub fn attribute_color(
        &self,
        attribute: Option<&QueryAttribute>,
        data_resources: &[&DataResource],
    ) -> Option<String> {
        let attribute = attribute?;
        data_resources
            .iter()
            .filter_map(|data_resource| data_resource.value(&attribute.attribute_id))
            .filter_map(value_to_text)
            .map(|color| color.trim().to_string())
            .find(|color| !color.is_empty())
    }

    /// Groups the records at `value_index` by the serialized value of `row`.
    ///
    /// Array values put a record into every group they name. Within a group
    /// each record appears once.
    pub fn group_by_attribute(
        &self,
        row: &QueryAttribute,
        constraint: &Constraint,
        value_index: usize,
    ) -> Vec<AttributeGroup<'a>> {
        let mut groups: Vec<AttributeGroup<'a>> = Vec::new();
        let mut positions: HashMap<Option<String>, usize> = HashMap::new();
        let mut seen: HashSet<(usize, &str)> = HashSet::new();

        for chain in &self.chains {
            let (Some(row_resource), Some(value_resource)) =
                (chain.get(row.resource_index), chain.get(value_index))
            else {
                continue;
            };
            let raw = row_resource
                .value(&row.attribute_id)
                .cloned()
                .unwrap_or(Value::Null);
            let serialized = constraint.serialize_value(&raw, self.constraint_data);
            let end = row.resource_index.max(value_index);

            for title in group_titles(&serialized) {
                let position = *positions.entry(title.clone()).or_insert_with(|| {
                    groups.push(AttributeGroup {
                        title,
                        items: Vec::new(),
                    });
                    groups.len() - 1
                });
                if seen.insert((position, value_resource.id.as_str())) {
                    groups[position].items.push(GroupItem {
                        data_resource: value_resource,
                        chain: chain[..=end].to_vec(),
                    });
                }
            }
        }
        groups
    }

    /// Collects one info per distinct object combination and grouping
    /// combination. Meta records of merged chains accumulate.
    pub fn data_objects<F>(
        &self,
        grouping: &[&QueryAttribute],
        objects: &[(&str, &QueryAttribute)],
        meta: &[(&str, &QueryAttribute)],
        grouping_value: F,
    ) -> Vec<DataObjectInfo<'a>>
    where
        F: Fn(&Value, &QueryAttribute) -> Value,
    {
        let mut infos: Vec<DataObjectInfo<'a>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for chain in &self.chains {
            let object_data_resources: HashMap<String, &'a DataResource> = objects
                .iter()
                .filter_map(|(key, attribute)| {
                    chain
                        .get(attribute.resource_index)
                        .map(|data_resource| ((*key).to_string(), *data_resource))
                })
                .collect();
            if object_data_resources.is_empty() {
                continue;
            }

            let grouping_data_resources: Vec<&'a DataResource> = grouping
                .iter()
                .filter_map(|attribute| chain.get(attribute.resource_index).copied())
                .collect();
            let grouping_options: Vec<Vec<Value>> = grouping
                .iter()
                .map(|attribute| {
                    let raw = chain
                        .get(attribute.resource_index)
                        .and_then(|data_resource| data_resource.value(&attribute.attribute_id))
                        .cloned()
                        .unwrap_or(Value::Null);
                    let converted = grouping_value(&raw, attribute);
                    let expanded: Vec<Value> = expand(&converted).into_iter().cloned().collect();
                    if expanded.is_empty() {
                        vec![Value::Null]
                    } else {
                        expanded
                    }
                })
                .collect();

            let mut object_key: Vec<String> = objects
                .iter()
                .map(|(key, _)| {
                    object_data_resources
                        .get(*key)
                        .map_or_else(String::new, |data_resource| data_resource.id.clone())
                })
                .collect();
            object_key.push(String::new());
            let object_key = object_key.join(":");

            for grouping_values in cartesian_product(&grouping_options) {
                let key = format!("{object_key}{}", Value::Array(grouping_values.clone()));
                let position = match positions.get(&key) {
                    Some(position) => *position,
                    None => {
                        infos.push(DataObjectInfo {
                            object_data_resources: object_data_resources.clone(),
                            meta_data_resources: HashMap::new(),
                            grouping_values,
                            grouping_data_resources: grouping_data_resources.clone(),
                            data_resources_chain: chain
                                .iter()
                                .map(|data_resource| data_resource.id.clone())
                                .collect(),
                        });
                        positions.insert(key, infos.len() - 1);
                        infos.len() - 1
                    }
                };

                let info = &mut infos[position];
                for (meta_key, attribute) in meta {
                    let Some(data_resource) = chain.get(attribute.resource_index) else {
                        continue;
                    };
                    let entry = info
                        .meta_data_resources
                        .entry((*meta_key).to_string())
                        .or_default();
                    if !entry.iter().any(|existing| existing.id == data_resource.id) {
                        entry.push(data_resource);
                    }
                }
            }
        }
        infos
    }
}

/// Titles of a serialized value; empty values map to `None`.
fn group_titles(value: &Value) -> Vec<Option<String>> {
    let titles: Vec<Option<String>> = expand(value)
        .into_iter()
        .map(|item| value_to_text(item).filter(|title| !title.trim().is_empty()))
        .collect();
    if titles.is_empty() {
        vec![None]
    } else {
        titles
    }
}

fn cartesian_product(options: &[Vec<Value>]) -> Vec<Vec<Value>> {
    options.iter().fold(vec![Vec::new()], |combinations, values| {
        combinations
            .iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut combination = prefix.clone();
                    combination.push(value.clone());
                    combination
                })
            })
            .collect()
    })
}

fn build_chains<'a>(
    resources: &[AttributesResource<'a>],
    data: &'a DocumentsAndLinksStemData,
) -> Vec<Vec<&'a DataResource>> {
    let Some(root) = resources.first() else {
        return Vec::new();
    };
    let documents: HashMap<(&str, &str), &'a DataResource> = data
        .documents
        .iter()
        .map(|document| ((document.resource_id.as_str(), document.id.as_str()), document))
        .collect();
    let mut links: HashMap<&str, Vec<&'a DataResource>> = HashMap::new();
    for link in &data.link_instances {
        links.entry(link.resource_id.as_str()).or_default().push(link);
    }

    let mut chains = Vec::new();
    let mut seen_roots = HashSet::new();
    for document in data
        .documents
        .iter()
        .filter(|document| document.resource_id == root.id())
    {
        if !seen_roots.insert(document.id.as_str()) {
            continue;
        }
        extend_chain(vec![document], resources, &documents, &links, &mut chains);
    }
    chains
}

fn extend_chain<'a>(
    chain: Vec<&'a DataResource>,
    resources: &[AttributesResource<'a>],
    documents: &HashMap<(&str, &str), &'a DataResource>,
    links: &HashMap<&str, Vec<&'a DataResource>>,
    chains: &mut Vec<Vec<&'a DataResource>>,
) {
    let index = chain.len();
    let (Some(link_type), Some(next_collection), Some(last)) =
        (resources.get(index), resources.get(index + 1), chain.last())
    else {
        chains.push(chain);
        return;
    };

    let mut extended = false;
    for link in links.get(link_type.id()).into_iter().flatten() {
        let Some(other_id) = link.other_document_id(&last.id) else {
            continue;
        };
        let Some(next) = documents.get(&(next_collection.id(), other_id)) else {
            continue;
        };
        let mut next_chain = chain.clone();
        next_chain.push(link);
        next_chain.push(next);
        extend_chain(next_chain, resources, documents, links, chains);
        extended = true;
    }
    if !extended {
        chains.push(chain);
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_stem_resources, StemAggregator};
    use crate::constraint::{Constraint, SelectConstraintConfig};
    use crate::model::data_resource::{DataResource, DocumentsAndLinksStemData};
    use crate::model::input::PerspectiveInput;
    use crate::model::query::{QueryResource, QueryStem};
    use crate::model::resource::{Attribute, Collection, LinkType};
    use serde_json::{json, Value};

    fn input() -> PerspectiveInput {
        PerspectiveInput {
            collections: vec![
                Collection::new("tasks", "Tasks")
                    .with_attribute(Attribute::new("a1", "State"))
                    .with_attribute(Attribute::new("a2", "Name")),
                Collection::new("people", "People").with_attribute(Attribute::new("p1", "Name")),
            ],
            link_types: vec![LinkType::new(
                "assigned",
                "Assigned",
                ["tasks".to_string(), "people".to_string()],
            )],
            ..PerspectiveInput::default()
        }
    }

    fn stem() -> QueryStem {
        QueryStem::new("tasks").with_link_type("assigned")
    }

    #[test]
    fn resolves_alternating_resources() {
        let input = input();
        let resources = resolve_stem_resources(&stem(), &input.collections, &input.link_types);
        let ids: Vec<&str> = resources.iter().map(|resource| resource.id()).collect();
        assert_eq!(ids, vec!["tasks", "assigned", "people"]);

        let unknown = QueryStem::new("tasks").with_link_type("missing");
        assert_eq!(
            resolve_stem_resources(&unknown, &input.collections, &input.link_types).len(),
            1
        );
    }

    #[test]
    fn builds_chains_and_stops_at_missing_hops() {
        let input = input();
        let data = DocumentsAndLinksStemData {
            documents: vec![
                DataResource::document("t1", "tasks"),
                DataResource::document("t2", "tasks"),
                DataResource::document("p1", "people"),
                DataResource::document("p2", "people"),
            ],
            link_instances: vec![
                DataResource::link("l1", "assigned", ["t1", "p1"]),
                DataResource::link("l2", "assigned", ["t1", "p2"]),
            ],
        };
        let aggregator = StemAggregator::new(&input, &stem(), Some(&data));
        let chains: Vec<Vec<&str>> = aggregator
            .chains()
            .iter()
            .map(|chain| chain.iter().map(|item| item.id.as_str()).collect())
            .collect();
        assert_eq!(
            chains,
            vec![vec!["t1", "l1", "p1"], vec!["t1", "l2", "p2"], vec!["t2"]]
        );
    }

    #[test]
    fn groups_by_value_and_deduplicates_records() {
        let input = input();
        let data = DocumentsAndLinksStemData {
            documents: vec![
                DataResource::document("t1", "tasks").with_value("a1", "Done"),
                DataResource::document("t2", "tasks").with_value("a1", json!(["Done", "Open"])),
                DataResource::document("t3", "tasks").with_value("a1", "  "),
                DataResource::document("t4", "tasks").with_value("a1", Value::Null),
                DataResource::document("p1", "people"),
            ],
            link_instances: vec![
                DataResource::link("l1", "assigned", ["t1", "p1"]),
                DataResource::link("l2", "assigned", ["p1", "t1"]),
            ],
        };
        let aggregator = StemAggregator::new(&input, &stem(), Some(&data));
        let row = QueryResource::collection("tasks", 0).attribute("a1");
        let constraint = Constraint::Select(SelectConstraintConfig {
            multi: true,
            ..SelectConstraintConfig::with_options(["Done", "Open"])
        });
        let groups = aggregator.group_by_attribute(&row, &constraint, 0);

        let summary: Vec<(Option<&str>, Vec<&str>)> = groups
            .iter()
            .map(|group| {
                (
                    group.title.as_deref(),
                    group
                        .items
                        .iter()
                        .map(|item| item.data_resource.id.as_str())
                        .collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("Done"), vec!["t1", "t2"]),
                (Some("Open"), vec!["t2"]),
                (None, vec!["t3", "t4"]),
            ]
        );
    }

    #[test]
    fn data_objects_merge_meta_records() {
        let input = input();
        let data = DocumentsAndLinksStemData {
            documents: vec![
                DataResource::document("t1", "tasks").with_value("a1", "Open"),
                DataResource::document("p1", "people"),
                DataResource::document("p2", "people"),
            ],
            link_instances: vec![
                DataResource::link("l1", "assigned", ["t1", "p1"]),
                DataResource::link("l2", "assigned", ["t1", "p2"]),
            ],
        };
        let aggregator = StemAggregator::new(&input, &stem(), Some(&data));
        let name = QueryResource::collection("tasks", 0).attribute("a2");
        let person = QueryResource::collection("people", 2).attribute("p1");
        let state = QueryResource::collection("tasks", 0).attribute("a1");

        let infos = aggregator.data_objects(
            &[&state],
            &[("name", &name)],
            &[("person", &person)],
            |value, _| value.clone(),
        );
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].grouping_values, vec![json!("Open")]);
        assert_eq!(infos[0].meta_data_resources["person"].len(), 2);
        assert_eq!(infos[0].data_resources_chain, vec!["t1", "l1", "p1"]);
    }
}
