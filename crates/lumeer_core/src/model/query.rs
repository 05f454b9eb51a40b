//! Query stems and query-scoped attribute references.

use crate::constraint::Constraint;
use crate::model::resource::{
    find_resource, Attribute, AttributesResource, AttributesResourceType, Collection, LinkType,
};
use serde::{Deserialize, Serialize};

/// User selection of collections chained through link types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub stems: Vec<QueryStem>,
}

/// One query branch: a base collection followed by a chain of link types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStem {
    pub collection_id: String,
    #[serde(default)]
    pub link_type_ids: Vec<String>,
}

impl QueryStem {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            link_type_ids: Vec::new(),
        }
    }

    pub fn with_link_type(mut self, link_type_id: impl Into<String>) -> Self {
        self.link_type_ids.push(link_type_id.into());
        self
    }
}

/// Position of a resource inside a stem chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryResource {
    pub resource_id: String,
    pub resource_type: AttributesResourceType,
    pub resource_index: usize,
}

impl QueryResource {
    pub fn collection(collection_id: impl Into<String>, resource_index: usize) -> Self {
        Self {
            resource_id: collection_id.into(),
            resource_type: AttributesResourceType::Collection,
            resource_index,
        }
    }

    pub fn link_type(link_type_id: impl Into<String>, resource_index: usize) -> Self {
        Self {
            resource_id: link_type_id.into(),
            resource_type: AttributesResourceType::LinkType,
            resource_index,
        }
    }

    pub fn attribute(&self, attribute_id: impl Into<String>) -> QueryAttribute {
        QueryAttribute {
            resource_id: self.resource_id.clone(),
            resource_type: self.resource_type,
            resource_index: self.resource_index,
            attribute_id: attribute_id.into(),
            constraint: None,
        }
    }
}

/// Attribute reference scoped to a stem position, with an optional
/// view-level constraint override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAttribute {
    pub resource_id: String,
    pub resource_type: AttributesResourceType,
    pub resource_index: usize,
    pub attribute_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl QueryAttribute {
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn resource(&self) -> QueryResource {
        QueryResource {
            resource_id: self.resource_id.clone(),
            resource_type: self.resource_type,
            resource_index: self.resource_index,
        }
    }

    /// Copy without the constraint override; used for identity comparisons.
    pub fn cleaned(&self) -> Self {
        Self {
            constraint: None,
            ..self.clone()
        }
    }

    /// Compares the cleaned forms of two attributes.
    pub fn same_attribute(&self, other: &QueryAttribute) -> bool {
        self.resource_id == other.resource_id
            && self.resource_type == other.resource_type
            && self.resource_index == other.resource_index
            && self.attribute_id == other.attribute_id
    }

    /// Returns whether both references point at the same stem position.
    pub fn same_resource(&self, other: &QueryAttribute) -> bool {
        self.resource_index == other.resource_index && self.resource_type == other.resource_type
    }
}

/// Returns whether `attributes` contains `attribute` (ignoring overrides).
pub fn attributes_include(attributes: &[QueryAttribute], attribute: &QueryAttribute) -> bool {
    attributes.iter().any(|item| item.same_attribute(attribute))
}

pub fn find_resource_by_query_resource<'a>(
    resource: &QueryResource,
    collections: &'a [Collection],
    link_types: &'a [LinkType],
) -> Option<AttributesResource<'a>> {
    find_resource(
        resource.resource_type,
        &resource.resource_id,
        collections,
        link_types,
    )
}

pub fn find_attribute_by_query_attribute<'a>(
    attribute: &QueryAttribute,
    collections: &'a [Collection],
    link_types: &'a [LinkType],
) -> Option<&'a Attribute> {
    find_resource(
        attribute.resource_type,
        &attribute.resource_id,
        collections,
        link_types,
    )?
    .find_attribute(&attribute.attribute_id)
}

pub fn find_constraint_by_query_attribute<'a>(
    attribute: &QueryAttribute,
    collections: &'a [Collection],
    link_types: &'a [LinkType],
) -> Option<&'a Constraint> {
    find_attribute_by_query_attribute(attribute, collections, link_types)
        .and_then(|attribute| attribute.constraint.as_ref())
}
