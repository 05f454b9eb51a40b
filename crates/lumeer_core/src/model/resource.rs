//! Resource definitions: collections, link types and their attributes.

use crate::constraint::Constraint;
use serde::{Deserialize, Serialize};

/// Kind of resource an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributesResourceType {
    Collection,
    LinkType,
}

/// Typed column definition of a collection or link type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub name: String,
    /// `None` behaves like the permissive unknown constraint.
    #[serde(default)]
    pub constraint: Option<Constraint>,
    /// Values are produced by a function and cannot be edited by hand.
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub locked: bool,
}

impl Attribute {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            constraint: None,
            computed: false,
            locked: false,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Returns whether users may write values of this attribute directly.
    pub fn is_editable(&self) -> bool {
        !self.computed && !self.locked
    }
}

/// Document container with its own attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    /// Hex color used to tint bars and swimlane headers.
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Relation between two collections whose instances may carry attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkType {
    pub id: String,
    pub name: String,
    pub collection_ids: [String; 2],
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl LinkType {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        collection_ids: [String; 2],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            collection_ids,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Returns the collection on the other side of `collection_id`.
    ///
    /// Self-links return the same collection.
    pub fn other_collection_id(&self, collection_id: &str) -> Option<&str> {
        let [first, second] = &self.collection_ids;
        if first == collection_id {
            Some(second.as_str())
        } else if second == collection_id {
            Some(first.as_str())
        } else {
            None
        }
    }
}

/// Borrowed view over either attribute-carrying resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributesResource<'a> {
    Collection(&'a Collection),
    LinkType(&'a LinkType),
}

impl<'a> AttributesResource<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Self::Collection(collection) => collection.id.as_str(),
            Self::LinkType(link_type) => link_type.id.as_str(),
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Collection(collection) => collection.name.as_str(),
            Self::LinkType(link_type) => link_type.name.as_str(),
        }
    }

    pub fn resource_type(&self) -> AttributesResourceType {
        match self {
            Self::Collection(_) => AttributesResourceType::Collection,
            Self::LinkType(_) => AttributesResourceType::LinkType,
        }
    }

    pub fn attributes(&self) -> &'a [Attribute] {
        match self {
            Self::Collection(collection) => collection.attributes.as_slice(),
            Self::LinkType(link_type) => link_type.attributes.as_slice(),
        }
    }

    pub fn find_attribute(&self, attribute_id: &str) -> Option<&'a Attribute> {
        find_attribute(self.attributes(), attribute_id)
    }
}

/// Finds one attribute by id.
pub fn find_attribute<'a>(attributes: &'a [Attribute], attribute_id: &str) -> Option<&'a Attribute> {
    attributes
        .iter()
        .find(|attribute| attribute.id == attribute_id)
}

/// Finds the constraint of one attribute by id.
pub fn find_attribute_constraint<'a>(
    attributes: &'a [Attribute],
    attribute_id: &str,
) -> Option<&'a Constraint> {
    find_attribute(attributes, attribute_id).and_then(|attribute| attribute.constraint.as_ref())
}

/// Resolves a resource by type and id.
pub fn find_resource<'a>(
    resource_type: AttributesResourceType,
    resource_id: &str,
    collections: &'a [Collection],
    link_types: &'a [LinkType],
) -> Option<AttributesResource<'a>> {
    match resource_type {
        AttributesResourceType::Collection => collections
            .iter()
            .find(|collection| collection.id == resource_id)
            .map(AttributesResource::Collection),
        AttributesResourceType::LinkType => link_types
            .iter()
            .find(|link_type| link_type.id == resource_id)
            .map(AttributesResource::LinkType),
    }
}

/// Returns the color used for a resource.
///
/// Link types borrow the color of their first collection.
pub fn resource_color<'a>(
    resource: AttributesResource<'a>,
    collections: &'a [Collection],
) -> Option<&'a str> {
    let collection = match resource {
        AttributesResource::Collection(collection) => Some(collection),
        AttributesResource::LinkType(link_type) => collections
            .iter()
            .find(|collection| collection.id == link_type.collection_ids[0]),
    }?;
    let color = collection.color.trim();
    if color.is_empty() {
        None
    } else {
        Some(color)
    }
}

#[cfg(test)]
mod tests {
    use super::{find_resource, resource_color, Attribute, AttributesResourceType, Collection, LinkType};

    #[test]
    fn other_collection_handles_self_links() {
        let link = LinkType::new("l1", "self", ["c1".to_string(), "c1".to_string()]);
        assert_eq!(link.other_collection_id("c1"), Some("c1"));
        assert_eq!(link.other_collection_id("c2"), None);
    }

    #[test]
    fn link_type_color_falls_back_to_first_collection() {
        let collections = vec![Collection::new("c1", "Tasks").with_color("#00b388")];
        let link_types = vec![LinkType::new(
            "l1",
            "blocks",
            ["c1".to_string(), "c2".to_string()],
        )];
        let resource = find_resource(
            AttributesResourceType::LinkType,
            "l1",
            &collections,
            &link_types,
        )
        .expect("link type should resolve");
        assert_eq!(resource_color(resource, &collections), Some("#00b388"));
    }

    #[test]
    fn locked_or_computed_attributes_are_not_editable() {
        let mut attribute = Attribute::new("a1", "Status");
        assert!(attribute.is_editable());
        attribute.locked = true;
        assert!(!attribute.is_editable());
        attribute.locked = false;
        attribute.computed = true;
        assert!(!attribute.is_editable());
    }
}
