//! Records selected by a query: documents and link instances.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw attribute values keyed by attribute id.
pub type DataMap = Map<String, Value>;

/// A document or a link instance.
///
/// Both share one shape: `resource_id` points to the owning collection or
/// link type, and `document_ids` is only populated for link instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResource {
    pub id: String,
    pub resource_id: String,
    #[serde(default)]
    pub data: DataMap,
    /// Email of the creator, used by contribute-only permission checks.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Hierarchy parent of a document.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Linked document ids of a link instance.
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl DataResource {
    /// Creates an empty document of `collection_id`.
    pub fn document(id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_id: collection_id.into(),
            data: DataMap::new(),
            created_by: None,
            parent_id: None,
            document_ids: Vec::new(),
        }
    }

    /// Creates an empty link instance of `link_type_id` between two documents.
    pub fn link(
        id: impl Into<String>,
        link_type_id: impl Into<String>,
        document_ids: [&str; 2],
    ) -> Self {
        Self {
            document_ids: document_ids.iter().map(|id| (*id).to_string()).collect(),
            ..Self::document(id, link_type_id)
        }
    }

    pub fn with_value(mut self, attribute_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(attribute_id.into(), value.into());
        self
    }

    pub fn with_creator(mut self, email: impl Into<String>) -> Self {
        self.created_by = Some(email.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Returns the raw value of one attribute, `None` when absent or null.
    pub fn value(&self, attribute_id: &str) -> Option<&Value> {
        self.data.get(attribute_id).filter(|value| !value.is_null())
    }

    /// Returns the linked document on the other side of `document_id`.
    pub fn other_document_id(&self, document_id: &str) -> Option<&str> {
        match self.document_ids.as_slice() {
            [first, second] if first == document_id => Some(second.as_str()),
            [first, second] if second == document_id => Some(first.as_str()),
            _ => None,
        }
    }
}

/// Documents and link instances of one query stem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsAndLinksStemData {
    #[serde(default)]
    pub documents: Vec<DataResource>,
    #[serde(default)]
    pub link_instances: Vec<DataResource>,
}

/// Query results split per stem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsAndLinksData {
    #[serde(default)]
    pub data_by_stems: Vec<DocumentsAndLinksStemData>,
}
