//! Kanban board produced by one conversion.

use crate::constraint::Constraint;
use crate::kanban::config::KanbanStemConfig;
use crate::model::data_resource::DataResource;
use crate::model::permissions::AllowedPermissions;
use crate::model::query::QueryAttribute;
use crate::model::resource::AttributesResourceType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanCard {
    pub data_resource: DataResource,
    pub resource_id: String,
    pub resource_type: AttributesResourceType,
    pub stem_index: usize,
    pub permissions: AllowedPermissions,
    /// Record ids from the stem root to the card.
    pub data_resources_chain: Vec<String>,
    /// Hours until the due date; negative when overdue.
    pub due_hours: Option<f64>,
}

/// A resource a user may create from inside a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanCreateResource {
    pub resource_id: String,
    pub resource_type: AttributesResourceType,
    pub kanban_attribute: QueryAttribute,
    pub stem_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanDataColumn {
    pub id: String,
    pub title: String,
    pub width: u32,
    pub cards: Vec<KanbanCard>,
    pub created_from_attributes: Vec<QueryAttribute>,
    pub constraint: Option<Constraint>,
    pub summary: Option<String>,
    pub create_resources: Vec<KanbanCreateResource>,
}

impl KanbanDataColumn {
    pub fn contains_card(&self, data_resource_id: &str, resource_type: AttributesResourceType) -> bool {
        self.cards.iter().any(|card| {
            card.data_resource.id == data_resource_id && card.resource_type == resource_type
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanData {
    pub stems_configs: Vec<KanbanStemConfig>,
    pub columns: Vec<KanbanDataColumn>,
    /// Cards without a usable title.
    pub other_column: KanbanDataColumn,
}

impl KanbanData {
    /// Titled columns followed by the other column.
    pub fn all_columns(&self) -> impl Iterator<Item = &KanbanDataColumn> {
        self.columns.iter().chain(std::iter::once(&self.other_column))
    }
}
