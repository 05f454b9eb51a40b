//! Persisted Kanban view configuration.

use crate::constraint::DataAggregationType;
use crate::model::query::{QueryAttribute, QueryResource, QueryStem};
use serde::{Deserialize, Serialize};

/// Column width when no size is configured.
pub const DEFAULT_COLUMN_WIDTH: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeType {
    S,
    M,
    L,
    Xl,
}

/// Pixel width of columns for a size preset.
pub fn column_width(size: Option<SizeType>) -> u32 {
    match size {
        Some(SizeType::S) => 200,
        Some(SizeType::M) => 300,
        Some(SizeType::L) => 400,
        Some(SizeType::Xl) => 500,
        None => DEFAULT_COLUMN_WIDTH,
    }
}

/// Column identity kept across conversions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanColumn {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub width: u32,
    /// Attributes whose values produced this column, without overrides.
    #[serde(default)]
    pub created_from_attributes: Vec<QueryAttribute>,
}

impl KanbanColumn {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            width: DEFAULT_COLUMN_WIDTH,
            created_from_attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: QueryAttribute) -> Self {
        self.created_from_attributes.push(attribute);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanValueType {
    /// Summaries are the aggregated value itself.
    #[default]
    Default,
    /// Summaries are each column's share of the total.
    AllPercentage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanAggregation {
    #[serde(default)]
    pub aggregation: DataAggregationType,
    #[serde(default)]
    pub value_type: KanbanValueType,
}

/// Per-stem grouping setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanStemConfig {
    pub stem: QueryStem,
    /// Attribute whose values become column titles.
    pub attribute: QueryAttribute,
    /// Resource rendered as cards; defaults to the attribute's resource.
    #[serde(default)]
    pub resource: Option<QueryResource>,
    #[serde(default)]
    pub due_date: Option<QueryAttribute>,
    /// Columns whose cards are finished and carry no due hours.
    #[serde(default)]
    pub done_column_titles: Vec<String>,
    #[serde(default)]
    pub aggregation: Option<QueryAttribute>,
}

impl KanbanStemConfig {
    pub fn new(stem: QueryStem, attribute: QueryAttribute) -> Self {
        Self {
            stem,
            attribute,
            resource: None,
            due_date: None,
            done_column_titles: Vec::new(),
            aggregation: None,
        }
    }

    /// Resource the cards of this stem are made of.
    pub fn card_resource(&self) -> QueryResource {
        self.resource
            .clone()
            .unwrap_or_else(|| self.attribute.resource())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanConfig {
    #[serde(default)]
    pub stems_configs: Vec<KanbanStemConfig>,
    #[serde(default)]
    pub columns: Vec<KanbanColumn>,
    #[serde(default)]
    pub other_column: Option<KanbanColumn>,
    #[serde(default)]
    pub column_size: Option<SizeType>,
    #[serde(default)]
    pub aggregation: Option<KanbanAggregation>,
}

impl KanbanConfig {
    /// Summaries are computed only with an aggregation type and at least one
    /// stem naming an aggregation attribute.
    pub fn is_aggregation_defined(&self) -> bool {
        self.aggregation.is_some()
            && self
                .stems_configs
                .iter()
                .any(|stem_config| stem_config.aggregation.is_some())
    }
}
