//! Persisted Gantt chart view configuration.

use crate::constraint::DataAggregationType;
use crate::model::permissions::ResourcesPermissions;
use crate::model::query::{QueryAttribute, QueryStem};
use crate::model::resource::AttributesResourceType;
use serde::{Deserialize, Serialize};

pub const GANTT_PADDING: f64 = 18.0;
pub const GANTT_COLUMN_WIDTH: f64 = 35.0;
pub const GANTT_BAR_HEIGHT: f64 = 20.0;
pub const GANTT_FONT_SIZE: f64 = 13.0;
/// Text color of swimlane headers.
pub const COLOR_PRIMARY: &str = "#253746";

/// Time scale of the chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GanttMode {
    QuarterDay,
    HalfDay,
    #[default]
    Day,
    Week,
    Month,
    Year,
}

/// Saved scroll position, a chart date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanttPosition {
    pub value: String,
}

/// Milestone date attribute with its marker color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttChartMilestoneModel {
    #[serde(flatten)]
    pub attribute: QueryAttribute,
    #[serde(default)]
    pub color: Option<String>,
}

/// Attribute roles of one query stem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GanttChartStemConfig {
    #[serde(default)]
    pub stem: Option<QueryStem>,
    #[serde(default)]
    pub name: Option<QueryAttribute>,
    #[serde(default)]
    pub start: Option<QueryAttribute>,
    #[serde(default)]
    pub end: Option<QueryAttribute>,
    #[serde(default)]
    pub progress: Option<QueryAttribute>,
    /// Reduction of multiple progress values; average when unset.
    #[serde(default)]
    pub progress_aggregation: Option<DataAggregationType>,
    #[serde(default)]
    pub color: Option<QueryAttribute>,
    /// Swimlane grouping attributes, outermost first.
    #[serde(default)]
    pub categories: Vec<QueryAttribute>,
    /// Extra static swimlane columns.
    #[serde(default)]
    pub attributes: Vec<QueryAttribute>,
    #[serde(default)]
    pub milestones: Vec<GanttChartMilestoneModel>,
}

impl GanttChartStemConfig {
    /// A stem produces tasks only with both interval bounds configured.
    pub fn has_required_properties(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// New tasks are documents of one collection carrying both bounds.
    pub fn can_create_task(&self, permissions: &ResourcesPermissions) -> bool {
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            return false;
        };
        start.resource_type == AttributesResourceType::Collection
            && end.resource_type == AttributesResourceType::Collection
            && start.resource_id == end.resource_id
            && start.resource_index == end.resource_index
            && permissions
                .for_resource(AttributesResourceType::Collection, &start.resource_id)
                .data_contribute
    }

    /// Copy with `start` and `end` exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            start: self.end.clone(),
            end: self.start.clone(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GanttChartConfig {
    #[serde(default)]
    pub mode: GanttMode,
    #[serde(default)]
    pub stems_configs: Vec<GanttChartStemConfig>,
    /// Size multiplier; 1 when unset.
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub lock_resize: bool,
    #[serde(default)]
    pub position_saved: bool,
    #[serde(default)]
    pub position: Option<GanttPosition>,
    #[serde(default)]
    pub swimlane_widths: Vec<f64>,
}
