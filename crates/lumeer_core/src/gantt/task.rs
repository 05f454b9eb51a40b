//! Chart widget model produced by one conversion.

use crate::gantt::config::{GanttChartStemConfig, GanttMode};
use crate::model::resource::AttributesResourceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GanttSwimlaneType {
    Checkbox,
}

/// One swimlane cell of a task row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GanttSwimlane {
    pub value: Value,
    pub title: String,
    pub background: Option<String>,
    pub text_background: Option<String>,
    pub text_color: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(rename = "type")]
    pub swimlane_type: Option<GanttSwimlaneType>,
}

/// Header of one swimlane column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttSwimlaneInfo {
    pub background: Option<String>,
    pub color: String,
    /// Attribute columns are static; category columns group tasks.
    #[serde(rename = "static")]
    pub is_static: bool,
    pub width: Option<f64>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// `None` when the milestone date is missing or unparsable.
    pub end: Option<String>,
    pub draggable: bool,
    pub color: Option<String>,
}

/// Source records of a task, used when edits flow back into data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttTaskMetadata {
    pub data_resource_id: String,
    pub resource_id: String,
    pub resource_type: AttributesResourceType,
    pub stem_index: usize,
    pub name_data_id: Option<String>,
    pub start_data_id: Option<String>,
    pub end_data_id: Option<String>,
    pub progress_data_ids: Vec<String>,
    pub milestone_data_ids: Vec<Option<String>>,
    pub swimlanes_data_resources_ids: Vec<String>,
    pub data_resource_chain: Vec<String>,
    /// Stem config as seen by the task; bounds exchanged for swapped tasks.
    pub stem_config: GanttChartStemConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttTask {
    pub id: String,
    pub name: String,
    /// `YYYY-MM-DD HH:mm`.
    pub start: String,
    pub end: String,
    pub progress: f64,
    pub dependencies: Vec<String>,
    pub allowed_dependencies: Vec<String>,
    pub bar_color: String,
    pub milestones: Vec<Milestone>,
    pub start_drag: bool,
    pub end_drag: bool,
    pub draggable: bool,
    pub progress_drag: bool,
    pub text_color: String,
    /// Category cells padded with `None`, then attribute cells.
    pub swimlanes: Vec<Option<GanttSwimlane>>,
    pub min_progress: Option<f64>,
    pub max_progress: Option<f64>,
    /// The input interval was inverted and its bounds were exchanged.
    pub swapped: bool,
    pub metadata: GanttTaskMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttOptions {
    pub swimlane_info: Vec<GanttSwimlaneInfo>,
    pub resize_task_right: bool,
    pub resize_progress: bool,
    pub resize_task_left: bool,
    pub resize_swimlanes: bool,
    pub resize_milestones: bool,
    pub drag_task_swimlanes: bool,
    pub create_tasks: bool,
    pub language: String,
    pub lock_resize: bool,
    pub date_format: String,
    pub initial_scroll: Option<String>,
    pub view_mode: GanttMode,
    pub padding: f64,
    pub column_width: f64,
    pub bar_height: f64,
    pub font_size: f64,
    pub header_font_size: f64,
    pub swimlane_font_size: f64,
}
