//! Gantt chart perspective: records become tasks on a time axis.

pub mod config;
mod converter;
pub mod interval;
pub mod sorting;
pub mod task;

pub use config::{
    GanttChartConfig, GanttChartMilestoneModel, GanttChartStemConfig, GanttMode, GanttPosition,
};
pub use converter::{GanttChartConverter, GanttConversion};
pub use task::{
    GanttOptions, GanttSwimlane, GanttSwimlaneInfo, GanttSwimlaneType, GanttTask,
    GanttTaskMetadata, Milestone,
};
