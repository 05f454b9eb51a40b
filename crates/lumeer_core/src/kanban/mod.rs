//! Kanban perspective: groups records into columns by an attribute value.

pub mod config;
mod converter;
pub mod data;

pub use config::{
    column_width, KanbanAggregation, KanbanColumn, KanbanConfig, KanbanStemConfig,
    KanbanValueType, SizeType,
};
pub use converter::{KanbanConversion, KanbanConverter};
pub use data::{KanbanCard, KanbanCreateResource, KanbanData, KanbanDataColumn};
