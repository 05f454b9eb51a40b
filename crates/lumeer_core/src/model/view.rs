//! Saved perspective views.
//!
//! # Responsibility
//! - Bind a user-authored perspective config to a stable view identity.
//! - Validate view records before they reach storage.
//!
//! # Invariants
//! - `uuid` is never nil and never reused for another view.
//! - `name` is never blank after trim.

use crate::gantt::GanttChartConfig;
use crate::kanban::KanbanConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a saved view.
pub type ViewId = Uuid;

/// Perspective rendered by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    Kanban,
    GanttChart,
}

impl Perspective {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kanban => "kanban",
            Self::GanttChart => "gantt_chart",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "kanban" => Some(Self::Kanban),
            "gantt_chart" => Some(Self::GanttChart),
            _ => None,
        }
    }
}

impl Display for Perspective {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Perspective-specific view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "perspective", content = "config", rename_all = "snake_case")]
pub enum PerspectiveConfig {
    Kanban(KanbanConfig),
    GanttChart(GanttChartConfig),
}

impl PerspectiveConfig {
    pub fn perspective(&self) -> Perspective {
        match self {
            Self::Kanban(_) => Perspective::Kanban,
            Self::GanttChart(_) => Perspective::GanttChart,
        }
    }
}

/// Validation errors for view records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewValidationError {
    NilUuid,
    BlankName,
}

impl Display for ViewValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "view uuid must not be nil"),
            Self::BlankName => write!(f, "view name must not be blank"),
        }
    }
}

impl Error for ViewValidationError {}

/// Saved perspective view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub uuid: ViewId,
    pub name: String,
    pub config: PerspectiveConfig,
    /// Unix epoch milliseconds of the last config write.
    pub updated_at: i64,
}

impl View {
    /// Creates a view with a generated stable id.
    pub fn new(name: impl Into<String>, config: PerspectiveConfig) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            config,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn perspective(&self) -> Perspective {
        self.config.perspective()
    }

    pub fn validate(&self) -> Result<(), ViewValidationError> {
        if self.uuid.is_nil() {
            return Err(ViewValidationError::NilUuid);
        }
        if self.name.trim().is_empty() {
            return Err(ViewValidationError::BlankName);
        }
        Ok(())
    }
}
