//! Perspective rendering service.
//!
//! # Responsibility
//! - Resolve saved views and feed their configs to the perspective converters.
//! - Keep one converter per view so column ids and task order survive calls.
//! - Persist Kanban configs whose columns changed during conversion.
//!
//! # Invariants
//! - A view is only rendered by the converter of its own perspective.
//! - Service APIs never bypass repository validation contracts.

use crate::gantt::{GanttChartConverter, GanttConversion};
use crate::kanban::{KanbanConverter, KanbanData};
use crate::model::input::PerspectiveInput;
use crate::model::view::{Perspective, PerspectiveConfig, View, ViewId};
use crate::repo::view_repo::{RepoError, ViewRepository};
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    ViewNotFound(ViewId),
    PerspectiveMismatch {
        view: ViewId,
        expected: Perspective,
        actual: Perspective,
    },
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::ViewNotFound(id) => write!(f, "view not found: {id}"),
            Self::PerspectiveMismatch {
                view,
                expected,
                actual,
            } => write!(f, "view {view} is a {actual} view, expected {expected}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::ViewNotFound(_) | Self::PerspectiveMismatch { .. } => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ViewNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Renders saved views through converters scoped to each view.
pub struct PerspectiveService<R: ViewRepository> {
    repo: R,
    locale: String,
    kanban_converters: HashMap<ViewId, KanbanConverter>,
    gantt_converters: HashMap<ViewId, GanttChartConverter>,
}

impl<R: ViewRepository> PerspectiveService<R> {
    /// Creates a service; `locale` is forwarded to chart options.
    pub fn new(repo: R, locale: impl Into<String>) -> Self {
        Self {
            repo,
            locale: locale.into(),
            kanban_converters: HashMap::new(),
            gantt_converters: HashMap::new(),
        }
    }

    pub fn create_view(
        &self,
        name: impl Into<String>,
        config: PerspectiveConfig,
    ) -> ServiceResult<ViewId> {
        let view = View::new(name, config);
        let id = self.repo.create_view(&view)?;
        info!(
            "event=view_create module=service status=ok perspective={}",
            view.perspective()
        );
        Ok(id)
    }

    pub fn get_view(&self, id: ViewId) -> ServiceResult<View> {
        self.repo.get_view(id)?.ok_or(ServiceError::ViewNotFound(id))
    }

    pub fn list_views(&self, perspective: Option<Perspective>) -> ServiceResult<Vec<View>> {
        Ok(self.repo.list_views(perspective)?)
    }

    /// Renders a Kanban view.
    ///
    /// # Side effects
    /// - Stores the returned config when its columns differ from the saved one.
    pub fn render_kanban(
        &mut self,
        id: ViewId,
        input: &PerspectiveInput,
    ) -> ServiceResult<KanbanData> {
        let view = self.get_view(id)?;
        let PerspectiveConfig::Kanban(config) = &view.config else {
            return Err(mismatch(&view, Perspective::Kanban));
        };

        let converter = self.kanban_converters.entry(id).or_default();
        let conversion = converter.convert(config, input);

        if conversion.config != *config {
            self.repo
                .update_view_config(id, &PerspectiveConfig::Kanban(conversion.config))?;
            info!("event=view_config_update module=service status=ok perspective=kanban");
        }

        Ok(conversion.data)
    }

    /// Renders a Gantt chart view.
    pub fn render_gantt(
        &mut self,
        id: ViewId,
        input: &PerspectiveInput,
        data_loaded: bool,
    ) -> ServiceResult<GanttConversion> {
        let view = self.get_view(id)?;
        let PerspectiveConfig::GanttChart(config) = &view.config else {
            return Err(mismatch(&view, Perspective::GanttChart));
        };

        let locale = &self.locale;
        let converter = self
            .gantt_converters
            .entry(id)
            .or_insert_with(|| GanttChartConverter::new(locale.clone()));
        Ok(converter.convert(config, input, data_loaded))
    }

    /// Forgets the remembered task order of a Gantt view.
    pub fn reset_gantt_sort(&mut self, id: ViewId) {
        if let Some(converter) = self.gantt_converters.get_mut(&id) {
            converter.reset_sort();
        }
    }

    /// Drops converter state kept for a view.
    pub fn forget_view(&mut self, id: ViewId) {
        self.kanban_converters.remove(&id);
        self.gantt_converters.remove(&id);
    }

    /// Deletes a view and its converter state.
    pub fn delete_view(&mut self, id: ViewId) -> ServiceResult<()> {
        self.repo.delete_view(id)?;
        self.forget_view(id);
        Ok(())
    }
}

fn mismatch(view: &View, expected: Perspective) -> ServiceError {
    warn!(
        "event=view_render module=service status=error error_code=perspective_mismatch expected={} actual={}",
        expected,
        view.perspective()
    );
    ServiceError::PerspectiveMismatch {
        view: view.uuid,
        expected,
        actual: view.perspective(),
    }
}
