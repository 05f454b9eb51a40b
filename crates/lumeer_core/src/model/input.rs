//! Snapshot handed to a converter on every recomputation.

use crate::constraint::ConstraintData;
use crate::model::data_resource::DocumentsAndLinksData;
use crate::model::permissions::ResourcesPermissions;
use crate::model::query::Query;
use crate::model::resource::{Collection, LinkType};
use crate::model::settings::ViewSettings;
use serde::{Deserialize, Serialize};

/// Everything a perspective converter reads besides its own view config.
///
/// Callers build a new snapshot whenever collections, data, permissions or
/// settings change and call `convert` again; the previous result is simply
/// replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveInput {
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub link_types: Vec<LinkType>,
    #[serde(default)]
    pub data: DocumentsAndLinksData,
    #[serde(default)]
    pub permissions: ResourcesPermissions,
    #[serde(default)]
    pub query: Query,
    #[serde(default)]
    pub settings: ViewSettings,
    #[serde(default)]
    pub constraint_data: ConstraintData,
}
