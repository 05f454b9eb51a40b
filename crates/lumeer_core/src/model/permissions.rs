//! Resource permissions and per-record edit checks.

use crate::model::data_resource::DataResource;
use crate::model::query::QueryResource;
use crate::model::resource::AttributesResourceType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role flags the current user holds on one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedPermissions {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub data_read: bool,
    /// May create records and edit records they created.
    #[serde(default)]
    pub data_contribute: bool,
    /// May edit any record.
    #[serde(default)]
    pub data_write: bool,
}

impl AllowedPermissions {
    /// Full access; convenient for owners and tests.
    pub fn all() -> Self {
        Self {
            read: true,
            data_read: true,
            data_contribute: true,
            data_write: true,
        }
    }

    /// Read plus contribute, without write access to others' records.
    pub fn contributor() -> Self {
        Self {
            read: true,
            data_read: true,
            data_contribute: true,
            data_write: false,
        }
    }
}

/// Permissions keyed by collection id and link type id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesPermissions {
    #[serde(default)]
    pub collections: HashMap<String, AllowedPermissions>,
    #[serde(default)]
    pub link_types: HashMap<String, AllowedPermissions>,
}

impl ResourcesPermissions {
    /// Returns permissions of one resource; unknown resources grant nothing.
    pub fn for_resource(
        &self,
        resource_type: AttributesResourceType,
        resource_id: &str,
    ) -> AllowedPermissions {
        let map = match resource_type {
            AttributesResourceType::Collection => &self.collections,
            AttributesResourceType::LinkType => &self.link_types,
        };
        map.get(resource_id).copied().unwrap_or_default()
    }

    pub fn for_query_resource(&self, resource: &QueryResource) -> AllowedPermissions {
        self.for_resource(resource.resource_type, &resource.resource_id)
    }
}

/// Returns whether the current user may edit values of `data_resource`.
///
/// Writers may edit everything; contributors only what they created.
pub fn user_can_edit_data_resource(
    data_resource: Option<&DataResource>,
    permissions: AllowedPermissions,
    current_user: Option<&str>,
) -> bool {
    let Some(data_resource) = data_resource else {
        return false;
    };
    if permissions.data_write {
        return true;
    }
    match (current_user, data_resource.created_by.as_deref()) {
        (Some(user), Some(creator)) => {
            permissions.data_contribute && user.eq_ignore_ascii_case(creator)
        }
        _ => false,
    }
}
