//! View settings and the sort they impose on records.

use crate::constraint::{Constraint, ConstraintData, SortKey};
use crate::model::data_resource::{DataResource, DocumentsAndLinksStemData};
use crate::model::resource::{find_resource, AttributesResourceType, Collection, LinkType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort rule for one attribute of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSortSetting {
    pub resource_type: AttributesResourceType,
    pub resource_id: String,
    pub attribute_id: String,
    #[serde(default)]
    pub sort: SortDirection,
}

/// Per-view presentation settings shared by all perspectives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    /// Rules are applied in order; later rules break ties of earlier ones.
    #[serde(default)]
    pub sort: Vec<AttributeSortSetting>,
}

struct SortRule<'a> {
    setting: &'a AttributeSortSetting,
    constraint: Constraint,
}

/// Stable sort of arbitrary items by the records they wrap.
///
/// Items of different resources are never compared by value: they keep the
/// relative order in which their resources first appear.
pub fn sort_by_view_settings<T, F>(
    items: &mut [T],
    settings: &ViewSettings,
    collections: &[Collection],
    link_types: &[LinkType],
    constraint_data: &ConstraintData,
    key: F,
) where
    F: Fn(&T) -> (&DataResource, AttributesResourceType, &str),
{
    if settings.sort.is_empty() || items.len() < 2 {
        return;
    }

    let rules: Vec<SortRule<'_>> = settings
        .sort
        .iter()
        .map(|setting| SortRule {
            setting,
            constraint: find_resource(
                setting.resource_type,
                &setting.resource_id,
                collections,
                link_types,
            )
            .and_then(|resource| resource.find_attribute(&setting.attribute_id))
            .and_then(|attribute| attribute.constraint.clone())
            .unwrap_or_default(),
        })
        .collect();

    let mut resource_order: Vec<(AttributesResourceType, String)> = Vec::new();
    for item in items.iter() {
        let (_, resource_type, resource_id) = key(item);
        if !resource_order
            .iter()
            .any(|(kind, id)| *kind == resource_type && id == resource_id)
        {
            resource_order.push((resource_type, resource_id.to_string()));
        }
    }
    let position = |resource_type: AttributesResourceType, resource_id: &str| {
        resource_order
            .iter()
            .position(|(kind, id)| *kind == resource_type && id == resource_id)
            .unwrap_or(usize::MAX)
    };

    items.sort_by(|a, b| {
        let (first, first_type, first_id) = key(a);
        let (second, second_type, second_id) = key(b);
        position(first_type, first_id)
            .cmp(&position(second_type, second_id))
            .then_with(|| {
                compare_by_rules(
                    first,
                    second,
                    first_type,
                    first_id,
                    &rules,
                    constraint_data,
                )
            })
    });
}

/// Returns a copy of stem data with documents and link instances sorted.
pub fn sort_stem_data(
    stem_data: Option<&DocumentsAndLinksStemData>,
    settings: &ViewSettings,
    collections: &[Collection],
    link_types: &[LinkType],
    constraint_data: &ConstraintData,
) -> DocumentsAndLinksStemData {
    let mut sorted = stem_data.cloned().unwrap_or_default();
    sort_by_view_settings(
        &mut sorted.documents,
        settings,
        collections,
        link_types,
        constraint_data,
        |document| {
            (
                document,
                AttributesResourceType::Collection,
                document.resource_id.as_str(),
            )
        },
    );
    sort_by_view_settings(
        &mut sorted.link_instances,
        settings,
        collections,
        link_types,
        constraint_data,
        |link| {
            (
                link,
                AttributesResourceType::LinkType,
                link.resource_id.as_str(),
            )
        },
    );
    sorted
}

fn compare_by_rules(
    first: &DataResource,
    second: &DataResource,
    resource_type: AttributesResourceType,
    resource_id: &str,
    rules: &[SortRule<'_>],
    constraint_data: &ConstraintData,
) -> Ordering {
    for rule in rules {
        if rule.setting.resource_type != resource_type || rule.setting.resource_id != resource_id {
            continue;
        }
        let attribute_id = rule.setting.attribute_id.as_str();
        let first_key = first
            .value(attribute_id)
            .and_then(|value| rule.constraint.sort_key(value, constraint_data));
        let second_key = second
            .value(attribute_id)
            .and_then(|value| rule.constraint.sort_key(value, constraint_data));

        let ordering = match (first_key, second_key) {
            (None, None) => Ordering::Equal,
            // Missing values go last in both directions.
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(first_key), Some(second_key)) => {
                let ordering = SortKey::compare(&first_key, &second_key);
                match rule.setting.sort {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
