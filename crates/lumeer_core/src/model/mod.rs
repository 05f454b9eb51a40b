//! Domain model shared by the board and chart perspectives.
//!
//! # Responsibility
//! - Describe resources (collections, link types) and their typed attributes.
//! - Describe the records (documents, link instances) selected by a query.
//! - Carry permissions and view settings consumed by the converters.
//!
//! # Invariants
//! - A `resource_index` inside a stem is even for collections and odd for
//!   link types.
//! - Data for stem `i` lives at `DocumentsAndLinksData::data_by_stems[i]`.

pub mod data_resource;
pub mod input;
pub mod permissions;
pub mod query;
pub mod resource;
pub mod settings;
pub mod view;
