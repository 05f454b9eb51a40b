//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and converters into view-level APIs.
//! - Keep CLI callers decoupled from storage details.

pub mod perspective_service;
