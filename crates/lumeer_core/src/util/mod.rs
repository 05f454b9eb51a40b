//! Small presentation helpers shared by converters.

pub mod color;
pub mod text;
