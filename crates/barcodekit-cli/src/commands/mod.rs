//! CLI command implementations.

pub mod curate;
pub mod split;
