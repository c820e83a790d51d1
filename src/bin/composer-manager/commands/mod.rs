//! Command implementations

pub mod completions;
pub mod installed;
pub mod rebuild;
pub mod required;
pub mod status;
