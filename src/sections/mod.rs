//! The two-level section tree and the user's configuration state
//!
//! The section tree is static: it names every section and sub-section the
//! project has. The configuration tree, attach state and dropdown values are
//! the user-editable state that command definitions are matched against.

pub mod config;
pub mod tree;

pub use config::{AttachState, ConfigTree, DropdownValues, is_enabled, sub_config_key};
pub use tree::{Owner, SectionDefinition, SectionTree, SubSectionDefinition};
