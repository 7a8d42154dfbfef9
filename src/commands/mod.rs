//! Command generation from section configuration
//!
//! A [`definition::CommandDefinition`] ties a [`definition::CommandTemplate`] to a section and
//! to the configuration values it applies to. [`generate::generate`] picks the definitions that
//! match each enabled section or sub-section and [`assemble::assemble`] turns each template into
//! a concrete shell command. Sections that cannot produce a command show up as
//! [`spec::CommandEntry::Error`] entries instead of being dropped.

pub mod assemble;
pub mod definition;
pub mod generate;
pub mod spec;
