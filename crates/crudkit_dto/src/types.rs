//! Schema configuration types

use std::collections::BTreeSet;

/// Direction of a derived schema
///
/// The factory excludes fields marked read-only or write-only depending on
/// the purpose of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Serializes data returned to clients
    Read,
    /// Parses and validates data provided by clients
    Write,
}

/// Controls a derived schema
///
/// Purpose is mandatory: deriving with a config that never received one
/// fails with a definition error rather than guessing a direction.
///
/// # Example
///
/// ```rust
/// use crudkit_dto::DtoConfig;
///
/// let config = DtoConfig::write().exclude("internal_notes");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DtoConfig {
    purpose: Option<Purpose>,
    exclude: BTreeSet<String>,
}

impl DtoConfig {
    /// Creates a config with no purpose assigned
    pub fn new() -> Self {
        DtoConfig::default()
    }

    /// Creates a read-purposed config
    pub fn read() -> Self {
        DtoConfig { purpose: Some(Purpose::Read), exclude: BTreeSet::new() }
    }

    /// Creates a write-purposed config
    pub fn write() -> Self {
        DtoConfig { purpose: Some(Purpose::Write), exclude: BTreeSet::new() }
    }

    /// Sets the purpose
    pub fn purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    /// Excludes a field from the derived schema by name
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.exclude.insert(field.into());
        self
    }

    pub(crate) fn configured_purpose(&self) -> Option<Purpose> {
        self.purpose
    }

    pub(crate) fn exclusions(&self) -> &BTreeSet<String> {
        &self.exclude
    }
}
