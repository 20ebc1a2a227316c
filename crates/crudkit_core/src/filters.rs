//! Collection filter types
//!
//! Query refinements are a closed sum type: every consumer matches
//! exhaustively, so adding a filter kind is a compile-time-visible change
//! everywhere filters are interpreted.

use crate::value::FieldValue;

/// Range refinement with open bounds
///
/// Selects records whose field lies strictly below `before` and strictly
/// above `after`; each bound is optional and applied independently.
#[derive(Debug, Clone)]
pub struct BeforeAfter {
    /// Name of the field to compare
    pub field: String,
    /// Exclusive upper bound
    pub before: Option<FieldValue>,
    /// Exclusive lower bound
    pub after: Option<FieldValue>,
}

impl BeforeAfter {
    pub fn new(
        field: impl Into<String>,
        before: Option<FieldValue>,
        after: Option<FieldValue>,
    ) -> Self {
        BeforeAfter { field: field.into(), before, after }
    }
}

/// Membership refinement
///
/// Selects records whose field value is one of `values`. An empty value set
/// is a no-op: it must never filter out everything.
#[derive(Debug, Clone)]
pub struct CollectionFilter {
    /// Name of the field to compare
    pub field: String,
    /// Allowed values
    pub values: Vec<FieldValue>,
}

impl CollectionFilter {
    pub fn new(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        CollectionFilter { field: field.into(), values }
    }
}

/// Pagination refinement
///
/// Applied to the ultimate result set only, never to a count.
#[derive(Debug, Clone, Copy)]
pub struct LimitOffset {
    pub limit: i64,
    pub offset: i64,
}

impl LimitOffset {
    pub fn new(limit: i64, offset: i64) -> Self {
        LimitOffset { limit, offset }
    }
}

/// A collection filter
///
/// Backings apply membership and range filters first (order-independent
/// among themselves), equality filters next, and pagination last.
#[derive(Debug, Clone)]
pub enum Filter {
    BeforeAfter(BeforeAfter),
    Collection(CollectionFilter),
    LimitOffset(LimitOffset),
}

impl From<BeforeAfter> for Filter {
    fn from(filter: BeforeAfter) -> Self {
        Filter::BeforeAfter(filter)
    }
}

impl From<CollectionFilter> for Filter {
    fn from(filter: CollectionFilter) -> Self {
        Filter::Collection(filter)
    }
}

impl From<LimitOffset> for Filter {
    fn from(filter: LimitOffset) -> Self {
        Filter::LimitOffset(filter)
    }
}

/// An ordered set of attribute equality conditions
///
/// The structured stand-in for keyword filtering: each entry names a
/// declared field and the value it must equal. An undeclared name is a
/// repository error at application time, never a silent no-op.
///
/// # Example
///
/// ```rust
/// use crudkit_core::EqFilter;
///
/// let by = EqFilter::new().eq("name", "Agatha Christie");
/// assert_eq!(by.entries().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EqFilter {
    entries: Vec<(String, FieldValue)>,
}

impl EqFilter {
    pub fn new() -> Self {
        EqFilter::default()
    }

    /// Adds an equality condition
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.entries.push((field.into(), value.into()));
        self
    }

    /// The conditions, in insertion order
    pub fn entries(&self) -> &[(String, FieldValue)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
