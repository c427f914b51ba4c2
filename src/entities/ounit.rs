// Organizational unit entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::localized::LocalizedText;

/// A non-geographic grouping within a country, e.g. a school type or a
/// holiday zone, spanning zero or more subdivisions.
///
/// Shares the subdivision invariants: unique `code`, unique
/// `(country_id, short_name)`, and the parent code-prefix rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OUnit {
    pub id: Uuid,

    /// Owning country
    pub country_id: Uuid,

    /// Hierarchical organizational unit code
    pub code: String,

    /// Short name for display and CSV cross-references
    pub short_name: String,

    /// Localized unit names, at least one
    pub names: Vec<LocalizedText>,

    /// Additional localized notes
    pub comments: Vec<LocalizedText>,

    /// Parent organizational unit, if any
    pub parent_id: Option<Uuid>,

    /// Subdivisions this unit spans
    pub subdivision_ids: Vec<Uuid>,
}
