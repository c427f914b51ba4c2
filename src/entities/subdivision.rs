// Subdivision entity (administrative region, ISO 3166-2 where available)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::localized::LocalizedText;

/// An administrative region within a country (state, canton, province).
///
/// Subdivisions are hierarchical: a child's `code` extends its parent's
/// code with a `-suffix` segment, and `parent_id` carries the explicit
/// parent reference for data generations that rely on it.
///
/// Invariants enforced by the importer:
/// - `code` is unique across the store
/// - `(country_id, short_name)` is unique
/// - a child's code is a strict prefix-extension of its parent's code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subdivision {
    pub id: Uuid,

    /// Owning country
    pub country_id: Uuid,

    /// Hierarchical subdivision code, e.g. `DE-BE`
    pub code: String,

    /// Legacy ISO 3166-2 code, if available
    pub iso_code: Option<String>,

    /// Short name for display and CSV cross-references
    pub short_name: String,

    /// Localized categories (e.g. "federal state"), at least one
    pub categories: Vec<LocalizedText>,

    /// Localized subdivision names, at least one
    pub names: Vec<LocalizedText>,

    /// Additional localized notes
    pub comments: Vec<LocalizedText>,

    /// Official languages as ISO-639-1 codes, at least one
    pub official_languages: Vec<String>,

    /// Parent subdivision within the same country, if any
    pub parent_id: Option<Uuid>,
}
