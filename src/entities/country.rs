// Country entity (ISO 3166-1)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::localized::LocalizedText;

/// A country as defined in ISO 3166-1.
///
/// Created once by the import pipeline, immutable afterwards. The `id` is
/// assigned at import time; cross-references from CSV sources use the ISO
/// code instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: Uuid,

    /// ISO 3166-1 country code, unique across the store
    pub iso_code: String,

    /// Localized country names, at least one
    pub names: Vec<LocalizedText>,

    /// Official languages as ISO-639-1 codes, at least one
    pub official_languages: Vec<String>,
}
