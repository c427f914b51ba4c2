// Language entity (ISO-639-1)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::localized::LocalizedText;

/// A language as defined in ISO-639-1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub id: Uuid,

    /// ISO-639-1 language code, unique across the store
    pub iso_code: String,

    /// Localized language names, at least one
    pub names: Vec<LocalizedText>,
}
