// Localized text values and language fallback resolution

use serde::{Deserialize, Serialize};

/// Fallback language used when the requested language has no entries.
pub const DEFAULT_LANGUAGE: &str = "EN";

/// A single (language, text) pair attached to an entity.
///
/// Lists of these are unordered for resolution purposes, but insertion
/// order is preserved so "first entry" fallback is well defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    /// ISO-639-1 language code
    pub language: String,
    /// Text content
    pub text: String,
}

impl LocalizedText {
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        LocalizedText {
            language: language.into(),
            text: text.into(),
        }
    }
}

/// Reduces a list of localized texts to the requested language, falling back
/// to [`DEFAULT_LANGUAGE`] and finally to the first entry in original order.
///
/// With no requested language the whole list is returned unfiltered.
pub fn resolve(texts: &[LocalizedText], requested: Option<&str>) -> Vec<LocalizedText> {
    resolve_with_default(texts, requested, DEFAULT_LANGUAGE)
}

/// Same as [`resolve`] but with an explicit fallback language.
pub fn resolve_with_default(
    texts: &[LocalizedText],
    requested: Option<&str>,
    default: &str,
) -> Vec<LocalizedText> {
    let requested = match requested {
        None | Some("") => return texts.to_vec(),
        Some(lang) => lang,
    };

    if texts.iter().any(|t| t.language == requested) {
        texts
            .iter()
            .filter(|t| t.language == requested)
            .cloned()
            .collect()
    } else if texts.iter().any(|t| t.language == default) {
        texts
            .iter()
            .filter(|t| t.language == default)
            .cloned()
            .collect()
    } else {
        // Neither language present: keep the first entry only
        texts.iter().take(1).cloned().collect()
    }
}

/// Scalar projection: language code of the best matching entry.
///
/// Used by output formats that carry a single language (CSV, iCalendar).
pub fn resolve_language(texts: &[LocalizedText], requested: Option<&str>) -> Option<String> {
    resolve(texts, requested).first().map(|t| t.language.clone())
}

/// Scalar projection: text of the best matching entry.
pub fn resolve_text(texts: &[LocalizedText], requested: Option<&str>) -> Option<String> {
    resolve(texts, requested).first().map(|t| t.text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<LocalizedText> {
        vec![
            LocalizedText::new("DE", "Sommerferien"),
            LocalizedText::new("EN", "Summer holidays"),
            LocalizedText::new("FR", "Vacances d'été"),
        ]
    }

    #[test]
    fn no_requested_language_returns_full_list() {
        let texts = sample();
        let resolved = resolve(&texts, None);
        assert_eq!(resolved, texts);

        // Empty string behaves like no language
        let resolved = resolve(&texts, Some(""));
        assert_eq!(resolved, texts);
    }

    #[test]
    fn requested_language_match_returns_matching_entries() {
        let resolved = resolve(&sample(), Some("DE"));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].text, "Sommerferien");
    }

    #[test]
    fn missing_language_falls_back_to_default() {
        let resolved = resolve(&sample(), Some("IT"));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].language, "EN");
    }

    #[test]
    fn missing_default_falls_back_to_first_entry() {
        let texts = vec![
            LocalizedText::new("DE", "Sommerferien"),
            LocalizedText::new("FR", "Vacances d'été"),
        ];
        let resolved = resolve(&texts, Some("IT"));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].language, "DE");
    }

    #[test]
    fn multiple_entries_per_language_are_all_kept() {
        let texts = vec![
            LocalizedText::new("DE", "Ostern"),
            LocalizedText::new("DE", "Osterferien"),
            LocalizedText::new("EN", "Easter"),
        ];
        let resolved = resolve(&texts, Some("DE"));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn empty_list_resolves_to_nothing() {
        assert!(resolve(&[], Some("DE")).is_empty());
        assert_eq!(resolve_text(&[], Some("DE")), None);
        assert_eq!(resolve_language(&[], None), None);
    }

    #[test]
    fn scalar_projections_take_first_resolved_entry() {
        assert_eq!(
            resolve_text(&sample(), Some("FR")).as_deref(),
            Some("Vacances d'été")
        );
        assert_eq!(resolve_language(&sample(), Some("XX")).as_deref(), Some("EN"));
        assert_eq!(resolve_text(&sample(), None).as_deref(), Some("Sommerferien"));
    }
}
