// Import source layout: which CSV files feed a full run
//
// The canonical layout is a root folder holding the global countries and
// languages files plus one folder per country with optional subdivision
// and organizational unit files and a holidays folder:
//
//   root/
//     countries.csv
//     languages.csv
//     DE/
//       subdivisions.csv
//       ounits.csv
//       holidays/*.csv
//
// A sources.json in the root can override file names and restrict the
// regional set; without one the layout is discovered by convention.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SOURCES_FILE: &str = "sources.json";

const COUNTRIES_FILE: &str = "countries.csv";
const LANGUAGES_FILE: &str = "languages.csv";
const SUBDIVISIONS_FILE: &str = "subdivisions.csv";
const OUNITS_FILE: &str = "ounits.csv";
const HOLIDAYS_FOLDER: &str = "holidays";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourcesConfig {
    /// Countries file name, relative to the root folder
    pub countries_file: String,

    /// Languages file name, relative to the root folder
    pub languages_file: String,

    /// Per-country regional sources, imported in list order
    pub regional: Vec<RegionalSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalSource {
    /// ISO 3166-1 code, used for progress captions
    pub country_code: String,

    /// Folder name under the root folder
    pub country_folder: String,

    /// Subdivisions file name within the country folder, if any
    #[serde(default)]
    pub subdivisions_file: Option<String>,

    /// Organizational units file name within the country folder, if any
    #[serde(default)]
    pub ounits_file: Option<String>,

    /// Folder within the country folder whose *.csv files hold holidays
    #[serde(default = "default_holidays_folder")]
    pub holidays_folder: String,
}

fn default_holidays_folder() -> String {
    HOLIDAYS_FOLDER.to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            countries_file: COUNTRIES_FILE.to_string(),
            languages_file: LANGUAGES_FILE.to_string(),
            regional: Vec::new(),
        }
    }
}

impl SourcesConfig {
    pub fn from_file(path: &Path) -> Result<SourcesConfig> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read sources config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid sources config {}", path.display()))
    }

    /// Resolves the sources for a root folder: reads sources.json when
    /// present, otherwise discovers country folders by convention.
    pub fn resolve(root: &Path) -> Result<SourcesConfig> {
        let config_path = root.join(SOURCES_FILE);
        if config_path.is_file() {
            SourcesConfig::from_file(&config_path)
        } else {
            SourcesConfig::discover(root)
        }
    }

    /// Discovers the conventional layout: every directory under the root
    /// is a country folder named by its ISO code, scanned for the
    /// conventional file names. Folders sort by name so import order is
    /// deterministic.
    pub fn discover(root: &Path) -> Result<SourcesConfig> {
        let mut regional = Vec::new();

        let entries = fs::read_dir(root)
            .with_context(|| format!("failed to read import folder {}", root.display()))?;
        let mut folders: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        folders.sort();

        for folder in folders {
            let country_folder = root.join(&folder);
            regional.push(RegionalSource {
                country_code: folder.clone(),
                country_folder: folder,
                subdivisions_file: country_folder
                    .join(SUBDIVISIONS_FILE)
                    .is_file()
                    .then(|| SUBDIVISIONS_FILE.to_string()),
                ounits_file: country_folder
                    .join(OUNITS_FILE)
                    .is_file()
                    .then(|| OUNITS_FILE.to_string()),
                holidays_folder: HOLIDAYS_FOLDER.to_string(),
            });
        }

        Ok(SourcesConfig {
            regional,
            ..SourcesConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn discover_finds_country_folders_in_sorted_order() {
        let root = tempfile::tempdir().unwrap();
        File::create(root.path().join("countries.csv")).unwrap();
        fs::create_dir(root.path().join("FR")).unwrap();
        fs::create_dir(root.path().join("DE")).unwrap();
        File::create(root.path().join("DE").join("subdivisions.csv")).unwrap();

        let config = SourcesConfig::resolve(root.path()).unwrap();
        assert_eq!(config.countries_file, "countries.csv");
        assert_eq!(config.regional.len(), 2);
        assert_eq!(config.regional[0].country_code, "DE");
        assert_eq!(
            config.regional[0].subdivisions_file.as_deref(),
            Some("subdivisions.csv")
        );
        assert_eq!(config.regional[1].country_code, "FR");
        assert_eq!(config.regional[1].subdivisions_file, None);
    }

    #[test]
    fn explicit_config_overrides_discovery() {
        let root = tempfile::tempdir().unwrap();
        let mut file = File::create(root.path().join(SOURCES_FILE)).unwrap();
        write!(
            file,
            r#"{{
                "countriesFile": "all-countries.csv",
                "regional": [
                    {{ "countryCode": "CH", "countryFolder": "ch-data" }}
                ]
            }}"#
        )
        .unwrap();

        let config = SourcesConfig::resolve(root.path()).unwrap();
        assert_eq!(config.countries_file, "all-countries.csv");
        assert_eq!(config.languages_file, "languages.csv");
        assert_eq!(config.regional.len(), 1);
        assert_eq!(config.regional[0].holidays_folder, "holidays");
    }
}
