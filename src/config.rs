use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use droma_core::harmonize::HarmonizeOptions;
use droma_core::matcher::MatchOptions;
use droma_core::models::EntityKind;
use droma_core::similarity::Scorer;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub harmonize: HarmonizeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarmonizeConfig {
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default = "default_min_name_length")]
    pub min_name_length: usize,
    #[serde(default = "default_sample_long_name_threshold")]
    pub sample_long_name_threshold: usize,
    #[serde(default = "default_drug_long_name_threshold")]
    pub drug_long_name_threshold: usize,
    #[serde(default)]
    pub scorer: Scorer,
    #[serde(default)]
    pub sort_reference: bool,
    #[serde(default = "default_review_sample_size")]
    pub review_sample_size: usize,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            min_name_length: default_min_name_length(),
            sample_long_name_threshold: default_sample_long_name_threshold(),
            drug_long_name_threshold: default_drug_long_name_threshold(),
            scorer: Scorer::default(),
            sort_reference: false,
            review_sample_size: default_review_sample_size(),
        }
    }
}

fn default_max_distance() -> f64 {
    0.2
}
fn default_min_name_length() -> usize {
    5
}
fn default_sample_long_name_threshold() -> usize {
    EntityKind::Sample.default_long_name_threshold()
}
fn default_drug_long_name_threshold() -> usize {
    EntityKind::Drug.default_long_name_threshold()
}
fn default_review_sample_size() -> usize {
    5
}

impl HarmonizeConfig {
    /// Options for one harmonization call against `kind`.
    pub fn options_for(&self, kind: EntityKind) -> HarmonizeOptions {
        let threshold = match kind {
            EntityKind::Sample => self.sample_long_name_threshold,
            EntityKind::Drug => self.drug_long_name_threshold,
        };
        HarmonizeOptions {
            matching: MatchOptions {
                max_distance: self.max_distance,
                min_name_length: self.min_name_length,
                long_name_threshold: Some(threshold),
                scorer: self.scorer,
                sort_reference: self.sort_reference,
            },
            review_sample_size: self.review_sample_size,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if !(0.0..=1.0).contains(&config.harmonize.max_distance) {
        anyhow::bail!("harmonize.max_distance must be in [0.0, 1.0]");
    }

    if config.harmonize.min_name_length == 0 {
        anyhow::bail!("harmonize.min_name_length must be >= 1");
    }

    if config.logging.filter.trim().is_empty() {
        anyhow::bail!("logging.filter must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("[db]\npath = \"./data/droma.sqlite\"\n").unwrap();
        assert_eq!(config.db.path, PathBuf::from("./data/droma.sqlite"));
        assert_eq!(config.harmonize.max_distance, 0.2);
        assert_eq!(config.harmonize.min_name_length, 5);
        assert_eq!(config.harmonize.sample_long_name_threshold, 30);
        assert_eq!(config.harmonize.drug_long_name_threshold, 17);
        assert_eq!(config.harmonize.scorer, Scorer::Indel);
        assert!(!config.harmonize.sort_reference);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_options_per_kind() {
        let config = parse_config(
            r#"
            [db]
            path = "x.db"

            [harmonize]
            max_distance = 0.1
            drug_long_name_threshold = 20
            scorer = "jaro_winkler"
            "#,
        )
        .unwrap();
        let drug = config.harmonize.options_for(EntityKind::Drug);
        assert_eq!(drug.matching.long_name_threshold, Some(20));
        assert_eq!(drug.matching.max_distance, 0.1);
        assert_eq!(drug.matching.scorer, Scorer::JaroWinkler);
        let sample = config.harmonize.options_for(EntityKind::Sample);
        assert_eq!(sample.matching.long_name_threshold, Some(30));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_distance = "[db]\npath = \"x.db\"\n[harmonize]\nmax_distance = 1.5\n";
        assert!(parse_config(bad_distance).is_err());

        let bad_length = "[db]\npath = \"x.db\"\n[harmonize]\nmin_name_length = 0\n";
        assert!(parse_config(bad_length).is_err());

        let bad_scorer = "[db]\npath = \"x.db\"\n[harmonize]\nscorer = \"soundex\"\n";
        assert!(parse_config(bad_scorer).is_err());
    }

    #[test]
    fn test_missing_db_section_rejected() {
        assert!(parse_config("[logging]\nfilter = \"debug\"\n").is_err());
    }
}
