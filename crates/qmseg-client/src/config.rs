use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

const ENV_PREFIX: &str = "QMSEG";
const LIST_KEYS: [&str; 4] = [
    "source.filter.excluded_item_prefixes",
    "source.filter.production_codes",
    "source.filter.included_subgroup_codes",
    "source.filter.excluded_subgroup_codes",
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub source: SourceConfig,
    pub segmentation: SegmentationSettings,
    pub destination: DestinationConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Warehouse,
    File,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warehouse => "warehouse",
            Self::File => "file",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
    pub filter: SourceFilter,
}

/// Item selection applied by the warehouse query. Ignored for file sources,
/// whose rows are expected to be pre-filtered.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceFilter {
    pub category_code: String,
    pub excluded_item_prefixes: Vec<String>,
    pub production_codes: Vec<String>,
    pub included_subgroup_codes: Vec<String>,
    pub excluded_subgroup_codes: Vec<String>,
    pub account: Option<String>,
    pub sales_items_only: bool,
    pub window_months: u32,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            category_code: "TE".to_string(),
            excluded_item_prefixes: vec!["9".to_string()],
            production_codes: vec!["PAK PL TE".to_string(), "PAKKET TE".to_string()],
            included_subgroup_codes: ["815", "820", "910", "912"]
                .iter()
                .map(|value| value.to_string())
                .collect(),
            excluded_subgroup_codes: vec!["940".to_string(), "942".to_string()],
            account: Some("BKI foods a/s".to_string()),
            sales_items_only: true,
            window_months: 12,
        }
    }
}

/// Which records a cohort's breakpoints are applied to when ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScope {
    /// Rank only the cohort's own records.
    #[default]
    PerCohort,
    /// Rank the whole with-sales population against the cohort's breakpoints,
    /// then keep the ranks of the cohort's rows (aligned by source row).
    /// Only the cohort's own rows survive the alignment, so the ranks are the
    /// same as `PerCohort`.
    GlobalApply,
}

impl ThresholdScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerCohort => "per_cohort",
            Self::GlobalApply => "global_apply",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_cohort" => Some(Self::PerCohort),
            "global_apply" => Some(Self::GlobalApply),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentationSettings {
    pub department_grouping: bool,
    pub threshold_scope: ThresholdScope,
    pub discontinued_marker: String,
    pub stale_days: i64,
    pub type_tag: String,
    pub script_name: String,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            department_grouping: true,
            threshold_scope: ThresholdScope::PerCohort,
            discontinued_marker: "Er udgået".to_string(),
            stale_days: 90,
            type_tag: "TE, EGENPRODUKTION".to_string(),
            script_name: "QM_Tea".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub segmentation_table: String,
    pub quantiles_table: String,
    pub log_table: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            segmentation_table: "seg_item_segmentation".to_string(),
            quantiles_table: "seg_item_segmentation_quantiles".to_string(),
            log_table: "dbo_log".to_string(),
        }
    }
}

impl DestinationConfig {
    pub fn validate(&self) -> ClientResult<()> {
        for (setting, value) in [
            ("destination.segmentation_table", &self.segmentation_table),
            ("destination.quantiles_table", &self.quantiles_table),
            ("destination.log_table", &self.log_table),
        ] {
            if !is_plain_identifier(value) {
                return Err(ClientError::invalid_table_name(setting, value));
            }
        }

        let distinct = [
            self.segmentation_table.to_ascii_lowercase(),
            self.quantiles_table.to_ascii_lowercase(),
            self.log_table.to_ascii_lowercase(),
        ];
        if distinct[0] == distinct[1] || distinct[0] == distinct[2] || distinct[1] == distinct[2]
        {
            return Err(ClientError::invalid_config(
                None,
                "destination tables must have three distinct names",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RunConfig,
    pub path: Option<PathBuf>,
}

/// Loads the run configuration. An explicit path must exist; the default
/// path inside the home directory is optional and falls back to defaults.
/// `QMSEG_`-prefixed variables (with `__` between sections) override both.
pub fn load(explicit: Option<&Path>, default_path: &Path) -> ClientResult<LoadedConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (default_path.to_path_buf(), false),
    };

    if required && !path.is_file() {
        return Err(ClientError::invalid_config(
            Some(&path),
            "the file does not exist",
        ));
    }

    let mut environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in LIST_KEYS {
        environment = environment.with_list_parse_key(key);
    }

    let settings = Config::builder()
        .add_source(File::from(path.clone()).format(FileFormat::Toml).required(required))
        .add_source(environment)
        .build()
        .map_err(|error| ClientError::invalid_config(Some(&path), &error.to_string()))?;

    let config = settings
        .try_deserialize::<RunConfig>()
        .map_err(|error| ClientError::invalid_config(Some(&path), &error.to_string()))?;
    config.destination.validate()?;

    let used_path = if path.is_file() { Some(path) } else { None };
    Ok(LoadedConfig {
        config,
        path: used_path,
    })
}

/// Parses configuration from TOML text without consulting the environment.
pub fn from_toml_str(content: &str) -> ClientResult<RunConfig> {
    let settings = Config::builder()
        .add_source(File::from_str(content, FileFormat::Toml))
        .build()
        .map_err(|error| ClientError::invalid_config(None, &error.to_string()))?;
    let config = settings
        .try_deserialize::<RunConfig>()
        .map_err(|error| ClientError::invalid_config(None, &error.to_string()))?;
    config.destination.validate()?;
    Ok(config)
}

pub(crate) fn is_plain_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && value.len() <= 64
        && chars.all(|character| character.is_ascii_alphanumeric() || character == '_')
}

#[cfg(test)]
mod tests {
    use super::{SourceKind, ThresholdScope, from_toml_str, is_plain_identifier};

    #[test]
    fn empty_document_yields_tea_defaults() {
        let parsed = from_toml_str("");
        assert!(parsed.is_ok());
        if let Ok(config) = parsed {
            assert_eq!(config.source.kind, SourceKind::Warehouse);
            assert_eq!(config.source.filter.category_code, "TE");
            assert_eq!(config.source.filter.window_months, 12);
            assert!(config.segmentation.department_grouping);
            assert_eq!(config.segmentation.discontinued_marker, "Er udgået");
            assert_eq!(config.segmentation.stale_days, 90);
            assert_eq!(config.destination.log_table, "dbo_log");
        }
    }

    #[test]
    fn sections_override_defaults_field_by_field() {
        let parsed = from_toml_str(
            r#"
[source]
kind = "file"
path = "items.csv"

[segmentation]
department_grouping = false
threshold_scope = "global_apply"
type_tag = "KAFFE"

[destination]
segmentation_table = "item_scores"
"#,
        );
        assert!(parsed.is_ok());
        if let Ok(config) = parsed {
            assert_eq!(config.source.kind, SourceKind::File);
            assert!(!config.segmentation.department_grouping);
            assert_eq!(
                config.segmentation.threshold_scope,
                ThresholdScope::GlobalApply
            );
            assert_eq!(config.segmentation.type_tag, "KAFFE");
            assert_eq!(config.segmentation.stale_days, 90);
            assert_eq!(config.destination.segmentation_table, "item_scores");
            assert_eq!(
                config.destination.quantiles_table,
                "seg_item_segmentation_quantiles"
            );
        }
    }

    #[test]
    fn rejects_table_names_that_are_not_identifiers() {
        let parsed = from_toml_str(
            r#"
[destination]
log_table = "log; DROP TABLE x"
"#,
        );
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.code, "invalid_config");
        }
    }

    #[test]
    fn rejects_colliding_table_names() {
        let parsed = from_toml_str(
            r#"
[destination]
segmentation_table = "scores"
quantiles_table = "SCORES"
"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn threshold_scope_parses_cli_spellings() {
        assert_eq!(
            ThresholdScope::parse("global-apply"),
            Some(ThresholdScope::GlobalApply)
        );
        assert_eq!(
            ThresholdScope::parse("PER_COHORT"),
            Some(ThresholdScope::PerCohort)
        );
        assert_eq!(ThresholdScope::parse("department"), None);
    }

    #[test]
    fn identifier_check_accepts_only_plain_names() {
        assert!(is_plain_identifier("seg_item_segmentation"));
        assert!(!is_plain_identifier("1table"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("seg.items"));
    }
}
