use crate::error::{Result, SplitterError};
use chrono::Local;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

pub const DEFAULT_TITLE_FIELD: &str = "Job title";

pub const DEFAULT_BUCKETS: [&str; 5] = ["arun", "assaf", "chen", "leigh", "meirav"];

/// Characters that cannot appear in an output file name component.
pub const FORBIDDEN_NAME_CHARS: [char; 3] = ['/', '\\', '\0'];

/// Prospect category derived from the job title.
///
/// The declaration order is the fixed processing and reporting order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Category {
    #[serde(rename = "PM")]
    #[schemars(description = "Plant, factory and site managers")]
    Pm,

    #[serde(rename = "OPEX/CI")]
    #[schemars(description = "Operational excellence and continuous improvement roles")]
    OpexCi,

    #[serde(rename = "OPS")]
    #[schemars(description = "Everything else, including empty titles")]
    Ops,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Pm, Category::OpexCi, Category::Ops];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Pm => "PM",
            Category::OpexCi => "OPEX/CI",
            Category::Ops => "OPS",
        }
    }

    /// Label used inside output file names, where `/` is not allowed.
    pub fn file_label(&self) -> &'static str {
        match self {
            Category::Pm => "pm",
            Category::OpexCi => "opex ci",
            Category::Ops => "ops",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One prospect row. Field order follows the input header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub fields: Vec<(String, String)>,
    /// Set once by the classifier
    pub category: Option<Category>,
    /// Set once by the partitioner
    pub bucket: Option<String>,
}

impl Record {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            fields,
            category: None,
            bucket: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SplitterConfig {
    #[schemars(
        description = "Ordered list of outreach accounts. Order decides which accounts receive the extra record when a category does not divide evenly."
    )]
    #[serde(default = "default_buckets")]
    pub buckets: Vec<String>,

    #[schemars(description = "Exact, case-sensitive header name of the job title column.")]
    #[serde(default = "default_title_field")]
    pub title_field: String,

    #[schemars(
        description = "Prefix for output file names. Defaults to the input file stem, or 'prospects YYYY-MM-DD'."
    )]
    #[serde(default)]
    pub base_name: Option<String>,

    #[schemars(description = "Shuffle seed. Omit for a fresh random split on every run.")]
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_buckets() -> Vec<String> {
    DEFAULT_BUCKETS.iter().map(|b| b.to_string()).collect()
}

fn default_title_field() -> String {
    DEFAULT_TITLE_FIELD.to_string()
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
            title_field: default_title_field(),
            base_name: None,
            seed: None,
        }
    }
}

impl SplitterConfig {
    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buckets: buckets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SplitterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        validate_buckets(&self.buckets)?;

        if self.title_field.trim().is_empty() {
            return Err(SplitterError::ConfigurationError(
                "title field name is blank".to_string(),
            ));
        }

        if let Some(base_name) = &self.base_name {
            if base_name.trim().is_empty() {
                return Err(SplitterError::ConfigurationError(
                    "base name is blank".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Picks the output name prefix: explicit setting, then input file stem, then today's date.
    pub fn resolve_base_name(&self, input: Option<&Path>) -> String {
        if let Some(name) = &self.base_name {
            return name.clone();
        }

        input
            .and_then(|path| path.file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("prospects {}", Local::now().date_naive()))
    }
}

pub fn validate_buckets(buckets: &[String]) -> Result<()> {
    if buckets.is_empty() {
        return Err(SplitterError::ConfigurationError(
            "bucket list is empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (idx, bucket) in buckets.iter().enumerate() {
        if bucket.trim().is_empty() {
            return Err(SplitterError::ConfigurationError(format!(
                "bucket #{} has a blank name",
                idx
            )));
        }
        if bucket.contains(&FORBIDDEN_NAME_CHARS[..]) {
            return Err(SplitterError::ConfigurationError(format!(
                "bucket '{}' contains a path separator",
                bucket.escape_default()
            )));
        }
        if !seen.insert(bucket.as_str()) {
            return Err(SplitterError::ConfigurationError(format!(
                "bucket '{}' is listed more than once",
                bucket
            )));
        }
    }

    Ok(())
}

/// JSON Schema for the configuration file, pretty-printed.
pub fn splitter_config_schema() -> Result<String> {
    let schema = schemars::schema_for!(SplitterConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}
