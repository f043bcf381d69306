use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How several property criteria combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// A row matching any criterion is kept. This is the historical behavior
    /// of the format's reference tools and stays the default.
    #[default]
    Union,
    /// A row must match every criterion.
    Intersection,
}

/// How records from different tiles are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StitchMode {
    /// Records of one feature table with identical attribute signatures are
    /// merged into a single multi-part record. Text records are never merged.
    #[default]
    MergeBySignature,
    /// Every per-tile record is kept as is.
    Append,
}

/// Settings shared by every unit of work in a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    pub filter_mode: FilterMode,
    pub stitch_mode: StitchMode,
    /// Run (tile, level) units on the rayon pool.
    pub parallel: bool,
    /// Separator between the parts of a feature tag.
    pub tag_separator: String,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::Union,
            stitch_mode: StitchMode::MergeBySignature,
            parallel: true,
            tag_separator: "; ".to_string(),
        }
    }
}

impl MosaicConfig {
    /// Reads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Reads a config from a JSON string.
    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("Failed to parse config JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_union_semantics() {
        let config = MosaicConfig::default();
        assert_eq!(config.filter_mode, FilterMode::Union);
        assert_eq!(config.stitch_mode, StitchMode::MergeBySignature);
        assert!(config.parallel);
        assert_eq!(config.tag_separator, "; ");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = MosaicConfig::from_json_str(r#"{ "filter_mode": "intersection", "parallel": false }"#).unwrap();
        assert_eq!(config.filter_mode, FilterMode::Intersection);
        assert!(!config.parallel);
        assert_eq!(config.stitch_mode, StitchMode::MergeBySignature);
        assert_eq!(config.tag_separator, "; ");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(MosaicConfig::from_json_str(r#"{ "stitch_mode": "dedupe" }"#).is_err());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mosaic.json");
        std::fs::write(&path, r#"{ "stitch_mode": "append", "tag_separator": " | " }"#).unwrap();
        let config = MosaicConfig::from_json_file(&path).unwrap();
        assert_eq!(config.stitch_mode, StitchMode::Append);
        assert_eq!(config.tag_separator, " | ");
    }
}
