use crate::entity::TagStore;
use crate::utils::glob_match;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Runtime configuration for the CLI. Every field has a default, so the
/// binary runs without any configuration file at all.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()
            .context("Config: Failed to read configuration file")?;
        settings
            .try_deserialize()
            .context("Config: Invalid configuration")
    }
}

/// Which features are treated as station candidates.
#[derive(Debug, Deserialize, Serialize)]
pub struct StationsConfig {
    #[serde(default = "default_station_filter")]
    pub filter: FeatureFilter,
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            filter: default_station_filter(),
        }
    }
}

/// Which ways are treated as path candidates for network classification.
#[derive(Debug, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_path_filter")]
    pub filter: FeatureFilter,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            filter: default_path_filter(),
        }
    }
}

fn default_station_filter() -> FeatureFilter {
    FeatureFilter::Any {
        any: vec![
            FeatureFilter::Tag(TagMatch {
                tag: "railway".to_string(),
                value: None,
                values: vec![
                    "station".to_string(),
                    "halt".to_string(),
                    "tram_stop".to_string(),
                ],
            }),
            FeatureFilter::Tag(TagMatch {
                tag: "public_transport".to_string(),
                value: Some("station".to_string()),
                values: Vec::new(),
            }),
        ],
    }
}

fn default_path_filter() -> FeatureFilter {
    FeatureFilter::Tag(TagMatch {
        tag: "highway".to_string(),
        value: None,
        values: ["path", "footway", "cycleway", "track", "bridleway", "steps"]
            .iter()
            .map(|v| v.to_string())
            .collect(),
    })
}

/// Declarative tag filter, written in YAML as a single tag match, an
/// `any`/`all`/`not` combinator, or a bare `key: value` map requiring
/// every listed pair.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeatureFilter {
    Tag(TagMatch),
    Any { any: Vec<FeatureFilter> },
    All { all: Vec<FeatureFilter> },
    Not { not: Box<FeatureFilter> },
    Simple(HashMap<String, String>),
}

impl FeatureFilter {
    pub fn matches(&self, tags: &TagStore) -> bool {
        match self {
            FeatureFilter::Tag(tag_match) => tag_match.matches(tags),
            FeatureFilter::Any { any } => any.iter().any(|f| f.matches(tags)),
            FeatureFilter::All { all } => all.iter().all(|f| f.matches(tags)),
            FeatureFilter::Not { not } => !not.matches(tags),
            FeatureFilter::Simple(pairs) => pairs
                .iter()
                .all(|(key, value)| tags.get(key).is_some_and(|actual| actual == value)),
        }
    }
}

/// One tag condition: existence (`tag` alone), exact value (`value`), or
/// any of a list of glob patterns (`values`).
#[derive(Debug, Deserialize, Serialize)]
pub struct TagMatch {
    pub tag: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

impl TagMatch {
    pub fn matches(&self, tags: &TagStore) -> bool {
        let Some(actual) = tags.get(&self.tag) else {
            return false;
        };

        if let Some(value) = &self.value {
            return actual == value;
        }

        if !self.values.is_empty() {
            return self.values.iter().any(|pattern| glob_match(pattern, actual));
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> TagStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_station_filter_accepts_stations() {
        let filter = default_station_filter();
        assert!(filter.matches(&tags(&[("railway", "station")])));
        assert!(filter.matches(&tags(&[("railway", "halt")])));
        assert!(filter.matches(&tags(&[("public_transport", "station")])));
        assert!(!filter.matches(&tags(&[("railway", "level_crossing")])));
        assert!(!filter.matches(&tags(&[])));
    }

    #[test]
    fn default_path_filter_accepts_paths() {
        let filter = default_path_filter();
        assert!(filter.matches(&tags(&[("highway", "footway")])));
        assert!(!filter.matches(&tags(&[("highway", "motorway")])));
    }

    #[test]
    fn tag_match_existence_value_and_globs() {
        let existence = TagMatch {
            tag: "railway".to_string(),
            value: None,
            values: Vec::new(),
        };
        assert!(existence.matches(&tags(&[("railway", "anything")])));

        let glob = TagMatch {
            tag: "railway".to_string(),
            value: None,
            values: vec!["*_stop".to_string()],
        };
        assert!(glob.matches(&tags(&[("railway", "tram_stop")])));
        assert!(!glob.matches(&tags(&[("railway", "station")])));
    }

    #[test]
    fn simple_map_requires_every_pair() {
        let filter = FeatureFilter::Simple(
            [("type", "route"), ("route", "bus")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        assert!(filter.matches(&tags(&[("type", "route"), ("route", "bus"), ("ref", "12")])));
        assert!(!filter.matches(&tags(&[("type", "route")])));
    }

    #[test]
    fn not_combinator_inverts() {
        let filter = FeatureFilter::Not {
            not: Box::new(FeatureFilter::Tag(TagMatch {
                tag: "access".to_string(),
                value: Some("private".to_string()),
                values: Vec::new(),
            })),
        };
        assert!(filter.matches(&tags(&[])));
        assert!(!filter.matches(&tags(&[("access", "private")])));
    }

    #[test]
    fn loads_yaml_and_fills_defaults() {
        let file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        std::fs::write(
            file.path(),
            r#"
stations:
  filter:
    tag: railway
    value: station
"#,
        )
        .unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        assert!(
            config
                .stations
                .filter
                .matches(&tags(&[("railway", "station")]))
        );
        assert!(!config.stations.filter.matches(&tags(&[("railway", "halt")])));
        // The paths section falls back to its default.
        assert!(config.paths.filter.matches(&tags(&[("highway", "track")])));
    }
}
