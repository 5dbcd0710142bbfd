//! Per-theme capability tables and authored cluster templates.
//!
//! The registry is immutable once built and shared through `Arc`; nothing
//! in the crate holds a global theme table. Landmark and anchor coordinates
//! are normalized to [0,1]^2 and mapped into the session bounds at
//! placement time.

mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::constants::{CLUSTER_MAX_OFFSET, CONTAINER_COUNT};
use crate::error::ConfigError;
use crate::geometry::Point;
use crate::objects::AppearanceTag;

/// Template reserved for the contents of an opened container
pub const CONTAINER_CACHE_TEMPLATE: &str = "container_cache";

/// One entry of a theme's ambient catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientEntry {
    pub descriptor: String,
    pub appearance: AppearanceTag,
}

/// Capability table for a single theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaRules {
    pub theme: String,
    pub allowed_appearances: BTreeSet<AppearanceTag>,
    pub ambient_catalog: Vec<AmbientEntry>,
    pub container_catalog: Vec<String>,
    /// Normalized container siting points
    pub landmarks: Vec<Point>,
    /// Normalized candidate origins for narrative clusters
    pub cluster_anchors: Vec<Point>,
    /// Template ids this theme draws clusters from, in assignment order
    pub cluster_templates: Vec<String>,
}

impl AreaRules {
    pub fn allows(&self, tag: AppearanceTag) -> bool {
        self.allowed_appearances.contains(&tag)
    }

    /// Appearances an incriminating or decoy object may take
    pub fn evidence_appearances(&self) -> Vec<AppearanceTag> {
        self.allowed_appearances
            .iter()
            .copied()
            .filter(|t| *t != AppearanceTag::Container)
            .collect()
    }

    fn validate(&self, templates: &BTreeMap<String, ClusterTemplate>) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAreaRules {
            theme: self.theme.clone(),
            reason: reason.to_string(),
        };

        if self.evidence_appearances().is_empty() {
            return Err(invalid("allowed appearances must include a non-container tag"));
        }
        if self.ambient_catalog.is_empty() {
            return Err(invalid("ambient catalog is empty"));
        }
        if self.container_catalog.is_empty() {
            return Err(invalid("container catalog is empty"));
        }
        if self.landmarks.len() < CONTAINER_COUNT {
            return Err(invalid("fewer landmarks than containers per session"));
        }
        if self.cluster_anchors.is_empty() {
            return Err(invalid("no cluster anchor candidates"));
        }
        let normalized = |p: &Point| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y);
        if !self.landmarks.iter().chain(&self.cluster_anchors).all(normalized) {
            return Err(invalid("landmarks and anchors must be normalized to [0,1]"));
        }
        if self.cluster_templates.is_empty() {
            return Err(invalid("no cluster templates"));
        }
        for id in &self.cluster_templates {
            if !templates.contains_key(id) {
                return Err(ConfigError::UnknownClusterTemplate(id.clone()));
            }
        }
        Ok(())
    }
}

/// Authored narrative grouping: fixed offsets from an anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTemplate {
    pub id: String,
    pub description: String,
    pub offsets: Vec<Point>,
}

impl ClusterTemplate {
    pub fn slot_count(&self) -> usize {
        self.offsets.len()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.offsets.is_empty() {
            return Err(ConfigError::InvalidClusterTemplate {
                id: self.id.clone(),
                reason: "template has no member offsets".into(),
            });
        }
        if let Some(far) = self
            .offsets
            .iter()
            .find(|o| !o.is_finite() || o.length() > CLUSTER_MAX_OFFSET)
        {
            return Err(ConfigError::InvalidClusterTemplate {
                id: self.id.clone(),
                reason: format!(
                    "offset ({:.1}, {:.1}) exceeds {} units",
                    far.x, far.y, CLUSTER_MAX_OFFSET
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    themes: Vec<AreaRules>,
    cluster_templates: Vec<ClusterTemplate>,
}

/// Immutable theme registry injected into every component
#[derive(Debug, Clone)]
pub struct AreaRegistry {
    themes: BTreeMap<String, AreaRules>,
    templates: BTreeMap<String, ClusterTemplate>,
}

impl AreaRegistry {
    /// Validate and build a registry
    pub fn new(
        themes: Vec<AreaRules>,
        templates: Vec<ClusterTemplate>,
    ) -> Result<Self, ConfigError> {
        let mut template_map = BTreeMap::new();
        for template in templates {
            template.validate()?;
            let id = template.id.clone();
            if template_map.insert(id.clone(), template).is_some() {
                return Err(ConfigError::InvalidClusterTemplate {
                    id,
                    reason: "duplicate template id".into(),
                });
            }
        }
        if !template_map.contains_key(CONTAINER_CACHE_TEMPLATE) {
            return Err(ConfigError::UnknownClusterTemplate(
                CONTAINER_CACHE_TEMPLATE.into(),
            ));
        }

        let mut theme_map = BTreeMap::new();
        for rules in themes {
            rules.validate(&template_map)?;
            let key = rules.theme.clone();
            if theme_map.insert(key.clone(), rules).is_some() {
                return Err(ConfigError::InvalidAreaRules {
                    theme: key,
                    reason: "duplicate theme key".into(),
                });
            }
        }

        debug!(
            themes = theme_map.len(),
            templates = template_map.len(),
            "area registry built"
        );
        Ok(Self {
            themes: theme_map,
            templates: template_map,
        })
    }

    /// Built-in themes: park, docks, alley, manor
    pub fn builtin() -> Arc<Self> {
        let registry = Self {
            themes: builtin::themes()
                .into_iter()
                .map(|r| (r.theme.clone(), r))
                .collect(),
            templates: builtin::cluster_templates()
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
        };
        Arc::new(registry)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::new(file.themes, file.cluster_templates)
    }

    /// Same layout `from_json_str` reads
    pub fn to_json(&self) -> Result<String, ConfigError> {
        let file = RegistryFile {
            themes: self.themes.values().cloned().collect(),
            cluster_templates: self.templates.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn rules(&self, theme: &str) -> Result<&AreaRules, ConfigError> {
        self.themes
            .get(theme)
            .ok_or_else(|| ConfigError::UnknownTheme(theme.to_string()))
    }

    pub fn template(&self, id: &str) -> Result<&ClusterTemplate, ConfigError> {
        self.templates
            .get(id)
            .ok_or_else(|| ConfigError::UnknownClusterTemplate(id.to_string()))
    }

    pub fn theme_keys(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }
}
