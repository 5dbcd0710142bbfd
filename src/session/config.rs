use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::geometry::Rect;

/// Per-session inputs supplied by the host (usually from the level file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub difficulty_level: u32,
    pub theme: String,
    pub bounds: Rect,
    #[serde(default)]
    pub exclusion_regions: Vec<Rect>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty_level: 0,
            theme: "park".into(),
            bounds: Rect::new(0.0, 0.0, 1024.0, 768.0),
            exclusion_regions: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Shape checks only; the theme is resolved against the registry later
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bounds.is_well_formed() {
            return Err(ConfigError::MalformedBounds(format!("{:?}", self.bounds)));
        }
        for (index, region) in self.exclusion_regions.iter().enumerate() {
            if !region.is_well_formed() {
                return Err(ConfigError::MalformedExclusion {
                    index,
                    reason: format!("{:?}", region),
                });
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Engine-wide tuning shared by every session a host runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub seed: u64,
    pub tick_rate_hz: f32,
    pub event_log_capacity: usize,
    pub evidence_decay_period_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate_hz: TICK_RATE_HZ,
            event_log_capacity: EVENT_LOG_CAPACITY,
            evidence_decay_period_secs: EVIDENCE_DECAY_PERIOD_SECS,
        }
    }
}

impl EngineConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(ConfigError::InvalidEngineConfig(format!(
                "tick rate must be positive, got {}",
                self.tick_rate_hz
            )));
        }
        if !(self.evidence_decay_period_secs.is_finite() && self.evidence_decay_period_secs > 0.0) {
            return Err(ConfigError::InvalidEngineConfig(format!(
                "evidence decay period must be positive, got {}",
                self.evidence_decay_period_secs
            )));
        }
        Ok(())
    }

    /// Fixed step in seconds
    pub fn step_secs(&self) -> f32 {
        1.0 / self.tick_rate_hz
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_from_json() {
        let json = r#"{
            "difficulty_level": 3,
            "theme": "docks",
            "bounds": {"x": 0.0, "y": 0.0, "width": 800.0, "height": 600.0},
            "exclusion_regions": [{"x": 100.0, "y": 100.0, "width": 50.0, "height": 50.0}]
        }"#;
        let config = SessionConfig::from_json_str(json).unwrap();
        assert_eq!(config.difficulty_level, 3);
        assert_eq!(config.theme, "docks");
        assert_eq!(config.exclusion_regions.len(), 1);
    }

    #[test]
    fn test_exclusions_optional() {
        let json = r#"{"difficulty_level": 0, "theme": "park",
            "bounds": {"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0}}"#;
        let config = SessionConfig::from_json_str(json).unwrap();
        assert!(config.exclusion_regions.is_empty());
    }

    #[test]
    fn test_negative_bounds_rejected() {
        let config = SessionConfig {
            bounds: Rect::new(0.0, 0.0, -5.0, 10.0),
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MalformedBounds(_))));
    }

    #[test]
    fn test_bad_exclusion_index_reported() {
        let config = SessionConfig {
            exclusion_regions: vec![
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(f32::NAN, 0.0, 10.0, 10.0),
            ],
            ..SessionConfig::default()
        };
        match config.validate() {
            Err(ConfigError::MalformedExclusion { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected MalformedExclusion, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_json() {
        assert!(matches!(
            SessionConfig::from_json_str("{not json"),
            Err(ConfigError::Serialization(_))
        ));
    }

    #[test]
    fn test_engine_config_roundtrip_and_defaults() {
        let config = EngineConfig::with_seed(7);
        assert_eq!(config.tick_rate_hz, 30.0);
        assert!((config.step_secs() - 1.0 / 30.0).abs() < 1e-6);
        let restored = EngineConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_engine_config_rejects_zero_tick_rate() {
        let config = EngineConfig {
            tick_rate_hz: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEngineConfig(_))
        ));
    }
}
