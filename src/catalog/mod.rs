//! Content catalog: quota-constrained object sets per session.
//!
//! Quotas scale with difficulty while the session target stays at ~50
//! objects, so ambient objects absorb the difference and bottom out at zero
//! for high difficulty levels.

pub mod narrative;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::areas::{AreaRegistry, AreaRules};
use crate::constants::*;
use crate::error::ConfigError;
use crate::objects::{AppearanceTag, ObjectCategory, ObjectId, SceneObject};

/// Object counts for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    pub incriminating: usize,
    pub decoy: usize,
    pub container: usize,
    pub ambient: usize,
}

impl Quotas {
    pub fn for_difficulty(difficulty_level: u32) -> Self {
        let level = difficulty_level as usize;
        let incriminating = BASE_INCRIMINATING.saturating_add(level);
        let decoy = BASE_DECOYS.saturating_add(DECOY_PER_LEVEL.saturating_mul(level));
        let container = CONTAINER_COUNT;
        let ambient = TARGET_OBJECT_COUNT
            .saturating_sub(incriminating.saturating_add(decoy).saturating_add(container));
        Self {
            incriminating,
            decoy,
            container,
            ambient,
        }
    }

    pub fn total(&self) -> usize {
        self.incriminating + self.decoy + self.container + self.ambient
    }

    pub fn count(&self, category: ObjectCategory) -> usize {
        match category {
            ObjectCategory::Incriminating => self.incriminating,
            ObjectCategory::Decoy => self.decoy,
            ObjectCategory::Container => self.container,
            ObjectCategory::Ambient => self.ambient,
        }
    }
}

/// Generates object records. Owns the id counter so ids stay unique for
/// the whole session, including objects created after the initial set.
#[derive(Debug, Clone)]
pub struct ContentCatalog {
    registry: Arc<AreaRegistry>,
    next_id: u32,
}

impl ContentCatalog {
    pub fn new(registry: Arc<AreaRegistry>) -> Self {
        Self {
            registry,
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &Arc<AreaRegistry> {
        &self.registry
    }

    /// Full object set for a session: incriminating, decoys, containers,
    /// ambient, in that order.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        difficulty_level: u32,
        theme: &str,
        rng: &mut R,
    ) -> Result<Vec<SceneObject>, ConfigError> {
        let registry = Arc::clone(&self.registry);
        let rules = registry.rules(theme)?;
        let quotas = Quotas::for_difficulty(difficulty_level);

        let mut objects = Vec::with_capacity(quotas.total());
        for _ in 0..quotas.incriminating {
            objects.push(self.make_incriminating(rules, rng));
        }
        for _ in 0..quotas.decoy {
            objects.push(self.make_decoy(rules, rng));
        }
        for _ in 0..quotas.container {
            objects.push(self.make_container(rules, rng));
        }
        for _ in 0..quotas.ambient {
            objects.push(self.make_ambient(rules, rng));
        }

        info!(
            theme,
            difficulty_level,
            incriminating = quotas.incriminating,
            decoy = quotas.decoy,
            container = quotas.container,
            ambient = quotas.ambient,
            "catalog generated"
        );
        Ok(objects)
    }

    /// 1-3 objects for an opened container, outside session quotas.
    /// Each draw is independent: 40% incriminating, 40% decoy, 20% ambient.
    pub fn generate_container_contents<R: Rng + ?Sized>(
        &mut self,
        theme: &str,
        rng: &mut R,
    ) -> Result<Vec<SceneObject>, ConfigError> {
        let registry = Arc::clone(&self.registry);
        let rules = registry.rules(theme)?;
        let count = rng.gen_range(CONTAINER_CONTENTS_MIN..=CONTAINER_CONTENTS_MAX);

        let contents: Vec<SceneObject> = (0..count)
            .map(|_| {
                let roll: f64 = rng.gen();
                if roll < CONTENTS_INCRIMINATING_CHANCE {
                    self.make_incriminating(rules, rng)
                } else if roll < CONTENTS_INCRIMINATING_CHANCE + CONTENTS_DECOY_CHANCE {
                    self.make_decoy(rules, rng)
                } else {
                    self.make_ambient(rules, rng)
                }
            })
            .collect();

        debug!(theme, count, "container contents generated");
        Ok(contents)
    }

    /// Fresh incriminating objects for a cluster planted mid-session
    pub fn generate_incriminating<R: Rng + ?Sized>(
        &mut self,
        theme: &str,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<SceneObject>, ConfigError> {
        let registry = Arc::clone(&self.registry);
        let rules = registry.rules(theme)?;
        Ok((0..count)
            .map(|_| self.make_incriminating(rules, rng))
            .collect())
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    fn evidence_look<R: Rng + ?Sized>(rules: &AreaRules, rng: &mut R) -> (AppearanceTag, &'static str) {
        let tags = rules.evidence_appearances();
        // Registry validation guarantees at least one non-container tag
        let tag = tags.choose(rng).copied().unwrap_or(AppearanceTag::Weapon);
        let descriptor = narrative::evidence_descriptors(tag)
            .choose(rng)
            .copied()
            .unwrap_or("object");
        (tag, descriptor)
    }

    fn make_incriminating<R: Rng + ?Sized>(&mut self, rules: &AreaRules, rng: &mut R) -> SceneObject {
        let (tag, descriptor) = Self::evidence_look(rules, rng);
        let score = rng.gen_range(INCRIMINATING_SCORE_MIN..=INCRIMINATING_SCORE_MAX);
        let text = narrative::incriminating(descriptor, &rules.theme, rng);
        SceneObject::new(
            self.allocate_id(),
            ObjectCategory::Incriminating,
            tag,
            descriptor,
            text,
            score,
        )
    }

    fn make_decoy<R: Rng + ?Sized>(&mut self, rules: &AreaRules, rng: &mut R) -> SceneObject {
        let (tag, descriptor) = Self::evidence_look(rules, rng);
        let score = rng.gen_range(DECOY_SCORE_MIN..=DECOY_SCORE_MAX);
        let text = narrative::decoy(descriptor, &rules.theme, rng);
        SceneObject::new(
            self.allocate_id(),
            ObjectCategory::Decoy,
            tag,
            descriptor,
            text,
            score,
        )
    }

    fn make_ambient<R: Rng + ?Sized>(&mut self, rules: &AreaRules, rng: &mut R) -> SceneObject {
        let (descriptor, tag) = match rules.ambient_catalog.choose(rng) {
            Some(entry) => (entry.descriptor.clone(), entry.appearance),
            None => ("debris".to_string(), AppearanceTag::Organic),
        };
        let text = narrative::ambient(&descriptor, &rules.theme, rng);
        SceneObject::new(
            self.allocate_id(),
            ObjectCategory::Ambient,
            tag,
            descriptor,
            text,
            0,
        )
    }

    fn make_container<R: Rng + ?Sized>(&mut self, rules: &AreaRules, rng: &mut R) -> SceneObject {
        let descriptor = rules
            .container_catalog
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "box".to_string());
        let text = narrative::container(&descriptor, &rules.theme, rng);
        SceneObject::new(
            self.allocate_id(),
            ObjectCategory::Container,
            AppearanceTag::Container,
            descriptor,
            text,
            0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{RngStream, SessionSeed};
    use std::collections::HashSet;

    fn catalog() -> ContentCatalog {
        ContentCatalog::new(AreaRegistry::builtin())
    }

    fn count(objects: &[SceneObject], category: ObjectCategory) -> usize {
        objects.iter().filter(|o| o.category() == category).count()
    }

    #[test]
    fn test_quotas_difficulty_three() {
        let q = Quotas::for_difficulty(3);
        assert_eq!(
            (q.incriminating, q.decoy, q.container, q.ambient),
            (8, 16, 7, 19)
        );
        assert_eq!(q.total(), 50);
    }

    #[test]
    fn test_ambient_clamps_to_zero() {
        let q = Quotas::for_difficulty(20);
        assert_eq!(q.ambient, 0);
        assert_eq!(q.incriminating, 25);
        assert_eq!(q.decoy, 50);
        assert!(q.total() > TARGET_OBJECT_COUNT);
    }

    #[test]
    fn test_generate_matches_quotas() {
        let mut rng = SessionSeed::new(1).rng(RngStream::Catalog);
        let objects = catalog().generate(3, "docks", &mut rng).unwrap();
        assert_eq!(count(&objects, ObjectCategory::Incriminating), 8);
        assert_eq!(count(&objects, ObjectCategory::Decoy), 16);
        assert_eq!(count(&objects, ObjectCategory::Container), 7);
        assert_eq!(count(&objects, ObjectCategory::Ambient), 19);
    }

    #[test]
    fn test_scores_by_category() {
        let mut rng = SessionSeed::new(2).rng(RngStream::Catalog);
        let objects = catalog().generate(5, "alley", &mut rng).unwrap();
        for obj in &objects {
            match obj.category() {
                ObjectCategory::Incriminating => assert!((70..=100).contains(&obj.evidence_score)),
                ObjectCategory::Decoy => assert!((10..=30).contains(&obj.evidence_score)),
                ObjectCategory::Ambient | ObjectCategory::Container => {
                    assert_eq!(obj.evidence_score, 0)
                }
            }
        }
    }

    #[test]
    fn test_evidence_tags_come_from_theme() {
        let mut rng = SessionSeed::new(4).rng(RngStream::Catalog);
        let registry = AreaRegistry::builtin();
        let rules = registry.rules("park").unwrap();
        let objects = catalog().generate(2, "park", &mut rng).unwrap();
        for obj in &objects {
            assert!(rules.allows(obj.appearance), "{:?} not allowed", obj.appearance);
        }
        assert!(objects
            .iter()
            .filter(|o| !o.is_container())
            .all(|o| o.appearance != AppearanceTag::Container));
    }

    #[test]
    fn test_ids_are_unique_across_calls() {
        let mut rng = SessionSeed::new(5).rng(RngStream::Catalog);
        let mut cat = catalog();
        let mut ids = HashSet::new();
        for obj in cat.generate(0, "park", &mut rng).unwrap() {
            assert!(ids.insert(obj.id));
        }
        for obj in cat.generate_container_contents("park", &mut rng).unwrap() {
            assert!(ids.insert(obj.id));
        }
        for obj in cat.generate_incriminating("park", 3, &mut rng).unwrap() {
            assert!(ids.insert(obj.id));
        }
    }

    #[test]
    fn test_container_contents_count_and_mix() {
        let mut rng = SessionSeed::new(6).rng(RngStream::Containers);
        let mut cat = catalog();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let contents = cat.generate_container_contents("docks", &mut rng).unwrap();
            assert!((1..=3).contains(&contents.len()));
            for obj in &contents {
                assert!(!obj.is_container());
                seen.insert(obj.category());
            }
        }
        assert_eq!(seen.len(), 3, "All three content categories should appear");
    }

    #[test]
    fn test_unknown_theme_is_fatal() {
        let mut rng = SessionSeed::new(7).rng(RngStream::Catalog);
        let err = catalog().generate(0, "atlantis", &mut rng).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTheme(_)));
        let err = catalog()
            .generate_container_contents("atlantis", &mut rng)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTheme(_)));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let seed = SessionSeed::new(99);
        let a = catalog()
            .generate(1, "manor", &mut seed.rng(RngStream::Catalog))
            .unwrap();
        let b = catalog()
            .generate(1, "manor", &mut seed.rng(RngStream::Catalog))
            .unwrap();
        let describe = |v: &[SceneObject]| {
            v.iter()
                .map(|o| (o.id, o.descriptor.clone(), o.evidence_score))
                .collect::<Vec<_>>()
        };
        assert_eq!(describe(&a), describe(&b));
    }
}
