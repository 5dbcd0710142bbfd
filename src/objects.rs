//! Scene object records.
//!
//! Objects are created by the catalog, positioned by the composer and have
//! their flags flipped by the inspection collaborator through the session.
//! Category is fixed at creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::constants::EVIDENCE_DECAY_FLOOR;
use crate::geometry::Point;

/// Session-unique object id (never reused within a session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Narrative cluster id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster#{}", self.0)
    }
}

/// What role an object plays in the investigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Incriminating, // tied to the antagonist, cluster-only
    Decoy,         // looks incriminating, low value
    Ambient,       // texture, zero value
    Container,     // opened lazily into sub-objects
}

impl ObjectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incriminating => "incriminating",
            Self::Decoy => "decoy",
            Self::Ambient => "ambient",
            Self::Container => "container",
        }
    }
}

/// Visual appearance class. Decoys share the incriminating set so they can
/// masquerade as evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppearanceTag {
    Weapon,
    Garment,
    Tool,
    Organic,
    Container,
}

impl AppearanceTag {
    pub fn all() -> &'static [AppearanceTag] {
        &[
            AppearanceTag::Weapon,
            AppearanceTag::Garment,
            AppearanceTag::Tool,
            AppearanceTag::Organic,
            AppearanceTag::Container,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Garment => "garment",
            Self::Tool => "tool",
            Self::Organic => "organic",
            Self::Container => "container",
        }
    }
}

/// A single object in the scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    category: ObjectCategory,
    pub appearance: AppearanceTag,
    pub descriptor: String,
    pub narrative: String,
    pub evidence_score: u8,
    pub position: Point,
    /// Generated on first open; shared with the resolver cache
    pub contents: Option<Arc<[SceneObject]>>,
    pub opened: bool,
    pub collected: bool,
    pub cluster: Option<ClusterId>,
}

impl SceneObject {
    pub fn new(
        id: ObjectId,
        category: ObjectCategory,
        appearance: AppearanceTag,
        descriptor: impl Into<String>,
        narrative: impl Into<String>,
        evidence_score: u8,
    ) -> Self {
        Self {
            id,
            category,
            appearance,
            descriptor: descriptor.into(),
            narrative: narrative.into(),
            evidence_score: evidence_score.min(100),
            position: Point::ZERO,
            contents: None,
            opened: false,
            collected: false,
            cluster: None,
        }
    }

    pub fn category(&self) -> ObjectCategory {
        self.category
    }

    pub fn is_incriminating(&self) -> bool {
        self.category == ObjectCategory::Incriminating
    }

    pub fn is_container(&self) -> bool {
        self.category == ObjectCategory::Container
    }

    /// Apply time decay to incriminating evidence. Other categories keep
    /// their score. Returns the new score.
    pub fn decay_evidence(&mut self, points: u8) -> u8 {
        if self.is_incriminating() {
            self.evidence_score = self
                .evidence_score
                .saturating_sub(points)
                .max(EVIDENCE_DECAY_FLOOR);
        }
        self.evidence_score
    }

    /// Number of sentences in the narrative (terminal punctuation count)
    pub fn sentence_count(&self) -> usize {
        self.narrative
            .chars()
            .filter(|c| matches!(c, '.' | '!' | '?'))
            .count()
    }
}
