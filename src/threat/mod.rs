//! Threat engine: the hidden antagonist's alertness.
//!
//! Tension is a bounded scalar driven by player actions and a fixed-rate
//! tick. The behavior tier is always derived from tension and never stored.
//! At pursuing and above the antagonist may answer inaction by planting a
//! new narrative cluster; that request is handed back to the caller as a
//! value.

mod log;

pub use log::{EventLog, TensionEvent};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::geometry::Point;
use crate::objects::SceneObject;

/// Behavior bracket derived from tension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Dormant,  // <= 25
    Alert,    // <= 50
    Pursuing, // <= 75
    Critical, // > 75
}

impl Tier {
    pub fn from_tension(tension: f32) -> Self {
        if tension <= DORMANT_CEILING {
            Self::Dormant
        } else if tension <= ALERT_CEILING {
            Self::Alert
        } else if tension <= PURSUING_CEILING {
            Self::Pursuing
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dormant => "dormant",
            Self::Alert => "alert",
            Self::Pursuing => "pursuing",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why tension changed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionCause {
    ContainerSearch,
    IncriminatingInspection,
    Sprint,
    IdleDecay,
    Other(String),
}

impl TensionCause {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ContainerSearch => "container_search",
            Self::IncriminatingInspection => "incriminating_inspection",
            Self::Sprint => "sprint",
            Self::IdleDecay => "idle_decay",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TensionCause {
    fn from(s: &str) -> Self {
        match s {
            "container_search" => Self::ContainerSearch,
            "incriminating_inspection" => Self::IncriminatingInspection,
            "sprint" => Self::Sprint,
            "idle_decay" => Self::IdleDecay,
            other => Self::Other(other.to_string()),
        }
    }
}

/// What the antagonist does next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Idle,
    Investigate,
    Stalk,
    Attack,
}

impl ActionKind {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Dormant => Self::Idle,
            Tier::Alert => Self::Investigate,
            Tier::Pursuing => Self::Stalk,
            Tier::Critical => Self::Attack,
        }
    }

    /// Duration range in seconds
    fn duration_range(&self) -> (f32, f32) {
        match self {
            Self::Idle => (4.0, 8.0),
            Self::Investigate => (3.0, 6.0),
            Self::Stalk => (5.0, 10.0),
            Self::Attack => (2.0, 4.0),
        }
    }
}

/// Request to plant a new narrative cluster near a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub near: Point,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntagonistAction {
    pub kind: ActionKind,
    pub duration_secs: f32,
    pub cluster_request: Option<ClusterRequest>,
}

/// Polled by presentation and scoring collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatSnapshot {
    pub tension: f32,
    pub tier: Tier,
}

/// Tension plus its diagnostic history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatState {
    tension: f32,
    log: EventLog,
}

impl ThreatState {
    pub fn tension(&self) -> f32 {
        self.tension
    }

    pub fn tier(&self) -> Tier {
        Tier::from_tension(self.tension)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }
}

#[derive(Debug, Clone)]
pub struct ThreatEngine {
    state: ThreatState,
    sprinting: bool,
    clock: f64,
}

impl Default for ThreatEngine {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}

impl ThreatEngine {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            state: ThreatState {
                tension: TENSION_MIN,
                log: EventLog::with_capacity(log_capacity),
            },
            sprinting: false,
            clock: 0.0,
        }
    }

    pub fn state(&self) -> &ThreatState {
        &self.state
    }

    pub fn tension(&self) -> f32 {
        self.state.tension
    }

    pub fn tier(&self) -> Tier {
        self.state.tier()
    }

    pub fn snapshot(&self) -> ThreatSnapshot {
        ThreatSnapshot {
            tension: self.state.tension,
            tier: self.state.tier(),
        }
    }

    pub fn is_sprinting(&self) -> bool {
        self.sprinting
    }

    pub fn set_sprinting(&mut self, sprinting: bool) {
        self.sprinting = sprinting;
    }

    /// Engine clock in seconds, advanced by `tick`
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Change tension by `delta`, clamped to [0, 100]. Returns the change
    /// that actually applied.
    pub fn adjust(&mut self, delta: f32, cause: impl Into<TensionCause>) -> f32 {
        self.apply(delta, cause.into(), false)
    }

    /// Advance the clock. Sprinting costs tension; otherwise tension decays,
    /// except at critical where decay is suspended.
    pub fn tick(&mut self, elapsed_secs: f32) {
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return;
        }
        self.clock += elapsed_secs as f64;

        if self.sprinting {
            self.apply(SPRINT_COST_PER_SEC * elapsed_secs, TensionCause::Sprint, true);
        } else if self.tier() != Tier::Critical && self.state.tension > TENSION_MIN {
            self.apply(
                -IDLE_DECAY_PER_SEC * elapsed_secs,
                TensionCause::IdleDecay,
                true,
            );
        }
    }

    /// Pick the next antagonist action. Critical always attacks; at pursuing
    /// and above a 20% roll also requests a cluster near `reference`.
    pub fn next_action<R: Rng + ?Sized>(&self, reference: Point, rng: &mut R) -> AntagonistAction {
        let tier = self.tier();
        let kind = ActionKind::for_tier(tier);
        let (lo, hi) = kind.duration_range();
        let duration_secs = rng.gen_range(lo..=hi);
        let cluster_request = self.roll_cluster_feedback(reference, rng);

        debug!(
            tier = tier.as_str(),
            action = ?kind,
            duration_secs,
            cluster = cluster_request.is_some(),
            "antagonist action chosen"
        );
        AntagonistAction {
            kind,
            duration_secs,
            cluster_request,
        }
    }

    /// A container was searched: fixed cost, then the cluster roll
    pub fn on_container_searched<R: Rng + ?Sized>(
        &mut self,
        container: &SceneObject,
        reference: Point,
        rng: &mut R,
    ) -> Option<ClusterRequest> {
        self.adjust(CONTAINER_SEARCH_COST, TensionCause::ContainerSearch);
        debug!(container = %container.id, tension = self.tension(), "container searched");
        self.roll_cluster_feedback(reference, rng)
    }

    /// Inspecting incriminating evidence alerts the antagonist; anything
    /// else costs nothing. Returns the applied change.
    pub fn on_object_inspected(&mut self, obj: &SceneObject) -> f32 {
        if obj.is_incriminating() {
            self.adjust(INCRIMINATING_INSPECT_COST, TensionCause::IncriminatingInspection)
        } else {
            0.0
        }
    }

    fn roll_cluster_feedback<R: Rng + ?Sized>(
        &self,
        reference: Point,
        rng: &mut R,
    ) -> Option<ClusterRequest> {
        let tier = self.tier();
        if tier >= Tier::Pursuing && rng.gen_bool(CLUSTER_FEEDBACK_CHANCE) {
            info!(tier = tier.as_str(), x = reference.x, y = reference.y, "antagonist plants a new cluster");
            Some(ClusterRequest {
                near: reference,
                tier,
            })
        } else {
            None
        }
    }

    fn apply(&mut self, delta: f32, cause: TensionCause, coalesce: bool) -> f32 {
        let delta = if delta.is_finite() {
            delta
        } else {
            warn!(cause = cause.as_str(), "non-finite tension delta ignored");
            0.0
        };
        let before = self.state.tension;
        let tier_before = self.state.tier();
        self.state.tension = (before + delta).clamp(TENSION_MIN, TENSION_MAX);
        let applied = self.state.tension - before;

        let event = TensionEvent {
            delta,
            applied,
            cause,
            timestamp: self.clock,
        };
        if coalesce {
            self.state.log.push_coalesced(event);
        } else {
            self.state.log.push(event);
        }

        let tier_after = self.state.tier();
        if tier_after != tier_before {
            info!(
                from = tier_before.as_str(),
                to = tier_after.as_str(),
                tension = self.state.tension,
                "threat tier changed"
            );
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{AppearanceTag, ObjectCategory, ObjectId};
    use crate::seed::{RngStream, SessionSeed};

    fn object(category: ObjectCategory) -> SceneObject {
        SceneObject::new(
            ObjectId(1),
            category,
            AppearanceTag::Weapon,
            "straight razor",
            "One. Two. Three.",
            80,
        )
    }

    fn engine_at(tension: f32) -> ThreatEngine {
        let mut engine = ThreatEngine::default();
        engine.adjust(tension, "setup");
        engine
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Tier::from_tension(0.0), Tier::Dormant);
        assert_eq!(Tier::from_tension(25.0), Tier::Dormant);
        assert_eq!(Tier::from_tension(25.1), Tier::Alert);
        assert_eq!(Tier::from_tension(50.0), Tier::Alert);
        assert_eq!(Tier::from_tension(75.0), Tier::Pursuing);
        assert_eq!(Tier::from_tension(75.01), Tier::Critical);
        assert_eq!(Tier::from_tension(100.0), Tier::Critical);
    }

    #[test]
    fn test_adjust_clamps() {
        let mut engine = ThreatEngine::default();
        assert_eq!(engine.adjust(1000.0, "x"), 100.0);
        assert_eq!(engine.tension(), 100.0);
        assert_eq!(engine.adjust(-5000.0, "x"), -100.0);
        assert_eq!(engine.tension(), 0.0);
    }

    #[test]
    fn test_adjust_logs_in_order() {
        let mut engine = ThreatEngine::default();
        engine.adjust(2.0, "container_search");
        engine.adjust(1.0, "incriminating_inspection");
        engine.adjust(-0.5, "custom_cue");
        let causes: Vec<&str> = engine
            .state()
            .event_log()
            .iter()
            .map(|e| e.cause.as_str())
            .collect();
        assert_eq!(
            causes,
            vec!["container_search", "incriminating_inspection", "custom_cue"]
        );
    }

    #[test]
    fn test_nan_delta_ignored() {
        let mut engine = engine_at(10.0);
        assert_eq!(engine.adjust(f32::NAN, "bad"), 0.0);
        assert_eq!(engine.tension(), 10.0);
    }

    #[test]
    fn test_idle_decay() {
        let mut engine = engine_at(20.0);
        engine.tick(4.0);
        assert!((engine.tension() - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut engine = engine_at(1.0);
        engine.tick(100.0);
        assert_eq!(engine.tension(), 0.0);
    }

    #[test]
    fn test_critical_suspends_decay() {
        let mut engine = engine_at(95.0);
        assert_eq!(engine.tier(), Tier::Critical);
        engine.tick(10.0);
        assert_eq!(engine.tension(), 95.0);
    }

    #[test]
    fn test_sprint_raises_tension() {
        let mut engine = engine_at(10.0);
        engine.set_sprinting(true);
        engine.tick(3.0);
        assert!((engine.tension() - 13.0).abs() < 1e-4);
        engine.set_sprinting(false);
        engine.tick(2.0);
        assert!((engine.tension() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_rate_ticks_coalesce() {
        let mut engine = engine_at(50.0);
        for _ in 0..300 {
            engine.tick(1.0 / TICK_RATE_HZ);
        }
        let log = engine.state().event_log();
        assert_eq!(log.len(), 2, "setup entry + one coalesced decay entry");
        let decay = log.latest().unwrap();
        assert_eq!(decay.cause, TensionCause::IdleDecay);
        assert!((decay.applied + 5.0).abs() < 1e-2);
    }

    #[test]
    fn test_inspection_costs() {
        let mut engine = ThreatEngine::default();
        assert_eq!(engine.on_object_inspected(&object(ObjectCategory::Decoy)), 0.0);
        assert_eq!(engine.on_object_inspected(&object(ObjectCategory::Ambient)), 0.0);
        assert_eq!(
            engine.on_object_inspected(&object(ObjectCategory::Incriminating)),
            1.0
        );
        assert_eq!(engine.tension(), 1.0);
    }

    #[test]
    fn test_five_container_searches_stay_dormant() {
        let mut engine = ThreatEngine::default();
        for _ in 0..5 {
            engine.adjust(2.0, "container_search");
        }
        assert_eq!(engine.tension(), 10.0);
        assert_eq!(engine.tier(), Tier::Dormant);
    }

    #[test]
    fn test_action_per_tier() {
        let mut rng = SessionSeed::new(1).rng(RngStream::Threat);
        let cases = [
            (0.0, ActionKind::Idle),
            (40.0, ActionKind::Investigate),
            (60.0, ActionKind::Stalk),
            (90.0, ActionKind::Attack),
        ];
        for (tension, expected) in cases {
            let engine = engine_at(tension);
            for _ in 0..20 {
                let action = engine.next_action(Point::ZERO, &mut rng);
                assert_eq!(action.kind, expected);
                assert!(action.duration_secs > 0.0);
            }
        }
    }

    #[test]
    fn test_no_cluster_requests_below_pursuing() {
        let mut rng = SessionSeed::new(2).rng(RngStream::Threat);
        let engine = engine_at(50.0);
        for _ in 0..500 {
            assert!(engine.next_action(Point::ZERO, &mut rng).cluster_request.is_none());
        }
    }

    #[test]
    fn test_cluster_request_rate_at_pursuing() {
        let mut rng = SessionSeed::new(3).rng(RngStream::Threat);
        let engine = engine_at(60.0);
        let reference = Point::new(12.0, 34.0);
        let hits = (0..2000)
            .filter_map(|_| engine.next_action(reference, &mut rng).cluster_request)
            .inspect(|req| assert_eq!(req.near, reference))
            .count();
        assert!((300..=500).contains(&hits), "expected ~20%, got {}", hits);
    }

    #[test]
    fn test_container_search_applies_cost_every_time() {
        let mut rng = SessionSeed::new(4).rng(RngStream::Threat);
        let mut engine = ThreatEngine::default();
        let container = object(ObjectCategory::Container);
        for _ in 0..3 {
            assert!(engine
                .on_container_searched(&container, Point::ZERO, &mut rng)
                .is_none());
        }
        assert_eq!(engine.tension(), 6.0);
    }
}
