//! Centralized tuning constants for the noir procedural core.
//!
//! Quotas, spatial radii and tension costs live here so the catalog, the
//! composer and the threat engine agree on a single source of truth.
//! Per-theme data (landmarks, anchors, catalogs) stays in `areas`.

// =====================================================
// Content quotas
// =====================================================

/// Incriminating objects at difficulty 0: total = BASE + difficulty
pub const BASE_INCRIMINATING: usize = 5;

/// Decoys at difficulty 0: total = BASE + DECOY_PER_LEVEL * difficulty
pub const BASE_DECOYS: usize = 10;

/// Extra decoys added per difficulty level
pub const DECOY_PER_LEVEL: usize = 2;

/// Containers per session, independent of difficulty
pub const CONTAINER_COUNT: usize = 7;

/// Target object count per session; ambient objects fill the remainder
pub const TARGET_OBJECT_COUNT: usize = 50;

/// Evidence score ranges (inclusive)
pub const INCRIMINATING_SCORE_MIN: u8 = 70;
pub const INCRIMINATING_SCORE_MAX: u8 = 100;
pub const DECOY_SCORE_MIN: u8 = 10;
pub const DECOY_SCORE_MAX: u8 = 30;

/// Incriminating evidence never decays below this score
pub const EVIDENCE_DECAY_FLOOR: u8 = 10;

/// Container contents: 1..=MAX objects, rolled per container
pub const CONTAINER_CONTENTS_MIN: usize = 1;
pub const CONTAINER_CONTENTS_MAX: usize = 3;

/// Container content draw weights (incriminating / decoy / ambient)
pub const CONTENTS_INCRIMINATING_CHANCE: f64 = 0.4;
pub const CONTENTS_DECOY_CHANCE: f64 = 0.4;

// =====================================================
// Spatial placement
// =====================================================

/// Maximum distance of a cluster member from its anchor
pub const CLUSTER_MAX_OFFSET: f32 = 30.0;

/// Minimum distance between two cluster anchors (two radii plus a margin)
pub const CLUSTER_ANCHOR_SEPARATION: f32 = 2.0 * CLUSTER_MAX_OFFSET + 4.0;

/// Random anchor attempts before falling back to the least crowded candidate
pub const CLUSTER_ANCHOR_RETRIES: u32 = 100;

/// Decoy ring around a cluster anchor
pub const DECOY_RING_MIN: f32 = 64.0;
pub const DECOY_RING_MAX: f32 = 128.0;

/// Decoy placement attempts before falling through to ambient fill
pub const DECOY_RETRIES: u32 = 20;

/// Poisson-disk minimum separation between ambient samples
pub const POISSON_MIN_SEPARATION: f32 = 32.0;

/// Candidates tried around an active Poisson point before it retires
pub const POISSON_CANDIDATES: u32 = 30;

/// Uniform random fallback attempts before centering in bounds
pub const FALLBACK_RETRIES: u32 = 100;

// =====================================================
// Threat
// =====================================================

/// Tension bounds
pub const TENSION_MIN: f32 = 0.0;
pub const TENSION_MAX: f32 = 100.0;

/// Upper (inclusive) tension for each tier below critical
pub const DORMANT_CEILING: f32 = 25.0;
pub const ALERT_CEILING: f32 = 50.0;
pub const PURSUING_CEILING: f32 = 75.0;

/// Fixed tension costs
pub const CONTAINER_SEARCH_COST: f32 = 2.0;
pub const INCRIMINATING_INSPECT_COST: f32 = 1.0;
pub const SPRINT_COST_PER_SEC: f32 = 1.0;
pub const IDLE_DECAY_PER_SEC: f32 = 0.5;

/// Chance that an antagonist at pursuing or above plants a new cluster
pub const CLUSTER_FEEDBACK_CHANCE: f64 = 0.2;

/// Default number of tension events kept for diagnostics
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Recommended fixed tick rate for idle decay
pub const TICK_RATE_HZ: f32 = 30.0;

/// Conceptual duration of a container search (input is blocked by the host)
pub const CONTAINER_SEARCH_WINDOW: f32 = 5.0;

/// Seconds of session time per point of evidence decay
pub const EVIDENCE_DECAY_PERIOD_SECS: f32 = 60.0;
