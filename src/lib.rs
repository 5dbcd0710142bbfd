//! Noir Procedural Core
//!
//! Deterministic scene population and threat escalation for a top-down
//! investigation game:
//! - Content catalog (quota-constrained object sets per difficulty and theme)
//! - Scene composer (narrative clusters, landmark siting, decoy rings,
//!   Poisson-disk fill)
//! - Threat engine (bounded tension, derived behavior tiers, antagonist
//!   cluster requests)
//! - Container resolver (lazy, idempotent container contents)
//! - Session orchestration and a Bevy plugin for ECS hosts
//! - Monte-Carlo survey of placement health across seeds and difficulties

pub mod areas;
pub mod balance;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod objects;
pub mod plugin;
pub mod resolver;
pub mod scene;
pub mod seed;
pub mod session;
pub mod threat;

pub use areas::AreaRegistry;
pub use error::{ConfigError, InteractionError};
pub use session::{EngineConfig, InteractionEvent, Session, SessionConfig};
