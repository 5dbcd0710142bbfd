//! Session orchestration.
//!
//! A `Session` wires the catalog, composer, threat engine and container
//! resolver together for one playthrough. It routes interaction events,
//! runs the fixed-rate tick, fulfils the antagonist's cluster requests and
//! queues placement updates for the presentation layer.

pub mod config;

pub use config::{EngineConfig, SessionConfig};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::areas::AreaRegistry;
use crate::catalog::ContentCatalog;
use crate::error::{ConfigError, InteractionError};
use crate::geometry::Point;
use crate::objects::{ClusterId, ObjectId, SceneObject};
use crate::resolver::ContainerResolver;
use crate::scene::{PlacementUpdate, SceneComposer, ValidityReport};
use crate::seed::{RngStream, SceneRng, SessionSeed};
use crate::threat::{AntagonistAction, ClusterRequest, ThreatEngine, ThreatSnapshot};

/// Player interactions routed in from the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "snake_case")]
pub enum InteractionEvent {
    ObjectInspected(ObjectId),
    ContainerOpened(ObjectId),
    ObjectCollected(ObjectId),
    SprintStarted,
    SprintStopped,
}

/// What handling one interaction changed
#[derive(Debug, Clone, Default)]
pub struct InteractionOutcome {
    /// Tension change actually applied by this interaction
    pub tension_delta: f32,
    /// Contents of an opened container (same slice on every open)
    pub contents: Option<Arc<[SceneObject]>>,
    /// Cluster planted by the antagonist in response
    pub planted: Option<ClusterId>,
}

/// Compact end-of-frame view, suitable for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub theme: String,
    pub difficulty_level: u32,
    pub seed: u64,
    pub elapsed_secs: f64,
    pub object_count: usize,
    pub cluster_count: usize,
    pub containers_opened: usize,
    pub collected: usize,
    pub threat: ThreatSnapshot,
    pub report: ValidityReport,
}

pub struct Session {
    config: SessionConfig,
    engine: EngineConfig,
    registry: Arc<AreaRegistry>,
    catalog: ContentCatalog,
    composer: SceneComposer,
    threat: ThreatEngine,
    resolver: ContainerResolver,
    objects: BTreeMap<ObjectId, SceneObject>,
    catalog_rng: SceneRng,
    composer_rng: SceneRng,
    threat_rng: SceneRng,
    container_rng: SceneRng,
    accumulator: f32,
    decay_elapsed: f32,
    pending: VecDeque<PlacementUpdate>,
    report: ValidityReport,
}

impl Session {
    /// Validate the config, generate the object set and lay out the scene.
    /// The initial placement is the first queued update.
    pub fn start(
        registry: Arc<AreaRegistry>,
        config: SessionConfig,
        engine: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        engine.validate()?;
        registry.rules(&config.theme)?;

        let seed = SessionSeed::new(engine.seed);
        let mut catalog_rng = seed.rng(RngStream::Catalog);
        let mut composer_rng = seed.rng(RngStream::Composer);

        let mut catalog = ContentCatalog::new(Arc::clone(&registry));
        let mut composer = SceneComposer::new(Arc::clone(&registry), &config.theme)?;
        let resolver = ContainerResolver::new(&registry, &config.theme)?;

        let generated = catalog.generate(config.difficulty_level, &config.theme, &mut catalog_rng)?;
        let update = composer.place(
            &generated,
            config.bounds,
            &config.exclusion_regions,
            &mut composer_rng,
        );

        let mut session = Self {
            threat: ThreatEngine::new(engine.event_log_capacity),
            threat_rng: seed.rng(RngStream::Threat),
            container_rng: seed.rng(RngStream::Containers),
            config,
            engine,
            registry,
            catalog,
            composer,
            resolver,
            objects: BTreeMap::new(),
            catalog_rng,
            composer_rng,
            accumulator: 0.0,
            decay_elapsed: 0.0,
            pending: VecDeque::new(),
            report: ValidityReport::default(),
        };
        session.absorb(generated, update);

        info!(
            theme = %session.config.theme,
            difficulty = session.config.difficulty_level,
            seed = session.engine.seed,
            objects = session.objects.len(),
            clusters = session.composer.clusters().len(),
            shortfalls = session.report.shortfalls.len(),
            "session started"
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn objects(&self) -> &BTreeMap<ObjectId, SceneObject> {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    pub fn threat(&self) -> &ThreatEngine {
        &self.threat
    }

    pub fn snapshot(&self) -> ThreatSnapshot {
        self.threat.snapshot()
    }

    /// Accumulated diagnostics across every placement so far
    pub fn report(&self) -> &ValidityReport {
        &self.report
    }

    /// Take every placement update queued since the last drain
    pub fn drain_placement_updates(&mut self) -> Vec<PlacementUpdate> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Route one interaction. Rejected interactions leave state unchanged.
    pub fn handle(&mut self, event: InteractionEvent) -> Result<InteractionOutcome, InteractionError> {
        let before = self.threat.tension();
        let mut outcome = InteractionOutcome::default();

        match event {
            InteractionEvent::ObjectInspected(id) => {
                let obj = self.objects.get(&id).ok_or(InteractionError::UnknownObject(id))?;
                self.threat.on_object_inspected(obj);
            }
            InteractionEvent::ContainerOpened(id) => {
                let (contents, request) = self.open_container(id)?;
                outcome.contents = Some(contents);
                if let Some(request) = request {
                    outcome.planted = self.fulfil(request);
                }
            }
            InteractionEvent::ObjectCollected(id) => {
                let obj = self
                    .objects
                    .get_mut(&id)
                    .ok_or(InteractionError::UnknownObject(id))?;
                if !obj.collected {
                    obj.collected = true;
                    debug!(object = %id, score = obj.evidence_score, "object collected");
                }
            }
            InteractionEvent::SprintStarted => self.threat.set_sprinting(true),
            InteractionEvent::SprintStopped => self.threat.set_sprinting(false),
        }

        outcome.tension_delta = self.threat.tension() - before;
        Ok(outcome)
    }

    /// Feed frame time; runs as many fixed steps as have accumulated
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return 0;
        }
        let step = self.engine.step_secs();
        self.accumulator += frame_dt;
        let mut steps = 0;
        while self.accumulator >= step {
            self.accumulator -= step;
            self.fixed_step(step);
            steps += 1;
        }
        steps
    }

    /// One fixed-rate step: tension tick and evidence decay
    pub fn fixed_step(&mut self, dt: f32) {
        self.threat.tick(dt);

        self.decay_elapsed += dt;
        let period = self.engine.evidence_decay_period_secs;
        while self.decay_elapsed >= period {
            self.decay_elapsed -= period;
            let mut decayed = 0;
            for obj in self.objects.values_mut() {
                if obj.is_incriminating() && !obj.collected {
                    obj.decay_evidence(1);
                    decayed += 1;
                }
            }
            debug!(decayed, "evidence decayed");
        }
    }

    /// Ask the antagonist for its next move. A cluster request attached to
    /// the action is fulfilled before returning.
    pub fn next_action(&mut self, reference: Point) -> AntagonistAction {
        let action = self.threat.next_action(reference, &mut self.threat_rng);
        if let Some(request) = action.cluster_request {
            self.fulfil(request);
        }
        action
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            theme: self.config.theme.clone(),
            difficulty_level: self.config.difficulty_level,
            seed: self.engine.seed,
            elapsed_secs: self.threat.clock(),
            object_count: self.objects.len(),
            cluster_count: self.composer.clusters().len(),
            containers_opened: self.resolver.opened_count(),
            collected: self.objects.values().filter(|o| o.collected).count(),
            threat: self.threat.snapshot(),
            report: self.report.clone(),
        }
    }

    fn open_container(
        &mut self,
        id: ObjectId,
    ) -> Result<(Arc<[SceneObject]>, Option<ClusterRequest>), InteractionError> {
        let container = self
            .objects
            .get_mut(&id)
            .ok_or(InteractionError::UnknownObject(id))?;
        let reference = container.position;
        let outcome = self.resolver.open(
            container,
            &mut self.catalog,
            &mut self.composer,
            &mut self.threat,
            reference,
            &mut self.container_rng,
        )?;

        if let Some(placement) = outcome.placement {
            self.report.merge(&placement.report);
            for obj in outcome.contents.iter() {
                self.objects.insert(obj.id, obj.clone());
            }
            self.pending.push_back(placement);
        }
        Ok((outcome.contents, outcome.cluster_request))
    }

    /// Plant a fresh cluster of incriminating objects near the request point
    fn fulfil(&mut self, request: ClusterRequest) -> Option<ClusterId> {
        let rules = match self.registry.rules(&self.config.theme) {
            Ok(rules) => rules,
            Err(e) => {
                warn!(error = %e, "cluster request dropped");
                return None;
            }
        };
        let template = rules
            .cluster_templates
            .choose(&mut self.threat_rng)
            .and_then(|id| self.registry.template(id).ok())?
            .clone();

        let generated = match self.catalog.generate_incriminating(
            &self.config.theme,
            template.slot_count(),
            &mut self.catalog_rng,
        ) {
            Ok(objects) => objects,
            Err(e) => {
                warn!(error = %e, "cluster request dropped");
                return None;
            }
        };

        let update = self.composer.place_cluster_near(
            request.near,
            &template,
            &generated,
            &mut self.composer_rng,
        );
        let Some(planted) = update.clusters.first().map(|c| c.id) else {
            warn!(template = %template.id, "cluster request dropped: nothing could be placed");
            return None;
        };
        info!(
            template = %template.id,
            tier = request.tier.as_str(),
            objects = generated.len(),
            "antagonist cluster planted"
        );
        self.absorb(generated, update);
        Some(planted)
    }

    /// Copy positions and cluster membership from an update into the
    /// objects it placed, then queue it
    fn absorb(&mut self, generated: Vec<SceneObject>, update: PlacementUpdate) {
        let membership: BTreeMap<ObjectId, ClusterId> = update
            .clusters
            .iter()
            .flat_map(|c| c.members.iter().map(move |m| (*m, c.id)))
            .collect();

        for mut obj in generated {
            if let Some(p) = update.position_of(obj.id) {
                obj.position = p;
            }
            if let Some(cluster) = membership.get(&obj.id) {
                obj.cluster = Some(*cluster);
            }
            self.objects.insert(obj.id, obj);
        }

        self.report.merge(&update.report);
        if !update.is_empty() {
            self.pending.push_back(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CLUSTER_MAX_OFFSET;
    use crate::geometry::Rect;
    use crate::objects::ObjectCategory;
    use crate::threat::Tier;

    fn start(difficulty_level: u32, theme: &str, seed: u64) -> Session {
        let config = SessionConfig {
            difficulty_level,
            theme: theme.into(),
            ..SessionConfig::default()
        };
        Session::start(AreaRegistry::builtin(), config, EngineConfig::with_seed(seed)).unwrap()
    }

    fn first_of(session: &Session, category: ObjectCategory) -> ObjectId {
        session
            .objects()
            .values()
            .find(|o| o.category() == category)
            .map(|o| o.id)
            .unwrap()
    }

    #[test]
    fn test_start_queues_initial_placement() {
        let mut session = start(2, "park", 1);
        let updates = session.drain_placement_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].placements.len(), 50);
        assert!(session.drain_placement_updates().is_empty());
    }

    #[test]
    fn test_objects_carry_positions_and_clusters() {
        let session = start(2, "manor", 2);
        let bounds = session.config().bounds;
        for obj in session.objects().values() {
            assert!(bounds.contains(obj.position));
            assert_eq!(obj.is_incriminating(), obj.cluster.is_some());
        }
    }

    #[test]
    fn test_unknown_theme_is_fatal() {
        let config = SessionConfig {
            theme: "volcano".into(),
            ..SessionConfig::default()
        };
        let result = Session::start(AreaRegistry::builtin(), config, EngineConfig::default());
        assert!(matches!(result, Err(ConfigError::UnknownTheme(_))));
    }

    #[test]
    fn test_empty_bounds_is_empty_scene() {
        let config = SessionConfig {
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            ..SessionConfig::default()
        };
        let mut session =
            Session::start(AreaRegistry::builtin(), config, EngineConfig::default()).unwrap();
        assert!(session.drain_placement_updates().is_empty());
        assert_eq!(session.objects().len(), 50);
    }

    #[test]
    fn test_inspect_costs() {
        let mut session = start(0, "alley", 3);
        let decoy = first_of(&session, ObjectCategory::Decoy);
        let evidence = first_of(&session, ObjectCategory::Incriminating);

        let outcome = session.handle(InteractionEvent::ObjectInspected(decoy)).unwrap();
        assert_eq!(outcome.tension_delta, 0.0);
        let outcome = session.handle(InteractionEvent::ObjectInspected(evidence)).unwrap();
        assert_eq!(outcome.tension_delta, 1.0);
    }

    #[test]
    fn test_unknown_object_rejected() {
        let mut session = start(0, "park", 4);
        let missing = ObjectId(9999);
        assert_eq!(
            session.handle(InteractionEvent::ObjectInspected(missing)).unwrap_err(),
            InteractionError::UnknownObject(missing)
        );
        assert_eq!(
            session.handle(InteractionEvent::ContainerOpened(missing)).unwrap_err(),
            InteractionError::UnknownObject(missing)
        );
        assert_eq!(session.snapshot().tension, 0.0);
    }

    #[test]
    fn test_container_open_once() {
        let mut session = start(1, "docks", 5);
        session.drain_placement_updates();
        let container = first_of(&session, ObjectCategory::Container);
        let before = session.objects().len();

        let first = session.handle(InteractionEvent::ContainerOpened(container)).unwrap();
        assert_eq!(first.tension_delta, 2.0);
        let contents = first.contents.unwrap();
        assert_eq!(session.objects().len(), before + contents.len());
        assert_eq!(session.drain_placement_updates().len(), 1);

        let second = session.handle(InteractionEvent::ContainerOpened(container)).unwrap();
        assert_eq!(second.tension_delta, 0.0);
        assert!(Arc::ptr_eq(&contents, &second.contents.unwrap()));
        assert!(session.drain_placement_updates().is_empty());
        assert!(session.object(container).unwrap().opened);
    }

    #[test]
    fn test_opening_non_container_rejected() {
        let mut session = start(0, "park", 6);
        let ambient = first_of(&session, ObjectCategory::Ambient);
        assert_eq!(
            session.handle(InteractionEvent::ContainerOpened(ambient)).unwrap_err(),
            InteractionError::NotAContainer(ambient)
        );
    }

    #[test]
    fn test_advance_runs_fixed_steps() {
        let mut session = start(0, "park", 7);
        session.handle(InteractionEvent::SprintStarted).unwrap();
        let steps = session.advance(1.0);
        assert!((29..=30).contains(&steps));
        assert!(session.snapshot().tension > 0.9);
        assert_eq!(session.advance(f32::NAN), 0);
        assert_eq!(session.advance(-1.0), 0);
    }

    #[test]
    fn test_evidence_decays_until_collected() {
        let mut session = start(0, "manor", 8);
        let evidence = first_of(&session, ObjectCategory::Incriminating);
        let other = session
            .objects()
            .values()
            .filter(|o| o.is_incriminating() && o.id != evidence)
            .map(|o| o.id)
            .next()
            .unwrap();
        session.handle(InteractionEvent::ObjectCollected(evidence)).unwrap();
        let kept = session.object(evidence).unwrap().evidence_score;
        let before = session.object(other).unwrap().evidence_score;

        for _ in 0..120 {
            session.fixed_step(1.0);
        }
        assert_eq!(session.object(evidence).unwrap().evidence_score, kept);
        assert_eq!(session.object(other).unwrap().evidence_score, before - 2);
    }

    #[test]
    fn test_next_action_plants_clusters_when_pursuing() {
        let mut session = start(0, "alley", 9);
        session.threat.adjust(60.0, "test");
        session.drain_placement_updates();
        let clusters_before = session.composer().clusters().len();

        let mut planted = 0;
        for _ in 0..100 {
            let action = session.next_action(Point::new(512.0, 384.0));
            if action.cluster_request.is_some() {
                planted += 1;
            }
        }
        assert!(planted > 0);
        assert_eq!(session.composer().clusters().len(), clusters_before + planted);
        assert_eq!(session.drain_placement_updates().len(), planted);
        let anchors: Vec<Point> = session.composer().anchors().collect();
        for obj in session.objects().values().filter(|o| o.is_incriminating()) {
            assert!(obj.cluster.is_some());
            let near = anchors
                .iter()
                .filter(|a| a.distance(obj.position) <= CLUSTER_MAX_OFFSET + 1e-3)
                .count();
            assert_eq!(near, 1, "{} near {} anchors", obj.id, near);
        }
        assert_eq!(session.snapshot().tier, Tier::Pursuing);
    }

    #[test]
    fn test_cluster_request_without_room_plants_nothing() {
        let config = SessionConfig {
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            ..SessionConfig::default()
        };
        let mut session =
            Session::start(AreaRegistry::builtin(), config, EngineConfig::with_seed(9)).unwrap();
        session.threat.adjust(60.0, "test");
        let objects_before = session.objects().len();

        let mut requested = 0;
        for _ in 0..100 {
            if session.next_action(Point::ZERO).cluster_request.is_some() {
                requested += 1;
            }
        }
        assert!(requested > 0);
        assert_eq!(session.objects().len(), objects_before);
        assert!(session.composer().clusters().is_empty());
        assert!(!session.has_pending_updates());
    }

    #[test]
    fn test_same_seed_same_scene() {
        let a = start(3, "docks", 77);
        let b = start(3, "docks", 77);
        let pa: Vec<Point> = a.objects().values().map(|o| o.position).collect();
        let pb: Vec<Point> = b.objects().values().map(|o| o.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_summary_serializes() {
        let session = start(1, "park", 10);
        let json = serde_json::to_string(&session.summary()).unwrap();
        assert!(json.contains("\"theme\":\"park\""));
    }
}
