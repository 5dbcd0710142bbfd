//! Scene composer: turns a catalog object set into positions.
//!
//! Placement runs in a fixed stage order, later stages reading what earlier
//! stages placed:
//!   1. narrative clusters (the only path for incriminating objects)
//!   2. containers on theme landmarks
//!   3. decoys on a ring around cluster anchors
//!   4. Poisson-disk fill for ambient objects and overflow, then random
//!      fallback for anything still unplaced
//!
//! Appearance-rule violations are reported, never corrected.

pub mod poisson;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::areas::{AreaRegistry, AreaRules, ClusterTemplate, CONTAINER_CACHE_TEMPLATE};
use crate::constants::*;
use crate::error::ConfigError;
use crate::geometry::{is_excluded, random_angle, Point, Rect};
use crate::logging::TimingSpan;
use crate::objects::{AppearanceTag, ClusterId, ObjectCategory, ObjectId, SceneObject};
use poisson::PoissonParams;

/// How an object reached its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMethod {
    Cluster,
    ContainerCache,
    Landmark,
    DecoyRing,
    Poisson,
    RandomFallback,
    CenterFallback,
}

impl PlacementMethod {
    /// Fallback paths are counted as placement shortfalls
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::RandomFallback | Self::CenterFallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub position: Point,
    pub method: PlacementMethod,
}

pub type PlacementMap = BTreeMap<ObjectId, PlacedObject>;

/// Instantiated narrative cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeCluster {
    pub id: ClusterId,
    pub template_id: String,
    pub origin: Point,
    pub members: Vec<ObjectId>,
    pub offsets: Vec<Point>,
}

/// Object whose appearance is outside its theme's allowed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub object_id: ObjectId,
    pub appearance: AppearanceTag,
    pub theme: String,
}

/// Diagnostics produced alongside a placement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidityReport {
    pub violations: Vec<RuleViolation>,
    /// Objects that could only be placed through a fallback path
    pub shortfalls: Vec<ObjectId>,
}

impl ValidityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.shortfalls.is_empty()
    }

    pub fn merge(&mut self, other: &ValidityReport) {
        self.violations.extend(other.violations.iter().cloned());
        self.shortfalls.extend(other.shortfalls.iter().copied());
    }
}

/// Positions produced by one composer call. The initial `place` and every
/// later cluster or container opening each yield one update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementUpdate {
    pub placements: PlacementMap,
    pub clusters: Vec<NarrativeCluster>,
    pub report: ValidityReport,
}

impl PlacementUpdate {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn position_of(&self, id: ObjectId) -> Option<Point> {
        self.placements.get(&id).map(|p| p.position)
    }
}

/// Owns the placement map for a session
#[derive(Debug, Clone)]
pub struct SceneComposer {
    registry: Arc<AreaRegistry>,
    theme: String,
    bounds: Rect,
    exclusions: Vec<Rect>,
    placements: PlacementMap,
    clusters: Vec<NarrativeCluster>,
    /// Container positions. Reserved like anchors, since opening a
    /// container stamps a cache cluster on it.
    container_sites: BTreeMap<ObjectId, Point>,
    next_cluster_id: u32,
}

impl SceneComposer {
    pub fn new(registry: Arc<AreaRegistry>, theme: &str) -> Result<Self, ConfigError> {
        registry.rules(theme)?;
        Ok(Self {
            registry,
            theme: theme.to_string(),
            bounds: Rect::default(),
            exclusions: Vec::new(),
            placements: PlacementMap::new(),
            clusters: Vec::new(),
            container_sites: BTreeMap::new(),
            next_cluster_id: 1,
        })
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn placements(&self) -> &PlacementMap {
        &self.placements
    }

    pub fn clusters(&self) -> &[NarrativeCluster] {
        &self.clusters
    }

    pub fn anchors(&self) -> impl Iterator<Item = Point> + '_ {
        self.clusters.iter().map(|c| c.origin)
    }

    pub fn position_of(&self, id: ObjectId) -> Option<Point> {
        self.placements.get(&id).map(|p| p.position)
    }

    /// Arrange a full object set. Replaces any previous placement.
    /// Empty bounds or an empty object list yield an empty update.
    pub fn place<R: Rng + ?Sized>(
        &mut self,
        objects: &[SceneObject],
        bounds: Rect,
        exclusions: &[Rect],
        rng: &mut R,
    ) -> PlacementUpdate {
        self.bounds = bounds;
        self.exclusions = exclusions.to_vec();
        self.placements.clear();
        self.clusters.clear();
        self.container_sites.clear();

        if objects.is_empty() || bounds.is_empty() {
            debug!(objects = objects.len(), "nothing to place");
            return PlacementUpdate::default();
        }

        let registry = Arc::clone(&self.registry);
        let Ok(rules) = registry.rules(&self.theme) else {
            return PlacementUpdate::default();
        };
        let _timing = TimingSpan::new("scene_place");

        let by_category = |category: ObjectCategory| -> Vec<&SceneObject> {
            objects.iter().filter(|o| o.category() == category).collect()
        };
        let incriminating = by_category(ObjectCategory::Incriminating);
        let containers = by_category(ObjectCategory::Container);
        let decoys = by_category(ObjectCategory::Decoy);
        let ambient = by_category(ObjectCategory::Ambient);

        let mut update = PlacementUpdate::default();

        // Stage 1: narrative clusters
        self.place_clusters(&incriminating, rules, rng, &mut update);

        // Stage 2: containers on landmarks
        let mut overflow = self.place_containers(&containers, rules, rng, &mut update);

        // Stage 3: decoys around anchors
        overflow.extend(self.place_decoys(&decoys, rng, &mut update));

        // Stage 4: Poisson fill, overflow first
        let mut remaining = overflow;
        remaining.extend(ambient);
        self.place_fill(&remaining, rng, &mut update);

        update.report.violations = self.validate(objects, rules);
        debug!(
            placed = update.placements.len(),
            clusters = update.clusters.len(),
            shortfalls = update.report.shortfalls.len(),
            violations = update.report.violations.len(),
            "scene placed"
        );
        update
    }

    /// Plant a new cluster near `reference` (threat feedback)
    pub fn place_cluster_near<R: Rng + ?Sized>(
        &mut self,
        reference: Point,
        template: &ClusterTemplate,
        objects: &[SceneObject],
        rng: &mut R,
    ) -> PlacementUpdate {
        let mut update = PlacementUpdate::default();
        if self.bounds.is_empty() || objects.is_empty() {
            warn!("cluster request ignored: no bounds or no objects");
            return update;
        }
        if objects.len() > template.slot_count() {
            warn!(
                template = %template.id,
                objects = objects.len(),
                slots = template.slot_count(),
                "more objects than template slots, extras are not placed"
            );
        }

        let inset = self.bounds.inset(CLUSTER_MAX_OFFSET);
        let mut tried = Vec::with_capacity(DECOY_RETRIES as usize + 1);
        let mut anchor = None;
        for _ in 0..DECOY_RETRIES {
            let distance = rng.gen_range(DECOY_RING_MIN..=DECOY_RING_MAX);
            let candidate = reference.polar_offset(random_angle(rng), distance);
            if !inset.contains(candidate) {
                continue;
            }
            if self.is_free_anchor(candidate) {
                anchor = Some(candidate);
                break;
            }
            tried.push(candidate);
        }
        let anchor = match anchor.or_else(|| self.find_free_point(&inset, rng)) {
            Some(p) => p,
            None => {
                tried.push(inset.clamp(reference));
                let best = self.least_crowded(&tried).unwrap_or_else(|| inset.clamp(reference));
                warn!(
                    x = best.x,
                    y = best.y,
                    "no free anchor for requested cluster, clusters may overlap"
                );
                best
            }
        };

        let members: Vec<&SceneObject> = objects.iter().collect();
        let cluster = self.stamp(
            &template.id,
            anchor,
            &template.offsets,
            &members,
            PlacementMethod::Cluster,
            &mut update,
        );
        update.clusters.push(cluster);
        let registry = Arc::clone(&self.registry);
        if let Ok(rules) = registry.rules(&self.theme) {
            update.report.violations = self.validate(objects, rules);
        }
        update
    }

    /// Stamp container contents as a `container_cache` cluster anchored on
    /// the container
    pub fn place_contents(
        &mut self,
        container: &SceneObject,
        contents: &[SceneObject],
    ) -> PlacementUpdate {
        let mut update = PlacementUpdate::default();
        if contents.is_empty() {
            return update;
        }
        let registry = Arc::clone(&self.registry);
        let Ok(template) = registry.template(CONTAINER_CACHE_TEMPLATE) else {
            return update;
        };
        let origin = self
            .position_of(container.id)
            .unwrap_or(container.position);
        if self
            .anchors()
            .any(|a| a.distance(origin) < CLUSTER_ANCHOR_SEPARATION)
        {
            warn!(container = %container.id, "container cache overlaps another cluster");
        }

        let members: Vec<&SceneObject> = contents.iter().collect();
        let cluster = self.stamp(
            &template.id,
            origin,
            &template.offsets,
            &members,
            PlacementMethod::ContainerCache,
            &mut update,
        );
        update.clusters.push(cluster);
        if let Ok(rules) = registry.rules(&self.theme) {
            update.report.violations = self.validate(contents, rules);
        }
        update
    }

    // ---------------------------------------------------------------
    // Stages
    // ---------------------------------------------------------------

    fn place_clusters<R: Rng + ?Sized>(
        &mut self,
        incriminating: &[&SceneObject],
        rules: &AreaRules,
        rng: &mut R,
        update: &mut PlacementUpdate,
    ) {
        let registry = Arc::clone(&self.registry);
        let mut remaining = incriminating;
        let mut template_ids = rules.cluster_templates.iter().cycle();

        while !remaining.is_empty() {
            let Some(template) = template_ids.next().and_then(|id| registry.template(id).ok())
            else {
                break;
            };
            let take = template.slot_count().min(remaining.len());
            let (members, rest) = remaining.split_at(take);
            remaining = rest;

            let anchor = self.choose_anchor(rules, rng);
            let cluster = self.stamp(
                &template.id,
                anchor,
                &template.offsets,
                members,
                PlacementMethod::Cluster,
                update,
            );
            update.clusters.push(cluster);
        }
    }

    fn place_containers<'a, R: Rng + ?Sized>(
        &mut self,
        containers: &[&'a SceneObject],
        rules: &AreaRules,
        rng: &mut R,
        update: &mut PlacementUpdate,
    ) -> Vec<&'a SceneObject> {
        let mut landmarks: Vec<Point> = rules
            .landmarks
            .iter()
            .map(|n| self.bounds.denormalize(*n))
            .collect();
        landmarks.shuffle(rng);

        let mut overflow = Vec::new();
        for container in containers {
            // Earlier containers reserve their landmark, so re-check each time
            match landmarks.iter().position(|p| self.is_free_anchor(*p)) {
                Some(i) => {
                    let p = landmarks.swap_remove(i);
                    self.record_container(container.id, p, PlacementMethod::Landmark, update);
                }
                None => overflow.push(*container),
            }
        }
        if !overflow.is_empty() {
            debug!(overflow = overflow.len(), "containers beyond available landmarks");
        }
        overflow
    }

    fn place_decoys<'a, R: Rng + ?Sized>(
        &mut self,
        decoys: &[&'a SceneObject],
        rng: &mut R,
        update: &mut PlacementUpdate,
    ) -> Vec<&'a SceneObject> {
        let anchors: Vec<Point> = self.anchors().collect();
        let mut overflow = Vec::new();

        for decoy in decoys {
            let mut placed = false;
            if !anchors.is_empty() {
                for _ in 0..DECOY_RETRIES {
                    let Some(anchor) = anchors.choose(rng) else {
                        break;
                    };
                    let distance = rng.gen_range(DECOY_RING_MIN..=DECOY_RING_MAX);
                    let p = anchor.polar_offset(random_angle(rng), distance);
                    if self.bounds.contains(p) && !is_excluded(p, &self.exclusions) {
                        self.record(decoy.id, p, PlacementMethod::DecoyRing, update);
                        placed = true;
                        break;
                    }
                }
            }
            if !placed {
                overflow.push(*decoy);
            }
        }
        if !overflow.is_empty() {
            debug!(overflow = overflow.len(), "decoys fell through to ambient fill");
        }
        overflow
    }

    fn place_fill<R: Rng + ?Sized>(
        &mut self,
        objects: &[&SceneObject],
        rng: &mut R,
        update: &mut PlacementUpdate,
    ) {
        if objects.is_empty() {
            return;
        }
        let blockers: Vec<Point> = self.placements.values().map(|p| p.position).collect();
        let params = PoissonParams {
            min_dist: POISSON_MIN_SEPARATION,
            candidates: POISSON_CANDIDATES,
            seed_attempts: FALLBACK_RETRIES,
        };
        let mut samples = poisson::sample(
            &self.bounds,
            &self.exclusions,
            &blockers,
            params,
            objects.len(),
            rng,
        );

        let (containers, others): (Vec<&SceneObject>, Vec<&SceneObject>) =
            objects.iter().copied().partition(|o| o.is_container());
        for obj in containers {
            match samples.iter().position(|p| self.is_free_anchor(*p)) {
                Some(i) => {
                    let p = samples.remove(i);
                    self.record_container(obj.id, p, PlacementMethod::Poisson, update);
                }
                None => self.place_fallback(obj, rng, update),
            }
        }
        let mut samples = samples.into_iter();
        for obj in others {
            match samples.next() {
                Some(p) => self.record(obj.id, p, PlacementMethod::Poisson, update),
                None => self.place_fallback(obj, rng, update),
            }
        }
    }

    fn place_fallback<R: Rng + ?Sized>(
        &mut self,
        obj: &SceneObject,
        rng: &mut R,
        update: &mut PlacementUpdate,
    ) {
        let site = obj.is_container();
        for _ in 0..FALLBACK_RETRIES {
            let p = self.bounds.random_point(rng);
            let usable = if site {
                self.is_free_anchor(p)
            } else {
                !is_excluded(p, &self.exclusions)
            };
            if usable {
                warn!(object = %obj.id, "poisson samples exhausted, random placement");
                self.place_at(obj, p, PlacementMethod::RandomFallback, update);
                update.report.shortfalls.push(obj.id);
                return;
            }
        }
        warn!(object = %obj.id, "no free position found, centering in bounds");
        self.place_at(obj, self.bounds.center(), PlacementMethod::CenterFallback, update);
        update.report.shortfalls.push(obj.id);
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Anchors and container sites; a new anchor keeps its distance from all
    fn reserved_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.anchors().chain(self.container_sites.values().copied())
    }

    fn is_free_anchor(&self, p: Point) -> bool {
        !is_excluded(p, &self.exclusions)
            && self
                .reserved_points()
                .all(|a| a.distance(p) >= CLUSTER_ANCHOR_SEPARATION)
    }

    fn find_free_point<R: Rng + ?Sized>(&self, area: &Rect, rng: &mut R) -> Option<Point> {
        (0..CLUSTER_ANCHOR_RETRIES)
            .map(|_| area.random_point(rng))
            .find(|p| self.is_free_anchor(*p))
    }

    /// Candidate farthest from every reserved point
    fn least_crowded(&self, candidates: &[Point]) -> Option<Point> {
        let crowding = |p: &Point| {
            self.reserved_points()
                .map(|a| a.distance_squared(*p))
                .fold(f32::MAX, f32::min)
        };
        candidates
            .iter()
            .copied()
            .max_by(|a, b| crowding(a).total_cmp(&crowding(b)))
    }

    /// Theme candidates first (shuffled), then random points in the inset
    /// bounds, then the least crowded candidate.
    fn choose_anchor<R: Rng + ?Sized>(&self, rules: &AreaRules, rng: &mut R) -> Point {
        let inset = self.bounds.inset(CLUSTER_MAX_OFFSET);
        let mut candidates: Vec<Point> = rules
            .cluster_anchors
            .iter()
            .map(|n| inset.denormalize(*n))
            .collect();
        candidates.shuffle(rng);

        if let Some(p) = candidates.iter().find(|p| self.is_free_anchor(**p)) {
            return *p;
        }

        if let Some(p) = self.find_free_point(&inset, rng) {
            debug!(x = p.x, y = p.y, "anchor candidates exhausted, using random anchor");
            return p;
        }

        let best = self
            .least_crowded(&candidates)
            .unwrap_or_else(|| inset.center());
        warn!(x = best.x, y = best.y, "no separated anchor available, clusters may overlap");
        best
    }

    fn stamp(
        &mut self,
        template_id: &str,
        origin: Point,
        offsets: &[Point],
        members: &[&SceneObject],
        method: PlacementMethod,
        update: &mut PlacementUpdate,
    ) -> NarrativeCluster {
        let id = ClusterId(self.next_cluster_id);
        self.next_cluster_id += 1;

        let mut cluster = NarrativeCluster {
            id,
            template_id: template_id.to_string(),
            origin,
            members: Vec::with_capacity(members.len()),
            offsets: Vec::with_capacity(members.len()),
        };
        for (obj, offset) in members.iter().zip(offsets) {
            // Clamping toward an in-bounds origin never lengthens the offset
            let p = self.bounds.clamp(origin.offset(*offset));
            self.record(obj.id, p, method, update);
            cluster.members.push(obj.id);
            cluster.offsets.push(*offset);
        }
        self.clusters.push(cluster.clone());
        cluster
    }

    fn record_container(
        &mut self,
        id: ObjectId,
        position: Point,
        method: PlacementMethod,
        update: &mut PlacementUpdate,
    ) {
        self.container_sites.insert(id, position);
        self.record(id, position, method, update);
    }

    fn place_at(
        &mut self,
        obj: &SceneObject,
        position: Point,
        method: PlacementMethod,
        update: &mut PlacementUpdate,
    ) {
        if obj.is_container() {
            self.record_container(obj.id, position, method, update);
        } else {
            self.record(obj.id, position, method, update);
        }
    }

    fn record(
        &mut self,
        id: ObjectId,
        position: Point,
        method: PlacementMethod,
        update: &mut PlacementUpdate,
    ) {
        let placed = PlacedObject { position, method };
        self.placements.insert(id, placed);
        update.placements.insert(id, placed);
    }

    fn validate(&self, objects: &[SceneObject], rules: &AreaRules) -> Vec<RuleViolation> {
        objects
            .iter()
            .filter(|o| !rules.allows(o.appearance))
            .map(|o| {
                warn!(
                    object = %o.id,
                    appearance = o.appearance.as_str(),
                    theme = %rules.theme,
                    "appearance outside theme's allowed set"
                );
                RuleViolation {
                    object_id: o.id,
                    appearance: o.appearance,
                    theme: rules.theme.clone(),
                }
            })
            .collect()
    }
}
