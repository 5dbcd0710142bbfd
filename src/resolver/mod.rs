//! Container resolver: lazy, idempotent expansion of containers.
//!
//! Contents are generated on the first open, stamped next to the container
//! and frozen into a shared slice. Every later open hands back the same
//! slice and leaves tension alone.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::areas::AreaRegistry;
use crate::catalog::ContentCatalog;
use crate::error::{ConfigError, InteractionError};
use crate::geometry::Point;
use crate::objects::{ObjectId, SceneObject};
use crate::scene::{PlacementUpdate, SceneComposer};
use crate::threat::{ClusterRequest, ThreatEngine};

/// Result of opening a container
#[derive(Debug, Clone)]
pub struct OpenOutcome {
    pub contents: Arc<[SceneObject]>,
    /// False when the container had already been opened
    pub newly_opened: bool,
    /// Placement of freshly generated contents, first open only
    pub placement: Option<PlacementUpdate>,
    pub cluster_request: Option<ClusterRequest>,
}

#[derive(Debug, Clone)]
pub struct ContainerResolver {
    theme: String,
    cache: HashMap<ObjectId, Arc<[SceneObject]>>,
}

impl ContainerResolver {
    pub fn new(registry: &AreaRegistry, theme: &str) -> Result<Self, ConfigError> {
        registry.rules(theme)?;
        Ok(Self {
            theme: theme.to_string(),
            cache: HashMap::new(),
        })
    }

    pub fn is_opened(&self, container: ObjectId) -> bool {
        self.cache.contains_key(&container)
    }

    pub fn opened_count(&self) -> usize {
        self.cache.len()
    }

    pub fn contents_of(&self, container: ObjectId) -> Option<&Arc<[SceneObject]>> {
        self.cache.get(&container)
    }

    /// Open `container`. The first call generates 1-3 objects, places them
    /// as a container cache and charges the search cost once.
    #[allow(clippy::too_many_arguments)]
    pub fn open<R: Rng + ?Sized>(
        &mut self,
        container: &mut SceneObject,
        catalog: &mut ContentCatalog,
        composer: &mut SceneComposer,
        threat: &mut ThreatEngine,
        reference: Point,
        rng: &mut R,
    ) -> Result<OpenOutcome, InteractionError> {
        if !container.is_container() {
            return Err(InteractionError::NotAContainer(container.id));
        }

        if let Some(contents) = self.cache.get(&container.id) {
            debug!(container = %container.id, "container already opened");
            return Ok(OpenOutcome {
                contents: Arc::clone(contents),
                newly_opened: false,
                placement: None,
                cluster_request: None,
            });
        }

        // Nothing is cached or charged when generation fails
        let mut generated = catalog
            .generate_container_contents(&self.theme, rng)
            .map_err(|e| {
                warn!(container = %container.id, error = %e, "container contents unavailable");
                InteractionError::ContentsUnavailable {
                    container: container.id,
                    reason: e.to_string(),
                }
            })?;

        let placement = composer.place_contents(container, &generated);
        let cluster = placement.clusters.first().map(|c| c.id);
        for obj in &mut generated {
            if let Some(p) = placement.position_of(obj.id) {
                obj.position = p;
            }
            obj.cluster = cluster;
        }

        let contents: Arc<[SceneObject]> = generated.into();
        self.cache.insert(container.id, Arc::clone(&contents));
        container.contents = Some(Arc::clone(&contents));
        container.opened = true;

        let cluster_request = threat.on_container_searched(container, reference, rng);
        debug!(
            container = %container.id,
            count = contents.len(),
            tension = threat.tension(),
            "container opened"
        );

        Ok(OpenOutcome {
            contents,
            newly_opened: true,
            placement: Some(placement),
            cluster_request,
        })
    }
}
