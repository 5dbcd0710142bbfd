//! Bevy integration: runs one `Session` inside an ECS host.
//!
//! Interactions and antagonist polls come in as events, placement updates
//! and antagonist actions go out as events, and the tension tick runs on
//! `FixedUpdate` at 30 Hz.

use bevy::prelude::*;
use std::sync::Arc;
use tracing::{error, warn};

use crate::areas::AreaRegistry;
use crate::constants::TICK_RATE_HZ;
use crate::error::InteractionError;
use crate::geometry::Point;
use crate::logging::LoggingPlugin;
use crate::scene::PlacementUpdate;
use crate::session::{EngineConfig, InteractionEvent, Session, SessionConfig};
use crate::threat::{AntagonistAction, ThreatSnapshot};

pub struct ScenePlugin {
    pub registry: Arc<AreaRegistry>,
}

impl Default for ScenePlugin {
    fn default() -> Self {
        Self {
            registry: AreaRegistry::builtin(),
        }
    }
}

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        // Headless hosts have no LogPlugin; an existing subscriber is kept
        if !app.is_plugin_added::<LoggingPlugin>() {
            app.add_plugins(LoggingPlugin);
        }
        app.insert_resource(SceneRegistry(Arc::clone(&self.registry)))
            .insert_resource(Time::<Fixed>::from_hz(TICK_RATE_HZ as f64))
            .init_resource::<ThreatStatus>()
            .add_event::<StartSessionRequest>()
            .add_event::<InteractionRequest>()
            .add_event::<InteractionRejected>()
            .add_event::<ActionRequest>()
            .add_event::<AntagonistActionEvent>()
            .add_event::<PlacementUpdateEvent>()
            .add_systems(
                Update,
                (
                    start_session_system,
                    interaction_system,
                    antagonist_system,
                    publish_system,
                )
                    .chain(),
            )
            .add_systems(FixedUpdate, threat_tick_system);
    }
}

#[derive(Resource)]
pub struct SceneRegistry(pub Arc<AreaRegistry>);

/// The running session, present once a start request succeeded
#[derive(Resource)]
pub struct ActiveSession(pub Session);

/// Last published threat state
#[derive(Resource, Debug, Clone, Copy)]
pub struct ThreatStatus(pub ThreatSnapshot);

impl Default for ThreatStatus {
    fn default() -> Self {
        Self(ThreatSnapshot {
            tension: 0.0,
            tier: crate::threat::Tier::Dormant,
        })
    }
}

#[derive(Event, Debug, Clone)]
pub struct StartSessionRequest {
    pub config: SessionConfig,
    pub engine: EngineConfig,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct InteractionRequest(pub InteractionEvent);

#[derive(Event, Debug, Clone)]
pub struct InteractionRejected {
    pub event: InteractionEvent,
    pub error: InteractionError,
}

/// Poll the antagonist; `reference` is usually the player position
#[derive(Event, Debug, Clone, Copy)]
pub struct ActionRequest {
    pub reference: Point,
}

#[derive(Event, Debug, Clone)]
pub struct AntagonistActionEvent(pub AntagonistAction);

#[derive(Event, Debug, Clone)]
pub struct PlacementUpdateEvent(pub PlacementUpdate);

fn start_session_system(
    mut commands: Commands,
    mut requests: EventReader<StartSessionRequest>,
    registry: Res<SceneRegistry>,
) {
    // Only the newest request in a frame matters
    let Some(request) = requests.read().last() else {
        return;
    };
    match Session::start(
        Arc::clone(&registry.0),
        request.config.clone(),
        request.engine.clone(),
    ) {
        Ok(session) => commands.insert_resource(ActiveSession(session)),
        Err(e) => error!("Failed to start session: {}", e),
    }
}

fn interaction_system(
    mut requests: EventReader<InteractionRequest>,
    mut rejected: EventWriter<InteractionRejected>,
    session: Option<ResMut<ActiveSession>>,
) {
    let Some(mut session) = session else {
        requests.clear();
        return;
    };
    for InteractionRequest(event) in requests.read() {
        if let Err(error) = session.0.handle(*event) {
            warn!("Interaction rejected: {}", error);
            rejected.send(InteractionRejected {
                event: *event,
                error,
            });
        }
    }
}

fn antagonist_system(
    mut requests: EventReader<ActionRequest>,
    mut actions: EventWriter<AntagonistActionEvent>,
    session: Option<ResMut<ActiveSession>>,
) {
    let Some(mut session) = session else {
        requests.clear();
        return;
    };
    for request in requests.read() {
        let action = session.0.next_action(request.reference);
        actions.send(AntagonistActionEvent(action));
    }
}

fn publish_system(
    mut updates: EventWriter<PlacementUpdateEvent>,
    mut status: ResMut<ThreatStatus>,
    session: Option<ResMut<ActiveSession>>,
) {
    let Some(mut session) = session else {
        return;
    };
    for update in session.0.drain_placement_updates() {
        updates.send(PlacementUpdateEvent(update));
    }
    status.0 = session.0.snapshot();
}

fn threat_tick_system(time: Res<Time<Fixed>>, session: Option<ResMut<ActiveSession>>) {
    if let Some(mut session) = session {
        session.0.fixed_step(time.timestep().as_secs_f32());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ObjectCategory, ObjectId};
    use crate::threat::Tier;

    /// Everything the plugin published, across frames
    #[derive(Resource, Default)]
    struct Outbox {
        placements: Vec<PlacementUpdate>,
        actions: Vec<AntagonistAction>,
        rejected: Vec<InteractionRejected>,
    }

    fn collect_outputs(
        mut outbox: ResMut<Outbox>,
        mut placements: EventReader<PlacementUpdateEvent>,
        mut actions: EventReader<AntagonistActionEvent>,
        mut rejected: EventReader<InteractionRejected>,
    ) {
        outbox
            .placements
            .extend(placements.read().map(|e| e.0.clone()));
        outbox.actions.extend(actions.read().map(|e| e.0.clone()));
        outbox.rejected.extend(rejected.read().cloned());
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(ScenePlugin::default())
            .init_resource::<Outbox>()
            .add_systems(Last, collect_outputs);
        app
    }

    fn app_with_session(seed: u64) -> App {
        let mut app = test_app();
        app.world_mut().send_event(StartSessionRequest {
            config: SessionConfig::default(),
            engine: EngineConfig::with_seed(seed),
        });
        app.update();
        app.update();
        app
    }

    fn outbox(app: &App) -> &Outbox {
        app.world().resource::<Outbox>()
    }

    #[test]
    fn test_no_session_is_noop() {
        let mut app = test_app();
        app.world_mut()
            .send_event(InteractionRequest(InteractionEvent::SprintStarted));
        app.update();
        app.world_mut().run_schedule(FixedUpdate);
        assert!(app.world().get_resource::<ActiveSession>().is_none());
        assert!(outbox(&app).placements.is_empty());
    }

    #[test]
    fn test_scene_plugin_installs_logging() {
        let app = test_app();
        assert!(app.is_plugin_added::<LoggingPlugin>());

        let mut app = App::new();
        app.add_plugins((LoggingPlugin, ScenePlugin::default()));
        assert!(app.is_plugin_added::<ScenePlugin>());
    }

    #[test]
    fn test_start_request_publishes_initial_placement() {
        let app = app_with_session(1);
        assert!(app.world().get_resource::<ActiveSession>().is_some());
        let placements = &outbox(&app).placements;
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].placements.len(), 50);
    }

    #[test]
    fn test_failed_start_leaves_no_session() {
        let mut app = test_app();
        app.world_mut().send_event(StartSessionRequest {
            config: SessionConfig {
                theme: "volcano".into(),
                ..SessionConfig::default()
            },
            engine: EngineConfig::default(),
        });
        app.update();
        app.update();
        assert!(app.world().get_resource::<ActiveSession>().is_none());
    }

    #[test]
    fn test_container_open_publishes_update_and_tension() {
        let mut app = app_with_session(2);
        let container = app
            .world()
            .resource::<ActiveSession>()
            .0
            .objects()
            .values()
            .find(|o| o.category() == ObjectCategory::Container)
            .map(|o| o.id)
            .unwrap();

        app.world_mut()
            .send_event(InteractionRequest(InteractionEvent::ContainerOpened(container)));
        app.update();
        assert_eq!(outbox(&app).placements.len(), 2);
        assert_eq!(app.world().resource::<ThreatStatus>().0.tension, 2.0);
    }

    #[test]
    fn test_rejected_interaction_reported() {
        let mut app = app_with_session(3);
        let missing = ObjectId(123_456);
        app.world_mut()
            .send_event(InteractionRequest(InteractionEvent::ObjectInspected(missing)));
        app.update();
        let rejected = &outbox(&app).rejected;
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].error, InteractionError::UnknownObject(missing));
    }

    #[test]
    fn test_fixed_update_ticks_sprint() {
        let mut app = app_with_session(4);
        app.world_mut()
            .send_event(InteractionRequest(InteractionEvent::SprintStarted));
        app.update();
        for _ in 0..30 {
            app.world_mut().run_schedule(FixedUpdate);
        }
        let tension = app.world().resource::<ActiveSession>().0.snapshot().tension;
        assert!((tension - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_action_request_answered() {
        let mut app = app_with_session(5);
        app.world_mut().send_event(ActionRequest {
            reference: Point::new(100.0, 100.0),
        });
        app.update();
        assert_eq!(outbox(&app).actions.len(), 1);
        assert_eq!(app.world().resource::<ThreatStatus>().0.tier, Tier::Dormant);
    }
}
