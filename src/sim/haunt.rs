//! Simulation host
//!
//! Owns the level's navigation graph, the visibility oracle and every agent.
//! Startup is two explicit phases: [`Haunt::build_graph`] produces the graph,
//! then [`Haunt::on_graph_ready`] wraps it for sharing and accepts agents.

use std::sync::Arc;

use glam::Vec2;
use hecs::{Entity, World};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ai::{Agent, AgentState, Facing};
use crate::core::{
    AgentConfig, ConfigError, EventQueue, HauntConfig, HauntEvent, NavConfig, OracleKind,
};
use crate::nav::{NavGraph, Pathfinder, TileMap, VisibilityOracle, ZoneId};
use crate::perception;
use crate::physics::Physics;

/// Display name of an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Whether an agent was within catch distance on the previous tick
#[derive(Debug, Clone, Copy, Default)]
struct Contact(bool);

/// What a presentation layer needs to draw one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub entity: Entity,
    pub name: String,
    pub state: AgentState,
    pub position: Vec2,
    pub facing: Facing,
    pub speed: f32,
}

/// All agents of one level and the shared data they navigate with
pub struct Haunt {
    world: World,
    pathfinder: Arc<Pathfinder>,
    oracle: Box<dyn VisibilityOracle>,
    events: EventQueue,
    rng: ChaCha8Rng,
    target: Option<Vec2>,
    catch_radius: f32,
    time: f32,
}

impl Haunt {
    /// First startup phase: build the navigation graph for a level.
    #[must_use]
    pub fn build_graph(map: &TileMap, nav: &NavConfig, oracle: &dyn VisibilityOracle) -> NavGraph {
        map.build_graph(nav.connection_radius, nav.subdivisions, oracle)
    }

    /// Second startup phase: share the finished graph and start accepting agents.
    #[must_use]
    pub fn on_graph_ready(graph: NavGraph, oracle: Box<dyn VisibilityOracle>, seed: u64) -> Self {
        log::info!(
            "Graph ready: {} nodes, {} zones",
            graph.len(),
            graph.zones().len()
        );
        Self {
            world: World::new(),
            pathfinder: Arc::new(Pathfinder::new(Arc::new(graph))),
            oracle,
            events: EventQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            target: None,
            catch_radius: 0.5,
            time: 0.0,
        }
    }

    /// Build a level from configuration and spawn its agents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails validation
    /// or an agent cannot be placed
    pub fn from_config(config: &HauntConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let map = config
            .level
            .to_tile_map()
            .map_err(|e| ConfigError::Invalid(format!("level: {e}")))?;

        let oracle: Box<dyn VisibilityOracle> = match config.oracle {
            OracleKind::Grid => Box::new(map.clone()),
            OracleKind::Physics => Box::new(Physics::from_tile_map(&map)),
        };
        let graph = Self::build_graph(&map, &config.nav, oracle.as_ref());
        let mut haunt = Self::on_graph_ready(graph, oracle, config.seed)
            .with_catch_radius(config.catch_radius);

        for spawn in &config.agents {
            let entity = match spawn.position {
                Some(position) => haunt.spawn(
                    spawn.name.clone(),
                    spawn.home_zone,
                    position,
                    spawn.config.clone(),
                ),
                None => haunt.spawn_in_zone(spawn.name.clone(), spawn.home_zone, spawn.config.clone()),
            };
            if entity.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "agent '{}' could not be placed in {}",
                    spawn.name, spawn.home_zone
                )));
            }
        }
        Ok(haunt)
    }

    #[must_use]
    pub fn with_catch_radius(mut self, radius: f32) -> Self {
        self.catch_radius = radius.max(0.0);
        self
    }

    // ------------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------------

    /// Place an agent at the node nearest `position`.
    ///
    /// `None` if the graph is empty or `config` fails validation.
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        home_zone: ZoneId,
        position: Vec2,
        config: AgentConfig,
    ) -> Option<Entity> {
        let name = name.into();
        if let Err(e) = config.validate() {
            log::warn!("Cannot spawn '{name}': {e}");
            return None;
        }
        let seed = self.rng.next_u64();
        let Some(agent) = Agent::new(config, self.pathfinder.clone(), home_zone, position, seed)
        else {
            log::warn!("Cannot spawn '{name}': navigation graph is empty");
            return None;
        };

        let position = agent.position();
        let entity = self
            .world
            .spawn((Name::new(name.clone()), agent, Contact::default()));
        log::info!("Spawned '{name}' in {home_zone} at {position}");
        self.events.push(HauntEvent::AgentSpawned {
            agent: entity,
            name,
            home_zone,
            position,
        });
        Some(entity)
    }

    /// Place an agent on a random node of `zone`
    pub fn spawn_in_zone(
        &mut self,
        name: impl Into<String>,
        zone: ZoneId,
        config: AgentConfig,
    ) -> Option<Entity> {
        let graph = self.pathfinder.graph();
        let nodes = graph.zone_nodes(zone);
        if nodes.is_empty() {
            log::warn!("Cannot spawn in {zone}: it has no navigation nodes");
            return None;
        }
        let node = nodes[self.rng.gen_range(0..nodes.len())];
        let position = graph.position(node)?;
        self.spawn(name, zone, position, config)
    }

    /// Pick a random zone, make it the agent's home and place the agent in it
    pub fn spawn_in_random_zone(
        &mut self,
        name: impl Into<String>,
        config: AgentConfig,
    ) -> Option<Entity> {
        let zones = self.pathfinder.graph().zones();
        if zones.is_empty() {
            log::warn!("Cannot spawn in a random zone: the level has none");
            return None;
        }
        let zone = zones[self.rng.gen_range(0..zones.len())];
        self.spawn_in_zone(name, zone, config)
    }

    /// Remove an agent. Returns whether it existed.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if self.world.get::<&Agent>(entity).is_err() {
            return false;
        }
        if self.world.despawn(entity).is_err() {
            return false;
        }
        log::debug!("Despawned agent {entity:?}");
        self.events.push(HauntEvent::AgentDespawned { agent: entity });
        true
    }

    /// Replace an agent with a fresh one in a random spot of the same home zone
    pub fn respawn(&mut self, entity: Entity) -> Option<Entity> {
        let (name, home_zone, config) = {
            let name = self.world.get::<&Name>(entity).ok()?.0.clone();
            let agent = self.world.get::<&Agent>(entity).ok()?;
            (name, agent.home_zone(), agent.config().clone())
        };
        self.despawn(entity);
        self.spawn_in_zone(name, home_zone, config)
    }

    // ------------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------------

    /// Position of the target agents look for, or `None` when there is none
    pub fn set_target(&mut self, target: Option<Vec2>) {
        self.target = target;
    }

    /// Ask one agent to start hunting. Returns whether it accepted.
    pub fn start_hunt(&mut self, entity: Entity) -> bool {
        match self.world.get::<&mut Agent>(entity) {
            Ok(mut agent) => agent.start_hunt(),
            Err(_) => false,
        }
    }

    /// Ask every agent to hunt. Returns how many accepted.
    pub fn start_hunt_all(&mut self) -> usize {
        self.world
            .query_mut::<&mut Agent>()
            .into_iter()
            .map(|(_, agent)| agent.start_hunt())
            .filter(|&accepted| accepted)
            .count()
    }

    /// Advance every agent by `dt` seconds.
    ///
    /// Each agent sees the target through its own view cone, ticks, and has
    /// its signals forwarded to the event queue. The events become readable
    /// when this returns.
    pub fn tick(&mut self, dt: f32) {
        self.time += dt;
        let target = self.target;
        let oracle = self.oracle.as_ref();

        for (entity, (agent, contact)) in self.world.query_mut::<(&mut Agent, &mut Contact)>() {
            let sighting = target.filter(|&t| {
                let config = agent.config();
                perception::is_visible(
                    agent.position(),
                    agent.facing(),
                    config.fov_half_angle,
                    config.vision_range,
                    t,
                    oracle,
                )
            });
            agent.tick(dt, sighting);

            for signal in agent.drain_signals() {
                self.events.push(HauntEvent::Agent {
                    agent: entity,
                    signal,
                });
            }

            let touching =
                target.is_some_and(|t| agent.position().distance(t) <= self.catch_radius);
            if touching && !contact.0 {
                if let Some(position) = target {
                    log::info!("Agent {entity:?} caught the target at {position}");
                    self.events.push(HauntEvent::TargetCaught {
                        agent: entity,
                        position,
                    });
                }
            }
            contact.0 = touching;
        }

        self.events.swap();
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Events produced by the most recent tick
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    #[must_use]
    pub fn graph(&self) -> &Arc<NavGraph> {
        self.pathfinder.graph()
    }

    #[must_use]
    pub fn pathfinder(&self) -> &Arc<Pathfinder> {
        &self.pathfinder
    }

    #[must_use]
    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    /// Simulated seconds since startup
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of agents
    #[must_use]
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Borrow one agent
    #[must_use]
    pub fn agent(&self, entity: Entity) -> Option<hecs::Ref<'_, Agent>> {
        self.world.get::<&Agent>(entity).ok()
    }

    /// Agent entities in tick order
    #[must_use]
    pub fn agents(&self) -> Vec<Entity> {
        self.world
            .query::<&Agent>()
            .iter()
            .map(|(entity, _)| entity)
            .collect()
    }

    /// Presentation state of every agent in tick order
    #[must_use]
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.world
            .query::<(&Name, &Agent)>()
            .iter()
            .map(|(entity, (name, agent))| AgentSnapshot {
                entity,
                name: name.0.clone(),
                state: agent.state(),
                position: agent.position(),
                facing: agent.cardinal_facing(),
                speed: agent.speed(),
            })
            .collect()
    }
}
