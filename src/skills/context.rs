//! Shared state handed to every skill: the world client, the surroundings
//! index, and the event bus. Owned by the orchestrator and lent out for the
//! duration of each lifecycle call.

use crate::events::EventBus;
use crate::perception::{SurroundingsIndex, SurroundingsRadii};
use crate::world::{VoxelPos, WorldClient, WorldEvent};
use std::time::Duration;

pub struct SkillContext {
    pub world: Box<dyn WorldClient>,
    pub surroundings: SurroundingsIndex,
    pub events: EventBus,
    death_observed: bool,
}

impl SkillContext {
    pub fn new(world: Box<dyn WorldClient>, radii: SurroundingsRadii) -> Self {
        let mut ctx = Self {
            world,
            surroundings: SurroundingsIndex::new(radii),
            events: EventBus::new(),
            death_observed: false,
        };
        ctx.surroundings.refresh(ctx.world.as_ref());
        ctx
    }

    /// Drain world events, fan them out on the bus, and keep the
    /// surroundings index current. Called once per cooperative turn.
    pub fn pump_world_events(&mut self) {
        let events = self.world.poll_events();
        for event in events {
            self.events.publish(&event);
            match event {
                WorldEvent::BlockChanged { voxel } => {
                    self.surroundings
                        .handle_block_changed(self.world.as_ref(), voxel);
                }
                WorldEvent::AgentMoved => {
                    self.surroundings.handle_agent_moved(self.world.as_ref());
                }
                WorldEvent::Death => {
                    self.surroundings.handle_agent_moved(self.world.as_ref());
                    self.death_observed = true;
                }
                WorldEvent::InventoryChanged | WorldEvent::ItemEntityGone { .. } => {}
            }
        }
    }

    /// Whether a death was observed since the last call; clears the flag.
    pub fn take_death(&mut self) -> bool {
        std::mem::take(&mut self.death_observed)
    }

    pub fn hydrate_surroundings(&mut self, throttle: Option<Duration>) -> bool {
        self.surroundings.hydrate(self.world.as_ref(), throttle)
    }

    pub fn agent_voxel(&self) -> VoxelPos {
        VoxelPos::from_world(self.world.agent_position())
    }
}
