//! pickupItem: walk to a dropped item visible in the immediate surroundings
//! and collect it.

use super::{arg_str, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome};
use crate::env_state::item_totals;
use crate::error::{AgentError, AgentResult};
use crate::world::{ActionStatus, MovementStatus, VoxelPos};
use serde_json::Value;

enum Phase {
    Moving,
    PickingUp,
}

pub struct PickupItem {
    item_name: String,
    target: Option<VoxelPos>,
    entity_id: Option<u32>,
    baseline: u32,
    phase: Phase,
}

impl PickupItem {
    pub fn new() -> Self {
        Self {
            item_name: String::new(),
            target: None,
            entity_id: None,
            baseline: 0,
            phase: Phase::Moving,
        }
    }

    fn net_gain(&self, ctx: &SkillContext) -> u32 {
        item_totals(&ctx.world.inventory_slots(), ctx.world.registry())
            .get(&self.item_name)
            .copied()
            .unwrap_or(0)
            .saturating_sub(self.baseline)
    }

    fn resolve_unverifiable(&self, ctx: &mut SkillContext) -> SkillResult {
        ctx.hydrate_surroundings(None);
        SkillResult::hydrated(format!(
            "100% certain programmatic verification of the pickup of {} is not yet \
             implemented for the case as it occured. Please defer to 'inventoryChanges' to \
             see if any items were acquired.",
            self.item_name
        ))
    }

    fn begin_pickup(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        let id = self.entity_id.ok_or_else(|| {
            AgentError::SkillLifecycle("pickupItem has no target entity".into())
        })?;
        ctx.world.start_pickup(id)?;
        self.phase = Phase::PickingUp;
        Ok(())
    }
}

impl Skill for PickupItem {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "pickupItem",
            signature: "pickupItem(item: string)",
        }
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let item_name = arg_str(args, 0).unwrap_or_default();
        let Some(item_id) = ctx.world.registry().item_id(&item_name) else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized or supported item.",
                item_name
            ))));
        };

        ctx.hydrate_surroundings(None);
        let target = ctx
            .surroundings
            .snapshot()
            .immediate
            .items_to_all_coords
            .get(&item_name)
            .and_then(|coords| coords.first())
            .copied();
        let Some(target) = target else {
            return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                "SkillInvocationError: '{}' is not visible in your immediate surroundings.",
                item_name
            ))));
        };

        // The closest matching entity is the one the snapshot reported.
        let entity_id = ctx
            .world
            .item_entities()
            .into_iter()
            .filter(|e| e.item == item_id)
            .min_by_key(|e| {
                let v = VoxelPos::from_world(e.position);
                let d = v - target;
                (d.x as i64).pow(2) + (d.y as i64).pow(2) + (d.z as i64).pow(2)
            })
            .map(|e| e.id);
        let Some(entity_id) = entity_id else {
            return Ok(Invocation::Resolved(self.resolve_unverifiable(ctx)));
        };

        self.baseline = item_totals(&ctx.world.inventory_slots(), ctx.world.registry())
            .get(&item_name)
            .copied()
            .unwrap_or(0);
        self.item_name = item_name;
        self.target = Some(target);
        self.entity_id = Some(entity_id);
        self.phase = Phase::Moving;

        if ctx.agent_voxel().distance_to(target) <= 1.5 {
            self.begin_pickup(ctx)?;
        } else {
            ctx.world.set_movement_goal(target)?;
        }
        Ok(Invocation::Running)
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        match self.phase {
            Phase::Moving => match ctx.world.movement_status() {
                MovementStatus::Moving => Ok(StepOutcome::Continue),
                MovementStatus::Reached | MovementStatus::Idle => {
                    ctx.world.clear_movement_goal();
                    self.begin_pickup(ctx)?;
                    Ok(StepOutcome::Continue)
                }
                MovementStatus::NoPath | MovementStatus::TimedOut => {
                    ctx.world.clear_movement_goal();
                    ctx.hydrate_surroundings(None);
                    Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                        "Somehow, while trying to pathfind to {} in the immediate \
                         surroundings, the pathfinding algorithm left you farther away... \
                         This is almost certainly just a quirk of an often-goofy pathfinding \
                         algorithm failing to find and traverse a path. Maybe try mining \
                         some blocks around the area if you have an appropriate tool for \
                         doing so?",
                        self.item_name
                    ))))
                }
            },
            Phase::PickingUp => match ctx.world.action_status() {
                ActionStatus::InProgress | ActionStatus::Idle => Ok(StepOutcome::Continue),
                ActionStatus::Completed => {
                    ctx.hydrate_surroundings(None);
                    Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                        "You successfully made your way nearby '{}' and, while doing so, \
                         gained a net of {} of '{}' items.",
                        self.item_name,
                        self.net_gain(ctx),
                        self.item_name
                    ))))
                }
                ActionStatus::Failed(_) => {
                    Ok(StepOutcome::Resolved(self.resolve_unverifiable(ctx)))
                }
            },
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        ctx.world.clear_movement_goal();
        self.phase = Phase::Moving;
        Ok(())
    }

    fn on_resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        if let Some(target) = self.target {
            ctx.world.set_movement_goal(target)?;
        }
        Ok(None)
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        ctx.world.clear_movement_goal();
        Ok(())
    }
}
