//! mineBlocks: repeatedly dig the closest visible block of a type, walking
//! closer when out of reach, until the requested quantity is broken.

use super::{
    arg_str, arg_u32_or, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome,
};
use crate::constants::agent::MAX_REACH;
use crate::constants::skills::MINE_BLOCKS_TIMEOUT_MS;
use crate::env_state::item_totals;
use crate::error::{AgentError, AgentResult};
use crate::events::{EventFilter, Subscription};
use crate::world::{ActionStatus, MovementStatus, ToolClass, VoxelPos, WorldEvent};
use serde_json::Value;
use std::time::Duration;

const NO_MORE_IN_IMMEDIATE_SURROUNDINGS: &str =
    "No more blocks of this type are in the immediate surroundings.";
const COULD_NOT_PATHFIND_UNTIL_REACHABLE: &str =
    "Could not pathfind close enough to reach the block.";
const TOOL_CONSUMED: &str = "The necessary tool was consumed during use.";

enum Phase {
    PickTarget,
    Moving,
    Digging,
}

pub struct MineBlocks {
    block_name: String,
    drop_name: Option<String>,
    drop_baseline: u32,
    target_quantity: u32,
    required_tool: ToolClass,
    broken: u32,
    phase: Phase,
    target: Option<VoxelPos>,
    /// Held for the skill's lifetime so the interest is released on any exit.
    block_events: Option<Subscription>,
}

impl MineBlocks {
    pub fn new() -> Self {
        Self {
            block_name: String::new(),
            drop_name: None,
            drop_baseline: 0,
            target_quantity: 0,
            required_tool: ToolClass::None,
            broken: 0,
            phase: Phase::PickTarget,
            target: None,
            block_events: None,
        }
    }

    fn has_required_tool(&self, ctx: &SkillContext) -> bool {
        if self.required_tool == ToolClass::None {
            return true;
        }
        ctx.world.inventory_slots().iter().any(|slot| {
            ctx.world
                .registry()
                .item(slot.item)
                .and_then(|d| d.tool_class)
                == Some(self.required_tool)
        })
    }

    /// Did a block change land on the current dig target since last step?
    fn target_invalidated(&self) -> bool {
        let Some(events) = &self.block_events else {
            return false;
        };
        let drained = events.poll();
        match self.target {
            Some(target) => drained
                .iter()
                .any(|e| matches!(e, WorldEvent::BlockChanged { voxel } if *voxel == target)),
            None => false,
        }
    }

    fn drops_acquired(&self, ctx: &SkillContext) -> u32 {
        let Some(drop_name) = &self.drop_name else {
            return 0;
        };
        let totals = item_totals(&ctx.world.inventory_slots(), ctx.world.registry());
        totals
            .get(drop_name)
            .copied()
            .unwrap_or(0)
            .saturating_sub(self.drop_baseline)
    }

    fn drops_clause(&self, ctx: &SkillContext) -> String {
        let acquired = self.drops_acquired(ctx);
        match (&self.drop_name, acquired) {
            (Some(name), n) if n > 0 => format!(" and acquired {} of '{}'.", n, name),
            _ => " and did not acquire any drops.".to_string(),
        }
    }

    fn resolve_success(&self, ctx: &mut SkillContext) -> SkillResult {
        ctx.hydrate_surroundings(None);
        SkillResult::hydrated(format!(
            "You successfully broke at least {} of the intended of the {} of '{}'{}",
            self.broken,
            self.target_quantity,
            self.block_name,
            self.drops_clause(ctx)
        ))
    }

    fn resolve_partial(&self, ctx: &mut SkillContext, reason: &str) -> SkillResult {
        ctx.hydrate_surroundings(None);
        SkillResult::hydrated(format!(
            "You broke at least {} of the intended {} of '{}'{} NOTE: {}",
            self.broken,
            self.target_quantity,
            self.block_name,
            self.drops_clause(ctx),
            reason
        ))
    }

    /// Closest mineable occurrence from the last hydrated snapshot.
    fn closest_target(&self, ctx: &SkillContext) -> Option<VoxelPos> {
        ctx.surroundings
            .snapshot()
            .immediate
            .blocks_to_all_coords
            .get(&self.block_name)
            .and_then(|coords| coords.first())
            .copied()
    }
}

impl Skill for MineBlocks {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "mineBlocks",
            signature: "mineBlocks(block: string, quantity: number = 1)",
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(MINE_BLOCKS_TIMEOUT_MS)
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let block_name = arg_str(args, 0).unwrap_or_default();
        let quantity = arg_u32_or(args, 1, 1).max(1);

        let registry = ctx.world.registry();
        let Some(block_id) = registry.block_id(&block_name) else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized minecraft block.",
                block_name
            ))));
        };
        let def = registry.block(block_id).ok_or_else(|| {
            AgentError::SkillLifecycle(format!("block '{}' has an id but no definition", block_name))
        })?;

        let required_tool = def.harvest_tool;
        let drop_name = def.drop.map(|d| registry.item_name(d.item).to_string());

        self.required_tool = required_tool;
        if !self.has_required_tool(ctx) {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: You do not have the necessary tool to mine '{}'.",
                block_name
            ))));
        }

        ctx.hydrate_surroundings(None);
        if !ctx.surroundings.immediate_contains(&block_name) {
            return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                "SkillInvocationError: At least 1 of block '{}' must be in the immediate \
                 surroundings to invoke this skill.",
                block_name
            ))));
        }

        self.drop_baseline = drop_name
            .as_deref()
            .and_then(|name| {
                item_totals(&ctx.world.inventory_slots(), ctx.world.registry())
                    .get(name)
                    .copied()
            })
            .unwrap_or(0);
        self.block_name = block_name;
        self.drop_name = drop_name;
        self.target_quantity = quantity;
        self.broken = 0;
        self.phase = Phase::PickTarget;
        self.target = None;
        self.block_events = Some(ctx.events.subscribe(EventFilter::BlockChanges));
        Ok(Invocation::Running)
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        let target_invalidated = self.target_invalidated();
        match self.phase {
            Phase::PickTarget => {
                if !self.has_required_tool(ctx) {
                    return Ok(StepOutcome::Resolved(self.resolve_partial(ctx, TOOL_CONSUMED)));
                }
                ctx.hydrate_surroundings(None);
                let Some(target) = self.closest_target(ctx) else {
                    return Ok(StepOutcome::Resolved(
                        self.resolve_partial(ctx, NO_MORE_IN_IMMEDIATE_SURROUNDINGS),
                    ));
                };
                self.target = Some(target);
                if ctx.agent_voxel().distance_to(target) <= MAX_REACH {
                    ctx.world.start_dig(target)?;
                    self.phase = Phase::Digging;
                } else {
                    ctx.world.set_movement_goal(target)?;
                    self.phase = Phase::Moving;
                }
                Ok(StepOutcome::Continue)
            }
            Phase::Moving => {
                // Someone else broke or buried the block we were walking to.
                if target_invalidated {
                    ctx.world.clear_movement_goal();
                    self.phase = Phase::PickTarget;
                    self.target = None;
                    return Ok(StepOutcome::Continue);
                }
                match ctx.world.movement_status() {
                    MovementStatus::Moving | MovementStatus::Idle => Ok(StepOutcome::Continue),
                    MovementStatus::Reached => {
                        ctx.world.clear_movement_goal();
                        self.phase = Phase::PickTarget;
                        Ok(StepOutcome::Continue)
                    }
                    MovementStatus::NoPath | MovementStatus::TimedOut => {
                        ctx.world.clear_movement_goal();
                        Ok(StepOutcome::Resolved(
                            self.resolve_partial(ctx, COULD_NOT_PATHFIND_UNTIL_REACHABLE),
                        ))
                    }
                }
            }
            Phase::Digging => match ctx.world.action_status() {
                ActionStatus::InProgress | ActionStatus::Idle => Ok(StepOutcome::Continue),
                ActionStatus::Completed => {
                    self.broken += 1;
                    self.target = None;
                    if self.broken >= self.target_quantity {
                        Ok(StepOutcome::Resolved(self.resolve_success(ctx)))
                    } else {
                        self.phase = Phase::PickTarget;
                        Ok(StepOutcome::Continue)
                    }
                }
                ActionStatus::Failed(reason) => {
                    log::warn!("dig failed: {}", reason);
                    Ok(StepOutcome::Resolved(self.resolve_partial(ctx, &reason)))
                }
            },
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        ctx.world.clear_movement_goal();
        self.phase = Phase::PickTarget;
        self.target = None;
        Ok(())
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        ctx.world.clear_movement_goal();
        Ok(())
    }
}
