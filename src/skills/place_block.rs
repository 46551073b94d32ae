//! placeBlock: place a block from the inventory at nearby coordinates.

use super::{
    arg_coords, arg_str, fmt_coords, Invocation, Skill, SkillContext, SkillMetadata, SkillResult,
    StepOutcome,
};
use crate::error::{AgentError, AgentResult};
use crate::perception::Vicinity;
use crate::world::{ActionStatus, BlockFace, VoxelPos};
use serde_json::Value;

pub struct PlaceBlock {
    block_name: String,
    target: Option<VoxelPos>,
}

impl PlaceBlock {
    pub fn new() -> Self {
        Self {
            block_name: String::new(),
            target: None,
        }
    }

    /// A free voxel adjacent to the agent that has a face to place onto.
    fn pick_spot(ctx: &SkillContext) -> Option<VoxelPos> {
        let agent = ctx.agent_voxel();
        for face in BlockFace::ALL {
            let candidate = agent + face.offset();
            if !is_air(ctx, candidate) {
                continue;
            }
            if has_support(ctx, candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

pub(super) fn is_air(ctx: &SkillContext, voxel: VoxelPos) -> bool {
    ctx.world.block_at(voxel).map(|b| b.is_air()).unwrap_or(false)
}

pub(super) fn has_support(ctx: &SkillContext, voxel: VoxelPos) -> bool {
    BlockFace::ALL
        .iter()
        .any(|face| !is_air(ctx, voxel + face.offset()))
}

impl Skill for PlaceBlock {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "placeBlock",
            signature: "placeBlock(block: string, atCoordinates?: [number, number, number])",
        }
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let block_name = arg_str(args, 0).unwrap_or_default();
        let registry = ctx.world.registry();
        if registry.block_id(&block_name).is_none() {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized minecraft block.",
                block_name
            ))));
        }
        let Some(item_id) = registry.item_id(&block_name) else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: You do not have '{}' in your inventory.",
                block_name
            ))));
        };
        let in_inventory = ctx
            .world
            .inventory_slots()
            .iter()
            .any(|slot| slot.item == item_id);
        if !in_inventory {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: You do not have '{}' in your inventory.",
                block_name
            ))));
        }

        let target = match args.get(1) {
            Some(Value::Null) | None => match Self::pick_spot(ctx) {
                Some(spot) => spot,
                None => {
                    return Ok(Invocation::Resolved(SkillResult::new(format!(
                        "You were unable to place '{}' at coordinates '{}' because there \
                         were no adjacent blocks to place onto.",
                        block_name,
                        fmt_coords(ctx.agent_voxel())
                    ))))
                }
            },
            Some(_) => {
                let Some(coords) = arg_coords(args, 1) else {
                    return Ok(Invocation::Resolved(SkillResult::new(
                        "SkillInvocationError: atCoordinates must be an array of three \
                         numbers ordered as [x, y, z].",
                    )));
                };
                let vicinity = ctx.surroundings.classify_position(coords, ctx.agent_voxel());
                if !matches!(vicinity, Some(Vicinity::Immediate)) {
                    return Ok(Invocation::Resolved(SkillResult::new(
                        "SkillInvocationError: The specified coordinates must be within \
                         your immediate surroundings. Please pathfind to or near the \
                         coordinates first.",
                    )));
                }
                coords
            }
        };

        if !has_support(ctx, target) {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "You were unable to place '{}' at coordinates '{}' because there were no \
                 adjacent blocks to place onto.",
                block_name,
                fmt_coords(target)
            ))));
        }

        ctx.world.start_place(item_id, target)?;
        self.block_name = block_name;
        self.target = Some(target);
        Ok(Invocation::Running)
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        let target = self.target.ok_or_else(|| {
            AgentError::SkillLifecycle("placeBlock stepped without a target".into())
        })?;
        match ctx.world.action_status() {
            ActionStatus::InProgress | ActionStatus::Idle => Ok(StepOutcome::Continue),
            ActionStatus::Completed => {
                ctx.hydrate_surroundings(None);
                Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                    "You successfully placed '{}' at coordinates '{}'.",
                    self.block_name,
                    fmt_coords(target)
                ))))
            }
            ActionStatus::Failed(reason) => {
                log::warn!("place failed: {}", reason);
                Ok(StepOutcome::Resolved(SkillResult::new(format!(
                    "You were unable to place '{}' at coordinates '{}'.",
                    self.block_name,
                    fmt_coords(target)
                ))))
            }
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        Ok(())
    }

    fn on_resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        if let Some(target) = self.target {
            let item = ctx
                .world
                .registry()
                .item_id(&self.block_name)
                .ok_or_else(|| AgentError::SkillLifecycle("placed block has no item".into()))?;
            ctx.world.start_place(item, target)?;
        }
        Ok(None)
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::SurroundingsRadii;
    use crate::skills::ActiveSkill;
    use crate::world::sim::SimWorld;

    fn ctx_with(world: SimWorld) -> SkillContext {
        SkillContext::new(
            Box::new(world),
            SurroundingsRadii {
                immediate: 5,
                distant: 12,
            },
        )
    }

    fn drive(active: &mut ActiveSkill, ctx: &mut SkillContext, max_turns: usize) -> SkillResult {
        for _ in 0..max_turns {
            ctx.pump_world_events();
            if let Some(result) = active.step(ctx).expect("step") {
                return result;
            }
        }
        panic!("skill did not resolve within {} turns", max_turns);
    }

    #[test]
    fn places_a_block_at_supported_coordinates() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, -1, 0), "stone");
        world.give_items("dirt", 1);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(PlaceBlock::new()));
        let args = vec![serde_json::json!("dirt"), serde_json::json!([2, 0, 0])];
        assert!(active.invoke(&mut ctx, &args).expect("invoke").is_none());

        let result = drive(&mut active, &mut ctx, 10);
        assert_eq!(
            result.message,
            "You successfully placed 'dirt' at coordinates '[2, 0, 0]'."
        );
        assert_eq!(
            ctx.world
                .registry()
                .block_name(ctx.world.block_at(VoxelPos::new(2, 0, 0)).expect("block")),
            "dirt"
        );
    }

    #[test]
    fn placement_failure_resolves_instead_of_erroring() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, -1, 0), "stone");
        world.give_items("dirt", 1);
        world.fail_next_action = Some("placement obstructed".to_string());
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(PlaceBlock::new()));
        let args = vec![serde_json::json!("dirt"), serde_json::json!([2, 0, 0])];
        active.invoke(&mut ctx, &args).expect("invoke");

        let result = drive(&mut active, &mut ctx, 10);
        assert_eq!(
            result.message,
            "You were unable to place 'dirt' at coordinates '[2, 0, 0]'."
        );
    }

    #[test]
    fn rejects_far_coordinates() {
        let mut world = SimWorld::new();
        world.give_items("dirt", 1);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(PlaceBlock::new()));
        let args = vec![serde_json::json!("dirt"), serde_json::json!([30, 0, 0])];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "SkillInvocationError: The specified coordinates must be within your immediate \
             surroundings. Please pathfind to or near the coordinates first."
        );
    }

    #[test]
    fn rejects_blocks_not_in_inventory() {
        let mut ctx = ctx_with(SimWorld::new());
        let mut active = ActiveSkill::new(Box::new(PlaceBlock::new()));
        let args = vec![serde_json::json!("dirt"), serde_json::json!([1, 0, 0])];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "SkillInvocationError: You do not have 'dirt' in your inventory."
        );
    }

    #[test]
    fn reports_when_nothing_adjacent_to_place_onto() {
        let mut world = SimWorld::new();
        world.give_items("dirt", 1);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(PlaceBlock::new()));
        let args = vec![serde_json::json!("dirt"), serde_json::json!([2, 3, 0])];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "You were unable to place 'dirt' at coordinates '[2, 3, 0]' because there were \
             no adjacent blocks to place onto."
        );
    }
}
