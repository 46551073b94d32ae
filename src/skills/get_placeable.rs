//! getPlaceableCoordinates: enumerate the air voxels within reach that a
//! block could currently be placed at. Resolves synchronously at invocation.

use super::place_block::{has_support, is_air};
use super::{fmt_coords, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome};
use crate::constants::agent::MAX_REACH;
use crate::constants::skills::GET_PLACEABLE_TIMEOUT_MS;
use crate::error::{AgentError, AgentResult};
use crate::world::{Ray, VoxelPos};
use cgmath::InnerSpace;
use serde_json::Value;
use std::time::Duration;

pub struct GetPlaceableCoordinates;

impl GetPlaceableCoordinates {
    pub fn new() -> Self {
        Self
    }

    /// A placeable voxel must also be visible: the ray from the eye to its
    /// center may not strike another block first.
    fn visible_from_eye(ctx: &SkillContext, voxel: VoxelPos) -> bool {
        let eye = ctx.world.eye_position();
        let delta = voxel.center() - eye;
        let distance = delta.magnitude();
        if distance < 1e-3 {
            return true;
        }
        match ctx.world.raycast(Ray::new(eye, delta), distance) {
            None => true,
            Some(hit) => hit.position == voxel,
        }
    }

    fn placeable_coordinates(ctx: &SkillContext) -> Vec<VoxelPos> {
        let agent = ctx.agent_voxel();
        let eye = ctx.world.eye_position();
        let reach = MAX_REACH.ceil() as i32;
        let mut placeable = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let voxel = agent.offset(dx, dy, dz);
                    // The agent's own feet and head voxels are occupied.
                    if voxel == agent || voxel == agent.offset(0, 1, 0) {
                        continue;
                    }
                    if !is_air(ctx, voxel) || !has_support(ctx, voxel) {
                        continue;
                    }
                    if (voxel.center() - eye).magnitude() > MAX_REACH {
                        continue;
                    }
                    if !Self::visible_from_eye(ctx, voxel) {
                        continue;
                    }
                    placeable.push(voxel);
                }
            }
        }
        placeable.sort_by(|a, b| {
            let da = agent.distance_to(*a);
            let db = agent.distance_to(*b);
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.to_array().cmp(&b.to_array()))
        });
        placeable
    }
}

impl Skill for GetPlaceableCoordinates {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "getPlaceableCoordinates",
            signature: "getPlaceableCoordinates()",
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(GET_PLACEABLE_TIMEOUT_MS)
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, _args: &[Value]) -> AgentResult<Invocation> {
        ctx.hydrate_surroundings(None);
        let placeable = Self::placeable_coordinates(ctx);
        if placeable.is_empty() {
            return Ok(Invocation::Resolved(SkillResult::hydrated(
                "Currently, there are no coordinates at which a block can be placed. \
                 Perhaps the bot is in a 1x1 hole or some other tight space.",
            )));
        }
        let listed = placeable
            .iter()
            .map(|v| fmt_coords(*v))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Invocation::Resolved(SkillResult::hydrated(format!(
            "Currently, these are the coordinates at which a block can be placed: [{}]",
            listed
        ))))
    }

    fn step(&mut self, _ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        Err(AgentError::SkillLifecycle(
            "getPlaceableCoordinates resolves at invocation and is never stepped".into(),
        ))
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

    #[test]
    fn lists_reachable_supported_air_voxels_closest_first() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, -1, 0), "stone");
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(GetPlaceableCoordinates::new()));
        let result = active
            .invoke(&mut ctx, &[])
            .expect("invoke")
            .expect("resolved synchronously");
        assert_eq!(
            result.message,
            "Currently, these are the coordinates at which a block can be placed: \
             [[1, -1, 0], [2, 0, 0], [2, -1, -1], [2, -1, 1]]"
        );
        assert!(result.env_state_hydrated);
    }

    #[test]
    fn occluded_voxels_are_not_listed() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, -1, 0), "stone");
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(GetPlaceableCoordinates::new()));
        let result = active
            .invoke(&mut ctx, &[])
            .expect("invoke")
            .expect("resolved");
        // The voxel under the support block is hidden behind it.
        assert!(!result.message.contains("[2, -2, 0]"));
    }

    #[test]
    fn empty_world_has_nowhere_to_place() {
        let mut ctx = ctx_with(SimWorld::new());
        let mut active = ActiveSkill::new(Box::new(GetPlaceableCoordinates::new()));
        let result = active
            .invoke(&mut ctx, &[])
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "Currently, there are no coordinates at which a block can be placed. Perhaps \
             the bot is in a 1x1 hole or some other tight space."
        );
    }
}
