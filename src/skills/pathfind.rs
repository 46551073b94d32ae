//! pathfindToCoordinates: walk to or near a coordinate, with optional
//! early termination when named things become visible along the way.

use super::{
    arg_coords, arg_str_list, fmt_coords, Invocation, Skill, SkillContext, SkillMetadata,
    SkillResult, StepOutcome,
};
use crate::constants::skills::{PATHFIND_TIMEOUT_MS, STOP_IF_FOUND_CHECK_THROTTLE_MS};
use crate::constants::world::{COORD_LIMIT_XZ, MAX_Y, MIN_Y};
use crate::error::{AgentError, AgentResult};
use crate::events::{EventFilter, Subscription};
use crate::world::{MovementStatus, VoxelPos, SUPPORTED_THING_TYPES};
use serde_json::Value;
use std::time::Duration;

pub struct PathfindToCoordinates {
    target: Option<VoxelPos>,
    stop_if_found: Vec<String>,
    /// Held for the skill's lifetime so the interest is released on any exit.
    movement_events: Option<Subscription>,
}

impl PathfindToCoordinates {
    pub fn new() -> Self {
        Self {
            target: None,
            stop_if_found: Vec::new(),
            movement_events: None,
        }
    }

    fn target(&self) -> AgentResult<VoxelPos> {
        self.target.ok_or_else(|| {
            AgentError::SkillLifecycle("pathfindToCoordinates stepped without a target".into())
        })
    }

    /// Check the stop-if-found list against a (throttled) fresh snapshot.
    fn check_stop_if_found(&self, ctx: &mut SkillContext, target: VoxelPos) -> Option<SkillResult> {
        if self.stop_if_found.is_empty() {
            return None;
        }
        ctx.hydrate_surroundings(Some(Duration::from_millis(STOP_IF_FOUND_CHECK_THROTTLE_MS)));
        for name in &self.stop_if_found {
            if ctx.surroundings.immediate_contains(name) {
                return Some(SkillResult::new(format!(
                    "Your pathfinding to or near {} was terminated early since '{}' was \
                     found visible in the immediate surroundings.",
                    fmt_coords(target),
                    name
                )));
            }
            if !ctx.surroundings.distant_directions_of(name).is_empty() {
                return Some(SkillResult::new(format!(
                    "Your pathfinding to or near {} was terminated early since '{}' was \
                     found visible in the distant surroundings.",
                    fmt_coords(target),
                    name
                )));
            }
        }
        None
    }
}

/// The outcome a movement goal ended with, shared with `approach`.
pub(crate) fn partial_success_message(reached: VoxelPos, target: VoxelPos) -> String {
    format!(
        "You were only able to pathfind to {} and not {}.",
        fmt_coords(reached),
        fmt_coords(target)
    )
}

impl Skill for PathfindToCoordinates {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "pathfindToCoordinates",
            signature:
                "pathfindToCoordinates(coordinates: [number, number, number], stopIfFound?: string[])",
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(PATHFIND_TIMEOUT_MS)
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let Some(target) = arg_coords(args, 0) else {
            let raw = args
                .first()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "null".to_string());
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a valid coordinates array. Expected an \
                 array of three numbers ordered as [x, y, z].",
                raw
            ))));
        };

        if target.x.abs() > COORD_LIMIT_XZ
            || target.z.abs() > COORD_LIMIT_XZ
            || target.y < MIN_Y
            || target.y > MAX_Y
        {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a valid coordinates array. Expected an \
                 array of three numbers ordered as [x, y, z].",
                fmt_coords(target)
            ))));
        }

        let Some(stop_if_found) = arg_str_list(args, 1) else {
            return Ok(Invocation::Resolved(SkillResult::new(
                "SkillInvocationError: stopIfFound must be an array of thing names.",
            )));
        };
        for name in &stop_if_found {
            if ctx.world.registry().resolve(name).is_none() {
                return Ok(Invocation::Resolved(SkillResult::new(format!(
                    "SkillInvocationError: '{}' is not a recognized or supported thing. \
                     Currently, only these varieties of things can be stopped at if found: {}.",
                    name, SUPPORTED_THING_TYPES
                ))));
            }
        }

        log::info!("pathfinding to {} (stop if found: {:?})", target, stop_if_found);
        ctx.world.set_movement_goal(target)?;
        if !stop_if_found.is_empty() {
            self.movement_events = Some(ctx.events.subscribe(EventFilter::AgentMovement));
        }
        self.target = Some(target);
        self.stop_if_found = stop_if_found;
        Ok(Invocation::Running)
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        let target = self.target()?;

        // Stop-if-found only needs rechecking after the agent has moved.
        let moved = self
            .movement_events
            .as_ref()
            .map(|events| !events.poll().is_empty())
            .unwrap_or(false);
        if moved {
            if let Some(result) = self.check_stop_if_found(ctx, target) {
                ctx.world.clear_movement_goal();
                return Ok(StepOutcome::Resolved(result));
            }
        }

        match ctx.world.movement_status() {
            MovementStatus::Moving | MovementStatus::Idle => Ok(StepOutcome::Continue),
            MovementStatus::Reached => {
                ctx.world.clear_movement_goal();
                ctx.hydrate_surroundings(None);
                Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                    "You were able to successfully pathfind to or near {} (such that these \
                     coordinates are now in your immediate surroundings).",
                    fmt_coords(target)
                ))))
            }
            MovementStatus::NoPath | MovementStatus::TimedOut => {
                ctx.world.clear_movement_goal();
                Ok(StepOutcome::Resolved(SkillResult::new(
                    partial_success_message(ctx.agent_voxel(), target),
                )))
            }
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.clear_movement_goal();
        Ok(())
    }

    fn on_resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        if let Some(target) = self.target {
            ctx.world.set_movement_goal(target)?;
        }
        Ok(None)
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.clear_movement_goal();
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
    fn reaches_target_and_reports_success() {
        let mut ctx = ctx_with(SimWorld::new());
        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let args = vec![serde_json::json!([4, 0, 0])];
        assert!(active.invoke(&mut ctx, &args).expect("invoke").is_none());

        let result = drive(&mut active, &mut ctx, 20);
        assert_eq!(
            result.message,
            "You were able to successfully pathfind to or near [4, 0, 0] (such that these \
             coordinates are now in your immediate surroundings)."
        );
        assert!(result.env_state_hydrated);
    }

    #[test]
    fn no_path_resolves_with_partial_success() {
        let mut world = SimWorld::new();
        world.force_no_path = true;
        let mut ctx = ctx_with(world);
        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let args = vec![serde_json::json!([10, 64, 10])];
        active.invoke(&mut ctx, &args).expect("invoke");

        let result = drive(&mut active, &mut ctx, 5);
        assert_eq!(
            result.message,
            "You were only able to pathfind to [0, 0, 0] and not [10, 64, 10]."
        );
    }

    #[test]
    fn stop_if_found_terminates_early() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(3, 1, 0), "iron_ore");
        let mut ctx = ctx_with(world);
        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let args = vec![
            serde_json::json!([40, 0, 0]),
            serde_json::json!(["iron_ore"]),
        ];
        active.invoke(&mut ctx, &args).expect("invoke");

        let result = drive(&mut active, &mut ctx, 5);
        assert_eq!(
            result.message,
            "Your pathfinding to or near [40, 0, 0] was terminated early since 'iron_ore' \
             was found visible in the immediate surroundings."
        );
    }

    #[test]
    fn invalid_arguments_resolve_without_running() {
        let mut ctx = ctx_with(SimWorld::new());

        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let result = active
            .invoke(&mut ctx, &[serde_json::json!("not coords")])
            .expect("invoke")
            .expect("resolved");
        assert!(result.message.contains("is not a valid coordinates array"));

        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let args = vec![
            serde_json::json!([1, 2, 3]),
            serde_json::json!(["left_handed_smoke_shifter"]),
        ];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert!(result
            .message
            .contains("'left_handed_smoke_shifter' is not a recognized or supported thing"));
    }

    #[test]
    fn out_of_bounds_coordinates_resolve_without_running() {
        let mut ctx = ctx_with(SimWorld::new());

        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let result = active
            .invoke(&mut ctx, &[serde_json::json!([0, 1_000_000, 0])])
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "SkillInvocationError: '[0, 1000000, 0]' is not a valid coordinates array. \
             Expected an array of three numbers ordered as [x, y, z]."
        );
        assert_eq!(ctx.world.movement_status(), MovementStatus::Idle);

        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let result = active
            .invoke(&mut ctx, &[serde_json::json!([30_000_001, 0, 0])])
            .expect("invoke")
            .expect("resolved");
        assert!(result.message.contains("is not a valid coordinates array"));
    }

    #[test]
    fn stop_if_found_watch_releases_its_subscription_on_drop() {
        let mut ctx = ctx_with(SimWorld::new());
        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        let args = vec![
            serde_json::json!([40, 0, 0]),
            serde_json::json!(["iron_ore"]),
        ];
        active.invoke(&mut ctx, &args).expect("invoke");
        assert_eq!(ctx.events.subscriber_count(), 1);

        drop(active);
        assert_eq!(ctx.events.subscriber_count(), 0);
    }

    #[test]
    fn pause_clears_goal_and_resume_restores_it() {
        let mut ctx = ctx_with(SimWorld::new());
        let mut active = ActiveSkill::new(Box::new(PathfindToCoordinates::new()));
        active
            .invoke(&mut ctx, &[serde_json::json!([8, 0, 0])])
            .expect("invoke");

        ctx.pump_world_events();
        active.step(&mut ctx).expect("step");

        active.pause(&mut ctx).expect("pause");
        assert_eq!(ctx.world.movement_status(), MovementStatus::Idle);
        assert!(active.resume(&mut ctx).expect("resume").is_none());
        assert_eq!(ctx.world.movement_status(), MovementStatus::Moving);

        let result = drive(&mut active, &mut ctx, 20);
        assert!(result.message.starts_with("You were able to successfully pathfind"));
    }
}
