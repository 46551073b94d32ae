//! approach: pathfind to the closest occurrence of a thing visible in a
//! named direction of the distant surroundings.
//!
//! The movement itself is delegated to an inner [`PathfindToCoordinates`];
//! this skill only resolves the thing to a coordinate up front and remaps
//! the pathfinding result into approach vocabulary afterwards.

use super::pathfind::PathfindToCoordinates;
use super::{
    arg_str, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome,
};
use crate::constants::skills::APPROACH_TIMEOUT_MS;
use crate::error::{AgentError, AgentResult};
use crate::perception::{Direction, Vicinity};
use crate::world::{VoxelPos, SUPPORTED_THING_TYPES};
use serde_json::Value;
use std::time::Duration;

pub struct Approach {
    thing: String,
    direction: Option<Direction>,
    target: Option<VoxelPos>,
    pathfind: PathfindToCoordinates,
}

impl Approach {
    pub fn new() -> Self {
        Self {
            thing: String::new(),
            direction: None,
            target: None,
            pathfind: PathfindToCoordinates::new(),
        }
    }

    /// Translate the inner pathfinding result into approach vocabulary.
    fn remap(&self, ctx: &mut SkillContext, sub: SkillResult) -> AgentResult<SkillResult> {
        let (target, direction) = match (self.target, self.direction) {
            (Some(t), Some(d)) => (t, d),
            _ => {
                return Err(AgentError::SkillLifecycle(
                    "approach resolved without a target".into(),
                ))
            }
        };
        if !sub.env_state_hydrated {
            ctx.hydrate_surroundings(None);
        }
        let vicinity = ctx.surroundings.classify_position(target, ctx.agent_voxel());
        if matches!(vicinity, Some(Vicinity::Immediate)) {
            Ok(SkillResult::hydrated(format!(
                "You successfully approached '{}' from the '{}' direction. '{}' should \
                 now be present in your immediate surroundings.",
                self.thing, direction, self.thing
            )))
        } else {
            Ok(SkillResult::hydrated(format!(
                "You were unable to approach thing '{}'. {}",
                self.thing, sub.message
            )))
        }
    }
}

impl Skill for Approach {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "approach",
            signature: "approach(thing: string, direction: string)",
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(APPROACH_TIMEOUT_MS)
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let thing = arg_str(args, 0).unwrap_or_default();
        if ctx.world.registry().resolve(&thing).is_none() {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized or supported thing. \
                 Currently, only these varieties of things can be approached: {}.",
                thing, SUPPORTED_THING_TYPES
            ))));
        }

        let direction_raw = arg_str(args, 1).unwrap_or_default();
        let Some(direction) = Direction::from_wire(&direction_raw) else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized direction of the distant \
                 surroundings.",
                direction_raw
            ))));
        };

        ctx.hydrate_surroundings(None);
        let visible_in = ctx.surroundings.distant_directions_of(&thing);
        if visible_in.is_empty() {
            return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                "SkillInvocationError: '{}' not found in your distant surroundings. A thing \
                 must be visible in your distant surroundings in order to be approached.",
                thing
            ))));
        }
        if !visible_in.contains(&direction) {
            return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                "SkillInvocationError: '{}' not found in your distant surroundings {} \
                 direction. The thing you want to approach must be visible in the specified \
                 direction of your distant surroundings.",
                thing, direction
            ))));
        }

        let target = ctx
            .surroundings
            .closest_in_direction(&thing, direction)
            .ok_or_else(|| {
                AgentError::SkillLifecycle(format!(
                    "'{}' listed in direction {} but has no closest coordinate",
                    thing, direction
                ))
            })?;

        log::info!("approaching '{}' at {} ({})", thing, target, direction);
        self.thing = thing;
        self.direction = Some(direction);
        self.target = Some(target);

        let coords = serde_json::json!([target.x, target.y, target.z]);
        match self.pathfind.on_invoke(ctx, &[coords])? {
            Invocation::Running => Ok(Invocation::Running),
            Invocation::Resolved(sub) => Ok(Invocation::Resolved(self.remap(ctx, sub)?)),
        }
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        match self.pathfind.step(ctx)? {
            StepOutcome::Continue => Ok(StepOutcome::Continue),
            StepOutcome::Resolved(sub) => Ok(StepOutcome::Resolved(self.remap(ctx, sub)?)),
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        self.pathfind.on_pause(ctx)
    }

    fn on_resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        match self.pathfind.on_resume(ctx)? {
            Some(sub) => Ok(Some(self.remap(ctx, sub)?)),
            None => Ok(None),
        }
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        self.pathfind.on_stop(ctx)
    }
}
