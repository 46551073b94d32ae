//! takeScreenshotOf: render a screenshot of a thing visible in the
//! immediate surroundings. Resolves synchronously at invocation.

use super::{
    arg_coords, arg_str, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome,
};
use crate::error::{AgentError, AgentResult};
use crate::perception::Vicinity;
use crate::world::{VoxelPos, SUPPORTED_THING_TYPES};
use serde_json::Value;

pub struct TakeScreenshotOf;

impl TakeScreenshotOf {
    pub fn new() -> Self {
        Self
    }

    /// Closest visible occurrence of the thing in the immediate region.
    fn locate(ctx: &SkillContext, thing: &str) -> Option<VoxelPos> {
        let immediate = &ctx.surroundings.snapshot().immediate;
        immediate
            .blocks_to_all_coords
            .get(thing)
            .and_then(|coords| coords.first())
            .or_else(|| {
                immediate
                    .items_to_all_coords
                    .get(thing)
                    .and_then(|coords| coords.first())
            })
            .or_else(|| immediate.biomes_to_closest.get(thing))
            .copied()
    }
}

impl Skill for TakeScreenshotOf {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "takeScreenshotOf",
            signature: "takeScreenshotOf(thing: string, atCoordinates?: [number, number, number])",
        }
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let thing = arg_str(args, 0).unwrap_or_default();
        if ctx.world.registry().resolve(&thing).is_none() {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized or supported thing. \
                 Currently, only screenshot of these varieties of things can be taken: {}.",
                thing, SUPPORTED_THING_TYPES
            ))));
        }

        ctx.hydrate_surroundings(None);
        let target = match args.get(1) {
            Some(Value::Null) | None => match Self::locate(ctx, &thing) {
                Some(target) => target,
                None => {
                    return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                        "SkillInvocationError: '{}' not found in your immediate \
                         surroundings. A thing must be visible in your immediate \
                         surroundings in order to take a screenshot of it.",
                        thing
                    ))))
                }
            },
            Some(_) => {
                let coords = arg_coords(args, 1);
                let in_immediate = coords
                    .map(|c| {
                        matches!(
                            ctx.surroundings.classify_position(c, ctx.agent_voxel()),
                            Some(Vicinity::Immediate)
                        )
                    })
                    .unwrap_or(false);
                match (coords, in_immediate) {
                    (Some(c), true) => c,
                    _ => {
                        return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                            "SkillInvocationError: the coordinates specifying the location \
                             of the '{}' to take a screenshot of are not visible in your \
                             immediate surroundings.",
                            thing
                        ))))
                    }
                }
            }
        };

        let path = ctx.world.capture_screenshot(target)?;
        Ok(Invocation::Resolved(SkillResult::hydrated(format!(
            "You successfully took a screenshot of '{}'. The screenshot has been saved to \
             file path: '{}'.",
            thing, path
        ))))
    }

    fn step(&mut self, _ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        Err(AgentError::SkillLifecycle(
            "takeScreenshotOf resolves at invocation and is never stepped".into(),
        ))
    }
}
