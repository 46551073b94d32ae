//! Skill contract and lifecycle enforcement.
//!
//! A skill is a resumable step function. `on_invoke` validates arguments and
//! either resolves immediately or starts work; `step` is then driven once per
//! cooperative turn until it resolves. Pause and resume bracket
//! self-preservation interruptions, and stop tears the skill down when the
//! orchestrator resolves on its behalf (timeout, death).
//!
//! [`ActiveSkill`] wraps a boxed skill and turns out-of-order lifecycle calls
//! into hard [`AgentError::SkillLifecycle`] errors rather than silent
//! misbehavior.

mod context;
pub mod results;

mod approach;
mod craft_items;
mod get_placeable;
mod mine_blocks;
mod pathfind;
mod pickup_item;
mod place_block;
mod screenshot;
mod smelt_items;

pub use context::SkillContext;

use crate::constants::orchestration::DEFAULT_SKILL_TIMEOUT_MS;
use crate::error::{AgentError, AgentResult};
use crate::world::VoxelPos;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Controller-facing description of one skill.
#[derive(Debug, Clone)]
pub struct SkillMetadata {
    pub name: &'static str,
    pub signature: &'static str,
}

/// Terminal outcome of a skill execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillResult {
    pub message: String,
    /// True when the skill hydrated the surroundings right before resolving,
    /// letting the orchestrator skip its own hydration.
    pub env_state_hydrated: bool,
}

impl SkillResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            env_state_hydrated: false,
        }
    }

    pub fn hydrated(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            env_state_hydrated: true,
        }
    }
}

/// What `on_invoke` decided.
pub enum Invocation {
    /// Work started; drive `step` until resolution.
    Running,
    /// Resolved without starting, usually an argument or precondition error.
    Resolved(SkillResult),
}

/// What one `step` call produced.
pub enum StepOutcome {
    Continue,
    Resolved(SkillResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillStatus {
    PendingInvocation,
    ActiveRunning,
    ActivePaused,
    Stopped,
}

/// A resumable, interruptible unit of agent behavior.
pub trait Skill {
    fn metadata(&self) -> SkillMetadata;

    /// Hard wall-clock budget for one execution, excluding paused time.
    fn timeout(&self) -> Duration {
        Duration::from_millis(DEFAULT_SKILL_TIMEOUT_MS)
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation>;

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome>;

    /// Suspend in-flight work so self-preservation can take the world.
    fn on_pause(&mut self, _ctx: &mut SkillContext) -> AgentResult<()> {
        Ok(())
    }

    /// Pick work back up. May resolve instead when the world changed too
    /// much underneath the skill while it was paused.
    fn on_resume(&mut self, _ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        Ok(None)
    }

    /// Tear down before an orchestrator-imposed resolution.
    fn on_stop(&mut self, _ctx: &mut SkillContext) -> AgentResult<()> {
        Ok(())
    }
}

/// Lifecycle wrapper around the single in-flight skill.
pub struct ActiveSkill {
    skill: Box<dyn Skill>,
    status: SkillStatus,
    started_at: Instant,
    paused_at: Option<Instant>,
    pause_credit: Duration,
}

impl ActiveSkill {
    pub fn new(skill: Box<dyn Skill>) -> Self {
        Self {
            skill,
            status: SkillStatus::PendingInvocation,
            started_at: Instant::now(),
            paused_at: None,
            pause_credit: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &'static str {
        self.skill.metadata().name
    }

    pub fn status(&self) -> SkillStatus {
        self.status
    }

    fn require(&self, expected: SkillStatus, op: &str) -> AgentResult<()> {
        if self.status != expected {
            return Err(AgentError::SkillLifecycle(format!(
                "{} called on '{}' in state {:?}, expected {:?}",
                op,
                self.name(),
                self.status,
                expected
            )));
        }
        Ok(())
    }

    /// Start the skill. Resolves immediately for argument errors.
    pub fn invoke(
        &mut self,
        ctx: &mut SkillContext,
        args: &[Value],
    ) -> AgentResult<Option<SkillResult>> {
        self.require(SkillStatus::PendingInvocation, "invoke")?;
        match self.skill.on_invoke(ctx, args)? {
            Invocation::Resolved(result) => {
                self.status = SkillStatus::Stopped;
                Ok(Some(result))
            }
            Invocation::Running => {
                self.status = SkillStatus::ActiveRunning;
                self.started_at = Instant::now();
                Ok(None)
            }
        }
    }

    pub fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        self.require(SkillStatus::ActiveRunning, "step")?;
        match self.skill.step(ctx)? {
            StepOutcome::Continue => Ok(None),
            StepOutcome::Resolved(result) => {
                self.status = SkillStatus::Stopped;
                Ok(Some(result))
            }
        }
    }

    pub fn pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        self.require(SkillStatus::ActiveRunning, "pause")?;
        self.skill.on_pause(ctx)?;
        self.status = SkillStatus::ActivePaused;
        self.paused_at = Some(Instant::now());
        Ok(())
    }

    pub fn resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        self.require(SkillStatus::ActivePaused, "resume")?;
        if let Some(paused_at) = self.paused_at.take() {
            self.pause_credit += paused_at.elapsed();
        }
        match self.skill.on_resume(ctx)? {
            Some(result) => {
                self.status = SkillStatus::Stopped;
                Ok(Some(result))
            }
            None => {
                self.status = SkillStatus::ActiveRunning;
                Ok(None)
            }
        }
    }

    /// Tear down ahead of an externally imposed resolution. Idempotent.
    pub fn stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        if self.status == SkillStatus::Stopped {
            return Ok(());
        }
        self.skill.on_stop(ctx)?;
        self.status = SkillStatus::Stopped;
        Ok(())
    }

    /// Running time past the skill's budget, with paused time excluded.
    pub fn timed_out(&self) -> bool {
        if self.status != SkillStatus::ActiveRunning {
            return false;
        }
        self.started_at.elapsed().saturating_sub(self.pause_credit) > self.skill.timeout()
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.skill.timeout().as_secs()
    }
}

/// Instantiate a skill by its wire name.
pub fn build_skill(name: &str) -> Option<Box<dyn Skill>> {
    match name {
        "pathfindToCoordinates" => Some(Box::new(pathfind::PathfindToCoordinates::new())),
        "approach" => Some(Box::new(approach::Approach::new())),
        "mineBlocks" => Some(Box::new(mine_blocks::MineBlocks::new())),
        "craftItems" => Some(Box::new(craft_items::CraftItems::new())),
        "smeltItems" => Some(Box::new(smelt_items::SmeltItems::new())),
        "pickupItem" => Some(Box::new(pickup_item::PickupItem::new())),
        "placeBlock" => Some(Box::new(place_block::PlaceBlock::new())),
        "getPlaceableCoordinates" => {
            Some(Box::new(get_placeable::GetPlaceableCoordinates::new()))
        }
        "takeScreenshotOf" => Some(Box::new(screenshot::TakeScreenshotOf::new())),
        _ => None,
    }
}

/// Metadata for every registered skill, for controller discovery.
pub fn all_skill_metadata() -> Vec<SkillMetadata> {
    [
        "pathfindToCoordinates",
        "approach",
        "mineBlocks",
        "craftItems",
        "smeltItems",
        "pickupItem",
        "placeBlock",
        "getPlaceableCoordinates",
        "takeScreenshotOf",
    ]
    .iter()
    .filter_map(|name| build_skill(name))
    .map(|skill| skill.metadata())
    .collect()
}

// Argument parsing helpers shared by the skill implementations.

pub(crate) fn arg_str(args: &[Value], idx: usize) -> Option<String> {
    args.get(idx)?.as_str().map(str::to_string)
}

pub(crate) fn arg_u32_or(args: &[Value], idx: usize, default: u32) -> u32 {
    args.get(idx)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(default)
}

/// Parse an `[x, y, z]` argument, flooring fractional components.
pub(crate) fn arg_coords(args: &[Value], idx: usize) -> Option<VoxelPos> {
    let arr = args.get(idx)?.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut parts = [0i32; 3];
    for (slot, value) in parts.iter_mut().zip(arr) {
        *slot = value.as_f64()?.floor() as i32;
    }
    Some(VoxelPos::new(parts[0], parts[1], parts[2]))
}

pub(crate) fn arg_str_list(args: &[Value], idx: usize) -> Option<Vec<String>> {
    match args.get(idx) {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(_) => None,
    }
}

pub(crate) fn fmt_coords(v: VoxelPos) -> String {
    format!("[{}, {}, {}]", v.x, v.y, v.z)
}
