//! Results the orchestrator produces itself, outside any one skill.

use super::SkillResult;

pub fn skill_not_found(skill_name: &str) -> SkillResult {
    SkillResult::new(format!(
        "SkillInvocationError: '{}' is not a recognized or supported skill function. \
         Please check the spelling and try again.",
        skill_name
    ))
}

pub fn unhandled_error(skill_name: &str, error: &dyn std::fmt::Display) -> SkillResult {
    SkillResult::new(format!(
        "SkillRuntimeError: An unexpected/unhandled error occurred while attempting to \
         execute '{}': {}",
        skill_name, error
    ))
}

pub fn death_during_execution() -> SkillResult {
    SkillResult::new(
        "For some reason, while executing your last skill, you died. \
         This is your new state after respawning.",
    )
}

pub fn death_while_awaiting_invocation(skill_name: &str) -> SkillResult {
    SkillResult::new(format!(
        "For some reason, before your skill could be invoked, you died. Since death \
         results in a respawn (changed state), the invocation '{}' was never attempted. \
         This is your new state after respawning.",
        skill_name
    ))
}

pub fn skill_timeout(skill_name: &str, timeout_seconds: u64) -> SkillResult {
    SkillResult::new(format!(
        "SkillTimeoutError: The execution of skill '{}' passed the hard-coded time limit \
         of '{}' seconds. If something about your arguments made the skill take a very \
         long time; try changing them (e.g., reducing a quantity). Otherwise, the player \
         likely found its way into a bad state that caused it to get stuck; try doing \
         something else and coming back to this skill later. If the issue persists, \
         perhaps the skill is broken for your use case. Maybe try some other approach to \
         your goals?",
        skill_name, timeout_seconds
    ))
}
