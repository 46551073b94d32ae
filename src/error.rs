//! Unified error type for the agent core.
//!
//! Nothing below the orchestrator boundary is allowed to escape to the
//! controller channel as an unhandled fault: skill-level problems become
//! structured `SkillResult`s, and only genuine programming/protocol errors
//! surface as `AgentError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// A voxel cache was read or written with an eye position other than the
    /// one it was last updated with.
    #[error("stale voxel cache reference: cache updated at {expected}, accessed with {actual}")]
    StaleCacheReference { expected: String, actual: String },

    /// A skill lifecycle method was called in a state that does not permit it.
    #[error("skill lifecycle violation: {0}")]
    SkillLifecycle(String),

    /// The controller violated the single-outstanding-invocation protocol.
    #[error("controller protocol violation: {0}")]
    ProtocolViolation(String),

    /// A primitive world action could not be started or failed irrecoverably.
    #[error("world action failed: {0}")]
    Action(String),

    /// The controller channel is gone.
    #[error("controller channel closed")]
    ChannelClosed,

    /// A controller message could not be decoded.
    #[error("malformed controller message: {0}")]
    MalformedMessage(#[from] serde_json::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
