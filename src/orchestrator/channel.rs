//! Duplex controller channel: JSON messages over an in-process pair.
//!
//! The controller sends [`SkillInvocation`]s and receives [`AgentReport`]s.
//! The transport is abstracted behind [`ControllerChannel`] so the agent
//! loop does not care whether the other end is a test harness or a socket.

use crate::env_state::EnvStateDto;
use crate::error::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// What the controller asks of the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInvocation {
    pub skill_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChangesDto {
    pub items_acquired: BTreeMap<String, u32>,
    pub items_lost_or_consumed: BTreeMap<String, u32>,
}

/// What the agent reports back. The initial report after startup carries
/// neither a result nor inventory changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub env_state: EnvStateDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_invocation_results: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_changes: Option<InventoryChangesDto>,
}

pub trait ControllerChannel {
    /// Non-blocking poll for the next invocation.
    fn try_recv(&mut self) -> AgentResult<Option<SkillInvocation>>;

    fn send(&mut self, report: &AgentReport) -> AgentResult<()>;
}

/// Agent half of an in-process duplex pair carrying JSON strings.
pub struct PairChannel {
    incoming: Receiver<String>,
    outgoing: Sender<String>,
}

impl PairChannel {
    pub fn pair() -> (PairChannel, ControllerEndpoint) {
        let (to_agent, agent_incoming) = mpsc::channel();
        let (agent_outgoing, from_agent) = mpsc::channel();
        (
            PairChannel {
                incoming: agent_incoming,
                outgoing: agent_outgoing,
            },
            ControllerEndpoint {
                outgoing: to_agent,
                incoming: from_agent,
            },
        )
    }
}

impl ControllerChannel for PairChannel {
    fn try_recv(&mut self) -> AgentResult<Option<SkillInvocation>> {
        match self.incoming.try_recv() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AgentError::ChannelClosed),
        }
    }

    fn send(&mut self, report: &AgentReport) -> AgentResult<()> {
        let raw = serde_json::to_string(report)?;
        self.outgoing.send(raw).map_err(|_| AgentError::ChannelClosed)
    }
}

/// Controller half of the pair, used by tests and embedding harnesses.
pub struct ControllerEndpoint {
    outgoing: Sender<String>,
    incoming: Receiver<String>,
}

impl ControllerEndpoint {
    pub fn invoke(&self, skill_name: &str, args: Vec<Value>) -> AgentResult<()> {
        let invocation = SkillInvocation {
            skill_name: skill_name.to_string(),
            args,
        };
        let raw = serde_json::to_string(&invocation)?;
        self.outgoing.send(raw).map_err(|_| AgentError::ChannelClosed)
    }

    /// Send an arbitrary payload, for exercising malformed-message handling.
    pub fn send_raw(&self, raw: &str) -> AgentResult<()> {
        self.outgoing
            .send(raw.to_string())
            .map_err(|_| AgentError::ChannelClosed)
    }

    pub fn try_recv_report(&self) -> AgentResult<Option<AgentReport>> {
        match self.incoming.try_recv() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AgentError::ChannelClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_round_trips_through_the_pair() {
        let (mut agent, controller) = PairChannel::pair();
        controller
            .invoke("mineBlocks", vec![serde_json::json!("oak_log"), serde_json::json!(2)])
            .expect("send");

        let invocation = agent.try_recv().expect("recv").expect("present");
        assert_eq!(invocation.skill_name, "mineBlocks");
        assert_eq!(invocation.args.len(), 2);
        assert!(agent.try_recv().expect("empty poll").is_none());
    }

    #[test]
    fn invocation_json_uses_camel_case() {
        let parsed: SkillInvocation =
            serde_json::from_str(r#"{"skillName":"approach","args":["oak_log","east"]}"#)
                .expect("parse");
        assert_eq!(parsed.skill_name, "approach");
    }

    #[test]
    fn malformed_message_surfaces_as_error() {
        let (mut agent, controller) = PairChannel::pair();
        controller.send_raw("this is not json").expect("send");
        assert!(matches!(
            agent.try_recv(),
            Err(AgentError::MalformedMessage(_))
        ));
    }

    #[test]
    fn disconnected_controller_closes_the_channel() {
        let (mut agent, controller) = PairChannel::pair();
        drop(controller);
        assert!(matches!(agent.try_recv(), Err(AgentError::ChannelClosed)));
    }
}
