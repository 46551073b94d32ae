//! Skill orchestration: the cooperative loop that owns the world client,
//! drives at most one in-flight skill, and reports back to the controller.
//!
//! The loop keeps a strict single-outstanding-invocation protocol: a new
//! invocation while one is in flight is a hard protocol violation, not a
//! queue. Every resolution, including faux resolutions produced on the
//! skill's behalf (unknown skill, death, timeout), is answered with exactly
//! one [`AgentReport`].

mod channel;
mod self_preserver;

pub use channel::{
    AgentReport, ControllerChannel, ControllerEndpoint, InventoryChangesDto, PairChannel,
    SkillInvocation,
};
pub use self_preserver::SelfPreserver;

use crate::constants::orchestration::POLL_DELAY_MS;
use crate::env_state::{build_env_state, diff_totals, item_totals};
use crate::error::{AgentError, AgentResult};
use crate::perception::SurroundingsRadii;
use crate::skills::{build_skill, results, ActiveSkill, SkillContext, SkillResult};
use crate::world::WorldClient;
use std::collections::BTreeMap;
use std::time::Duration;

pub struct SkillOrchestrator<C: ControllerChannel> {
    channel: C,
    ctx: SkillContext,
    active: Option<ActiveSkill>,
    /// Invocation received last tick, dispatched this tick.
    pending: Option<SkillInvocation>,
    preserver: SelfPreserver,
    totals_at_last_report: BTreeMap<String, u32>,
    died_while_awaiting: bool,
}

impl<C: ControllerChannel> SkillOrchestrator<C> {
    pub fn new(channel: C, world: Box<dyn WorldClient>, radii: SurroundingsRadii) -> Self {
        Self {
            channel,
            ctx: SkillContext::new(world, radii),
            active: None,
            pending: None,
            preserver: SelfPreserver::new(),
            totals_at_last_report: BTreeMap::new(),
            died_while_awaiting: false,
        }
    }

    /// Blocking loop: initial state report, then one tick per poll interval
    /// until the controller goes away.
    pub fn run(&mut self) -> AgentResult<()> {
        self.send_initial_state()?;
        loop {
            match self.tick() {
                Ok(()) => {}
                Err(AgentError::ChannelClosed) => {
                    log::info!("controller disconnected, shutting down");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
            std::thread::sleep(Duration::from_millis(POLL_DELAY_MS));
        }
    }

    /// The very first report carries only the environment state.
    pub fn send_initial_state(&mut self) -> AgentResult<()> {
        self.ctx.hydrate_surroundings(None);
        let totals = item_totals(&self.ctx.world.inventory_slots(), self.ctx.world.registry());
        let report = AgentReport {
            env_state: build_env_state(self.ctx.world.as_ref(), &self.ctx.surroundings),
            skill_invocation_results: None,
            inventory_changes: None,
        };
        self.channel.send(&report)?;
        self.totals_at_last_report = totals;
        Ok(())
    }

    /// One cooperative turn of the loop.
    pub fn tick(&mut self) -> AgentResult<()> {
        self.ctx.pump_world_events();

        if self.ctx.take_death() {
            self.handle_death()?;
        }

        if let Some(invocation) = self.pending.take() {
            self.dispatch(invocation)?;
        }

        if let Some(invocation) = self.channel.try_recv()? {
            self.receive(invocation)?;
        }

        self.drive_active()?;
        self.preservation_bracket()?;
        Ok(())
    }

    fn receive(&mut self, invocation: SkillInvocation) -> AgentResult<()> {
        if self.active.is_some() || self.pending.is_some() {
            return Err(AgentError::ProtocolViolation(format!(
                "received invocation '{}' while a skill is already in flight",
                invocation.skill_name
            )));
        }
        self.pending = Some(invocation);
        Ok(())
    }

    fn dispatch(&mut self, invocation: SkillInvocation) -> AgentResult<()> {
        if self.died_while_awaiting {
            self.died_while_awaiting = false;
            log::warn!(
                "answering '{}' with a death notice instead of invoking it",
                invocation.skill_name
            );
            return self.finish(results::death_while_awaiting_invocation(
                &invocation.skill_name,
            ));
        }

        let Some(skill) = build_skill(&invocation.skill_name) else {
            return self.finish(results::skill_not_found(&invocation.skill_name));
        };
        let mut active = ActiveSkill::new(skill);
        log::info!("invoking skill '{}'", active.name());
        match active.invoke(&mut self.ctx, &invocation.args) {
            Ok(Some(result)) => self.finish(result),
            Ok(None) => {
                self.active = Some(active);
                Ok(())
            }
            Err(err) => {
                let name = active.name();
                log::error!("'{}' failed during invocation: {}", name, err);
                let _ = active.stop(&mut self.ctx);
                self.finish(results::unhandled_error(name, &err))
            }
        }
    }

    fn drive_active(&mut self) -> AgentResult<()> {
        let step = match self.active.as_mut() {
            Some(active) => active.step(&mut self.ctx),
            None => return Ok(()),
        };
        match step {
            Ok(Some(result)) => {
                self.active = None;
                self.finish(result)
            }
            Ok(None) => {
                let timed_out = self
                    .active
                    .as_ref()
                    .map(ActiveSkill::timed_out)
                    .unwrap_or(false);
                if timed_out {
                    if let Some(mut active) = self.active.take() {
                        let name = active.name();
                        let seconds = active.timeout_seconds();
                        log::warn!("'{}' exceeded its {}s budget, stopping", name, seconds);
                        let _ = active.stop(&mut self.ctx);
                        return self.finish(results::skill_timeout(name, seconds));
                    }
                }
                Ok(())
            }
            Err(err) => {
                if let Some(mut active) = self.active.take() {
                    let name = active.name();
                    log::error!("'{}' failed mid-execution: {}", name, err);
                    let _ = active.stop(&mut self.ctx);
                    self.finish(results::unhandled_error(name, &err))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Pause the active skill around a self-preservation routine. Paused
    /// time is credited back against the skill's timeout.
    fn preservation_bracket(&mut self) -> AgentResult<()> {
        if !self.preserver.should_self_preserve(&self.ctx) {
            return Ok(());
        }
        if let Some(active) = self.active.as_mut() {
            active.pause(&mut self.ctx)?;
        }
        self.preserver.preserve(&mut self.ctx)?;
        let resumed = match self.active.as_mut() {
            Some(active) => active.resume(&mut self.ctx)?,
            None => None,
        };
        if let Some(result) = resumed {
            self.active = None;
            self.finish(result)?;
        }
        Ok(())
    }

    fn handle_death(&mut self) -> AgentResult<()> {
        if let Some(mut active) = self.active.take() {
            log::warn!("agent died while '{}' was executing", active.name());
            let _ = active.stop(&mut self.ctx);
            self.finish(results::death_during_execution())
        } else {
            log::warn!("agent died while awaiting an invocation");
            self.died_while_awaiting = true;
            Ok(())
        }
    }

    /// Answer a resolution with exactly one report and roll the inventory
    /// baseline forward to the moment of sending.
    fn finish(&mut self, result: SkillResult) -> AgentResult<()> {
        if !result.env_state_hydrated {
            self.ctx.hydrate_surroundings(None);
        }
        let totals = item_totals(&self.ctx.world.inventory_slots(), self.ctx.world.registry());
        let delta = diff_totals(&self.totals_at_last_report, &totals);
        let report = AgentReport {
            env_state: build_env_state(self.ctx.world.as_ref(), &self.ctx.surroundings),
            skill_invocation_results: Some(result.message),
            inventory_changes: Some(InventoryChangesDto {
                items_acquired: delta.acquired,
                items_lost_or_consumed: delta.lost,
            }),
        };
        self.channel.send(&report)?;
        self.totals_at_last_report = totals;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;
    use crate::world::VoxelPos;

    fn harness(world: SimWorld) -> (SkillOrchestrator<PairChannel>, ControllerEndpoint) {
        let _ = env_logger::builder().is_test(true).try_init();
        let (agent_half, controller) = PairChannel::pair();
        let radii = SurroundingsRadii {
            immediate: 5,
            distant: 12,
        };
        (
            SkillOrchestrator::new(agent_half, Box::new(world), radii),
            controller,
        )
    }

    fn tick_until_report(
        orchestrator: &mut SkillOrchestrator<PairChannel>,
        controller: &ControllerEndpoint,
        max_ticks: usize,
    ) -> AgentReport {
        for _ in 0..max_ticks {
            orchestrator.tick().expect("tick");
            if let Some(report) = controller.try_recv_report().expect("recv") {
                return report;
            }
        }
        panic!("no report within {} ticks", max_ticks);
    }

    #[test]
    fn initial_report_carries_state_only() {
        let mut world = SimWorld::new();
        world.give_items("dirt", 7);
        let (mut orchestrator, controller) = harness(world);

        orchestrator.send_initial_state().expect("send");
        let report = controller
            .try_recv_report()
            .expect("recv")
            .expect("report present");
        assert!(report.skill_invocation_results.is_none());
        assert!(report.inventory_changes.is_none());
        assert_eq!(report.env_state.inventory[0].name, "dirt");
    }

    #[test]
    fn mining_reports_result_and_acquired_items() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, 1, 0), "oak_log");
        world.set_block_named(VoxelPos::new(3, 1, 0), "oak_log");
        let (mut orchestrator, controller) = harness(world);
        orchestrator.send_initial_state().expect("send");
        controller.try_recv_report().expect("recv").expect("initial");

        controller
            .invoke(
                "mineBlocks",
                vec![serde_json::json!("oak_log"), serde_json::json!(2)],
            )
            .expect("invoke");

        let report = tick_until_report(&mut orchestrator, &controller, 60);
        let message = report.skill_invocation_results.expect("result");
        assert!(message.contains("'oak_log'"), "got: {}", message);
        assert!(message.starts_with("You successfully broke"), "got: {}", message);
        let changes = report.inventory_changes.expect("changes");
        assert_eq!(changes.items_acquired.get("oak_log"), Some(&2));
        assert!(changes.items_lost_or_consumed.is_empty());
    }

    #[test]
    fn unknown_skill_gets_a_faux_resolution() {
        let (mut orchestrator, controller) = harness(SimWorld::new());
        orchestrator.send_initial_state().expect("send");
        controller.try_recv_report().expect("recv").expect("initial");

        controller.invoke("flyToTheMoon", vec![]).expect("invoke");
        let report = tick_until_report(&mut orchestrator, &controller, 5);
        let message = report.skill_invocation_results.expect("result");
        assert!(
            message.contains("'flyToTheMoon' is not a recognized or supported skill function"),
            "got: {}",
            message
        );
    }

    #[test]
    fn second_invocation_while_in_flight_is_a_protocol_violation() {
        let (mut orchestrator, controller) = harness(SimWorld::new());
        orchestrator.send_initial_state().expect("send");
        controller.try_recv_report().expect("recv").expect("initial");

        controller
            .invoke("pathfindToCoordinates", vec![serde_json::json!([30, 0, 0])])
            .expect("invoke");
        orchestrator.tick().expect("receive tick");
        orchestrator.tick().expect("dispatch tick");

        controller
            .invoke("pathfindToCoordinates", vec![serde_json::json!([0, 0, 30])])
            .expect("second invoke");
        assert!(matches!(
            orchestrator.tick(),
            Err(AgentError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn death_during_execution_resolves_the_skill() {
        let mut world = SimWorld::new();
        world.kill_after_polls = Some(5);
        let (mut orchestrator, controller) = harness(world);
        orchestrator.send_initial_state().expect("send");
        controller.try_recv_report().expect("recv").expect("initial");

        controller
            .invoke("pathfindToCoordinates", vec![serde_json::json!([40, 0, 0])])
            .expect("invoke");

        let report = tick_until_report(&mut orchestrator, &controller, 20);
        let message = report.skill_invocation_results.expect("result");
        assert!(
            message.contains("while executing your last skill, you died"),
            "got: {}",
            message
        );
    }

    #[test]
    fn death_while_awaiting_fauxes_the_next_invocation() {
        let mut world = SimWorld::new();
        world.kill_after_polls = Some(1);
        let (mut orchestrator, controller) = harness(world);
        orchestrator.send_initial_state().expect("send");
        controller.try_recv_report().expect("recv").expect("initial");

        orchestrator.tick().expect("death tick");
        assert!(controller.try_recv_report().expect("recv").is_none());

        controller
            .invoke(
                "mineBlocks",
                vec![serde_json::json!("oak_log"), serde_json::json!(1)],
            )
            .expect("invoke");
        let report = tick_until_report(&mut orchestrator, &controller, 5);
        let message = report.skill_invocation_results.expect("result");
        assert!(
            message.contains("the invocation 'mineBlocks' was never attempted"),
            "got: {}",
            message
        );
    }

    #[test]
    fn low_health_triggers_recovery_between_skills() {
        let mut world = SimWorld::new();
        world.set_vitals(6.0, 10.0);
        world.give_items("bread", 1);
        let (mut orchestrator, controller) = harness(world);
        orchestrator.send_initial_state().expect("send");
        controller.try_recv_report().expect("recv").expect("initial");

        orchestrator.tick().expect("tick");
        assert!(orchestrator.ctx.world.health() > 6.0);
    }
}
