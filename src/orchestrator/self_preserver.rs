//! Self-preservation: throttled danger checks and a synchronous recovery
//! routine that runs to completion between skill turns.

use crate::constants::orchestration::{
    LOW_HEALTH_THRESHOLD, MAX_PRESERVATION_STEPS, SELF_PRESERVATION_THROTTLE_MS,
};
use crate::error::AgentResult;
use crate::skills::SkillContext;
use crate::world::{ActionStatus, ItemId, VoxelPos};
use std::time::{Duration, Instant};

pub struct SelfPreserver {
    throttle: Duration,
    last_check: Option<Instant>,
}

impl SelfPreserver {
    pub fn new() -> Self {
        Self::with_throttle(Duration::from_millis(SELF_PRESERVATION_THROTTLE_MS))
    }

    pub fn with_throttle(throttle: Duration) -> Self {
        Self {
            throttle,
            last_check: None,
        }
    }

    /// Throttled danger check. Returns true when recovery should interrupt
    /// whatever the agent is doing.
    pub fn should_self_preserve(&mut self, ctx: &SkillContext) -> bool {
        if let Some(last) = self.last_check {
            if last.elapsed() < self.throttle {
                return false;
            }
        }
        self.last_check = Some(Instant::now());

        if submerged(ctx) {
            return true;
        }
        ctx.world.health() < LOW_HEALTH_THRESHOLD && best_food(ctx).is_some()
    }

    /// Run recovery to completion. The active skill is paused around this.
    pub fn preserve(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        if submerged(ctx) {
            log::warn!("self-preservation: submerged, surfacing");
            self.surface(ctx)?;
        }
        if ctx.world.health() < LOW_HEALTH_THRESHOLD {
            if let Some(food) = best_food(ctx) {
                log::warn!(
                    "self-preservation: health {:.1}, eating",
                    ctx.world.health()
                );
                self.eat(ctx, food)?;
            }
        }
        Ok(())
    }

    fn eat(&mut self, ctx: &mut SkillContext, food: ItemId) -> AgentResult<()> {
        ctx.world.start_eat(food)?;
        for _ in 0..MAX_PRESERVATION_STEPS {
            ctx.pump_world_events();
            match ctx.world.action_status() {
                ActionStatus::InProgress => continue,
                _ => break,
            }
        }
        Ok(())
    }

    fn surface(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        let agent = ctx.agent_voxel();
        ctx.world
            .set_movement_goal(VoxelPos::new(agent.x, agent.y + 2, agent.z))?;
        for _ in 0..MAX_PRESERVATION_STEPS {
            ctx.pump_world_events();
            if !submerged(ctx) {
                break;
            }
            match ctx.world.movement_status() {
                crate::world::MovementStatus::Moving => continue,
                _ => break,
            }
        }
        ctx.world.clear_movement_goal();
        Ok(())
    }
}

impl Default for SelfPreserver {
    fn default() -> Self {
        Self::new()
    }
}

fn submerged(ctx: &SkillContext) -> bool {
    let eye = VoxelPos::from_world(ctx.world.eye_position());
    let registry = ctx.world.registry();
    ctx.world
        .block_at(eye)
        .map(|b| registry.block_name(b) == "water")
        .unwrap_or(false)
}

/// Edible item restoring the most hunger.
fn best_food(ctx: &SkillContext) -> Option<ItemId> {
    let registry = ctx.world.registry();
    ctx.world
        .inventory_slots()
        .iter()
        .filter_map(|slot| {
            registry
                .item(slot.item)
                .and_then(|d| d.food_points)
                .map(|points| (points, slot.item))
        })
        .max_by_key(|(points, _)| *points)
        .map(|(_, item)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::SurroundingsRadii;
    use crate::world::sim::SimWorld;

    fn ctx_with(world: SimWorld) -> SkillContext {
        SkillContext::new(
            Box::new(world),
            SurroundingsRadii {
                immediate: 5,
                distant: 8,
            },
        )
    }

    #[test]
    fn triggers_on_low_health_with_food_on_hand() {
        let mut world = SimWorld::new();
        world.set_vitals(6.0, 10.0);
        world.give_items("bread", 2);
        let ctx = ctx_with(world);

        let mut preserver = SelfPreserver::with_throttle(Duration::ZERO);
        assert!(preserver.should_self_preserve(&ctx));
    }

    #[test]
    fn does_not_trigger_without_food_or_at_full_health() {
        let mut world = SimWorld::new();
        world.set_vitals(6.0, 10.0);
        let ctx = ctx_with(world);
        let mut preserver = SelfPreserver::with_throttle(Duration::ZERO);
        assert!(!preserver.should_self_preserve(&ctx));

        let mut world = SimWorld::new();
        world.set_vitals(20.0, 10.0);
        world.give_items("bread", 1);
        let ctx = ctx_with(world);
        let mut preserver = SelfPreserver::with_throttle(Duration::ZERO);
        assert!(!preserver.should_self_preserve(&ctx));
    }

    #[test]
    fn eating_restores_health_and_consumes_the_food() {
        let mut world = SimWorld::new();
        world.set_vitals(6.0, 10.0);
        world.give_items("bread", 2);
        let mut ctx = ctx_with(world);

        let mut preserver = SelfPreserver::with_throttle(Duration::ZERO);
        preserver.preserve(&mut ctx).expect("preserve");
        assert!(ctx.world.health() > 6.0);
        let totals = crate::env_state::item_totals(
            &ctx.world.inventory_slots(),
            ctx.world.registry(),
        );
        assert_eq!(totals.get("bread"), Some(&1));
    }

    #[test]
    fn throttle_suppresses_back_to_back_checks() {
        let mut world = SimWorld::new();
        world.set_vitals(6.0, 10.0);
        world.give_items("bread", 1);
        let ctx = ctx_with(world);

        let mut preserver = SelfPreserver::with_throttle(Duration::from_secs(60));
        assert!(preserver.should_self_preserve(&ctx));
        assert!(!preserver.should_self_preserve(&ctx));
    }
}
