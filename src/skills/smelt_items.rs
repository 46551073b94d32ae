//! smeltItems: smelt a quantity of an item in a furnace with a named fuel.

use super::{
    arg_str, arg_u32_or, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome,
};
use crate::env_state::item_totals;
use crate::error::AgentResult;
use crate::world::{ActionStatus, ItemId};
use serde_json::Value;

pub struct SmeltItems {
    item_name: String,
    output_name: String,
    input: Option<(ItemId, ItemId)>,
    quantity: u32,
    input_before: u32,
}

impl SmeltItems {
    pub fn new() -> Self {
        Self {
            item_name: String::new(),
            output_name: String::new(),
            input: None,
            quantity: 0,
            input_before: 0,
        }
    }
}

impl Skill for SmeltItems {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "smeltItems",
            signature: "smeltItems(item: string, withFuelItem: string, quantityToSmelt: number = 1)",
        }
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let item_name = arg_str(args, 0).unwrap_or_default();
        let fuel_name = arg_str(args, 1).unwrap_or_default();
        let quantity = arg_u32_or(args, 2, 1).max(1);

        let registry = ctx.world.registry();
        let smeltable = registry
            .item_id(&item_name)
            .and_then(|id| registry.smelting_output(id).map(|out| (id, out)));
        let Some((input_id, output_id)) = smeltable else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized smeltable minecraft item.",
                item_name
            ))));
        };
        let output_name = registry.item_name(output_id).to_string();

        let fuel = registry
            .item_id(&fuel_name)
            .filter(|id| registry.item(*id).and_then(|d| d.fuel_value).is_some());
        let totals = item_totals(&ctx.world.inventory_slots(), ctx.world.registry());
        let Some(fuel_id) = fuel.filter(|_| totals.contains_key(&fuel_name)) else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: The specified fuel item '{}' is not in your inventory.",
                fuel_name
            ))));
        };

        ctx.hydrate_surroundings(None);
        let has_furnace = totals.contains_key("furnace")
            || ctx.surroundings.immediate_contains("furnace");
        if !has_furnace {
            return Ok(Invocation::Resolved(SkillResult::hydrated(
                "SkillInvocationError: Smelting requires something to smelt in (e.g., a \
                 furnace), but there is no such thing in your inventory or immediate \
                 surroundings.",
            )));
        }

        self.input_before = totals.get(&item_name).copied().unwrap_or(0);
        ctx.world.start_smelt(input_id, fuel_id, quantity)?;
        self.item_name = item_name;
        self.output_name = output_name;
        self.input = Some((input_id, fuel_id));
        self.quantity = quantity;
        Ok(Invocation::Running)
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        match ctx.world.action_status() {
            ActionStatus::InProgress | ActionStatus::Idle => Ok(StepOutcome::Continue),
            ActionStatus::Completed => {
                let totals = item_totals(&ctx.world.inventory_slots(), ctx.world.registry());
                let input_left = totals.get(&self.item_name).copied().unwrap_or(0);
                let smelted = self.input_before.saturating_sub(input_left);
                ctx.hydrate_surroundings(None);
                if smelted < self.quantity {
                    Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                        "You were only able to smelt {} of the intended {} of '{}', \
                         acquiring '{}' of '{}'.",
                        smelted, self.quantity, self.item_name, smelted, self.output_name
                    ))))
                } else {
                    Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                        "You successfully smelted '{}' of '{}', acquiring '{}' of '{}'.",
                        smelted, self.item_name, smelted, self.output_name
                    ))))
                }
            }
            ActionStatus::Failed(reason) => {
                log::warn!("smelt failed: {}", reason);
                let totals = item_totals(&ctx.world.inventory_slots(), ctx.world.registry());
                let input_left = totals.get(&self.item_name).copied().unwrap_or(0);
                let smelted = self.input_before.saturating_sub(input_left);
                Ok(StepOutcome::Resolved(SkillResult::new(format!(
                    "You were only able to smelt {} of the intended {} of '{}', acquiring \
                     '{}' of '{}'.",
                    smelted, self.quantity, self.item_name, smelted, self.output_name
                ))))
            }
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        Ok(())
    }

    fn on_resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        if let Some((input, fuel)) = self.input {
            // Whatever already smelted stays smelted; only the remainder is retried.
            let totals = item_totals(&ctx.world.inventory_slots(), ctx.world.registry());
            let input_left = totals.get(&self.item_name).copied().unwrap_or(0);
            let smelted = self.input_before.saturating_sub(input_left);
            let remaining = self.quantity.saturating_sub(smelted);
            if remaining > 0 {
                ctx.world.start_smelt(input, fuel, remaining)?;
            }
        }
        Ok(None)
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::SurroundingsRadii;
    use crate::skills::ActiveSkill;
    use crate::world::sim::SimWorld;
    use crate::world::VoxelPos;

    fn furnace_world() -> SimWorld {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, 0, 0), "furnace");
        world
    }

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
    fn smelts_iron_with_coal() {
        let mut world = furnace_world();
        world.give_items("raw_iron", 3);
        world.give_items("coal", 2);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(SmeltItems::new()));
        let args = vec![
            serde_json::json!("raw_iron"),
            serde_json::json!("coal"),
            serde_json::json!(3),
        ];
        assert!(active.invoke(&mut ctx, &args).expect("invoke").is_none());

        let result = drive(&mut active, &mut ctx, 10);
        assert_eq!(
            result.message,
            "You successfully smelted '3' of 'raw_iron', acquiring '3' of 'iron_ingot'."
        );
    }

    #[test]
    fn smelting_less_than_requested_is_partial() {
        let mut world = furnace_world();
        world.give_items("raw_iron", 1);
        world.give_items("coal", 2);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(SmeltItems::new()));
        let args = vec![
            serde_json::json!("raw_iron"),
            serde_json::json!("coal"),
            serde_json::json!(4),
        ];
        active.invoke(&mut ctx, &args).expect("invoke");

        let result = drive(&mut active, &mut ctx, 10);
        assert_eq!(
            result.message,
            "You were only able to smelt 1 of the intended 4 of 'raw_iron', acquiring '1' \
             of 'iron_ingot'."
        );
    }

    #[test]
    fn smelt_failure_resolves_with_partial_success() {
        let mut world = furnace_world();
        world.give_items("raw_iron", 3);
        world.give_items("coal", 2);
        world.fail_next_action = Some("furnace occupied".to_string());
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(SmeltItems::new()));
        let args = vec![
            serde_json::json!("raw_iron"),
            serde_json::json!("coal"),
            serde_json::json!(3),
        ];
        active.invoke(&mut ctx, &args).expect("invoke");

        let result = drive(&mut active, &mut ctx, 10);
        assert_eq!(
            result.message,
            "You were only able to smelt 0 of the intended 3 of 'raw_iron', acquiring '0' \
             of 'iron_ingot'."
        );
    }

    #[test]
    fn rejects_unsmeltable_items_and_missing_fuel() {
        let mut world = furnace_world();
        world.give_items("dirt", 1);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(SmeltItems::new()));
        let args = vec![serde_json::json!("dirt"), serde_json::json!("coal")];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "SkillInvocationError: 'dirt' is not a recognized smeltable minecraft item."
        );

        let mut world = furnace_world();
        world.give_items("raw_iron", 1);
        let mut ctx = ctx_with(world);
        let mut active = ActiveSkill::new(Box::new(SmeltItems::new()));
        let args = vec![serde_json::json!("raw_iron"), serde_json::json!("coal")];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "SkillInvocationError: The specified fuel item 'coal' is not in your inventory."
        );
    }

    #[test]
    fn requires_a_furnace() {
        let mut world = SimWorld::new();
        world.give_items("raw_iron", 1);
        world.give_items("coal", 1);
        let mut ctx = ctx_with(world);

        let mut active = ActiveSkill::new(Box::new(SmeltItems::new()));
        let args = vec![serde_json::json!("raw_iron"), serde_json::json!("coal")];
        let result = active
            .invoke(&mut ctx, &args)
            .expect("invoke")
            .expect("resolved");
        assert_eq!(
            result.message,
            "SkillInvocationError: Smelting requires something to smelt in (e.g., a \
             furnace), but there is no such thing in your inventory or immediate \
             surroundings."
        );
    }
}
