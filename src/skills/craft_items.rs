//! craftItems: craft a quantity of an item from inventory ingredients,
//! using a crafting table when the recipe demands one.

use super::{
    arg_str, arg_u32_or, Invocation, Skill, SkillContext, SkillMetadata, SkillResult, StepOutcome,
};
use crate::env_state::item_totals;
use crate::error::AgentResult;
use crate::world::{ActionStatus, ItemId};
use serde_json::Value;

pub struct CraftItems {
    item_name: String,
    item: Option<ItemId>,
    quantity: u32,
}

impl CraftItems {
    pub fn new() -> Self {
        Self {
            item_name: String::new(),
            item: None,
            quantity: 0,
        }
    }
}

impl Skill for CraftItems {
    fn metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: "craftItems",
            signature: "craftItems(item: string, quantity: number = 1)",
        }
    }

    fn on_invoke(&mut self, ctx: &mut SkillContext, args: &[Value]) -> AgentResult<Invocation> {
        let item_name = arg_str(args, 0).unwrap_or_default();
        let quantity = arg_u32_or(args, 1, 1).max(1);

        let registry = ctx.world.registry();
        let recipe = registry
            .item_id(&item_name)
            .and_then(|id| registry.recipe_for(id))
            .cloned();
        let Some(recipe) = recipe else {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: '{}' is not a recognized craftable minecraft item.",
                item_name
            ))));
        };

        let totals = item_totals(&ctx.world.inventory_slots(), ctx.world.registry());
        let operations = quantity.div_ceil(recipe.output_count);
        let missing = recipe.ingredients.iter().any(|(ingredient, per_op)| {
            let name = ctx.world.registry().item_name(*ingredient);
            totals.get(name).copied().unwrap_or(0) < per_op * operations
        });
        if missing {
            return Ok(Invocation::Resolved(SkillResult::new(format!(
                "SkillInvocationError: You do not have the prerequisite ingredients to craft \
                 '{}' of '{}'.",
                quantity, item_name
            ))));
        }

        if recipe.requires_table {
            ctx.hydrate_surroundings(None);
            let has_table = totals.contains_key("crafting_table")
                || ctx.surroundings.immediate_contains("crafting_table");
            if !has_table {
                return Ok(Invocation::Resolved(SkillResult::hydrated(format!(
                    "SkillInvocationError: Crafting {} requires a crafting table, but there \
                     is no crafting table in your inventory or immediate surroundings.",
                    item_name
                ))));
            }
        }

        ctx.world.start_craft(recipe.output, quantity)?;
        self.item = Some(recipe.output);
        self.item_name = item_name;
        self.quantity = quantity;
        Ok(Invocation::Running)
    }

    fn step(&mut self, ctx: &mut SkillContext) -> AgentResult<StepOutcome> {
        match ctx.world.action_status() {
            ActionStatus::InProgress | ActionStatus::Idle => Ok(StepOutcome::Continue),
            ActionStatus::Completed => {
                ctx.hydrate_surroundings(None);
                Ok(StepOutcome::Resolved(SkillResult::hydrated(format!(
                    "You successfully crafted '{}' of '{}'.",
                    self.quantity, self.item_name
                ))))
            }
            ActionStatus::Failed(reason) => {
                log::warn!("craft failed: {}", reason);
                Ok(StepOutcome::Resolved(SkillResult::new(format!(
                    "SkillInvocationError: You do not have the prerequisite ingredients to \
                     craft '{}' of '{}'.",
                    self.quantity, self.item_name
                ))))
            }
        }
    }

    fn on_pause(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        Ok(())
    }

    fn on_resume(&mut self, ctx: &mut SkillContext) -> AgentResult<Option<SkillResult>> {
        if let Some(item) = self.item {
            ctx.world.start_craft(item, self.quantity)?;
        }
        Ok(None)
    }

    fn on_stop(&mut self, ctx: &mut SkillContext) -> AgentResult<()> {
        ctx.world.cancel_action();
        Ok(())
    }
}
