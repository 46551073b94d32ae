//! Inventory accounting: name-keyed totals and before/after deltas.

use crate::world::{ItemStack, Registry};
use std::collections::BTreeMap;

/// Total count per item name across all slots.
pub fn item_totals(slots: &[ItemStack], registry: &Registry) -> BTreeMap<String, u32> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for slot in slots {
        let name = registry.item_name(slot.item).to_string();
        *totals.entry(name).or_insert(0) += slot.count;
    }
    totals
}

/// Net inventory change over a skill execution, by item name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryDelta {
    pub acquired: BTreeMap<String, u32>,
    pub lost: BTreeMap<String, u32>,
}

impl InventoryDelta {
    pub fn is_empty(&self) -> bool {
        self.acquired.is_empty() && self.lost.is_empty()
    }
}

/// Diff two totals maps. An item missing from one side counts as zero.
pub fn diff_totals(
    before: &BTreeMap<String, u32>,
    after: &BTreeMap<String, u32>,
) -> InventoryDelta {
    let mut delta = InventoryDelta::default();
    for (name, &count_after) in after {
        let count_before = before.get(name).copied().unwrap_or(0);
        if count_after > count_before {
            delta
                .acquired
                .insert(name.clone(), count_after - count_before);
        }
    }
    for (name, &count_before) in before {
        let count_after = after.get(name).copied().unwrap_or(0);
        if count_before > count_after {
            delta.lost.insert(name.clone(), count_before - count_after);
        }
    }
    delta
}

/// Remaining durability as a percent string, rounded to whole percent.
pub fn durability_remaining(used: u32, max: u32) -> String {
    if max == 0 {
        return "0%".to_string();
    }
    let remaining = max.saturating_sub(used);
    let percent = (remaining as f64 * 100.0 / max as f64).round() as u32;
    format!("{}%", percent)
}
