//! Environment state reporting: the controller-facing snapshot of where the
//! agent is, what it holds, and what it can see.

mod dto;
mod inventory;

pub use dto::{
    DistantDto, DistantEntryDto, EnvStateDto, ImmediateDto, InventoryItemDto, SurroundingsDto,
};
pub use inventory::{diff_totals, durability_remaining, item_totals, InventoryDelta};

use crate::perception::{SurroundingsIndex, SurroundingsSnapshot};
use crate::world::{VoxelPos, WorldClient};
use std::collections::BTreeMap;

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

fn coords(v: VoxelPos) -> [i32; 3] {
    v.to_array()
}

fn vitals(value: f32, max: f32) -> String {
    format!("{}/{}", value.round() as i32, max.round() as i32)
}

fn surroundings_dto(snapshot: &SurroundingsSnapshot) -> SurroundingsDto {
    let mut dto = SurroundingsDto {
        immediate: ImmediateDto {
            blocks_to_all_coords: snapshot
                .immediate
                .blocks_to_all_coords
                .iter()
                .map(|(name, vs)| (name.clone(), vs.iter().map(|v| coords(*v)).collect()))
                .collect(),
            biomes: snapshot
                .immediate
                .biomes_to_closest
                .iter()
                .map(|(name, v)| (name.clone(), coords(*v)))
                .collect(),
            items_to_all_coords: snapshot
                .immediate
                .items_to_all_coords
                .iter()
                .map(|(name, vs)| (name.clone(), vs.iter().map(|v| coords(*v)).collect()))
                .collect(),
        },
        distant: BTreeMap::new(),
    };

    for (dir, entry) in &snapshot.distant {
        let mut blocks = BTreeMap::new();
        for (name, &count) in &entry.block_counts {
            if let Some(closest) = entry.blocks_to_closest.get(name) {
                blocks.insert(
                    name.clone(),
                    DistantEntryDto {
                        count,
                        closest: coords(*closest),
                    },
                );
            }
        }
        let mut items = BTreeMap::new();
        for (name, &count) in &entry.item_counts {
            if let Some(closest) = entry.items_to_closest.get(name) {
                items.insert(
                    name.clone(),
                    DistantEntryDto {
                        count,
                        closest: coords(*closest),
                    },
                );
            }
        }
        let biomes = entry
            .biomes_to_closest
            .iter()
            .map(|(name, v)| (name.clone(), coords(*v)))
            .collect();
        dto.distant.insert(
            dir.wire_name().to_string(),
            DistantDto {
                blocks,
                biomes,
                items,
            },
        );
    }
    dto
}

/// Assemble the full environment state from the world and the last hydrated
/// surroundings snapshot.
pub fn build_env_state(world: &dyn WorldClient, index: &SurroundingsIndex) -> EnvStateDto {
    let registry = world.registry();
    let pos = world.agent_position();

    let inventory = world
        .inventory_slots()
        .iter()
        .map(|slot| {
            let durability = slot.durability_used.and_then(|used| {
                registry
                    .item(slot.item)
                    .and_then(|def| def.max_durability)
                    .map(|max| durability_remaining(used, max))
            });
            InventoryItemDto {
                name: registry.item_name(slot.item).to_string(),
                count: slot.count,
                durability,
            }
        })
        .collect();

    let equipped = world
        .equipment()
        .into_iter()
        .filter_map(|(slot, stack)| {
            stack.map(|s| {
                (
                    slot.wire_name().to_string(),
                    registry.item_name(s.item).to_string(),
                )
            })
        })
        .collect();

    EnvStateDto {
        player_coordinates: [round1(pos.x), round1(pos.y), round1(pos.z)],
        health: vitals(world.health(), crate::constants::agent::MAX_HEALTH),
        hunger: vitals(world.food(), crate::constants::agent::MAX_FOOD),
        inventory,
        equipped,
        surroundings: surroundings_dto(index.snapshot()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::SurroundingsRadii;
    use crate::world::sim::SimWorld;
    use cgmath::Point3;

    #[test]
    fn env_state_reflects_position_vitals_and_inventory() {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(10.26, 64.0, -3.14));
        world.set_vitals(17.0, 12.0);
        world.give_items("oak_log", 3);

        let mut index = SurroundingsIndex::new(SurroundingsRadii::default());
        index.refresh(&world);
        index.hydrate(&world, None);

        let state = build_env_state(&world, &index);
        assert_eq!(state.player_coordinates, [10.3, 64.0, -3.1]);
        assert_eq!(state.health, "17/20");
        assert_eq!(state.hunger, "12/20");
        assert_eq!(state.inventory.len(), 1);
        assert_eq!(state.inventory[0].name, "oak_log");
        assert_eq!(state.inventory[0].count, 3);
        assert_eq!(state.inventory[0].durability, None);
    }

    #[test]
    fn env_state_serializes_to_camel_case() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(2, 1, 0), "stone");
        let mut index = SurroundingsIndex::new(SurroundingsRadii {
            immediate: 5,
            distant: 10,
        });
        index.refresh(&world);
        index.hydrate(&world, None);

        let state = build_env_state(&world, &index);
        let json = serde_json::to_value(&state).expect("serializable");
        assert!(json.get("playerCoordinates").is_some());
        assert!(json["surroundings"]["immediate"]
            .get("blocksToAllCoords")
            .is_some());
        assert_eq!(
            json["surroundings"]["immediate"]["blocksToAllCoords"]["stone"][0],
            serde_json::json!([2, 1, 0])
        );
    }
}
