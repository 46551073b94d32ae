//! Wire-shaped view of the agent's environment, serialized to the
//! controller as camelCase JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDto {
    pub name: String,
    pub count: u32,
    /// Remaining durability like "83%", only for items that wear out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durability: Option<String>,
}

/// One name's presence in a distant direction: how many, and the closest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistantEntryDto {
    pub count: u32,
    pub closest: [i32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImmediateDto {
    pub blocks_to_all_coords: BTreeMap<String, Vec<[i32; 3]>>,
    pub biomes: BTreeMap<String, [i32; 3]>,
    pub items_to_all_coords: BTreeMap<String, Vec<[i32; 3]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistantDto {
    pub blocks: BTreeMap<String, DistantEntryDto>,
    pub biomes: BTreeMap<String, [i32; 3]>,
    pub items: BTreeMap<String, DistantEntryDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurroundingsDto {
    pub immediate: ImmediateDto,
    /// Keyed by direction name: "up", "north", "southeast", ...
    pub distant: BTreeMap<String, DistantDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvStateDto {
    /// Agent feet position, rounded to one decimal place.
    pub player_coordinates: [f32; 3],
    /// "17/20" style fraction.
    pub health: String,
    pub hunger: String,
    pub inventory: Vec<InventoryItemDto>,
    /// Slot wire name to item name, only for occupied slots.
    pub equipped: BTreeMap<String, String>,
    pub surroundings: SurroundingsDto,
}
