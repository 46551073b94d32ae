//! Static world catalog: block, item, and biome definitions by name.
//!
//! The registry is the single source of truth for name resolution. A name
//! typed by the controller is classified once, into a tagged `Thing`, tried
//! in the order block, item, biome.

use super::block::{BiomeId, BlockId, ItemId, ToolClass};
use std::collections::HashMap;

/// What a block yields when broken.
#[derive(Debug, Clone, Copy)]
pub struct BlockDrop {
    pub item: ItemId,
    pub min_count: u32,
    pub max_count: u32,
}

#[derive(Debug, Clone)]
pub struct BlockDef {
    pub id: BlockId,
    pub name: String,
    pub hardness: f32,
    /// Tool class required to harvest; `ToolClass::None` means bare hands work.
    pub harvest_tool: ToolClass,
    pub drop: Option<BlockDrop>,
}

#[derive(Debug, Clone)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    pub max_durability: Option<u32>,
    /// Hunger points restored when eaten; `None` means not edible.
    pub food_points: Option<u32>,
    pub tool_class: Option<ToolClass>,
    /// Smelting ticks provided when burned as fuel; `None` means not a fuel.
    pub fuel_value: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub output: ItemId,
    pub output_count: u32,
    pub ingredients: Vec<(ItemId, u32)>,
    pub requires_table: bool,
}

/// Result of classifying a controller-supplied name against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thing {
    Block(BlockId),
    Item(ItemId),
    Biome(BiomeId),
}

pub const SUPPORTED_THING_TYPES: &str = "['block', 'item', 'biome']";

/// Registry that stores all block, item, and biome types as data.
pub struct Registry {
    blocks: Vec<BlockDef>,
    items: Vec<ItemDef>,
    biome_names: Vec<String>,
    block_names: HashMap<String, BlockId>,
    item_names: HashMap<String, ItemId>,
    biome_name_ids: HashMap<String, BiomeId>,
    recipes: HashMap<ItemId, Recipe>,
    smelting: HashMap<ItemId, ItemId>,
}

impl Registry {
    /// Catalog with the vanilla-flavored vocabulary the skills and tests use.
    pub fn new() -> Self {
        let mut reg = Self {
            blocks: Vec::new(),
            items: Vec::new(),
            biome_names: Vec::new(),
            block_names: HashMap::new(),
            item_names: HashMap::new(),
            biome_name_ids: HashMap::new(),
            recipes: HashMap::new(),
            smelting: HashMap::new(),
        };

        // Block 0 is always air and drops nothing.
        reg.register_block("air", 0.0, ToolClass::None, None);

        let dirt = reg.register_item("dirt", None, None, None, None);
        let cobble = reg.register_item("cobblestone", None, None, None, None);
        let oak_log = reg.register_item("oak_log", None, None, None, Some(300));
        let sand = reg.register_item("sand", None, None, None, None);
        let raw_iron = reg.register_item("raw_iron", None, None, None, None);
        let coal = reg.register_item("coal", None, None, None, Some(1600));
        let planks = reg.register_item("oak_planks", None, None, None, Some(300));
        let stick = reg.register_item("stick", None, None, None, Some(100));
        let table_item = reg.register_item("crafting_table", None, None, None, Some(300));
        let furnace_item = reg.register_item("furnace", None, None, None, None);
        reg.register_item("iron_ingot", None, None, None, None);
        reg.register_item("torch", None, None, None, None);
        reg.register_item("bread", None, Some(5), None, None);
        reg.register_item("apple", None, Some(4), None, None);
        let wood_pick =
            reg.register_item("wooden_pickaxe", Some(59), None, Some(ToolClass::Pickaxe), None);
        reg.register_item("stone_pickaxe", Some(131), None, Some(ToolClass::Pickaxe), None);

        reg.register_block(
            "stone",
            1.5,
            ToolClass::Pickaxe,
            Some(BlockDrop { item: cobble, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "dirt",
            0.5,
            ToolClass::None,
            Some(BlockDrop { item: dirt, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "grass_block",
            0.6,
            ToolClass::None,
            Some(BlockDrop { item: dirt, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "oak_log",
            2.0,
            ToolClass::None,
            Some(BlockDrop { item: oak_log, min_count: 1, max_count: 1 }),
        );
        // Leaves usually decay into nothing without shears.
        reg.register_block("oak_leaves", 0.2, ToolClass::None, None);
        reg.register_block(
            "sand",
            0.5,
            ToolClass::None,
            Some(BlockDrop { item: sand, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "cobblestone",
            2.0,
            ToolClass::Pickaxe,
            Some(BlockDrop { item: cobble, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "coal_ore",
            3.0,
            ToolClass::Pickaxe,
            Some(BlockDrop { item: coal, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "iron_ore",
            3.0,
            ToolClass::Pickaxe,
            Some(BlockDrop { item: raw_iron, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "oak_planks",
            2.0,
            ToolClass::None,
            Some(BlockDrop { item: planks, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "crafting_table",
            2.5,
            ToolClass::None,
            Some(BlockDrop { item: table_item, min_count: 1, max_count: 1 }),
        );
        reg.register_block(
            "furnace",
            3.5,
            ToolClass::Pickaxe,
            Some(BlockDrop { item: furnace_item, min_count: 1, max_count: 1 }),
        );
        reg.register_block("water", 100.0, ToolClass::None, None);
        reg.register_block("bedrock", -1.0, ToolClass::None, None);

        for biome in ["plains", "forest", "desert", "river", "ocean"] {
            reg.register_biome(biome);
        }

        reg.register_recipe(planks, 4, vec![(oak_log, 1)], false);
        reg.register_recipe(stick, 4, vec![(planks, 2)], false);
        reg.register_recipe(table_item, 1, vec![(planks, 4)], false);
        reg.register_recipe(wood_pick, 1, vec![(planks, 3), (stick, 2)], true);
        reg.register_recipe(furnace_item, 1, vec![(cobble, 8)], true);
        let torch = reg.item_id("torch").expect("torch registered above");
        reg.register_recipe(torch, 4, vec![(stick, 1), (coal, 1)], false);

        let iron_ingot = reg.item_id("iron_ingot").expect("iron_ingot registered above");
        reg.smelting.insert(raw_iron, iron_ingot);

        reg
    }

    fn register_block(
        &mut self,
        name: &str,
        hardness: f32,
        harvest_tool: ToolClass,
        drop: Option<BlockDrop>,
    ) -> BlockId {
        let id = BlockId(self.blocks.len() as u16);
        self.blocks.push(BlockDef {
            id,
            name: name.to_string(),
            hardness,
            harvest_tool,
            drop,
        });
        self.block_names.insert(name.to_string(), id);
        id
    }

    fn register_item(
        &mut self,
        name: &str,
        max_durability: Option<u32>,
        food_points: Option<u32>,
        tool_class: Option<ToolClass>,
        fuel_value: Option<u32>,
    ) -> ItemId {
        let id = ItemId(self.items.len() as u16);
        self.items.push(ItemDef {
            id,
            name: name.to_string(),
            max_durability,
            food_points,
            tool_class,
            fuel_value,
        });
        self.item_names.insert(name.to_string(), id);
        id
    }

    fn register_biome(&mut self, name: &str) -> BiomeId {
        let id = BiomeId(self.biome_names.len() as u16);
        self.biome_names.push(name.to_string());
        self.biome_name_ids.insert(name.to_string(), id);
        id
    }

    fn register_recipe(
        &mut self,
        output: ItemId,
        output_count: u32,
        ingredients: Vec<(ItemId, u32)>,
        requires_table: bool,
    ) {
        self.recipes.insert(
            output,
            Recipe {
                output,
                output_count,
                ingredients,
                requires_table,
            },
        );
    }

    // Lookups

    pub fn block(&self, id: BlockId) -> Option<&BlockDef> {
        self.blocks.get(id.0 as usize)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.block_names.get(name).copied()
    }

    pub fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_names.get(name).copied()
    }

    pub fn biome_id(&self, name: &str) -> Option<BiomeId> {
        self.biome_name_ids.get(name).copied()
    }

    pub fn block_name(&self, id: BlockId) -> &str {
        self.block(id).map(|d| d.name.as_str()).unwrap_or("unknown")
    }

    pub fn item_name(&self, id: ItemId) -> &str {
        self.item(id).map(|d| d.name.as_str()).unwrap_or("unknown")
    }

    pub fn biome_name(&self, id: BiomeId) -> &str {
        self.biome_names
            .get(id.0 as usize)
            .map(|s| s.as_str())
            .unwrap_or("unknown")
    }

    pub fn recipe_for(&self, item: ItemId) -> Option<&Recipe> {
        self.recipes.get(&item)
    }

    pub fn smelting_output(&self, input: ItemId) -> Option<ItemId> {
        self.smelting.get(&input).copied()
    }

    /// Classify a controller-supplied name against the catalog.
    ///
    /// Precedence order is block, item, biome, matching how ambiguous names
    /// like "oak_log" should read in skill arguments.
    pub fn resolve(&self, name: &str) -> Option<Thing> {
        if let Some(id) = self.block_id(name) {
            return Some(Thing::Block(id));
        }
        if let Some(id) = self.item_id(name) {
            return Some(Thing::Item(id));
        }
        self.biome_id(name).map(Thing::Biome)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_blocks_over_items() {
        let reg = Registry::new();
        match reg.resolve("oak_log") {
            Some(Thing::Block(id)) => assert_eq!(reg.block_name(id), "oak_log"),
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn resolve_classifies_each_catalog() {
        let reg = Registry::new();
        assert!(matches!(reg.resolve("stick"), Some(Thing::Item(_))));
        assert!(matches!(reg.resolve("plains"), Some(Thing::Biome(_))));
        assert_eq!(reg.resolve("definitely_not_a_thing"), None);
    }

    #[test]
    fn air_is_block_zero_and_drops_nothing() {
        let reg = Registry::new();
        let air = reg.block_id("air").expect("air registered");
        assert_eq!(air, BlockId::AIR);
        assert!(reg.block(air).expect("air def").drop.is_none());
    }

    #[test]
    fn stone_drops_cobblestone() {
        let reg = Registry::new();
        let stone = reg.block_id("stone").expect("stone registered");
        let drop = reg.block(stone).expect("stone def").drop.expect("stone drop");
        assert_eq!(reg.item_name(drop.item), "cobblestone");
    }
}
