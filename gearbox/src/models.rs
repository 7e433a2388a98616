//! Records decoded from the static data blobs.
//!
//! An item is one flat record; what it can do (protect, hold other items,
//! accept mods, modify the wearer's stats) is described by optional
//! capability blocks instead of a type hierarchy.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub category_id: String,
    #[serde(default)]
    pub icon_link: String,
    #[serde(default)]
    pub image_link: String,
    #[serde(default)]
    pub market_link: String,
    #[serde(default)]
    pub wiki_link: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "one")]
    pub max_stackable_amount: u32,
    #[serde(default)]
    pub conflicting_item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<ArmorCapability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerCapability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moddable: Option<ModdableCapability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wearable: Option<WearableCapability>,
}

fn one() -> u32 {
    1
}

impl Item {
    pub fn is_armor(&self) -> bool {
        self.armor.is_some()
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    pub fn mod_slots(&self) -> &[ModSlot] {
        self.moddable
            .as_ref()
            .map(|moddable| moddable.mod_slots.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorCapability {
    pub armor_class: u8,
    #[serde(default)]
    pub durability: f64,
    #[serde(default)]
    pub armored_areas: Vec<String>,
    #[serde(default)]
    pub blocks_headphones: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCapability {
    pub capacity: u32,
    #[serde(default)]
    pub whitelisted_item_ids: Vec<String>,
    #[serde(default)]
    pub blacklisted_item_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModdableCapability {
    #[serde(default)]
    pub mod_slots: Vec<ModSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preset_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModSlot {
    pub name: String,
    #[serde(default)]
    pub compatible_item_ids: Vec<String>,
    #[serde(default = "one")]
    pub max_stackable_amount: u32,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WearableCapability {
    pub ergonomics_modifier: f64,
    pub movement_speed_modifier: f64,
    pub turning_speed_modifier: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub item_id: String,
    pub merchant: String,
    #[serde(default)]
    pub merchant_level: u8,
    pub currency_name: String,
    pub value: f64,
    #[serde(default)]
    pub value_in_main_currency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<String>,
    #[serde(default)]
    pub barter_items: Vec<BarterItem>,
}

impl Price {
    pub fn is_barter(&self) -> bool {
        !self.barter_items.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarterItem {
    pub item_id: String,
    pub quantity: u32,
}

/// An item with the items installed in its mod slots; presets are stored
/// this way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub item_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub mod_slots: Vec<InventoryModSlot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryModSlot {
    pub mod_slot_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<InventoryItem>,
}

impl InventoryItem {
    /// Ids of this item and everything installed in it, depth first.
    pub fn item_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.item_id.as_str()];
        for slot in &self.mod_slots {
            if let Some(item) = &slot.item {
                ids.extend(item.item_ids());
            }
        }
        ids
    }
}

/// Presets are stored as the fully assembled item.
pub type Preset = InventoryItem;

/// Chance for one ammunition to penetrate each armor class, indexed from
/// class 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorPenetration {
    pub ammunition_id: String,
    #[serde(default)]
    pub penetration_chances: Vec<f64>,
}

impl ArmorPenetration {
    pub fn chance_against(&self, armor_class: u8) -> Option<f64> {
        let index = usize::from(armor_class).checked_sub(1)?;
        self.penetration_chances.get(index).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub name: String,
    pub merchant: String,
    #[serde(default)]
    pub wiki_link: String,
    #[serde(default)]
    pub required_level: u8,
}
