//! Master-data collaborator: resolves room and item codes.
//!
//! The ledger never writes master data. It only asks whether a code exists and
//! is active before accepting a new ledger entry that references it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::Deserialize;
use thiserror::Error;

use labstock_core::{ItemCode, RoomCode};
use labstock_inventory::{Item, Room};

/// Read-only lookup of rooms and items.
pub trait Catalog: Send + Sync {
    fn room(&self, code: &RoomCode) -> Option<Room>;

    fn item(&self, code: &ItemCode) -> Option<Item>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog seed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Shape of the JSON catalog seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// In-memory catalog, seeded from JSON or built in code.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    rooms: RwLock<HashMap<RoomCode, Room>>,
    items: RwLock<HashMap<ItemCode, Item>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let catalog = Self::new();
        for room in seed.rooms {
            catalog.upsert_room(room);
        }
        for item in seed.items {
            catalog.upsert_item(item);
        }
        catalog
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed = serde_json::from_str(json)?;
        Ok(Self::from_seed(seed))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn upsert_room(&self, room: Room) {
        if let Ok(mut rooms) = self.rooms.write() {
            rooms.insert(room.code.clone(), room);
        }
    }

    pub fn upsert_item(&self, item: Item) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item.code.clone(), item);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn item_count(&self) -> usize {
        self.items.read().map(|i| i.len()).unwrap_or(0)
    }
}

impl Catalog for InMemoryCatalog {
    fn room(&self, code: &RoomCode) -> Option<Room> {
        self.rooms.read().ok()?.get(code).cloned()
    }

    fn item(&self, code: &ItemCode) -> Option<Item> {
        self.items.read().ok()?.get(code).cloned()
    }
}
