//! # System-Characteristics Store
//!
//! Holds the facts collected for a set of objects: one [`CollectedObject`]
//! per object id (a collection flag plus references to items) and the items
//! themselves, indexed by [`ItemId`].
//!
//! The store is populated before evaluation, either by a
//! [`CollectorRegistry`](crate::collector::CollectorRegistry) run or by
//! deserializing a JSON document, and is never mutated while an evaluation
//! pass borrows it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Item;
use crate::error::ValidationError;
use crate::identity::{ItemId, ObjectId};

// ---------------------------------------------------------------------------
// CollectedFlag
// ---------------------------------------------------------------------------

/// Outcome of collecting one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectedFlag {
    /// Every matching item was collected.
    #[default]
    Complete,
    /// Some matching items were collected, but not necessarily all.
    Incomplete,
    /// Collection failed.
    Error,
    /// Collection succeeded and found no matching item.
    DoesNotExist,
    /// No attempt was made to collect the object.
    NotCollected,
    /// The object does not apply to the collected system.
    NotApplicable,
}

impl std::fmt::Display for CollectedFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Error => "error",
            Self::DoesNotExist => "does not exist",
            Self::NotCollected => "not collected",
            Self::NotApplicable => "not applicable",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// CollectedObject
// ---------------------------------------------------------------------------

/// The collection record of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedObject {
    pub object_id: ObjectId,
    #[serde(default)]
    pub flag: CollectedFlag,
    /// Items collected for the object, in collection order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_refs: Vec<ItemId>,
    /// Diagnostics reported by the collector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl CollectedObject {
    pub fn new(object_id: ObjectId, flag: CollectedFlag) -> Self {
        Self {
            object_id,
            flag,
            item_refs: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_items(mut self, item_refs: Vec<ItemId>) -> Self {
        self.item_refs = item_refs;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

// ---------------------------------------------------------------------------
// SystemCharacteristics
// ---------------------------------------------------------------------------

/// Serialized layout of a system-characteristics document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemCharacteristicsDocument {
    #[serde(default)]
    pub objects: Vec<CollectedObject>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Collected objects and items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemCharacteristics {
    objects: BTreeMap<ObjectId, CollectedObject>,
    items: BTreeMap<ItemId, Item>,
    next_item_id: u64,
}

impl SystemCharacteristics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an item under the next sequential id and return that id.
    ///
    /// Any id already carried by the item is overwritten.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        self.next_item_id += 1;
        let id = ItemId::new(self.next_item_id);
        self.items.insert(id, item.with_id(id));
        id
    }

    /// Store items under fresh ids and record them for `object_id`.
    ///
    /// The flag is `does_not_exist` when `items` is empty and `complete`
    /// otherwise. Returns the assigned ids.
    pub fn record_items(&mut self, object_id: ObjectId, items: Vec<Item>) -> Vec<ItemId> {
        let ids: Vec<ItemId> = items.into_iter().map(|item| self.add_item(item)).collect();
        let flag = if ids.is_empty() {
            CollectedFlag::DoesNotExist
        } else {
            CollectedFlag::Complete
        };
        self.record_object(CollectedObject::new(object_id, flag).with_items(ids.clone()));
        ids
    }

    /// Record (or replace) the collection record of an object.
    pub fn record_object(&mut self, collected: CollectedObject) {
        if let Some(previous) = self.objects.insert(collected.object_id.clone(), collected) {
            tracing::warn!(object = %previous.object_id, "replaced collected object");
        }
    }

    pub fn collected_object(&self, id: &ObjectId) -> Option<&CollectedObject> {
        self.objects.get(id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Collected objects in identifier order.
    pub fn collected_objects(&self) -> impl Iterator<Item = &CollectedObject> {
        self.objects.values()
    }

    /// Items in id order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The serializable form of the store.
    pub fn to_document(&self) -> SystemCharacteristicsDocument {
        SystemCharacteristicsDocument {
            objects: self.objects.values().cloned().collect(),
            items: self.items.values().cloned().collect(),
        }
    }
}

impl TryFrom<SystemCharacteristicsDocument> for SystemCharacteristics {
    type Error = ValidationError;

    /// Build a store keeping the item ids found in the document.
    fn try_from(document: SystemCharacteristicsDocument) -> Result<Self, Self::Error> {
        let mut store = Self::new();
        for item in document.items {
            if store.items.contains_key(&item.id) {
                return Err(ValidationError::DuplicateIdentifier {
                    kind: "item",
                    id: item.id.to_string(),
                });
            }
            store.next_item_id = store.next_item_id.max(item.id.get());
            store.items.insert(item.id, item);
        }
        for collected in document.objects {
            if store.objects.contains_key(&collected.object_id) {
                return Err(ValidationError::DuplicateIdentifier {
                    kind: "collected object",
                    id: collected.object_id.to_string(),
                });
            }
            store.objects.insert(collected.object_id.clone(), collected);
        }
        Ok(store)
    }
}

impl Serialize for SystemCharacteristics {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SystemCharacteristics {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = SystemCharacteristicsDocument::deserialize(deserializer)?;
        Self::try_from(document).map_err(serde::de::Error::custom)
    }
}
