//! # Collector Contract
//!
//! A [`Collector`] gathers the items matching an object of one object type.
//! How a collector reads the underlying system is out of scope for this
//! workspace; the evaluator only consumes the resulting
//! [`SystemCharacteristics`] store.
//!
//! The [`CollectorRegistry`] is constructed explicitly by the caller and
//! maps object type tags to collectors. Running it over a
//! [`DefinitionSet`] yields a populated store:
//!
//! | collector outcome | collected flag |
//! |-------------------|----------------|
//! | no collector for the object type | `not_collected` |
//! | `Err(CollectionError)` | `error`, with the error as message |
//! | `Ok(vec![])` | `does_not_exist` |
//! | `Ok(items)` | `complete` |
//!
//! Set objects are never collected directly; the correlator derives their
//! items from the referenced objects.

use std::collections::BTreeMap;

use crate::characteristics::{CollectedFlag, CollectedObject, SystemCharacteristics};
use crate::definition::{DefinitionSet, Object};
use crate::entity::Item;
use crate::error::CollectionError;

/// Gathers items for objects of one object type.
pub trait Collector: Send + Sync {
    /// The object type tag this collector handles, e.g. `file_object`.
    fn object_type(&self) -> &str;

    /// Collect the items matching `object`.
    ///
    /// # Errors
    ///
    /// Returns a [`CollectionError`] when the system could not be read.
    fn collect(&self, object: &Object) -> Result<Vec<Item>, CollectionError>;
}

/// Object type tag → collector.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: BTreeMap<String, Box<dyn Collector>>,
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("object_types", &self.collectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector, replacing any collector for the same type.
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        let object_type = collector.object_type().to_string();
        if self.collectors.insert(object_type.clone(), collector).is_some() {
            tracing::warn!(%object_type, "replaced registered collector");
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, collector: Box<dyn Collector>) -> Self {
        self.register(collector);
        self
    }

    pub fn get(&self, object_type: &str) -> Option<&dyn Collector> {
        self.collectors.get(object_type).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Collect every non-set object of `definitions` into `store`.
    pub fn collect_into(&self, definitions: &DefinitionSet, store: &mut SystemCharacteristics) {
        for object in definitions.objects().filter(|o| !o.is_set()) {
            let Some(collector) = self.get(&object.object_type) else {
                tracing::warn!(
                    object = %object.id,
                    object_type = %object.object_type,
                    "no collector registered"
                );
                store.record_object(CollectedObject::new(
                    object.id.clone(),
                    CollectedFlag::NotCollected,
                ));
                continue;
            };
            match collector.collect(object) {
                Ok(items) => {
                    let ids = store.record_items(object.id.clone(), items);
                    tracing::debug!(object = %object.id, items = ids.len(), "collected");
                }
                Err(err) => {
                    tracing::warn!(object = %object.id, error = %err, "collection failed");
                    store.record_object(
                        CollectedObject::new(object.id.clone(), CollectedFlag::Error)
                            .with_message(err.to_string()),
                    );
                }
            }
        }
    }

    /// Collect every non-set object of `definitions` into a fresh store.
    pub fn collect(&self, definitions: &DefinitionSet) -> SystemCharacteristics {
        let mut store = SystemCharacteristics::new();
        self.collect_into(definitions, &mut store);
        tracing::info!(
            objects = store.object_count(),
            items = store.item_count(),
            "collection finished"
        );
        store
    }
}
