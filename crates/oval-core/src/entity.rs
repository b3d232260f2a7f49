//! # Entity Model
//!
//! Three kinds of typed values meet during evaluation:
//!
//! - **Selector / state entities** ([`Entity`]): what a definition asks for.
//!   They carry an operation, a datatype, and either a literal value, a
//!   variable reference, or the nil flag.
//! - **Item entities** ([`ItemEntity`]): what a collector observed, each with
//!   its own collection [`ItemStatus`].
//! - **Items** ([`Item`]): one collected fact made of item entities.
//!
//! Items are immutable once produced; the evaluator only borrows them from
//! the system-characteristics store.

use serde::{Deserialize, Serialize};

use crate::datatype::{Datatype, Operation};
use crate::error::ValidationError;
use crate::identity::{ItemId, VariableId};
use crate::result::{Check, ExistenceCheck, ResultValue};

fn default_existence_check() -> ExistenceCheck {
    ExistenceCheck::AllExist
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An object (selector) or state (expected value) entity.
///
/// Exactly one of `value`, `var_ref`, or `nil` describes the expected value.
/// `existence_check` applies to object entities only; `var_check`,
/// `entity_check`, and `fields` apply to state entities only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name, matched against item entity names.
    pub name: String,
    /// Literal expected value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Datatype used to interpret both sides of the comparison.
    #[serde(default)]
    pub datatype: Datatype,
    /// Comparison applied between the item value and the expected value.
    #[serde(default)]
    pub operation: Operation,
    /// Variable supplying the expected values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_ref: Option<VariableId>,
    /// How many of an item's same-named entities must match.
    #[serde(default = "default_existence_check")]
    pub existence_check: ExistenceCheck,
    /// How many resolved variable values must match.
    #[serde(default)]
    pub var_check: Check,
    /// How many of an item's same-named entities must match (state side).
    #[serde(default)]
    pub entity_check: Check,
    /// The entity expects a nil value.
    #[serde(default)]
    pub nil: bool,
    /// Record field entities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Entity>,
}

impl Entity {
    /// A string `equals` entity with a literal value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            datatype: Datatype::String,
            operation: Operation::Equals,
            var_ref: None,
            existence_check: ExistenceCheck::AllExist,
            var_check: Check::All,
            entity_check: Check::All,
            nil: false,
            fields: Vec::new(),
        }
    }

    /// An entity expecting a nil value.
    pub fn nil(name: impl Into<String>) -> Self {
        Self {
            value: None,
            nil: true,
            ..Self::new(name, "")
        }
    }

    /// An entity whose expected values come from a variable.
    pub fn from_variable(name: impl Into<String>, var_ref: VariableId) -> Self {
        Self {
            value: None,
            var_ref: Some(var_ref),
            ..Self::new(name, "")
        }
    }

    /// A record entity comparing the given field entities.
    pub fn record(name: impl Into<String>, fields: Vec<Entity>) -> Self {
        Self {
            value: None,
            datatype: Datatype::Record,
            fields,
            ..Self::new(name, "")
        }
    }

    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = datatype;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_var_check(mut self, check: Check) -> Self {
        self.var_check = check;
        self
    }

    pub fn with_entity_check(mut self, check: Check) -> Self {
        self.entity_check = check;
        self
    }

    pub fn with_existence_check(mut self, existence: ExistenceCheck) -> Self {
        self.existence_check = existence;
        self
    }

    /// Whether the entity expects a nil value.
    pub fn is_nil(&self) -> bool {
        self.nil
    }

    /// Check the structural invariants of the entity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEntity`] when a literal value is
    /// combined with a variable reference or with the nil flag.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.var_ref.is_some() && self.value.is_some() {
            return Err(ValidationError::InvalidEntity {
                name: self.name.clone(),
                reason: "a variable reference excludes a literal value".to_string(),
            });
        }
        if self.nil && (self.value.is_some() || self.var_ref.is_some()) {
            return Err(ValidationError::InvalidEntity {
                name: self.name.clone(),
                reason: "a nil entity cannot carry a value".to_string(),
            });
        }
        self.fields.iter().try_for_each(Entity::validate)
    }
}

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Collection status of an item or an item entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "does not exist")]
    DoesNotExist,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "not collected")]
    NotCollected,
}

impl ItemStatus {
    /// The existence result this status contributes to an existence check.
    pub fn existence_result(self) -> ResultValue {
        match self {
            Self::Exists => ResultValue::True,
            Self::DoesNotExist => ResultValue::False,
            Self::Error => ResultValue::Error,
            Self::NotCollected => ResultValue::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// ItemEntity
// ---------------------------------------------------------------------------

/// One typed field of a collected item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntity {
    pub name: String,
    /// Collected value; `None` means nil.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub datatype: Datatype,
    #[serde(default)]
    pub status: ItemStatus,
    /// Named fields of a record value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ItemEntity>,
}

impl ItemEntity {
    /// A string item entity with a collected value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            datatype: Datatype::String,
            status: ItemStatus::Exists,
            fields: Vec::new(),
        }
    }

    /// A nil item entity.
    pub fn nil(name: impl Into<String>) -> Self {
        Self {
            value: None,
            ..Self::new(name, "")
        }
    }

    /// A record item entity.
    pub fn record(name: impl Into<String>, fields: Vec<ItemEntity>) -> Self {
        Self {
            value: None,
            datatype: Datatype::Record,
            fields,
            ..Self::new(name, "")
        }
    }

    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = datatype;
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the collected value is nil.
    pub fn is_nil(&self) -> bool {
        self.value.is_none() && self.fields.is_empty()
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&ItemEntity> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A collected fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier assigned by the system-characteristics store.
    pub id: ItemId,
    /// Item type tag, e.g. `file_item`.
    pub item_type: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub entities: Vec<ItemEntity>,
}

impl Item {
    /// An existing item with no entities and a provisional id of 0.
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(0),
            item_type: item_type.into(),
            status: ItemStatus::Exists,
            entities: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_entity(mut self, entity: ItemEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// All entities with the given name, in collection order.
    pub fn entities_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ItemEntity> + 'a {
        self.entities.iter().filter(move |e| e.name == name)
    }
}
