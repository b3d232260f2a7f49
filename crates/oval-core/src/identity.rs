//! # Identifier Newtypes
//!
//! Every definition-document element is addressed by a string identifier
//! (conventionally `oval:<namespace>:<kind>:<number>`). Each kind gets its
//! own newtype so that a [`TestId`] can never be passed where an
//! [`ObjectId`] is expected.
//!
//! ## Validation
//!
//! String identifiers must be non-empty. No further format restriction is
//! imposed because third-party content does not always follow the
//! conventional layout. [`ItemId`] is assigned by the system-characteristics
//! store and is always valid by construction.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, validating non-emptiness.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::EmptyIdentifier`] if the string is
            /// empty or whitespace-only.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if s.trim().is_empty() {
                    return Err(ValidationError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(s))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a top-level definition.
    DefinitionId,
    "definition"
);
string_id!(
    /// Identifier of a test binding an object to states.
    TestId,
    "test"
);
string_id!(
    /// Identifier of an object (fact selector).
    ObjectId,
    "object"
);
string_id!(
    /// Identifier of a state (expected values).
    StateId,
    "state"
);
string_id!(
    /// Identifier of a variable (local, external, or constant).
    VariableId,
    "variable"
);

/// Identifier of a collected item, unique within one system-characteristics
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Wrap a raw item number.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw item number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
