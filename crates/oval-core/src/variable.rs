//! # Variables and Component Expressions
//!
//! A variable supplies zero or more values to selector and state entities.
//! Local variables compute their values from a [`Component`] expression
//! tree; external variables are supplied by the caller at evaluation time
//! ([`ExternalVariables`]); constant variables carry a literal value list.
//!
//! This module only describes the model. Resolution (Cartesian expansion,
//! flag propagation, cycle detection) lives in `oval-engine`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;
use crate::identity::{ObjectId, VariableId};

// ---------------------------------------------------------------------------
// Variable
// ---------------------------------------------------------------------------

/// A named value source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    #[serde(default)]
    pub datatype: Datatype,
    #[serde(flatten)]
    pub kind: VariableKind,
}

/// How a variable obtains its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariableKind {
    /// Computed from a component expression.
    Local { component: Component },
    /// Supplied by the caller through [`ExternalVariables`].
    External,
    /// A fixed list of literal values.
    Constant { values: Vec<String> },
}

impl Variable {
    /// A local variable computed from `component`.
    pub fn local(id: VariableId, datatype: Datatype, component: Component) -> Self {
        Self {
            id,
            datatype,
            kind: VariableKind::Local { component },
        }
    }

    /// An external variable whose values are supplied by the caller.
    pub fn external(id: VariableId, datatype: Datatype) -> Self {
        Self {
            id,
            datatype,
            kind: VariableKind::External,
        }
    }

    /// A constant variable with literal values.
    pub fn constant(id: VariableId, datatype: Datatype, values: Vec<String>) -> Self {
        Self {
            id,
            datatype,
            kind: VariableKind::Constant { values },
        }
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Arithmetic applied across the Cartesian product of operand values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Textual layout of a date/time value consumed by
/// [`Component::TimeDifference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTimeFormat {
    /// `yyyymmdd`, `yyyy/mm/dd`, `yyyy-mm-dd`, optionally followed by a time.
    #[default]
    YearMonthDay,
    /// `mm/dd/yyyy` or `mm-dd-yyyy`, optionally followed by a time.
    MonthDayYear,
    /// `dd/mm/yyyy` or `dd-mm-yyyy`, optionally followed by a time.
    DayMonthYear,
    /// Integer seconds since 1970-01-01T00:00:00Z.
    SecondsSinceEpoch,
    /// Hex count of 100ns intervals since 1601-01-01T00:00:00Z.
    WinFiletime,
    /// `yyyymmddHHMMSS.mmmmmmsUUU`.
    CimDatetime,
}

/// A node of a local variable's expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    /// A single literal value.
    Literal {
        value: String,
        #[serde(default)]
        datatype: Datatype,
    },
    /// The values of one entity (or record field) across the items
    /// correlated for an object.
    ObjectComponent {
        object_ref: ObjectId,
        item_field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record_field: Option<String>,
    },
    /// The values of another variable.
    VariableRef { var_ref: VariableId },
    /// String concatenation over the Cartesian product of the children.
    Concat { components: Vec<Component> },
    /// Arithmetic over the Cartesian product of the children.
    Arithmetic {
        operation: ArithmeticOperation,
        components: Vec<Component>,
    },
    /// Character substring; `start` is 1-based and a negative `length`
    /// takes the rest of the value.
    Substring {
        start: i64,
        length: i64,
        component: Box<Component>,
    },
    /// Split every value on a delimiter.
    Split {
        delimiter: String,
        component: Box<Component>,
    },
    /// Prefix every value with `character` unless already present.
    Begin {
        character: String,
        component: Box<Component>,
    },
    /// Suffix every value with `character` unless already present.
    End {
        character: String,
        component: Box<Component>,
    },
    /// Escape regular-expression metacharacters in every value.
    EscapeRegex { component: Box<Component> },
    /// First capture group of `pattern` in every value.
    RegexCapture {
        pattern: String,
        component: Box<Component>,
    },
    /// Distinct values of all children, first occurrence order.
    Unique { components: Vec<Component> },
    /// Number of values produced by all children.
    Count { components: Vec<Component> },
    /// Seconds between two date/time values (or between a value and the
    /// reference time when only one child is present).
    TimeDifference {
        #[serde(default)]
        format_1: DateTimeFormat,
        #[serde(default)]
        format_2: DateTimeFormat,
        components: Vec<Component>,
    },
}

impl Component {
    /// A string literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: Datatype::String,
        }
    }

    /// A reference to another variable.
    pub fn variable(var_ref: VariableId) -> Self {
        Self::VariableRef { var_ref }
    }

    /// A reference to an item entity of an object.
    pub fn object(object_ref: ObjectId, item_field: impl Into<String>) -> Self {
        Self::ObjectComponent {
            object_ref,
            item_field: item_field.into(),
            record_field: None,
        }
    }

    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<&Component> {
        match self {
            Self::Literal { .. } | Self::ObjectComponent { .. } | Self::VariableRef { .. } => {
                Vec::new()
            }
            Self::Concat { components }
            | Self::Arithmetic { components, .. }
            | Self::Unique { components }
            | Self::Count { components }
            | Self::TimeDifference { components, .. } => components.iter().collect(),
            Self::Substring { component, .. }
            | Self::Split { component, .. }
            | Self::Begin { component, .. }
            | Self::End { component, .. }
            | Self::EscapeRegex { component }
            | Self::RegexCapture { component, .. } => vec![component.as_ref()],
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// One concrete binding of a variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableValue {
    pub variable_id: VariableId,
    pub value: String,
}

impl VariableValue {
    pub fn new(variable_id: VariableId, value: impl Into<String>) -> Self {
        Self {
            variable_id,
            value: value.into(),
        }
    }
}

/// Caller-supplied values for external variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalVariables {
    values: HashMap<VariableId, Vec<String>>,
}

impl ExternalVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or replace) the values of an external variable.
    pub fn insert(&mut self, id: VariableId, values: Vec<String>) {
        self.values.insert(id, values);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, id: VariableId, values: Vec<String>) -> Self {
        self.insert(id, values);
        self
    }

    /// The values bound to `id`, if any.
    pub fn get(&self, id: &VariableId) -> Option<&[String]> {
        self.values.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_id(n: u32) -> VariableId {
        VariableId::new(format!("oval:x:var:{n}")).unwrap()
    }

    #[test]
    fn local_variable_deserializes_component_tree() {
        let json = r#"{
            "id": "oval:x:var:1",
            "datatype": "string",
            "kind": "local",
            "component": {
                "kind": "concat",
                "components": [
                    {"kind": "literal", "value": "/opt/"},
                    {"kind": "variable_ref", "var_ref": "oval:x:var:2"}
                ]
            }
        }"#;
        let var: Variable = serde_json::from_str(json).unwrap();
        match var.kind {
            VariableKind::Local {
                component: Component::Concat { components },
            } => assert_eq!(components.len(), 2),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn external_and_constant_variables_deserialize() {
        let ext: Variable =
            serde_json::from_str(r#"{"id": "oval:x:var:3", "kind": "external"}"#).unwrap();
        assert_eq!(ext.kind, VariableKind::External);
        assert_eq!(ext.datatype, Datatype::String);

        let constant: Variable = serde_json::from_str(
            r#"{"id": "oval:x:var:4", "datatype": "int", "kind": "constant", "values": ["1", "2"]}"#,
        )
        .unwrap();
        assert_eq!(
            constant.kind,
            VariableKind::Constant {
                values: vec!["1".into(), "2".into()]
            }
        );
    }

    #[test]
    fn children_lists_direct_subexpressions() {
        let split = Component::Split {
            delimiter: ",".into(),
            component: Box::new(Component::literal("a,b")),
        };
        assert_eq!(split.children().len(), 1);
        let concat = Component::Concat {
            components: vec![Component::literal("a"), Component::variable(var_id(2))],
        };
        assert_eq!(concat.children().len(), 2);
        assert!(Component::literal("x").children().is_empty());
    }

    #[test]
    fn external_variables_lookup() {
        let ext = ExternalVariables::new().with(var_id(1), vec!["a".into(), "b".into()]);
        assert_eq!(ext.get(&var_id(1)).map(<[String]>::len), Some(2));
        assert!(ext.get(&var_id(2)).is_none());
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn external_variables_deserialize_from_map() {
        let ext: ExternalVariables =
            serde_json::from_str(r#"{"oval:x:var:9": ["root", "admin"]}"#).unwrap();
        assert_eq!(ext.get(&var_id(9)).unwrap(), ["root", "admin"]);
    }
}
