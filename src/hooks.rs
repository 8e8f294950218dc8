//! Calculated fields: values that are derived rather than read or written verbatim

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::date;
use crate::error::{FormatError, FormatResult};
use crate::recurrence;
use crate::value::Value;
use crate::walker::Walker;
use crate::xml::Element;

/// The handler of a calculated field.
///
/// Schemas name their handlers; names are resolved when the schema is built,
/// so that a typo fails right away instead of when the first object is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    /// `creation-date`: set once, when the object is first written
    CreationDate,
    /// `last-modification-date`: rewritten on every save
    ModificationDate,
    /// `product-id`: the name of the last client that wrote the object
    ProductId,
    /// `recurrence`: a recurrence rule with its attributes and validation
    Recurrence,
}

impl Hook {
    /// Resolve a handler from its name, e.g. `"CreationDate"`
    pub fn from_name(name: &str) -> FormatResult<Self> {
        match name {
            "CreationDate" => Ok(Hook::CreationDate),
            "ModificationDate" => Ok(Hook::ModificationDate),
            "ProductId" => Ok(Hook::ProductId),
            "Recurrence" => Ok(Hook::Recurrence),
            other => Err(FormatError::UnknownCalculatedHook(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Hook::CreationDate => "CreationDate",
            Hook::ModificationDate => "ModificationDate",
            Hook::ProductId => "ProductId",
            Hook::Recurrence => "Recurrence",
        }
    }

    /// Compute the value of a field from its node, or from nothing when the node is missing.
    /// `None` means the field stays out of the loaded object
    pub(crate) fn load(&self, walker: &Walker, node: Option<&Element>) -> FormatResult<Option<Value>> {
        match (self, node) {
            (Hook::CreationDate, None) | (Hook::ModificationDate, None) => {
                // Be gentle and accept a missing date
                Ok(Some(Value::DateTime(walker.now())))
            },
            (Hook::CreationDate, Some(node)) | (Hook::ModificationDate, Some(node)) => {
                let text = node.text();
                match date::decode_datetime(&text) {
                    Some(dt) => Ok(Some(Value::DateTime(dt))),
                    None => {
                        log::warn!("Unparsable <{}> value {:?}", node.name(), text);
                        Ok(Some(Value::Null))
                    },
                }
            },
            (Hook::ProductId, None) => Ok(Some(Value::String(String::new()))),
            (Hook::ProductId, Some(node)) => Ok(Some(Value::String(node.text()))),
            (Hook::Recurrence, None) => Ok(None),
            (Hook::Recurrence, Some(node)) => {
                let record = recurrence::decode(walker, node)?;
                Ok(Some(Value::Map(record)))
            },
        }
    }

    /// Write the node of a field. `value` is `None` when the object had no value for it
    pub(crate) fn save(&self, walker: &Walker, parent: &mut Element, name: &str, value: Option<&Value>) -> FormatResult<()> {
        match self {
            Hook::CreationDate => {
                // Only create the creation date if it has not been set before
                let text = match value {
                    None => date::encode_datetime(&walker.now()),
                    Some(Value::DateTime(dt)) => date::encode_datetime(dt),
                    Some(Value::String(s)) => match date::decode_datetime(s) {
                        Some(dt) => date::encode_datetime(&dt),
                        None => s.clone(),
                    },
                    Some(other) => return Err(FormatError::invalid_value(name, format!("expected a date-time, got a {}", other.kind()))),
                };
                parent.replace_text_child(name, text);
            },
            Hook::ModificationDate => {
                let text = date::encode_datetime(&walker.modification_stamp());
                parent.replace_text_child(name, text);
            },
            Hook::ProductId => {
                parent.replace_text_child(name, walker.product_id().to_string());
            },
            Hook::Recurrence => {
                parent.remove_children(name);
                let record = match value {
                    Some(Value::Map(record)) if !record.is_empty() => record,
                    Some(Value::Map(_)) | None => return Ok(()),
                    Some(other) => return Err(FormatError::invalid_value(name, format!("expected a recurrence map, got a {}", other.kind()))),
                };
                let node = recurrence::encode(walker, name, record)?;
                parent.append_child(node);
            },
        }
        Ok(())
    }
}

impl FromStr for Hook {
    type Err = FormatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hook::from_name(s)
    }
}

impl Display for Hook {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
