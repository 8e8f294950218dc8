//! The schema-driven walk between element trees and objects

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::coerce;
use crate::error::{FormatError, FormatResult};
use crate::schema::{FieldDescriptor, Presence, ValueType};
use crate::config;
use crate::value::{Object, Value};
use crate::xml::Element;

/// The state of a single load or save call.
///
/// Nothing here outlives the call: every load and save builds its own walker.
pub(crate) struct Walker {
    relaxed: bool,
    now: DateTime<Utc>,
    stamp: DateTime<Utc>,
    product_id: String,
}

impl Walker {
    /// A walker whose clock reads `now`, and that stamps saved documents with `stamp`
    pub fn new(relaxed: bool, now: DateTime<Utc>, stamp: DateTime<Utc>) -> Self {
        Self {
            relaxed,
            now,
            stamp,
            product_id: config::product_id(),
        }
    }

    pub fn for_load(relaxed: bool) -> Self {
        let now = current_second();
        Self::new(relaxed, now, now)
    }

    pub fn relaxed(&self) -> bool { self.relaxed }
    pub fn now(&self) -> DateTime<Utc> { self.now }
    pub fn modification_stamp(&self) -> DateTime<Utc> { self.stamp }
    pub fn product_id(&self) -> &str { &self.product_id }

    /// Read the children of `parent` according to `fields`
    pub fn load_fields(&self, parent: &Element, fields: &[FieldDescriptor]) -> FormatResult<Object> {
        // Group the children by name once, in document order
        let mut groups: HashMap<&str, Vec<&Element>> = HashMap::new();
        for child in parent.children() {
            groups.entry(child.name()).or_default().push(child);
        }

        let mut object = Object::new();
        for field in fields {
            let nodes = groups.get(field.name()).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(value) = self.load_field(field, nodes)? {
                object.insert(field.name(), value);
            }
        }
        Ok(object)
    }

    /// `None` means the field stays out of the object
    fn load_field(&self, field: &FieldDescriptor, nodes: &[&Element]) -> FormatResult<Option<Value>> {
        let node = match nodes.first() {
            None => return self.load_missing(field),
            Some(node) => *node,
        };

        if let Some(hook) = field.load_hook() {
            return hook.load(self, Some(node));
        }

        let value = match field.value_type() {
            ValueType::Composite(children) => Value::Map(self.load_fields(node, children)?),
            ValueType::Multiple(inner) => {
                let mut items = Vec::with_capacity(nodes.len());
                for node in nodes {
                    items.push(self.load_item(inner, node)?);
                }
                Value::List(items)
            },
            scalar => coerce::load_scalar(scalar, &node.text())?,
        };
        Ok(Some(value))
    }

    fn load_item(&self, inner: &FieldDescriptor, node: &Element) -> FormatResult<Value> {
        match inner.value_type() {
            ValueType::Composite(children) => Ok(Value::Map(self.load_fields(node, children)?)),
            ValueType::Multiple(_) => Err(FormatError::InvalidSchema(format!("{} is a list of lists", inner.name()))),
            scalar => coerce::load_scalar(scalar, &node.text()),
        }
    }

    fn load_missing(&self, field: &FieldDescriptor) -> FormatResult<Option<Value>> {
        match field.presence() {
            Presence::MaybeMissing => Ok(None),
            Presence::Default(default) => Ok(Some(default.clone())),
            Presence::Calculated { load, .. } => load.load(self, None),
            Presence::NotEmpty => {
                if self.relaxed && field.name() != "uid" {
                    log::warn!("Required field {} is missing, skipping it", field.name());
                    Ok(None)
                } else {
                    Err(FormatError::missing(field.name()))
                }
            },
        }
    }

    /// Write the fields of `object` below `parent`, editing existing nodes in place
    pub fn save_fields(&self, parent: &mut Element, object: &Object, fields: &[FieldDescriptor]) -> FormatResult<()> {
        for field in fields {
            self.update_node(parent, field, object.get_present(field.name()))?;
        }
        Ok(())
    }

    fn update_node(&self, parent: &mut Element, field: &FieldDescriptor, value: Option<&Value>) -> FormatResult<()> {
        if let Some(hook) = field.save_hook() {
            return hook.save(self, parent, field.name(), value);
        }

        let value = match (value, field.presence()) {
            (Some(value), _) => value,
            (None, Presence::Default(default)) => default,
            (None, Presence::MaybeMissing) => {
                parent.remove_children(field.name());
                return Ok(());
            },
            (None, _) => {
                if self.relaxed && field.name() != "uid" {
                    log::warn!("Required field {} has no value, not writing it", field.name());
                    return Ok(());
                }
                return Err(FormatError::missing(field.name()));
            },
        };

        match field.value_type() {
            ValueType::Composite(children) => {
                let record = value.as_map()
                    .ok_or_else(|| FormatError::invalid_value(field.name(), format!("expected a map, got a {}", value.kind())))?;
                parent.remove_children(field.name());
                let mut node = Element::new(field.name());
                self.save_fields(&mut node, record, children)?;
                parent.append_child(node);
            },
            ValueType::Multiple(inner) => {
                let items = value.as_list()
                    .ok_or_else(|| FormatError::invalid_value(field.name(), format!("expected a list, got a {}", value.kind())))?;
                parent.remove_children(field.name());
                for item in items.iter().filter(|item| !item.is_null()) {
                    let node = self.item_node(field.name(), inner, item)?;
                    parent.append_child(node);
                }
            },
            scalar => {
                let text = coerce::encode_scalar(field.name(), scalar, value)?;
                parent.replace_text_child(field.name(), text);
            },
        }
        Ok(())
    }

    fn item_node(&self, name: &str, inner: &FieldDescriptor, item: &Value) -> FormatResult<Element> {
        match inner.value_type() {
            ValueType::Composite(children) => {
                let record = item.as_map()
                    .ok_or_else(|| FormatError::invalid_value(name, format!("expected a list of maps, found a {}", item.kind())))?;
                let mut node = Element::new(name);
                self.save_fields(&mut node, record, children)?;
                Ok(node)
            },
            ValueType::Multiple(_) => Err(FormatError::InvalidSchema(format!("{} is a list of lists", name))),
            scalar => Ok(Element::with_text(name, coerce::encode_scalar(name, scalar, item)?)),
        }
    }
}

/// The current time, without its sub-second part
pub(crate) fn current_second() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_opt(now.timestamp(), 0).single().unwrap_or(now)
}
