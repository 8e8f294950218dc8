//! The value mapping exchanged with the users of the codec

use std::fmt;
use std::iter::FromIterator;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A single value of a Kolab object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The "absent" sentinel, e.g. for a date that could not be parsed
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    /// A calendar date, without time zone
    Date(NaiveDate),
    /// A point in time, always kept in UTC
    DateTime(DateTime<Utc>),
    /// The content of a composite field
    Map(Object),
    /// The content of a multiple field, in document order
    List(Vec<Value>),
}

/// Generates `From<$from> for Value`
macro_rules! value_from {
    ($from:ty, $variant:ident) => {
        impl From<$from> for Value {
            fn from(v: $from) -> Self {
                Value::$variant(v.into())
            }
        }
    };
}

value_from!(String, String);
value_from!(&str, String);
value_from!(i64, Integer);
value_from!(i32, Integer);
value_from!(u32, Integer);
value_from!(bool, Boolean);
value_from!(NaiveDate, Date);
value_from!(Object, Map);

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(dt: DateTime<Tz>) -> Self {
        Value::DateTime(dt.with_timezone(&Utc))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Object> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Whether this value is "empty" in the loose sense the Kolab clients use:
    /// null, an empty string, an empty list or an empty map
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// A short name of the variant, for error messages
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }
}



/// An insertion-ordered mapping from field names to values.
///
/// This is what [`Format::load`](crate::Format::load) returns and what [`Format::save`](crate::Format::save) consumes.
/// Two objects are equal when they hold the same keys with the same values, whatever their order.
#[derive(Clone, Debug, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object with a freshly generated `uid`
    pub fn with_random_uid() -> Self {
        let mut object = Self::new();
        let uid = Uuid::new_v4().to_hyphenated().to_string();
        object.insert("uid", uid);
        object
    }

    pub fn len(&self) -> usize     { self.entries.len()      }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The value of `key`, unless it is missing or null
    pub fn get_present(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a value. An existing key keeps its position, a new key is appended.
    /// Returns the previous value, if any
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            },
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The unique identifier of this object
    pub fn uid(&self) -> Option<&str> {
        self.get_str("uid")
    }

    /// Parse a color field (e.g. a note's `background-color`)
    pub fn color(&self, key: &str) -> Option<csscolorparser::Color> {
        let text = self.get_str(key)?;
        match text.parse::<csscolorparser::Color>() {
            Ok(color) => Some(color),
            Err(err) => {
                log::debug!("Field {} holds an invalid color {:?}: {}", key, text, err);
                None
            },
        }
    }

    /// Serialize this object as JSON, e.g. to cache it on the caller side
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Read an object back from its JSON form
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (k, v) in iter {
            object.insert(k, v);
        }
        object
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Used to support serde: an object is serialized as a map, in insertion order
impl Serialize for Object {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ObjectVisitor;

impl<'de> Visitor<'de> for ObjectVisitor {
    type Value = Object;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map of Kolab field values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Object, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Object::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            object.insert(key, value);
        }
        Ok(object)
    }
}

/// Used to support serde
impl<'de> Deserialize<'de> for Object {
    fn deserialize<D>(deserializer: D) -> Result<Object, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ObjectVisitor)
    }
}
