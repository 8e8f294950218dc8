//! Field schemas of the Kolab object types
//!
//! Every object type shares a set of basic fields, and adds its own specific ones.
//! Schemas are plain values: the schema of a type is the basic schema followed by the specific one.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::error::{FormatError, FormatResult};
use crate::hooks::Hook;
use crate::config::DEFAULT_ROOT_NAME;
use crate::value::Value;

/// The semantic type of a field
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    String,
    Integer,
    Boolean,
    Date,
    DateTime,
    DateOrDateTime,
    Color,
    /// A single element wrapping the given sub-fields
    Composite(Vec<FieldDescriptor>),
    /// Zero or more sibling elements, each one read according to the inner descriptor
    Multiple(Box<FieldDescriptor>),
}

impl ValueType {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ValueType::Composite(_) | ValueType::Multiple(_))
    }
}

/// What happens when a field has no node (on load) or no value (on save)
#[derive(Clone, Debug, PartialEq)]
pub enum Presence {
    /// Use this value instead
    Default(Value),
    /// Leave the field out
    MaybeMissing,
    /// Fail
    NotEmpty,
    /// Let a handler compute the value
    Calculated { load: Hook, save: Hook },
}

/// The static description of one field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    value_type: ValueType,
    presence: Presence,
}

impl FieldDescriptor {
    pub fn new<S: Into<String>>(name: S, value_type: ValueType, presence: Presence) -> Self {
        Self { name: name.into(), value_type, presence }
    }

    pub fn with_default<S: Into<String>, V: Into<Value>>(name: S, value_type: ValueType, default: V) -> Self {
        Self::new(name, value_type, Presence::Default(default.into()))
    }

    pub fn maybe_missing<S: Into<String>>(name: S, value_type: ValueType) -> Self {
        Self::new(name, value_type, Presence::MaybeMissing)
    }

    pub fn not_empty<S: Into<String>>(name: S, value_type: ValueType) -> Self {
        Self::new(name, value_type, Presence::NotEmpty)
    }

    /// A calculated field whose loading and saving are done by the same handler
    pub fn calculated<S: Into<String>>(name: S, value_type: ValueType, hook: Hook) -> Self {
        Self::new(name, value_type, Presence::Calculated { load: hook, save: hook })
    }

    /// A calculated field whose handlers are given by name.
    /// Fails with [`FormatError::UnknownCalculatedHook`] if a name matches no handler
    pub fn calculated_by_name<S: Into<String>>(name: S, value_type: ValueType, load: &str, save: &str) -> FormatResult<Self> {
        let load = Hook::from_name(load)?;
        let save = Hook::from_name(save)?;
        Ok(Self::new(name, value_type, Presence::Calculated { load, save }))
    }

    /// A string field that defaults to `default`
    pub fn string<S: Into<String>>(name: S, default: &str) -> Self {
        Self::with_default(name, ValueType::String, default)
    }

    pub fn name(&self) -> &str               { &self.name       }
    pub fn value_type(&self) -> &ValueType   { &self.value_type }
    pub fn presence(&self) -> &Presence      { &self.presence   }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.presence {
            Presence::Default(v) => Some(v),
            _ => None,
        }
    }

    pub fn load_hook(&self) -> Option<Hook> {
        match self.presence {
            Presence::Calculated { load, .. } => Some(load),
            _ => None,
        }
    }

    pub fn save_hook(&self) -> Option<Hook> {
        match self.presence {
            Presence::Calculated { save, .. } => Some(save),
            _ => None,
        }
    }
}



/// The kinds of Kolab groupware objects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Event,
    Task,
    Note,
    Contact,
    DistributionList,
    /// Any other object: only the basic fields are known
    Generic,
}

impl ObjectType {
    /// Name of the root element of documents of this type
    pub fn root_name(&self) -> &'static str {
        match self {
            ObjectType::Event => "event",
            ObjectType::Task => "task",
            ObjectType::Note => "note",
            ObjectType::Contact => "contact",
            ObjectType::DistributionList => "distribution-list",
            ObjectType::Generic => DEFAULT_ROOT_NAME,
        }
    }

    /// MIME type of the attachment that carries such an object
    pub fn mime_type(&self) -> String {
        format!("application/x-vnd.kolab.{}", self.root_name())
    }
}

/// Never fails: unknown types are `Generic`
impl FromStr for ObjectType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        Ok(match normalized.as_str() {
            "event" => ObjectType::Event,
            "task" => ObjectType::Task,
            "note" => ObjectType::Note,
            "contact" => ObjectType::Contact,
            "distributionlist" => ObjectType::DistributionList,
            _ => ObjectType::Generic,
        })
    }
}

impl From<&str> for ObjectType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root_name())
    }
}



/// Fields of a simple person (organizer, creator...)
fn simple_person(name: &str) -> FieldDescriptor {
    FieldDescriptor::maybe_missing(name, ValueType::Composite(vec![
        FieldDescriptor::string("display-name", ""),
        FieldDescriptor::string("smtp-address", ""),
        FieldDescriptor::string("uid", ""),
    ]))
}

fn attendee() -> FieldDescriptor {
    let one_attendee = FieldDescriptor::maybe_missing("attendee", ValueType::Composite(vec![
        FieldDescriptor::string("display-name", ""),
        FieldDescriptor::string("smtp-address", ""),
        FieldDescriptor::string("status", "none"),
        FieldDescriptor::with_default("request-response", ValueType::Boolean, true),
        FieldDescriptor::string("role", "required"),
    ]));
    FieldDescriptor::with_default("attendee", ValueType::Multiple(Box::new(one_attendee)), Value::List(Vec::new()))
}

/// A list of plain strings, left out of the object when there is none
fn string_list(name: &str) -> FieldDescriptor {
    FieldDescriptor::maybe_missing(name, ValueType::Multiple(Box::new(
        FieldDescriptor::maybe_missing(name, ValueType::String)
    )))
}

/// A list of composite values
fn composite_list(name: &str, fields: Vec<FieldDescriptor>) -> FieldDescriptor {
    FieldDescriptor::maybe_missing(name, ValueType::Multiple(Box::new(
        FieldDescriptor::maybe_missing(name, ValueType::Composite(fields))
    )))
}

/// The fields below a `<recurrence>` node.
/// `cycle` and `type` are attributes of the node itself, `range` carries a `type` attribute
pub fn recurrence_fields() -> &'static [FieldDescriptor] {
    static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
        FieldDescriptor::maybe_missing("interval", ValueType::Integer),
        string_list("day"),
        FieldDescriptor::maybe_missing("daynumber", ValueType::Integer),
        FieldDescriptor::maybe_missing("month", ValueType::String),
        FieldDescriptor::string("range", ""),
        string_list("exclusion"),
        string_list("complete"),
    ]);
    &FIELDS
}

/// The fields every Kolab object has, in the order Kolab clients write them
pub fn basic_fields() -> &'static [FieldDescriptor] {
    static FIELDS: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
        FieldDescriptor::not_empty("uid", ValueType::String),
        FieldDescriptor::string("body", ""),
        FieldDescriptor::string("categories", ""),
        FieldDescriptor::calculated("creation-date", ValueType::DateTime, Hook::CreationDate),
        FieldDescriptor::calculated("last-modification-date", ValueType::DateTime, Hook::ModificationDate),
        FieldDescriptor::string("sensitivity", "public"),
        string_list("inline-attachment"),
        string_list("link-attachment"),
        FieldDescriptor::calculated("product-id", ValueType::String, Hook::ProductId),
    ]);
    &FIELDS
}

fn recurrence() -> FieldDescriptor {
    FieldDescriptor::calculated("recurrence", ValueType::Composite(recurrence_fields().to_vec()), Hook::Recurrence)
}

/// The fields that only objects of the given type have
pub fn specific_fields(object_type: ObjectType) -> &'static [FieldDescriptor] {
    static EVENT: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
        FieldDescriptor::string("summary", ""),
        FieldDescriptor::string("location", ""),
        simple_person("organizer"),
        FieldDescriptor::not_empty("start-date", ValueType::DateOrDateTime),
        FieldDescriptor::maybe_missing("alarm", ValueType::Integer),
        recurrence(),
        attendee(),
        FieldDescriptor::not_empty("end-date", ValueType::DateOrDateTime),
        FieldDescriptor::string("show-time-as", "busy"),
        FieldDescriptor::string("color-label", "none"),
    ]);

    static TASK: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
        FieldDescriptor::string("summary", ""),
        FieldDescriptor::string("location", ""),
        simple_person("creator"),
        simple_person("organizer"),
        FieldDescriptor::maybe_missing("start-date", ValueType::DateOrDateTime),
        FieldDescriptor::maybe_missing("alarm", ValueType::Integer),
        recurrence(),
        attendee(),
        FieldDescriptor::with_default("priority", ValueType::Integer, 3),
        FieldDescriptor::with_default("completed", ValueType::Integer, 0),
        FieldDescriptor::string("status", "not-started"),
        FieldDescriptor::maybe_missing("due-date", ValueType::DateOrDateTime),
        FieldDescriptor::maybe_missing("parent", ValueType::String),
    ]);

    static NOTE: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
        FieldDescriptor::string("summary", ""),
        FieldDescriptor::with_default("background-color", ValueType::Color, "#000000"),
        FieldDescriptor::with_default("foreground-color", ValueType::Color, "#ffff00"),
    ]);

    static CONTACT: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| {
        let mut fields = vec![
            FieldDescriptor::maybe_missing("name", ValueType::Composite(vec![
                FieldDescriptor::string("given-name", ""),
                FieldDescriptor::string("middle-names", ""),
                FieldDescriptor::string("last-name", ""),
                FieldDescriptor::string("full-name", ""),
                FieldDescriptor::string("initials", ""),
                FieldDescriptor::string("prefix", ""),
                FieldDescriptor::string("suffix", ""),
            ])),
        ];
        for name in &[
            "free-busy-url", "organization", "web-page", "im-address", "department",
            "office-location", "profession", "job-title", "manager-name", "assistant",
            "nick-name", "spouse-name",
        ] {
            fields.push(FieldDescriptor::string(*name, ""));
        }
        fields.push(FieldDescriptor::maybe_missing("birthday", ValueType::Date));
        fields.push(FieldDescriptor::maybe_missing("anniversary", ValueType::Date));
        for name in &["picture", "children", "gender", "language"] {
            fields.push(FieldDescriptor::string(*name, ""));
        }
        fields.push(composite_list("phone", vec![
            FieldDescriptor::string("type", ""),
            FieldDescriptor::string("number", ""),
        ]));
        fields.push(composite_list("email", vec![
            FieldDescriptor::string("display-name", ""),
            FieldDescriptor::string("smtp-address", ""),
        ]));
        fields.push(composite_list("address", vec![
            FieldDescriptor::string("type", ""),
            FieldDescriptor::string("street", ""),
            FieldDescriptor::string("locality", ""),
            FieldDescriptor::string("region", ""),
            FieldDescriptor::string("postal-code", ""),
            FieldDescriptor::string("country", ""),
        ]));
        fields.push(FieldDescriptor::string("preferred-address", ""));
        fields.push(FieldDescriptor::maybe_missing("latitude", ValueType::String));
        fields.push(FieldDescriptor::maybe_missing("longitude", ValueType::String));
        fields
    });

    static DISTRIBUTION_LIST: Lazy<Vec<FieldDescriptor>> = Lazy::new(|| vec![
        FieldDescriptor::string("display-name", ""),
        composite_list("member", vec![
            FieldDescriptor::string("display-name", ""),
            FieldDescriptor::string("smtp-address", ""),
            FieldDescriptor::string("uid", ""),
        ]),
    ]);

    match object_type {
        ObjectType::Event => &EVENT,
        ObjectType::Task => &TASK,
        ObjectType::Note => &NOTE,
        ObjectType::Contact => &CONTACT,
        ObjectType::DistributionList => &DISTRIBUTION_LIST,
        ObjectType::Generic => &[],
    }
}

/// The complete, ordered schema of an object type: basic fields first, then the specific ones
pub fn fields_for(object_type: ObjectType) -> Vec<FieldDescriptor> {
    compose(basic_fields(), specific_fields(object_type))
}

/// Merge a specific schema onto a base schema.
/// A specific field named like a base field replaces it in place
pub fn compose(base: &[FieldDescriptor], specific: &[FieldDescriptor]) -> Vec<FieldDescriptor> {
    let mut fields = base.to_vec();
    for field in specific {
        match fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field.clone(),
            None => fields.push(field.clone()),
        }
    }
    fields
}

/// Check that a schema can be walked
pub(crate) fn check(fields: &[FieldDescriptor]) -> FormatResult<()> {
    for field in fields {
        match field.value_type() {
            ValueType::Composite(children) => check(children)?,
            ValueType::Multiple(inner) => {
                if let ValueType::Multiple(_) = inner.value_type() {
                    return Err(FormatError::InvalidSchema(format!("{} is a list of lists", field.name())));
                }
                check(std::slice::from_ref(inner.as_ref()))?;
            },
            _ => {},
        }
        if let Presence::Default(Value::Null) = field.presence() {
            return Err(FormatError::InvalidSchema(format!("{} has a null default", field.name())));
        }
    }
    Ok(())
}
