//! The codec of a Kolab object type

use chrono::{DateTime, TimeZone, Utc};

use crate::categories::{self, CategoryManager};
use crate::date;
use crate::error::{FormatError, FormatResult};
use crate::schema::{self, FieldDescriptor, ObjectType};
use crate::config::{ATTACHMENT_NAME, ROOT_VERSION};
use crate::value::Object;
use crate::walker::{current_second, Walker};
use crate::xml::Element;

/// Options of [`Format::load`]
#[derive(Default)]
pub struct LoadOptions<'a> {
    relaxed: bool,
    categories: Option<&'a mut dyn CategoryManager>,
}

impl<'a> LoadOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// In relaxed mode, missing required fields (except `uid`), invalid recurrences
    /// and unexpected root elements are logged instead of failing the load
    pub fn relaxed(mut self, relaxed: bool) -> Self {
        self.relaxed = relaxed;
        self
    }

    /// Register the categories of loaded objects into this manager
    pub fn with_category_manager(mut self, manager: &'a mut dyn CategoryManager) -> Self {
        self.categories = Some(manager);
        self
    }
}

/// Options of [`Format::save`]
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveOptions<'a> {
    previous: Option<&'a [u8]>,
    relaxed: bool,
}

impl<'a> SaveOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update this previous document rather than creating a new one.
    /// Nodes the schema does not know about are kept.
    ///
    /// The new modification stamp is always later than the one of this document.
    /// Without a previous document, two saves within the same second get the same stamp
    pub fn previous(mut self, previous: &'a [u8]) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn relaxed(mut self, relaxed: bool) -> Self {
        self.relaxed = relaxed;
        self
    }
}

/// Converts Kolab objects of one type from and to their XML form.
///
/// ```
/// use kolab_format::{Format, LoadOptions, Object, ObjectType, SaveOptions};
///
/// let format = Format::new(ObjectType::Note);
/// let mut note = Object::with_random_uid();
/// note.insert("summary", "Buy milk");
///
/// let xml = format.save(&note, SaveOptions::new()).unwrap();
/// let loaded = format.load(&xml, LoadOptions::new()).unwrap();
/// assert_eq!(loaded.get_str("summary"), Some("Buy milk"));
/// ```
#[derive(Clone, Debug)]
pub struct Format {
    object_type: ObjectType,
    fields: Vec<FieldDescriptor>,
}

impl Format {
    pub fn new(object_type: ObjectType) -> Self {
        Self::from_parts(object_type, schema::fields_for(object_type))
    }

    /// The format of a type given by name, e.g. `"task"`. Unknown names give a generic format
    pub fn for_type(name: &str) -> Self {
        Self::new(ObjectType::from(name))
    }

    /// A format with the basic fields followed by `specific` ones
    pub fn with_fields(object_type: ObjectType, specific: Vec<FieldDescriptor>) -> FormatResult<Self> {
        let fields = schema::compose(schema::basic_fields(), &specific);
        schema::check(&fields)?;
        Ok(Self::from_parts(object_type, fields))
    }

    fn from_parts(object_type: ObjectType, fields: Vec<FieldDescriptor>) -> Self {
        Self { object_type, fields }
    }

    pub fn object_type(&self) -> ObjectType    { self.object_type             }
    pub fn root_name(&self) -> &'static str    { self.object_type.root_name() }
    pub fn mime_type(&self) -> String          { self.object_type.mime_type() }
    pub fn filename(&self) -> &'static str     { ATTACHMENT_NAME              }
    pub fn disposition(&self) -> &'static str  { "attachment"                 }
    pub fn fields(&self) -> &[FieldDescriptor] { &self.fields                 }

    /// Parse a document into an object
    pub fn load(&self, xml: &[u8], options: LoadOptions<'_>) -> FormatResult<Object> {
        let root = Element::parse(xml)?;
        self.check_root(&root, options.relaxed)?;

        let walker = Walker::for_load(options.relaxed);
        let mut object = walker.load_fields(&root, &self.fields)?;
        categories::load_categories(&mut object, options.categories);

        if object.uid().is_none() {
            return Err(FormatError::MissingUid);
        }
        log::debug!("Loaded {} {:?}", self.object_type, object.uid());
        Ok(object)
    }

    /// Serialize an object into a UTF-8 document
    pub fn save(&self, object: &Object, options: SaveOptions<'_>) -> FormatResult<Vec<u8>> {
        let mut root = match options.previous {
            Some(previous) => {
                let root = Element::parse(previous)?;
                self.check_root(&root, options.relaxed)?;
                root
            },
            None => {
                let mut root = Element::new(self.root_name());
                root.set_attr("version", ROOT_VERSION);
                root
            },
        };

        let previous_stamp = root.find_child("last-modification-date")
            .and_then(|node| date::decode_datetime(&node.text()));
        let now = current_second();
        let walker = Walker::new(options.relaxed, now, next_stamp(now, previous_stamp));

        let mut object = object.clone();
        categories::save_categories(&mut object);
        walker.save_fields(&mut root, &object, &self.fields)?;

        log::debug!("Saved {} {:?}", self.object_type, object.uid());
        root.to_document()
    }

    fn check_root(&self, root: &Element, relaxed: bool) -> FormatResult<()> {
        if self.object_type == ObjectType::Generic || root.name() == self.root_name() {
            return Ok(());
        }
        if relaxed {
            log::warn!("Expected a <{}> document, got <{}>", self.root_name(), root.name());
            return Ok(());
        }
        Err(FormatError::InvalidRoot {
            expected: self.root_name().to_string(),
            found: root.name().to_string(),
        })
    }
}

/// The current second, or one second after the stamp of the previous document if that is later
fn next_stamp(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous >= now => {
            Utc.timestamp_opt(previous.timestamp().saturating_add(1), 0).single().unwrap_or(now)
        },
        _ => now,
    }
}
