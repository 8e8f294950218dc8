//! This crate reads and writes Kolab groupware objects.
//!
//! Kolab stores events, tasks, notes and contacts as small XML documents attached to IMAP messages.
//! A [`Format`] converts such a document into an [`Object`] (a mapping from field names to [`Value`]s) and back.
//!
//! The fields of every object type are described by a schema (see the [`schema`] module).
//! Some fields are not read verbatim: creation and modification dates, the product id and recurrence rules (see [`recurrence`])
//! are computed by [`Hook`]s, and multiple categories are folded into a single one (see [`categories`]).
//!
//! Saving can update a previous version of a document rather than creating a new one, so that
//! content written by other clients survives.

mod error;
pub use error::{FormatError, FormatResult};
mod value;
pub use value::{Object, Value};

pub mod date;
pub mod coerce;
pub mod schema;
pub use schema::{FieldDescriptor, ObjectType, Presence, ValueType};
mod hooks;
pub use hooks::Hook;
mod walker;
pub mod recurrence;
pub mod categories;
pub use categories::CategoryManager;
mod format;
pub use format::{Format, LoadOptions, SaveOptions};

pub mod xml;
pub mod config;
