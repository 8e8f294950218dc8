//! Recurrence rules
//!
//! A `<recurrence>` node carries its `cycle` and `type` as attributes, the rest as children:
//! ```xml
//! <recurrence cycle="weekly">
//!  <interval>1</interval>
//!  <day>monday</day>
//!  <range type="date">2021-12-31</range>
//!  <exclusion>2021-03-22</exclusion>
//! </recurrence>
//! ```
//! Loaded rules expose exclusions and completions as compact `YYYYMMDD` dates
//! under the `exceptions` and `completions` keys.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::coerce;
use crate::date;
use crate::error::{FormatError, FormatResult};
use crate::schema::recurrence_fields;
use crate::value::{Object, Value};
use crate::walker::Walker;
use crate::xml::Element;

/// How often a rule repeats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Cycle {
    type Err = FormatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Cycle::Daily),
            "weekly" => Ok(Cycle::Weekly),
            "monthly" => Ok(Cycle::Monthly),
            "yearly" => Ok(Cycle::Yearly),
            other => Err(invalid(format!("unknown cycle {:?}", other))),
        }
    }
}

impl Display for Cycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Cycle::Daily => "daily",
            Cycle::Weekly => "weekly",
            Cycle::Monthly => "monthly",
            Cycle::Yearly => "yearly",
        };
        write!(f, "{}", name)
    }
}

/// Which day of the month or year a monthly or yearly rule falls on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecurrenceType {
    /// The n-th day of the month (or of the year)
    Daynumber,
    /// The n-th given weekday of the month
    Weekday,
    /// The n-th day of a given month
    Monthday,
    /// The n-th day of the year
    Yearday,
}

impl FromStr for RecurrenceType {
    type Err = FormatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daynumber" => Ok(RecurrenceType::Daynumber),
            "weekday" => Ok(RecurrenceType::Weekday),
            "monthday" => Ok(RecurrenceType::Monthday),
            "yearday" => Ok(RecurrenceType::Yearday),
            other => Err(invalid(format!("unknown recurrence type {:?}", other))),
        }
    }
}

fn invalid<S: Into<String>>(message: S) -> FormatError {
    FormatError::RecurrenceValidation(message.into())
}

/// An integer entry, also accepting its textual form
fn integer(record: &Object, key: &str) -> Option<i64> {
    match record.get_present(key)? {
        Value::Integer(i) => Some(*i),
        Value::String(s) if !s.trim().is_empty() => Some(coerce::parse_leading_int(s)),
        _ => None,
    }
}

fn has_days(record: &Object) -> bool {
    match record.get_present("day") {
        Some(Value::List(days)) => !days.is_empty(),
        Some(Value::String(day)) => !day.is_empty(),
        _ => false,
    }
}

/// Check that a rule is complete and consistent
pub fn validate(record: &Object) -> FormatResult<()> {
    let cycle: Cycle = match record.get_str("cycle") {
        Some(cycle) if !cycle.is_empty() => cycle.parse()?,
        _ => return Err(invalid("recurrence has no cycle")),
    };

    match integer(record, "interval") {
        None => return Err(invalid("recurrence has no interval")),
        Some(interval) if interval < 0 => return Err(invalid(format!("negative interval {}", interval))),
        Some(_) => {},
    }

    match cycle {
        Cycle::Daily => {},
        Cycle::Weekly => {
            if !has_days(record) {
                return Err(invalid("weekly recurrence without days"));
            }
        },
        Cycle::Monthly | Cycle::Yearly => {
            let recurrence_type: RecurrenceType = match record.get_str("type") {
                Some(t) if !t.is_empty() => t.parse()?,
                _ => return Err(invalid(format!("{} recurrence has no type", cycle))),
            };
            let daynumber = match integer(record, "daynumber") {
                None => return Err(invalid(format!("{} recurrence has no daynumber", cycle))),
                Some(n) if n < 0 => return Err(invalid(format!("negative daynumber {}", n))),
                Some(n) => n,
            };

            match (cycle, recurrence_type) {
                (_, RecurrenceType::Daynumber) => {
                    let bound = if cycle == Cycle::Yearly { 366 } else { 31 };
                    if daynumber > bound {
                        return Err(invalid(format!("daynumber {} is larger than {}", daynumber, bound)));
                    }
                },
                (_, RecurrenceType::Weekday) => {
                    if daynumber > 5 {
                        return Err(invalid(format!("there is no week {} in a month", daynumber)));
                    }
                    if !has_days(record) {
                        return Err(invalid("weekday recurrence without days"));
                    }
                },
                (Cycle::Monthly, t) => {
                    return Err(invalid(format!("{:?} is not a monthly recurrence type", t)));
                },
                (_, RecurrenceType::Monthday) => {
                    if record.get_present("month").map_or(true, Value::is_empty) {
                        return Err(invalid("monthday recurrence without month"));
                    }
                    if daynumber > 31 {
                        return Err(invalid(format!("there is no day {} in a month", daynumber)));
                    }
                },
                (_, RecurrenceType::Yearday) => {
                    if daynumber > 366 {
                        return Err(invalid(format!("there is no day {} in a year", daynumber)));
                    }
                },
            }
        },
    }
    Ok(())
}

/// Strict mode fails, relaxed mode only complains
fn check(walker: &Walker, record: &Object) -> FormatResult<()> {
    match validate(record) {
        Err(err) if walker.relaxed() => {
            log::warn!("Accepting an invalid recurrence: {}", err);
            Ok(())
        },
        res => res,
    }
}

/// Turn a list of dates with `convert`, dropping empty entries
fn convert_dates(value: &Value, convert: fn(&str) -> Option<String>) -> Value {
    let items = match value {
        Value::List(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    let converted: Vec<Value> = items.iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.is_empty() => Some(convert(s).unwrap_or_else(|| s.clone())),
            Value::Date(d) => convert(&date::encode_date(d)),
            _ => None,
        })
        .map(Value::String)
        .collect();
    Value::List(converted)
}

/// Read a rule from its node
pub(crate) fn decode(walker: &Walker, node: &Element) -> FormatResult<Object> {
    let mut loaded = walker.load_fields(node, recurrence_fields())?;

    let mut record = Object::new();
    record.insert("cycle", node.attr("cycle").unwrap_or(""));
    if let Some(recurrence_type) = node.attr("type") {
        record.insert("type", recurrence_type);
    }

    if let Some(exclusions) = loaded.remove("exclusion") {
        loaded.insert("exceptions", convert_dates(&exclusions, date::compact_date));
    }
    if let Some(completed) = loaded.remove("complete") {
        loaded.insert("completions", convert_dates(&completed, date::compact_date));
    }

    if let Some(range_type) = node.find_child("range").and_then(|range| range.attr("type")) {
        if range_type == "date" {
            let range = loaded.get_str("range").and_then(date::decode_date);
            loaded.insert("range", range.map(Value::Date).unwrap_or(Value::Null));
        }
        loaded.insert("range-type", range_type);
    }

    for (key, value) in loaded.iter() {
        record.insert(key, value.clone());
    }

    check(walker, &record)?;
    Ok(record)
}

/// Build the node of a rule
pub(crate) fn encode(walker: &Walker, name: &str, record: &Object) -> FormatResult<Element> {
    check(walker, record)?;

    let mut children = record.clone();
    if let Some(exceptions) = children.remove("exceptions") {
        children.insert("exclusion", convert_dates(&exceptions, date::expand_date));
    } else if let Some(exclusions) = children.remove("exclusion") {
        children.insert("exclusion", convert_dates(&exclusions, date::expand_date));
    }
    if let Some(completions) = children.remove("completions") {
        children.insert("complete", convert_dates(&completions, date::expand_date));
    } else if let Some(completed) = children.remove("complete") {
        children.insert("complete", convert_dates(&completed, date::expand_date));
    }

    let range_type = match (record.get_str("range-type"), record.get("range")) {
        (Some(t), _) => Some(t.to_string()),
        (None, Some(Value::Date(_))) => Some("date".to_string()),
        _ => None,
    };

    let mut node = Element::new(name);
    if let Some(cycle) = record.get_str("cycle") {
        node.set_attr("cycle", cycle);
    }
    if let Some(recurrence_type) = record.get_str("type").filter(|t| !t.is_empty()) {
        node.set_attr("type", recurrence_type);
    }

    walker.save_fields(&mut node, &children, recurrence_fields())?;

    if let (Some(range_type), Some(range)) = (range_type, node.find_child_mut("range")) {
        range.set_attr("type", range_type);
    }
    Ok(node)
}
