//! Editing objects: saving over a previous document, categories, recurrence rules


use std::collections::HashSet;

use chrono::{TimeZone, Utc};

use kolab_format::categories::{ALL_CATEGORIES, PRIMARY_CATEGORY};
use kolab_format::{CategoryManager, Format, FormatError, LoadOptions, Object, ObjectType, SaveOptions, Value};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_foreign_content_survives() {
    init_logs();
    let format = Format::new(ObjectType::Note);
    let previous = documents::FOREIGN_NOTE.as_bytes();

    let mut note = format.load(previous, LoadOptions::new()).unwrap();
    assert_eq!(note.get_str("summary"), Some("Old summary"));
    note.insert("summary", "New summary");

    let saved = format.save(&note, SaveOptions::new().previous(previous)).unwrap();
    let text = String::from_utf8(saved.clone()).unwrap();
    assert!(text.contains("xmlns:k=\"urn:example:kontact\""));
    assert!(text.contains("<k:pinned k:color=\"yellow\">true</k:pinned>"));
    assert!(text.contains("<x-custom-field>keep me</x-custom-field>"));
    assert!(text.contains("<!-- edited with Kontact -->"));
    assert!(text.contains("<summary>New summary</summary>"));
    assert!(!text.contains("Old summary"));

    // The stamp moves forward, even from a document dated in the future
    let reloaded = format.load(&saved, LoadOptions::new()).unwrap();
    assert_eq!(
        reloaded.get("last-modification-date").and_then(Value::as_datetime),
        Some(&Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 1).unwrap())
    );
}

#[test]
fn test_removed_fields_are_removed() {
    init_logs();
    let format = Format::new(ObjectType::Task);
    let previous = documents::TASK.as_bytes();

    let mut task = format.load(previous, LoadOptions::new()).unwrap();
    task.remove("due-date");
    task.remove("inline-attachment");
    task.insert("alarm", 10);
    task.insert("day-of-rest", "sunday");

    let saved = format.save(&task, SaveOptions::new().previous(previous)).unwrap();
    let text = String::from_utf8(saved.clone()).unwrap();
    assert!(!text.contains("due-date"));
    assert!(!text.contains("inline-attachment"));
    assert!(!text.contains("day-of-rest"));
    assert!(text.contains("<alarm>10</alarm>"));

    // One node per field, even after several saves
    let saved_again = format.save(&task, SaveOptions::new().previous(&saved)).unwrap();
    let text = String::from_utf8(saved_again).unwrap();
    assert_eq!(text.matches("<summary>").count(), 1);
    assert_eq!(text.matches("<attendee>").count(), 2);
}

#[test]
fn test_categories() {
    init_logs();
    let format = Format::new(ObjectType::Event);
    let event = format.load(documents::EVENT.as_bytes(), LoadOptions::new()).unwrap();
    assert_eq!(event.get_str("categories"), Some("Work"));
    assert_eq!(event.get_str(ALL_CATEGORIES), Some("Work, Meetings, Weekly"));
    assert_eq!(event.get_str(PRIMARY_CATEGORY), Some("Work"));

    // The user picked another category: the other ones are dropped
    let mut edited = event.clone();
    edited.insert("categories", "Meetings");
    let saved = format.save(&edited, SaveOptions::new()).unwrap();
    let reloaded = format.load(&saved, LoadOptions::new()).unwrap();
    assert_eq!(reloaded.get_str("categories"), Some("Meetings"));
    assert!(!reloaded.contains_key(ALL_CATEGORIES));
}

#[derive(Default)]
struct Preferences {
    categories: HashSet<String>,
    locked: bool,
}

impl CategoryManager for Preferences {
    fn ensure(&mut self, category: &str) -> bool {
        if self.categories.contains(category) {
            return true;
        }
        if self.locked {
            return false;
        }
        self.categories.insert(category.to_string());
        true
    }
}

#[test]
fn test_category_manager() {
    init_logs();
    let format = Format::new(ObjectType::Event);

    let mut preferences = Preferences::default();
    format.load(documents::EVENT.as_bytes(), LoadOptions::new().with_category_manager(&mut preferences)).unwrap();
    let expected: HashSet<String> = ["Work", "Meetings", "Weekly"].iter().map(|s| s.to_string()).collect();
    assert_eq!(preferences.categories, expected);

    let mut locked = Preferences { locked: true, ..Preferences::default() };
    locked.categories.insert("Weekly".to_string());
    let event = format.load(documents::EVENT.as_bytes(), LoadOptions::new().with_category_manager(&mut locked)).unwrap();
    assert_eq!(event.get_str("categories"), Some("Weekly"));
    assert_eq!(locked.categories.len(), 1);
}

#[test]
fn test_category_manager_single_category() {
    init_logs();
    let format = Format::new(ObjectType::Note);
    let note = b"<note version=\"1.0\"><uid>1</uid><categories>Work</categories></note>";

    let mut preferences = Preferences::default();
    let loaded = format.load(note, LoadOptions::new().with_category_manager(&mut preferences)).unwrap();
    assert!(preferences.categories.contains("Work"));
    assert_eq!(loaded.get_str("categories"), Some("Work"));
    assert!(!loaded.contains_key(ALL_CATEGORIES));

    let mut locked = Preferences { locked: true, ..Preferences::default() };
    let loaded = format.load(note, LoadOptions::new().with_category_manager(&mut locked)).unwrap();
    assert_eq!(loaded.get_str("categories"), Some(""));
}

fn weekly_event() -> Object {
    let mut event = Object::with_random_uid();
    event.insert("summary", "Standup");
    event.insert("start-date", Utc.with_ymd_and_hms(2021, 3, 22, 9, 0, 0).unwrap());
    event.insert("end-date", Utc.with_ymd_and_hms(2021, 3, 22, 9, 15, 0).unwrap());
    event
}

#[test]
fn test_recurrence_is_validated_on_save() {
    init_logs();
    let format = Format::new(ObjectType::Event);

    let mut rule = Object::new();
    rule.insert("cycle", "weekly");
    rule.insert("interval", 1);
    rule.insert("day", Value::List(Vec::new()));
    let mut event = weekly_event();
    event.insert("recurrence", rule.clone());

    let res = format.save(&event, SaveOptions::new());
    assert!(matches!(res, Err(FormatError::RecurrenceValidation(_))));

    // Relaxed mode writes it anyway, and reads it back
    let saved = format.save(&event, SaveOptions::new().relaxed(true)).unwrap();
    assert!(format.load(&saved, LoadOptions::new()).is_err());
    let loaded = format.load(&saved, LoadOptions::new().relaxed(true)).unwrap();
    let loaded_rule = loaded.get("recurrence").and_then(Value::as_map).unwrap();
    assert_eq!(loaded_rule.get_str("cycle"), Some("weekly"));

    rule.insert("day", vec!["monday", "friday"]);
    rule.insert("exceptions", vec!["20210329"]);
    event.insert("recurrence", rule);
    let saved = format.save(&event, SaveOptions::new()).unwrap();
    let loaded = format.load(&saved, LoadOptions::new()).unwrap();
    let loaded_rule = loaded.get("recurrence").and_then(Value::as_map).unwrap();
    assert_eq!(loaded_rule.get("day"), Some(&Value::from(vec!["monday", "friday"])));
    assert_eq!(loaded_rule.get("exceptions"), Some(&Value::from(vec!["20210329"])));
}

#[test]
fn test_recurrence_can_be_dropped() {
    init_logs();
    let format = Format::new(ObjectType::Event);
    let previous = documents::EVENT.as_bytes();

    let mut event = format.load(previous, LoadOptions::new()).unwrap();
    event.remove("recurrence");
    let saved = format.save(&event, SaveOptions::new().previous(previous)).unwrap();
    assert!(!String::from_utf8(saved).unwrap().contains("recurrence"));
}

#[test]
fn test_latin1_document() {
    init_logs();
    let mut bytes = b"<?xml version=\"1.0\"?><note version=\"1.0\"><uid>n1</uid><summary>Cr".to_vec();
    bytes.push(0xe8); // 'è' in ISO-8859-1
    bytes.extend_from_slice(b"me br");
    bytes.push(0xfb); // 'û'
    bytes.extend_from_slice(b"l\xe9e</summary></note>");

    let format = Format::new(ObjectType::Note);
    let note = format.load(&bytes, LoadOptions::new()).unwrap();
    assert_eq!(note.get_str("summary"), Some("Crème brûlée"));

    // Always written back as UTF-8
    let saved = format.save(&note, SaveOptions::new()).unwrap();
    assert!(String::from_utf8(saved).unwrap().contains("Crème brûlée"));
}

#[test]
fn test_previous_document_of_another_type() {
    init_logs();
    let format = Format::new(ObjectType::Note);
    let mut note = Object::with_random_uid();
    note.insert("summary", "Misfiled");

    let res = format.save(&note, SaveOptions::new().previous(documents::TASK.as_bytes()));
    assert!(matches!(res, Err(FormatError::InvalidRoot { .. })));

    let saved = format.save(&note, SaveOptions::new().previous(documents::TASK.as_bytes()).relaxed(true)).unwrap();
    assert!(String::from_utf8(saved).unwrap().starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<task"));
}

#[test]
fn test_note_colors() {
    init_logs();
    let format = Format::new(ObjectType::Note);
    let mut note = Object::with_random_uid();
    note.insert("background-color", "#ff8800");

    let saved = format.save(&note, SaveOptions::new()).unwrap();
    let loaded = format.load(&saved, LoadOptions::new()).unwrap();
    assert_eq!(loaded.color("background-color").unwrap().to_hex_string(), "#ff8800");
    assert_eq!(loaded.color("foreground-color").unwrap().to_hex_string(), "#ffff00");
}
