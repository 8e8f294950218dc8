//! Loading and saving whole Kolab objects


use chrono::{NaiveDate, TimeZone, Utc};

use kolab_format::{Format, FormatError, LoadOptions, Object, ObjectType, SaveOptions, Value};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn load(format: &Format, xml: &str) -> Object {
    format.load(xml.as_bytes(), LoadOptions::new()).unwrap()
}

fn without(mut object: Object, keys: &[&str]) -> Object {
    for key in keys {
        object.remove(key);
    }
    object
}

#[test]
fn test_load_task() {
    init_logs();
    let task = load(&Format::new(ObjectType::Task), documents::TASK);

    assert_eq!(task.uid(), Some("KOrganizer-1766046587.427"));
    assert_eq!(task.get_str("summary"), Some("Buy milk"));
    assert_eq!(task.get_str("location"), Some(""));
    assert_eq!(task.get_str("sensitivity"), Some("private"));
    assert_eq!(task.get_str("categories"), Some("Shopping"));
    assert_eq!(task.get_str("product-id"), Some("KOrganizer 3.5"));
    assert_eq!(
        task.get("creation-date").and_then(Value::as_datetime),
        Some(&Utc.with_ymd_and_hms(2021, 3, 1, 8, 30, 0).unwrap())
    );
    assert_eq!(task.get("start-date"), Some(&Value::Date(NaiveDate::from_ymd_opt(2021, 3, 21).unwrap())));
    assert_eq!(task.get("due-date"), Some(&Value::DateTime(Utc.with_ymd_and_hms(2021, 3, 22, 17, 0, 0).unwrap())));
    assert_eq!(task.get("priority"), Some(&Value::Integer(1)));
    assert_eq!(task.get("completed"), Some(&Value::Integer(50)));
    assert_eq!(task.get("inline-attachment"), Some(&Value::from(vec!["receipt.pdf", "list.txt"])));

    // Fields that may be missing are left out
    for absent in &["alarm", "creator", "parent", "recurrence", "link-attachment"] {
        assert!(!task.contains_key(absent), "{} should be absent", absent);
    }

    let organizer = task.get("organizer").and_then(Value::as_map).unwrap();
    assert_eq!(organizer.get_str("display-name"), Some("Jane Doe"));
    assert_eq!(organizer.get_str("uid"), Some(""));

    let attendees = task.get("attendee").and_then(Value::as_list).unwrap();
    assert_eq!(attendees.len(), 2);
    let john = attendees[0].as_map().unwrap();
    assert_eq!(john.get_str("status"), Some("accepted"));
    assert_eq!(john.get("request-response"), Some(&Value::Boolean(false)));
    let bob = attendees[1].as_map().unwrap();
    assert_eq!(bob.get_str("smtp-address"), Some("bob@example.org"));
    assert_eq!(bob.get_str("status"), Some("none"));
    assert_eq!(bob.get("request-response"), Some(&Value::Boolean(true)));
    assert_eq!(bob.get_str("role"), Some("required"));
}

#[test]
fn test_task_round_trip() {
    init_logs();
    let format = Format::new(ObjectType::Task);
    let task = load(&format, documents::TASK);

    let saved = format.save(&task, SaveOptions::new()).unwrap();
    let reloaded = format.load(&saved, LoadOptions::new()).unwrap();

    let calculated = ["last-modification-date", "product-id"];
    assert_eq!(without(reloaded, &calculated), without(task, &calculated));
}

#[test]
fn test_load_event_with_recurrence() {
    init_logs();
    let event = load(&Format::new(ObjectType::Event), documents::EVENT);

    assert_eq!(event.get("alarm"), Some(&Value::Integer(15)));
    assert_eq!(event.get("attendee"), Some(&Value::List(Vec::new())));

    let recurrence = event.get("recurrence").and_then(Value::as_map).unwrap();
    assert_eq!(recurrence.get_str("cycle"), Some("weekly"));
    assert_eq!(recurrence.get("interval"), Some(&Value::Integer(1)));
    assert_eq!(recurrence.get("day"), Some(&Value::from(vec!["monday", "wednesday", "friday"])));
    assert_eq!(recurrence.get("range"), Some(&Value::Date(NaiveDate::from_ymd_opt(2021, 12, 31).unwrap())));
    assert_eq!(recurrence.get_str("range-type"), Some("date"));
    assert_eq!(recurrence.get("exceptions"), Some(&Value::from(vec!["20210405"])));
    assert_eq!(recurrence.get("completions"), Some(&Value::from(vec!["20210324"])));
    assert!(!recurrence.contains_key("daynumber"));
}

#[test]
fn test_event_round_trip() {
    init_logs();
    let format = Format::new(ObjectType::Event);
    let event = load(&format, documents::EVENT);

    let saved = format.save(&event, SaveOptions::new()).unwrap();
    let text = String::from_utf8(saved.clone()).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(text.contains("<event version=\"1.0\">"));
    assert!(text.contains("<recurrence cycle=\"weekly\">"));
    assert!(text.contains("<range type=\"date\">2021-12-31</range>"));
    assert!(text.contains("<exclusion>2021-04-05</exclusion>"));
    assert!(text.contains("<categories>Work, Meetings, Weekly</categories>"));

    let reloaded = format.load(&saved, LoadOptions::new()).unwrap();
    let calculated = ["last-modification-date", "product-id"];
    assert_eq!(without(reloaded, &calculated), without(event, &calculated));
}

#[test]
fn test_load_contact() {
    init_logs();
    let contact = load(&Format::for_type("contact"), documents::CONTACT);

    let name = contact.get("name").and_then(Value::as_map).unwrap();
    assert_eq!(name.get_str("given-name"), Some("Jane"));
    assert_eq!(name.get_str("middle-names"), Some(""));
    assert_eq!(contact.get("birthday"), Some(&Value::Date(NaiveDate::from_ymd_opt(1980, 5, 17).unwrap())));
    assert!(!contact.contains_key("anniversary"));

    let phones: Vec<&str> = contact.get("phone").and_then(Value::as_list).unwrap()
        .iter()
        .map(|phone| phone.as_map().and_then(|p| p.get_str("type")).unwrap())
        .collect();
    assert_eq!(phones, vec!["business1", "mobile"]);
    assert!(!contact.contains_key("address"));
}

#[test]
fn test_new_object() {
    init_logs();
    let format = Format::new(ObjectType::Task);
    let mut task = Object::with_random_uid();
    task.insert("summary", "Water the plants");
    task.insert("due-date", "2021-03-21T12:00:00+02:00");
    task.insert("product-id", "ignored");

    let saved = format.save(&task, SaveOptions::new()).unwrap();
    let text = String::from_utf8(saved.clone()).unwrap();
    assert!(text.contains("<due-date>2021-03-21T10:00:00Z</due-date>"));
    assert!(text.contains("<priority>3</priority>"));
    assert!(text.contains("<sensitivity>public</sensitivity>"));
    assert!(!text.contains("ignored"));

    let loaded = format.load(&saved, LoadOptions::new()).unwrap();
    assert_eq!(loaded.uid(), task.uid());
    assert_eq!(loaded.get_str("product-id"), Some(kolab_format::config::product_id().as_str()));
    assert!(loaded.get("creation-date").and_then(Value::as_datetime).is_some());
    assert_eq!(loaded.get_str("status"), Some("not-started"));
}

#[test]
fn test_modification_date_increases() {
    init_logs();
    let format = Format::new(ObjectType::Task);
    let mut task = Object::with_random_uid();
    task.insert("last-modification-date", Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());

    let stamp = |xml: &[u8]| {
        let object = format.load(xml, LoadOptions::new()).unwrap();
        *object.get("last-modification-date").and_then(Value::as_datetime).unwrap()
    };

    let first = format.save(&task, SaveOptions::new()).unwrap();
    let second = format.save(&task, SaveOptions::new().previous(&first)).unwrap();
    assert!(stamp(first.as_slice()) > Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
    assert!(stamp(second.as_slice()) > stamp(first.as_slice()));

    // Another codec instance only knows about the previous document
    let third = Format::new(ObjectType::Task).save(&task, SaveOptions::new().previous(&second)).unwrap();
    assert!(stamp(third.as_slice()) > stamp(second.as_slice()));
}

#[test]
fn test_missing_uid() {
    init_logs();
    let format = Format::new(ObjectType::Note);
    let res = format.load(documents::NOTE_WITHOUT_UID.as_bytes(), LoadOptions::new());
    assert!(matches!(res, Err(FormatError::MissingUid)));

    // Not even relaxed mode accepts that
    let res = format.load(documents::NOTE_WITHOUT_UID.as_bytes(), LoadOptions::new().relaxed(true));
    assert!(matches!(res, Err(FormatError::MissingUid)));

    let res = format.save(&Object::new(), SaveOptions::new());
    assert!(matches!(res, Err(FormatError::MissingUid)));
}

#[test]
fn test_missing_required_field() {
    init_logs();
    let format = Format::new(ObjectType::Event);
    match format.load(documents::EVENT_WITHOUT_START.as_bytes(), LoadOptions::new()) {
        Err(FormatError::MissingRequiredField(name)) => assert_eq!(name, "start-date"),
        other => panic!("unexpected result {:?}", other),
    }

    let event = format.load(documents::EVENT_WITHOUT_START.as_bytes(), LoadOptions::new().relaxed(true)).unwrap();
    assert!(!event.contains_key("start-date"));
    assert_eq!(event.get("end-date"), Some(&Value::Date(NaiveDate::from_ymd_opt(2021, 3, 22).unwrap())));

    match format.save(&event, SaveOptions::new()) {
        Err(FormatError::MissingRequiredField(name)) => assert_eq!(name, "start-date"),
        other => panic!("unexpected result {:?}", other),
    }
    let saved = format.save(&event, SaveOptions::new().relaxed(true)).unwrap();
    assert!(!String::from_utf8(saved).unwrap().contains("start-date"));
}

#[test]
fn test_malformed_xml() {
    init_logs();
    let res = Format::new(ObjectType::Task).load(b"<task><uid>1</uid>", LoadOptions::new());
    assert!(matches!(res, Err(FormatError::Parse(_))));
}
