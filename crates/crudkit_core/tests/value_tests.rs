//! Tests for canonical field values and filter types

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use crudkit_core::{EqFilter, FieldValue, WireType};

#[test]
fn uuid_coercion_normalizes_every_textual_form() {
    let canonical = "97108ac1-ffcb-411d-8b1e-d9183399f63b";
    let hyphenated = FieldValue::from_json(WireType::Uuid, &json!(canonical))
        .expect("hyphenated form should coerce")
        .expect("non-null");
    let simple = FieldValue::from_json(
        WireType::Uuid,
        &json!("97108ac1ffcb411d8b1ed9183399f63b"),
    )
    .expect("simple form should coerce")
    .expect("non-null");

    assert_eq!(hyphenated, simple);
    assert_eq!(hyphenated.as_uuid(), Uuid::parse_str(canonical).ok());
}

#[test]
fn uuid_coercion_rejects_non_uuid_text() {
    let err = FieldValue::from_json(WireType::Uuid, &json!("not-a-uuid"))
        .expect_err("garbage should be rejected");
    assert!(err.contains("not a valid UUID"));
}

#[test]
fn timestamps_serialize_as_text_and_round_trip() {
    let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).single().expect("valid instant");
    let value = FieldValue::DateTime(instant);

    let wire = value.to_json();
    assert!(wire.is_string(), "timestamps must cross the wire as text");

    let back = FieldValue::from_json(WireType::DateTime, &wire)
        .expect("rfc 3339 text should coerce")
        .expect("non-null");
    assert_eq!(back, value);
}

#[test]
fn dates_use_calendar_form() {
    let value = FieldValue::Date(NaiveDate::from_ymd_opt(1890, 9, 15).expect("valid date"));
    assert_eq!(value.to_json(), json!("1890-09-15"));

    let err = FieldValue::from_json(WireType::Date, &json!("15/09/1890"))
        .expect_err("non-ISO dates should be rejected");
    assert!(err.contains("YYYY-MM-DD"));
}

#[test]
fn null_coerces_to_unset_for_every_wire_type() {
    for wire in [
        WireType::Uuid,
        WireType::Text,
        WireType::Integer,
        WireType::Float,
        WireType::Boolean,
        WireType::DateTime,
        WireType::Date,
        WireType::Json,
    ] {
        let coerced = FieldValue::from_json(wire, &serde_json::Value::Null)
            .expect("null is never a type error");
        assert!(coerced.is_none());
    }
}

#[test]
fn integers_and_floats_compare_across_shapes() {
    use std::cmp::Ordering;

    let int = FieldValue::Integer(3);
    let float = FieldValue::Float(3.5);
    assert_eq!(int.try_cmp(&float), Some(Ordering::Less));
    assert_eq!(float.try_cmp(&int), Some(Ordering::Greater));
}

#[test]
fn mismatched_shapes_do_not_compare() {
    let text = FieldValue::from("abc");
    let number = FieldValue::Integer(1);
    assert_eq!(text.try_cmp(&number), None);

    let flag = FieldValue::Boolean(true);
    assert_eq!(flag.try_cmp(&FieldValue::Boolean(false)), None, "booleans have no order");
}

#[test]
fn eq_filter_preserves_insertion_order() {
    let by = EqFilter::new().eq("name", "Agatha Christie").eq("dob", "1890-09-15");
    let fields: Vec<_> = by.entries().iter().map(|(field, _)| field.as_str()).collect();
    assert_eq!(fields, vec!["name", "dob"]);
    assert!(!by.is_empty());
}
