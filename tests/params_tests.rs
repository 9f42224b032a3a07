use std::io::Write;

use dvaccum::{AccumulationParams, ConfigError, DecayFunction, SliceMethod};
use serde_json::json;

fn full_document() -> serde_json::Value {
    json!({
        "accumulation_time": 33000,
        "accumulation_number": 5000,
        "synchronous_decay": false,
        "min_potential": 0.0,
        "max_potential": 1.0,
        "neutral_potential": 0.0,
        "event_contribution": 0.15,
        "rectify_polarity": false,
        "decay_param": 1000000.0,
        "slice_method": 0,
        "decay_function": 2
    })
}

fn load(doc: &serde_json::Value) -> Result<AccumulationParams, ConfigError> {
    AccumulationParams::from_json_str(&doc.to_string())
}

#[test]
fn loads_numeric_enum_ids() {
    let params = load(&full_document()).unwrap();
    assert_eq!(params.slice_method, SliceMethod::Time);
    assert_eq!(params.decay_function, DecayFunction::Exponential);
    assert_eq!(params.accumulation_time, 33_000);
    assert_eq!(params.accumulation_number, 5_000);
}

#[test]
fn loads_enum_names() {
    let mut doc = full_document();
    doc["slice_method"] = json!("NUMBER");
    doc["decay_function"] = json!("step");
    let params = load(&doc).unwrap();
    assert_eq!(params.slice_method, SliceMethod::Number);
    assert_eq!(params.decay_function, DecayFunction::Step);
}

#[test]
fn every_field_is_required() {
    let fields = [
        "accumulation_time",
        "accumulation_number",
        "synchronous_decay",
        "min_potential",
        "max_potential",
        "neutral_potential",
        "event_contribution",
        "rectify_polarity",
        "decay_param",
        "slice_method",
        "decay_function",
    ];
    for field in fields {
        let mut doc = full_document();
        doc.as_object_mut().unwrap().remove(field);
        match load(&doc) {
            Err(ConfigError::Parse(err)) => {
                assert!(err.to_string().contains(field), "{field}: {err}");
            }
            other => panic!("{field}: expected parse error, got {other:?}"),
        }
    }
}

#[test]
fn unknown_enum_values_are_rejected() {
    let mut doc = full_document();
    doc["decay_function"] = json!(7);
    assert!(matches!(
        load(&doc),
        Err(ConfigError::UnknownVariant { field: "decay_function", .. })
    ));

    let mut doc = full_document();
    doc["slice_method"] = json!("EVERY_FRAME");
    assert!(matches!(
        load(&doc),
        Err(ConfigError::UnknownVariant { field: "slice_method", .. })
    ));
}

#[test]
fn invalid_ranges_are_rejected() {
    let cases = [
        ("max_potential", json!(0.0)),
        ("neutral_potential", json!(2.0)),
        ("decay_param", json!(0.0)),
        ("accumulation_time", json!(0)),
        ("accumulation_number", json!(-3)),
    ];
    for (field, value) in cases {
        let mut doc = full_document();
        doc[field] = value;
        assert!(
            matches!(load(&doc), Err(ConfigError::Invalid { .. })),
            "{field} should be invalid"
        );
    }
}

#[test]
fn zero_count_only_matters_for_number_slicing() {
    let mut doc = full_document();
    doc["accumulation_number"] = json!(0);
    assert!(load(&doc).is_ok());

    doc["slice_method"] = json!(1);
    assert!(matches!(
        load(&doc),
        Err(ConfigError::Invalid { field: "accumulation_number", .. })
    ));
}

#[test]
fn reads_parameter_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", full_document()).unwrap();
    let params = AccumulationParams::from_json_file(file.path()).unwrap();
    assert_eq!(params.event_contribution, 0.15);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AccumulationParams::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
