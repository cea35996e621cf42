//! End-to-end sensor scenarios over the bundled recreation center data.
//!
//! Run with: `cargo test --test sensor`

use std::collections::BTreeSet;
use std::io::Write;

use mokosh_sensor::encoders::FieldValue;
use mokosh_sensor::prelude::*;

const HOURLY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/rec-center-hourly.csv");
const HOURLY_SMALL: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/data/rec-center-hourly-small.csv"
);

const REC_CENTER_ENCODERS: &str = r#"{
    "fieldEncodings": {
        "consumption": {
            "n": 25, "w": 3, "resolution": 0.1,
            "encoderType": "RandomDistributedScalarEncoder"
        },
        "timestamp": {
            "dayOfWeek": [1, 1.0],
            "timeOfDay": [5, 4.0],
            "formatPattern": "MM/dd/YY HH:mm"
        }
    }
}"#;

fn open(path: &str) -> Sensor {
    Sensor::builder()
        .factory(CsvSource::create)
        .params(SensorParams::path(path))
        .build()
        .unwrap()
}

fn configured(path: &str) -> Sensor {
    let mut sensor = open(path);
    let params = EncoderParameters::from_json_str(REC_CENTER_ENCODERS).unwrap();
    sensor.set_local_parameters(&params).unwrap();
    sensor
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

#[test]
fn improper_instantiation_is_rejected() {
    let err = Sensor::builder()
        .params(SensorParams::path(HOURLY))
        .build()
        .unwrap_err();
    assert_eq!(err.to_string(), "Factory cannot be absent");
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let err = Sensor::builder()
        .factory(CsvSource::create)
        .build()
        .unwrap_err();
    assert!(matches!(err, SensorError::MissingParams));
}

#[test]
fn meta_is_inferred_from_header() {
    let sensor = open(HOURLY);
    let meta = sensor.meta();

    assert_eq!(meta.field_names(), vec!["timestamp", "consumption"]);
    assert_eq!(meta.field_types(), vec![FieldType::DateTime, FieldType::Float]);
    assert_eq!(meta.flags(), vec![FieldFlag::Timestamp, FieldFlag::None]);
    assert_eq!(meta.timestamp_index(), Some(0));
    assert_eq!(meta.header().len(), 3);
}

#[test]
fn malformed_headers_are_rejected() {
    let cases = [
        "a,b\nfloat\nB,B\n1,2\n",
        "a,b\nfloat,decimal\nB,B\n1,2\n",
        "a,b\nfloat,float\nB,X\n1,2\n",
        "a,a\nfloat,float\nB,B\n1,2\n",
    ];

    for case in cases {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(case.as_bytes()).unwrap();

        let err = Sensor::builder()
            .factory(CsvSource::create)
            .params(SensorParams::path(file.path()))
            .build()
            .unwrap_err();
        assert!(
            matches!(err, SensorError::MalformedHeader(_)),
            "{case:?} gave {err:?}"
        );
        assert_eq!(err.category(), ErrorCategory::Schema);
    }
}

// =============================================================================
// ENCODER COMPOSITION
// =============================================================================

#[test]
fn encoders_are_created_in_name_order() {
    let sensor = configured(HOURLY);
    let multi = sensor.encoder();

    assert_eq!(multi.num_encoders(), 2);
    assert_eq!(multi.size(), 62);

    let layout = multi.describe();
    assert_eq!(layout[0].name, "consumption");
    assert_eq!(layout[0].kind, "RandomDistributedScalarEncoder");
    assert_eq!((layout[0].offset, layout[0].width), (0, 25));
    assert_eq!(layout[1].name, "timestamp");
    assert_eq!(layout[1].kind, "DateEncoder");
    assert_eq!((layout[1].offset, layout[1].width), (25, 37));
}

#[test]
fn worked_example_bit_layout() {
    let sensor = configured(HOURLY);
    let multi = sensor.encoder();
    let timestamp = &multi.get("timestamp").unwrap().encoder;

    let err = timestamp.parse("13:10 7/12/10").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid format: \"13:10 7/12/10\" is malformed at \":10 7/12/10\""
    );
    assert_eq!(err.category(), ErrorCategory::Parse);

    let when = timestamp.parse("7/12/10 13:10").unwrap();
    let consumption = &multi.get("consumption").unwrap().encoder;
    let consumption_bits = consumption
        .encode_field(&FieldValue::Float(35.3))
        .unwrap()
        .get_sparse();
    assert_eq!(consumption_bits.len(), 3);

    let mut record = Record::new();
    record.insert("timestamp".to_string(), when);
    record.insert("consumption".to_string(), FieldValue::Float(35.3));
    let bits: BTreeSet<u32> = multi.encode(&record).unwrap().get_sparse().into_iter().collect();

    let mut expected: BTreeSet<u32> = consumption_bits.into_iter().collect();
    expected.insert(25); // Monday
    expected.extend(46..=50); // 13:10
    assert_eq!(bits, expected);
    assert!(bits.iter().filter(|&&b| b < 25).count() == 3);
}

#[test]
fn encoding_is_reproducible_across_sensors() {
    let row: Row = vec!["7/12/10 13:10".to_string(), "35.3".to_string()];

    let encode = || {
        let sensor = configured(HOURLY);
        let record = sensor.encoder().parse_row(sensor.meta(), &row).unwrap();
        sensor.encoder().encode(&record).unwrap()
    };

    assert_eq!(encode(), encode());
}

#[test]
fn unknown_field_override_fails() {
    let mut sensor = open(HOURLY);
    let params = EncoderParameters::from_json_str(
        r#"{ "fieldEncodings": { "kw_energy": { "w": 3, "n": 25 } } }"#,
    )
    .unwrap();

    let err = sensor.set_local_parameters(&params).unwrap_err();
    assert!(matches!(err, SensorError::UnknownField { ref field } if field == "kw_energy"));
    assert_eq!(sensor.state(), SensorState::Unconfigured);
}

#[test]
fn unknown_encoder_kind_fails() {
    let mut sensor = open(HOURLY);
    let params = EncoderParameters::from_json_str(
        r#"{ "fieldEncodings": { "consumption": {
            "w": 3, "n": 25, "encoderType": "SDRCategoryEncoder"
        } } }"#,
    )
    .unwrap();

    let err = sensor.set_local_parameters(&params).unwrap_err();
    assert!(matches!(err, SensorError::UnknownEncoderKind { ref kind } if kind == "SDRCategoryEncoder"));
}

#[test]
fn unconfigured_fields_are_left_out() {
    let mut sensor = open(HOURLY);
    let params = EncoderParameters::from_json_str(
        r#"{ "fieldEncodings": { "consumption": { "w": 3, "n": 25, "resolution": 0.1,
            "encoderType": "RandomDistributedScalarEncoder" } } }"#,
    )
    .unwrap();
    sensor.set_local_parameters(&params).unwrap();

    assert_eq!(sensor.encoder().num_encoders(), 1);
    assert!(sensor.encoder().get("timestamp").is_none());
    assert!(!sensor.spec().unwrap().get("timestamp").unwrap().is_active());
}

// =============================================================================
// STREAMS
// =============================================================================

#[test]
fn terminal_operation_is_detected() {
    let mut sensor = open(HOURLY);
    assert!(!sensor.is_terminal());

    let mut rows = sensor.input_stream().unwrap();
    let first = rows.next().unwrap().unwrap();
    assert_eq!(first, vec!["7/2/10 0:00", "21.2"]);
    assert!(!sensor.is_terminal());

    assert_eq!(rows.by_ref().filter(Result::is_ok).count(), 24 * 7 - 1);
    assert!(sensor.is_terminal());
    assert!(rows.next().is_none());
    assert!(sensor.is_terminal());
}

#[test]
fn output_stream_encodes_every_row() {
    let mut sensor = configured(HOURLY_SMALL);

    let outputs: Vec<Sdr> = sensor
        .output_stream()
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    assert_eq!(outputs.len(), 12);
    for sdr in &outputs {
        assert_eq!(sdr.size(), 62);
        assert_eq!(sdr.get_sum(), 3 + 1 + 5);
        // 7/2/10 was a Friday
        assert!(sdr.get_sparse().contains(&(25 + 4)));
    }
    assert_ne!(outputs[0], outputs[6]);
    assert_eq!(sensor.state(), SensorState::Terminal);
}

#[test]
fn source_is_single_pass() {
    let mut sensor = configured(HOURLY_SMALL);
    let _stream = sensor.output_stream().unwrap();

    let err = sensor.input_stream().unwrap_err();
    assert!(matches!(err, SensorError::AlreadyConsumed));
    assert_eq!(err.category(), ErrorCategory::State);

    let params = EncoderParameters::from_json_str(REC_CENTER_ENCODERS).unwrap();
    assert!(matches!(
        sensor.set_local_parameters(&params),
        Err(SensorError::AlreadyConsumed)
    ));
}

#[test]
fn detected_format_is_locked_for_the_stream() {
    let csv = "timestamp,consumption\n\
               datetime,float\n\
               T,\n\
               7/2/10 0:00,21.2\n\
               2010-07-02 01:00,16.4\n\
               7/2/10 2:00,4.7\n";
    let mut sensor = Sensor::builder()
        .factory(CsvSource::create)
        .params(SensorParams::inline(csv))
        .build()
        .unwrap();
    let params = EncoderParameters::from_json_str(
        r#"{ "fieldEncodings": { "timestamp": { "timeOfDay": [5, 4.0] } } }"#,
    )
    .unwrap();
    sensor.set_local_parameters(&params).unwrap();

    let results: Vec<Result<Sdr>> = sensor.output_stream().unwrap().collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(SensorError::FormatConflict { ref input, .. }) if input == "2010-07-02 01:00"
    ));
    assert!(results[2].is_ok());
    assert!(sensor.is_terminal());
}

#[test]
fn out_of_range_scalar_fails_only_that_row() {
    let csv = "level\nfloat\nB\n5\n500\n7\n";
    let mut sensor = Sensor::builder()
        .factory(CsvSource::create)
        .params(SensorParams::inline(csv))
        .build()
        .unwrap();
    let params = EncoderParameters::from_json_str(
        r#"{ "fieldEncodings": { "level": { "n": 40, "w": 3, "minVal": 0, "maxVal": 10 } } }"#,
    )
    .unwrap();
    sensor.set_local_parameters(&params).unwrap();

    let results: Vec<Result<Sdr>> = sensor.output_stream().unwrap().collect();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SensorError::OutOfRange { .. })));
    assert!(results[2].is_ok());
}
