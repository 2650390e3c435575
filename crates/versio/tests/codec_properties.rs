//! Integration tests for the full encode/decode walk.

use std::sync::{Arc, Mutex};

use serde_json::json;
use versio::testing::{CodecCoverage, assert_round_trip};
use versio::{
    BoxError, ClassMeta, Codec, CodecError, CodecRegistry, Envelope, JsonWire, Mapping, Value,
    Version, WireFormat,
};

// =========================================================================
// Fixtures
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Debug, PartialEq)]
struct Segment {
    from: Point,
    to: Point,
}

fn point_registry() -> CodecRegistry {
    let mut registry = CodecRegistry::with_label("geometry");
    registry
        .register_encoder(1, None, |p: &Point| Value::List(vec![p.x.into(), p.y.into()]))
        .unwrap()
        .register_decoder(1, None, |params: Value| -> Result<Point, BoxError> {
            match params.as_seq() {
                Some([Value::Int(x), Value::Int(y)]) => Ok(Point { x: *x, y: *y }),
                _ => Err("expected [x, y]".into()),
            }
        })
        .unwrap();
    registry
}

fn to_json(codec: &Codec, value: &Value) -> serde_json::Value {
    let bytes = codec.encode_to(&JsonWire::compact(), value).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// Round trips
// =========================================================================

#[test]
fn test_primitives_round_trip() {
    let codec = Codec::default();
    for value in [
        Value::Null,
        Value::Bool(false),
        Value::Int(-17),
        Value::Int(i64::MAX),
        Value::Float(2.5),
        Value::from("tekst"),
        Value::from(""),
        Value::Bytes(vec![0, 255]),
    ] {
        assert_round_trip(&codec, &value);
    }
}

#[test]
fn test_nested_sequences_and_mappings_round_trip() {
    let codec = Codec::default();
    let inner: Mapping = [("a", 1), ("b", 2)].into_iter().collect();
    let mut outer = Mapping::new();
    outer.insert("inner", inner);
    outer.insert(Value::Int(7), Value::List(vec![Value::Null, Value::Bool(true)]));
    // Only the top level of a key is turned back into a tuple.
    outer.insert(
        Value::Tuple(vec![Value::from("k"), Value::List(vec![Value::Int(1)])]),
        Value::Map(Mapping::new()),
    );
    assert_round_trip(&codec, &Value::List(vec![Value::Map(outer), Value::List(vec![])]));
}

#[test]
fn test_large_mapping_round_trip() {
    let codec = Codec::default();
    let map: Mapping = (0..40_000i64).map(|i| (i, i)).collect();
    let value = Value::Map(map);
    let decoded = codec.decode(&codec.encode(&value).unwrap()).unwrap();
    assert_eq!(decoded.as_mapping().map(Mapping::len), Some(40_000));
    assert_eq!(decoded, value);
}

#[test]
fn test_round_trip_over_json_wire() {
    let codec = Codec::new([Arc::new(point_registry())]);
    let mut map = Mapping::new();
    map.insert(Value::object(Point { x: 0, y: 1 }), "origin-ish");
    let value = Value::List(vec![Value::Map(map), Value::Float(-0.5)]);

    for wire in [JsonWire::compact(), JsonWire::pretty()] {
        let bytes = codec.encode_to(&wire, &value).unwrap();
        assert_eq!(codec.decode_from(&wire, &bytes).unwrap(), value);
    }
}

#[test]
fn test_bytes_come_back_as_list_over_json() {
    let codec = Codec::default();
    let bytes = codec
        .encode_to(&JsonWire::compact(), &Value::Bytes(vec![1, 2]))
        .unwrap();
    assert_eq!(
        codec.decode_from(&JsonWire::compact(), &bytes).unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
}

// =========================================================================
// Wire shapes
// =========================================================================

#[test]
fn test_tuple_keyed_mapping_wire_shape() {
    let codec = Codec::default();
    let mut map = Mapping::new();
    map.insert(
        Value::Tuple(vec![Value::Int(1), Value::Int(2)]),
        Value::List(vec![Value::Int(3), Value::Int(4)]),
    );
    let value = Value::Map(map);

    assert_eq!(
        to_json(&codec, &value),
        json!({"tag": "mapping", "entries": [{"key": [1, 2], "value": [3, 4]}]})
    );

    let decoded = codec.decode(&codec.encode(&value).unwrap()).unwrap();
    let decoded = decoded.as_mapping().unwrap();
    assert_eq!(decoded.len(), 1);
    let key = decoded.keys().next().unwrap();
    assert_eq!(key, &Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(
        decoded.get(key),
        Some(&Value::List(vec![Value::Int(3), Value::Int(4)]))
    );
}

#[test]
fn test_point_wire_shape() {
    let codec = Codec::new([Arc::new(point_registry())]);
    let point = Value::object(Point { x: 2, y: 3 });

    let bytes = codec.encode_to(&JsonWire::compact(), &point).unwrap();
    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        r#"{"meta":{"class_name":"Point","version":1},"params":[2,3]}"#
    );
    let decoded = codec.decode_from(&JsonWire::compact(), &bytes).unwrap();
    assert_eq!(decoded.downcast_ref::<Point>(), Some(&Point { x: 2, y: 3 }));
}

#[test]
fn test_nested_objects_in_params_are_encoded() {
    let mut registry = point_registry();
    registry
        .register_encoder(1, None, |s: &Segment| {
            Mapping::from_iter([
                ("from", Value::object(s.from.clone())),
                ("to", Value::object(s.to.clone())),
            ])
            .into()
        })
        .unwrap()
        .register_decoder(1, None, |params: Value| -> Result<Segment, BoxError> {
            let map = params.as_mapping().ok_or("expected a mapping")?;
            let point = |name: &str| -> Result<Point, BoxError> {
                map.get_str(name)
                    .and_then(Value::downcast_ref::<Point>)
                    .cloned()
                    .ok_or_else(|| format!("missing `{name}`").into())
            };
            Ok(Segment { from: point("from")?, to: point("to")? })
        })
        .unwrap();
    let codec = Codec::new([Arc::new(registry)]);

    let segment = Value::object(Segment {
        from: Point { x: 0, y: 0 },
        to: Point { x: 5, y: -5 },
    });
    let json = to_json(&codec, &segment);
    assert_eq!(json["meta"], json!({"class_name": "Segment", "version": 1}));
    assert_eq!(json["params"]["tag"], json!("mapping"));
    assert_eq!(
        json["params"]["entries"][1]["value"],
        json!({"meta": {"class_name": "Point", "version": 1}, "params": [5, -5]})
    );
    assert_round_trip(&codec, &segment);
}

// =========================================================================
// Version selection
// =========================================================================

#[test]
fn test_encode_uses_highest_and_decode_uses_exact_version() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CodecRegistry::new();
    for version in [1u32, 4, 8] {
        let seen = Arc::clone(&calls);
        registry
            .register_encoder(version, None, move |p: &Point| {
                Value::List(vec![p.x.into(), p.y.into(), version.into()])
            })
            .unwrap()
            .register_decoder(version, None, move |params: Value| -> Result<Point, BoxError> {
                seen.lock().unwrap().push(version);
                match params.as_seq() {
                    Some([Value::Int(x), Value::Int(y), _]) => Ok(Point { x: *x, y: *y }),
                    _ => Err("expected [x, y, version]".into()),
                }
            })
            .unwrap();
    }
    let codec = Codec::new([Arc::new(registry)]);

    for _ in 0..3 {
        let envelope = codec.encode(&Value::object(Point { x: 1, y: 1 })).unwrap();
        assert_eq!(ClassMeta::from_envelope(&meta_of(&envelope)).unwrap().version, Version(8));
    }

    let v4 = Envelope::class(
        &ClassMeta::new("Point", 4),
        Envelope::List(vec![Envelope::Int(1), Envelope::Int(2), Envelope::Int(4)]),
    );
    let decoded = codec.decode(&v4).unwrap();
    assert_eq!(decoded.downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
    assert_eq!(*calls.lock().unwrap(), vec![4]);
}

fn meta_of(envelope: &Envelope) -> Envelope {
    match envelope {
        Envelope::Record(fields) => fields["meta"].clone(),
        other => panic!("expected a class record, got {other:?}"),
    }
}

#[test]
fn test_unregistered_version_is_unknown_to_the_chain() {
    let codec = Codec::new([Arc::new(point_registry())]);
    let envelope = Envelope::class(&ClassMeta::new("Point", 3), Envelope::List(vec![]));
    let err = codec.decode(&envelope).unwrap_err();
    assert!(matches!(
        &err,
        CodecError::UnknownClassOrVersion { class_name, version: Version(3) }
            if class_name == "Point"
    ));
}

#[test]
fn test_text_version_is_invalid_argument() {
    let codec = Codec::new([Arc::new(point_registry())]);
    let err = codec
        .decode_from(
            &JsonWire::compact(),
            br#"{"meta":{"class_name":"Point","version":"1"},"params":[2,3]}"#,
        )
        .unwrap_err();
    assert!(matches!(err, CodecError::InvalidArgument(_)));
}

// =========================================================================
// Encoder and decoder failures
// =========================================================================

#[test]
fn test_unsupported_type_names_module_and_class() {
    let codec = Codec::new([Arc::new(point_registry())]);
    let err = codec
        .encode(&Value::object(Segment {
            from: Point { x: 0, y: 0 },
            to: Point { x: 0, y: 0 },
        }))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("codec_properties::Segment"), "{message}");
}

#[test]
fn test_encoder_returning_object_is_rejected() {
    #[derive(Debug, PartialEq)]
    struct Wrapper(Point);

    let mut registry = point_registry();
    registry
        .register_encoder(1, None, |w: &Wrapper| Value::object(w.0.clone()))
        .unwrap();
    let codec = Codec::new([Arc::new(registry)]);

    let err = codec
        .encode(&Value::object(Wrapper(Point { x: 1, y: 2 })))
        .unwrap_err();
    assert!(matches!(
        err,
        CodecError::InvalidEncoderOutput { ref class_name, .. } if class_name == "Wrapper"
    ));
}

#[test]
fn test_decoder_error_is_wrapped_with_class_and_version() {
    let codec = Codec::new([Arc::new(point_registry())]);
    let envelope = Envelope::class(&ClassMeta::new("Point", 1), Envelope::Text("2,3".into()));
    let err = codec.decode(&envelope).unwrap_err();
    assert!(matches!(err, CodecError::DecoderFailed { version: Version(1), .. }));
    assert!(err.to_string().contains("expected [x, y]"));
}

#[test]
fn test_same_short_name_in_other_module_is_a_mismatch() {
    mod other {
        #[derive(Debug, PartialEq)]
        pub struct Point;
    }

    let codec = Codec::new([Arc::new(point_registry())]);
    let err = codec.encode(&Value::object(other::Point)).unwrap_err();
    assert!(matches!(
        err,
        CodecError::ClassMismatch { ref class_name, .. } if class_name == "Point"
    ));
}

#[test]
fn test_malformed_json_is_decode_error() {
    let err = JsonWire::compact().from_bytes(b"{not json").unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

// =========================================================================
// Coverage helper
// =========================================================================

#[test]
fn test_coverage_over_the_chain() {
    let mut other = CodecRegistry::with_label("other");
    other
        .register_decoder(1, None, |_: Value| -> Result<Segment, BoxError> {
            Err("never used".into())
        })
        .unwrap();
    let codec = Codec::new([Arc::new(point_registry()), Arc::new(other)]);

    let mut coverage = CodecCoverage::new();
    coverage.record_round_trip(&Value::object(Point { x: 1, y: 1 }));

    assert!(coverage.missing_encoder_tests(&codec).is_empty());
    assert_eq!(
        coverage.missing_decoder_tests(&codec).into_iter().collect::<Vec<_>>(),
        vec!["Segment".to_owned()]
    );
}
