//! Integration tests for registration, lookup and drift reporting.

use versio_protocol::{BoxError, ClassMeta, CodecError, Object, Role, Value, Version};
use versio_registry::{CodecRegistry, DriftConfig, check_drift};

#[derive(Debug, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Debug, PartialEq)]
struct Unregistered;

fn encode_point(p: &Point) -> Value {
    Value::List(vec![p.x.into(), p.y.into()])
}

fn decode_point(params: Value) -> Result<Point, BoxError> {
    match params.as_seq() {
        Some([Value::Int(x), Value::Int(y)]) => Ok(Point { x: *x, y: *y }),
        _ => Err("expected [x, y]".into()),
    }
}

// =========================================================================
// Registration
// =========================================================================

#[test]
fn test_duplicate_version_is_rejected_per_registry() {
    let mut first = CodecRegistry::with_label("first");
    first.register_encoder(1, None, encode_point).unwrap();
    let err = first.register_encoder(1, None, encode_point).unwrap_err();
    assert!(matches!(
        err,
        CodecError::DuplicateVersion { role: Role::Encoder, ref class_name, version: Version(1) }
            if class_name == "Point"
    ));

    let mut second = CodecRegistry::with_label("second");
    second.register_encoder(1, None, encode_point).unwrap();
    assert_eq!(second.encoder_versions("Point"), vec![Version(1)]);
}

#[test]
fn test_encoder_and_decoder_tables_are_independent() {
    let mut registry = CodecRegistry::new();
    registry
        .register_encoder(1, None, encode_point)
        .unwrap()
        .register_decoder(1, None, decode_point)
        .unwrap();
    assert_eq!(registry.encoder_versions("Point"), registry.decoder_versions("Point"));
    assert!(registry.decoder_versions("Missing").is_empty());
}

#[test]
fn test_fingerprint_tracks_highest_version() {
    let mut registry = CodecRegistry::new();
    registry
        .register_encoder(1, Some("F1"), encode_point)
        .unwrap()
        .register_encoder(4, Some("F4"), encode_point)
        .unwrap()
        .register_encoder(2, Some("F2"), encode_point)
        .unwrap();

    let stored: Vec<_> = registry
        .encoder_fingerprints()
        .map(|entry| (entry.class_name.to_owned(), entry.version, entry.fingerprint.to_owned()))
        .collect();
    assert_eq!(stored, vec![("Point".to_owned(), Version(4), "F4".to_owned())]);
    assert_eq!(registry.decoder_fingerprints().count(), 0);
}

#[test]
fn test_later_version_without_fingerprint_keeps_stored_one() {
    let mut registry = CodecRegistry::new();
    registry
        .register_encoder(1, Some("F1"), encode_point)
        .unwrap()
        .register_encoder(2, None, encode_point)
        .unwrap();

    let stored: Vec<_> = registry
        .encoder_fingerprints()
        .map(|entry| (entry.version, entry.fingerprint.to_owned()))
        .collect();
    assert_eq!(stored, vec![(Version(1), "F1".to_owned())]);
}

#[test]
fn test_empty_fingerprint_is_accepted_as_absent() {
    let mut registry = CodecRegistry::new();
    registry
        .register_decoder(1, Some(""), decode_point)
        .unwrap();
    assert!(registry.supports_decoding(&ClassMeta::new("Point", 1)));
    assert_eq!(registry.decoder_fingerprints().count(), 0);
}

// =========================================================================
// Lookup
// =========================================================================

#[test]
fn test_encode_missing_class_names_module_and_class() {
    let registry = CodecRegistry::new();
    let obj = Object::new(Unregistered);
    assert!(!registry.supports_encoding(&obj));

    let err = registry.encode(&obj).unwrap_err();
    match &err {
        CodecError::MissingCodec { role, class } => {
            assert_eq!(*role, Role::Encoder);
            assert_eq!(class.name, "Unregistered");
            assert_eq!(class.module, "registry_behaviour");
        }
        other => panic!("expected MissingCodec, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "cannot dump object of type `registry_behaviour::Unregistered`: missing encoder"
    );
}

#[test]
fn test_decode_unregistered_version_names_class_and_version() {
    let mut registry = CodecRegistry::new();
    registry.register_decoder(1, None, decode_point).unwrap();

    let meta = ClassMeta::new("Point", 2);
    assert!(!registry.supports_decoding(&meta));
    let err = registry.decode(&meta, Value::Null).unwrap_err();
    assert!(matches!(
        &err,
        CodecError::MissingVersion { class_name, version: Version(2) } if class_name == "Point"
    ));
}

#[test]
fn test_decode_unknown_class_is_missing_decoder() {
    let registry = CodecRegistry::new();
    let err = registry
        .decode(&ClassMeta::new("Ghost", 1), Value::Null)
        .unwrap_err();
    assert!(matches!(err, CodecError::MissingCodec { role: Role::Decoder, .. }));
}

#[test]
fn test_encode_then_decode_through_registry() {
    let mut registry = CodecRegistry::new();
    registry
        .register_encoder(1, None, encode_point)
        .unwrap()
        .register_decoder(1, None, decode_point)
        .unwrap();

    let shell = registry.encode(&Object::new(Point { x: 2, y: 3 })).unwrap();
    assert_eq!(shell.meta, ClassMeta::new("Point", 1));
    assert!(registry.supports_decoding(&shell.meta));

    let decoded = registry.decode(&shell.meta, shell.params).unwrap();
    assert_eq!(decoded.downcast_ref::<Point>(), Some(&Point { x: 2, y: 3 }));
}

// =========================================================================
// Drift
// =========================================================================

fn fingerprinted() -> CodecRegistry {
    let mut registry = CodecRegistry::with_label("app");
    registry
        .register_encoder(1, Some("enc-1"), encode_point)
        .unwrap()
        .register_decoder(1, Some("dec-1"), decode_point)
        .unwrap();
    registry
}

#[test]
fn test_no_drift_when_fingerprints_match() {
    let registry = fingerprinted();
    let findings = check_drift([&registry], &DriftConfig::default(), |entry| {
        Some(entry.fingerprint.to_owned())
    });
    assert!(findings.is_empty());
}

#[test]
fn test_drift_reports_changed_encoder_first() {
    let registry = fingerprinted();
    let findings = check_drift([&registry], &DriftConfig::default(), |_| {
        Some("changed".to_owned())
    });
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].role, Role::Encoder);
    assert_eq!(findings[0].stored, "enc-1");
    assert_eq!(findings[0].current.as_deref(), Some("changed"));
    assert_eq!(findings[0].registry, "app");
    assert_eq!(findings[1].role, Role::Decoder);
}

#[test]
fn test_missing_current_fingerprint_respects_config() {
    let registry = fingerprinted();

    let strict = DriftConfig::default();
    assert_eq!(check_drift([&registry], &strict, |_| None).len(), 2);

    let lenient = DriftConfig {
        require_current: false,
        ..DriftConfig::default()
    };
    assert!(check_drift([&registry], &lenient, |_| None).is_empty());
}

#[test]
fn test_skipped_modules_are_not_checked() {
    let registry = fingerprinted();
    let config = DriftConfig {
        skip_modules: vec!["registry_behaviour".to_owned()],
        ..DriftConfig::default()
    };
    assert!(check_drift([&registry], &config, |_| None).is_empty());
}
