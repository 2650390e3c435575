//! Helpers for testing codecs.
//!
//! - [`assert_round_trip`] runs a value through the whole pipeline and
//!   checks that the same value comes back.
//! - [`CodecCoverage`] collects the classes a test suite has exercised and
//!   reports every registered encoder or decoder class that has no test.

use std::collections::BTreeSet;

use versio_protocol::{CodecError, Envelope, Value};

use crate::Codec;

/// Encodes then decodes `value`.
pub fn round_trip(codec: &Codec, value: &Value) -> Result<(Envelope, Value), CodecError> {
    let envelope = codec.encode(value)?;
    let decoded = codec.decode(&envelope)?;
    Ok((envelope, decoded))
}

/// Asserts that `value` survives an encode/decode round trip, returning
/// the envelope for further checks.
///
/// # Panics
/// If either step fails or the decoded value differs from `value`.
#[track_caller]
pub fn assert_round_trip(codec: &Codec, value: &Value) -> Envelope {
    match round_trip(codec, value) {
        Ok((envelope, decoded)) => {
            assert_eq!(&decoded, value, "round trip changed the value; envelope: {envelope:?}");
            envelope
        }
        Err(err) => panic!("round trip of {value:?} failed: {err}"),
    }
}

// ---------------------------------------------------------------------------
// CodecCoverage
// ---------------------------------------------------------------------------

/// Tracks which classes have encoder and decoder tests.
///
/// ```rust
/// use versio::testing::CodecCoverage;
/// use versio::Codec;
///
/// let coverage = CodecCoverage::new();
/// assert!(coverage.is_complete(&Codec::default()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CodecCoverage {
    encoded: BTreeSet<String>,
    decoded: BTreeSet<String>,
}

impl CodecCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an encoder test for `class_name`.
    pub fn record_encoder_test(&mut self, class_name: impl Into<String>) {
        self.encoded.insert(class_name.into());
    }

    /// Records a decoder test for `class_name`.
    pub fn record_decoder_test(&mut self, class_name: impl Into<String>) {
        self.decoded.insert(class_name.into());
    }

    /// Records both an encoder and a decoder test for every object class
    /// found anywhere inside `value`.
    pub fn record_round_trip(&mut self, value: &Value) {
        match value {
            Value::List(items) | Value::Tuple(items) => {
                for item in items {
                    self.record_round_trip(item);
                }
            }
            Value::Map(map) => {
                for (key, item) in map.iter() {
                    self.record_round_trip(key);
                    self.record_round_trip(item);
                }
            }
            Value::Object(obj) => {
                self.record_encoder_test(obj.class_name());
                self.record_decoder_test(obj.class_name());
            }
            _ => {}
        }
    }

    /// Encoder classes in `codec`'s registries with no recorded test.
    pub fn missing_encoder_tests(&self, codec: &Codec) -> BTreeSet<String> {
        codec
            .registries()
            .iter()
            .flat_map(|registry| registry.encoder_classes())
            .filter(|class| !self.encoded.contains(*class))
            .map(str::to_owned)
            .collect()
    }

    /// Decoder classes in `codec`'s registries with no recorded test.
    pub fn missing_decoder_tests(&self, codec: &Codec) -> BTreeSet<String> {
        codec
            .registries()
            .iter()
            .flat_map(|registry| registry.decoder_classes())
            .filter(|class| !self.decoded.contains(*class))
            .map(str::to_owned)
            .collect()
    }

    /// Returns `true` if every encoder and decoder class has a test.
    pub fn is_complete(&self, codec: &Codec) -> bool {
        self.missing_encoder_tests(codec).is_empty() && self.missing_decoder_tests(codec).is_empty()
    }
}
