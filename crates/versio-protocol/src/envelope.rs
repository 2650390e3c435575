//! The wire representation produced by encoding a value.
//!
//! An [`Envelope`] is a tree of native wire values. Four shapes are
//! meaningful to the codec:
//!
//! ```text
//! Primitive:  <native value>                    // number/bool/text/bytes/null
//! Sequence:   [ <envelope>, <envelope>, ... ]
//! Mapping:    { "tag": "mapping",
//!               "entries": [ {"key": <envelope>, "value": <envelope>}, ... ] }
//! Class:      { "meta": {"class_name": <string>, "version": <integer>},
//!               "params": <envelope> }
//! ```
//!
//! Mappings are never written as native wire objects: their keys may be
//! tuples or objects, which cannot be object keys in JSON and friends.
//! [`Envelope::shape`] tells the four shapes apart on the way back in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ClassMeta, CodecError, Value};

pub const TAG_FIELD: &str = "tag";
pub const MAPPING_TAG: &str = "mapping";
pub const ENTRIES_FIELD: &str = "entries";
pub const KEY_FIELD: &str = "key";
pub const VALUE_FIELD: &str = "value";
pub const META_FIELD: &str = "meta";
pub const PARAMS_FIELD: &str = "params";
pub const CLASS_NAME_FIELD: &str = "class_name";
pub const VERSION_FIELD: &str = "version";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A node of the wire tree.
///
/// `#[serde(untagged)]` maps every variant onto the matching native JSON
/// shape, so an envelope serializes exactly as drawn in the module docs.
/// `Bytes` comes last: a format without a byte string type (JSON) writes
/// it as an array of integers, and reads that array back as a `List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Envelope>),
    /// A string-keyed record. Only ever produced for mapping and class
    /// envelopes.
    Record(BTreeMap<String, Envelope>),
    Bytes(Vec<u8>),
}

impl Envelope {
    /// Builds a record from `(field, value)` pairs.
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, Envelope)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        )
    }

    /// Builds a mapping envelope from already-encoded key/value pairs.
    pub fn mapping(entries: impl IntoIterator<Item = (Envelope, Envelope)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| Self::record([(KEY_FIELD, key), (VALUE_FIELD, value)]))
            .collect();
        Self::record([
            (TAG_FIELD, Self::Text(MAPPING_TAG.to_owned())),
            (ENTRIES_FIELD, Self::List(entries)),
        ])
    }

    /// Builds a class envelope from metadata and already-encoded params.
    pub fn class(meta: &ClassMeta, params: Envelope) -> Self {
        Self::record([(META_FIELD, meta.to_envelope()), (PARAMS_FIELD, params)])
    }

    /// Short, human-readable name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Classifies this envelope by its shape.
    ///
    /// Records are told apart by their discriminator: a `tag` field marks a
    /// mapping, a `meta` field marks a class instance.
    ///
    /// # Errors
    /// - `MalformedEnvelope` for a record with neither discriminator, or a
    ///   mapping/class record missing one of its fields.
    /// - `UnsupportedEnvelopeShape` for a `tag` other than `"mapping"`.
    /// - `InvalidArgument` for a class version that is not a non-negative
    ///   integer.
    pub fn shape(&self) -> Result<Shape<'_>, CodecError> {
        let fields = match self {
            Self::Null => return Ok(Shape::Primitive(Value::Null)),
            Self::Bool(b) => return Ok(Shape::Primitive(Value::Bool(*b))),
            Self::Int(n) => return Ok(Shape::Primitive(Value::Int(*n))),
            Self::Float(f) => return Ok(Shape::Primitive(Value::Float(*f))),
            Self::Text(s) => return Ok(Shape::Primitive(Value::Text(s.clone()))),
            Self::Bytes(b) => return Ok(Shape::Primitive(Value::Bytes(b.clone()))),
            Self::List(items) => return Ok(Shape::Sequence(items)),
            Self::Record(fields) => fields,
        };

        if let Some(tag) = fields.get(TAG_FIELD) {
            return match tag {
                Self::Text(tag) if tag == MAPPING_TAG => {
                    mapping_entries(fields).map(Shape::Mapping)
                }
                other => Err(CodecError::UnsupportedEnvelopeShape(format!(
                    "unknown envelope tag {other:?}"
                ))),
            };
        }

        if let Some(meta) = fields.get(META_FIELD) {
            let meta = ClassMeta::from_envelope(meta)?;
            let params = fields.get(PARAMS_FIELD).ok_or_else(|| {
                CodecError::MalformedEnvelope(format!(
                    "class envelope for `{}` has no `params`",
                    meta.class_name
                ))
            })?;
            return Ok(Shape::Class { meta, params });
        }

        Err(CodecError::MalformedEnvelope(
            "invalid record structure: neither `tag` nor `meta` present".into(),
        ))
    }
}

fn mapping_entries(
    fields: &BTreeMap<String, Envelope>,
) -> Result<Vec<(&Envelope, &Envelope)>, CodecError> {
    let Some(Envelope::List(entries)) = fields.get(ENTRIES_FIELD) else {
        return Err(CodecError::MalformedEnvelope(
            "mapping envelope has no `entries` list".into(),
        ));
    };

    entries
        .iter()
        .map(|entry| {
            let Envelope::Record(pair) = entry else {
                return Err(CodecError::MalformedEnvelope(format!(
                    "mapping entry must be a record, not {}",
                    entry.kind()
                )));
            };
            match (pair.get(KEY_FIELD), pair.get(VALUE_FIELD)) {
                (Some(key), Some(value)) => Ok((key, value)),
                _ => Err(CodecError::MalformedEnvelope(
                    "mapping entry needs both `key` and `value`".into(),
                )),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// The decode-side classification of an [`Envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<'a> {
    /// A native value, returned unchanged.
    Primitive(Value),
    /// A list of element envelopes.
    Sequence(&'a [Envelope]),
    /// The `(key, value)` envelopes of a mapping.
    Mapping(Vec<(&'a Envelope, &'a Envelope)>),
    /// A class instance: parsed metadata and the still-encoded params.
    Class {
        meta: ClassMeta,
        params: &'a Envelope,
    },
}
