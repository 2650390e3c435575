//! The codec: a recursive walk over a value graph, backed by a chain of
//! registries.
//!
//! Primitives pass through, sequences and mappings recurse element by
//! element, and objects are handed to the first registry in the chain that
//! supports their class. The registry's output is walked again, so an
//! encoder may return values that contain further objects.

use std::sync::Arc;

use versio_protocol::{CodecError, Envelope, Mapping, Object, Shape, Value, WireFormat};
use versio_registry::CodecRegistry;

/// An ordered chain of registries plus the encode/decode walk over them.
///
/// Later registries take precedence: lookups search the chain from the
/// back, so the registry added last wins when two support the same class.
///
/// A codec holds no state of its own beyond the chain. It is cheap to
/// clone and to build per use, and `encode`/`decode` only take `&self`.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use versio::{Codec, CodecRegistry, Mapping, Value};
///
/// let codec = Codec::new([Arc::new(CodecRegistry::new())]);
///
/// let mut map = Mapping::new();
/// map.insert(Value::Tuple(vec![1.into(), 2.into()]), vec![Value::Int(3), Value::Int(4)]);
/// let value = Value::Map(map);
///
/// let envelope = codec.encode(&value).unwrap();
/// assert_eq!(codec.decode(&envelope).unwrap(), value);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Codec {
    registries: Vec<Arc<CodecRegistry>>,
}

impl Codec {
    /// Creates a codec over `registries`, lowest precedence first.
    pub fn new(registries: impl IntoIterator<Item = Arc<CodecRegistry>>) -> Self {
        Self {
            registries: registries.into_iter().collect(),
        }
    }

    /// Appends a registry. It takes precedence over every registry already
    /// in the chain.
    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registries.push(registry);
        self
    }

    /// The registry chain, lowest precedence first.
    pub fn registries(&self) -> &[Arc<CodecRegistry>] {
        &self.registries
    }

    // -- Encoding --

    /// Encodes a value into its envelope.
    ///
    /// # Errors
    /// - `UnsupportedType` if an object's class is not supported by any
    ///   registry in the chain.
    /// - Any error raised by the registry that encodes an object.
    pub fn encode(&self, value: &Value) -> Result<Envelope, CodecError> {
        match value {
            Value::Null => Ok(Envelope::Null),
            Value::Bool(b) => Ok(Envelope::Bool(*b)),
            Value::Int(n) => Ok(Envelope::Int(*n)),
            Value::Float(f) => Ok(Envelope::Float(*f)),
            Value::Text(s) => Ok(Envelope::Text(s.clone())),
            Value::Bytes(b) => Ok(Envelope::Bytes(b.clone())),
            Value::List(items) | Value::Tuple(items) => items
                .iter()
                .map(|item| self.encode(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Envelope::List),
            Value::Map(map) => self.encode_mapping(map),
            Value::Object(obj) => self.encode_object(obj),
        }
    }

    fn encode_mapping(&self, map: &Mapping) -> Result<Envelope, CodecError> {
        let entries = map
            .iter()
            .map(|(key, value)| -> Result<_, CodecError> {
                Ok((self.encode(key)?, self.encode(value)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Envelope::mapping(entries))
    }

    fn encode_object(&self, obj: &Object) -> Result<Envelope, CodecError> {
        let Some(registry) = self
            .registries
            .iter()
            .rev()
            .find(|registry| registry.supports_encoding(obj))
        else {
            tracing::debug!(class = %obj.class_path(), "no registry supports encoding");
            return Err(CodecError::UnsupportedType {
                class: obj.class_path().clone(),
            });
        };

        tracing::trace!(registry = registry.label(), class = obj.class_name(), "delegating encode");
        let shell = registry.encode(obj)?;
        let params = self.encode(&shell.params)?;
        Ok(Envelope::class(&shell.meta, params))
    }

    // -- Decoding --

    /// Decodes an envelope back into a value.
    ///
    /// Sequences come back as lists. Mapping keys that decode to a list
    /// are turned into tuples, since a list cannot be a key.
    ///
    /// # Errors
    /// - `MalformedEnvelope`, `UnsupportedEnvelopeShape` or
    ///   `InvalidArgument` if the envelope's shape cannot be classified.
    /// - `UnknownClassOrVersion` if no registry supports a class envelope's
    ///   exact `(class_name, version)` pair.
    /// - Any error raised by the registry that decodes an object.
    pub fn decode(&self, envelope: &Envelope) -> Result<Value, CodecError> {
        match envelope.shape()? {
            Shape::Primitive(value) => Ok(value),
            Shape::Sequence(items) => items
                .iter()
                .map(|item| self.decode(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Shape::Mapping(entries) => {
                let mut map = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.decode(key)?.into_key();
                    let value = self.decode(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Shape::Class { meta, params } => {
                let Some(registry) = self
                    .registries
                    .iter()
                    .rev()
                    .find(|registry| registry.supports_decoding(&meta))
                else {
                    tracing::debug!(
                        class = %meta.class_name,
                        version = %meta.version,
                        "no registry supports decoding"
                    );
                    return Err(CodecError::UnknownClassOrVersion {
                        class_name: meta.class_name,
                        version: meta.version,
                    });
                };

                tracing::trace!(registry = registry.label(), %meta, "delegating decode");
                let params = self.decode(params)?;
                registry.decode(&meta, params)
            }
        }
    }

    // -- Wire --

    /// Encodes a value and serializes the envelope with `wire`.
    pub fn encode_to<W: WireFormat>(&self, wire: &W, value: &Value) -> Result<Vec<u8>, CodecError> {
        wire.to_bytes(&self.encode(value)?)
    }

    /// Parses bytes with `wire` and decodes the envelope.
    pub fn decode_from<W: WireFormat>(&self, wire: &W, data: &[u8]) -> Result<Value, CodecError> {
        self.decode(&wire.from_bytes(data)?)
    }
}
