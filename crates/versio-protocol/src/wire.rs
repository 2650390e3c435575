//! Wire formats: turning envelopes into bytes and back.
//!
//! The codec walk produces an [`Envelope`] tree and stops there. A
//! [`WireFormat`] is the last step, deciding how that tree becomes bytes.
//! [`JsonWire`] is the format shipped by default.

use crate::{CodecError, Envelope};

/// Serializes envelopes to bytes and parses them back.
///
/// `Send + Sync + 'static` so one format value can be shared by every
/// thread that encodes or decodes.
pub trait WireFormat: Send + Sync + 'static {
    /// Serializes an envelope.
    ///
    /// # Errors
    /// Returns `CodecError::Encode` if the envelope cannot be written in
    /// this format.
    fn to_bytes(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError>;

    /// Parses bytes into an envelope.
    ///
    /// # Errors
    /// Returns `CodecError::Decode` if the bytes are not valid in this
    /// format.
    fn from_bytes(&self, data: &[u8]) -> Result<Envelope, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonWire
// ---------------------------------------------------------------------------

/// A [`WireFormat`] that writes JSON via `serde_json`.
///
/// JSON has no byte string type: `Envelope::Bytes` is written as an array
/// of integers and comes back as a list.
///
/// ## Example
///
/// ```rust
/// use versio_protocol::{Envelope, JsonWire, WireFormat};
///
/// let wire = JsonWire::compact();
/// let envelope = Envelope::List(vec![Envelope::Int(1), Envelope::Text("a".into())]);
///
/// let bytes = wire.to_bytes(&envelope).unwrap();
/// assert_eq!(bytes, br#"[1,"a"]"#);
/// assert_eq!(wire.from_bytes(&bytes).unwrap(), envelope);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonWire {
    pretty: bool,
}

#[cfg(feature = "json")]
impl JsonWire {
    /// Single-line JSON. This is the default.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Indented, multi-line JSON, for logs and fixtures.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

#[cfg(feature = "json")]
impl WireFormat for JsonWire {
    fn to_bytes(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        if self.pretty {
            serde_json::to_vec_pretty(envelope).map_err(CodecError::Encode)
        } else {
            serde_json::to_vec(envelope).map_err(CodecError::Encode)
        }
    }

    fn from_bytes(&self, data: &[u8]) -> Result<Envelope, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}
