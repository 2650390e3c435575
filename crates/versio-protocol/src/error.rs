//! Error types shared by every Versio crate.
//!
//! Registration, encoding and decoding all fail with [`CodecError`]. Every
//! variant names the class (and version, where one is involved) so a
//! missing or stale registration can be found from the message alone.

use crate::{ClassPath, Role, Version};

/// Boxed error returned by decoder functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while registering codecs or walking a
/// value graph. None of these are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A class version in an envelope that is not an integer, or does not
    /// fit a [`Version`].
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The `(class, version, role)` triple is already taken. Registration
    /// never overwrites.
    #[error("{role} for class `{class_name}` version {version} is already registered")]
    DuplicateVersion {
        role: Role,
        class_name: String,
        version: Version,
    },

    /// No registry in the chain can encode this class.
    #[error("unsupported serialization object type: {class}")]
    UnsupportedType { class: ClassPath },

    /// The envelope is a record with an unrecognized discriminator.
    #[error("unsupported envelope shape: {0}")]
    UnsupportedEnvelopeShape(String),

    /// The envelope is a record without the fields its shape requires.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A registry was asked to encode or decode a class it has no
    /// functions for at all.
    #[error("cannot {verb} object of type `{class}`: missing {role}", verb = role_verb(.role))]
    MissingCodec { role: Role, class: ClassPath },

    /// The class has decoders, but none for this exact version.
    #[error("missing decoder for class `{class_name}` with version {version}")]
    MissingVersion {
        class_name: String,
        version: Version,
    },

    /// No registry in the chain can decode this `(class, version)` pair.
    #[error("cannot restore object of class `{class_name}` version {version}")]
    UnknownClassOrVersion {
        class_name: String,
        version: Version,
    },

    /// An encoder returned something other than a primitive, sequence or
    /// mapping.
    #[error("encoder for class `{class_name}` must return a native value, not {found}")]
    InvalidEncoderOutput {
        class_name: String,
        found: &'static str,
    },

    /// The value's class name matched a registration made for a different
    /// Rust type that happens to share the name.
    #[error("class `{class_name}` is registered for `{expected}`, got `{found}`")]
    ClassMismatch {
        class_name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A decoder rejected the params it was given.
    #[error("decoder for class `{class_name}` version {version} failed: {source}")]
    DecoderFailed {
        class_name: String,
        version: Version,
        #[source]
        source: BoxError,
    },

    /// The wire format failed to serialize an envelope.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The wire format failed to parse bytes into an envelope.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

fn role_verb(role: &Role) -> &'static str {
    match role {
        Role::Encoder => "dump",
        Role::Decoder => "load",
    }
}
