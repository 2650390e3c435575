//! Class identity: names, versions, and the metadata that travels with every
//! class envelope.
//!
//! On the wire a class is identified by a plain name string plus a version
//! number. In memory we also know the module the type lives in, which is
//! only used for diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::envelope::{CLASS_NAME_FIELD, VERSION_FIELD};
use crate::{CodecError, Envelope};

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// The version of an encoder or decoder.
///
/// A newtype over `u32`: versions are non-negative integers, and the type
/// makes the negative case unrepresentable. Serializes as the plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(pub u32);

impl From<u32> for Version {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which table of a registry an operation refers to.
///
/// Encoders and decoders are registered, versioned and fingerprinted
/// independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Encoder,
    Decoder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder => write!(f, "encoder"),
            Self::Decoder => write!(f, "decoder"),
        }
    }
}

// ---------------------------------------------------------------------------
// ClassPath
// ---------------------------------------------------------------------------

/// The in-memory identity of a Rust type, split into module and short name.
///
/// The short name is what goes on the wire. It is derived from
/// [`std::any::type_name`] by stripping the module path from every path
/// segment while keeping generic arguments, so
/// `alloc::collections::btree::set::BTreeSet<alloc::string::String>`
/// becomes `BTreeSet<String>` in module `alloc::collections::btree::set`.
///
/// Two types with the same short name in different modules share a wire
/// identity. The decoder cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassPath {
    /// Module path of the outer type. Empty when unknown (e.g. a class
    /// name read back from the wire).
    pub module: &'static str,
    /// Short class name, as written into envelope metadata.
    pub name: String,
}

impl ClassPath {
    /// Returns the class path of `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    /// Builds a class path from a name read off the wire. The module is
    /// unknown at that point.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            module: "",
            name: name.into(),
        }
    }

    fn from_type_name(full: &'static str) -> Self {
        Self {
            module: module_of(full),
            name: short_type_name(full),
        }
    }
}

impl fmt::Display for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.module, self.name)
        }
    }
}

fn is_type_delimiter(c: char) -> bool {
    matches!(c, '<' | '>' | ',' | '(' | ')' | '[' | ']' | ';' | '&' | '*' | ' ')
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut start = 0;
    for (i, c) in full.char_indices() {
        if is_type_delimiter(c) {
            out.push_str(last_segment(&full[start..i]));
            out.push(c);
            start = i + c.len_utf8();
        }
    }
    out.push_str(last_segment(&full[start..]));
    out
}

fn module_of(full: &'static str) -> &'static str {
    let outer = full.split('<').next().unwrap_or(full);
    if outer.starts_with(['(', '[', '&', '*']) {
        return "";
    }
    outer.rsplit_once("::").map_or("", |(module, _)| module)
}

// ---------------------------------------------------------------------------
// ClassMeta
// ---------------------------------------------------------------------------

/// The `meta` record of a class envelope: `{"class_name": .., "version": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassMeta {
    pub class_name: String,
    pub version: Version,
}

impl ClassMeta {
    pub fn new(class_name: impl Into<String>, version: impl Into<Version>) -> Self {
        Self {
            class_name: class_name.into(),
            version: version.into(),
        }
    }

    /// Renders the metadata as its wire record.
    pub fn to_envelope(&self) -> Envelope {
        Envelope::record([
            (CLASS_NAME_FIELD, Envelope::Text(self.class_name.clone())),
            (VERSION_FIELD, Envelope::Int(i64::from(self.version.0))),
        ])
    }

    /// Parses a `meta` record.
    ///
    /// # Errors
    /// - `MalformedEnvelope` if the record or one of its fields is missing
    ///   or the class name is not text.
    /// - `InvalidArgument` if the version is not an integer, or is an
    ///   integer outside `0..=u32::MAX`.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, CodecError> {
        let Envelope::Record(fields) = envelope else {
            return Err(CodecError::MalformedEnvelope(format!(
                "class metadata must be a record, not {}",
                envelope.kind()
            )));
        };

        let class_name = match fields.get(CLASS_NAME_FIELD) {
            Some(Envelope::Text(name)) => name.clone(),
            Some(other) => {
                return Err(CodecError::MalformedEnvelope(format!(
                    "class name must be text, not {}",
                    other.kind()
                )));
            }
            None => {
                return Err(CodecError::MalformedEnvelope(
                    "class metadata has no `class_name`".into(),
                ));
            }
        };

        let version = match fields.get(VERSION_FIELD) {
            Some(Envelope::Int(raw)) => u32::try_from(*raw).map(Version).map_err(|_| {
                CodecError::InvalidArgument(format!(
                    "version must be a non-negative integer, not: {raw}"
                ))
            })?,
            Some(other) => {
                return Err(CodecError::InvalidArgument(format!(
                    "invalid version type: {}",
                    other.kind()
                )));
            }
            None => {
                return Err(CodecError::MalformedEnvelope(format!(
                    "class metadata for `{class_name}` has no `version`"
                )));
            }
        };

        Ok(Self {
            class_name,
            version,
        })
    }
}

impl fmt::Display for ClassMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.class_name, self.version)
    }
}
