//! Value model and wire protocol for Versio.
//!
//! This crate defines what gets serialized and what it looks like on the
//! wire:
//!
//! - **Values** ([`Value`], [`Mapping`], [`Object`]) and the classifier
//!   ([`Category`]) that decides how each value is encoded.
//! - **Envelopes** ([`Envelope`], [`Shape`]): the tagged wire tree, and the
//!   classifier that reads its shape back.
//! - **Class identity** ([`ClassPath`], [`ClassMeta`], [`Version`],
//!   [`Role`]).
//! - **Wire formats** ([`WireFormat`] trait, [`JsonWire`]): envelope ⇄
//!   bytes.
//! - **Errors** ([`CodecError`]).
//!
//! # Architecture
//!
//! ```text
//! Value ──(codec walk + registries)──▶ Envelope ──(WireFormat)──▶ bytes
//! ```
//!
//! The registry and the recursive walk live in `versio-registry` and
//! `versio`. This crate only knows the shapes on either side.

mod class;
pub mod envelope;
mod error;
mod value;
mod wire;

pub use class::{ClassMeta, ClassPath, Role, Version};
pub use envelope::{Envelope, Shape};
pub use error::{BoxError, CodecError};
pub use value::{Category, Mapping, MappingIntoIter, Object, Opaque, Value};
#[cfg(feature = "json")]
pub use wire::JsonWire;
pub use wire::WireFormat;
