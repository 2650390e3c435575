//! # Versio
//!
//! Versioned, explicit object serialization.
//!
//! Instead of introspecting arbitrary objects, Versio asks for an explicit
//! encoder and decoder per class and version. Every encoded object carries
//! its class name and the version it was written with, so payloads written
//! by older code keep decoding after the type has changed shape.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use versio::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Point { x: i64, y: i64 }
//!
//! let mut registry = CodecRegistry::new();
//! registry
//!     .register_encoder(1, None, |p: &Point| Value::List(vec![p.x.into(), p.y.into()]))?
//!     .register_decoder(1, None, |params: Value| -> Result<Point, BoxError> {
//!         match params.as_seq() {
//!             Some([Value::Int(x), Value::Int(y)]) => Ok(Point { x: *x, y: *y }),
//!             _ => Err("expected [x, y]".into()),
//!         }
//!     })?;
//!
//! let codec = Codec::new([Arc::new(registry)]);
//! let bytes = codec.encode_to(&JsonWire::compact(), &Value::object(Point { x: 2, y: 3 }))?;
//! assert_eq!(
//!     String::from_utf8(bytes.clone()).unwrap(),
//!     r#"{"meta":{"class_name":"Point","version":1},"params":[2,3]}"#
//! );
//!
//! let back = codec.decode_from(&JsonWire::compact(), &bytes)?;
//! assert_eq!(back.downcast_ref::<Point>(), Some(&Point { x: 2, y: 3 }));
//! # Ok::<(), CodecError>(())
//! ```
//!
//! ## Crates
//!
//! - `versio-protocol`: values, envelopes, wire formats, errors
//! - `versio-registry`: versioned codec tables and drift checks
//! - `versio` (this crate): the [`Codec`] walk and test helpers

mod codec;
pub mod testing;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use versio_protocol::JsonWire;
pub use versio_protocol::{
    BoxError, Category, ClassMeta, ClassPath, CodecError, Envelope, Mapping, Object, Opaque,
    Role, Shape, Value, Version, WireFormat,
};
pub use versio_registry::{
    ClassShell, CodecRegistry, DriftConfig, DriftFinding, FingerprintEntry, check_drift,
};

/// Everything needed to register codecs and run them.
pub mod prelude {
    #[cfg(feature = "json")]
    pub use crate::JsonWire;
    pub use crate::{BoxError, Codec, CodecError, CodecRegistry, Mapping, Value, WireFormat};
}
