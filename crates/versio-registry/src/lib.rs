//! Versioned codec registry for Versio.
//!
//! A [`CodecRegistry`] maps each class to two independent tables, one of
//! encoders and one of decoders, each keyed by [`Version`]:
//!
//! - encoding always uses the **highest** registered encoder version;
//! - decoding uses the **exact** version named in the envelope, with no
//!   fallback;
//! - registering a version twice fails with `DuplicateVersion`.
//!
//! Registries also keep at most one fingerprint per class and role. It is
//! set only by a registration that brings a fingerprint and a new highest
//! version. The [`drift`] module compares those fingerprints
//! against current ones supplied by external tooling.
//!
//! [`Version`]: versio_protocol::Version

pub mod drift;
mod registry;

pub use drift::{DriftConfig, DriftFinding, check_drift};
pub use registry::{ClassShell, CodecRegistry, DEFAULT_LABEL, FingerprintEntry};
