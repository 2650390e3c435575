//! Codec registry: per-class, per-version encoder and decoder tables.

use std::collections::BTreeMap;
use std::fmt;

use versio_protocol::{
    BoxError, ClassMeta, ClassPath, CodecError, Object, Opaque, Role, Value, Version,
};

type EncodeFn = Box<dyn Fn(&Object) -> Result<Value, CodecError> + Send + Sync>;
type DecodeFn = Box<dyn Fn(Value) -> Result<Value, CodecError> + Send + Sync>;

/// Label used when a registry is created with [`CodecRegistry::new`].
pub const DEFAULT_LABEL: &str = "default";

// ---------------------------------------------------------------------------
// ClassTable
// ---------------------------------------------------------------------------

/// Every function registered for one class in one role.
struct ClassTable<F> {
    /// Module of the type that registered first. Diagnostics only.
    module: &'static str,
    versions: BTreeMap<Version, F>,
    /// The last fingerprint given together with a new highest version,
    /// and that version.
    fingerprint: Option<(Version, String)>,
}

impl<F> ClassTable<F> {
    fn new(module: &'static str) -> Self {
        Self {
            module,
            versions: BTreeMap::new(),
            fingerprint: None,
        }
    }

    fn highest(&self) -> Option<Version> {
        self.versions.keys().next_back().copied()
    }

    /// Stores `f` under `version`, refusing to overwrite.
    ///
    /// The fingerprint is replaced only when one is given and `version`
    /// beats every version registered so far. A registration without a
    /// fingerprint leaves the stored one alone.
    fn insert(
        &mut self,
        role: Role,
        class_name: &str,
        version: Version,
        fingerprint: Option<&str>,
        f: F,
    ) -> Result<(), CodecError> {
        if self.versions.contains_key(&version) {
            return Err(CodecError::DuplicateVersion {
                role,
                class_name: class_name.to_owned(),
                version,
            });
        }

        let new_highest = self.highest().is_none_or(|highest| version > highest);
        if let (true, Some(fingerprint)) = (new_highest, fingerprint) {
            tracing::debug!(
                class = class_name,
                %role,
                %version,
                fingerprint,
                "fingerprint stored for new highest version"
            );
            self.fingerprint = Some((version, fingerprint.to_owned()));
        }

        self.versions.insert(version, f);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public views
// ---------------------------------------------------------------------------

/// The raw result of [`CodecRegistry::encode`]: class metadata plus the
/// encoder's output, not yet recursively encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassShell {
    pub meta: ClassMeta,
    pub params: Value,
}

/// A stored fingerprint, as seen by out-of-core drift tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintEntry<'a> {
    pub role: Role,
    pub class_name: &'a str,
    pub module: &'static str,
    /// The version the fingerprint was registered with. Later versions
    /// registered without a fingerprint do not move it.
    pub version: Version,
    pub fingerprint: &'a str,
}

// ---------------------------------------------------------------------------
// CodecRegistry
// ---------------------------------------------------------------------------

/// Owns the encoder and decoder tables for a set of classes.
///
/// A registry is filled once at start-up and then only read. Reads take
/// `&self`, so a populated registry can be shared across threads (e.g. in
/// an `Arc`) and used by any number of codecs at once.
///
/// ## Example
///
/// ```rust
/// use versio_protocol::{ClassMeta, Object, Value};
/// use versio_registry::CodecRegistry;
///
/// #[derive(Debug, PartialEq)]
/// struct Point { x: i64, y: i64 }
///
/// let mut registry = CodecRegistry::new();
/// registry
///     .register_encoder(1, None, |p: &Point| Value::List(vec![p.x.into(), p.y.into()]))
///     .unwrap()
///     .register_decoder(1, None, |params: Value| {
///         let xy = params.as_seq().ok_or("expected a sequence")?;
///         match xy {
///             [Value::Int(x), Value::Int(y)] => Ok(Point { x: *x, y: *y }),
///             _ => Err("expected two integers".into()),
///         }
///     })
///     .unwrap();
///
/// let shell = registry.encode(&Object::new(Point { x: 2, y: 3 })).unwrap();
/// assert_eq!(shell.meta, ClassMeta::new("Point", 1));
/// ```
pub struct CodecRegistry {
    label: String,
    encoders: BTreeMap<String, ClassTable<EncodeFn>>,
    decoders: BTreeMap<String, ClassTable<DecodeFn>>,
}

impl CodecRegistry {
    /// Creates an empty registry labelled [`DEFAULT_LABEL`].
    pub fn new() -> Self {
        Self::with_label(DEFAULT_LABEL)
    }

    /// Creates an empty registry with a label for logs and drift reports.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            encoders: BTreeMap::new(),
            decoders: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    // -- Registration --

    /// Registers `encoder` as version `version` of the encoder for `T`.
    ///
    /// The encoder returns the class's params as a primitive, sequence or
    /// mapping. Objects nested inside that value are fine; they are
    /// encoded recursively by the codec.
    ///
    /// An empty `fingerprint` counts as none.
    ///
    /// # Errors
    /// `DuplicateVersion` if `T` already has an encoder for `version`.
    pub fn register_encoder<T, F>(
        &mut self,
        version: impl Into<Version>,
        fingerprint: Option<&str>,
        encoder: F,
    ) -> Result<&mut Self, CodecError>
    where
        T: Opaque,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let version = version.into();
        let path = ClassPath::of::<T>();
        let fingerprint = fingerprint.filter(|f| !f.is_empty());

        let class_name = path.name.clone();
        let wrapped: EncodeFn = Box::new(move |obj: &Object| {
            let value = obj
                .downcast_ref::<T>()
                .ok_or_else(|| CodecError::ClassMismatch {
                    class_name: obj.class_name().to_owned(),
                    expected: std::any::type_name::<T>(),
                    found: obj.type_name(),
                })?;
            match encoder(value) {
                Value::Object(inner) => Err(CodecError::InvalidEncoderOutput {
                    class_name: class_name.clone(),
                    found: inner.type_name(),
                }),
                params => Ok(params),
            }
        });

        self.encoders
            .entry(path.name.clone())
            .or_insert_with(|| ClassTable::new(path.module))
            .insert(Role::Encoder, &path.name, version, fingerprint, wrapped)?;

        tracing::debug!(registry = %self.label, class = %path, %version, "encoder registered");
        Ok(self)
    }

    /// Registers `decoder` as version `version` of the decoder for `T`.
    ///
    /// The decoder receives params that are already fully decoded.
    ///
    /// An empty `fingerprint` counts as none.
    ///
    /// # Errors
    /// `DuplicateVersion` if `T` already has a decoder for `version`.
    pub fn register_decoder<T, F>(
        &mut self,
        version: impl Into<Version>,
        fingerprint: Option<&str>,
        decoder: F,
    ) -> Result<&mut Self, CodecError>
    where
        T: Opaque,
        F: Fn(Value) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let version = version.into();
        let path = ClassPath::of::<T>();
        let fingerprint = fingerprint.filter(|f| !f.is_empty());

        let class_name = path.name.clone();
        let wrapped: DecodeFn = Box::new(move |params: Value| {
            decoder(params)
                .map(Value::object)
                .map_err(|source| CodecError::DecoderFailed {
                    class_name: class_name.clone(),
                    version,
                    source,
                })
        });

        self.decoders
            .entry(path.name.clone())
            .or_insert_with(|| ClassTable::new(path.module))
            .insert(Role::Decoder, &path.name, version, fingerprint, wrapped)?;

        tracing::debug!(registry = %self.label, class = %path, %version, "decoder registered");
        Ok(self)
    }

    // -- Capability checks --

    /// Returns `true` if the object's class has at least one encoder.
    pub fn supports_encoding(&self, obj: &Object) -> bool {
        self.encoders.contains_key(obj.class_name())
    }

    /// Returns `true` if the class named in `meta` has a decoder for that
    /// exact version.
    pub fn supports_decoding(&self, meta: &ClassMeta) -> bool {
        self.decoders
            .get(&meta.class_name)
            .is_some_and(|table| table.versions.contains_key(&meta.version))
    }

    // -- Encode / decode --

    /// Encodes `obj` with the highest registered encoder version.
    ///
    /// The returned params are the encoder's raw output; recursing into
    /// them is the codec's job.
    ///
    /// # Errors
    /// - `MissingCodec` if the class has no encoder.
    /// - `ClassMismatch` if the class name belongs to another type.
    /// - `InvalidEncoderOutput` if the encoder returned an object.
    pub fn encode(&self, obj: &Object) -> Result<ClassShell, CodecError> {
        let missing = || CodecError::MissingCodec {
            role: Role::Encoder,
            class: obj.class_path().clone(),
        };
        let table = self.encoders.get(obj.class_name()).ok_or_else(missing)?;
        let (version, encoder) = table.versions.iter().next_back().ok_or_else(missing)?;

        tracing::trace!(registry = %self.label, class = obj.class_name(), %version, "encoding");
        let params = encoder(obj)?;
        Ok(ClassShell {
            meta: ClassMeta::new(obj.class_name(), *version),
            params,
        })
    }

    /// Decodes already-decoded `params` with the decoder for the exact
    /// version named in `meta`.
    ///
    /// # Errors
    /// - `MissingCodec` if the class has no decoder at all.
    /// - `MissingVersion` if it has decoders, but not for this version.
    /// - `DecoderFailed` if the decoder rejected the params.
    pub fn decode(&self, meta: &ClassMeta, params: Value) -> Result<Value, CodecError> {
        let table = self
            .decoders
            .get(&meta.class_name)
            .ok_or_else(|| CodecError::MissingCodec {
                role: Role::Decoder,
                class: ClassPath::named(meta.class_name.clone()),
            })?;
        let decoder = table
            .versions
            .get(&meta.version)
            .ok_or_else(|| CodecError::MissingVersion {
                class_name: meta.class_name.clone(),
                version: meta.version,
            })?;

        tracing::trace!(
            registry = %self.label,
            class = %meta.class_name,
            version = %meta.version,
            "decoding"
        );
        decoder(params)
    }

    // -- Introspection --

    /// Names of all classes with at least one encoder, sorted.
    pub fn encoder_classes(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    /// Names of all classes with at least one decoder, sorted.
    pub fn decoder_classes(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    /// Registered encoder versions for a class, ascending.
    pub fn encoder_versions(&self, class_name: &str) -> Vec<Version> {
        self.encoders
            .get(class_name)
            .map(|table| table.versions.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Registered decoder versions for a class, ascending.
    pub fn decoder_versions(&self, class_name: &str) -> Vec<Version> {
        self.decoders
            .get(class_name)
            .map(|table| table.versions.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Stored encoder fingerprints, one per class at most.
    pub fn encoder_fingerprints(&self) -> impl Iterator<Item = FingerprintEntry<'_>> {
        fingerprints(Role::Encoder, &self.encoders)
    }

    /// Stored decoder fingerprints, one per class at most.
    pub fn decoder_fingerprints(&self) -> impl Iterator<Item = FingerprintEntry<'_>> {
        fingerprints(Role::Decoder, &self.decoders)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("label", &self.label)
            .field("encoders", &versions_of(&self.encoders))
            .field("decoders", &versions_of(&self.decoders))
            .finish()
    }
}

fn versions_of<F>(tables: &BTreeMap<String, ClassTable<F>>) -> BTreeMap<&str, Vec<Version>> {
    tables
        .iter()
        .map(|(name, table)| (name.as_str(), table.versions.keys().copied().collect()))
        .collect()
}

fn fingerprints<F>(
    role: Role,
    tables: &BTreeMap<String, ClassTable<F>>,
) -> impl Iterator<Item = FingerprintEntry<'_>> {
    tables.iter().filter_map(move |(name, table)| {
        let (version, fingerprint) = table.fingerprint.as_ref()?;
        Some(FingerprintEntry {
            role,
            class_name: name,
            module: table.module,
            version: *version,
            fingerprint,
        })
    })
}
