//! In-memory values and the classifier that sorts them into categories.
//!
//! A [`Value`] is anything the codec can walk over. The classifier
//! ([`Value::category`]) decides which of four categories a value falls
//! into, and that decision alone drives how it gets encoded:
//!
//! ```text
//! Primitive  → passed through unchanged
//! Sequence   → encoded element by element
//! Mapping    → encoded pair by pair into a tagged record
//! Opaque     → handed to a registered encoder
//! ```

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{Equivalent, IndexMap};

use crate::ClassPath;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The four categories every value falls into, exactly one each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Integer, float, boolean, text, bytes, or null.
    Primitive,
    /// A list or a tuple. Both encode the same way.
    Sequence,
    /// Key/value pairs with arbitrary keys.
    Mapping,
    /// An instance of some Rust type that needs a registered codec.
    Opaque,
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A value the codec can encode or produce when decoding.
///
/// The variants are the native shapes encoders are allowed to return,
/// plus [`Value::Object`] for everything that needs a codec of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Variable-length sequence.
    List(Vec<Value>),
    /// Fixed-length sequence. Unlike a list, usable as a mapping key.
    Tuple(Vec<Value>),
    Map(Mapping),
    Object(Object),
}

impl Value {
    /// Wraps any opaque Rust value.
    pub fn object<T: Opaque>(value: T) -> Self {
        Self::Object(Object::new(value))
    }

    /// Classifies this value.
    ///
    /// Matching on the enum is the exact-type check: an `Object` wrapping a
    /// `String` is still opaque, and a `Text` is never handed to a codec.
    pub fn category(&self) -> Category {
        match self {
            Self::Null
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::Text(_)
            | Self::Bytes(_) => Category::Primitive,
            Self::List(_) | Self::Tuple(_) => Category::Sequence,
            Self::Map(_) => Category::Mapping,
            Self::Object(_) => Category::Opaque,
        }
    }

    /// Short, human-readable name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "mapping",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the elements of a list or a tuple.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Consumes a list or a tuple, returning its elements.
    pub fn into_seq(self) -> Option<Vec<Value>> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Borrows the Rust value inside an [`Value::Object`] as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object().and_then(Object::downcast_ref)
    }

    /// Turns a decoded mapping key into something usable as a key.
    ///
    /// A list is not a valid mapping key, so a list key becomes a tuple
    /// with the same elements. This is the only key normalization.
    pub fn into_key(self) -> Self {
        match self {
            Self::List(items) => Self::Tuple(items),
            other => other,
        }
    }
}

// Variant tags fed to the hasher. `TEXT` is shared with the `&str` lookup
// key used by `Mapping::get_str`.
const NULL: u8 = 0;
const BOOL: u8 = 1;
const INT: u8 = 2;
const FLOAT: u8 = 3;
const TEXT: u8 = 4;
const BYTES: u8 = 5;
const LIST: u8 = 6;
const TUPLE: u8 = 7;
const MAP: u8 = 8;
const OBJECT: u8 = 9;

/// Consistent with `==`: values that compare equal hash the same.
///
/// Floats hash by bit pattern with `-0.0` folded into `0.0`. Mappings hash
/// only their length, since their equality ignores order. Objects hash
/// their class name and leave the rest to equality.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => NULL.hash(state),
            Self::Bool(b) => (BOOL, b).hash(state),
            Self::Int(n) => (INT, n).hash(state),
            Self::Float(f) => {
                let bits = if *f == 0.0 { 0 } else { f.to_bits() };
                (FLOAT, bits).hash(state);
            }
            Self::Text(s) => (TEXT, s.as_str()).hash(state),
            Self::Bytes(b) => (BYTES, b).hash(state),
            Self::List(items) => (LIST, items).hash(state),
            Self::Tuple(items) => (TUPLE, items).hash(state),
            Self::Map(map) => (MAP, map.len()).hash(state),
            Self::Object(obj) => (OBJECT, obj.class_name()).hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Self::Map(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Key/value pairs where keys may be any value, including tuples and
/// objects.
///
/// Pairs keep insertion order, and inserting an equal key replaces the
/// earlier value in place. Two mappings are equal when they hold the same
/// pairs in any order. Lookups go through a hash index.
///
/// A key that is not equal to itself (a `NaN` float, or something
/// containing one) can be inserted but never found again.
#[derive(Clone, Default)]
pub struct Mapping {
    entries: IndexMap<Key, Value>,
}

/// Stored key. `Eq` is only as reflexive as `Value`'s `PartialEq`.
#[derive(Clone, PartialEq)]
struct Key(Value);

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Borrowed lookup key, so `get` does not clone.
#[derive(Hash)]
struct ValueRef<'a>(&'a Value);

impl Equivalent<Key> for ValueRef<'_> {
    fn equivalent(&self, key: &Key) -> bool {
        *self.0 == key.0
    }
}

/// Text lookup key. Hashes exactly like `Value::Text`.
struct TextRef<'a>(&'a str);

impl Hash for TextRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (TEXT, self.0).hash(state);
    }
}

impl Equivalent<Key> for TextRef<'_> {
    fn equivalent(&self, key: &Key) -> bool {
        key.0.as_text() == Some(self.0)
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Inserts a pair, returning the value previously stored under an
    /// equal key.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(Key(key.into()), value.into())
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(&ValueRef(key))
    }

    /// Looks up a text key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.get(&TextRef(key))
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(&ValueRef(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (&k.0, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys().map(|k| &k.0)
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for Mapping {
    type Item = (Value, Value);
    type IntoIter = MappingIntoIter;

    fn into_iter(self) -> Self::IntoIter {
        MappingIntoIter(self.entries.into_iter())
    }
}

/// Owning iterator over the pairs of a [`Mapping`], in insertion order.
pub struct MappingIntoIter(indexmap::map::IntoIter<Key, Value>);

impl Iterator for MappingIntoIter {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.0, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Any Rust value that can sit inside a [`Value::Object`].
///
/// Implemented automatically for every `'static` type that is `Debug`,
/// `PartialEq`, `Send` and `Sync`. Equality is needed so decoded values can
/// be compared against the originals.
pub trait Opaque: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Compares against another opaque value. Values of different types
    /// are never equal.
    fn eq_opaque(&self, other: &dyn Opaque) -> bool;
}

impl<T> Opaque for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_opaque(&self, other: &dyn Opaque) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// A type-erased instance of some class, plus that class's identity.
///
/// Cloning is cheap: the instance itself is shared behind an `Arc`.
#[derive(Clone)]
pub struct Object {
    class: ClassPath,
    type_name: &'static str,
    inner: Arc<dyn Opaque>,
}

impl Object {
    pub fn new<T: Opaque>(value: T) -> Self {
        Self {
            class: ClassPath::of::<T>(),
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Short class name, as written on the wire.
    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Module path of the wrapped type.
    pub fn module(&self) -> &'static str {
        self.class.module
    }

    pub fn class_path(&self) -> &ClassPath {
        &self.class
    }

    /// Full `std::any::type_name` of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let inner: &dyn Opaque = &*self.inner;
        inner.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        let this: &dyn Opaque = &*self.inner;
        this.eq_opaque(&*other.inner)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name)
            .field("value", &self.inner)
            .finish()
    }
}
