//! # Versio Std
//!
//! A ready-made [`CodecRegistry`] for standard library types that have no
//! native [`Value`] shape of their own.
//!
//! | Class | Version | Params |
//! |-------|---------|--------|
//! | `Duration` | 1 | `{"secs": int, "nanos": int}` |
//! | `Duration` | 2 | `[secs, nanos]` |
//! | `SystemTime` | 1 | `[secs, nanos]` since the Unix epoch |
//! | `BTreeSet<i64>`, `BTreeSet<String>` | 1 | list of members |
//! | `HashSet<i64, RandomState>`, `HashSet<String, RandomState>` | 1 | sorted list of members |
//! | `IpAddr` | 1 | text, e.g. `"10.0.0.1"` |
//! | `char` | 1 | one-character text |
//!
//! Class names come from the full type, so the hash sets carry their
//! default hasher in the name.
//!
//! Put it first in a codec's chain so application registries can override
//! any of its classes:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use versio::{Codec, Value};
//!
//! let codec = Codec::new([Arc::new(versio_std::standard_registry()?)]);
//! let value = Value::object(Duration::from_millis(1500));
//! let envelope = codec.encode(&value)?;
//! assert_eq!(codec.decode(&envelope)?, value);
//! # Ok::<(), versio::CodecError>(())
//! ```

use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use versio_protocol::{BoxError, CodecError, Mapping, Value};
use versio_registry::CodecRegistry;

/// Label of the registry returned by [`standard_registry`].
pub const STANDARD_LABEL: &str = "standard";

/// Builds the standard registry.
///
/// # Errors
/// Whatever [`register_standard`] returns. A fresh registry has nothing to
/// collide with, so in practice this succeeds.
pub fn standard_registry() -> Result<CodecRegistry, CodecError> {
    let mut registry = CodecRegistry::with_label(STANDARD_LABEL);
    register_standard(&mut registry)?;
    tracing::debug!(
        classes = registry.encoder_classes().count(),
        "standard registry ready"
    );
    Ok(registry)
}

/// Adds the standard codecs to an existing registry.
///
/// # Errors
/// `DuplicateVersion` if `registry` already has a codec for one of the
/// standard classes at the same version.
pub fn register_standard(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    register_duration(registry)?;
    register_system_time(registry)?;
    register_sets(registry)?;
    registry
        .register_encoder(1, None, |ip: &IpAddr| Value::Text(ip.to_string()))?
        .register_decoder(1, None, |params: Value| -> Result<IpAddr, BoxError> {
            Ok(expect_text(&params)?.parse()?)
        })?
        .register_encoder(1, None, |c: &char| Value::Text(c.to_string()))?
        .register_decoder(1, None, decode_char)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

fn register_duration(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    registry
        .register_encoder(1, None, |d: &Duration| {
            let mut params = Mapping::with_capacity(2);
            params.insert("secs", saturating_secs(d.as_secs()));
            params.insert("nanos", d.subsec_nanos());
            Value::Map(params)
        })?
        .register_decoder(1, None, |params: Value| -> Result<Duration, BoxError> {
            let map = params.as_mapping().ok_or("expected a mapping")?;
            let secs = map.get_str("secs").ok_or("missing `secs`")?;
            let nanos = map.get_str("nanos").ok_or("missing `nanos`")?;
            duration_from(secs, nanos)
        })?
        .register_encoder(2, None, |d: &Duration| {
            Value::Tuple(vec![saturating_secs(d.as_secs()).into(), d.subsec_nanos().into()])
        })?
        .register_decoder(2, None, |params: Value| -> Result<Duration, BoxError> {
            let [secs, nanos] = expect_pair(&params)?;
            duration_from(secs, nanos)
        })?;
    Ok(())
}

fn duration_from(secs: &Value, nanos: &Value) -> Result<Duration, BoxError> {
    let secs = u64::try_from(expect_int(secs)?)?;
    let nanos = expect_nanos(nanos)?;
    Ok(Duration::new(secs, nanos))
}

// ---------------------------------------------------------------------------
// SystemTime
// ---------------------------------------------------------------------------

fn register_system_time(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    registry
        .register_encoder(1, None, |t: &SystemTime| {
            let (secs, nanos) = split_epoch(*t);
            Value::Tuple(vec![secs.into(), nanos.into()])
        })?
        .register_decoder(1, None, |params: Value| -> Result<SystemTime, BoxError> {
            let [secs, nanos] = expect_pair(&params)?;
            join_epoch(expect_int(secs)?, expect_nanos(nanos)?)
                .ok_or_else(|| "time is out of range".into())
        })?;
    Ok(())
}

/// Splits a time into whole seconds relative to the epoch, rounded down,
/// and the non-negative nanoseconds past that second.
fn split_epoch(t: SystemTime) -> (i64, u32) {
    match t.duration_since(UNIX_EPOCH) {
        Ok(after) => (saturating_secs(after.as_secs()), after.subsec_nanos()),
        Err(err) => {
            let before = err.duration();
            let secs = saturating_secs(before.as_secs());
            match before.subsec_nanos() {
                0 => (-secs, 0),
                nanos => (-secs - 1, 1_000_000_000 - nanos),
            }
        }
    }
}

fn join_epoch(secs: i64, nanos: u32) -> Option<SystemTime> {
    let whole = Duration::from_secs(secs.unsigned_abs());
    let base = if secs >= 0 {
        UNIX_EPOCH.checked_add(whole)?
    } else {
        UNIX_EPOCH.checked_sub(whole)?
    };
    base.checked_add(Duration::from_nanos(u64::from(nanos)))
}

// ---------------------------------------------------------------------------
// Sets
// ---------------------------------------------------------------------------

fn register_sets(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    registry
        .register_encoder(1, None, |s: &BTreeSet<i64>| {
            Value::List(s.iter().map(|n| Value::Int(*n)).collect())
        })?
        .register_decoder(1, None, |params: Value| -> Result<BTreeSet<i64>, BoxError> {
            expect_seq(&params)?.iter().map(expect_int).collect()
        })?
        .register_encoder(1, None, |s: &BTreeSet<String>| {
            Value::List(s.iter().map(|t| Value::from(t.as_str())).collect())
        })?
        .register_decoder(1, None, |params: Value| -> Result<BTreeSet<String>, BoxError> {
            expect_seq(&params)?
                .iter()
                .map(|item| expect_text(item).map(str::to_owned))
                .collect()
        })?
        .register_encoder(1, None, |s: &HashSet<i64>| {
            let mut members: Vec<_> = s.iter().copied().collect();
            members.sort_unstable();
            Value::List(members.into_iter().map(Value::Int).collect())
        })?
        .register_decoder(1, None, |params: Value| -> Result<HashSet<i64>, BoxError> {
            expect_seq(&params)?.iter().map(expect_int).collect()
        })?
        .register_encoder(1, None, |s: &HashSet<String>| {
            let mut members: Vec<_> = s.iter().map(String::as_str).collect();
            members.sort_unstable();
            Value::List(members.into_iter().map(Value::from).collect())
        })?
        .register_decoder(1, None, |params: Value| -> Result<HashSet<String>, BoxError> {
            expect_seq(&params)?
                .iter()
                .map(|item| expect_text(item).map(str::to_owned))
                .collect()
        })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Param helpers
// ---------------------------------------------------------------------------

fn decode_char(params: Value) -> Result<char, BoxError> {
    let text = expect_text(&params)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected exactly one character, got {text:?}").into()),
    }
}

fn saturating_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn expect_int(value: &Value) -> Result<i64, BoxError> {
    value
        .as_int()
        .ok_or_else(|| format!("expected int, got {}", value.kind()).into())
}

fn expect_nanos(value: &Value) -> Result<u32, BoxError> {
    let nanos = u32::try_from(expect_int(value)?)?;
    if nanos >= 1_000_000_000 {
        return Err(format!("nanos out of range: {nanos}").into());
    }
    Ok(nanos)
}

fn expect_text(value: &Value) -> Result<&str, BoxError> {
    value
        .as_text()
        .ok_or_else(|| format!("expected text, got {}", value.kind()).into())
}

fn expect_seq(value: &Value) -> Result<&[Value], BoxError> {
    value
        .as_seq()
        .ok_or_else(|| format!("expected a sequence, got {}", value.kind()).into())
}

fn expect_pair(value: &Value) -> Result<&[Value; 2], BoxError> {
    let items = expect_seq(value)?;
    items
        .try_into()
        .map_err(|_| format!("expected 2 elements, got {}", items.len()).into())
}
