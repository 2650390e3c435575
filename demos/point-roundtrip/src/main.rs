use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use versio::prelude::*;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct Waypoint {
    name: String,
    at: Point,
    dwell: Duration,
}

// ---------------------------------------------------------------------------
// Codecs
// ---------------------------------------------------------------------------

/// Point v1 was written as `[x, y]`; v2 switched to named fields.
fn register_point(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    registry
        .register_encoder(1, None, |p: &Point| vec![Value::Int(p.x), Value::Int(p.y)].into())?
        .register_decoder(1, None, |params: Value| -> Result<Point, BoxError> {
            match params.as_seq() {
                Some([Value::Int(x), Value::Int(y)]) => Ok(Point { x: *x, y: *y }),
                _ => Err("expected [x, y]".into()),
            }
        })?
        .register_encoder(2, Some("point-v2"), |p: &Point| {
            Mapping::from_iter([("x", p.x), ("y", p.y)]).into()
        })?
        .register_decoder(2, Some("point-v2"), |params: Value| -> Result<Point, BoxError> {
            let map = params.as_mapping().ok_or("expected a mapping")?;
            let coord = |name: &str| map.get_str(name).and_then(Value::as_int);
            Ok(Point {
                x: coord("x").ok_or("missing `x`")?,
                y: coord("y").ok_or("missing `y`")?,
            })
        })?;
    Ok(())
}

/// The waypoint's params hold a `Point` and a `Duration` as objects; the
/// codec encodes those through their own registries.
fn register_waypoint(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    registry
        .register_encoder(1, None, |w: &Waypoint| {
            Mapping::from_iter([
                ("name", Value::from(w.name.as_str())),
                ("at", Value::object(w.at.clone())),
                ("dwell", Value::object(w.dwell)),
            ])
            .into()
        })?
        .register_decoder(1, None, |params: Value| -> Result<Waypoint, BoxError> {
            let map = params.as_mapping().ok_or("expected a mapping")?;
            let name = map.get_str("name").and_then(Value::as_text).ok_or("missing `name`")?;
            let at = map
                .get_str("at")
                .and_then(Value::downcast_ref::<Point>)
                .ok_or("missing `at`")?;
            let dwell = map
                .get_str("dwell")
                .and_then(Value::downcast_ref::<Duration>)
                .ok_or("missing `dwell`")?;
            Ok(Waypoint {
                name: name.to_owned(),
                at: at.clone(),
                dwell: *dwell,
            })
        })?;
    Ok(())
}

fn build_codec() -> Result<Codec, CodecError> {
    let mut app = CodecRegistry::with_label("app");
    register_point(&mut app)?;
    register_waypoint(&mut app)?;
    Ok(Codec::new([
        Arc::new(versio_std::standard_registry()?),
        Arc::new(app),
    ]))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// A payload written before Point moved to v2.
const LEGACY_POINT: &str = r#"{"meta":{"class_name":"Point","version":1},"params":[2,3]}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let codec = build_codec()?;

    let waypoint = Value::object(Waypoint {
        name: "harbour".into(),
        at: Point { x: 2, y: 3 },
        dwell: Duration::from_secs(90),
    });
    let bytes = codec.encode_to(&JsonWire::pretty(), &waypoint)?;
    println!("{}", String::from_utf8_lossy(&bytes));

    let restored = codec.decode_from(&JsonWire::pretty(), &bytes)?;
    tracing::info!(equal = restored == waypoint, "waypoint round trip");

    let legacy = codec.decode_from(&JsonWire::compact(), LEGACY_POINT.as_bytes())?;
    tracing::info!(point = ?legacy.downcast_ref::<Point>(), "decoded legacy v1 payload");

    Ok(())
}
