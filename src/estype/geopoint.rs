//! Geo points in any of the store's input shapes; always encoded as `{"lat": …, "lon": …}`.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const ACCEPTED: &[&str] = &[
    "{\"lat\": n, \"lon\": n}",
    "{\"type\": \"Point\", \"coordinates\": [lon, lat]}",
    "[lon, lat]",
    "\"lat,lon\"",
    "\"POINT(lon lat)\"",
    "geohash string",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    pub fn from_value(raw: &Value) -> Option<GeoPoint> {
        match raw {
            Value::Array(items) => lon_lat(items),
            Value::String(text) => Self::from_text(text),
            Value::Object(map) => {
                if map.contains_key("type") {
                    if map.get("type")?.as_str()? != "Point" {
                        return None;
                    }
                    return lon_lat(map.get("coordinates")?.as_array()?);
                }
                Some(GeoPoint { lat: map.get("lat")?.as_f64()?, lon: map.get("lon")?.as_f64()? })
            }
            _ => None,
        }
    }

    /// `POINT(lon lat)`, `lat,lon`, or a geohash.
    pub fn from_text(text: &str) -> Option<GeoPoint> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix("POINT") {
            let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?;
            let mut coords = inner.split_whitespace().map(str::parse::<f64>);
            let lon = coords.next()?.ok()?;
            let lat = coords.next()?.ok()?;
            return Some(GeoPoint { lat, lon });
        }
        if let Some((lat, lon)) = text.split_once(',') {
            return Some(GeoPoint { lat: lat.trim().parse().ok()?, lon: lon.trim().parse().ok()? });
        }
        decode_geohash(text)
    }
}

fn lon_lat(items: &[Value]) -> Option<GeoPoint> {
    match items {
        [lon, lat, ..] => Some(GeoPoint { lat: lat.as_f64()?, lon: lon.as_f64()? }),
        _ => None,
    }
}

const GEOHASH_ALPHABET: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Center of the geohash cell.
fn decode_geohash(hash: &str) -> Option<GeoPoint> {
    if hash.is_empty() || hash.len() > 12 {
        return None;
    }
    let (mut lat, mut lon) = ((-90.0f64, 90.0f64), (-180.0f64, 180.0f64));
    let mut even = true;
    for c in hash.bytes() {
        let bits = GEOHASH_ALPHABET.iter().position(|&a| a == c.to_ascii_lowercase())?;
        for shift in (0..5).rev() {
            let bit = (bits >> shift) & 1 == 1;
            let range = if even { &mut lon } else { &mut lat };
            let mid = (range.0 + range.1) / 2.0;
            if bit {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even = !even;
        }
    }
    Some(GeoPoint { lat: (lat.0 + lat.1) / 2.0, lon: (lon.0 + lon.1) / 2.0 })
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(d)?;
        GeoPoint::from_value(&raw).ok_or_else(|| super::shape_error(&raw, ACCEPTED, "GeoPoint"))
    }
}
