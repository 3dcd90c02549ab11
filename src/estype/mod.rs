//! Runtime leaf types referenced by generated code.
//!
//! Every type here decodes every shape the store accepts for its field kind and
//! encodes one canonical shape.
mod aggregate;
mod binary;
mod boolean;
mod date;
mod geopoint;

pub use aggregate::{AggregateMetricDouble, Metric};
pub use binary::Binary;
pub use boolean::{Boolean, BooleanStr};
pub use date::{
    Date, DateLayout, EpochMillis, EpochMillisLayout, EpochSecond, EpochSecondLayout,
    StrictDateOptionalTimeEpochMillis, StrictDateOptionalTimeEpochMillisLayout,
    StrictDateOptionalTimeNanosEpochMillis, StrictDateOptionalTimeNanosEpochMillisLayout,
};
pub use geopoint::GeoPoint;

use serde_json::Value;

use crate::error::ValueShapeError;

fn shape_error<E: serde::de::Error>(raw: &Value, accepted: &[&str], type_name: &str) -> E {
    E::custom(ValueShapeError::new(raw.to_string(), accepted, type_name))
}
