//! Leaf discriminator → target scalar type.
use serde::Serialize;

use crate::mapping::Kind;

/// A target type that already exists (std, serde_json, or the runtime `estype` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScalarType {
    /// Rust type path as it appears in generated code.
    pub rust: &'static str,
    /// Crate-level paths the type needs in scope.
    pub deps: &'static [&'static str],
    /// JSON value a plain required field falls back to when its wire field is null or undefined.
    pub zero: Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Zero {
    Null,
    False,
    Number,
    String,
    Array,
    Object,
}

impl Zero {
    pub fn to_json(self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Zero::Null => Value::Null,
            Zero::False => Value::Bool(false),
            Zero::Number => Value::from(0),
            Zero::String => Value::String(String::new()),
            Zero::Array => Value::Array(Vec::new()),
            Zero::Object => Value::Object(serde_json::Map::new()),
        }
    }
}

/// Leaves whose type depends on parameters or options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafGenerator {
    Boolean,
    Date { nanos: bool },
    AggregateMetricDouble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Scalar(ScalarType),
    Delegate(LeafGenerator),
    Compound,
}

const JSON: &[&str] = &["serde_json"];
const ESTYPE: &[&str] = &["es_typegen::estype"];
const NONE: &[&str] = &[];

const fn scalar(rust: &'static str, deps: &'static [&'static str], zero: Zero) -> Lookup {
    Lookup::Scalar(ScalarType { rust, deps, zero })
}

const ANY_MAP: Lookup = scalar("serde_json::Map<String, serde_json::Value>", JSON, Zero::Object);
const STRING: Lookup = scalar("String", NONE, Zero::String);

pub fn lookup(kind: Kind) -> Lookup {
    match kind {
        Kind::Object | Kind::Nested => Lookup::Compound,

        Kind::Boolean => Lookup::Delegate(LeafGenerator::Boolean),
        Kind::Date => Lookup::Delegate(LeafGenerator::Date { nanos: false }),
        Kind::DateNanos => Lookup::Delegate(LeafGenerator::Date { nanos: true }),
        Kind::AggregateMetricDouble => Lookup::Delegate(LeafGenerator::AggregateMetricDouble),

        // needs the aliased field's type; left untyped
        Kind::Alias => scalar("serde_json::Value", JSON, Zero::Null),
        Kind::Binary => scalar("estype::Binary", ESTYPE, Zero::String),
        Kind::DenseVector => scalar("Vec<f64>", NONE, Zero::Array),
        Kind::GeoPoint => scalar("estype::GeoPoint", ESTYPE, Zero::Object),
        Kind::GeoShape | Kind::Shape => scalar("serde_json::Value", JSON, Zero::Null),
        Kind::Ip => scalar("std::net::IpAddr", NONE, Zero::String),
        Kind::RankFeature => scalar("f64", NONE, Zero::Number),
        Kind::RankFeatures => scalar("std::collections::BTreeMap<String, f64>", NONE, Zero::Object),
        Kind::TokenCount => scalar("i64", NONE, Zero::Number),

        Kind::Flattened
        | Kind::Histogram
        | Kind::Join
        | Kind::Percolator
        | Kind::Point
        | Kind::IntegerRange
        | Kind::FloatRange
        | Kind::LongRange
        | Kind::DoubleRange
        | Kind::DateRange
        | Kind::IpRange => ANY_MAP,

        Kind::Completion
        | Kind::SearchAsYouType
        | Kind::Version
        | Kind::Keyword
        | Kind::ConstantKeyword
        | Kind::Wildcard
        | Kind::Text => STRING,

        Kind::Long => scalar("i64", NONE, Zero::Number),
        Kind::Integer => scalar("i32", NONE, Zero::Number),
        Kind::Short => scalar("i16", NONE, Zero::Number),
        // -128..=127, not an unsigned byte
        Kind::Byte => scalar("i8", NONE, Zero::Number),
        Kind::Double | Kind::ScaledFloat => scalar("f64", NONE, Zero::Number),
        Kind::Float | Kind::HalfFloat => scalar("f32", NONE, Zero::Number),
        Kind::UnsignedLong => scalar("u64", NONE, Zero::Number),
    }
}
