//! In-memory schema tree, parsed from a store mapping document.
//!
//! Only the `type` discriminator, `properties`, and `dynamic` are interpreted
//! here. Every other parameter stays in the opaque [`SchemaNode::params`] bag.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// DISCRIMINATOR
// ————————————————————————————————————————————————————————————————————————————

macro_rules! kinds {
    ($($variant:ident => $name:literal,)*) => {
        /// Field discriminator. One variant per known mapping type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Kind {
            $(#[serde(rename = $name)] $variant,)*
        }

        impl Kind {
            pub const ALL: &'static [Kind] = &[$(Kind::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Kind::$variant => $name,)*
                }
            }

            pub fn parse(name: &str) -> Option<Kind> {
                match name {
                    $($name => Some(Kind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

kinds! {
    AggregateMetricDouble => "aggregate_metric_double",
    Alias => "alias",
    Binary => "binary",
    Boolean => "boolean",
    Completion => "completion",
    Date => "date",
    DateNanos => "date_nanos",
    DenseVector => "dense_vector",
    Flattened => "flattened",
    GeoPoint => "geo_point",
    GeoShape => "geo_shape",
    Histogram => "histogram",
    Ip => "ip",
    Join => "join",
    Nested => "nested",
    Object => "object",
    Percolator => "percolator",
    Point => "point",
    RankFeature => "rank_feature",
    RankFeatures => "rank_features",
    SearchAsYouType => "search_as_you_type",
    Shape => "shape",
    TokenCount => "token_count",
    Version => "version",
    Keyword => "keyword",
    ConstantKeyword => "constant_keyword",
    Wildcard => "wildcard",
    Text => "text",
    Long => "long",
    Integer => "integer",
    Short => "short",
    Byte => "byte",
    Double => "double",
    Float => "float",
    HalfFloat => "half_float",
    ScaledFloat => "scaled_float",
    UnsignedLong => "unsigned_long",
    IntegerRange => "integer_range",
    FloatRange => "float_range",
    LongRange => "long_range",
    DoubleRange => "double_range",
    DateRange => "date_range",
    IpRange => "ip_range",
}

impl Kind {
    pub fn is_compound(self) -> bool {
        matches!(self, Kind::Object | Kind::Nested)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DYNAMIC
// ————————————————————————————————————————————————————————————————————————————

/// The `dynamic` attribute of object and nested fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dynamic {
    /// `true`: unknown keys are accepted and indexed.
    Open,
    /// `false`: unknown keys are kept in the source but ignored.
    Closed,
    /// `"runtime"`: unknown keys become runtime fields.
    Runtime,
    /// `"strict"`: unknown keys reject the document.
    Strict,
}

impl Dynamic {
    pub fn from_value(value: &Value) -> Option<Dynamic> {
        match value {
            Value::Bool(true) => Some(Dynamic::Open),
            Value::Bool(false) => Some(Dynamic::Closed),
            Value::String(s) => match s.as_str() {
                "true" => Some(Dynamic::Open),
                "false" => Some(Dynamic::Closed),
                "runtime" => Some(Dynamic::Runtime),
                "strict" => Some(Dynamic::Strict),
                _ => None,
            },
            _ => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA TREE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: Kind,
    /// Every descriptor key except `type`, `properties` and `dynamic`.
    pub params: Map<String, Value>,
    /// Field names from the document root down to this node.
    pub path: Vec<String>,
    pub body: NodeBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    Leaf,
    Compound {
        /// Explicit `dynamic` on this node; `None` means inherit.
        dynamic: Option<Dynamic>,
        /// Ordered by name so compilation is deterministic.
        properties: BTreeMap<String, SchemaNode>,
    },
}

impl SchemaNode {
    /// Parse one field descriptor found at `path`.
    pub fn from_value(path: Vec<String>, descriptor: &Value) -> Result<SchemaNode, SchemaError> {
        let Value::Object(map) = descriptor else {
            return Err(SchemaError::malformed(&path, "field descriptor must be an object"));
        };

        let kind = match map.get("type") {
            None | Some(Value::Null) => Kind::Object,
            Some(Value::String(s)) if s.is_empty() => Kind::Object,
            Some(Value::String(s)) => Kind::parse(s).ok_or_else(|| SchemaError::UnknownKind {
                kind: s.clone(),
                path: path.join("."),
            })?,
            Some(other) => {
                return Err(SchemaError::malformed(&path, format!("`type` must be a string, got {other}")));
            }
        };

        let params: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "type" | "properties" | "dynamic"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if !kind.is_compound() {
            if map.contains_key("properties") {
                return Err(SchemaError::malformed(&path, format!("`{kind}` field cannot have `properties`")));
            }
            return Ok(SchemaNode { kind, params, path, body: NodeBody::Leaf });
        }

        let dynamic = match map.get("dynamic") {
            None | Some(Value::Null) => None,
            Some(v) => Some(Dynamic::from_value(v).ok_or_else(|| {
                SchemaError::malformed(&path, format!("unsupported `dynamic` value {v}"))
            })?),
        };

        let properties = match map.get("properties") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(props)) => parse_properties(&path, props)?,
            Some(_) => return Err(SchemaError::malformed(&path, "`properties` must be an object")),
        };

        Ok(SchemaNode { kind, params, path, body: NodeBody::Compound { dynamic, properties } })
    }
}

fn parse_properties(
    parent: &[String],
    props: &Map<String, Value>,
) -> Result<BTreeMap<String, SchemaNode>, SchemaError> {
    let mut out = BTreeMap::new();
    for (name, descriptor) in props {
        let mut path = parent.to_vec();
        path.push(name.clone());
        out.insert(name.clone(), SchemaNode::from_value(path, descriptor)?);
    }
    Ok(out)
}

/// `{"properties": {…}}` without a `type`, i.e. a mapping body rather than a field descriptor.
fn holds_properties(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.contains_key("type") && map.get("properties").is_some_and(Value::is_object),
        _ => false,
    }
}

/// Top-level properties of a mapping, plus the index name when the document had one.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub index_name: Option<String>,
    pub properties: BTreeMap<String, SchemaNode>,
}

impl Mapping {
    /// Accepts a bare properties map, `{"properties": …}`, `{"mappings": {"properties": …}}`
    /// or the `GET /<index>/_mapping` response shape `{"<index>": {"mappings": …}}`.
    pub fn from_value(doc: &Value) -> Result<Mapping, SchemaError> {
        let Value::Object(root) = doc else {
            return Err(SchemaError::malformed(&[], "mapping document must be an object"));
        };

        if root.len() == 1 {
            if let Some((key, inner)) = root.iter().next() {
                match (key.as_str(), inner) {
                    ("mappings", mappings) if holds_properties(mappings) => {
                        return Self::from_mappings(None, mappings);
                    }
                    ("properties", Value::Object(props))
                        if !props.contains_key("type") && props.values().all(Value::is_object) =>
                    {
                        return Ok(Mapping { index_name: None, properties: parse_properties(&[], props)? });
                    }
                    (index, Value::Object(wrapper))
                        if !wrapper.contains_key("type") && !wrapper.contains_key("properties") =>
                    {
                        if let Some(mappings) = wrapper.get("mappings").filter(|m| holds_properties(m)) {
                            return Self::from_mappings(Some(index.to_string()), mappings);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(Mapping { index_name: None, properties: parse_properties(&[], root)? })
    }

    pub fn from_json(src: &str) -> Result<Mapping, SchemaError> {
        let doc: Value = serde_json::from_str(src)
            .map_err(|e| SchemaError::malformed(&[], format!("invalid JSON: {e}")))?;
        Self::from_value(&doc)
    }

    fn from_mappings(index_name: Option<String>, mappings: &Value) -> Result<Mapping, SchemaError> {
        match mappings.get("properties") {
            Some(Value::Object(props)) => Ok(Mapping { index_name, properties: parse_properties(&[], props)? }),
            None | Some(Value::Null) => Ok(Mapping { index_name, properties: BTreeMap::new() }),
            Some(_) => Err(SchemaError::malformed(&[], "`mappings.properties` must be an object")),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
