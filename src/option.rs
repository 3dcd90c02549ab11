//! Per-field generation policy and the global / per-type / per-field cascade.
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::mapping::Kind;

// ————————————————————————————————————————————————————————————————————————————
// TRI-STATE FLAG
// ————————————————————————————————————————————————————————————————————————————

/// A boolean preference that may be left unset so a less specific layer decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum OptFlag {
    #[default]
    Unset,
    True,
    False,
}

impl OptFlag {
    pub fn is_set(self) -> bool {
        self != OptFlag::Unset
    }

    pub fn get(self) -> Option<bool> {
        match self {
            OptFlag::Unset => None,
            OptFlag::True => Some(true),
            OptFlag::False => Some(false),
        }
    }

    /// `other` wins when it is set.
    pub fn overlay(self, other: OptFlag) -> OptFlag {
        if other.is_set() { other } else { self }
    }
}

impl From<bool> for OptFlag {
    fn from(b: bool) -> Self {
        if b { OptFlag::True } else { OptFlag::False }
    }
}

impl<'de> Deserialize<'de> for OptFlag {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(OptFlag::Unset),
            Value::Bool(b) => Ok(b.into()),
            Value::String(s) => match s.as_str() {
                "" => Ok(OptFlag::Unset),
                "true" => Ok(OptFlag::True),
                "false" => Ok(OptFlag::False),
                other => Err(serde::de::Error::custom(format!(
                    "expected true, false, \"true\", \"false\" or \"\", got \"{other}\""
                ))),
            },
            other => Err(serde::de::Error::custom(format!("expected a boolean flag, got {other}"))),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LAYERS
// ————————————————————————————————————————————————————————————————————————————

/// One layer of the cascade. Every attribute may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionLayer {
    /// Plain field is `T` rather than `Option<T>`.
    pub required: OptFlag,
    /// Plain field is `T` rather than `Vec<T>`; wire field collapses one-element arrays.
    pub single: OptFlag,
    /// Booleans marshal as `"true"` / `"false"`.
    pub prefer_string_boolean: OptFlag,
    /// Marshal layout for dates. Empty means unset.
    pub preferred_date_format: String,
    /// Dates marshal as epoch numbers.
    pub prefer_epoch: OptFlag,
}

impl OptionLayer {
    pub fn required(mut self, flag: impl Into<OptFlag>) -> Self {
        self.required = flag.into();
        self
    }

    pub fn single(mut self, flag: impl Into<OptFlag>) -> Self {
        self.single = flag.into();
        self
    }
}

/// Defaults for every field of a given kind.
pub type TypeOption = BTreeMap<Kind, OptionLayer>;

/// Overrides keyed by child field name.
pub type MapOption = BTreeMap<String, FieldOption>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOption {
    #[serde(flatten)]
    pub layer: OptionLayer,
    /// Overrides for the children of an object or nested field.
    pub children: MapOption,
}

impl FieldOption {
    pub fn new(layer: OptionLayer) -> Self {
        FieldOption { layer, children: MapOption::new() }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: FieldOption) -> Self {
        self.children.insert(name.into(), child);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOption {
    #[serde(flatten)]
    pub layer: OptionLayer,
    pub type_option: TypeOption,
}

/// The effective, fully resolved policy of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedOption {
    pub required: bool,
    pub single: bool,
    pub prefer_string_boolean: bool,
    pub preferred_date_format: Option<String>,
    pub prefer_epoch: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// OVERLAY
// ————————————————————————————————————————————————————————————————————————————

/// Most specific set layer wins per attribute: field > type default > global > `false`.
pub fn overlay(global: &OptionLayer, type_default: Option<&OptionLayer>, field: Option<&OptionLayer>) -> ResolvedOption {
    let unset = OptionLayer::default();
    let ty = type_default.unwrap_or(&unset);
    let fo = field.unwrap_or(&unset);

    let flag = |pick: fn(&OptionLayer) -> OptFlag| {
        pick(global).overlay(pick(ty)).overlay(pick(fo)).get().unwrap_or(false)
    };

    let preferred_date_format = [fo, ty, global]
        .iter()
        .map(|layer| layer.preferred_date_format.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_owned);

    ResolvedOption {
        required: flag(|l| l.required),
        single: flag(|l| l.single),
        prefer_string_boolean: flag(|l| l.prefer_string_boolean),
        preferred_date_format,
        prefer_epoch: flag(|l| l.prefer_epoch),
    }
}

impl GlobalOption {
    pub fn resolve(&self, kind: Kind, field: Option<&FieldOption>) -> ResolvedOption {
        let resolved = overlay(&self.layer, self.type_option.get(&kind), field.map(|f| &f.layer));
        tracing::trace!(%kind, ?resolved, "overlay");
        resolved
    }
}

/// Opinionated per-kind defaults: numbers, dates, booleans and binaries are single;
/// objects and nested fields are required lists; geo points and completions are lists.
pub fn opinionated_type_option() -> TypeOption {
    let single = OptionLayer::default().single(true);
    let many = OptionLayer::default().single(false);
    let required_many = OptionLayer::default().required(true).single(false);

    let mut out = TypeOption::new();
    for kind in [
        Kind::AggregateMetricDouble,
        Kind::Binary,
        Kind::Boolean,
        Kind::Date,
        Kind::DateNanos,
        Kind::Long,
        Kind::Integer,
        Kind::Short,
        Kind::Byte,
        Kind::Double,
        Kind::Float,
        Kind::HalfFloat,
        Kind::ScaledFloat,
        Kind::UnsignedLong,
    ] {
        out.insert(kind, single.clone());
    }
    for kind in [Kind::Completion, Kind::GeoPoint, Kind::GeoShape, Kind::Point] {
        out.insert(kind, many.clone());
    }
    for kind in [Kind::Object, Kind::Nested] {
        out.insert(kind, required_many.clone());
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
