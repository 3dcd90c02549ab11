use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const ACCEPTED: &[&str] = &["true", "false", "\"true\"", "\"false\"", "\"\""];

fn decode<'de, D: Deserializer<'de>>(d: D, type_name: &str) -> Result<bool, D::Error> {
    let raw = Value::deserialize(d)?;
    match &raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" || s.is_empty() => Ok(false),
        _ => Err(super::shape_error(&raw, ACCEPTED, type_name)),
    }
}

/// Store boolean; encodes as a JSON boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Boolean(pub bool);

/// Store boolean; encodes as `"true"` / `"false"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BooleanStr(pub bool);

macro_rules! boolean_impls {
    ($ty:ident, $name:literal, |$this:ident, $s:ident| $ser:expr) => {
        impl From<bool> for $ty {
            fn from(b: bool) -> Self {
                $ty(b)
            }
        }

        impl From<$ty> for bool {
            fn from(b: $ty) -> Self {
                b.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(if self.0 { "true" } else { "false" })
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let $this = self;
                let $s = serializer;
                $ser
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                decode(d, $name).map($ty)
            }
        }
    };
}

boolean_impls!(Boolean, "Boolean", |this, s| s.serialize_bool(this.0));
boolean_impls!(BooleanStr, "BooleanStr", |this, s| s.serialize_str(&this.to_string()));

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_every_store_shape() {
        for (raw, want) in [(json!(true), true), (json!("true"), true), (json!(false), false), (json!("false"), false), (json!(""), false)] {
            let b: Boolean = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(b.0, want, "{raw}");
            let b: BooleanStr = serde_json::from_value(raw).unwrap();
            assert_eq!(b.0, want);
        }
    }

    #[test]
    fn rejects_other_values() {
        for raw in [json!(1), json!("yes"), json!(null), json!([true])] {
            let err = serde_json::from_value::<Boolean>(raw.clone()).unwrap_err();
            assert!(err.to_string().contains("Boolean"), "{raw}: {err}");
        }
    }

    #[test]
    fn encodes_canonical_form() {
        assert_eq!(serde_json::to_string(&Boolean(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&BooleanStr(false)).unwrap(), "\"false\"");
    }
}
