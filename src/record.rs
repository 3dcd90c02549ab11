//! Serialization of wire records: one key per declared member, undefined members omitted.
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::field::{Cardinality, Field};
use crate::option::ResolvedOption;

impl From<&ResolvedOption> for Cardinality {
    fn from(resolved: &ResolvedOption) -> Self {
        Cardinality::from_single(resolved.single)
    }
}

/// Writes the members of one wire record into a map.
///
/// ```ignore
/// impl Serialize for ManagerRaw {
///     fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
///         let mut rec = RecordSerializer::begin(s)?;
///         rec.member("age", &self.age, Cardinality::Array)?;
///         rec.member("name", &self.name, Cardinality::Single)?;
///         rec.end()
///     }
/// }
/// ```
pub struct RecordSerializer<S: Serializer> {
    map: S::SerializeMap,
}

impl<S: Serializer> RecordSerializer<S> {
    pub fn begin(serializer: S) -> Result<Self, S::Error> {
        Ok(RecordSerializer { map: serializer.serialize_map(None)? })
    }

    pub fn member<T: Serialize>(&mut self, name: &str, field: &Field<T>, cardinality: Cardinality) -> Result<(), S::Error> {
        if field.is_undefined() {
            return Ok(());
        }
        self.map.serialize_entry(name, &field.annotated(cardinality))
    }

    pub fn end(self) -> Result<S::Ok, S::Error> {
        self.map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct NameRaw {
        first: Field<String>,
        last: Field<String>,
    }

    impl Serialize for NameRaw {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            let mut rec = RecordSerializer::begin(s)?;
            rec.member("first", &self.first, Cardinality::Single)?;
            rec.member("last", &self.last, Cardinality::Single)?;
            rec.end()
        }
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct ManagerRaw {
        age: Field<i32>,
        name: Field<NameRaw>,
    }

    impl Serialize for ManagerRaw {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            let mut rec = RecordSerializer::begin(s)?;
            rec.member("age", &self.age, Cardinality::Array)?;
            rec.member("name", &self.name, Cardinality::Single)?;
            rec.end()
        }
    }

    #[test]
    fn undefined_members_are_omitted_null_is_kept() {
        let raw = ManagerRaw {
            age: Field::null(),
            name: Field::single(NameRaw { first: Field::single("A".into()), last: Field::undefined() }),
        };
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!({ "age": null, "name": { "first": "A" } }));
    }

    #[test]
    fn absent_key_decodes_as_undefined() {
        let raw: ManagerRaw = serde_json::from_value(json!({ "age": [1, 2] })).unwrap();
        assert!(raw.name.is_undefined());
        assert_eq!(raw.age.get_list_or_empty(), vec![1, 2]);
    }

    #[test]
    fn nested_round_trip_is_stable() {
        let wire = json!({ "age": [1], "name": [{ "first": ["x", "y"], "last": null }] });
        let raw: ManagerRaw = serde_json::from_value(wire).unwrap();
        let once = serde_json::to_value(&raw).unwrap();
        assert_eq!(once, json!({ "age": [1], "name": { "first": ["x", "y"], "last": null } }));
        let again: ManagerRaw = serde_json::from_value(once.clone()).unwrap();
        assert_eq!(serde_json::to_value(&again).unwrap(), once);
    }

    #[test]
    fn member_error_aborts_record() {
        struct Broken;
        impl Serialize for Broken {
            fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("broken leaf"))
            }
        }
        struct Holder(Field<Broken>);
        impl Serialize for Holder {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                let mut rec = RecordSerializer::begin(s)?;
                rec.member("x", &self.0, Cardinality::Single)?;
                rec.end()
            }
        }
        let err = serde_json::to_string(&Holder(Field::single(Broken))).unwrap_err();
        assert!(err.to_string().contains("broken leaf"));
    }

    #[test]
    fn cardinality_follows_resolved_single() {
        let single = ResolvedOption { single: true, ..Default::default() };
        assert_eq!(Cardinality::from(&single), Cardinality::Single);
        assert_eq!(Cardinality::from(&ResolvedOption::default()), Cardinality::Array);
    }
}
