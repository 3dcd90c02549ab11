//! The four-state multiplicity container every wire member is wrapped in.
//!
//! A stored field can be absent, an explicit `null`, a single value, or an
//! array of values. [`Field`] keeps those apart:
//!
//! | state       | representation         | `is_empty` |
//! |-------------|------------------------|------------|
//! | undefined   | `None`                 | yes        |
//! | null        | `Some(None)`           | yes        |
//! | present     | `Some(Some(vec))`      | iff `vec` is empty |
//!
//! Present with one element is "single", with two or more "array".
use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{FieldStateError, ValueShapeError};

/// Whether a one-element value marshals bare or as a one-element array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    #[default]
    Array,
}

impl Cardinality {
    pub fn from_single(single: bool) -> Self {
        if single { Cardinality::Single } else { Cardinality::Array }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Field<T> {
    inner: Option<Option<Vec<T>>>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::undefined()
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => f.write_str("Undefined"),
            Some(None) => f.write_str("Null"),
            Some(Some(v)) => f.debug_tuple("Present").field(v).finish(),
        }
    }
}

impl<T> Field<T> {
    pub const fn undefined() -> Self {
        Field { inner: None }
    }

    pub const fn null() -> Self {
        Field { inner: Some(None) }
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Field { inner: Some(Some(values)) }
    }

    pub fn single(value: T) -> Self {
        Field { inner: Some(Some(vec![value])) }
    }

    pub fn is_undefined(&self) -> bool {
        self.inner.is_none()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.inner, Some(None))
    }

    /// Undefined, null, and present-but-empty are all empty to the store.
    pub fn is_empty(&self) -> bool {
        match &self.inner {
            Some(Some(v)) => v.is_empty(),
            _ => true,
        }
    }

    pub fn set_undefined(&mut self) {
        self.inner = None;
    }

    pub fn set_null(&mut self) {
        self.inner = Some(None);
    }

    pub fn set_single(&mut self, value: T) {
        self.inner = Some(Some(vec![value]));
    }

    /// `None` for undefined and null.
    pub fn as_list(&self) -> Option<&[T]> {
        match &self.inner {
            Some(Some(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn into_option_list(self) -> Option<Vec<T>> {
        self.inner.flatten()
    }

    pub fn get_single_or_nothing(&self) -> Option<&T> {
        self.as_list().and_then(|v| v.first())
    }

    pub fn unwrap_list(&self) -> Result<&[T], FieldStateError> {
        match &self.inner {
            None => Err(FieldStateError::Undefined),
            Some(None) => Err(FieldStateError::Null),
            Some(Some(v)) => Ok(v.as_slice()),
        }
    }

    pub fn unwrap_single(&self) -> Result<&T, FieldStateError> {
        self.unwrap_list()?.first().ok_or(FieldStateError::Empty)
    }

    /// Same state, every element passed through `mapper`.
    pub fn map<U>(&self, mapper: impl FnMut(&T) -> U) -> Field<U> {
        Field { inner: self.inner.as_ref().map(|o| o.as_ref().map(|v| v.iter().map(mapper).collect())) }
    }

    /// Like [`Field::map`], stopping at the first mapper error.
    pub fn try_map<U, E>(&self, mut mapper: impl FnMut(&T) -> Result<U, E>) -> Result<Field<U>, E> {
        Ok(match &self.inner {
            None => Field::undefined(),
            Some(None) => Field::null(),
            Some(Some(v)) => Field::from_vec(v.iter().map(&mut mapper).collect::<Result<_, E>>()?),
        })
    }

    pub fn serialize_with<S: Serializer>(&self, cardinality: Cardinality, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
    {
        match &self.inner {
            None | Some(None) => serializer.serialize_none(),
            Some(Some(v)) if v.len() == 1 && cardinality == Cardinality::Single => v[0].serialize(serializer),
            Some(Some(v)) => v.serialize(serializer),
        }
    }

    /// Borrowed view that serializes under `cardinality`.
    pub fn annotated(&self, cardinality: Cardinality) -> FieldSer<'_, T> {
        FieldSer { field: self, cardinality }
    }
}

impl<T: Clone> Field<T> {
    pub fn from_list(values: &[T]) -> Self {
        Field::from_vec(values.to_vec())
    }

    /// Clones `values`; the caller keeps its list.
    pub fn set_value(&mut self, values: &[T]) {
        self.inner = Some(Some(values.to_vec()));
    }

    /// Total: undefined and null read as an empty list.
    pub fn get_list_or_empty(&self) -> Vec<T> {
        self.as_list().map(<[T]>::to_vec).unwrap_or_default()
    }

    pub fn get_single_or_zero(&self) -> T
    where
        T: Default,
    {
        self.get_single_or_nothing().cloned().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `None` → undefined.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::single(v),
            None => Field::undefined(),
        }
    }
}

impl<T> From<Option<Vec<T>>> for Field<T> {
    /// `None` → undefined.
    fn from(value: Option<Vec<T>>) -> Self {
        match value {
            Some(v) => Field::from_vec(v),
            None => Field::undefined(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERDE
// ————————————————————————————————————————————————————————————————————————————

pub struct FieldSer<'a, T> {
    field: &'a Field<T>,
    cardinality: Cardinality,
}

impl<T: Serialize> Serialize for FieldSer<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.field.serialize_with(self.cardinality, serializer)
    }
}

/// Without an annotation a field always marshals as an array (or `null`).
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.serialize_with(Cardinality::Array, serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Field::from_json(raw).map_err(D::Error::custom)
    }
}

impl<T: DeserializeOwned> Field<T> {
    /// Decode a raw JSON value.
    ///
    /// An array whose elements do not parse as `T` is retried as one `T`, for
    /// leaves that are themselves list-shaped (`[1.0, 2.0]` as one dense vector).
    pub fn from_json(raw: Value) -> Result<Self, ValueShapeError> {
        let accepted = ["null", "T", "array of T"];
        let type_name = std::any::type_name::<T>();
        match raw {
            Value::Null => Ok(Field::null()),
            Value::Array(_) => {
                let as_list = serde_json::from_value::<Vec<T>>(raw.clone());
                match as_list {
                    Ok(v) => Ok(Field::from_vec(v)),
                    Err(list_err) => match serde_json::from_value::<T>(raw.clone()) {
                        Ok(single) => Ok(Field::single(single)),
                        Err(_) => Err(ValueShapeError::new(
                            format!("{raw} ({list_err})"),
                            &accepted,
                            type_name,
                        )),
                    },
                }
            }
            other => match serde_json::from_value::<T>(other.clone()) {
                Ok(single) => Ok(Field::single(single)),
                Err(err) => Err(ValueShapeError::new(format!("{other} ({err})"), &accepted, type_name)),
            },
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marshal<T: Serialize>(f: &Field<T>, c: Cardinality) -> String {
        serde_json::to_string(&f.annotated(c)).unwrap()
    }

    #[test]
    fn state_predicates() {
        let mut f = Field::<i32>::default();
        assert!(f.is_undefined() && !f.is_null() && f.is_empty());

        f.set_null();
        assert!(f.is_null());
        assert!(!f.is_undefined());
        assert!(f.is_empty());

        f.set_value(&[]);
        assert!(f.is_empty());
        assert!(!f.is_null());
        assert!(!f.is_undefined());

        f.set_single(3);
        assert!(!f.is_empty());
        assert_eq!(f.get_single_or_nothing(), Some(&3));
    }

    #[test]
    fn set_value_clones_input() {
        let mut src = vec![1, 2];
        let mut f = Field::undefined();
        f.set_value(&src);
        src.push(3);
        assert_eq!(f.get_list_or_empty(), vec![1, 2]);
    }

    #[test]
    fn total_and_strict_accessors() {
        let undefined = Field::<i32>::undefined();
        let null = Field::<i32>::null();
        let empty = Field::<i32>::from_vec(vec![]);
        let two = Field::from_vec(vec![7, 8]);

        assert_eq!(undefined.get_list_or_empty(), Vec::<i32>::new());
        assert_eq!(null.get_list_or_empty(), Vec::<i32>::new());
        assert_eq!(null.get_single_or_zero(), 0);
        assert_eq!(two.get_single_or_zero(), 7);

        assert_eq!(undefined.unwrap_list(), Err(FieldStateError::Undefined));
        assert_eq!(null.unwrap_single(), Err(FieldStateError::Null));
        assert_eq!(empty.unwrap_list(), Ok(&[][..]));
        assert_eq!(empty.unwrap_single(), Err(FieldStateError::Empty));
        assert_eq!(two.unwrap_single(), Ok(&7));
    }

    #[test]
    fn map_preserves_state() {
        assert!(Field::<i32>::undefined().map(|v| v * 2).is_undefined());
        assert!(Field::<i32>::null().map(|v| v * 2).is_null());
        let empty = Field::<i32>::from_vec(vec![]).map(|v| v * 2);
        assert!(!empty.is_null() && empty.is_empty());
        assert_eq!(Field::from_vec(vec![1, 2]).map(|v| v * 2).get_list_or_empty(), vec![2, 4]);
    }

    #[test]
    fn single_policy_collapses_only_one_element() {
        assert_eq!(marshal(&Field::single(5), Cardinality::Single), "5");
        assert_eq!(marshal(&Field::single(5), Cardinality::Array), "[5]");
        assert_eq!(marshal(&Field::from_vec(vec![1, 2]), Cardinality::Single), "[1,2]");
        assert_eq!(marshal(&Field::<i32>::from_vec(vec![]), Cardinality::Single), "[]");
        assert_eq!(marshal(&Field::<i32>::null(), Cardinality::Single), "null");
    }

    #[test]
    fn decode_each_shape() {
        let f: Field<String> = serde_json::from_value(json!("a")).unwrap();
        assert_eq!(f, Field::single("a".to_string()));
        let f: Field<String> = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(f.get_list_or_empty(), vec!["a", "b"]);
        let f: Field<String> = serde_json::from_value(json!(null)).unwrap();
        assert!(f.is_null());
        let f: Field<String> = serde_json::from_value(json!([])).unwrap();
        assert!(f.is_empty() && !f.is_null());
    }

    #[test]
    fn list_shaped_leaf_falls_back_to_single() {
        let f: Field<Vec<f64>> = serde_json::from_value(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(f.unwrap_list().unwrap(), &[vec![1.0, 2.0, 3.0]]);
        let f: Field<Vec<f64>> = serde_json::from_value(json!([[1.0], [2.0]])).unwrap();
        assert_eq!(f.get_list_or_empty().len(), 2);
    }

    #[test]
    fn decode_failure_names_accepted_shapes() {
        let err = serde_json::from_value::<Field<i32>>(json!(["x"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("array of T"), "{msg}");
        assert!(msg.contains("\"x\""), "{msg}");
    }

    #[test]
    fn round_trip_is_idempotent_for_every_state() {
        let states: Vec<Field<i64>> = vec![
            Field::null(),
            Field::single(1),
            Field::from_vec(vec![]),
            Field::from_vec(vec![1]),
            Field::from_vec(vec![1, 2]),
            Field::from_vec((0..17).collect()),
        ];
        for card in [Cardinality::Single, Cardinality::Array] {
            for state in &states {
                let first = marshal(state, card);
                let back: Field<i64> = serde_json::from_str(&first).unwrap();
                let second = marshal(&back, card);
                assert_eq!(first, second, "{state:?} under {card:?}");
            }
        }
    }
}
