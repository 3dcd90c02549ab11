//! Schema-driven codec over a compiled [`Forest`].
//!
//! Moves documents between plain JSON, an in-memory wire record of
//! [`Field`]s, and wire JSON, using nothing but the forest. Generated code does
//! the same per record at compile time; this is the runtime equivalent used by
//! tooling and by the round-trip tests.
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::compiler::{ElemType, Forest, Member, PlainForm, TypeBody, TypeDefinition};
use crate::error::{CodecError, ValueShapeError};
use crate::field::{Cardinality, Field};
use crate::mapping::Kind;
use crate::record::RecordSerializer;

#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Leaf(Value),
    Record(WireRecord),
}

/// Wire members by key. Absent keys are undefined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireRecord {
    pub members: BTreeMap<String, Field<WireValue>>,
}

impl WireRecord {
    pub fn get(&self, name: &str) -> Option<&Field<WireValue>> {
        self.members.get(name)
    }
}

pub struct Codec<'f> {
    forest: &'f Forest,
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() { name.to_string() } else { format!("{path}.{name}") }
}

fn shape(path: &str, raw: &Value, accepted: &[&str], type_name: &str) -> CodecError {
    CodecError::Shape { path: path.to_string(), source: ValueShapeError::new(raw.to_string(), accepted, type_name) }
}

impl<'f> Codec<'f> {
    pub fn new(forest: &'f Forest) -> Self {
        Codec { forest }
    }

    fn def(&self, name: &str) -> Result<&'f TypeDefinition, CodecError> {
        self.forest.get(name).ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }

    // ————————————————————————————————————————————————————————————————————————
    // WIRE JSON ⇄ WIRE RECORD
    // ————————————————————————————————————————————————————————————————————————

    /// Wire JSON → wire record of the type named `type_name`.
    pub fn decode(&self, type_name: &str, wire: &Value) -> Result<WireRecord, CodecError> {
        self.decode_at(type_name, wire, "")
    }

    fn decode_at(&self, type_name: &str, wire: &Value, path: &str) -> Result<WireRecord, CodecError> {
        let def = self.def(type_name)?;
        let Value::Object(obj) = wire else {
            return Err(shape(path, wire, &["object"], &def.wire_name));
        };

        let mut out = WireRecord::default();
        match &def.body {
            TypeBody::OpenMap => {
                for (key, raw) in obj {
                    let field = Field::<Value>::from_json(raw.clone())
                        .map_err(|source| CodecError::Shape { path: join(path, key), source })?;
                    out.members.insert(key.clone(), field.map(|v| WireValue::Leaf(v.clone())));
                }
            }
            TypeBody::Record { members } => {
                for member in members {
                    let Some(raw) = obj.get(&member.name) else { continue };
                    let member_path = join(path, &member.name);
                    let field = self.decode_member(member, raw, &member_path)?;
                    out.members.insert(member.name.clone(), field);
                }
            }
            _ => return Err(CodecError::UnknownType(type_name.to_string())),
        }
        Ok(out)
    }

    fn decode_member(&self, member: &Member, raw: &Value, path: &str) -> Result<Field<WireValue>, CodecError> {
        // a dense vector is itself an array of numbers
        if member.kind == Kind::DenseVector {
            if let Value::Array(items) = raw {
                if items.iter().all(Value::is_number) {
                    return Ok(Field::single(WireValue::Leaf(raw.clone())));
                }
            }
        }
        let field = Field::<Value>::from_json(raw.clone()).map_err(|source| CodecError::Shape { path: path.to_string(), source })?;
        field.try_map(|v| match &member.elem {
            ElemType::Compound { plain, .. } => self.decode_at(plain, v, path).map(WireValue::Record),
            _ => Ok(WireValue::Leaf(v.clone())),
        })
    }

    /// Wire record → wire JSON. Undefined members are omitted.
    pub fn encode(&self, type_name: &str, record: &WireRecord) -> Result<Value, CodecError> {
        let def = self.def(type_name)?;
        let mut rec = RecordSerializer::begin(serde_json::value::Serializer)?;
        match &def.body {
            TypeBody::OpenMap => {
                for (key, field) in &record.members {
                    let values = field.try_map(|v| self.encode_value(None, v))?;
                    rec.member(key, &values, Cardinality::Single)?;
                }
            }
            TypeBody::Record { members } => {
                for member in members {
                    let Some(field) = record.get(&member.name) else { continue };
                    let child = match &member.elem {
                        ElemType::Compound { plain, .. } => Some(plain.as_str()),
                        _ => None,
                    };
                    let values = field.try_map(|v| self.encode_value(child, v))?;
                    rec.member(&member.name, &values, member.cardinality)?;
                }
            }
            _ => return Err(CodecError::UnknownType(type_name.to_string())),
        }
        Ok(rec.end()?)
    }

    fn encode_value(&self, child: Option<&str>, value: &WireValue) -> Result<Value, CodecError> {
        match (child, value) {
            (Some(name), WireValue::Record(rec)) => self.encode(name, rec),
            (_, WireValue::Leaf(v)) => Ok(v.clone()),
            (None, WireValue::Record(rec)) => {
                Err(shape("", &Value::from(rec.members.len()), &["leaf value"], "wire record"))
            }
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // WIRE RECORD ⇄ PLAIN JSON
    // ————————————————————————————————————————————————————————————————————————

    /// Wire record → plain JSON, applying each member's plain form.
    pub fn to_plain(&self, type_name: &str, record: &WireRecord) -> Result<Value, CodecError> {
        let def = self.def(type_name)?;
        let mut out = Map::new();
        match &def.body {
            TypeBody::OpenMap => {
                for (key, field) in &record.members {
                    let values = field.try_map(|v| self.plain_value(None, v))?;
                    out.insert(key.clone(), Value::Array(values.get_list_or_empty()));
                }
            }
            TypeBody::Record { members } => {
                let undefined = Field::undefined();
                for member in members {
                    let field = record.get(&member.name).unwrap_or(&undefined);
                    let child = match &member.elem {
                        ElemType::Compound { plain, .. } => Some(plain.as_str()),
                        _ => None,
                    };
                    let values = field.try_map(|v| self.plain_value(child, v))?;
                    let plain = match member.form {
                        PlainForm::Value => match values.get_single_or_nothing() {
                            Some(v) => v.clone(),
                            None => self.zero(member)?,
                        },
                        PlainForm::List => Value::Array(values.get_list_or_empty()),
                        PlainForm::OptionalValue => values.get_single_or_nothing().cloned().unwrap_or(Value::Null),
                        PlainForm::OptionalList => values.into_option_list().map(Value::Array).unwrap_or(Value::Null),
                    };
                    out.insert(member.name.clone(), plain);
                }
            }
            _ => return Err(CodecError::UnknownType(type_name.to_string())),
        }
        Ok(Value::Object(out))
    }

    fn plain_value(&self, child: Option<&str>, value: &WireValue) -> Result<Value, CodecError> {
        match (child, value) {
            (Some(name), WireValue::Record(rec)) => self.to_plain(name, rec),
            (_, WireValue::Leaf(v)) => Ok(v.clone()),
            (None, WireValue::Record(rec)) => {
                Err(shape("", &Value::from(rec.members.len()), &["leaf value"], "wire record"))
            }
        }
    }

    /// Plain value of a required single member whose wire field holds nothing.
    fn zero(&self, member: &Member) -> Result<Value, CodecError> {
        match &member.elem {
            ElemType::Scalar { zero, .. } | ElemType::Leaf { zero, .. } => Ok(zero.clone()),
            ElemType::Compound { plain, .. } => self.to_plain(plain, &WireRecord::default()),
        }
    }

    /// Plain JSON → wire record.
    pub fn to_wire(&self, type_name: &str, plain: &Value) -> Result<WireRecord, CodecError> {
        self.to_wire_at(type_name, plain, "")
    }

    fn to_wire_at(&self, type_name: &str, plain: &Value, path: &str) -> Result<WireRecord, CodecError> {
        let def = self.def(type_name)?;
        let Value::Object(obj) = plain else {
            return Err(shape(path, plain, &["object"], &def.name));
        };

        let mut out = WireRecord::default();
        match &def.body {
            TypeBody::OpenMap => {
                for (key, raw) in obj {
                    let field = match raw {
                        Value::Array(items) => Field::from_vec(items.iter().cloned().map(WireValue::Leaf).collect()),
                        other => Field::single(WireValue::Leaf(other.clone())),
                    };
                    out.members.insert(key.clone(), field);
                }
            }
            TypeBody::Record { members } => {
                for member in members {
                    let member_path = join(path, &member.name);
                    let raw = obj.get(&member.name).unwrap_or(&Value::Null);
                    let field = self.wire_member(member, raw, &member_path)?;
                    if !field.is_undefined() {
                        out.members.insert(member.name.clone(), field);
                    }
                }
            }
            _ => return Err(CodecError::UnknownType(type_name.to_string())),
        }
        Ok(out)
    }

    fn wire_member(&self, member: &Member, raw: &Value, path: &str) -> Result<Field<WireValue>, CodecError> {
        let convert = |v: &Value| -> Result<WireValue, CodecError> {
            match &member.elem {
                ElemType::Compound { plain, .. } => self.to_wire_at(plain, v, path).map(WireValue::Record),
                _ => Ok(WireValue::Leaf(v.clone())),
            }
        };
        let plain_type = member.plain_type();

        match (member.form, raw) {
            (PlainForm::OptionalValue | PlainForm::OptionalList, Value::Null) => Ok(Field::undefined()),
            (PlainForm::Value, Value::Null) => {
                Err(shape(path, raw, &["present value"], &plain_type))
            }
            (PlainForm::Value | PlainForm::OptionalValue, v) => Ok(Field::single(convert(v)?)),
            (PlainForm::List | PlainForm::OptionalList, Value::Array(items)) => {
                Ok(Field::from_vec(items.iter().map(convert).collect::<Result<_, _>>()?))
            }
            (PlainForm::List | PlainForm::OptionalList, other) => Err(shape(path, other, &["array"], &plain_type)),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
