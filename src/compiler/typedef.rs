//! Compiler output: named type definitions and the forest that holds them.
use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::date_format::EpochUnit;
use crate::estype::Metric;
use crate::field::Cardinality;
use crate::mapping::Kind;
use crate::option::ResolvedOption;

// ————————————————————————————————————————————————————————————————————————————
// MEMBERS
// ————————————————————————————————————————————————————————————————————————————

/// Shape of a member in the plain type, from `(required, single)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlainForm {
    /// `T`
    Value,
    /// `Vec<T>`
    List,
    /// `Option<T>`
    OptionalValue,
    /// `Option<Vec<T>>`
    OptionalList,
}

impl PlainForm {
    pub fn from_option(option: &ResolvedOption) -> Self {
        match (option.required, option.single) {
            (true, true) => PlainForm::Value,
            (true, false) => PlainForm::List,
            (false, true) => PlainForm::OptionalValue,
            (false, false) => PlainForm::OptionalList,
        }
    }

    pub fn render(self, elem: &str) -> String {
        match self {
            PlainForm::Value => elem.to_string(),
            PlainForm::List => format!("Vec<{elem}>"),
            PlainForm::OptionalValue => format!("Option<{elem}>"),
            PlainForm::OptionalList => format!("Option<Vec<{elem}>>"),
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, PlainForm::Value | PlainForm::List)
    }

    pub fn is_single(self) -> bool {
        matches!(self, PlainForm::Value | PlainForm::OptionalValue)
    }
}

/// Element type of a member, the `T` in `Field<T>` and in the plain form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElemType {
    /// An existing type used as-is on both sides.
    Scalar { rust: String, zero: Value },
    /// A generated leaf type (date, aggregate metric) used as-is on both sides.
    Leaf { name: String, zero: Value },
    /// A generated (plain, wire) pair; converts through its own converter.
    Compound { plain: String, wire: String },
}

impl ElemType {
    pub fn plain(&self) -> &str {
        match self {
            ElemType::Scalar { rust, .. } => rust,
            ElemType::Leaf { name, .. } => name,
            ElemType::Compound { plain, .. } => plain,
        }
    }

    pub fn wire(&self) -> &str {
        match self {
            ElemType::Scalar { rust, .. } => rust,
            ElemType::Leaf { name, .. } => name,
            ElemType::Compound { wire, .. } => wire,
        }
    }

    pub fn conversion(&self) -> Conversion {
        match self {
            ElemType::Compound { .. } => Conversion::Nested,
            _ => Conversion::Direct,
        }
    }
}

/// How a member moves between the plain and the wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// Elements are copied; only the container changes.
    Direct,
    /// Elements go through the child's converter inside `Field::map`.
    Nested,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    /// Key in the stored document.
    pub name: String,
    /// Field identifier in generated structs.
    pub ident: String,
    pub kind: Kind,
    pub option: ResolvedOption,
    pub elem: ElemType,
    pub form: PlainForm,
    pub cardinality: Cardinality,
}

impl Member {
    pub fn plain_type(&self) -> String {
        self.form.render(self.elem.plain())
    }

    pub fn wire_type(&self) -> String {
        format!("Field<{}>", self.elem.wire())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEFINITIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSpec {
    /// The `||`-delimited format the layouts were compiled from.
    pub format: String,
    pub preferred: Option<String>,
    pub prefer_epoch: bool,
    pub nanos: bool,
    pub layouts: Vec<String>,
    pub epoch: Option<EpochUnit>,
    /// `None` when values marshal as epoch numbers.
    pub marshal_layout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TypeBody {
    /// A (plain, wire) record pair.
    Record { members: Vec<Member> },
    /// A (plain, wire) pair over arbitrary keys: `BTreeMap<String, Vec<Value>>`
    /// and `BTreeMap<String, Field<Value>>`.
    OpenMap,
    Date(DateSpec),
    AggregateMetric { metrics: Vec<Metric> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    /// Equal to `name` for types that serve both roles.
    pub wire_name: String,
    /// Naming path, root type name first.
    pub path: Vec<String>,
    pub kind: Kind,
    pub body: TypeBody,
    /// Paths the generated source needs in scope.
    pub dependencies: BTreeSet<String>,
}

impl TypeDefinition {
    pub fn is_pair(&self) -> bool {
        matches!(self.body, TypeBody::Record { .. } | TypeBody::OpenMap)
    }

    pub fn members(&self) -> &[Member] {
        match &self.body {
            TypeBody::Record { members } => members,
            _ => &[],
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members().iter().find(|m| m.name == name)
    }

    /// `(child name, child type name, resolved option)` per member, in order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &str, &ResolvedOption)> {
        self.members().iter().map(|m| (m.name.as_str(), m.elem.plain(), &m.option))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FOREST
// ————————————————————————————————————————————————————————————————————————————

/// Every definition of one compilation, parents before children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forest {
    pub root: String,
    pub types: Vec<TypeDefinition>,
}

impl Forest {
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn get_by_wire_name(&self, wire_name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.wire_name == wire_name)
    }

    pub fn root(&self) -> Option<&TypeDefinition> {
        self.get(&self.root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(required: bool, single: bool) -> ResolvedOption {
        ResolvedOption { required, single, ..Default::default() }
    }

    #[test]
    fn plain_forms() {
        assert_eq!(PlainForm::from_option(&opt(true, true)).render("i32"), "i32");
        assert_eq!(PlainForm::from_option(&opt(true, false)).render("i32"), "Vec<i32>");
        assert_eq!(PlainForm::from_option(&opt(false, true)).render("i32"), "Option<i32>");
        assert_eq!(PlainForm::from_option(&opt(false, false)).render("i32"), "Option<Vec<i32>>");
    }

    #[test]
    fn compound_members_convert_nested() {
        let elem = ElemType::Compound { plain: "Name".into(), wire: "NameRaw".into() };
        assert_eq!(elem.conversion(), Conversion::Nested);
        let member = Member {
            name: "name".into(),
            ident: "name".into(),
            kind: Kind::Object,
            option: opt(true, true),
            elem,
            form: PlainForm::Value,
            cardinality: Cardinality::Single,
        };
        assert_eq!(member.plain_type(), "Name");
        assert_eq!(member.wire_type(), "Field<NameRaw>");
    }
}
