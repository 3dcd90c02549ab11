//! Mapping → (plain, wire) type definition forest.
//!
//! One [`Compiler`] per compilation; it owns the name registry, so names are
//! unique within a forest and independent across forests.
pub mod typedef;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::date_format::{self, builtin};
use crate::error::{CompileError, SchemaError};
use crate::estype::Metric;
use crate::field::Cardinality;
use crate::mapping::{Dynamic, Kind, Mapping, NodeBody, SchemaNode};
use crate::naming::{NameGenerator, NamingStrategy};
use crate::option::{FieldOption, GlobalOption, MapOption, ResolvedOption};
use crate::type_table::{self, LeafGenerator, Lookup};

pub use typedef::{Conversion, DateSpec, ElemType, Forest, Member, PlainForm, TypeBody, TypeDefinition};

const FIELD: &str = "es_typegen::field::Field";
const ESTYPE: &str = "es_typegen::estype";
const DATE_FORMAT: &str = "es_typegen::date_format";
const RECORD: &str = "es_typegen::record::RecordSerializer";

// ————————————————————————————————————————————————————————————————————————————
// CONFIG
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub global: GlobalOption,
    /// Per-field overrides for the top-level properties.
    pub fields: MapOption,
    pub naming: NamingStrategy,
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Compile top-level `properties` into a forest rooted at a record named after `root_name`.
pub fn compile(
    properties: &BTreeMap<String, SchemaNode>,
    root_name: &str,
    config: &CompilerConfig,
) -> Result<Forest, CompileError> {
    let mut compiler = Compiler::new(config);
    let root_path = vec![root_name.to_string()];
    let (root, types) = compiler.compile_record(&root_path, Kind::Object, properties, None, &config.fields)?;
    tracing::debug!(%root, types = types.len(), "compiled mapping");
    Ok(Forest { root, types })
}

/// Like [`compile`]; the root is named `root_name`, else the index name, else `Root`.
pub fn compile_mapping(mapping: &Mapping, root_name: Option<&str>, config: &CompilerConfig) -> Result<Forest, CompileError> {
    let root = root_name.or(mapping.index_name.as_deref()).unwrap_or("Root");
    compile(&mapping.properties, root, config)
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

pub struct Compiler<'c> {
    config: &'c CompilerConfig,
    names: NameGenerator,
}

impl<'c> Compiler<'c> {
    pub fn new(config: &'c CompilerConfig) -> Self {
        Compiler { config, names: NameGenerator::new(config.naming.clone()) }
    }

    /// Compile one field. `path` is the naming path (root type name first);
    /// `inherited` is the nearest explicit `dynamic` above the node.
    pub fn compile_node(
        &mut self,
        node: &SchemaNode,
        path: &[String],
        field_option: Option<&FieldOption>,
        inherited: Option<Dynamic>,
    ) -> Result<(ResolvedOption, ElemType, Vec<TypeDefinition>), CompileError> {
        let resolved = self.config.global.resolve(node.kind, field_option);
        tracing::debug!(path = %path.join("."), kind = %node.kind, "compiling field");

        match &node.body {
            NodeBody::Compound { dynamic, properties } => {
                let empty = MapOption::new();
                let overrides = field_option.map(|f| &f.children).unwrap_or(&empty);
                let explicit = dynamic.or(inherited);
                let (name, defs) = self.compile_record(path, node.kind, properties, explicit, overrides)?;
                let wire = self.names.wire_name(&name);
                Ok((resolved, ElemType::Compound { plain: name, wire }, defs))
            }
            NodeBody::Leaf => {
                let (elem, defs) = self.compile_leaf(node, path, &resolved).map_err(|e| CompileError::at(&node.path, e))?;
                Ok((resolved, elem, defs))
            }
        }
    }

    fn compile_record(
        &mut self,
        path: &[String],
        kind: Kind,
        properties: &BTreeMap<String, SchemaNode>,
        dynamic: Option<Dynamic>,
        overrides: &MapOption,
    ) -> Result<(String, Vec<TypeDefinition>), CompileError> {
        let schema_path = &path[1..];
        // the name is taken before any child asks for one
        let name = self.names.generate(path).map_err(|e| CompileError::at(schema_path, e))?;
        let wire_name = self.names.wire_name(&name);

        if dynamic.unwrap_or(Dynamic::Closed) == Dynamic::Open {
            tracing::debug!(%name, "open object, emitting a map type");
            let dependencies = deps(&[FIELD, "serde_json", "std::collections::BTreeMap"]);
            let def = TypeDefinition { name: name.clone(), wire_name, path: path.to_vec(), kind, body: TypeBody::OpenMap, dependencies };
            return Ok((name, vec![def]));
        }

        let mut members = Vec::with_capacity(properties.len());
        let mut descendants = Vec::new();
        let mut dependencies = deps(&[FIELD, RECORD]);
        let mut idents = BTreeSet::new();

        for (child_name, child) in properties {
            let mut child_path = path.to_vec();
            child_path.push(child_name.clone());

            let (option, elem, defs) = self.compile_node(child, &child_path, overrides.get(child_name), dynamic)?;
            if let ElemType::Scalar { .. } | ElemType::Leaf { .. } = elem {
                dependencies.extend(leaf_deps(child.kind, &elem));
            }
            descendants.extend(defs);

            members.push(Member {
                name: child_name.clone(),
                ident: unique_ident(child_name, &mut idents),
                kind: child.kind,
                form: PlainForm::from_option(&option),
                cardinality: Cardinality::from(&option),
                option,
                elem,
            });
        }

        let def = TypeDefinition { name: name.clone(), wire_name, path: path.to_vec(), kind, body: TypeBody::Record { members }, dependencies };
        let mut out = Vec::with_capacity(1 + descendants.len());
        out.push(def);
        out.extend(descendants);
        Ok((name, out))
    }

    fn compile_leaf(
        &mut self,
        node: &SchemaNode,
        path: &[String],
        resolved: &ResolvedOption,
    ) -> Result<(ElemType, Vec<TypeDefinition>), CompileError> {
        let generator = match type_table::lookup(node.kind) {
            Lookup::Scalar(s) => {
                return Ok((ElemType::Scalar { rust: s.rust.to_string(), zero: s.zero.to_json() }, Vec::new()));
            }
            Lookup::Delegate(generator) => generator,
            Lookup::Compound => {
                return Err(SchemaError::malformed(&node.path, format!("`{}` field without a body", node.kind)).into());
            }
        };

        match generator {
            LeafGenerator::Boolean => {
                let rust = if resolved.prefer_string_boolean { "estype::BooleanStr" } else { "estype::Boolean" };
                Ok((ElemType::Scalar { rust: rust.to_string(), zero: Value::Bool(false) }, Vec::new()))
            }
            LeafGenerator::Date { nanos } => self.compile_date(node, path, resolved, nanos),
            LeafGenerator::AggregateMetricDouble => self.compile_aggregate(node, path),
        }
    }

    fn compile_date(
        &mut self,
        node: &SchemaNode,
        path: &[String],
        resolved: &ResolvedOption,
        nanos: bool,
    ) -> Result<(ElemType, Vec<TypeDefinition>), CompileError> {
        let format = match node.params.get("format") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                return Err(SchemaError::malformed(&node.path, format!("`format` must be a string, got {other}")).into());
            }
        };
        let preferred = resolved.preferred_date_format.as_deref();

        if format.is_none() && preferred.is_none() && !resolved.prefer_epoch {
            let rust = if nanos {
                "estype::StrictDateOptionalTimeNanosEpochMillis"
            } else {
                "estype::StrictDateOptionalTimeEpochMillis"
            };
            let zero = Value::String("1970-01-01T00:00:00Z".to_string());
            return Ok((ElemType::Scalar { rust: rust.to_string(), zero }, Vec::new()));
        }

        let source = format.unwrap_or(builtin::DEFAULT_FORMAT);
        let compiled = date_format::compile(source, preferred, resolved.prefer_epoch)?;
        let name = self.names.generate(path)?;

        let zero = compiled.marshal(&DateTime::<Utc>::default().fixed_offset()).unwrap_or(Value::Null);
        let spec = DateSpec {
            format: source.to_string(),
            preferred: preferred.map(str::to_string),
            prefer_epoch: compiled.prefers_epoch(),
            nanos,
            layouts: compiled.layouts().map(str::to_string).collect(),
            epoch: compiled.epoch(),
            marshal_layout: compiled.marshal_layout().map(str::to_string),
        };
        let def = TypeDefinition {
            name: name.clone(),
            wire_name: name.clone(),
            path: path.to_vec(),
            kind: node.kind,
            body: TypeBody::Date(spec),
            dependencies: deps(&[ESTYPE, DATE_FORMAT]),
        };
        Ok((ElemType::Leaf { name, zero }, vec![def]))
    }

    fn compile_aggregate(&mut self, node: &SchemaNode, path: &[String]) -> Result<(ElemType, Vec<TypeDefinition>), CompileError> {
        let Some(Value::Array(raw)) = node.params.get("metrics") else {
            return Err(SchemaError::malformed(&node.path, "`metrics` must be an array of metric names").into());
        };
        let mut metrics = BTreeSet::new();
        for value in raw {
            let metric = value.as_str().and_then(Metric::parse).ok_or_else(|| SchemaError::UnknownMetric {
                metric: value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
                path: node.path.join("."),
            })?;
            metrics.insert(metric);
        }

        let name = self.names.generate(path)?;
        let def = TypeDefinition {
            name: name.clone(),
            wire_name: name.clone(),
            path: path.to_vec(),
            kind: node.kind,
            body: TypeBody::AggregateMetric { metrics: metrics.into_iter().collect() },
            dependencies: BTreeSet::new(),
        };
        Ok((ElemType::Leaf { name, zero: Value::Object(serde_json::Map::new()) }, vec![def]))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn deps(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

fn leaf_deps(kind: Kind, elem: &ElemType) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    if let Lookup::Scalar(s) = type_table::lookup(kind) {
        out.extend(s.deps.iter().map(|d| d.to_string()));
    }
    if elem.plain().starts_with("estype::") {
        out.insert(ESTYPE.to_string());
    }
    out
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for",
    "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static", "struct",
    "trait", "true", "try", "type", "unsafe", "use", "where", "while", "yield",
];

/// `firstName` → `first_name`, `type` → `r#type`, `@timestamp` → `timestamp`.
fn member_ident(name: &str) -> String {
    let snake = name.to_snake_case();
    let ident = match snake.chars().next() {
        None => "field".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{snake}"),
        Some(_) => snake,
    };
    if KEYWORDS.contains(&ident.as_str()) { format!("r#{ident}") } else { ident }
}

fn unique_ident(name: &str, taken: &mut BTreeSet<String>) -> String {
    let base = member_ident(name);
    let ident = if taken.contains(&base) {
        (1u32..).map(|n| format!("{base}_{n}")).find(|c| !taken.contains(c)).unwrap_or_default()
    } else {
        base
    };
    taken.insert(ident.clone());
    ident
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NamingError;
    use crate::naming::OverlapPolicy;
    use crate::option::OptionLayer;
    use serde_json::json;

    fn mapping(doc: Value) -> Mapping {
        Mapping::from_value(&doc).unwrap()
    }

    fn members(forest: &Forest, name: &str) -> Vec<(String, String, String, Cardinality)> {
        forest
            .get(name)
            .unwrap_or_else(|| panic!("no type {name}"))
            .members()
            .iter()
            .map(|m| (m.name.clone(), m.plain_type(), m.wire_type(), m.cardinality))
            .collect()
    }

    fn manager_scenario() -> (Mapping, CompilerConfig) {
        let m = mapping(json!({
            "manager": {
                "properties": {
                    "age": { "type": "integer" },
                    "name": { "properties": { "first": { "type": "text" } } }
                }
            }
        }));
        let mut config = CompilerConfig::default();
        config.global.layer = OptionLayer::default().required(true).single(true);
        config.fields.insert(
            "manager".into(),
            FieldOption::default().with_child("age", FieldOption::new(OptionLayer::default().single(false))),
        );
        (m, config)
    }

    #[test]
    fn manager_scenario_shapes() {
        let (m, config) = manager_scenario();
        let forest = compile_mapping(&m, Some("sample"), &config).unwrap();

        let names: Vec<_> = forest.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Sample", "Manager", "Name"]);

        assert_eq!(
            members(&forest, "Manager"),
            vec![
                ("age".into(), "Vec<i32>".into(), "Field<i32>".into(), Cardinality::Array),
                ("name".into(), "Name".into(), "Field<NameRaw>".into(), Cardinality::Single),
            ]
        );
        let manager = forest.get("Manager").unwrap();
        assert_eq!(manager.wire_name, "ManagerRaw");
        assert_eq!(manager.member("name").unwrap().elem.conversion(), Conversion::Nested);
        assert_eq!(manager.member("age").unwrap().elem.conversion(), Conversion::Direct);
        assert_eq!(forest.get_by_wire_name("NameRaw").unwrap().name, "Name");

        let children: Vec<_> = manager.children().map(|(name, ty, option)| (name, ty, option.single)).collect();
        assert_eq!(children, vec![("age", "i32", false), ("name", "Name", true)]);
    }

    #[test]
    fn parents_claim_names_before_children() {
        let m = mapping(json!({
            "name": { "properties": { "name": { "properties": { "x": { "type": "keyword" } } } } }
        }));
        let forest = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap();
        let names: Vec<_> = forest.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Doc", "Name", "NameName"]);
    }

    #[test]
    fn dynamic_is_inherited_until_overridden() {
        let m = mapping(json!({
            "open": {
                "dynamic": true,
                "properties": { "ignored": { "type": "keyword" } }
            },
            "outer": {
                "dynamic": "true",
                "properties": {}
            },
            "strict": {
                "dynamic": "strict",
                "properties": { "inner": { "properties": { "k": { "type": "keyword" } } } }
            }
        }));
        let forest = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap();
        assert_eq!(forest.get("Open").unwrap().body, TypeBody::OpenMap);
        assert_eq!(forest.get("Outer").unwrap().body, TypeBody::OpenMap);
        assert!(matches!(forest.get("Strict").unwrap().body, TypeBody::Record { .. }));
        assert!(matches!(forest.get("Inner").unwrap().body, TypeBody::Record { .. }));
        assert!(forest.get("Ignored").is_none());

        let m = mapping(json!({
            "a": { "dynamic": true, "properties": {} },
            "b": { "dynamic": false, "properties": { "c": { "properties": {} } } }
        }));
        let nested = json!({ "b": { "dynamic": true, "properties": { "c": { "dynamic": false, "properties": {} } } } });
        let forest = compile_mapping(&mapping(nested), Some("doc"), &CompilerConfig::default()).unwrap();
        assert_eq!(forest.get("B").unwrap().body, TypeBody::OpenMap);
        assert!(forest.get("C").is_none());

        let forest = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap();
        assert_eq!(forest.get("C").unwrap().members().len(), 0);
    }

    #[test]
    fn inherited_open_applies_to_descendants() {
        let m = mapping(json!({
            "outer": {
                "dynamic": "strict",
                "properties": {
                    "mid": {
                        "dynamic": true,
                        "properties": { "leaf": { "type": "keyword" } }
                    }
                }
            }
        }));
        let forest = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap();
        assert_eq!(forest.get("Mid").unwrap().body, TypeBody::OpenMap);
    }

    #[test]
    fn empty_object_is_an_empty_pair() {
        let m = mapping(json!({ "blank": { "type": "object" } }));
        let forest = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap();
        let blank = forest.get("Blank").unwrap();
        assert!(blank.is_pair());
        assert!(blank.members().is_empty());
        assert_eq!(blank.wire_name, "BlankRaw");
    }

    #[test]
    fn leaves_follow_options() {
        let m = mapping(json!({
            "flag": { "type": "boolean" },
            "when": { "type": "date" },
            "whenNanos": { "type": "date_nanos" },
            "stamp": { "type": "date", "format": "yyyy-MM-dd||epoch_second" },
            "stats": { "type": "aggregate_metric_double", "metrics": ["max", "min"], "default_metric": "max" }
        }));
        let mut config = CompilerConfig::default();
        config.fields.insert(
            "flag".into(),
            FieldOption::new(OptionLayer { prefer_string_boolean: true.into(), ..Default::default() }),
        );
        let forest = compile_mapping(&m, Some("doc"), &config).unwrap();
        let doc = forest.root().unwrap();

        assert_eq!(doc.member("flag").unwrap().elem.plain(), "estype::BooleanStr");
        assert_eq!(doc.member("when").unwrap().elem.plain(), "estype::StrictDateOptionalTimeEpochMillis");
        assert_eq!(doc.member("whenNanos").unwrap().ident, "when_nanos");
        assert_eq!(doc.member("stamp").unwrap().elem.plain(), "Stamp");

        let TypeBody::Date(spec) = &forest.get("Stamp").unwrap().body else { panic!("date") };
        assert_eq!(spec.layouts, vec!["%Y-%m-%d"]);
        assert_eq!(spec.epoch, Some(date_format::EpochUnit::Seconds));

        let TypeBody::AggregateMetric { metrics } = &forest.get("Stats").unwrap().body else { panic!("agg") };
        assert_eq!(metrics, &vec![Metric::Min, Metric::Max]);
    }

    #[test]
    fn date_preference_compiles_default_format() {
        let m = mapping(json!({ "when": { "type": "date" } }));
        let mut config = CompilerConfig::default();
        config.global.layer.prefer_epoch = true.into();
        let forest = compile_mapping(&m, Some("doc"), &config).unwrap();
        let TypeBody::Date(spec) = &forest.get("When").unwrap().body else { panic!("date") };
        assert_eq!(spec.format, builtin::DEFAULT_FORMAT);
        assert!(spec.prefer_epoch);
        assert_eq!(spec.marshal_layout, None);
    }

    #[test]
    fn schema_errors_carry_the_path() {
        let m = mapping(json!({ "a": { "properties": { "when": { "type": "date", "format": "epoch_millis||epoch_second" } } } }));
        let err = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap_err();
        let CompileError::At { path, source } = err else { panic!("located error") };
        assert_eq!(path, "a.when");
        assert!(matches!(*source, CompileError::Schema(SchemaError::DuplicateEpochMarker { .. })));

        let m = mapping(json!({ "s": { "type": "aggregate_metric_double", "metrics": ["avg"] } }));
        let err = compile_mapping(&m, Some("doc"), &CompilerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("avg"), "{err}");

        let mut config = CompilerConfig::default();
        config.global.layer.preferred_date_format = "yyyy/MM/dd".into();
        let m = mapping(json!({ "d": { "type": "date", "format": "yyyy-MM-dd" } }));
        assert!(compile_mapping(&m, Some("doc"), &config).is_err());
    }

    #[test]
    fn overlap_policy_reaches_the_compiler() {
        let m = mapping(json!({
            "a": { "properties": { "x": { "properties": {} } } },
            "b": { "properties": { "x": { "properties": {} } } },
            "c": { "properties": { "b": { "properties": { "x": { "properties": {} } } } } }
        }));
        let mut config = CompilerConfig::default();
        let forest = compile_mapping(&m, Some("doc"), &config).unwrap();
        assert!(forest.get("BX1").is_some());

        config.naming.on_overlap = OverlapPolicy::Fail;
        let err = compile_mapping(&m, Some("doc"), &config).unwrap_err();
        let CompileError::At { source, .. } = err else { panic!("located error") };
        assert!(matches!(*source, CompileError::Naming(NamingError::Overlap { .. })));
    }

    #[test]
    fn member_idents() {
        let mut taken = BTreeSet::new();
        assert_eq!(unique_ident("firstName", &mut taken), "first_name");
        assert_eq!(unique_ident("first_name", &mut taken), "first_name_1");
        assert_eq!(unique_ident("type", &mut taken), "r#type");
        assert_eq!(unique_ident("@timestamp", &mut taken), "timestamp");
        assert_eq!(unique_ident("3d", &mut taken), "_3d");
    }

    #[test]
    fn forests_are_independent() {
        let (m, config) = manager_scenario();
        let first = compile_mapping(&m, Some("sample"), &config).unwrap();
        let second = compile_mapping(&m, Some("sample"), &config).unwrap();
        assert_eq!(first, second);
    }
}
