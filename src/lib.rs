//! Elasticsearch-style mapping → paired (plain, wire) type definitions.
//!
//! [`compiler::compile`] turns a mapping into a [`compiler::Forest`]; generated
//! wire types wrap every member in [`field::Field`] and use the leaf types in
//! [`estype`]. [`dynamic::Codec`] interprets a forest at runtime.
pub mod compiler;
pub mod date_format;
pub mod dynamic;
pub mod error;
pub mod estype;
pub mod field;
pub mod mapping;
pub mod naming;
pub mod option;
pub mod path_de;
pub mod record;
pub mod type_table;

#[doc(hidden)]
pub use once_cell;

pub use compiler::{CompilerConfig, Forest, TypeDefinition, compile, compile_mapping};
pub use field::{Cardinality, Field};
